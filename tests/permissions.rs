mod support;

use axum::http::StatusCode;
use time::Duration;

use support::{MemoryStore, TestApp};

fn post_fields<'a>(title: &'a str, category: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", title),
        ("text", "Some words"),
        ("pub_date", "2024-05-01T10:30"),
        ("category", category),
        ("location", ""),
        ("is_published", "on"),
    ]
}

#[tokio::test]
async fn only_the_author_can_edit_a_post() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let intruder = store.add_user("intruder").await;
    let travel = store.add_category("Travel", "travel", true).await;
    let post = store
        .add_post(&author, &travel, "Original Title", -Duration::hours(1), true)
        .await;
    let app = TestApp::new(store.clone());
    let edit_path = format!("/posts/{}/edit/", post.id);
    let detail_path = format!("/posts/{}/", post.id);
    let category = travel.id.to_string();

    let cookie = app.sign_in(&intruder).await;
    let response = app.get(&edit_path, Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some(detail_path.as_str()));

    let response = app
        .post_form(&edit_path, &post_fields("Hijacked", &category), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some(detail_path.as_str()));
    assert_eq!(
        store.post(post.id).await.expect("post kept").title,
        "Original Title"
    );

    let cookie = app.sign_in(&author).await;
    let form = app.get(&edit_path, Some(&cookie)).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Original Title"));

    let response = app
        .post_form(&edit_path, &post_fields("Better Title", &category), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some(detail_path.as_str()));
    assert_eq!(
        store.post(post.id).await.expect("post kept").title,
        "Better Title"
    );
}

#[tokio::test]
async fn superuser_may_delete_any_post_staff_may_not() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let staff = store.add_user_with("moderator", true, false).await;
    let admin = store.add_user_with("admin", false, true).await;
    let travel = store.add_category("Travel", "travel", true).await;
    let post = store
        .add_post(&author, &travel, "Doomed Post", -Duration::hours(1), true)
        .await;
    let app = TestApp::new(store.clone());
    let delete_path = format!("/posts/{}/delete/", post.id);

    let cookie = app.sign_in(&staff).await;
    assert_eq!(
        app.get(&delete_path, Some(&cookie)).await.status,
        StatusCode::FORBIDDEN
    );
    let response = app.post_form(&delete_path, &[], Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(store.post(post.id).await.is_some());

    let cookie = app.sign_in(&admin).await;
    let confirm = app.get(&delete_path, Some(&cookie)).await;
    assert_eq!(confirm.status, StatusCode::OK);
    assert!(confirm.body.contains("Doomed Post"));

    let response = app.post_form(&delete_path, &[], Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/profile/admin/"));
    assert!(store.post(post.id).await.is_none());
}

#[tokio::test]
async fn author_deletes_own_post_and_its_comments() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let travel = store.add_category("Travel", "travel", true).await;
    let post = store
        .add_post(&author, &travel, "Short Lived", -Duration::hours(1), true)
        .await;
    store.add_comment(&post, &author, "note to self").await;
    let app = TestApp::new(store.clone());

    let cookie = app.sign_in(&author).await;
    let response = app
        .post_form(&format!("/posts/{}/delete/", post.id), &[], Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/profile/writer/"));
    assert!(store.post(post.id).await.is_none());
    assert!(store.comments_on(post.id).await.is_empty());
}

#[tokio::test]
async fn comment_deletion_by_stranger_is_forbidden_staff_allowed() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let commenter = store.add_user("commenter").await;
    let stranger = store.add_user("stranger").await;
    let staff = store.add_user_with("moderator", true, false).await;
    let travel = store.add_category("Travel", "travel", true).await;
    let post = store
        .add_post(&author, &travel, "Discussed", -Duration::hours(1), true)
        .await;
    let comment = store.add_comment(&post, &commenter, "keep me").await;
    let app = TestApp::new(store.clone());
    let path = format!("/posts/{}/delete_comment/{}/", post.id, comment.id);

    // The post author has no say over other people's comments.
    for user in [&stranger, &author] {
        let cookie = app.sign_in(user).await;
        let response = app.post_form(&path, &[], Some(&cookie)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(
            store.comment(comment.id).await.expect("comment kept").text,
            "keep me"
        );
    }

    let cookie = app.sign_in(&staff).await;
    let response = app.post_form(&path, &[], Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some(format!("/posts/{}/", post.id).as_str()));
    assert!(store.comment(comment.id).await.is_none());
}

#[tokio::test]
async fn comment_edits_are_author_only_even_for_staff() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let staff = store.add_user_with("moderator", true, true).await;
    let travel = store.add_category("Travel", "travel", true).await;
    let post = store
        .add_post(&author, &travel, "Discussed", -Duration::hours(1), true)
        .await;
    let comment = store.add_comment(&post, &author, "typo here").await;
    let app = TestApp::new(store.clone());
    let path = format!("/posts/{}/edit_comment/{}/", post.id, comment.id);
    let detail = format!("/posts/{}/", post.id);

    let cookie = app.sign_in(&staff).await;
    let response = app
        .post_form(&path, &[("text", "rewritten")], Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some(detail.as_str()));
    assert_eq!(store.comment(comment.id).await.expect("kept").text, "typo here");

    let cookie = app.sign_in(&author).await;
    let response = app
        .post_form(&path, &[("text", "fixed")], Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(store.comment(comment.id).await.expect("kept").text, "fixed");

    let response = app.post_form(&path, &[("text", "   ")], Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.comment(comment.id).await.expect("kept").text, "fixed");
}

#[tokio::test]
async fn comments_must_belong_to_the_addressed_post() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let travel = store.add_category("Travel", "travel", true).await;
    let first = store
        .add_post(&author, &travel, "First", -Duration::hours(2), true)
        .await;
    let second = store
        .add_post(&author, &travel, "Second", -Duration::hours(1), true)
        .await;
    let comment = store.add_comment(&first, &author, "on the first").await;
    let app = TestApp::new(store.clone());

    let cookie = app.sign_in(&author).await;
    let path = format!("/posts/{}/edit_comment/{}/", second.id, comment.id);
    assert_eq!(
        app.get(&path, Some(&cookie)).await.status,
        StatusCode::NOT_FOUND
    );
    let path = format!("/posts/{}/delete_comment/{}/", second.id, comment.id);
    assert_eq!(
        app.post_form(&path, &[], Some(&cookie)).await.status,
        StatusCode::NOT_FOUND
    );
    assert!(store.comment(comment.id).await.is_some());
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_login() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let travel = store.add_category("Travel", "travel", true).await;
    let post = store
        .add_post(&author, &travel, "Open", -Duration::hours(1), true)
        .await;
    let app = TestApp::new(store.clone());

    let response = app.get("/posts/create/", None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location(),
        Some("/auth/login/?next=%2Fposts%2Fcreate%2F")
    );

    let response = app
        .post_form(
            &format!("/posts/{}/comment/", post.id),
            &[("text", "hello")],
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(
        response
            .location()
            .is_some_and(|location| location.starts_with("/auth/login/?next="))
    );
    assert!(store.comments_on(post.id).await.is_empty());

    assert_eq!(
        app.get("/edit_profile/", None).await.status,
        StatusCode::SEE_OTHER
    );
}

#[tokio::test]
async fn invalid_post_submission_rerenders_without_writing() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let travel = store.add_category("Travel", "travel", true).await;
    let app = TestApp::new(store.clone());
    let cookie = app.sign_in(&author).await;
    let category = travel.id.to_string();

    let form = app.get("/posts/create/", Some(&cookie)).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Travel"));

    let response = app
        .post_form("/posts/create/", &post_fields("", &category), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("class=\"error\""));
    assert!(store.posts_by(author.id).await.is_empty());

    let response = app
        .post_form("/posts/create/", &post_fields("Fine Title", "9999"), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(store.posts_by(author.id).await.is_empty());

    let response = app
        .post_form("/posts/create/", &post_fields("Fine Title", &category), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/profile/writer/"));
    let posts = store.posts_by(author.id).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Fine Title");
    assert!(posts[0].is_published);
}

#[tokio::test]
async fn commenting_requires_a_visible_post() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    let reader = store.add_user("reader").await;
    let travel = store.add_category("Travel", "travel", true).await;
    let draft = store
        .add_post(&author, &travel, "Draft", -Duration::hours(1), false)
        .await;
    let public = store
        .add_post(&author, &travel, "Public", -Duration::hours(1), true)
        .await;
    let app = TestApp::new(store.clone());
    let cookie = app.sign_in(&reader).await;

    let response = app
        .post_form(
            &format!("/posts/{}/comment/", draft.id),
            &[("text", "sneaky")],
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(store.comments_on(draft.id).await.is_empty());

    let path = format!("/posts/{}/comment/", public.id);
    let response = app.post_form(&path, &[("text", "  ")], Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(store.comments_on(public.id).await.is_empty());

    let response = app
        .post_form(&path, &[("text", "nice read")], Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some(format!("/posts/{}/", public.id).as_str()));
    assert_eq!(store.comments_on(public.id).await.len(), 1);
}

#[tokio::test]
async fn post_form_offers_only_published_choices() {
    let store = MemoryStore::new();
    let author = store.add_user("writer").await;
    store.add_category("Travel", "travel", true).await;
    let drafts = store.add_category("Drafts Corner", "drafts", false).await;
    store.add_location("Lisbon", true).await;
    let closed = store.add_location("Closed Harbour", false).await;
    let app = TestApp::new(store.clone());
    let cookie = app.sign_in(&author).await;

    let form = app.get("/posts/create/", Some(&cookie)).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Travel"));
    assert!(form.body.contains("Lisbon"));
    assert!(!form.body.contains("Drafts Corner"));
    assert!(!form.body.contains("Closed Harbour"));

    let category = drafts.id.to_string();
    let response = app
        .post_form("/posts/create/", &post_fields("Hidden away", &category), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(store.posts_by(author.id).await.is_empty());

    let travel = store.add_category("Walks", "walks", true).await;
    let category = travel.id.to_string();
    let location = closed.id.to_string();
    let mut fields = post_fields("Harbour walk", &category);
    fields.retain(|(name, _)| *name != "location");
    fields.push(("location", &location));
    let response = app.post_form("/posts/create/", &fields, Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(store.posts_by(author.id).await.is_empty());
}
