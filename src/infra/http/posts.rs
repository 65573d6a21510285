use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use time::OffsetDateTime;

use crate::application::{
    error::HttpError,
    forms::{FormErrors, PostForm},
    posts::{PostError, PostFormChoices},
};
use crate::domain::entities::PostId;
use crate::presentation::views::{
    LayoutContext, PostCardView, PostDeleteTemplate, PostDeleteView, PostFormTemplate,
    PostFormView, render_template_response,
};

use super::{HttpState, denied_response, post_path, profile_path, session::RequireUser};

const CREATE_ACTION: &str = "/posts/create/";

pub(super) async fn create_form(
    State(state): State<HttpState>,
    user: RequireUser,
) -> Response {
    const SOURCE: &str = "infra::http::posts::create_form";

    let choices = match state.posts.form_choices().await {
        Ok(choices) => choices,
        Err(err) => return post_error_response(SOURCE, err, None),
    };
    let content = PostFormView::blank(CREATE_ACTION, &choices);
    render_form(&user, "New post", content, StatusCode::OK)
}

pub(super) async fn create(
    State(state): State<HttpState>,
    user: RequireUser,
    Form(form): Form<PostForm>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::create";

    match state.posts.create(&user.actor(), &form).await {
        Ok(_) => Redirect::to(&profile_path(&user.0.username)).into_response(),
        Err(PostError::Invalid(errors)) => {
            rerender(&state, &user, "New post", CREATE_ACTION, "Publish", &form, errors).await
        }
        Err(err) => post_error_response(SOURCE, err, None),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(post_id): Path<PostId>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::edit_form";

    let entry = match state.posts.edit_target(&user.actor(), post_id).await {
        Ok(entry) => entry,
        Err(err) => return post_error_response(SOURCE, err, Some(post_id)),
    };
    let choices = match state.posts.form_choices().await {
        Ok(choices) => choices,
        Err(err) => return post_error_response(SOURCE, err, Some(post_id)),
    };
    let content = PostFormView::from_post(&entry, &edit_action(post_id), &choices);
    render_form(&user, "Edit post", content, StatusCode::OK)
}

pub(super) async fn edit(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(post_id): Path<PostId>,
    Form(form): Form<PostForm>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::edit";

    match state.posts.update(&user.actor(), post_id, &form).await {
        Ok(_) => Redirect::to(&post_path(post_id)).into_response(),
        Err(PostError::Invalid(errors)) => {
            let action = edit_action(post_id);
            rerender(&state, &user, "Edit post", &action, "Save", &form, errors).await
        }
        Err(err) => post_error_response(SOURCE, err, Some(post_id)),
    }
}

pub(super) async fn delete_form(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(post_id): Path<PostId>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::delete_form";

    let entry = match state.posts.delete_target(&user.actor(), post_id).await {
        Ok(entry) => entry,
        Err(err) => return post_error_response(SOURCE, err, Some(post_id)),
    };
    let content = PostDeleteView {
        post: PostCardView::from_entry(&entry, OffsetDateTime::now_utc()),
        action: format!("/posts/{post_id}/delete/"),
    };
    let view = LayoutContext::new(user.view(), "Delete post", content);
    render_template_response(PostDeleteTemplate { view }, StatusCode::OK)
}

pub(super) async fn delete(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(post_id): Path<PostId>,
) -> Response {
    const SOURCE: &str = "infra::http::posts::delete";

    match state.posts.delete(&user.actor(), post_id).await {
        Ok(()) => Redirect::to(&profile_path(&user.0.username)).into_response(),
        Err(err) => post_error_response(SOURCE, err, Some(post_id)),
    }
}

fn edit_action(post_id: PostId) -> String {
    format!("/posts/{post_id}/edit/")
}

fn render_form(
    user: &RequireUser,
    title: &str,
    content: PostFormView,
    status: StatusCode,
) -> Response {
    let view = LayoutContext::new(user.view(), title, content);
    render_template_response(PostFormTemplate { view }, status)
}

async fn rerender(
    state: &HttpState,
    user: &RequireUser,
    heading: &str,
    action: &str,
    submit_label: &str,
    form: &PostForm,
    errors: FormErrors,
) -> Response {
    // A failed lookup here only costs the select options.
    let choices = state.posts.form_choices().await.unwrap_or_else(|err| {
        tracing::warn!(
            target = "blogicum::http::posts",
            error = %err,
            "could not load form choices"
        );
        PostFormChoices::default()
    });
    let content = PostFormView::from_form(heading, action, submit_label, form, &choices, errors);
    render_form(user, heading, content, StatusCode::UNPROCESSABLE_ENTITY)
}

fn post_error_response(source: &'static str, err: PostError, post_id: Option<PostId>) -> Response {
    match err {
        PostError::Denied(denied) => match post_id {
            Some(post_id) => denied_response(source, &denied, post_id),
            None => HttpError::forbidden(source, &denied).into_response(),
        },
        PostError::NotFound(_) => HttpError::not_found(source, &err).into_response(),
        PostError::Invalid(_) => HttpError::from_error(
            source,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Request could not be processed",
            &err,
        )
        .into_response(),
        PostError::Repo(err) => HttpError::from(err).into_response(),
    }
}
