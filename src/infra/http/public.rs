use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use time::OffsetDateTime;

use crate::application::{
    error::HttpError,
    forms::{CommentForm, FormErrors},
    pagination::PageParam,
};
use crate::domain::entities::PostId;
use crate::presentation::views::{
    CategoryPageView, CategoryTemplate, DetailTemplate, IndexTemplate, LayoutContext,
    PostDetailView, PostListView, ProfilePageView, ProfileTemplate, render_template_response,
};

use super::{HttpState, profile_path, session::Viewer};

pub(super) async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(params): Query<PageParam>,
) -> Result<Response, HttpError> {
    let page = state.blog.index(params.requested()).await?;
    let listing = PostListView::from_page(&page, "/", OffsetDateTime::now_utc());
    let view = LayoutContext::new(viewer.view(), "Latest posts", listing);
    Ok(render_template_response(IndexTemplate { view }, StatusCode::OK))
}

pub(super) async fn category(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(params): Query<PageParam>,
) -> Result<Response, HttpError> {
    let found = state.blog.category_posts(&slug, params.requested()).await?;
    let base_path = format!("/category/{}/", found.category.slug);
    let listing = PostListView::from_page(&found.posts, &base_path, OffsetDateTime::now_utc());
    let content = CategoryPageView::new(&found.category, listing);
    let view = LayoutContext::new(viewer.view(), found.category.title.clone(), content);
    Ok(render_template_response(
        CategoryTemplate { view },
        StatusCode::OK,
    ))
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(params): Query<PageParam>,
) -> Result<Response, HttpError> {
    let actor = viewer.actor();
    let found = state
        .blog
        .profile(&username, actor.as_ref(), params.requested())
        .await?;
    let listing = PostListView::from_page(
        &found.posts,
        &profile_path(&found.profile.username),
        OffsetDateTime::now_utc(),
    );
    let content = ProfilePageView::new(&found.profile, found.is_owner, listing);
    let view = LayoutContext::new(viewer.view(), found.profile.display_name(), content);
    Ok(render_template_response(
        ProfileTemplate { view },
        StatusCode::OK,
    ))
}

pub(super) async fn detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(post_id): Path<PostId>,
) -> Result<Response, HttpError> {
    let actor = viewer.actor();
    let detail = state.blog.post_detail(post_id, actor.as_ref()).await?;
    let content = PostDetailView::new(
        &detail.entry,
        &detail.comments,
        actor.as_ref(),
        OffsetDateTime::now_utc(),
    );
    let view = LayoutContext::new(viewer.view(), detail.entry.post.title.clone(), content);
    Ok(render_template_response(
        DetailTemplate { view },
        StatusCode::OK,
    ))
}

/// Re-render the detail page around a rejected comment submission.
pub(super) async fn detail_with_comment_errors(
    state: &HttpState,
    viewer: &Viewer,
    post_id: PostId,
    form: CommentForm,
    errors: FormErrors,
) -> Result<Response, HttpError> {
    let actor = viewer.actor();
    let detail = state.blog.post_detail(post_id, actor.as_ref()).await?;
    let mut content = PostDetailView::new(
        &detail.entry,
        &detail.comments,
        actor.as_ref(),
        OffsetDateTime::now_utc(),
    );
    content.comment_form = form;
    content.comment_errors = errors;
    let view = LayoutContext::new(viewer.view(), detail.entry.post.title.clone(), content);
    Ok(render_template_response(
        DetailTemplate { view },
        StatusCode::UNPROCESSABLE_ENTITY,
    ))
}
