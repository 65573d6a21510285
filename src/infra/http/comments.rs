use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::application::{
    comments::CommentError,
    error::HttpError,
    forms::{CommentForm, FormErrors},
};
use crate::domain::entities::{CommentId, CommentRecord, PostId};
use crate::presentation::views::{
    CommentFormView, CommentTemplate, LayoutContext, render_template_response,
};

use super::{
    HttpState, denied_response, post_path,
    public::detail_with_comment_errors,
    session::{RequireUser, Viewer},
};

pub(super) async fn add(
    State(state): State<HttpState>,
    user: RequireUser,
    Path(post_id): Path<PostId>,
    Form(form): Form<CommentForm>,
) -> Response {
    const SOURCE: &str = "infra::http::comments::add";

    match state.comments.add(&user.actor(), post_id, &form).await {
        Ok(_) => Redirect::to(&post_path(post_id)).into_response(),
        Err(CommentError::Invalid(errors)) => {
            let viewer = Viewer(Some(user.0.clone()));
            detail_with_comment_errors(&state, &viewer, post_id, form, errors)
                .await
                .unwrap_or_else(IntoResponse::into_response)
        }
        Err(err) => comment_error_response(SOURCE, err, post_id),
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    user: RequireUser,
    Path((post_id, comment_id)): Path<(PostId, CommentId)>,
) -> Response {
    const SOURCE: &str = "infra::http::comments::edit_form";

    let comment = match state
        .comments
        .edit_target(&user.actor(), post_id, comment_id)
        .await
    {
        Ok(comment) => comment,
        Err(err) => return comment_error_response(SOURCE, err, post_id),
    };
    render_edit(&state, &user, &comment, None, FormErrors::default(), StatusCode::OK).await
}

pub(super) async fn edit(
    State(state): State<HttpState>,
    user: RequireUser,
    Path((post_id, comment_id)): Path<(PostId, CommentId)>,
    Form(form): Form<CommentForm>,
) -> Response {
    const SOURCE: &str = "infra::http::comments::edit";

    let actor = user.actor();
    match state
        .comments
        .update(&actor, post_id, comment_id, &form)
        .await
    {
        Ok(_) => Redirect::to(&post_path(post_id)).into_response(),
        Err(CommentError::Invalid(errors)) => {
            let comment = match state.comments.edit_target(&actor, post_id, comment_id).await {
                Ok(comment) => comment,
                Err(err) => return comment_error_response(SOURCE, err, post_id),
            };
            render_edit(
                &state,
                &user,
                &comment,
                Some(&form),
                errors,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
            .await
        }
        Err(err) => comment_error_response(SOURCE, err, post_id),
    }
}

pub(super) async fn delete_form(
    State(state): State<HttpState>,
    user: RequireUser,
    Path((post_id, comment_id)): Path<(PostId, CommentId)>,
) -> Response {
    const SOURCE: &str = "infra::http::comments::delete_form";

    let comment = match state
        .comments
        .delete_target(&user.actor(), post_id, comment_id)
        .await
    {
        Ok(comment) => comment,
        Err(err) => return comment_error_response(SOURCE, err, post_id),
    };
    let post_title = match state.comments.parent_post(post_id).await {
        Ok(entry) => entry.post.title,
        Err(err) => return comment_error_response(SOURCE, err, post_id),
    };
    let content = CommentFormView::delete(&post_title, &comment);
    let view = LayoutContext::new(user.view(), "Delete comment", content);
    render_template_response(CommentTemplate { view }, StatusCode::OK)
}

pub(super) async fn delete(
    State(state): State<HttpState>,
    user: RequireUser,
    Path((post_id, comment_id)): Path<(PostId, CommentId)>,
) -> Response {
    const SOURCE: &str = "infra::http::comments::delete";

    match state
        .comments
        .delete(&user.actor(), post_id, comment_id)
        .await
    {
        Ok(()) => Redirect::to(&post_path(post_id)).into_response(),
        Err(err) => comment_error_response(SOURCE, err, post_id),
    }
}

async fn render_edit(
    state: &HttpState,
    user: &RequireUser,
    comment: &CommentRecord,
    form: Option<&CommentForm>,
    errors: FormErrors,
    status: StatusCode,
) -> Response {
    const SOURCE: &str = "infra::http::comments::render_edit";

    let post_title = match state.comments.parent_post(comment.post_id).await {
        Ok(entry) => entry.post.title,
        Err(err) => return comment_error_response(SOURCE, err, comment.post_id),
    };
    let content = CommentFormView::edit(&post_title, comment, form, errors);
    let view = LayoutContext::new(user.view(), "Edit comment", content);
    render_template_response(CommentTemplate { view }, status)
}

fn comment_error_response(source: &'static str, err: CommentError, post_id: PostId) -> Response {
    match err {
        CommentError::Denied(denied) => denied_response(source, &denied, post_id),
        CommentError::PostNotFound(_) | CommentError::NotFound { .. } => {
            HttpError::not_found(source, &err).into_response()
        }
        CommentError::Invalid(_) => HttpError::from_error(
            source,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Request could not be processed",
            &err,
        )
        .into_response(),
        CommentError::Repo(err) => HttpError::from(err).into_response(),
    }
}
