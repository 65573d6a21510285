mod accounts;
mod comments;
mod middleware;
mod posts;
mod public;
pub mod session;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::application::{
    accounts::AccountService,
    blog::BlogService,
    comments::CommentService,
    error::{ErrorReport, HttpError},
    posts::PostService,
    repos::{HealthRepo, RepoError},
    sessions::SessionService,
};
use crate::domain::access::{AccessDenied, ActionClass};
use crate::domain::entities::PostId;
use crate::infra::telemetry;

pub use session::{CurrentUser, SESSION_COOKIE};

use self::middleware::{log_responses, set_request_context};

/// Everything the handlers share. Cloned per request; the services are
/// immutable and sit behind `Arc`s.
#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub accounts: Arc<AccountService>,
    pub sessions: Arc<SessionService>,
    pub health: Arc<dyn HealthRepo>,
    pub secure_cookie: bool,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(public::index))
        .route("/category/{slug}/", get(public::category))
        .route("/profile/{username}/", get(public::profile))
        .route("/posts/{post_id}/", get(public::detail))
        .route(
            "/posts/create/",
            get(posts::create_form).post(posts::create),
        )
        .route(
            "/posts/{post_id}/edit/",
            get(posts::edit_form).post(posts::edit),
        )
        .route(
            "/posts/{post_id}/delete/",
            get(posts::delete_form).post(posts::delete),
        )
        .route("/posts/{post_id}/comment/", post(comments::add))
        .route(
            "/posts/{post_id}/edit_comment/{comment_id}/",
            get(comments::edit_form).post(comments::edit),
        )
        .route(
            "/posts/{post_id}/delete_comment/{comment_id}/",
            get(comments::delete_form).post(comments::delete),
        )
        .route(
            "/edit_profile/",
            get(accounts::edit_profile_form).post(accounts::edit_profile),
        )
        .route(
            "/auth/registration/",
            get(accounts::registration_form).post(accounts::register),
        )
        .route(
            "/auth/login/",
            get(accounts::login_form).post(accounts::login),
        )
        .route("/auth/logout/", post(accounts::logout))
        .route("/_health/db", get(db_health))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .fallback(fallback)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session::resolve_session,
        ))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn db_health(
    axum::extract::State(state): axum::extract::State<HttpState>,
) -> Response {
    db_health_response(state.health.check().await)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

async fn fallback() -> Response {
    HttpError::new(
        "infra::http::fallback",
        StatusCode::NOT_FOUND,
        "Page not found",
        "no route matched",
    )
    .into_response()
}

/// Edits by someone other than the owner bounce back to the post; deletions
/// are refused outright.
fn denied_response(source: &'static str, denied: &AccessDenied, post_id: PostId) -> Response {
    telemetry::record_permission_denied(denied.action);
    match denied.action.class() {
        ActionClass::Edit => {
            tracing::info!(
                target = "blogicum::http::access",
                actor_id = denied.actor,
                action = denied.action.as_str(),
                post_id = post_id,
                "edit denied, redirecting to post"
            );
            Redirect::to(&post_path(post_id)).into_response()
        }
        ActionClass::Delete => HttpError::forbidden(source, denied).into_response(),
    }
}

fn post_path(post_id: PostId) -> String {
    format!("/posts/{post_id}/")
}

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn profile_path(username: &str) -> String {
    format!("/profile/{}/", utf8_percent_encode(username, PATH_SEGMENT))
}
