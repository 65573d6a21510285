//! Cookie sessions: resolving the viewer and guarding login-only routes.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::application::error::HttpError;
use crate::domain::access::Actor;
use crate::domain::entities::UserRecord;
use crate::presentation::views::ViewerView;

use super::HttpState;

pub const SESSION_COOKIE: &str = "blogicum_session";

/// The signed-in user, inserted into request extensions by [`resolve_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

pub async fn resolve_session(
    State(state): State<HttpState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let mut current = None;
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match state.sessions.resolve(cookie.value()).await {
            Ok(Some(user)) => current = Some(CurrentUser(user)),
            Ok(None) => {}
            Err(err) => return HttpError::from(err).into_response(),
        }
    }

    if let Some(user) = current.clone() {
        request.extensions_mut().insert(user);
    }
    let mut response = next.run(request).await;
    if let Some(user) = current {
        response.extensions_mut().insert(user);
    }
    response
}

/// The requester, signed in or not.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<UserRecord>);

impl Viewer {
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(Actor::from)
    }

    pub fn view(&self) -> ViewerView {
        ViewerView::from_user(self.0.as_ref())
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<CurrentUser>()
                .map(|current| current.0.clone()),
        ))
    }
}

/// A signed-in user. Anonymous requests are sent to the login page with the
/// original path in `next`.
#[derive(Debug, Clone)]
pub struct RequireUser(pub UserRecord);

impl RequireUser {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }

    pub fn view(&self) -> ViewerView {
        ViewerView::from_user(Some(&self.0))
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>() {
            Some(current) => Ok(Self(current.0.clone())),
            None => {
                let target = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str())
                    .unwrap_or("/");
                Err(Redirect::to(&login_redirect(target)).into_response())
            }
        }
    }
}

pub fn login_redirect(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/auth/login/?next={encoded}")
}

/// Only same-site absolute paths are followed after login. Anything that
/// would not survive as a `Location` header value is dropped as well.
pub fn safe_next(next: &str) -> Option<&str> {
    let next = next.trim();
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    let header_safe = next.bytes().all(|byte| byte.is_ascii_graphic());
    (local && header_safe).then_some(next)
}

pub fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(ttl)
        .build()
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
