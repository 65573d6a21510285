use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::application::{
    accounts::AccountError,
    error::HttpError,
    forms::{FormErrors, LoginForm, ProfileForm, RegistrationForm},
};
use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    LayoutContext, LoginTemplate, LoginView, ProfileFormTemplate, ProfileFormView,
    RegistrationTemplate, RegistrationView, render_template_response,
};

use super::{
    HttpState, profile_path,
    session::{
        RequireUser, SESSION_COOKIE, Viewer, clear_session_cookie, safe_next, session_cookie,
    },
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginQuery {
    next: String,
}

pub(super) async fn registration_form(viewer: Viewer) -> Response {
    render_registration(
        &viewer,
        &RegistrationForm::default(),
        FormErrors::default(),
        StatusCode::OK,
    )
}

/// Create the account and sign it in straight away.
pub(super) async fn register(
    State(state): State<HttpState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<RegistrationForm>,
) -> Response {
    match state.accounts.register(&form).await {
        Ok(user) => sign_in(&state, jar, &user, None).await,
        Err(AccountError::Invalid(errors)) => render_registration(
            &viewer,
            &form,
            errors,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn login_form(viewer: Viewer, Query(query): Query<LoginQuery>) -> Response {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    render_login(&viewer, &form, false, StatusCode::OK)
}

pub(super) async fn login(
    State(state): State<HttpState>,
    viewer: Viewer,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.accounts.authenticate(&form).await {
        Ok(user) => sign_in(&state, jar, &user, safe_next(&form.next)).await,
        Err(AccountError::InvalidCredentials | AccountError::Invalid(_)) => {
            render_login(&viewer, &form, true, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.sessions.end(cookie.value()).await
    {
        return HttpError::from(err).into_response();
    }
    (clear_session_cookie(jar), Redirect::to("/")).into_response()
}

pub(super) async fn edit_profile_form(user: RequireUser) -> Response {
    let content = ProfileFormView::from_user(&user.0);
    let view = LayoutContext::new(user.view(), "Edit profile", content);
    render_template_response(ProfileFormTemplate { view }, StatusCode::OK)
}

pub(super) async fn edit_profile(
    State(state): State<HttpState>,
    user: RequireUser,
    Form(form): Form<ProfileForm>,
) -> Response {
    match state.accounts.update_profile(&user.actor(), &form).await {
        Ok(updated) => Redirect::to(&profile_path(&updated.username)).into_response(),
        Err(AccountError::Invalid(errors)) => {
            let content = ProfileFormView { form, errors };
            let view = LayoutContext::new(user.view(), "Edit profile", content);
            render_template_response(
                ProfileFormTemplate { view },
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn sign_in(
    state: &HttpState,
    jar: CookieJar,
    user: &UserRecord,
    next: Option<&str>,
) -> Response {
    let issued = match state.sessions.start(user.id).await {
        Ok(issued) => issued,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let cookie = session_cookie(issued.token, state.sessions.ttl(), state.secure_cookie);
    let target = next.map_or_else(|| profile_path(&user.username), str::to_string);
    (jar.add(cookie), Redirect::to(&target)).into_response()
}

fn render_registration(
    viewer: &Viewer,
    form: &RegistrationForm,
    errors: FormErrors,
    status: StatusCode,
) -> Response {
    let content = RegistrationView::new(form, errors);
    let view = LayoutContext::new(viewer.view(), "Sign up", content);
    render_template_response(RegistrationTemplate { view }, status)
}

fn render_login(viewer: &Viewer, form: &LoginForm, failed: bool, status: StatusCode) -> Response {
    let content = LoginView::new(form, failed);
    let view = LayoutContext::new(viewer.view(), "Log in", content);
    render_template_response(LoginTemplate { view }, status)
}
