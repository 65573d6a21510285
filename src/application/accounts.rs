//! Registration, sign-in and profile maintenance.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::forms::{FormErrors, LoginForm, ProfileForm, RegistrationForm};
use crate::application::repos::{CreateUserParams, RepoError, UpdateProfileParams, UsersRepo};
use crate::domain::access::Actor;
use crate::domain::entities::UserRecord;
use crate::infra::telemetry;

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("password worker failed: {0}")]
    Worker(String),
}

/// One-way password hashing. Implementations may be CPU heavy and are
/// expected to keep that work off the async executor.
#[async_trait]
pub trait PasswordService: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String, PasswordError>;

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid submission: {0}")]
    Invalid(FormErrors),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user `{0}` not found")]
    UnknownUser(String),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Requested change to a user's elevated flags; `None` leaves a flag alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrivilegeChange {
    pub staff: Option<bool>,
    pub superuser: Option<bool>,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    passwords: Arc<dyn PasswordService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UsersRepo>, passwords: Arc<dyn PasswordService>) -> Self {
        Self { users, passwords }
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<UserRecord, AccountError> {
        let draft = form.validate().map_err(AccountError::Invalid)?;

        if self
            .users
            .find_user_by_username(&draft.username)
            .await?
            .is_some()
        {
            return Err(duplicate_username());
        }

        let password_hash = self.passwords.hash(&draft.password).await?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username: draft.username,
                first_name: String::new(),
                last_name: String::new(),
                email: draft.email,
                password_hash,
            })
            .await
            .map_err(map_duplicate)?;

        info!(
            target = "blogicum::accounts",
            user_id = user.id,
            username = %user.username,
            "user registered"
        );
        Ok(user)
    }

    pub async fn authenticate(&self, form: &LoginForm) -> Result<UserRecord, AccountError> {
        let username = form.username.trim();
        let user = match self.users.find_user_by_username(username).await? {
            Some(user) => user,
            None => return Err(login_failed(username)),
        };

        if !self.passwords.verify(&form.password, &user.password_hash).await? {
            return Err(login_failed(username));
        }

        Ok(user)
    }

    pub async fn update_profile(
        &self,
        actor: &Actor,
        form: &ProfileForm,
    ) -> Result<UserRecord, AccountError> {
        let draft = form.validate().map_err(AccountError::Invalid)?;

        if let Some(existing) = self.users.find_user_by_username(&draft.username).await?
            && existing.id != actor.id
        {
            return Err(duplicate_username());
        }

        let user = self
            .users
            .update_profile(UpdateProfileParams {
                id: actor.id,
                username: draft.username,
                first_name: draft.first_name,
                last_name: draft.last_name,
                email: draft.email,
            })
            .await
            .map_err(map_duplicate)?;

        info!(
            target = "blogicum::accounts",
            user_id = user.id,
            "profile updated"
        );
        Ok(user)
    }

    pub async fn change_privileges(
        &self,
        username: &str,
        change: PrivilegeChange,
    ) -> Result<UserRecord, AccountError> {
        let user = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AccountError::UnknownUser(username.to_string()))?;

        let is_staff = change.staff.unwrap_or(user.is_staff);
        let is_superuser = change.superuser.unwrap_or(user.is_superuser);
        let updated = self
            .users
            .set_privileges(username, is_staff, is_superuser)
            .await?;

        info!(
            target = "blogicum::accounts",
            user_id = updated.id,
            is_staff = updated.is_staff,
            is_superuser = updated.is_superuser,
            "privileges changed"
        );
        Ok(updated)
    }
}

fn login_failed(username: &str) -> AccountError {
    telemetry::record_login_failure();
    warn!(
        target = "blogicum::accounts",
        username = %username,
        "sign-in rejected"
    );
    AccountError::InvalidCredentials
}

fn duplicate_username() -> AccountError {
    AccountError::Invalid(FormErrors::single("username", DUPLICATE_USERNAME))
}

fn map_duplicate(err: RepoError) -> AccountError {
    match err {
        RepoError::Duplicate { .. } => duplicate_username(),
        other => AccountError::Repo(other),
    }
}
