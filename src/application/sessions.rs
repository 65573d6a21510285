use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::{CreateSessionParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserId, UserRecord};

const TOKEN_PREFIX: &str = "bs";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub record: SessionRecord,
    pub token: String,
}

/// Issues and resolves the opaque tokens stored in the session cookie.
///
/// A token has the shape `bs_<prefix>_<secret>`; the prefix locates the row
/// and the secret is compared against its SHA-256 digest.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionsRepo>,
    users: Arc<dyn UsersRepo>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionsRepo>, users: Arc<dyn UsersRepo>, ttl: Duration) -> Self {
        Self {
            sessions,
            users,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn start(&self, user_id: UserId) -> Result<SessionIssued, SessionError> {
        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        let record = self
            .sessions
            .create_session(CreateSessionParams {
                user_id,
                prefix,
                hashed_secret: Self::hash_secret(&secret),
                expires_at: OffsetDateTime::now_utc() + self.ttl,
            })
            .await?;

        tracing::info!(
            target = "blogicum::sessions",
            user_id = user_id,
            session_id = record.id,
            "session started"
        );

        Ok(SessionIssued { record, token })
    }

    /// Resolve a cookie token to its user. Unknown, malformed, expired or
    /// forged tokens all resolve to `None`.
    pub async fn resolve(&self, token: &str) -> Result<Option<UserRecord>, SessionError> {
        let Some(record) = self.lookup(token).await? else {
            return Ok(None);
        };
        Ok(self.users.find_user(record.user_id).await?)
    }

    pub async fn end(&self, token: &str) -> Result<(), SessionError> {
        if let Some(record) = self.lookup(token).await? {
            self.sessions.delete_session(record.id).await?;
            tracing::info!(
                target = "blogicum::sessions",
                user_id = record.user_id,
                session_id = record.id,
                "session ended"
            );
        }
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, SessionError> {
        let removed = self
            .sessions
            .delete_expired_sessions(OffsetDateTime::now_utc())
            .await?;
        Ok(removed)
    }

    async fn lookup(&self, token: &str) -> Result<Option<SessionRecord>, SessionError> {
        let Some(parsed) = Self::parse_token(token) else {
            return Ok(None);
        };
        let Some(record) = self.sessions.find_session_by_prefix(&parsed.prefix).await? else {
            return Ok(None);
        };

        if record.expires_at <= OffsetDateTime::now_utc() {
            return Ok(None);
        }

        let hashed_input = Self::hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Ok(None);
        }

        Ok(Some(record))
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken> {
        let mut parts = token.splitn(3, '_');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if secret.len() < MIN_SECRET_LEN || prefix.is_empty() {
            return None;
        }
        Some(ParsedToken {
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_token_requires_known_tag_and_long_secret() {
        let secret = "a".repeat(MIN_SECRET_LEN);
        let parsed = SessionService::parse_token(&format!("bs_abc_{secret}")).expect("token");
        assert_eq!(parsed.prefix, "abc");
        assert_eq!(parsed.secret, secret);

        assert!(SessionService::parse_token(&format!("sk_abc_{secret}")).is_none());
        assert!(SessionService::parse_token("bs_abc_short").is_none());
        assert!(SessionService::parse_token(&format!("bs__{secret}")).is_none());
        assert!(SessionService::parse_token("garbage").is_none());
    }

    #[test]
    fn generated_parts_fit_the_token_shape() {
        let prefix = SessionService::generate_prefix();
        let secret = SessionService::generate_secret();
        assert_eq!(prefix.len(), 12);
        assert!(!prefix.contains('_'));
        assert!(secret.len() >= MIN_SECRET_LEN);
        assert_eq!(SessionService::hash_secret(&secret).len(), 32);
    }
}
