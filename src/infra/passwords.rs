//! Argon2 password hashing, run on the blocking thread pool.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use tokio::task;

use crate::application::accounts::{PasswordError, PasswordService};

#[derive(Clone)]
pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    fn hash_blocking(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| PasswordError::Hashing(err.to_string()))
    }

    fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed =
            PasswordHash::new(hash).map_err(|err| PasswordError::Hashing(err.to_string()))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

impl Default for Argon2PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasswordService for Argon2PasswordService {
    async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let service = self.clone();
        let password = password.to_owned();
        task::spawn_blocking(move || service.hash_blocking(&password))
            .await
            .map_err(|err| PasswordError::Worker(err.to_string()))?
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let service = self.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        task::spawn_blocking(move || service.verify_blocking(&password, &hash))
            .await
            .map_err(|err| PasswordError::Worker(err.to_string()))?
    }
}
