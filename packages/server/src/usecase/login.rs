//! Login: verify a known user's password, or register an unknown username on
//! the spot, then issue a token.
//!
//! ### Concurrent registration of one username
//! - `add_new_user` on the repository enforces username uniqueness
//! - the losing side verifies its password against the winner's record
//! - so exactly one user is ever persisted per username

use std::sync::Arc;

use crate::{
    domain::{Account, RepositoryError, TokenIssuer, UserRepository, Username},
    infrastructure::auth::{hash_password, verify_password},
};

use super::error::LoginError;

pub struct LoginUseCase {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenIssuer>,
}

impl LoginUseCase {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    /// Log in, registering the username if it is new.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - bearer token
    /// * `Err(LoginError::InvalidCredentials)` - wrong password or unusable input
    /// * `Err(LoginError)` - any other failure
    pub async fn execute(&self, username: String, password: String) -> Result<String, LoginError> {
        let username = Username::new(username).map_err(|_| LoginError::InvalidCredentials)?;
        if password.is_empty() {
            return Err(LoginError::InvalidCredentials);
        }

        // known user
        if let Some(account) = self.users.find_by_username(&username).await? {
            return self.authenticate(account, password).await;
        }

        // new user
        let password_hash = {
            let password = password.clone();
            tokio::task::spawn_blocking(move || hash_password(&password))
                .await
                .map_err(|e| LoginError::Task(e.to_string()))??
        };
        let account = Account::register(username.clone(), password_hash);
        match self.users.add_new_user(account.clone()).await {
            Ok(()) => {
                tracing::info!("Registered new user '{}'", account.username);
                Ok(self.tokens.issue(&account.user())?)
            }
            // lost the race; check against the winner
            Err(RepositoryError::DuplicateUsername(_)) => {
                tracing::debug!("Lost registration race for '{}'", username);
                let account = self
                    .users
                    .find_by_username(&username)
                    .await?
                    .ok_or(LoginError::InvalidCredentials)?;
                self.authenticate(account, password).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn authenticate(&self, account: Account, password: String) -> Result<String, LoginError> {
        let phc = account.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &phc))
            .await
            .map_err(|e| LoginError::Task(e.to_string()))??;
        if !verified {
            tracing::info!("Rejected login for '{}'", account.username);
            return Err(LoginError::InvalidCredentials);
        }
        Ok(self.tokens.issue(&account.user())?)
    }
}
