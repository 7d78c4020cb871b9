//! Bearer tokens (HS256 JWT) issued at login and checked on WebSocket upgrade.

use std::{sync::Arc, time::Duration};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use yakata_shared::time::{Clock, SystemClock};

use crate::domain::{AuthError, Authenticator, TokenIssuer, User, UserId};

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: String,
    /// Display name
    name: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer tokens with a shared secret.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtTokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self::with_clock(secret, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            clock,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let iat = self.clock.now_secs();
        let ttl = i64::try_from(self.ttl.as_secs()).map_err(|e| AuthError::Issue(e.to_string()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            iat,
            exp: iat.saturating_add(ttl),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Issue(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<User, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let id = UserId::parse(&data.claims.sub)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(User::new(id, data.claims.name))
    }
}

impl TokenIssuer for JwtTokenService {
    fn issue(&self, user: &User) -> Result<String, AuthError> {
        JwtTokenService::issue(self, user)
    }
}

impl Authenticator for JwtTokenService {
    fn authenticate(&self, bearer: Option<&str>) -> Result<User, AuthError> {
        match bearer {
            Some(token) if !token.is_empty() => self.verify(token),
            _ => Err(AuthError::MissingToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yakata_shared::time::FixedClock;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[test]
    fn test_issue_then_authenticate() {
        // テスト項目: 発行したトークンで認証するとユーザーが復元される
        // given (前提条件):
        let service = JwtTokenService::new("secret", DAY);
        let user = User::new(UserId::generate(), "alice");

        // when (操作):
        let token = service.issue(&user).unwrap();
        let result = service.authenticate(Some(&token));

        // then (期待する結果):
        assert_eq!(result, Ok(user));
    }

    #[test]
    fn test_missing_token() {
        // テスト項目: トークンが無い場合は MissingToken エラー
        // given (前提条件):
        let service = JwtTokenService::new("secret", DAY);

        // when (操作):
        let none = service.authenticate(None);
        let empty = service.authenticate(Some(""));

        // then (期待する結果):
        assert_eq!(none, Err(AuthError::MissingToken));
        assert_eq!(empty, Err(AuthError::MissingToken));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        // テスト項目: 別のシークレットで署名されたトークンは拒否される
        // given (前提条件):
        let issuer = JwtTokenService::new("secret-a", DAY);
        let verifier = JwtTokenService::new("secret-b", DAY);
        let token = issuer
            .issue(&User::new(UserId::generate(), "mallory"))
            .unwrap();

        // when (操作):
        let result = verifier.authenticate(Some(&token));

        // then (期待する結果):
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // テスト項目: 有効期限切れのトークンは拒否される
        // given (前提条件): 2001 年に 1 時間有効で発行されたトークン
        let service = JwtTokenService::with_clock(
            "secret",
            Duration::from_secs(3600),
            Arc::new(FixedClock::new(1_000_000_000)),
        );
        let token = service
            .issue(&User::new(UserId::generate(), "alice"))
            .unwrap();

        // when (操作):
        let result = service.verify(&token);

        // then (期待する結果):
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }
}
