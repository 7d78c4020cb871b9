//! Password hashing with Argon2id (PHC string format).

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a password into a PHC string.
///
/// The 16-byte salt comes from a random v4 UUID.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a PHC string produced by [`hash_password`].
pub fn verify_password(password: &str, phc: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(phc).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::MalformedHash(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        // テスト項目: ハッシュ化したパスワードは同じパスワードで検証に成功し、別のパスワードでは失敗する
        // given (前提条件):
        let phc = hash_password("hunter2").unwrap();

        // when (操作):
        let ok = verify_password("hunter2", &phc).unwrap();
        let wrong = verify_password("hunter3", &phc).unwrap();

        // then (期待する結果):
        assert!(ok);
        assert!(!wrong);
        assert!(phc.starts_with("$argon2id$"));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        // テスト項目: 同じパスワードでもソルトが異なるためハッシュは一致しない
        // given (前提条件):
        let password = "secret";

        // when (操作):
        let first = hash_password(password).unwrap();
        let second = hash_password(password).unwrap();

        // then (期待する結果):
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_malformed_hash() {
        // テスト項目: 不正な形式のハッシュはエラーになる
        // given (前提条件):
        let phc = "plaintext";

        // when (操作):
        let result = verify_password("secret", phc);

        // then (期待する結果):
        assert!(matches!(result, Err(PasswordError::MalformedHash(_))));
    }
}
