//! In-memory user repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Account, RepositoryError, User, UserId, UserRepository, Username};

#[derive(Default)]
struct Tables {
    /// Every known identity, with or without credentials
    users: HashMap<UserId, User>,
    /// Accounts keyed by username (the unique index)
    accounts: HashMap<String, Account>,
}

/// In-memory user repository.
///
/// The username index and the user table live behind one lock so that
/// `add_new_user` is an atomic insert-if-absent.
#[derive(Default)]
pub struct InMemoryUserRepository {
    tables: Mutex<Tables>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Account>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.get(username.as_str()).cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(id).cloned())
    }

    async fn add_new_user(&self, account: Account) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let key = account.username.as_str().to_string();
        if tables.accounts.contains_key(&key) {
            return Err(RepositoryError::DuplicateUsername(key));
        }
        tables.users.insert(account.id, account.user());
        tables.accounts.insert(key, account);
        tracing::debug!("Account registered ({} accounts)", tables.accounts.len());
        Ok(())
    }

    async fn add_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.users.entry(user.id).or_insert(user);
        Ok(())
    }

    async fn get_all_users(&self) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn account(name: &str) -> Account {
        Account::register(Username::new(name.to_string()).unwrap(), "hash".to_string())
    }

    #[tokio::test]
    async fn test_add_new_user_and_find() {
        // テスト項目: 登録したアカウントをユーザー名と ID で検索できる
        // given (前提条件):
        let repo = InMemoryUserRepository::new();
        let alice = account("alice");

        // when (操作):
        repo.add_new_user(alice.clone()).await.unwrap();

        // then (期待する結果):
        let found = repo
            .find_by_username(&Username::new("alice".to_string()).unwrap())
            .await
            .unwrap();
        assert_eq!(found, Some(alice.clone()));
        let user = repo.find_by_id(&alice.id).await.unwrap();
        assert_eq!(user, Some(alice.user()));
    }

    #[tokio::test]
    async fn test_add_new_user_rejects_duplicate_username() {
        // テスト項目: 同じユーザー名のアカウントは 2 つ目の登録でエラーになる
        // given (前提条件):
        let repo = InMemoryUserRepository::new();
        repo.add_new_user(account("alice")).await.unwrap();

        // when (操作):
        let result = repo.add_new_user(account("alice")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::DuplicateUsername("alice".to_string()))
        );
        assert_eq!(repo.get_all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_registration_persists_one_user() {
        // テスト項目: 同じユーザー名の同時登録でも永続化されるのは 1 件だけ
        // given (前提条件):
        let repo = Arc::new(InMemoryUserRepository::new());

        // when (操作):
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.add_new_user(account("bob")).await })
            })
            .collect();
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        // then (期待する結果):
        assert_eq!(successes, 1);
        assert_eq!(repo.get_all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_user_is_idempotent() {
        // テスト項目: 同じ ID のユーザーを複数回追加しても 1 件のまま
        // given (前提条件):
        let repo = InMemoryUserRepository::new();
        let user = User::new(UserId::generate(), "carol");

        // when (操作):
        repo.add_user(user.clone()).await.unwrap();
        repo.add_user(user.clone()).await.unwrap();

        // then (期待する結果):
        assert_eq!(repo.get_all_users().await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn test_get_all_users_sorted_by_name() {
        // テスト項目: 全ユーザーが名前順で返される
        // given (前提条件):
        let repo = InMemoryUserRepository::new();
        repo.add_user(User::new(UserId::generate(), "charlie"))
            .await
            .unwrap();
        repo.add_new_user(account("alice")).await.unwrap();
        repo.add_user(User::new(UserId::generate(), "bob"))
            .await
            .unwrap();

        // when (操作):
        let users = repo.get_all_users().await.unwrap();

        // then (期待する結果):
        let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "charlie"]);
    }
}
