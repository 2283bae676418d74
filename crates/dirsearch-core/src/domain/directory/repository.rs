//! Directory store
//!
//! Plain inserts and lookups used to populate a directory. Each write runs as
//! its own statement.

use super::entity::{Group, NewPrincipal, Principal, Realm};
use crate::domain::search::term::fold_case;
use crate::error::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

/// Store for realms, principals, attributes and groups
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    pool: SqlitePool,
}

impl DirectoryStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========== Realms ==========

    /// Create a realm with a fresh id
    pub async fn create_realm(&self, name: &str) -> Result<Realm> {
        let realm = Realm::new(name);

        sqlx::query("INSERT INTO realms (id, name) VALUES (?, ?)")
            .bind(&realm.id)
            .bind(&realm.name)
            .execute(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;

        debug!(realm = %realm.name, id = %realm.id, "Created realm");
        Ok(realm)
    }

    pub async fn find_realm_by_name(&self, name: &str) -> Result<Option<Realm>> {
        sqlx::query_as("SELECT id, name FROM realms WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::DatabaseError)
    }

    /// Existing realm by name, created if missing
    pub async fn get_or_create_realm(&self, name: &str) -> Result<Realm> {
        match self.find_realm_by_name(name).await? {
            Some(realm) => Ok(realm),
            None => self.create_realm(name).await,
        }
    }

    /// All realms, by name
    pub async fn list_realms(&self) -> Result<Vec<Realm>> {
        sqlx::query_as("SELECT id, name FROM realms ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::DatabaseError)
    }

    /// Number of principals in a realm
    pub async fn count_principals(&self, realm_id: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM principals WHERE realm_id = ?")
            .bind(realm_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::DatabaseError)
    }

    // ========== Principals ==========

    /// Insert a principal into a realm
    pub async fn create_principal(
        &self,
        realm_id: &str,
        principal: &NewPrincipal,
    ) -> Result<Principal> {
        if principal.username.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".to_string()));
        }

        let created = Principal {
            id: Uuid::new_v4().to_string(),
            realm_id: realm_id.to_string(),
            username: principal.username.clone(),
            email: principal.email.clone(),
            first_name: principal.first_name.clone(),
            last_name: principal.last_name.clone(),
            enabled: principal.enabled,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO principals (
                id, realm_id, username, email, first_name, last_name, enabled, created_at,
                username_lower, email_lower, first_name_lower, last_name_lower
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&created.id)
        .bind(&created.realm_id)
        .bind(&created.username)
        .bind(&created.email)
        .bind(&created.first_name)
        .bind(&created.last_name)
        .bind(created.enabled)
        .bind(created.created_at)
        .bind(fold_case(&created.username))
        .bind(created.email.as_deref().map(fold_case))
        .bind(created.first_name.as_deref().map(fold_case))
        .bind(created.last_name.as_deref().map(fold_case))
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(created)
    }

    /// Attach one name/value attribute row to a principal
    pub async fn add_attribute(&self, principal_id: &str, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO principal_attributes (id, principal_id, name, value, value_lower) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(principal_id)
        .bind(name)
        .bind(value)
        .bind(fold_case(value))
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(())
    }

    // ========== Groups ==========

    /// Create a group in a realm
    pub async fn create_group(&self, realm_id: &str, name: &str) -> Result<Group> {
        let group = Group {
            id: Uuid::new_v4().to_string(),
            realm_id: realm_id.to_string(),
            name: name.to_string(),
        };

        sqlx::query(
            "INSERT INTO principal_groups (id, realm_id, name, name_lower) VALUES (?, ?, ?, ?)",
        )
        .bind(&group.id)
        .bind(&group.realm_id)
        .bind(&group.name)
        .bind(fold_case(&group.name))
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(group)
    }

    pub async fn find_group(&self, realm_id: &str, name: &str) -> Result<Option<Group>> {
        sqlx::query_as("SELECT id, realm_id, name FROM principal_groups WHERE realm_id = ? AND name = ?")
            .bind(realm_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::DatabaseError)
    }

    /// Existing group by name, created if missing
    pub async fn get_or_create_group(&self, realm_id: &str, name: &str) -> Result<Group> {
        match self.find_group(realm_id, name).await? {
            Some(group) => Ok(group),
            None => self.create_group(realm_id, name).await,
        }
    }

    /// Make a principal a member of a group; repeated calls are no-ops
    pub async fn add_membership(&self, principal_id: &str, group_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO group_memberships (principal_id, group_id) VALUES (?, ?)",
        )
        .bind(principal_id)
        .bind(group_id)
        .execute(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn create_test_db() -> SqlitePool {
        let db = Database::in_memory()
            .await
            .expect("Failed to create test database");
        db.pool().clone()
    }

    #[tokio::test]
    async fn test_create_and_list_realms() {
        let store = DirectoryStore::new(create_test_db().await);

        store.create_realm("zeta").await.unwrap();
        let acme = store.create_realm("acme").await.unwrap();

        let realms = store.list_realms().await.unwrap();
        assert_eq!(realms.len(), 2);
        assert_eq!(realms[0], acme);

        let again = store.get_or_create_realm("acme").await.unwrap();
        assert_eq!(again.id, acme.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_in_realm_fails() {
        let store = DirectoryStore::new(create_test_db().await);
        let realm = store.create_realm("acme").await.unwrap();

        store
            .create_principal(&realm.id, &NewPrincipal::new("alice"))
            .await
            .unwrap();
        let err = store
            .create_principal(&realm.id, &NewPrincipal::new("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_empty_username_rejected() {
        let store = DirectoryStore::new(create_test_db().await);
        let realm = store.create_realm("acme").await.unwrap();

        let err = store
            .create_principal(&realm.id, &NewPrincipal::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_writes_case_folded_copies() {
        let pool = create_test_db().await;
        let store = DirectoryStore::new(pool.clone());
        let realm = store.create_realm("acme").await.unwrap();
        let ivan = store
            .create_principal(&realm.id, &NewPrincipal::new("Иван").with_name("Иван", "ПЕТРОВ"))
            .await
            .unwrap();
        store.add_attribute(&ivan.id, "city", "Москва").await.unwrap();
        store.create_group(&realm.id, "Админы").await.unwrap();

        let (username, email, last_name): (String, Option<String>, Option<String>) =
            sqlx::query_as("SELECT username_lower, email_lower, last_name_lower FROM principals")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(username, "иван");
        assert_eq!(email, None);
        assert_eq!(last_name.as_deref(), Some("петров"));

        let value: String = sqlx::query_scalar("SELECT value_lower FROM principal_attributes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(value, "москва");

        let group: String = sqlx::query_scalar("SELECT name_lower FROM principal_groups")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(group, "админы");
    }

    #[tokio::test]
    async fn test_membership_is_idempotent() {
        let pool = create_test_db().await;
        let store = DirectoryStore::new(pool.clone());
        let realm = store.create_realm("acme").await.unwrap();
        let alice = store
            .create_principal(&realm.id, &NewPrincipal::new("alice"))
            .await
            .unwrap();
        let admins = store.get_or_create_group(&realm.id, "admins").await.unwrap();

        store.add_membership(&alice.id, &admins.id).await.unwrap();
        store.add_membership(&alice.id, &admins.id).await.unwrap();

        let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM group_memberships")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(members, 1);
        assert_eq!(store.count_principals(&realm.id).await.unwrap(), 1);
    }
}
