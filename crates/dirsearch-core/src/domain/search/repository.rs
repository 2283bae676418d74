//! Principal search repository
//!
//! Executes assembled statements against the SQLite pool. Statements are
//! plain reads on the pool's connection; nothing is opened or committed.

use super::assembler::{QueryAssembler, SearchOptions};
use super::entity::{OrderDirection, Page, SearchHit};
use super::sql::{BoundStatement, SqlValue};
use super::term::SearchTermMap;
use crate::domain::directory::{Principal, Realm};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteArguments;
use sqlx::{Arguments, Sqlite, SqlitePool};
use tracing::debug;

/// Repository for principal search queries
#[derive(Debug, Clone)]
pub struct PrincipalSearchRepository {
    pool: SqlitePool,
    assembler: QueryAssembler,
}

impl PrincipalSearchRepository {
    /// Create a new repository with default search options
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_options(pool, SearchOptions::default())
    }

    pub fn with_options(pool: SqlitePool, options: SearchOptions) -> Self {
        Self {
            pool,
            assembler: QueryAssembler::new(options),
        }
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn assembler(&self) -> &QueryAssembler {
        &self.assembler
    }

    /// Resolve a realm by id, falling back to its name
    pub async fn find_realm(&self, name_or_id: &str) -> Result<Realm> {
        let realm: Option<Realm> = sqlx::query_as(
            r#"
            SELECT id, name
            FROM realms
            WHERE id = ? OR name = ?
            ORDER BY id = ? DESC
            LIMIT 1
            "#,
        )
        .bind(name_or_id)
        .bind(name_or_id)
        .bind(name_or_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::DatabaseError)?;

        realm.ok_or_else(|| Error::RealmNotFound(name_or_id.to_string()))
    }

    /// Matching principals with their sort keys, ordered and paged
    pub async fn list(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        order_field: &str,
        direction: OrderDirection,
        page: Page,
    ) -> Result<Vec<SearchHit>> {
        let stmt = self
            .assembler
            .list(realm_id, terms, order_field, direction, page)?;
        log_statement("list", &stmt);

        let args = arguments(&stmt.values)?;
        let rows = sqlx::query_as_with::<Sqlite, PrincipalRow, _>(&stmt.sql, args)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::DatabaseError)?;

        Ok(rows.into_iter().map(PrincipalRow::into_hit).collect())
    }

    /// Number of distinct matching principals
    pub async fn count(&self, realm_id: &str, terms: &SearchTermMap) -> Result<i64> {
        let stmt = self.assembler.count(realm_id, terms)?;
        log_statement("count", &stmt);
        self.fetch_count(&stmt).await
    }

    /// Distinct values of `label` among matching principals
    pub async fn index(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        label: &str,
        value_pattern: &str,
        direction: OrderDirection,
        page: Page,
    ) -> Result<Vec<String>> {
        let stmt = self
            .assembler
            .index(realm_id, terms, label, value_pattern, direction, page)?;
        log_statement("index", &stmt);

        sqlx::query_scalar_with::<Sqlite, String, _>(&stmt.sql, arguments(&stmt.values)?)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::DatabaseError)
    }

    /// Number of distinct values `index` would return
    pub async fn index_count(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        label: &str,
        value_pattern: &str,
    ) -> Result<i64> {
        let stmt = self
            .assembler
            .index_count(realm_id, terms, label, value_pattern)?;
        log_statement("index_count", &stmt);
        self.fetch_count(&stmt).await
    }

    async fn fetch_count(&self, stmt: &BoundStatement) -> Result<i64> {
        sqlx::query_scalar_with::<Sqlite, i64, _>(&stmt.sql, arguments(&stmt.values)?)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::DatabaseError)
    }
}

fn log_statement(kind: &str, stmt: &BoundStatement) {
    debug!(kind, binds = stmt.values.len(), sql = %stmt.sql, "Executing search statement");
}

/// Positional arguments in placeholder order
fn arguments<'q>(values: &[SqlValue]) -> Result<SqliteArguments<'q>> {
    let mut args = SqliteArguments::default();
    for value in values {
        let added = match value {
            SqlValue::Text(text) => args.add(text.clone()),
            SqlValue::Integer(number) => args.add(*number),
        };
        added.map_err(|e| Error::DatabaseError(sqlx::Error::Encode(e)))?;
    }
    Ok(args)
}

#[derive(sqlx::FromRow)]
struct PrincipalRow {
    id: String,
    realm_id: String,
    username: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    enabled: bool,
    created_at: DateTime<Utc>,
    sort_key: Option<String>,
}

impl PrincipalRow {
    fn into_hit(self) -> SearchHit {
        SearchHit {
            principal: Principal {
                id: self.id,
                realm_id: self.realm_id,
                username: self.username,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                enabled: self.enabled,
                created_at: self.created_at,
            },
            sort_key: self.sort_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::{DirectoryStore, NewPrincipal};
    use crate::domain::search::term::SearchTerm;
    use crate::storage::Database;

    async fn create_test_db() -> SqlitePool {
        let db = Database::in_memory()
            .await
            .expect("Failed to create test database");
        db.pool().clone()
    }

    fn single(key: &str, label: &str, value: &str) -> SearchTermMap {
        let mut terms = SearchTermMap::new();
        terms.insert(key, SearchTerm::new(label, vec![value.to_string()]));
        terms
    }

    #[tokio::test]
    async fn test_find_realm_by_name_and_id() {
        let pool = create_test_db().await;
        let store = DirectoryStore::new(pool.clone());
        let realm = store.create_realm("acme").await.unwrap();
        let repo = PrincipalSearchRepository::new(pool);

        assert_eq!(repo.find_realm("acme").await.unwrap(), realm);
        assert_eq!(repo.find_realm(&realm.id).await.unwrap(), realm);

        let err = repo.find_realm("missing").await.unwrap_err();
        assert!(matches!(err, Error::RealmNotFound(_)));
    }

    #[tokio::test]
    async fn test_count_is_realm_scoped() {
        let pool = create_test_db().await;
        let store = DirectoryStore::new(pool.clone());
        let acme = store.create_realm("acme").await.unwrap();
        let other = store.create_realm("other").await.unwrap();
        store
            .create_principal(&acme.id, &NewPrincipal::new("alice"))
            .await
            .unwrap();
        store
            .create_principal(&acme.id, &NewPrincipal::new("bob"))
            .await
            .unwrap();
        store
            .create_principal(&other.id, &NewPrincipal::new("alice"))
            .await
            .unwrap();

        let repo = PrincipalSearchRepository::new(pool);
        assert_eq!(repo.count(&acme.id, &SearchTermMap::new()).await.unwrap(), 2);
        assert_eq!(repo.count(&other.id, &SearchTermMap::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_matches_case_insensitively() {
        let pool = create_test_db().await;
        let store = DirectoryStore::new(pool.clone());
        let realm = store.create_realm("acme").await.unwrap();
        store
            .create_principal(
                &realm.id,
                &NewPrincipal::new("alice").with_email("Alice@Example.com"),
            )
            .await
            .unwrap();
        store
            .create_principal(&realm.id, &NewPrincipal::new("bob").with_email("bob@other.org"))
            .await
            .unwrap();

        let repo = PrincipalSearchRepository::new(pool);
        let hits = repo
            .list(
                &realm.id,
                &single("email0", "email", "%@EXAMPLE.COM"),
                "username",
                OrderDirection::Asc,
                Page::unbounded(),
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].principal.username, "alice");
        assert_eq!(hits[0].sort_key.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_list_pages_in_order() {
        let pool = create_test_db().await;
        let store = DirectoryStore::new(pool.clone());
        let realm = store.create_realm("acme").await.unwrap();
        for name in ["carol", "alice", "dave", "bob"] {
            store
                .create_principal(&realm.id, &NewPrincipal::new(name))
                .await
                .unwrap();
        }

        let repo = PrincipalSearchRepository::new(pool);
        let hits = repo
            .list(
                &realm.id,
                &SearchTermMap::new(),
                "username",
                OrderDirection::Desc,
                Page::new(1, 2),
            )
            .await
            .unwrap();

        let names: Vec<_> = hits.iter().map(|h| h.principal.username.as_str()).collect();
        assert_eq!(names, vec!["carol", "bob"]);
    }

    #[tokio::test]
    async fn test_index_over_usernames() {
        let pool = create_test_db().await;
        let store = DirectoryStore::new(pool.clone());
        let realm = store.create_realm("acme").await.unwrap();
        for name in ["Bob", "alice", "carl"] {
            store
                .create_principal(&realm.id, &NewPrincipal::new(name))
                .await
                .unwrap();
        }

        let repo = PrincipalSearchRepository::new(pool);
        let values = repo
            .index(
                &realm.id,
                &SearchTermMap::new(),
                "username",
                "%",
                OrderDirection::Asc,
                Page::unbounded(),
            )
            .await
            .unwrap();
        assert_eq!(values, vec!["alice", "Bob", "carl"]);

        let count = repo
            .index_count(&realm.id, &SearchTermMap::new(), "username", "%")
            .await
            .unwrap();
        assert_eq!(count, 3);
    }
}
