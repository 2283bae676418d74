//! Repository trait for principal search
//!
//! Abstracts statement execution so the service can run against any backend
//! that understands the assembled statements.

use async_trait::async_trait;

use crate::domain::directory::Realm;
use crate::error::Result;

use super::entity::{OrderDirection, Page, SearchHit};
use super::repository::PrincipalSearchRepository;
use super::term::SearchTermMap;

/// Repository trait for principal search
#[async_trait]
pub trait PrincipalSearchRepositoryTrait: Send + Sync {
    /// Resolve a realm by id or name
    async fn find_realm(&self, name_or_id: &str) -> Result<Realm>;

    /// Matching principals with their sort keys
    async fn list(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        order_field: &str,
        direction: OrderDirection,
        page: Page,
    ) -> Result<Vec<SearchHit>>;

    /// Number of distinct matching principals
    async fn count(&self, realm_id: &str, terms: &SearchTermMap) -> Result<i64>;

    /// Distinct values of a field among matching principals
    async fn index(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        label: &str,
        value_pattern: &str,
        direction: OrderDirection,
        page: Page,
    ) -> Result<Vec<String>>;

    /// Number of distinct values `index` would return
    async fn index_count(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        label: &str,
        value_pattern: &str,
    ) -> Result<i64>;
}

#[async_trait]
impl PrincipalSearchRepositoryTrait for PrincipalSearchRepository {
    async fn find_realm(&self, name_or_id: &str) -> Result<Realm> {
        PrincipalSearchRepository::find_realm(self, name_or_id).await
    }

    async fn list(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        order_field: &str,
        direction: OrderDirection,
        page: Page,
    ) -> Result<Vec<SearchHit>> {
        PrincipalSearchRepository::list(self, realm_id, terms, order_field, direction, page).await
    }

    async fn count(&self, realm_id: &str, terms: &SearchTermMap) -> Result<i64> {
        PrincipalSearchRepository::count(self, realm_id, terms).await
    }

    async fn index(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        label: &str,
        value_pattern: &str,
        direction: OrderDirection,
        page: Page,
    ) -> Result<Vec<String>> {
        PrincipalSearchRepository::index(
            self,
            realm_id,
            terms,
            label,
            value_pattern,
            direction,
            page,
        )
        .await
    }

    async fn index_count(
        &self,
        realm_id: &str,
        terms: &SearchTermMap,
        label: &str,
        value_pattern: &str,
    ) -> Result<i64> {
        PrincipalSearchRepository::index_count(self, realm_id, terms, label, value_pattern).await
    }
}
