//! Search service
//!
//! Caller-facing operations: resolves the realm, parses filters into terms
//! and runs the matching repository query.

use super::assembler::SearchOptions;
use super::entity::{IndexResponse, OrderDirection, Page, SearchHit, SearchResponse};
use super::parser::{parse_multi, parse_single};
use super::repository::PrincipalSearchRepository;
use super::repository_trait::PrincipalSearchRepositoryTrait;
use super::request::{Filters, IndexRequest, RequestDefaults, SearchRequest};
use super::term::{DefaultField, FieldCategory, classify};
use crate::domain::directory::{Principal, Realm};
use crate::error::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};

/// Principal search over one directory
#[derive(Debug, Clone)]
pub struct SearchService<R = PrincipalSearchRepository> {
    repository: R,
    defaults: RequestDefaults,
}

impl SearchService<PrincipalSearchRepository> {
    /// Create a service with default options
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_options(pool, SearchOptions::default(), RequestDefaults::default())
    }

    pub fn with_options(pool: SqlitePool, options: SearchOptions, defaults: RequestDefaults) -> Self {
        Self::from_repository(PrincipalSearchRepository::with_options(pool, options), defaults)
    }
}

impl<R: PrincipalSearchRepositoryTrait> SearchService<R> {
    pub fn from_repository(repository: R, defaults: RequestDefaults) -> Self {
        Self {
            repository,
            defaults,
        }
    }

    /// Get the underlying repository
    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    /// Resolve a realm by id or name
    pub async fn realm(&self, name_or_id: &str) -> Result<Realm> {
        self.repository.find_realm(name_or_id).await
    }

    /// Number of distinct principals matching `filters`
    pub async fn count_principals(&self, realm: &str, filters: &Filters) -> Result<i64> {
        let realm = self.realm(realm).await?;
        self.repository.count(&realm.id, &parse_multi(filters)).await
    }

    /// Matching principals, one entry per listed row
    pub async fn list_principals(
        &self,
        realm: &str,
        filters: &Filters,
        page: Page,
        order_by: &str,
        direction: OrderDirection,
    ) -> Result<Vec<Principal>> {
        let hits = self
            .list_hits(realm, filters, page, order_by, direction)
            .await?;
        Ok(hits.into_iter().map(|hit| hit.principal).collect())
    }

    /// Matching principals together with the value each row was sorted by
    pub async fn list_hits(
        &self,
        realm: &str,
        filters: &Filters,
        page: Page,
        order_by: &str,
        direction: OrderDirection,
    ) -> Result<Vec<SearchHit>> {
        let realm = self.realm(realm).await?;
        self.repository
            .list(&realm.id, &parse_multi(filters), order_by, direction, page)
            .await
    }

    /// Search with one literal value per field, ordered by username
    pub async fn search_single(
        &self,
        realm: &str,
        fields: &HashMap<String, String>,
        page: Page,
    ) -> Result<Vec<Principal>> {
        let realm = self.realm(realm).await?;
        let hits = self
            .repository
            .list(
                &realm.id,
                &parse_single(fields),
                DefaultField::Username.as_str(),
                OrderDirection::Asc,
                page,
            )
            .await?;
        Ok(hits.into_iter().map(|hit| hit.principal).collect())
    }

    /// Distinct values of `label` among principals matching `filters`
    pub async fn index(
        &self,
        realm: &str,
        label: &str,
        value_pattern: &str,
        filters: &Filters,
        page: Page,
        direction: OrderDirection,
    ) -> Result<Vec<String>> {
        let realm = self.realm(realm).await?;
        self.repository
            .index(
                &realm.id,
                &parse_multi(filters),
                label,
                value_pattern,
                direction,
                page,
            )
            .await
    }

    /// Number of distinct values `index` would return
    pub async fn index_count(
        &self,
        realm: &str,
        label: &str,
        value_pattern: &str,
        filters: &Filters,
    ) -> Result<i64> {
        let realm = self.realm(realm).await?;
        self.repository
            .index_count(&realm.id, &parse_multi(filters), label, value_pattern)
            .await
    }

    /// Count, then fetch the requested page unless nothing matched
    pub async fn search(&self, realm: &str, request: &SearchRequest) -> Result<SearchResponse> {
        let realm = self.realm(realm).await?;
        let terms = parse_multi(&request.filters);

        let total_size = self.repository.count(&realm.id, &terms).await?;
        let principals = if total_size == 0 {
            debug!(realm = %realm.name, "No principals matched, skipping list query");
            Vec::new()
        } else {
            self.repository
                .list(
                    &realm.id,
                    &terms,
                    &request.order_by,
                    request.direction,
                    request.page,
                )
                .await?
                .into_iter()
                .map(|hit| hit.principal)
                .collect()
        };

        info!(
            realm = %realm.name,
            terms = terms.len(),
            total = total_size,
            returned = principals.len(),
            "Principal search completed"
        );

        Ok(SearchResponse {
            total_size,
            principals,
        })
    }

    /// Count distinct values, then fetch the requested page unless empty
    pub async fn index_page(&self, realm: &str, request: &IndexRequest) -> Result<IndexResponse> {
        let realm = self.realm(realm).await?;
        let terms = parse_multi(&request.filters);

        let total_size = self
            .repository
            .index_count(&realm.id, &terms, &request.label, &request.value_pattern)
            .await?;
        let values = if total_size == 0 {
            Vec::new()
        } else {
            self.repository
                .index(
                    &realm.id,
                    &terms,
                    &request.label,
                    &request.value_pattern,
                    request.direction,
                    request.page,
                )
                .await?
        };

        info!(
            realm = %realm.name,
            label = %request.label,
            total = total_size,
            returned = values.len(),
            "Index lookup completed"
        );

        Ok(IndexResponse { total_size, values })
    }

    /// How `label` is resolved against the directory
    pub fn classify(&self, label: &str) -> FieldCategory {
        classify(label)
    }

    /// Service banner
    pub fn info(&self) -> String {
        format!(
            "dirsearch {}: principal search over attributes and groups",
            env!("CARGO_PKG_VERSION")
        )
    }
}
