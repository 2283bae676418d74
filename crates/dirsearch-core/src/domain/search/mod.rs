//! Search domain module
//!
//! Filters and sorts principals by built-in fields, EAV attributes and group
//! membership.
//!
//! # Architecture
//!
//! - **Terms**: `SearchTerm`, `SearchTermMap` and the field classifier
//! - **Parser**: raw filters to terms, single-value and multi-value modes
//! - **Predicates**: one realm-scoped subquery per term
//! - **Binder**: named parameter values for compiled predicates
//! - **Assembler**: list, count, index and index count statements
//! - **Repository**: `PrincipalSearchRepository` executes statements
//! - **Service**: `SearchService` resolves realms and pages results
//!
//! # Semantics
//!
//! - Separate slots for one field are AND-combined; `a||b` inside a slot is OR
//! - Matching is case-insensitive `LIKE`, `%` and `_` are wildcards
//! - Sorting by a group or attribute lists one row per joined value
//!
//! # Example
//!
//! ```ignore
//! use dirsearch_core::domain::search::{SearchRequest, SearchService};
//!
//! let service = SearchService::new(pool.clone());
//! let request = SearchRequest::new(service.defaults())
//!     .with_filter("city", "Moscow||Saint Petersburg")
//!     .with_filter("group", "admins");
//! let response = service.search("acme", &request).await?;
//! println!("{} matches", response.total_size);
//! ```

pub mod assembler;
pub mod binder;
pub mod entity;
pub mod parser;
pub mod predicate;
pub mod repository;
pub mod repository_trait;
pub mod request;
pub mod service;
pub mod sql;
pub mod term;

// Re-export main types
pub use assembler::{QueryAssembler, SearchOptions};
pub use binder::bind_terms;
pub use entity::{IndexResponse, OrderDirection, Page, SearchHit, SearchResponse};
pub use parser::{VALUE_OR_DELIMITER, parse_multi, parse_single};
pub use predicate::{Predicate, compile};
pub use repository::PrincipalSearchRepository;
pub use repository_trait::PrincipalSearchRepositoryTrait;
pub use request::{Filters, IndexRequest, RequestDefaults, SearchRequest};
pub use service::SearchService;
pub use sql::{Bindings, BoundStatement, SqlValue, Statement};
pub use term::{DefaultField, FieldCategory, GROUP_FIELD, SearchTerm, SearchTermMap, classify};
