//! Dirsearch Core Library
//!
//! This crate provides the core functionality for dirsearch, including:
//! - Search terms and field classification (built-in, group, attribute)
//! - Predicate compilation and statement assembly
//! - Principal search, count and distinct-value index
//! - Storage (SQLite with versioned migrations)
//! - Directory fixtures for loading realms, principals and groups

pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::directory::{DirectoryFixture, DirectoryStore, Principal, Realm};
    pub use crate::domain::search::{
        FieldCategory, Filters, IndexRequest, IndexResponse, OrderDirection, Page, SearchRequest,
        SearchResponse, SearchService,
    };
    pub use crate::error::{Error, Result};
    pub use crate::storage::Database;
}
