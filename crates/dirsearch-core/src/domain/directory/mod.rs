//! Directory domain module
//!
//! Realms, principals, EAV attributes and groups, plus the store and JSON
//! fixtures used to populate them.

pub mod entity;
pub mod fixture;
pub mod repository;

pub use entity::{Group, NewPrincipal, Principal, Realm};
pub use fixture::{DirectoryFixture, ImportResult, PrincipalFixture, RealmFixture};
pub use repository::DirectoryStore;
