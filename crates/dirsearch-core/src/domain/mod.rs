//! Domain layer
//!
//! Contains the directory model and the principal search logic.

pub mod directory;
pub mod search;
