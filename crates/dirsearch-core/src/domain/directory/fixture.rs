//! JSON directory fixtures
//!
//! ```json
//! {
//!   "realms": [{
//!     "name": "acme",
//!     "groups": ["admins"],
//!     "principals": [{
//!       "username": "alice",
//!       "email": "alice@example.com",
//!       "attributes": { "city": ["Moscow"] },
//!       "groups": ["admins"]
//!     }]
//!   }]
//! }
//! ```

use super::entity::NewPrincipal;
use super::repository::DirectoryStore;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// A whole directory to load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryFixture {
    #[serde(default)]
    pub realms: Vec<RealmFixture>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmFixture {
    pub name: String,
    /// Groups to create even when nobody is a member
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub principals: Vec<PrincipalFixture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalFixture {
    #[serde(flatten)]
    pub principal: NewPrincipal,
    /// Attribute name to its values, one row per value
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Rows written by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub realms: usize,
    pub principals: usize,
    pub attributes: usize,
    pub groups: usize,
    pub memberships: usize,
}

impl DirectoryFixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write every realm, group, principal, attribute and membership.
    ///
    /// Realms and groups that already exist are reused.
    pub async fn import(&self, store: &DirectoryStore) -> Result<ImportResult> {
        let mut result = ImportResult::default();

        for realm_fixture in &self.realms {
            let realm = store.get_or_create_realm(&realm_fixture.name).await?;
            result.realms += 1;

            let mut groups = BTreeMap::new();
            let declared = realm_fixture.groups.iter();
            let referenced = realm_fixture.principals.iter().flat_map(|p| p.groups.iter());
            for name in declared.chain(referenced) {
                if !groups.contains_key(name) {
                    let group = store.get_or_create_group(&realm.id, name).await?;
                    groups.insert(name.clone(), group.id);
                    result.groups += 1;
                }
            }

            for fixture in &realm_fixture.principals {
                let principal = store.create_principal(&realm.id, &fixture.principal).await?;
                result.principals += 1;

                for (name, values) in &fixture.attributes {
                    for value in values {
                        store.add_attribute(&principal.id, name, value).await?;
                        result.attributes += 1;
                    }
                }

                for name in &fixture.groups {
                    if let Some(group_id) = groups.get(name) {
                        store.add_membership(&principal.id, group_id).await?;
                        result.memberships += 1;
                    }
                }
            }

            info!(
                realm = %realm.name,
                principals = realm_fixture.principals.len(),
                "Imported realm"
            );
        }

        Ok(result)
    }
}
