//! Predicate compilation
//!
//! Every search term compiles to one subquery yielding principal ids. The
//! assembler ANDs them together as `<id> IN (<subquery>)`. One subquery per
//! term keeps two constraints on the same EAV table independent: a single
//! attribute row only carries one name/value pair, so "role matches A and
//! city matches B" cannot be expressed through one join.

use super::sql::SqlWriter;
use super::term::{FieldCategory, SearchTermMap, classify};

/// Placeholder carrying the realm id in every statement
pub const REALM_PARAM: &str = "realmId";

/// Placeholder name for value slot `index` of the term keyed `key`
pub fn value_param(key: &str, category: &FieldCategory, index: usize) -> String {
    match category {
        FieldCategory::Attribute(_) => format!("{}Value{}", key, index),
        FieldCategory::Default(_) | FieldCategory::Group => format!("{}{}", key, index),
    }
}

/// Placeholder name for the attribute name of the term keyed `key`
pub fn name_param(key: &str) -> String {
    format!("{}Name", key)
}

/// One compiled term: a subquery over principal ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub key: String,
    pub category: FieldCategory,
    pub alternatives: usize,
}

impl Predicate {
    /// Placeholder names for the OR-alternatives, in slot order
    pub fn value_params(&self) -> Vec<String> {
        (0..self.alternatives)
            .map(|i| value_param(&self.key, &self.category, i))
            .collect()
    }

    /// Write the subquery (without the surrounding parentheses)
    pub fn render(&self, w: &mut SqlWriter) {
        match &self.category {
            FieldCategory::Default(field) => {
                w.push("SELECT sp.id FROM principals sp WHERE sp.realm_id = ")
                    .placeholder(REALM_PARAM)
                    .push(" AND (");
                self.render_alternatives(w, &format!("sp.{}", field.folded_column()));
            }
            FieldCategory::Group => {
                w.push(
                    "SELECT sm.principal_id FROM group_memberships sm \
                     JOIN principal_groups sg ON sg.id = sm.group_id \
                     WHERE sg.realm_id = ",
                )
                .placeholder(REALM_PARAM)
                .push(" AND (");
                self.render_alternatives(w, "sg.name_lower");
            }
            FieldCategory::Attribute(_) => {
                w.push("SELECT sa.principal_id FROM principal_attributes sa WHERE sa.name = ")
                    .placeholder(name_param(&self.key))
                    .push(" AND (");
                self.render_alternatives(w, "sa.value_lower");
            }
        }
        w.push(")");
    }

    fn render_alternatives(&self, w: &mut SqlWriter, column: &str) {
        for (i, param) in self.value_params().into_iter().enumerate() {
            if i > 0 {
                w.push(" OR ");
            }
            w.push(&format!("{} LIKE ", column)).placeholder(param);
        }
    }
}

/// Compile every non-empty term, in key order
pub fn compile(terms: &SearchTermMap) -> Vec<Predicate> {
    terms
        .iter()
        .filter(|(_, term)| !term.is_empty())
        .map(|(key, term)| Predicate {
            key: key.to_string(),
            category: classify(&term.label),
            alternatives: term.values.len(),
        })
        .collect()
}

/// AND-append `<id_column> IN (<predicate>)` for every predicate
pub fn render_filters(w: &mut SqlWriter, predicates: &[Predicate], id_column: &str) {
    for predicate in predicates {
        w.push(&format!(" AND {} IN (", id_column));
        predicate.render(w);
        w.push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::term::{DefaultField, SearchTerm};

    fn terms(entries: Vec<(&str, &str, Vec<&str>)>) -> SearchTermMap {
        let mut map = SearchTermMap::new();
        for (key, label, values) in entries {
            map.insert(
                key,
                SearchTerm::new(label, values.into_iter().map(String::from).collect()),
            );
        }
        map
    }

    fn render(predicate: &Predicate) -> (String, Vec<String>) {
        let mut w = SqlWriter::new();
        predicate.render(&mut w);
        let statement = w.finish();
        (statement.sql().to_string(), statement.placeholders().to_vec())
    }

    #[test]
    fn test_compile_classifies_each_term() {
        let predicates = compile(&terms(vec![
            ("city0", "city", vec!["moscow"]),
            ("email0", "email", vec!["%@example.com"]),
            ("group0", "group", vec!["admins", "support"]),
        ]));

        assert_eq!(predicates.len(), 3);
        assert_eq!(
            predicates[0].category,
            FieldCategory::Attribute("city".to_string())
        );
        assert_eq!(
            predicates[1].category,
            FieldCategory::Default(DefaultField::Email)
        );
        assert_eq!(predicates[2].category, FieldCategory::Group);
        assert_eq!(predicates[2].alternatives, 2);
    }

    #[test]
    fn test_compile_skips_empty_terms() {
        let mut map = terms(vec![("city0", "city", vec!["moscow"])]);
        map.insert("city1", SearchTerm::new("city", vec![]));

        assert_eq!(compile(&map).len(), 1);
        assert!(compile(&SearchTermMap::new()).is_empty());
    }

    #[test]
    fn test_default_term_shape() {
        let predicates = compile(&terms(vec![("lastName0", "lastName", vec!["a", "b"])]));
        let (sql, params) = render(&predicates[0]);

        assert_eq!(
            sql,
            "SELECT sp.id FROM principals sp WHERE sp.realm_id = ? AND \
             (sp.last_name_lower LIKE ? OR sp.last_name_lower LIKE ?)"
        );
        assert_eq!(params, vec!["realmId", "lastName00", "lastName01"]);
    }

    #[test]
    fn test_group_term_shape() {
        let predicates = compile(&terms(vec![("group0", "group", vec!["admins"])]));
        let (sql, params) = render(&predicates[0]);

        assert!(sql.starts_with("SELECT sm.principal_id FROM group_memberships sm"));
        assert!(sql.contains("WHERE sg.realm_id = ? AND (sg.name_lower LIKE ?)"));
        assert_eq!(params, vec!["realmId", "group00"]);
    }

    #[test]
    fn test_attribute_term_binds_name() {
        let predicates = compile(&terms(vec![(
            "city0",
            "city",
            vec!["Moscow", "Saint Petersburg"],
        )]));
        let (sql, params) = render(&predicates[0]);

        assert_eq!(
            sql,
            "SELECT sa.principal_id FROM principal_attributes sa WHERE sa.name = ? AND \
             (sa.value_lower LIKE ? OR sa.value_lower LIKE ?)"
        );
        assert_eq!(params, vec!["city0Name", "city0Value0", "city0Value1"]);
    }

    #[test]
    fn test_attribute_name_is_never_interpolated() {
        let predicates = compile(&terms(vec![("x0", "x'; DROP TABLE principals; --", vec!["v"])]));
        let (sql, _) = render(&predicates[0]);
        assert!(!sql.contains("DROP"));
    }

    #[test]
    fn test_render_filters_and_combines() {
        let predicates = compile(&terms(vec![
            ("role0", "role", vec!["admin", "support"]),
            ("role1", "role", vec!["enabled"]),
        ]));
        let mut w = SqlWriter::new();
        w.push("WHERE 1");
        render_filters(&mut w, &predicates, "p.id");
        let statement = w.finish();

        assert_eq!(statement.sql().matches(" AND p.id IN (").count(), 2);
        assert_eq!(
            statement.placeholders(),
            ["role0Name", "role0Value0", "role0Value1", "role1Name", "role1Value0"]
        );
    }
}
