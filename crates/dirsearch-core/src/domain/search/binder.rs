//! Parameter binding for compiled predicates

use super::predicate::{name_param, value_param};
use super::sql::Bindings;
use super::term::{FieldCategory, SearchTermMap, classify, fold_case};

/// Bind every term's values under the placeholder names the compiler emits.
///
/// Values are case-folded; attribute names are bound verbatim because they
/// are matched exactly.
pub fn bind_terms(terms: &SearchTermMap) -> Bindings {
    let mut bindings = Bindings::new();

    for (key, term) in terms.iter() {
        if term.is_empty() {
            continue;
        }

        let category = classify(&term.label);
        if let FieldCategory::Attribute(name) = &category {
            bindings.text(name_param(key), name.as_str());
        }
        for (i, value) in term.values.iter().enumerate() {
            bindings.text(value_param(key, &category, i), fold_case(value));
        }
    }

    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::sql::SqlValue;
    use crate::domain::search::term::SearchTerm;

    fn text(bindings: &Bindings, name: &str) -> Option<String> {
        bindings
            .get(name)
            .and_then(SqlValue::as_text)
            .map(str::to_string)
    }

    #[test]
    fn test_default_and_group_values_are_lowercased() {
        let mut terms = SearchTermMap::new();
        terms.insert("username0", SearchTerm::new("username", vec!["Alice".into()]));
        terms.insert(
            "group0",
            SearchTerm::new("group", vec!["Admins".into(), "SUPPORT".into()]),
        );

        let bindings = bind_terms(&terms);
        assert_eq!(bindings.len(), 3);
        assert_eq!(text(&bindings, "username00").as_deref(), Some("alice"));
        assert_eq!(text(&bindings, "group00").as_deref(), Some("admins"));
        assert_eq!(text(&bindings, "group01").as_deref(), Some("support"));
    }

    #[test]
    fn test_attribute_name_is_verbatim() {
        let mut terms = SearchTermMap::new();
        terms.insert(
            "HomeCity0",
            SearchTerm::new("HomeCity", vec!["Saint Petersburg".into()]),
        );

        let bindings = bind_terms(&terms);
        assert_eq!(text(&bindings, "HomeCity0Name").as_deref(), Some("HomeCity"));
        assert_eq!(
            text(&bindings, "HomeCity0Value0").as_deref(),
            Some("saint petersburg")
        );
    }

    #[test]
    fn test_wildcards_pass_through() {
        let mut terms = SearchTermMap::new();
        terms.insert("email0", SearchTerm::new("email", vec!["%@Example.COM".into()]));

        let bindings = bind_terms(&terms);
        assert_eq!(text(&bindings, "email00").as_deref(), Some("%@example.com"));
    }

    #[test]
    fn test_empty_terms_are_skipped() {
        let mut terms = SearchTermMap::new();
        terms.insert("city0", SearchTerm::new("city", vec![]));

        assert!(bind_terms(&terms).is_empty());
    }
}
