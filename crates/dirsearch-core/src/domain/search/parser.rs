//! Parsing of raw caller filters into search terms

use super::term::{SearchTerm, SearchTermMap};

/// Literal token separating OR-alternatives inside one value: `admin||guest`
pub const VALUE_OR_DELIMITER: &str = "||";

/// Parse `field -> value` filters.
///
/// Every non-empty value becomes one single-valued term keyed `field0`. Values
/// are taken literally: `a||b` stays one value.
pub fn parse_single<I, K, V>(fields: I) -> SearchTermMap
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut result = SearchTermMap::new();

    for (field, value) in fields {
        let (field, value) = (field.as_ref(), value.as_ref());
        if value.is_empty() {
            continue;
        }
        insert_unique(
            &mut result,
            field,
            0,
            SearchTerm::new(field, vec![value.to_string()]),
        );
    }

    result
}

/// Parse `field -> [value, ...]` filters.
///
/// Each list slot `i` becomes an independent term keyed `field{i}`; the slot's
/// value is split on [`VALUE_OR_DELIMITER`] into OR-alternatives.
pub fn parse_multi<I, K, L, V>(fields: I) -> SearchTermMap
where
    I: IntoIterator<Item = (K, L)>,
    K: AsRef<str>,
    L: IntoIterator<Item = V>,
    V: AsRef<str>,
{
    let mut result = SearchTermMap::new();

    for (field, values) in fields {
        let field = field.as_ref();
        for (index, raw) in values.into_iter().enumerate() {
            let alternatives = split_alternatives(raw.as_ref());
            if alternatives.is_empty() {
                continue;
            }
            insert_unique(
                &mut result,
                field,
                index,
                SearchTerm::new(field, alternatives),
            );
        }
    }

    result
}

/// Split one raw value into its non-empty OR-alternatives
pub fn split_alternatives(raw: &str) -> Vec<String> {
    raw.split(VALUE_OR_DELIMITER)
        .filter(|alternative| !alternative.is_empty())
        .map(str::to_string)
        .collect()
}

// `city` slot 10 and `city1` slot 0 would both key as `city10`
fn insert_unique(map: &mut SearchTermMap, field: &str, index: usize, term: SearchTerm) {
    let mut key = format!("{}{}", field, index);
    let mut suffix = 1;
    while map.get(&key).is_some() {
        key = format!("{}{}_{}", field, index, suffix);
        suffix += 1;
    }
    tracing::trace!(key = %key, label = %term.label, values = term.values.len(), "Parsed search term");
    map.insert(key, term);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    fn multi(pairs: Vec<(&str, Vec<&str>)>) -> SearchTermMap {
        let fields: BTreeMap<String, Vec<String>> = pairs
            .into_iter()
            .map(|(k, vs)| (k.to_string(), vs.into_iter().map(String::from).collect()))
            .collect();
        parse_multi(&fields)
    }

    #[test]
    fn test_single_mode_never_splits() {
        let mut fields = HashMap::new();
        fields.insert("username".to_string(), "a||b".to_string());

        let terms = parse_single(&fields);
        assert_eq!(terms.len(), 1);
        let term = terms.get("username0").unwrap();
        assert_eq!(term.values, vec!["a||b".to_string()]);
        assert!(term.is_default_label);
    }

    #[test]
    fn test_single_mode_drops_empty_values() {
        let mut fields = HashMap::new();
        fields.insert("email".to_string(), String::new());
        fields.insert("city".to_string(), "Moscow".to_string());

        let terms = parse_single(&fields);
        assert_eq!(terms.len(), 1);
        assert!(terms.get("email0").is_none());
        assert!(!terms.get("city0").unwrap().is_default_label);
    }

    #[test]
    fn test_multi_mode_splits_on_delimiter() {
        let terms = multi(vec![("username", vec!["a||b"])]);
        assert_eq!(
            terms.get("username0").unwrap().values,
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_multi_mode_delimiter_is_literal() {
        let terms = multi(vec![("city", vec!["a|b", "x|||y"])]);
        assert_eq!(terms.get("city0").unwrap().values, vec!["a|b".to_string()]);
        assert_eq!(
            terms.get("city1").unwrap().values,
            vec!["x".to_string(), "|y".to_string()]
        );
    }

    #[test]
    fn test_multi_mode_keys_follow_list_position() {
        let terms = multi(vec![("role", vec!["admin||support", "", "enabled"])]);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms.get("role0").unwrap().values.len(), 2);
        assert!(terms.get("role1").is_none());
        assert_eq!(
            terms.get("role2").unwrap().values,
            vec!["enabled".to_string()]
        );
    }

    #[test]
    fn test_multi_mode_drops_empty_alternatives() {
        let terms = multi(vec![("city", vec!["Moscow||", "||"])]);
        assert_eq!(terms.len(), 1);
        assert_eq!(
            terms.get("city0").unwrap().values,
            vec!["Moscow".to_string()]
        );
    }

    #[test]
    fn test_empty_input_yields_empty_map() {
        let fields: HashMap<String, Vec<String>> = HashMap::new();
        assert!(parse_multi(&fields).is_empty());

        let fields: HashMap<String, String> = HashMap::new();
        assert!(parse_single(&fields).is_empty());
    }

    #[test]
    fn test_colliding_keys_stay_unique() {
        let slots: Vec<&str> = (0..11).map(|_| "x").collect();
        let terms = multi(vec![("city", slots), ("city1", vec!["y"])]);
        assert_eq!(terms.len(), 12);
        let city1: Vec<_> = terms
            .iter()
            .filter(|(_, term)| term.label == "city1")
            .collect();
        assert_eq!(city1.len(), 1);
    }
}
