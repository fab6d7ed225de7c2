use crate::core::errors::QueryError;
use crate::core::types::{CallParams, ExpandedParams, ParamValue};
use std::collections::btree_map::Entry;

/// Marker replaced by an element's 1-based position when a sequence is expanded
pub const INDEX_PLACEHOLDER: char = '#';

/// Flatten call arguments into the wire's string-only key/value form
///
/// Scalars keep their key. A sequence under `InstanceId` becomes
/// `InstanceId.1`, `InstanceId.2`, ...; a key that already carries the
/// placeholder (`Filter.#.Name`) is indexed at the marker instead.
/// Sequence elements may be flat mappings, which add one more path segment
/// per field (`Filter.1.Name`). Deeper nesting has no wire form and is
/// rejected.
pub fn expand(params: &CallParams) -> Result<ExpandedParams, QueryError> {
    let mut expanded = ExpandedParams::new();

    for (key, value) in params {
        match value {
            ParamValue::Scalar(s) => insert_unique(&mut expanded, key.clone(), s.clone())?,
            ParamValue::Sequence(items) => expand_sequence(&mut expanded, key, items)?,
            ParamValue::Map(_) => {
                return Err(QueryError::InvalidParameters(format!(
                    "parameter '{}' is a mapping; wrap it in a sequence to index it",
                    key
                )));
            }
        }
    }

    Ok(expanded)
}

fn indexed_template(key: &str) -> String {
    if key.contains(INDEX_PLACEHOLDER) {
        key.to_string()
    } else {
        format!("{}.{}", key, INDEX_PLACEHOLDER)
    }
}

fn expand_sequence(
    out: &mut ExpandedParams,
    key: &str,
    items: &[ParamValue],
) -> Result<(), QueryError> {
    let template = indexed_template(key);

    for (offset, item) in items.iter().enumerate() {
        let position = offset + 1;
        let indexed_key = template.replacen(INDEX_PLACEHOLDER, &position.to_string(), 1);

        match item {
            ParamValue::Scalar(s) => insert_unique(out, indexed_key, s.clone())?,
            ParamValue::Map(fields) => {
                for (field, value) in fields {
                    let Some(s) = value.as_scalar() else {
                        return Err(QueryError::InvalidParameters(format!(
                            "'{}' element {} field '{}' is a {}; only scalars are allowed there",
                            key,
                            position,
                            field,
                            value.kind()
                        )));
                    };
                    insert_unique(out, format!("{}.{}", indexed_key, field), s.to_string())?;
                }
            }
            ParamValue::Sequence(_) => {
                return Err(QueryError::InvalidParameters(format!(
                    "'{}' element {} is a nested sequence",
                    key, position
                )));
            }
        }
    }

    Ok(())
}

// Inputs are unordered, so a silent overwrite would depend on hash order.
fn insert_unique(out: &mut ExpandedParams, key: String, value: String) -> Result<(), QueryError> {
    match out.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
        Entry::Occupied(slot) => Err(QueryError::InvalidParameters(format!(
            "parameter '{}' is produced more than once",
            slot.key()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn params(entries: Vec<(&str, ParamValue)>) -> CallParams {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_sequence_is_indexed_from_one() {
        let expanded = expand(&params(vec![("InstanceId", vec!["a", "b"].into())])).unwrap();

        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded["InstanceId.1"], "a");
        assert_eq!(expanded["InstanceId.2"], "b");
    }

    #[test]
    fn test_sequence_has_no_gaps_and_keeps_order() {
        let ids: Vec<String> = (0..12).map(|n| format!("i-{:04}", n)).collect();
        let expanded = expand(&params(vec![("InstanceId", ids.clone().into())])).unwrap();

        assert_eq!(expanded.len(), ids.len());
        for (offset, id) in ids.iter().enumerate() {
            assert_eq!(&expanded[&format!("InstanceId.{}", offset + 1)], id);
        }
    }

    #[test]
    fn test_scalar_passes_through_unchanged() {
        let expanded = expand(&params(vec![
            ("ImageId", "ami-123".into()),
            ("MaxCount", 3_u32.into()),
            ("DryRun", false.into()),
        ]))
        .unwrap();

        assert_eq!(expanded["ImageId"], "ami-123");
        assert_eq!(expanded["MaxCount"], "3");
        assert_eq!(expanded["DryRun"], "false");
        assert_eq!(expanded.len(), 3);
    }

    #[test]
    fn test_placeholder_is_expanded_in_place() {
        let expanded = expand(&params(vec![(
            "Filter.1.Value.#",
            vec!["running", "pending"].into(),
        )]))
        .unwrap();

        assert_eq!(expanded["Filter.1.Value.1"], "running");
        assert_eq!(expanded["Filter.1.Value.2"], "pending");
        assert!(!expanded.keys().any(|k| k.contains('#')));
    }

    #[test]
    fn test_only_first_placeholder_is_replaced() {
        let expanded = expand(&params(vec![("A.#.B.#", vec!["x"].into())])).unwrap();
        assert_eq!(expanded["A.1.B.#"], "x");
    }

    #[test]
    fn test_empty_sequence_emits_nothing() {
        let expanded = expand(&params(vec![(
            "InstanceId",
            ParamValue::Sequence(Vec::new()),
        )]))
        .unwrap();
        assert!(expanded.is_empty());
    }

    #[test]
    fn test_mapping_elements_expand_one_level() {
        let mut filter = BTreeMap::new();
        filter.insert("Name".to_string(), ParamValue::from("instance-type"));
        filter.insert("Value.1".to_string(), ParamValue::from("m1.small"));

        let expanded = expand(&params(vec![("Filter", vec![filter].into())])).unwrap();

        assert_eq!(expanded["Filter.1.Name"], "instance-type");
        assert_eq!(expanded["Filter.1.Value.1"], "m1.small");
    }

    #[test]
    fn test_nested_structures_are_rejected() {
        let mut filter = BTreeMap::new();
        filter.insert("Value".to_string(), ParamValue::from(vec!["a"]));
        let nested_in_map = params(vec![("Filter", vec![filter].into())]);
        assert!(matches!(
            expand(&nested_in_map),
            Err(QueryError::InvalidParameters(_))
        ));

        let nested_sequence = params(vec![(
            "Groups",
            ParamValue::Sequence(vec![vec!["a"].into()]),
        )]);
        assert!(matches!(
            expand(&nested_sequence),
            Err(QueryError::InvalidParameters(_))
        ));

        let top_level_map = params(vec![("Placement", ParamValue::Map(BTreeMap::new()))]);
        assert!(matches!(
            expand(&top_level_map),
            Err(QueryError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_colliding_keys_are_rejected() {
        let colliding = params(vec![
            ("InstanceId", vec!["a"].into()),
            ("InstanceId.1", "b".into()),
        ]);

        let err = expand(&colliding).unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameters(msg) if msg.contains("InstanceId.1")));
    }
}
