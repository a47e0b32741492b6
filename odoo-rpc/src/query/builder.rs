//! Domain explosion and per-call options assembly
//!
//! The merge helpers never clobber caller-supplied keys: an explicit
//! entry in [`Options`] always wins over a derived parameter. The one
//! exception is the language context, which always overwrites
//! `context.lang` (and only that key); the asymmetry mirrors the
//! remote service's observed behavior and is kept deliberately.

use std::collections::BTreeMap;

use crate::query::filters::{ActiveStatusChoice, CompareType, Filter, FilterItem};
use crate::value::Value;

/// Per-call keyword options sent alongside every operation
///
/// Recognized keys are `fields`, `context`, `limit`, `offset`, `order`
/// and `attributes`; unknown keys pass through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options(BTreeMap<String, Value>);

impl Options {
    /// Create an empty options mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any existing value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Set a key only when it is not already present
    pub fn insert_if_absent(&mut self, key: &str, value: impl Into<Value>) {
        if !self.0.contains_key(key) {
            self.0.insert(key.to_string(), value.into());
        }
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Consume into the wire struct for the keyword-arguments slot
    pub fn into_value(self) -> Value {
        Value::Struct(self.0)
    }
}

impl FromIterator<(String, Value)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Convert a domain expression into the nested-list wire format
///
/// Produces a single-element array wrapping, in input order, the
/// combinator token or `[field, operator, value]` triple for each entry.
/// No arity or field validation happens here; garbage passes through and
/// is rejected by the remote side.
pub fn explode_filter(items: &[FilterItem]) -> Value {
    let inner = items
        .iter()
        .map(|item| match item {
            FilterItem::Operator(op) => Value::from(op.as_str()),
            FilterItem::Condition(filter) => filter.explode(),
        })
        .collect();
    Value::Array(vec![Value::Array(inner)])
}

/// Force the language context into the options
///
/// Creates the `context` sub-struct when absent; when present, only the
/// `lang` key is overwritten and sibling context keys are preserved.
/// Idempotent; a `None` language leaves the options untouched. Returns
/// the language that ended up in effect for the call.
pub fn set_language<'a>(options: &mut Options, language: Option<&'a str>) -> Option<&'a str> {
    let language = language?;
    match options.0.get_mut("context") {
        Some(Value::Struct(context)) => {
            context.insert("lang".to_string(), Value::from(language));
        }
        _ => {
            let context: Value = [("lang".to_string(), Value::from(language))]
                .into_iter()
                .collect();
            options.insert("context", context);
        }
    }
    Some(language)
}

/// Fill the field projection when the caller did not set one
pub fn set_fields(options: &mut Options, fields: Option<&[&str]>) {
    if let Some(fields) = fields {
        let projection: Value = fields.iter().map(|field| Value::from(*field)).collect();
        options.insert_if_absent("fields", projection);
    }
}

/// Fill pagination keys; explicit options always beat the parameters
pub fn set_pagination(options: &mut Options, limit: Option<u32>, offset: Option<u32>) {
    if let Some(limit) = limit {
        options.insert_if_absent("limit", limit);
    }
    if let Some(offset) = offset {
        options.insert_if_absent("offset", offset);
    }
}

/// Fill the sort clause when the caller did not set one
pub fn set_order(options: &mut Options, order: Option<&str>) {
    if let Some(order) = order {
        options.insert_if_absent("order", order);
    }
}

/// Append the implicit `active` predicate for the chosen status
pub fn apply_active_filter(expression: &mut Vec<FilterItem>, is_active: ActiveStatusChoice) {
    match is_active {
        ActiveStatusChoice::NotSet => {}
        ActiveStatusChoice::Both => {
            expression.push(FilterItem::Condition(Filter::new(
                "active",
                CompareType::In,
                Value::Array(vec![Value::Bool(true), Value::Bool(false)]),
            )));
        }
        ActiveStatusChoice::Active => {
            expression.push(FilterItem::Condition(Filter::new(
                "active",
                CompareType::Equal,
                true,
            )));
        }
        ActiveStatusChoice::Inactive => {
            expression.push(FilterItem::Condition(Filter::new(
                "active",
                CompareType::Equal,
                false,
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filters::BooleanOperator;

    #[test]
    fn test_explode_preserves_length_and_order() {
        let items = vec![
            FilterItem::from(BooleanOperator::Or),
            FilterItem::from(Filter::new("id", CompareType::Equal, 1)),
            FilterItem::from(Filter::new("id", CompareType::Equal, 2)),
        ];
        let exploded = explode_filter(&items);
        let outer = exploded.as_array().unwrap();
        assert_eq!(outer.len(), 1);
        let inner = outer[0].as_array().unwrap();
        assert_eq!(inner.len(), items.len());
        assert_eq!(inner[0], Value::from("|"));
        assert_eq!(
            inner[1],
            Value::Array(vec![Value::from("id"), Value::from("="), Value::Int(1)])
        );
    }

    #[test]
    fn test_explode_prefix_scenario() {
        // & (name contains Smith) & (! (name contains Ross)) (id != 42)
        let items = vec![
            FilterItem::from(BooleanOperator::And),
            FilterItem::from(Filter::new("name", CompareType::Contains, "Smith")),
            FilterItem::from(BooleanOperator::And),
            FilterItem::from(BooleanOperator::Not),
            FilterItem::from(Filter::new("name", CompareType::Contains, "Ross")),
            FilterItem::from(Filter::new("id", CompareType::NotEqual, 42)),
        ];
        let expected = Value::Array(vec![Value::Array(vec![
            Value::from("&"),
            Value::Array(vec![
                Value::from("name"),
                Value::from("ilike"),
                Value::from("Smith"),
            ]),
            Value::from("&"),
            Value::from("!"),
            Value::Array(vec![
                Value::from("name"),
                Value::from("ilike"),
                Value::from("Ross"),
            ]),
            Value::Array(vec![
                Value::from("id"),
                Value::from("!="),
                Value::Int(42),
            ]),
        ])]);
        assert_eq!(explode_filter(&items), expected);
    }

    #[test]
    fn test_explode_empty_domain() {
        assert_eq!(
            explode_filter(&[]),
            Value::Array(vec![Value::Array(vec![])])
        );
    }

    #[test]
    fn test_set_language_creates_context() {
        let mut options = Options::new();
        assert_eq!(set_language(&mut options, Some("en_GB")), Some("en_GB"));
        assert_eq!(
            options.get("context").and_then(|c| c.get("lang")),
            Some(&Value::from("en_GB"))
        );
    }

    #[test]
    fn test_set_language_only_touches_lang() {
        let mut options = Options::new();
        let context: Value = [
            ("lang".to_string(), Value::from("it_IT")),
            ("tz".to_string(), Value::from("Europe/Rome")),
        ]
        .into_iter()
        .collect();
        options.insert("context", context);
        set_language(&mut options, Some("en_GB"));
        let context = options.get("context").unwrap();
        assert_eq!(context.get("lang"), Some(&Value::from("en_GB")));
        assert_eq!(context.get("tz"), Some(&Value::from("Europe/Rome")));
    }

    #[test]
    fn test_set_language_none_is_noop() {
        let mut options = Options::new();
        assert_eq!(set_language(&mut options, None), None);
        assert_eq!(options, Options::new());
    }

    #[test]
    fn test_pagination_explicit_option_wins() {
        let mut options = Options::new();
        options.insert("limit", 5);
        set_pagination(&mut options, Some(50), Some(0));
        assert_eq!(options.get("limit"), Some(&Value::Int(5)));
        assert_eq!(options.get("offset"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_pagination_unset_parameters_leave_no_keys() {
        let mut options = Options::new();
        set_pagination(&mut options, None, None);
        assert!(!options.contains("limit"));
        assert!(!options.contains("offset"));
    }

    #[test]
    fn test_order_fills_gap_only() {
        let mut options = Options::new();
        set_order(&mut options, Some("name asc"));
        assert_eq!(options.get("order"), Some(&Value::from("name asc")));
        set_order(&mut options, Some("id desc"));
        assert_eq!(options.get("order"), Some(&Value::from("name asc")));
    }

    #[test]
    fn test_fields_projection() {
        let mut options = Options::new();
        set_fields(&mut options, Some(&["id", "name"]));
        assert_eq!(
            options.get("fields"),
            Some(&Value::Array(vec![Value::from("id"), Value::from("name")]))
        );
        set_fields(&mut options, Some(&["street"]));
        // already present, parameter ignored
        assert_eq!(
            options.get("fields"),
            Some(&Value::Array(vec![Value::from("id"), Value::from("name")]))
        );
    }

    #[test]
    fn test_active_filter_variants() {
        let mut expression = Vec::new();
        apply_active_filter(&mut expression, ActiveStatusChoice::NotSet);
        assert!(expression.is_empty());

        apply_active_filter(&mut expression, ActiveStatusChoice::Active);
        assert_eq!(
            expression.last(),
            Some(&FilterItem::from(Filter::new(
                "active",
                CompareType::Equal,
                true
            )))
        );

        apply_active_filter(&mut expression, ActiveStatusChoice::Inactive);
        assert_eq!(
            expression.last(),
            Some(&FilterItem::from(Filter::new(
                "active",
                CompareType::Equal,
                false
            )))
        );

        apply_active_filter(&mut expression, ActiveStatusChoice::Both);
        assert_eq!(
            expression.last(),
            Some(&FilterItem::from(Filter::new(
                "active",
                CompareType::In,
                Value::Array(vec![Value::Bool(true), Value::Bool(false)])
            )))
        );
        assert_eq!(expression.len(), 3);
    }
}
