//! Filter vocabulary: comparison operators, boolean combinators and the
//! field/operator/value triple

use crate::value::Value;

/// Comparison operators usable in a search domain
///
/// `as_str` yields the wire token. Several logical names map to the same
/// token on purpose (`Contains` is the readable alias for `Ilike`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareType {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `<`
    Lower,
    /// `<=`
    LowerEq,
    /// `=?`: true when the field is unset, otherwise behaves like `=`
    UnsetOrEqual,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `like`: case-sensitive pattern match, `%` wildcards caller-supplied
    Like,
    /// `not like`
    NotLike,
    /// `ilike`: case-insensitive pattern match
    Ilike,
    /// `not ilike`
    NotIlike,
    /// `=like`: case-sensitive match without implicit wildcards
    LikeCaseSensitive,
    /// `=ilike`: case-insensitive match without implicit wildcards
    IlikeCaseInsensitive,
    /// `ilike`: substring containment, the common search case
    Contains,
    /// `not ilike`
    ContainsNot,
    /// `child_of`: record is below the given one in the hierarchy
    ChildOf,
    /// `parent_of`: record is above the given one in the hierarchy
    ParentOf,
}

impl CompareType {
    /// The token the remote protocol expects for this operator
    pub fn as_str(self) -> &'static str {
        match self {
            CompareType::Equal => "=",
            CompareType::NotEqual => "!=",
            CompareType::Greater => ">",
            CompareType::GreaterEq => ">=",
            CompareType::Lower => "<",
            CompareType::LowerEq => "<=",
            CompareType::UnsetOrEqual => "=?",
            CompareType::In => "in",
            CompareType::NotIn => "not in",
            CompareType::Like => "like",
            CompareType::NotLike => "not like",
            CompareType::Ilike | CompareType::Contains => "ilike",
            CompareType::NotIlike | CompareType::ContainsNot => "not ilike",
            CompareType::LikeCaseSensitive => "=like",
            CompareType::IlikeCaseInsensitive => "=ilike",
            CompareType::ChildOf => "child_of",
            CompareType::ParentOf => "parent_of",
        }
    }
}

/// Boolean combinators, prefix notation
///
/// The combinator precedes its operands in the flattened domain list:
/// `Not` takes the one following term, `And`/`Or` the two following terms
/// (which may themselves be combinator expressions). Arity is not checked
/// anywhere in the library; malformed domains are rejected server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    /// `&`
    And,
    /// `|`
    Or,
    /// `!`
    Not,
}

impl BooleanOperator {
    /// The token the remote protocol expects for this combinator
    pub fn as_str(self) -> &'static str {
        match self {
            BooleanOperator::And => "&",
            BooleanOperator::Or => "|",
            BooleanOperator::Not => "!",
        }
    }
}

/// Whether to filter on the soft-delete `active` flag most models carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActiveStatusChoice {
    /// No active-field predicate is added
    #[default]
    NotSet,
    /// Only active records
    Active,
    /// Only archived records
    Inactive,
    /// Active and archived records alike
    Both,
}

/// One field/operator/value search predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name, dotted paths allowed (`parent_id.name`)
    pub field: String,
    /// Comparison operator
    pub compare_type: CompareType,
    /// Comparison operand
    pub value: Value,
}

impl Filter {
    /// Create a new filter triple
    pub fn new(field: impl Into<String>, compare_type: CompareType, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            compare_type,
            value: value.into(),
        }
    }

    /// Extract the wire triple `[field, operator, value]`
    pub fn explode(&self) -> Value {
        Value::Array(vec![
            Value::from(self.field.as_str()),
            Value::from(self.compare_type.as_str()),
            self.value.clone(),
        ])
    }
}

/// One entry of a search domain: a combinator or a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum FilterItem {
    /// Prefix combinator token
    Operator(BooleanOperator),
    /// Field predicate
    Condition(Filter),
}

impl From<BooleanOperator> for FilterItem {
    fn from(value: BooleanOperator) -> Self {
        FilterItem::Operator(value)
    }
}

impl From<Filter> for FilterItem {
    fn from(value: Filter) -> Self {
        FilterItem::Condition(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tokens() {
        assert_eq!(CompareType::Equal.as_str(), "=");
        assert_eq!(CompareType::NotEqual.as_str(), "!=");
        assert_eq!(CompareType::UnsetOrEqual.as_str(), "=?");
        assert_eq!(CompareType::NotIn.as_str(), "not in");
        assert_eq!(CompareType::LikeCaseSensitive.as_str(), "=like");
        assert_eq!(CompareType::ChildOf.as_str(), "child_of");
    }

    #[test]
    fn test_duplicate_tokens_are_intentional() {
        assert_eq!(CompareType::Contains.as_str(), CompareType::Ilike.as_str());
        assert_eq!(
            CompareType::ContainsNot.as_str(),
            CompareType::NotIlike.as_str()
        );
    }

    #[test]
    fn test_combinator_tokens() {
        assert_eq!(BooleanOperator::And.as_str(), "&");
        assert_eq!(BooleanOperator::Or.as_str(), "|");
        assert_eq!(BooleanOperator::Not.as_str(), "!");
    }

    #[test]
    fn test_filter_explode() {
        let filter = Filter::new("name", CompareType::Contains, "Smith");
        assert_eq!(
            filter.explode(),
            Value::Array(vec![
                Value::from("name"),
                Value::from("ilike"),
                Value::from("Smith"),
            ])
        );
    }
}
