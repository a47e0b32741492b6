//! Search domain construction
//!
//! Odoo expresses search domains as a flat, prefix-notation list mixing
//! combinator tokens and `[field, operator, value]` triples. This module
//! provides the typed vocabulary ([`Filter`], [`CompareType`],
//! [`BooleanOperator`]) and the builder that turns it into the wire shape
//! together with the per-call options mapping.

pub mod builder;
pub mod filters;

pub use builder::{
    Options, apply_active_filter, explode_filter, set_fields, set_language, set_order,
    set_pagination,
};
pub use filters::{ActiveStatusChoice, BooleanOperator, CompareType, Filter, FilterItem};
