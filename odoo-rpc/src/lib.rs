//! Typed, synchronous client for the Odoo XML-RPC external API
//!
//! The crate wraps the generic `execute_kw` remote surface in a strongly
//! typed façade: search domains are built from [`Filter`] triples and
//! [`BooleanOperator`] combinators, per-call options (language context,
//! pagination, ordering, field projection) merge without clobbering
//! caller-supplied values, and every CRUD or relationship-editing
//! operation is exactly one blocking round trip.
//!
//! ```no_run
//! use odoo_rpc::{ActiveStatusChoice, CompareType, Filter, FilterItem, Model};
//!
//! # fn main() -> odoo_rpc::Result<()> {
//! let partners = Model::connect(
//!     "res.partner",
//!     "https://odoo.example.com",
//!     "mydb",
//!     "admin",
//!     "secret",
//!     Some("en_GB"),
//! )?;
//! let smiths = partners.filter(
//!     &[FilterItem::from(Filter::new("name", CompareType::Contains, "Smith"))],
//!     ActiveStatusChoice::Active,
//!     Some(&["id", "name", "email"]),
//!     Some(10),
//!     None,
//!     Some("name asc"),
//!     None,
//! )?;
//! for partner in smiths {
//!     println!("{:?}", partner.get("name"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! No logger is installed and no retries are attempted; remote faults
//! surface unmodified through [`Error::Fault`].

pub mod client;
pub mod error;
pub mod model;
pub mod query;
pub mod value;
pub mod xmlrpc;

pub use client::OdooClient;
pub use error::{Error, Result};
pub use model::{FieldCommand, MessageSubType, Model};
pub use query::{
    ActiveStatusChoice, BooleanOperator, CompareType, Filter, FilterItem, Options,
    apply_active_filter, explode_filter,
};
pub use value::{Record, Value};
