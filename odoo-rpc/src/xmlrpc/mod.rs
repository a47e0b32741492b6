//! Minimal XML-RPC wire codec
//!
//! Only the subset Odoo speaks: `<methodCall>` documents going out,
//! `<methodResponse>` documents (including `<fault>`) coming back.

pub mod decode;
pub mod encode;

pub use decode::method_response;
pub use encode::method_call;
