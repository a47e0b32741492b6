//! Error taxonomy for remote calls
//!
//! The library is a thin pass-through: remote faults surface with their
//! code and message intact, and nothing is retried or reinterpreted.

/// Fault code Odoo raises when a reply contains a value the XML-RPC
/// marshaller cannot encode (a literal None without allow_none).
const NONE_MARSHAL_FAULT_CODE: i32 = 1;
const NONE_MARSHAL_FAULT_MARKER: &str = "cannot marshal None unless allow_none is enabled";

/// Errors raised by the client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A model name is required to build a façade
    #[error("model name was not set")]
    MissingModelName,

    /// `execute_kw` was invoked before `authenticate`
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// The server answered `false` instead of a user id
    #[error("authentication rejected for database {database:?}")]
    AuthenticationFailed {
        /// Database the login was attempted against
        database: String,
    },

    /// HTTP transport failure (connection, TLS, non-2xx status)
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed XML in the response body
    #[error("invalid XML in response: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Structurally valid XML that is not a valid method response
    #[error("malformed method response: {0}")]
    Decode(String),

    /// A reply that decoded fine but does not have the shape the
    /// operation expects (e.g. a non-integer create result)
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// Remote fault, propagated verbatim
    #[error("remote fault {code}: {message}")]
    Fault {
        /// The fault code reported by the server
        code: i32,
        /// The fault message reported by the server
        message: String,
    },
}

impl Error {
    /// Check whether this is the one recoverable fault signature: the
    /// server-side marshaller failing to encode a None reply value.
    ///
    /// Operations taking an `ignore_none_errors` flag suppress exactly
    /// this fault into an empty result; no other fault is ever caught.
    pub fn is_none_marshal_fault(&self) -> bool {
        match self {
            Error::Fault { code, message } => {
                *code == NONE_MARSHAL_FAULT_CODE && message.contains(NONE_MARSHAL_FAULT_MARKER)
            }
            _ => false,
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
