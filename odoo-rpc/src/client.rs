//! Transport adapter for the Odoo external API
//!
//! Owns the endpoint, credentials, default language and the
//! authenticated user id. Every call is one synchronous HTTP POST; no
//! retries, no pooling beyond the HTTP client's own connection reuse.
//! Sharing one client across threads while mutating the language or
//! re-authenticating is the caller's responsibility.

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::query::builder::Options;
use crate::value::{Record, Value};
use crate::xmlrpc;

/// Service path for authentication and server metadata
const COMMON_SERVICE: &str = "xmlrpc/2/common";
/// Service path for model method execution
const OBJECT_SERVICE: &str = "xmlrpc/2/object";

/// Connection and session state for one Odoo instance
#[derive(Debug, Clone)]
pub struct OdooClient {
    endpoint: String,
    database: String,
    username: String,
    password: String,
    language: Option<String>,
    uid: Option<i64>,
    http: reqwest::blocking::Client,
}

impl OdooClient {
    /// Create a client for the given instance; no call is made yet
    pub fn new(
        endpoint: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        language: Option<&str>,
    ) -> Self {
        let mut endpoint = endpoint.into();
        while endpoint.ends_with('/') {
            endpoint.pop();
        }
        Self {
            endpoint,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            language: language.map(str::to_string),
            uid: None,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// The normalized endpoint URL (no trailing slash)
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The database this session logs into
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The authenticated user id, if `authenticate` succeeded
    pub fn uid(&self) -> Option<i64> {
        self.uid
    }

    /// The default language applied to translated fields
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Change the default language for subsequent calls
    pub fn set_language(&mut self, language: Option<String>) {
        self.language = language;
    }

    /// Log in and store the user id for subsequent `execute_kw` calls
    ///
    /// Odoo answers `false` for bad credentials; that becomes
    /// [`Error::AuthenticationFailed`] rather than a stored bogus id.
    pub fn authenticate(&mut self) -> Result<i64> {
        let params = vec![
            Value::from(self.database.as_str()),
            Value::from(self.username.as_str()),
            Value::from(self.password.as_str()),
            Value::Struct(Record::new()),
        ];
        let reply = self.call(COMMON_SERVICE, "authenticate", &params)?;
        let uid = reply.as_int().ok_or_else(|| Error::AuthenticationFailed {
            database: self.database.clone(),
        })?;
        debug!("authenticated against {} as uid {uid}", self.database);
        self.uid = Some(uid);
        Ok(uid)
    }

    /// Execute a model method: the single call shape every operation
    /// compiles down to
    pub fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Options,
    ) -> Result<Value> {
        let uid = self.uid.ok_or(Error::NotAuthenticated)?;
        let params = vec![
            Value::from(self.database.as_str()),
            Value::from(uid),
            Value::from(self.password.as_str()),
            Value::from(model),
            Value::from(method),
            Value::Array(args),
            kwargs.into_value(),
        ];
        self.call(OBJECT_SERVICE, "execute_kw", &params)
    }

    /// Perform one XML-RPC round trip against a service path
    fn call(&self, service: &str, method: &str, params: &[Value]) -> Result<Value> {
        let url = format!("{}/{}", self.endpoint, service);
        let body = xmlrpc::method_call(method, params);
        debug!("POST {url} method={method}");
        trace!("request body: {body}");
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()?
            .error_for_status()?;
        let text = response.text()?;
        trace!("response body: {text}");
        xmlrpc::method_response(&text)
    }

    /// Drop the stored user id (the derived session must re-authenticate)
    pub(crate) fn clear_uid(&mut self) {
        self.uid = None;
    }

    #[cfg(test)]
    pub(crate) fn set_uid_for_tests(&mut self, uid: i64) {
        self.uid = Some(uid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_normalized() {
        let client = OdooClient::new("https://odoo.example.com/", "db", "user", "pw", None);
        assert_eq!(client.endpoint(), "https://odoo.example.com");

        let client = OdooClient::new("https://odoo.example.com", "db", "user", "pw", None);
        assert_eq!(client.endpoint(), "https://odoo.example.com");
    }

    #[test]
    fn test_execute_kw_requires_authentication() {
        let client = OdooClient::new("https://odoo.example.com", "db", "user", "pw", None);
        let result = client.execute_kw("res.partner", "read", vec![], Options::new());
        assert!(matches!(result, Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_language_mutation() {
        let mut client =
            OdooClient::new("https://odoo.example.com", "db", "user", "pw", Some("it_IT"));
        assert_eq!(client.language(), Some("it_IT"));
        client.set_language(Some("en_GB".to_string()));
        assert_eq!(client.language(), Some("en_GB"));
        client.set_language(None);
        assert_eq!(client.language(), None);
    }

    #[test]
    fn test_clone_keeps_session_values() {
        let mut client = OdooClient::new("https://odoo.example.com", "db", "user", "pw", None);
        client.set_uid_for_tests(7);
        let mut sibling = client.clone();
        assert_eq!(sibling.uid(), Some(7));
        sibling.clear_uid();
        assert_eq!(sibling.uid(), None);
        assert_eq!(client.uid(), Some(7));
    }
}
