//! Entity façade: a uniform CRUD and relationship-editing surface for
//! one named remote model
//!
//! A [`Model`] is data-driven: it holds the model name and an owned
//! [`OdooClient`] session, and every operation is one `execute_kw`
//! round trip built from the query module's output. Remote faults pass
//! through untouched; the only suppressible condition is the
//! none-marshal fault, and only where an `ignore_none_errors` flag is
//! explicitly set.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::client::OdooClient;
use crate::error::{Error, Result};
use crate::query::builder::{
    Options, apply_active_filter, explode_filter, set_fields, set_language, set_order,
    set_pagination,
};
use crate::query::filters::{ActiveStatusChoice, CompareType, Filter, FilterItem};
use crate::value::{Record, Value};

/// Model holding named external-identifier records
const MODEL_DATA: &str = "ir.model.data";

/// One edit command for a one-to-many or many-to-many field
///
/// The numeric codes, tuple arity and semantics are a fixed protocol
/// contract. `Delete` destroys the linked record, `Remove` only breaks
/// the link; confusing the two is silent and non-recoverable.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCommand {
    /// 0: create a record and link it
    Create(Record),
    /// 1: update an already-linked record
    Update(i64, Record),
    /// 2: unlink and destroy the record
    Delete(i64),
    /// 3: unlink only, the record survives
    Remove(i64),
    /// 4: link an existing record
    Add(i64),
    /// 5: unlink all records
    Clear,
    /// 6: replace all links with the given set
    Replace(Vec<i64>),
}

impl FieldCommand {
    /// The protocol command number
    pub fn code(&self) -> i64 {
        match self {
            FieldCommand::Create(_) => 0,
            FieldCommand::Update(..) => 1,
            FieldCommand::Delete(_) => 2,
            FieldCommand::Remove(_) => 3,
            FieldCommand::Add(_) => 4,
            FieldCommand::Clear => 5,
            FieldCommand::Replace(_) => 6,
        }
    }

    /// The wire triple `[code, id, payload]`
    pub fn explode(self) -> Value {
        let code = Value::Int(self.code());
        let (id, payload) = match self {
            FieldCommand::Create(values) => (Value::Int(0), Value::Struct(values)),
            FieldCommand::Update(id, values) => (Value::Int(id), Value::Struct(values)),
            FieldCommand::Delete(id) | FieldCommand::Remove(id) | FieldCommand::Add(id) => {
                (Value::Int(id), Value::Int(0))
            }
            FieldCommand::Clear => (Value::Int(0), Value::Int(0)),
            FieldCommand::Replace(ids) => (
                Value::Int(0),
                ids.into_iter().map(Value::Int).collect(),
            ),
        };
        Value::Array(vec![code, id, payload])
    }
}

/// Well-known message subtypes, by external identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSubType {
    /// `mail.mt_activities`
    Activities,
    /// `mail.mt_comment`
    Comment,
    /// `mail.mt_note`
    Note,
}

impl MessageSubType {
    /// The full external identifier for this subtype
    pub fn as_str(self) -> &'static str {
        match self {
            MessageSubType::Activities => "mail.mt_activities",
            MessageSubType::Comment => "mail.mt_comment",
            MessageSubType::Note => "mail.mt_note",
        }
    }
}

/// Façade over one remote model
#[derive(Debug)]
pub struct Model {
    name: String,
    client: OdooClient,
    // subtype-to-id mappings are effectively static per instance, so the
    // cache is insert-only and lives as long as the façade
    subtype_cache: Mutex<HashMap<String, i64>>,
}

impl Model {
    /// Wrap an existing session; fails on an empty model name
    pub fn new(model_name: impl Into<String>, client: OdooClient) -> Result<Self> {
        let name = model_name.into();
        if name.is_empty() {
            return Err(Error::MissingModelName);
        }
        Ok(Self {
            name,
            client,
            subtype_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Build a session from connection parameters and authenticate it
    pub fn connect(
        model_name: impl Into<String>,
        endpoint: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        language: Option<&str>,
    ) -> Result<Self> {
        let mut model = Self::new(
            model_name,
            OdooClient::new(endpoint, database, username, password, language),
        )?;
        model.authenticate()?;
        Ok(model)
    }

    /// The remote model name this façade targets
    pub fn model_name(&self) -> &str {
        &self.name
    }

    /// Log in with the session credentials and return the user id
    pub fn authenticate(&mut self) -> Result<i64> {
        self.client.authenticate()
    }

    /// The authenticated user id, if any
    pub fn uid(&self) -> Option<i64> {
        self.client.uid()
    }

    /// The default language applied to translated fields
    pub fn language(&self) -> Option<&str> {
        self.client.language()
    }

    /// Change the default language for subsequent calls
    pub fn set_language(&mut self, language: Option<String>) {
        self.client.set_language(language);
    }

    /// Get one record by id, or None when it does not exist
    pub fn get(
        &self,
        entity_id: i64,
        fields: Option<&[&str]>,
        ignore_none_errors: bool,
    ) -> Result<Option<Record>> {
        let results = self.get_many(&[entity_id], fields, None, ignore_none_errors)?;
        Ok(results.into_iter().next())
    }

    /// Read several records by id
    pub fn get_many(
        &self,
        entity_ids: &[i64],
        fields: Option<&[&str]>,
        options: Option<Options>,
        ignore_none_errors: bool,
    ) -> Result<Vec<Record>> {
        let mut options = options.unwrap_or_default();
        set_fields(&mut options, fields);
        set_language(&mut options, self.client.language());
        let ids: Value = entity_ids.iter().copied().map(Value::Int).collect();
        let reply = self.client.execute_kw(&self.name, "read", vec![ids], options);
        match reply {
            Err(error) if ignore_none_errors && error.is_none_marshal_fault() => Ok(Vec::new()),
            other => records_from(other?),
        }
    }

    /// Get every record of the model
    pub fn all(
        &self,
        is_active: ActiveStatusChoice,
        fields: Option<&[&str]>,
        options: Option<Options>,
    ) -> Result<Vec<Record>> {
        self.filter(&[], is_active, fields, None, None, None, options)
    }

    /// Find records by a set of ids, optionally restricted by active flag
    pub fn find(
        &self,
        entity_ids: &[i64],
        is_active: ActiveStatusChoice,
        fields: Option<&[&str]>,
        options: Option<Options>,
    ) -> Result<Vec<Record>> {
        let ids: Value = entity_ids.iter().copied().map(Value::Int).collect();
        let mut expression = vec![FilterItem::Condition(Filter::new(
            "id",
            CompareType::In,
            ids,
        ))];
        apply_active_filter(&mut expression, is_active);
        let mut options = options.unwrap_or_default();
        set_fields(&mut options, fields);
        set_language(&mut options, self.client.language());
        let reply = self.client.execute_kw(
            &self.name,
            "search_read",
            vec![explode_filter(&expression)],
            options,
        )?;
        records_from(reply)
    }

    /// The general search: filter expression plus merged per-call options
    #[allow(clippy::too_many_arguments)]
    pub fn filter(
        &self,
        expression: &[FilterItem],
        is_active: ActiveStatusChoice,
        fields: Option<&[&str]>,
        limit: Option<u32>,
        offset: Option<u32>,
        order: Option<&str>,
        options: Option<Options>,
    ) -> Result<Vec<Record>> {
        let mut expression = expression.to_vec();
        apply_active_filter(&mut expression, is_active);
        let mut options = options.unwrap_or_default();
        set_fields(&mut options, fields);
        set_pagination(&mut options, limit, offset);
        set_order(&mut options, order);
        set_language(&mut options, self.client.language());
        let reply = self.client.execute_kw(
            &self.name,
            "search_read",
            vec![explode_filter(&expression)],
            options,
        )?;
        records_from(reply)
    }

    /// Like `filter`, returning only the first match
    #[allow(clippy::too_many_arguments)]
    pub fn first(
        &self,
        expression: &[FilterItem],
        is_active: ActiveStatusChoice,
        fields: Option<&[&str]>,
        offset: Option<u32>,
        order: Option<&str>,
        options: Option<Options>,
    ) -> Result<Option<Record>> {
        let results = self.filter(expression, is_active, fields, Some(1), offset, order, options)?;
        Ok(results.into_iter().next())
    }

    /// Like `filter`, returning record ids only
    pub fn search(
        &self,
        expression: &[FilterItem],
        is_active: ActiveStatusChoice,
        limit: Option<u32>,
        offset: Option<u32>,
        order: Option<&str>,
        options: Option<Options>,
    ) -> Result<Vec<i64>> {
        let mut expression = expression.to_vec();
        apply_active_filter(&mut expression, is_active);
        let mut options = options.unwrap_or_default();
        set_pagination(&mut options, limit, offset);
        set_order(&mut options, order);
        set_language(&mut options, self.client.language());
        let reply = self.client.execute_kw(
            &self.name,
            "search",
            vec![explode_filter(&expression)],
            options,
        )?;
        ids_from(reply)
    }

    /// Count the records matching a filter expression
    pub fn count(
        &self,
        expression: &[FilterItem],
        is_active: ActiveStatusChoice,
        options: Option<Options>,
    ) -> Result<i64> {
        let mut expression = expression.to_vec();
        apply_active_filter(&mut expression, is_active);
        let mut options = options.unwrap_or_default();
        set_language(&mut options, self.client.language());
        let reply = self.client.execute_kw(
            &self.name,
            "search_count",
            vec![explode_filter(&expression)],
            options,
        )?;
        reply
            .as_int()
            .ok_or_else(|| Error::UnexpectedReply("search_count did not return a count".into()))
    }

    /// Create a record and return its id
    pub fn create(&self, values: Record, options: Option<Options>) -> Result<i64> {
        let mut options = options.unwrap_or_default();
        set_language(&mut options, self.client.language());
        let reply = self
            .client
            .execute_kw(&self.name, "create", vec![Value::Struct(values)], options)?;
        reply
            .as_int()
            .ok_or_else(|| Error::UnexpectedReply("create did not return an id".into()))
    }

    /// Update one or more records in a single call
    pub fn update(
        &self,
        entity_ids: &[i64],
        values: Record,
        options: Option<Options>,
    ) -> Result<bool> {
        let mut options = options.unwrap_or_default();
        set_language(&mut options, self.client.language());
        let ids: Value = entity_ids.iter().copied().map(Value::Int).collect();
        let reply = self.client.execute_kw(
            &self.name,
            "write",
            vec![ids, Value::Struct(values)],
            options,
        )?;
        Ok(matches!(reply, Value::Bool(true)))
    }

    /// Delete one or more records in a single call
    pub fn delete(&self, entity_ids: &[i64], options: Option<Options>) -> Result<bool> {
        let ids: Value = entity_ids.iter().copied().map(Value::Int).collect();
        let reply = self.client.execute_kw(
            &self.name,
            "unlink",
            vec![ids],
            options.unwrap_or_default(),
        )?;
        Ok(matches!(reply, Value::Bool(true)))
    }

    /// Field metadata for the model
    ///
    /// `attributes` restricts which metadata sub-keys are returned per
    /// field (e.g. `string`, `type`, `required`).
    pub fn get_fields(
        &self,
        fields: Option<&[&str]>,
        attributes: Option<&[&str]>,
        options: Option<Options>,
    ) -> Result<Record> {
        let mut options = options.unwrap_or_default();
        if let Some(attributes) = attributes {
            let projection: Value = attributes.iter().map(|a| Value::from(*a)).collect();
            options.insert_if_absent("attributes", projection);
        }
        set_language(&mut options, self.client.language());
        let args = match fields {
            Some(fields) => vec![fields.iter().map(|f| Value::from(*f)).collect()],
            None => Vec::new(),
        };
        let reply = self
            .client
            .execute_kw(&self.name, "fields_get", args, options)?;
        match reply {
            Value::Struct(map) => Ok(map),
            other => Err(Error::UnexpectedReply(format!(
                "fields_get returned {other:?}"
            ))),
        }
    }

    /// Create a related record and link it (command 0)
    pub fn many_to_many_create(&self, entity_id: i64, field: &str, values: Record) -> Result<bool> {
        self.apply_field_command(entity_id, field, FieldCommand::Create(values))
    }

    /// Link an existing related record (command 4)
    pub fn many_to_many_add(&self, entity_id: i64, field: &str, related_id: i64) -> Result<bool> {
        self.apply_field_command(entity_id, field, FieldCommand::Add(related_id))
    }

    /// Update an already-linked record (command 1)
    pub fn many_to_many_update(
        &self,
        entity_id: i64,
        field: &str,
        related_id: i64,
        values: Record,
    ) -> Result<bool> {
        self.apply_field_command(entity_id, field, FieldCommand::Update(related_id, values))
    }

    /// Unlink and destroy a related record (command 2)
    pub fn many_to_many_delete(&self, entity_id: i64, field: &str, related_id: i64) -> Result<bool> {
        self.apply_field_command(entity_id, field, FieldCommand::Delete(related_id))
    }

    /// Unlink a related record, leaving it in place (command 3)
    pub fn many_to_many_remove(&self, entity_id: i64, field: &str, related_id: i64) -> Result<bool> {
        self.apply_field_command(entity_id, field, FieldCommand::Remove(related_id))
    }

    /// Unlink every related record (command 5)
    pub fn many_to_many_clear(&self, entity_id: i64, field: &str) -> Result<bool> {
        self.apply_field_command(entity_id, field, FieldCommand::Clear)
    }

    /// Replace all links with the given set (command 6)
    pub fn many_to_many_replace(
        &self,
        entity_id: i64,
        field: &str,
        related_ids: Vec<i64>,
    ) -> Result<bool> {
        self.apply_field_command(entity_id, field, FieldCommand::Replace(related_ids))
    }

    fn apply_field_command(
        &self,
        entity_id: i64,
        field: &str,
        command: FieldCommand,
    ) -> Result<bool> {
        self.update(&[entity_id], field_command_values(field, command), None)
    }

    /// Escape hatch: call any remote method on this model
    ///
    /// With `ignore_none_errors` set, the none-marshal fault becomes
    /// `Ok(None)`; nothing else is ever suppressed.
    pub fn execute(
        &self,
        method: &str,
        args: Vec<Value>,
        kwargs: Options,
        ignore_none_errors: bool,
    ) -> Result<Option<Value>> {
        match self.client.execute_kw(&self.name, method, args, kwargs) {
            Err(error) if ignore_none_errors && error.is_none_marshal_fault() => Ok(None),
            other => other.map(Some),
        }
    }

    /// Build a sibling façade for another model on the same session
    ///
    /// With `use_existing_uid` the already-authenticated user id is
    /// reused, skipping a redundant authentication round trip.
    pub fn get_model(
        &self,
        model_name: &str,
        authenticate: bool,
        use_existing_uid: bool,
    ) -> Result<Model> {
        let mut client = self.client.clone();
        if !use_existing_uid {
            client.clear_uid();
        }
        if authenticate {
            client.authenticate()?;
        }
        Model::new(model_name, client)
    }

    /// Resolve a named external identifier to its referenced record id
    pub fn get_model_data_reference(&self, module: &str, name: &str) -> Result<Option<i64>> {
        let lookup = self.get_model(MODEL_DATA, false, true)?;
        let expression = vec![
            FilterItem::Condition(Filter::new("module", CompareType::Equal, module)),
            FilterItem::Condition(Filter::new("name", CompareType::Equal, name)),
        ];
        let record = lookup.first(
            &expression,
            ActiveStatusChoice::NotSet,
            Some(&["res_id"]),
            None,
            None,
            None,
        )?;
        Ok(record.and_then(|r| r.get("res_id").and_then(Value::as_int)))
    }

    /// Resolve a message subtype external id (e.g. `mail.mt_note`) to its
    /// record id, caching the result for the façade's lifetime
    pub fn get_message_subtype_id(&self, subtype: &str) -> Result<Option<i64>> {
        if let Ok(cache) = self.subtype_cache.lock()
            && let Some(id) = cache.get(subtype)
        {
            return Ok(Some(*id));
        }
        let (module, name) = subtype.split_once('.').unwrap_or(("mail", subtype));
        let resolved = self.get_model_data_reference(module, name)?;
        if let Some(id) = resolved
            && let Ok(mut cache) = self.subtype_cache.lock()
        {
            cache.insert(subtype.to_string(), id);
        }
        Ok(resolved)
    }

    /// Post a message in the record's discussion thread
    pub fn post_message(
        &self,
        entity_id: i64,
        subtype_id: Option<i64>,
        body: &str,
    ) -> Result<Option<Value>> {
        let mut kwargs = Options::new();
        kwargs.insert("body", body);
        if let Some(subtype_id) = subtype_id {
            kwargs.insert("subtype_id", subtype_id);
        }
        // older servers answer None here, which the wire cannot encode
        self.execute("message_post", vec![Value::Int(entity_id)], kwargs, true)
    }

    /// Post a message with the activity subtype
    pub fn post_message_as_activity(&self, entity_id: i64, body: &str) -> Result<Option<Value>> {
        let subtype_id = self.get_message_subtype_id(MessageSubType::Activities.as_str())?;
        self.post_message(entity_id, subtype_id, body)
    }

    /// Post a message with the comment subtype
    pub fn post_message_as_comment(&self, entity_id: i64, body: &str) -> Result<Option<Value>> {
        let subtype_id = self.get_message_subtype_id(MessageSubType::Comment.as_str())?;
        self.post_message(entity_id, subtype_id, body)
    }

    /// Post a message with the note subtype
    pub fn post_message_as_note(&self, entity_id: i64, body: &str) -> Result<Option<Value>> {
        let subtype_id = self.get_message_subtype_id(MessageSubType::Note.as_str())?;
        self.post_message(entity_id, subtype_id, body)
    }

    /// Read and decode a base64-encoded binary field
    ///
    /// An unset field (boolean `false` on the wire) yields None.
    pub fn get_binary_field(&self, entity_id: i64, field: &str) -> Result<Option<Vec<u8>>> {
        let record = self.get(entity_id, Some(&[field]), true)?;
        let Some(mut record) = record else {
            return Ok(None);
        };
        match record.remove(field) {
            Some(Value::String(payload)) if !payload.is_empty() => {
                let compact: String = payload
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                STANDARD
                    .decode(compact)
                    .map(Some)
                    .map_err(|_| Error::UnexpectedReply(format!("field {field} is not base64")))
            }
            Some(Value::Base64(bytes)) => Ok(Some(bytes)),
            _ => Ok(None),
        }
    }
}

/// Build the write payload for one x2many field command
fn field_command_values(field: &str, command: FieldCommand) -> Record {
    let mut values = Record::new();
    values.insert(field.to_string(), Value::Array(vec![command.explode()]));
    values
}

/// Interpret a reply as a list of records
fn records_from(reply: Value) -> Result<Vec<Record>> {
    match reply {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Struct(record) => Ok(record),
                other => Err(Error::UnexpectedReply(format!(
                    "expected a record, got {other:?}"
                ))),
            })
            .collect(),
        // no rows: the server answers false rather than an empty list
        Value::Bool(false) => Ok(Vec::new()),
        other => Err(Error::UnexpectedReply(format!(
            "expected a record list, got {other:?}"
        ))),
    }
}

/// Interpret a reply as a list of record ids
fn ids_from(reply: Value) -> Result<Vec<i64>> {
    match reply {
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                item.as_int().ok_or_else(|| {
                    Error::UnexpectedReply(format!("expected an id, got {item:?}"))
                })
            })
            .collect(),
        other => Err(Error::UnexpectedReply(format!(
            "expected an id list, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_model() -> Model {
        let mut client = OdooClient::new("https://odoo.example.com", "db", "user", "pw", None);
        client.set_uid_for_tests(2);
        Model::new("res.partner", client).unwrap()
    }

    #[test]
    fn test_empty_model_name_is_rejected() {
        let client = OdooClient::new("https://odoo.example.com", "db", "user", "pw", None);
        assert!(matches!(
            Model::new("", client),
            Err(Error::MissingModelName)
        ));
    }

    #[test]
    fn test_field_command_codes() {
        assert_eq!(FieldCommand::Create(Record::new()).code(), 0);
        assert_eq!(FieldCommand::Update(1, Record::new()).code(), 1);
        assert_eq!(FieldCommand::Delete(1).code(), 2);
        assert_eq!(FieldCommand::Remove(1).code(), 3);
        assert_eq!(FieldCommand::Add(1).code(), 4);
        assert_eq!(FieldCommand::Clear.code(), 5);
        assert_eq!(FieldCommand::Replace(vec![]).code(), 6);
    }

    #[test]
    fn test_field_command_tuples() {
        assert_eq!(
            FieldCommand::Add(7).explode(),
            Value::Array(vec![Value::Int(4), Value::Int(7), Value::Int(0)])
        );
        assert_eq!(
            FieldCommand::Clear.explode(),
            Value::Array(vec![Value::Int(5), Value::Int(0), Value::Int(0)])
        );
        assert_eq!(
            FieldCommand::Replace(vec![1, 2]).explode(),
            Value::Array(vec![
                Value::Int(6),
                Value::Int(0),
                Value::Array(vec![Value::Int(1), Value::Int(2)]),
            ])
        );

        let mut values = Record::new();
        values.insert("name".to_string(), Value::from("tag"));
        assert_eq!(
            FieldCommand::Create(values.clone()).explode(),
            Value::Array(vec![Value::Int(0), Value::Int(0), Value::Struct(values)])
        );
    }

    #[test]
    fn test_delete_and_remove_differ_only_by_code() {
        // same arity, different command: 2 destroys, 3 only unlinks
        let deleted = FieldCommand::Delete(9).explode();
        let removed = FieldCommand::Remove(9).explode();
        assert_eq!(
            deleted.as_array().unwrap()[1..],
            removed.as_array().unwrap()[1..]
        );
        assert_eq!(deleted.as_array().unwrap()[0], Value::Int(2));
        assert_eq!(removed.as_array().unwrap()[0], Value::Int(3));
    }

    #[test]
    fn test_field_command_write_payload() {
        let values = field_command_values("tag_ids", FieldCommand::Add(3));
        assert_eq!(
            values.get("tag_ids"),
            Some(&Value::Array(vec![Value::Array(vec![
                Value::Int(4),
                Value::Int(3),
                Value::Int(0),
            ])]))
        );
    }

    #[test]
    fn test_records_from_shapes() {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::Int(1));
        let reply = Value::Array(vec![Value::Struct(record.clone())]);
        assert_eq!(records_from(reply).unwrap(), vec![record]);

        // empty result comes back as boolean false
        assert_eq!(records_from(Value::Bool(false)).unwrap(), Vec::<Record>::new());

        assert!(matches!(
            records_from(Value::Int(3)),
            Err(Error::UnexpectedReply(_))
        ));
        assert!(matches!(
            records_from(Value::Array(vec![Value::Int(3)])),
            Err(Error::UnexpectedReply(_))
        ));
    }

    #[test]
    fn test_ids_from_shapes() {
        let reply = Value::Array(vec![Value::Int(3), Value::Int(5)]);
        assert_eq!(ids_from(reply).unwrap(), vec![3, 5]);
        assert!(matches!(
            ids_from(Value::Bool(true)),
            Err(Error::UnexpectedReply(_))
        ));
    }

    #[test]
    fn test_get_model_shares_or_resets_session() {
        let model = offline_model();
        let sibling = model.get_model("res.users", false, true).unwrap();
        assert_eq!(sibling.uid(), Some(2));
        assert_eq!(sibling.model_name(), "res.users");

        let fresh = model.get_model("res.users", false, false).unwrap();
        assert_eq!(fresh.uid(), None);
    }

    #[test]
    fn test_message_subtype_identifiers() {
        assert_eq!(MessageSubType::Activities.as_str(), "mail.mt_activities");
        assert_eq!(MessageSubType::Comment.as_str(), "mail.mt_comment");
        assert_eq!(MessageSubType::Note.as_str(), "mail.mt_note");
    }
}
