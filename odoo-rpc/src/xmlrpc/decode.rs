//! Parsing of XML-RPC method responses

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDateTime;
use quick_xml::Reader;
use quick_xml::events::{BytesRef, BytesText, Event};

use crate::error::{Error, Result};
use crate::value::{Record, Value};

/// Parse a `<methodResponse>` document
///
/// A `<fault>` reply becomes [`Error::Fault`] with the server's code and
/// message preserved verbatim.
pub fn method_response(body: &str) -> Result<Value> {
    let mut reader = Reader::from_str(body);
    let mut in_fault = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"methodResponse" | b"params" | b"param" => {}
                b"fault" => in_fault = true,
                b"value" => {
                    let value = read_value(&mut reader)?;
                    return if in_fault {
                        Err(fault_from(value))
                    } else {
                        Ok(value)
                    };
                }
                other => {
                    return Err(Error::Decode(format!(
                        "unexpected element <{}>",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::Eof => {
                return Err(Error::Decode("response contains no value".to_string()));
            }
            // declaration and inter-element whitespace
            _ => {}
        }
    }
}

/// Convert a decoded fault struct (faultCode/faultString) into an error
fn fault_from(value: Value) -> Error {
    let code = value
        .get("faultCode")
        .and_then(Value::as_int)
        .unwrap_or_default();
    let message = value
        .get("faultString")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Error::Fault {
        code: code as i32,
        message,
    }
}

/// Decode a text event's content
fn text_content(text: &BytesText) -> Result<String> {
    text.xml_content()
        .map(|content| content.into_owned())
        .map_err(|e| Error::Decode(format!("undecodable text: {e}")))
}

/// Resolve a character reference or one of the five predefined entities
fn general_ref_text(reference: &BytesRef) -> Result<String> {
    if let Some(ch) = reference
        .resolve_char_ref()
        .map_err(|e| Error::Decode(format!("invalid character reference: {e}")))?
    {
        return Ok(ch.to_string());
    }
    let name = reference
        .decode()
        .map_err(|e| Error::Decode(format!("undecodable entity reference: {e}")))?;
    let resolved = match name.as_ref() {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        other => return Err(Error::Decode(format!("unknown entity &{other};"))),
    };
    Ok(resolved.to_string())
}

/// Read one value; the opening `<value>` tag has already been consumed
fn read_value(reader: &mut Reader<&[u8]>) -> Result<Value> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&text_content(&t)?),
            Event::GeneralRef(r) => text.push_str(&general_ref_text(&r)?),
            Event::Start(e) => {
                let tag = e.name().as_ref().to_vec();
                let value = match tag.as_slice() {
                    b"array" => read_array(reader)?,
                    b"struct" => Value::Struct(read_struct(reader)?),
                    _ => {
                        let content = read_text(reader, &tag)?;
                        scalar(&tag, &content)?
                    }
                };
                expect_end(reader, b"value")?;
                return Ok(value);
            }
            Event::Empty(e) => {
                let value = match e.name().as_ref() {
                    b"nil" => Value::Nil,
                    b"string" => Value::String(String::new()),
                    b"struct" => Value::Struct(Record::new()),
                    other => {
                        return Err(Error::Decode(format!(
                            "unexpected empty element <{}/>",
                            String::from_utf8_lossy(other)
                        )));
                    }
                };
                expect_end(reader, b"value")?;
                return Ok(value);
            }
            // XML-RPC treats an untagged value as a string
            Event::End(e) if e.name().as_ref() == b"value" => {
                return Ok(Value::String(text));
            }
            Event::Eof => return Err(Error::Decode("unterminated value".to_string())),
            _ => {}
        }
    }
}

/// Read `<data><value>...</value>...</data></array>`
fn read_array(reader: &mut Reader<&[u8]>) -> Result<Value> {
    let mut items = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"data" => {}
                b"value" => items.push(read_value(reader)?),
                other => {
                    return Err(Error::Decode(format!(
                        "unexpected element <{}> in array",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::Empty(e) if e.name().as_ref() == b"data" => {}
            Event::End(e) if e.name().as_ref() == b"array" => {
                return Ok(Value::Array(items));
            }
            Event::Eof => return Err(Error::Decode("unterminated array".to_string())),
            _ => {}
        }
    }
}

/// Read `<member><name>..</name><value>..</value></member>...</struct>`
fn read_struct(reader: &mut Reader<&[u8]>) -> Result<Record> {
    let mut map = Record::new();
    let mut name: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"member" => name = None,
                b"name" => name = Some(read_text(reader, b"name")?),
                b"value" => {
                    let key = name.take().ok_or_else(|| {
                        Error::Decode("struct member value before name".to_string())
                    })?;
                    map.insert(key, read_value(reader)?);
                }
                other => {
                    return Err(Error::Decode(format!(
                        "unexpected element <{}> in struct",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::End(e) if e.name().as_ref() == b"struct" => return Ok(map),
            Event::Eof => return Err(Error::Decode("unterminated struct".to_string())),
            _ => {}
        }
    }
}

/// Accumulate text content up to the closing tag
fn read_text(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&text_content(&t)?),
            Event::GeneralRef(r) => text.push_str(&general_ref_text(&r)?),
            Event::End(e) if e.name().as_ref() == tag => return Ok(text),
            Event::Eof => {
                return Err(Error::Decode(format!(
                    "unterminated <{}>",
                    String::from_utf8_lossy(tag)
                )));
            }
            _ => {
                return Err(Error::Decode(format!(
                    "unexpected markup inside <{}>",
                    String::from_utf8_lossy(tag)
                )));
            }
        }
    }
}

/// Skip whitespace until the expected closing tag
fn expect_end(reader: &mut Reader<&[u8]>, tag: &[u8]) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::End(e) if e.name().as_ref() == tag => return Ok(()),
            Event::Text(t) if text_content(&t)?.trim().is_empty() => {}
            _ => {
                return Err(Error::Decode(format!(
                    "expected closing </{}>",
                    String::from_utf8_lossy(tag)
                )));
            }
        }
    }
}

/// Decode one typed scalar element
fn scalar(tag: &[u8], content: &str) -> Result<Value> {
    match tag {
        b"int" | b"i4" | b"i8" => content
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::Decode(format!("invalid integer {content:?}"))),
        b"boolean" => match content.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(Error::Decode(format!("invalid boolean {other:?}"))),
        },
        b"double" => content
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| Error::Decode(format!("invalid double {content:?}"))),
        b"string" => Ok(Value::String(content.to_string())),
        b"dateTime.iso8601" => {
            NaiveDateTime::parse_from_str(content.trim(), "%Y%m%dT%H:%M:%S")
                .map(Value::DateTime)
                .map_err(|_| Error::Decode(format!("invalid datetime {content:?}")))
        }
        b"base64" => {
            let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map(Value::Base64)
                .map_err(|_| Error::Decode("invalid base64 payload".to_string()))
        }
        other => Err(Error::Decode(format!(
            "unknown value type <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}
