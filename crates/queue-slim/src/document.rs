//! YAML document loading, shape detection and emission.
//!
//! Queue and inbox files are either a bare list of records or a mapping that
//! wraps the list under a known key. The shape is captured once at load time
//! as a [`DocumentShape`] and reused when the archive and the slimmed source
//! are written, so output always matches input.
//!
//! `serde_yaml::Value` refuses mappings with duplicate keys. Hand-edited queue
//! files do contain them (a second `status:` appended to a command), so
//! loading goes through [`LenientValue`], which keeps the last value for a
//! repeated key. [`crate::raw_status`] then recovers the first one.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Sequence, Value};
use std::fmt;

/// Keys a wrapped queue document may use, in lookup order.
pub const QUEUE_KEYS: [&str; 2] = ["commands", "queue"];

/// Key wrapping the message list of an inbox document.
pub const INBOX_KEY: &str = "messages";

/// How the record list sits inside its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentShape {
    /// The document is the list itself.
    Bare,
    /// The list lives under this top-level key.
    Wrapped(String),
}

impl DocumentShape {
    /// Wrap `records` in this shape.
    pub fn build(&self, records: Sequence) -> Value {
        match self {
            Self::Bare => Value::Sequence(records),
            Self::Wrapped(key) => {
                let mut map = Mapping::new();
                map.insert(Value::String(key.clone()), Value::Sequence(records));
                Value::Mapping(map)
            }
        }
    }

    /// Name used for the list in log lines and errors.
    pub fn field_name(&self) -> &str {
        match self {
            Self::Bare => "queue",
            Self::Wrapped(key) => key,
        }
    }
}

/// Result of locating the record list in a loaded document.
#[derive(Debug, Clone, PartialEq)]
pub enum Located<'a> {
    /// Null or an empty collection; there is nothing to look at.
    Empty,
    /// None of the expected keys are present, or the top level is a scalar.
    Unrecognized,
    /// The key exists but its value is not a sequence.
    NotAList(DocumentShape),
    /// The record list and the shape it was found in.
    Records(DocumentShape, &'a Sequence),
}

/// Find the record list in `doc`, accepting a bare list or one of `keys`.
///
/// The first key in `keys` that is present wins, even if a later key also
/// exists.
pub fn locate<'a>(doc: &'a Value, keys: &[&str], allow_bare: bool) -> Located<'a> {
    match doc {
        Value::Null => Located::Empty,
        Value::Sequence(seq) if seq.is_empty() => Located::Empty,
        Value::Sequence(seq) if allow_bare => Located::Records(DocumentShape::Bare, seq),
        Value::Mapping(map) if map.is_empty() => Located::Empty,
        Value::Mapping(map) => {
            let Some(key) = keys.iter().find(|k| map.contains_key(**k)) else {
                return Located::Unrecognized;
            };
            let shape = DocumentShape::Wrapped((*key).to_string());
            match map.get(*key) {
                Some(Value::Sequence(seq)) => Located::Records(shape, seq),
                _ => Located::NotAList(shape),
            }
        }
        _ => Located::Unrecognized,
    }
}

/// Replace the record list of `doc` with `records`, keeping every other
/// top-level key and its position.
pub fn replace_records(doc: &mut Value, shape: &DocumentShape, records: Sequence) {
    match (shape, doc) {
        (DocumentShape::Wrapped(key), Value::Mapping(map)) => {
            map.insert(Value::String(key.clone()), Value::Sequence(records));
        }
        (_, doc) => *doc = shape.build(records),
    }
}

/// Parse YAML text, tolerating duplicate mapping keys (last value wins).
///
/// Blank or comment-only text loads as `Value::Null`.
pub fn parse(raw: &str) -> Result<Value, serde_yaml::Error> {
    let blank = raw
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'));
    if blank {
        return Ok(Value::Null);
    }
    let value: LenientValue = serde_yaml::from_str(raw)?;
    Ok(value.0)
}

/// Render a document as block-style YAML with insertion-ordered keys.
pub fn render(doc: &Value) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(doc)
}

/// A `serde_yaml::Value` whose mappings accept repeated keys.
#[derive(Debug, Clone, PartialEq)]
pub struct LenientValue(pub Value);

impl<'de> Deserialize<'de> for LenientValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LenientVisitor).map(LenientValue)
    }
}

struct LenientVisitor;

impl<'de> Visitor<'de> for LenientVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        LenientValue::deserialize(deserializer).map(|v| v.0)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Sequence::new();
        while let Some(LenientValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = Mapping::new();
        while let Some((LenientValue(key), LenientValue(value))) = access.next_entry()? {
            // Existing keys keep their position; the later value replaces the earlier.
            map.insert(key, value);
        }
        Ok(Value::Mapping(map))
    }

    fn visit_enum<A>(self, data: A) -> Result<Value, A::Error>
    where
        A: de::EnumAccess<'de>,
    {
        let (tag, variant): (String, _) = data.variant()?;
        let LenientValue(value) = variant.newtype_variant()?;
        Ok(Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        })))
    }
}
