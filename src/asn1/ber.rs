//! # BER Codec
//!
//! A tag-aware streaming reader and writer for the Basic Encoding Rules.
//! The decoder owns a mutable cursor over a byte slice and is driven by a
//! [`Schema`]; the encoder walks the same schema to turn a [`Record`] back
//! into bytes.
//!
//! Decoders are call-stack local: one decoder per decode operation, never
//! shared.

use crate::asn1::node::{
    BIT_STRING, BOOLEAN, BitString, Class, INTEGER, Integer, Method, NULL, OBJECT_IDENTIFIER,
    OCTET_STRING, Node, Oid, SEQUENCE, Value, tlv,
};
use crate::asn1::schema::{Field, FieldType, Item, Record, Root, Schema};
use crate::asn1::{Error, Result, length};

/// Streaming BER decoder with a mutable cursor.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    strict: bool,
}

impl<'a> Decoder<'a> {
    /// A decoder over the buffer, applying BER rules.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, strict: false }
    }

    /// A decoder applying the DER canonicalization rules on top of BER.
    #[must_use]
    pub(crate) const fn strict(data: &'a [u8]) -> Self {
        Self { data, pos: 0, strict: true }
    }

    /// Octets left to consume.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether the cursor has reached the end of the buffer.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| Error::MalformedLength("unexpected end of input".to_string()))
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::MalformedLength(format!("{count} octets requested")));
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    /// Slice the next TLV, resolving the expected tag from the element's
    /// tagging options.
    ///
    /// A context-tagged constructed TLV requires explicit metadata (the
    /// outer envelope is stripped and the inner universal TLV read); a
    /// context-tagged primitive TLV requires implicit metadata (the tag is
    /// re-interpreted in place). Anything else is matched against the
    /// universal tag for `type_id`.
    ///
    /// Returns the actual tag and the content octets.
    ///
    /// # Errors
    ///
    /// `UnexpectedTag` on a tag mismatch, `TaggedWithoutMetadata` when a
    /// context tag has no matching metadata, `MalformedLength` on
    /// truncation.
    pub fn slice(&mut self, type_id: u8, field: &Field) -> Result<(u8, &'a [u8])> {
        let first = self.peek()?;

        if Class::of(first) != Class::Universal {
            if Method::of(first) == Method::Constructed {
                let Some(tag) = field.explicit else {
                    return Err(Error::TaggedWithoutMetadata);
                };
                let outer = field.class as u8 | Method::Constructed as u8 | tag;
                let (_, content) = self.read_tlv(outer)?;

                let mut inner = Self { data: content, pos: 0, strict: self.strict };
                return inner.read_tlv(field.method as u8 | type_id);
            }

            let Some(tag) = field.implicit else {
                return Err(Error::TaggedWithoutMetadata);
            };
            return self.read_tlv(field.class as u8 | Method::Primitive as u8 | tag);
        }

        if self.strict
            && Method::of(first) == Method::Constructed
            && matches!(first & 0x1f, BIT_STRING | OCTET_STRING)
        {
            let name = if first & 0x1f == BIT_STRING { "BIT STRING" } else { "OCTET STRING" };
            return Err(Error::UnsupportedConstructed(name));
        }

        self.read_tlv(field.method as u8 | type_id)
    }

    fn read_tlv(&mut self, expected: u8) -> Result<(u8, &'a [u8])> {
        let got = self.peek()?;
        if got != expected {
            return Err(Error::UnexpectedTag { expected, got });
        }
        self.pos += 1;

        let (len, consumed) = length::decode(&self.data[self.pos..])?;
        if self.strict && consumed != length::encode(len, false).len() {
            return Err(Error::MalformedLength("non-minimal length".to_string()));
        }
        self.pos += consumed;

        if self.remaining() < len {
            return Err(Error::MalformedLength("content exceeds buffer".to_string()));
        }
        let content = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok((got, content))
    }

    /// Decode a record described by `schema` from the cursor position.
    ///
    /// Nested models are decoded recursively; a nested record with a
    /// `Nested` root consumes directly from this decoder's cursor, so the
    /// child's consumption is reflected back to the parent.
    ///
    /// # Errors
    ///
    /// Any tag, length, or value error raised while walking the schema.
    pub fn decode(&mut self, schema: &Schema) -> Result<Record> {
        match schema.root {
            Root::Sequence => {
                let envelope = Field::new("", FieldType::Sequence);
                let (_, content) = self.slice(SEQUENCE, &envelope)?;
                let mut inner = Self { data: content, pos: 0, strict: self.strict };
                inner.decode_fields(schema)
            }
            Root::Nested => self.decode_fields(schema),
        }
    }

    fn decode_fields(&mut self, schema: &Schema) -> Result<Record> {
        let mut record = Record::new();
        for field in &schema.fields {
            if field.optional && !self.next_matches(field) {
                record.set(field.name, Item::Absent);
                continue;
            }
            let item = self.decode_field(field)?;
            record.set(field.name, item);
        }
        Ok(record)
    }

    fn decode_field(&mut self, field: &Field) -> Result<Item> {
        match field.ty {
            FieldType::Nested => {
                let model = field.model.as_ref().ok_or_else(|| {
                    Error::InvalidValue(format!("field `{}` requires a model", field.name))
                })?;
                Ok(Item::Record(self.decode(model)?))
            }
            FieldType::Sequence => {
                let model = field.model.as_ref().ok_or_else(|| {
                    Error::InvalidValue(format!("field `{}` requires a model", field.name))
                })?;
                let (_, content) = self.slice(SEQUENCE, field)?;
                let mut inner = Self { data: content, pos: 0, strict: self.strict };
                Ok(Item::Record(inner.decode_fields(model)?))
            }
            FieldType::Bytes => {
                let count = field.length.unwrap_or(self.remaining());
                let bytes = self.take(count)?;
                let value = field.apply_decode(Value::OctetString(bytes.to_vec()))?;
                Ok(Item::Value(value))
            }
            _ => {
                let (_, content) = self.slice(type_id(field.ty), field)?;
                let value = self.parse_value(field.ty, content)?;

                // a model on a string element decodes the contained octets
                if let Some(model) = &field.model {
                    let bytes = match &value {
                        Value::BitString(bits) => bits.bytes.as_slice(),
                        Value::OctetString(bytes) => bytes.as_slice(),
                        _ => {
                            return Err(Error::InvalidValue(format!(
                                "field `{}` cannot carry a nested model",
                                field.name
                            )));
                        }
                    };
                    let mut inner = Decoder { data: bytes, pos: 0, strict: self.strict };
                    return Ok(Item::Record(inner.decode(model)?));
                }

                Ok(Item::Value(field.apply_decode(value)?))
            }
        }
    }

    fn parse_value(&self, ty: FieldType, content: &[u8]) -> Result<Value> {
        match ty {
            FieldType::Boolean => {
                if content.len() != 1 {
                    return Err(Error::InvalidValue("boolean content".to_string()));
                }
                if self.strict && !matches!(content[0], 0x00 | 0xff) {
                    return Err(Error::InvalidValue(format!(
                        "boolean value {:#04x}",
                        content[0]
                    )));
                }
                Ok(Value::Boolean(content[0] != 0x00))
            }
            FieldType::Integer => {
                if self.strict && content.len() > 1 {
                    let redundant = (content[0] == 0x00 && content[1] & 0x80 == 0)
                        || (content[0] == 0xff && content[1] & 0x80 != 0);
                    if redundant {
                        return Err(Error::InvalidValue("non-minimal integer".to_string()));
                    }
                }
                Ok(Value::Integer(Integer::from_der(content)?))
            }
            FieldType::BitString => Ok(Value::BitString(BitString::from_der(content)?)),
            FieldType::OctetString => Ok(Value::OctetString(content.to_vec())),
            FieldType::Null => {
                if !content.is_empty() {
                    return Err(Error::InvalidValue("null content".to_string()));
                }
                Ok(Value::Null)
            }
            FieldType::ObjectIdentifier => Ok(Value::ObjectIdentifier(Oid::from_der(content)?)),
            FieldType::Sequence | FieldType::Bytes | FieldType::Nested => {
                Err(Error::InvalidValue("not a primitive element".to_string()))
            }
        }
    }

    fn next_matches(&self, field: &Field) -> bool {
        let Ok(first) = self.peek() else {
            return false;
        };
        let expected = if let Some(tag) = field.explicit {
            field.class as u8 | Method::Constructed as u8 | tag
        } else if let Some(tag) = field.implicit {
            field.class as u8 | field.method as u8 | tag
        } else {
            field.method as u8 | type_id(field.ty)
        };
        first == expected
    }
}

const fn type_id(ty: FieldType) -> u8 {
    match ty {
        FieldType::Boolean => BOOLEAN,
        FieldType::Integer => INTEGER,
        FieldType::BitString => BIT_STRING,
        FieldType::OctetString | FieldType::Bytes => OCTET_STRING,
        FieldType::Null => NULL,
        FieldType::ObjectIdentifier => OBJECT_IDENTIFIER,
        FieldType::Sequence | FieldType::Nested => SEQUENCE,
    }
}

/// Encode a record against its schema.
///
/// Each field is read from the record, passed through its encode
/// transformers, resolved to a node (primitives) or framed container
/// (nested records), and concatenated. A `Sequence` root wraps the result
/// in the SEQUENCE envelope.
///
/// # Errors
///
/// `InvalidValue` when a required field is missing or holds the wrong
/// shape, plus any node encoding error.
pub fn encode(schema: &Schema, record: &Record) -> Result<Vec<u8>> {
    let content = encode_content(schema, record)?;
    match schema.root {
        Root::Nested => Ok(content),
        Root::Sequence => {
            Ok(tlv(Class::Universal as u8 | Method::Constructed as u8 | SEQUENCE, &content))
        }
    }
}

fn encode_content(schema: &Schema, record: &Record) -> Result<Vec<u8>> {
    let mut content = Vec::new();

    for field in &schema.fields {
        let item = record.get(field.name);
        let item = match item {
            None | Some(Item::Absent) => {
                if field.optional {
                    continue;
                }
                return Err(Error::InvalidValue(format!("missing field `{}`", field.name)));
            }
            Some(item) => item,
        };

        match (field.ty, item) {
            (FieldType::Nested, Item::Record(child)) => {
                let model = model_of(field)?;
                content.extend_from_slice(&encode(model, child)?);
            }
            (FieldType::Sequence, Item::Record(child)) => {
                let model = model_of(field)?;
                let inner = encode_content(model, child)?;
                content.extend_from_slice(&frame(field, SEQUENCE, Method::Constructed, &inner));
            }
            (FieldType::BitString, Item::Record(child)) => {
                let model = model_of(field)?;
                let bits = BitString::new(encode(model, child)?);
                content.extend_from_slice(&frame(
                    field,
                    BIT_STRING,
                    Method::Primitive,
                    &bits.to_der(),
                ));
            }
            (FieldType::OctetString, Item::Record(child)) => {
                let model = model_of(field)?;
                let inner = encode(model, child)?;
                content.extend_from_slice(&frame(field, OCTET_STRING, Method::Primitive, &inner));
            }
            (FieldType::Bytes, Item::Value(value)) => {
                let value = field.apply_encode(value.clone())?;
                let Value::OctetString(bytes) = value else {
                    return Err(Error::InvalidValue(format!(
                        "field `{}` must encode to raw octets",
                        field.name
                    )));
                };
                if let Some(declared) = field.length {
                    if bytes.len() != declared {
                        return Err(Error::InvalidValue(format!(
                            "field `{}` is {} octets, declared {declared}",
                            field.name,
                            bytes.len()
                        )));
                    }
                }
                content.extend_from_slice(&bytes);
            }
            (_, Item::Value(value)) => {
                let value = field.apply_encode(value.clone())?;
                let node = Node {
                    value,
                    class: field.class,
                    method: field.method,
                    explicit: field.explicit,
                    implicit: field.implicit,
                };
                content.extend_from_slice(&node.encode()?);
            }
            _ => {
                return Err(Error::InvalidValue(format!(
                    "field `{}` holds the wrong shape",
                    field.name
                )));
            }
        }
    }

    Ok(content)
}

fn model_of(field: &Field) -> Result<&Schema> {
    field
        .model
        .as_ref()
        .ok_or_else(|| Error::InvalidValue(format!("field `{}` requires a model", field.name)))
}

fn frame(field: &Field, type_id: u8, method: Method, content: &[u8]) -> Vec<u8> {
    if let Some(tag) = field.explicit {
        let inner = tlv(method as u8 | type_id, content);
        return tlv(field.class as u8 | Method::Constructed as u8 | tag, &inner);
    }
    if let Some(tag) = field.implicit {
        return tlv(field.class as u8 | method as u8 | tag, content);
    }
    tlv(method as u8 | type_id, content)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asn1::schema::{Field, FieldType, Schema};

    fn point_schema() -> Schema {
        Schema::sequence(vec![
            Field::new("x", FieldType::Integer),
            Field::new("y", FieldType::Integer),
        ])
    }

    #[test]
    fn sequence_round_trip() {
        let schema = point_schema();
        let mut record = Record::new();
        record.set_value("x", Value::Integer(Integer::from_i64(3)));
        record.set_value("y", Value::Integer(Integer::from_i64(-4)));

        let bytes = encode(&schema, &record).unwrap();
        assert_eq!(bytes, vec![0x30, 0x06, 0x02, 0x01, 0x03, 0x02, 0x01, 0xfc]);

        let decoded = Decoder::new(&bytes).decode(&schema).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn unexpected_tag() {
        let schema = point_schema();
        // OCTET STRING where an INTEGER is declared
        let bytes = [0x30, 0x06, 0x04, 0x01, 0x03, 0x02, 0x01, 0xfc];
        let err = Decoder::new(&bytes).decode(&schema).unwrap_err();
        assert_eq!(err, Error::UnexpectedTag { expected: 0x02, got: 0x04 });
    }

    #[test]
    fn tagged_without_metadata() {
        let schema = Schema::sequence(vec![Field::new("v", FieldType::Integer)]);
        // [0] primitive with no implicit metadata on the schema element
        let bytes = [0x30, 0x03, 0x80, 0x01, 0x05];
        let err = Decoder::new(&bytes).decode(&schema).unwrap_err();
        assert_eq!(err, Error::TaggedWithoutMetadata);
    }

    #[test]
    fn explicit_field_round_trip() {
        let schema =
            Schema::sequence(vec![Field::new("version", FieldType::Integer).explicit(0)]);
        let mut record = Record::new();
        record.set_value("version", Value::Integer(Integer::from_i64(2)));

        let bytes = encode(&schema, &record).unwrap();
        assert_eq!(bytes, vec![0x30, 0x05, 0xa0, 0x03, 0x02, 0x01, 0x02]);
        assert_eq!(Decoder::new(&bytes).decode(&schema).unwrap(), record);
    }

    #[test]
    fn implicit_field_round_trip() {
        let schema =
            Schema::sequence(vec![Field::new("data", FieldType::OctetString).implicit(1)]);
        let mut record = Record::new();
        record.set_value("data", Value::OctetString(vec![0xaa, 0xbb]));

        let bytes = encode(&schema, &record).unwrap();
        assert_eq!(bytes, vec![0x30, 0x04, 0x81, 0x02, 0xaa, 0xbb]);
        assert_eq!(Decoder::new(&bytes).decode(&schema).unwrap(), record);
    }

    #[test]
    fn optional_field_absent() {
        let schema = Schema::sequence(vec![
            Field::new("n", FieldType::Integer),
            Field::new("params", FieldType::ObjectIdentifier).explicit(0).optional(),
        ]);
        let bytes = [0x30, 0x03, 0x02, 0x01, 0x07];
        let record = Decoder::new(&bytes).decode(&schema).unwrap();
        assert_eq!(record.value("n").unwrap(), &Value::Integer(Integer::from_i64(7)));
        assert_eq!(record.get("params").unwrap(), &Item::Absent);

        // absent stays absent on re-encode
        assert_eq!(encode(&schema, &record).unwrap(), bytes);
    }

    #[test]
    fn nested_model_consumption() {
        // inner record contributes fields without its own envelope
        let schema = Schema::sequence(vec![
            Field::new("inner", FieldType::Nested).model(Schema::nested(vec![
                Field::new("a", FieldType::Integer),
                Field::new("b", FieldType::Integer),
            ])),
            Field::new("tail", FieldType::OctetString),
        ]);

        let bytes =
            [0x30, 0x09, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x04, 0x01, 0xff];
        let record = Decoder::new(&bytes).decode(&schema).unwrap();
        let inner = record.record("inner").unwrap();
        assert_eq!(inner.value("a").unwrap(), &Value::Integer(Integer::from_i64(1)));
        assert_eq!(inner.value("b").unwrap(), &Value::Integer(Integer::from_i64(2)));
        assert_eq!(record.bytes("tail").unwrap(), &[0xff]);

        assert_eq!(encode(&schema, &record).unwrap(), bytes);
    }

    #[test]
    fn octet_string_carrying_der() {
        // PKCS#8 pattern: an OCTET STRING whose content is itself DER
        let schema = Schema::sequence(vec![Field::new("key", FieldType::OctetString)
            .model(Schema::sequence(vec![Field::new("d", FieldType::Integer)]))]);

        let mut inner = Record::new();
        inner.set_value("d", Value::Integer(Integer::from_i64(9)));
        let mut record = Record::new();
        record.set("key", Item::Record(inner));

        let bytes = encode(&schema, &record).unwrap();
        assert_eq!(bytes, vec![0x30, 0x07, 0x04, 0x05, 0x30, 0x03, 0x02, 0x01, 0x09]);
        assert_eq!(Decoder::new(&bytes).decode(&schema).unwrap(), record);
    }

    #[test]
    fn transformer_composition() {
        fn pad4(value: Value) -> crate::asn1::Result<Value> {
            let Value::OctetString(bytes) = value else {
                return Err(Error::InvalidValue("expected octets".to_string()));
            };
            let mut padded = vec![0u8; 4_usize.saturating_sub(bytes.len())];
            padded.extend_from_slice(&bytes);
            Ok(Value::OctetString(padded))
        }
        fn strip(value: Value) -> crate::asn1::Result<Value> {
            let Value::OctetString(bytes) = value else {
                return Err(Error::InvalidValue("expected octets".to_string()));
            };
            let at = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
            Ok(Value::OctetString(bytes[at..].to_vec()))
        }

        let schema = Schema::sequence(vec![Field::new("scalar", FieldType::OctetString)
            .decode_with(pad4)
            .encode_with(strip)]);

        let bytes = [0x30, 0x04, 0x04, 0x02, 0x01, 0x02];
        let record = Decoder::new(&bytes).decode(&schema).unwrap();
        assert_eq!(record.bytes("scalar").unwrap(), &[0x00, 0x00, 0x01, 0x02]);

        // encode strips back to the wire form
        assert_eq!(encode(&schema, &record).unwrap(), bytes);
    }
}
