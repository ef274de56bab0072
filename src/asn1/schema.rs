//! # Declarative Schemas
//!
//! A [`Schema`] maps a record's fields to ASN.1 elements: one element per
//! field, in wire order, plus a root element that frames the whole record.
//! Schemas are immutable values owned by the record type; the BER/DER
//! codec walks them to decode buffers into [`Record`]s and encode
//! [`Record`]s back to buffers.
//!
//! Transformers are plain functions applied after decode or before encode.
//! They compose in declaration order, and let a schema express, for
//! example, a fixed-width octet string that is really a big-endian
//! integer.

use crate::asn1::node::{Class, Method, Value};
use crate::asn1::{Error, Result};

/// Element type for a schema field.
///
/// The universal types map straight to their X.690 counterparts. `Bytes`
/// and `Nested` are internal: `Bytes` consumes raw octets without a TLV,
/// and `Nested` splices a child record's fields into the parent without an
/// envelope of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// BOOLEAN.
    Boolean,
    /// INTEGER.
    Integer,
    /// BIT STRING.
    BitString,
    /// OCTET STRING.
    OctetString,
    /// NULL.
    Null,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier,
    /// SEQUENCE described by a nested model.
    Sequence,
    /// Raw octets with a declared byte length, no TLV.
    Bytes,
    /// Child record spliced in without an envelope.
    Nested,
}

/// Pure transformation applied to a value after decode or before encode.
pub type Transform = fn(Value) -> Result<Value>;

/// The root element framing a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Root {
    /// The record's fields are wrapped in a SEQUENCE.
    Sequence,
    /// The record contributes fields to its parent without an envelope.
    Nested,
}

/// One record field bound to an ASN.1 element.
pub struct Field {
    pub(crate) name: &'static str,
    pub(crate) ty: FieldType,
    pub(crate) class: Class,
    pub(crate) method: Method,
    pub(crate) explicit: Option<u8>,
    pub(crate) implicit: Option<u8>,
    pub(crate) model: Option<Schema>,
    pub(crate) length: Option<usize>,
    pub(crate) optional: bool,
    pub(crate) encode_transforms: Vec<Transform>,
    pub(crate) decode_transforms: Vec<Transform>,
}

impl Field {
    /// A field of the given element type with universal tagging and the
    /// type's natural method.
    #[must_use]
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        let method = match ty {
            FieldType::Sequence | FieldType::Nested => Method::Constructed,
            _ => Method::Primitive,
        };
        Self {
            name,
            ty,
            class: Class::Universal,
            method,
            explicit: None,
            implicit: None,
            model: None,
            length: None,
            optional: false,
            encode_transforms: vec![],
            decode_transforms: vec![],
        }
    }

    /// Override the tag class.
    #[must_use]
    pub const fn class(mut self, class: Class) -> Self {
        self.class = class;
        self
    }

    /// Tag the element explicitly: the universal TLV is wrapped in an
    /// outer constructed TLV with this tag number. Defaults the class to
    /// context-specific.
    #[must_use]
    pub fn explicit(mut self, tag: u8) -> Self {
        self.explicit = Some(tag);
        if self.class == Class::Universal {
            self.class = Class::ContextSpecific;
        }
        self
    }

    /// Tag the element implicitly: this tag number replaces the universal
    /// one. Defaults the class to context-specific.
    #[must_use]
    pub fn implicit(mut self, tag: u8) -> Self {
        self.implicit = Some(tag);
        if self.class == Class::Universal {
            self.class = Class::ContextSpecific;
        }
        self
    }

    /// Attach the nested model describing this element's content.
    #[must_use]
    pub fn model(mut self, model: Schema) -> Self {
        self.model = Some(model);
        self
    }

    /// Declare the byte length of a `Bytes` element.
    #[must_use]
    pub const fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Mark the element optional: absence is recorded rather than being an
    /// error.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Append an encode transformer, applied before the value is encoded.
    #[must_use]
    pub fn encode_with(mut self, transform: Transform) -> Self {
        self.encode_transforms.push(transform);
        self
    }

    /// Append a decode transformer, applied after the value is decoded.
    #[must_use]
    pub fn decode_with(mut self, transform: Transform) -> Self {
        self.decode_transforms.push(transform);
        self
    }

    /// The field's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn apply_decode(&self, value: Value) -> Result<Value> {
        self.decode_transforms.iter().try_fold(value, |value, transform| transform(value))
    }

    pub(crate) fn apply_encode(&self, value: Value) -> Result<Value> {
        self.encode_transforms.iter().try_fold(value, |value, transform| transform(value))
    }
}

/// An immutable record schema: a root element and the ordered internal
/// elements. Field order defines wire order.
pub struct Schema {
    pub(crate) root: Root,
    pub(crate) fields: Vec<Field>,
}

impl Schema {
    /// A record wrapped in a SEQUENCE envelope.
    #[must_use]
    pub const fn sequence(fields: Vec<Field>) -> Self {
        Self { root: Root::Sequence, fields }
    }

    /// A record that contributes its fields to the parent's envelope.
    #[must_use]
    pub const fn nested(fields: Vec<Field>) -> Self {
        Self { root: Root::Nested, fields }
    }

    /// The record's fields in wire order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// A decoded field: a plain value, a nested record, or absent (optional
/// element not present on the wire).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// A decoded value.
    Value(Value),
    /// A nested record.
    Record(Record),
    /// An optional element that was not present.
    Absent,
}

/// An ordered map of decoded fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(&'static str, Item)>,
}

impl Record {
    /// An empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: vec![] }
    }

    /// Set a field, replacing any existing entry of the same name.
    pub fn set(&mut self, name: &'static str, item: Item) {
        if let Some(entry) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = item;
        } else {
            self.fields.push((name, item));
        }
    }

    /// Set a field to a plain value.
    pub fn set_value(&mut self, name: &'static str, value: Value) {
        self.set(name, Item::Value(value));
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Item> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, item)| item)
    }

    /// Look up a field holding a plain value.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name) {
            Some(Item::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Look up a nested record.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&Record> {
        match self.get(name) {
            Some(Item::Record(record)) => Some(record),
            _ => None,
        }
    }

    /// The octet content of a string-valued field.
    #[must_use]
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        match self.value(name) {
            Some(Value::OctetString(bytes)) => Some(bytes),
            Some(Value::BitString(bits)) => Some(&bits.bytes),
            _ => None,
        }
    }

    /// The big-endian magnitude of an integer-valued field.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when the field is missing or not an integer.
    pub fn magnitude(&self, name: &str) -> Result<Vec<u8>> {
        match self.value(name) {
            Some(Value::Integer(n)) => Ok(n.magnitude().to_vec()),
            _ => Err(Error::InvalidValue(format!("missing integer field `{name}`"))),
        }
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Item)> {
        self.fields.iter().map(|(name, item)| (*name, item))
    }
}
