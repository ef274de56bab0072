//! # ASN.1 Node Model
//!
//! Value-typed representation of the supported universal types, together
//! with the tag class/method options that control how a value is framed on
//! the wire. [`Node::encode`] assembles the tag/length/value triple,
//! including explicit-tag wrapping.

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::asn1::{Error, Result, length};

/// Universal type identifier for BOOLEAN.
pub const BOOLEAN: u8 = 0x01;
/// Universal type identifier for INTEGER.
pub const INTEGER: u8 = 0x02;
/// Universal type identifier for BIT STRING.
pub const BIT_STRING: u8 = 0x03;
/// Universal type identifier for OCTET STRING.
pub const OCTET_STRING: u8 = 0x04;
/// Universal type identifier for NULL.
pub const NULL: u8 = 0x05;
/// Universal type identifier for OBJECT IDENTIFIER.
pub const OBJECT_IDENTIFIER: u8 = 0x06;
/// Universal type identifier for SEQUENCE.
pub const SEQUENCE: u8 = 0x10;

/// Highest tag number encodable in a single identifier octet.
pub const MAX_TAG: u8 = 30;

/// Tag class bits of the identifier octet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Class {
    /// Universal class (native X.690 types).
    #[default]
    Universal = 0x00,
    /// Application class.
    Application = 0x40,
    /// Context-specific class.
    ContextSpecific = 0x80,
    /// Private class.
    Private = 0xc0,
}

impl Class {
    /// Extract the class bits from an identifier octet.
    #[must_use]
    pub const fn of(tag: u8) -> Self {
        match tag & 0xc0 {
            0x40 => Self::Application,
            0x80 => Self::ContextSpecific,
            0xc0 => Self::Private,
            _ => Self::Universal,
        }
    }
}

/// Primitive/constructed bit of the identifier octet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Method {
    /// Content octets encode the value directly.
    #[default]
    Primitive = 0x00,
    /// Content octets are a concatenation of inner TLVs.
    Constructed = 0x20,
}

impl Method {
    /// Extract the constructed bit from an identifier octet.
    #[must_use]
    pub const fn of(tag: u8) -> Self {
        if tag & 0x20 == 0 { Self::Primitive } else { Self::Constructed }
    }
}

/// An INTEGER held as its canonical two's-complement content octets.
///
/// Storing the content form keeps the codec free of a bignum dependency:
/// RSA and EC parameters only ever need the big-endian bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Integer {
    bytes: Vec<u8>,
}

impl Integer {
    /// Minimal two's-complement encoding of a machine integer.
    #[must_use]
    pub fn from_i64(value: i64) -> Self {
        let be = value.to_be_bytes();
        let mut start = 0;
        while start < be.len() - 1 {
            let redundant = (be[start] == 0x00 && be[start + 1] & 0x80 == 0)
                || (be[start] == 0xff && be[start + 1] & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        Self { bytes: be[start..].to_vec() }
    }

    /// Interpret big-endian magnitude bytes as a non-negative integer,
    /// prepending the 0x00 pad octet when the top bit is set.
    #[must_use]
    pub fn from_unsigned_be(magnitude: &[u8]) -> Self {
        let trimmed: &[u8] = match magnitude.iter().position(|&b| b != 0) {
            Some(at) => &magnitude[at..],
            None => &[0x00],
        };
        let mut bytes = Vec::with_capacity(trimmed.len() + 1);
        if trimmed[0] & 0x80 != 0 {
            bytes.push(0x00);
        }
        bytes.extend_from_slice(trimmed);
        Self { bytes }
    }

    /// Decode content octets, stripping the sign-preserving 0x00 pad.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when the content is empty.
    pub fn from_der(content: &[u8]) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::InvalidValue("empty integer".to_string()));
        }
        let mut start = 0;
        while start < content.len() - 1 && content[start] == 0x00 && content[start + 1] & 0x80 == 0
        {
            start += 1;
        }
        Ok(Self { bytes: content[start..].to_vec() })
    }

    /// Canonical content octets.
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Big-endian magnitude with leading zero octets stripped.
    ///
    /// Only meaningful for non-negative values, which is all the key
    /// schemas traffic in.
    #[must_use]
    pub fn magnitude(&self) -> &[u8] {
        let at = self.bytes.iter().position(|&b| b != 0).unwrap_or(self.bytes.len() - 1);
        &self.bytes[at..]
    }

    /// Whether the encoded value is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.bytes.first().is_some_and(|b| b & 0x80 != 0)
    }

    /// The value as an `i64`, when it fits.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        if self.bytes.len() > 8 {
            return None;
        }
        let fill = if self.is_negative() { 0xff } else { 0x00 };
        let mut be = [fill; 8];
        be[8 - self.bytes.len()..].copy_from_slice(&self.bytes);
        Some(i64::from_be_bytes(be))
    }
}

/// A BIT STRING: content octets plus the count of unused trailing bits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitString {
    /// The bit content, most significant bit first.
    pub bytes: Vec<u8>,
    /// Unused bits in the final octet (0..=7).
    pub unused: u8,
}

impl BitString {
    /// A bit string with no unused trailing bits.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), unused: 0 }
    }

    /// Decode content octets: the leading octet is the unused-bit count.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when the unused-bit count exceeds 7.
    pub fn from_der(content: &[u8]) -> Result<Self> {
        let Some((&unused, bytes)) = content.split_first() else {
            return Ok(Self::default());
        };
        if unused > 7 {
            return Err(Error::InvalidValue(format!("{unused} unused bits")));
        }
        Ok(Self { bytes: bytes.to_vec(), unused })
    }

    /// Content octets: unused-bit count followed by the bit content.
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.bytes.len());
        out.push(self.unused);
        out.extend_from_slice(&self.bytes);
        out
    }
}

/// An OBJECT IDENTIFIER as its arc values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Oid(Vec<u64>);

impl Oid {
    /// Build from arc values.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when fewer than two arcs are supplied or the first
    /// two arcs violate the X.660 constraints (first ∈ 0..=2; second < 40
    /// when the first is 0 or 1).
    pub fn new(arcs: impl Into<Vec<u64>>) -> Result<Self> {
        let arcs = arcs.into();
        if arcs.len() < 2 {
            return Err(Error::InvalidValue("OID requires at least two arcs".to_string()));
        }
        if arcs[0] > 2 {
            return Err(Error::InvalidValue(format!("invalid first arc {}", arcs[0])));
        }
        if arcs[0] < 2 && arcs[1] >= 40 {
            return Err(Error::InvalidValue(format!("invalid second arc {}", arcs[1])));
        }
        Ok(Self(arcs))
    }

    /// The arc values.
    #[must_use]
    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    /// Decode content octets.
    ///
    /// # Errors
    ///
    /// `InvalidValue` on empty content, a truncated base-128 group, or
    /// arc-constraint violations.
    pub fn from_der(content: &[u8]) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::InvalidValue("empty OID".to_string()));
        }

        let mut values = Vec::new();
        let mut acc = 0u64;
        for (i, &b) in content.iter().enumerate() {
            acc = (acc << 7) | u64::from(b & 0x7f);
            if b & 0x80 == 0 {
                values.push(acc);
                acc = 0;
            } else if i == content.len() - 1 {
                return Err(Error::InvalidValue("truncated OID arc".to_string()));
            }
        }

        let first = values[0];
        let (a, b) = match first {
            0..=39 => (0, first),
            40..=79 => (1, first - 40),
            _ => (2, first - 80),
        };

        let mut arcs = vec![a, b];
        arcs.extend_from_slice(&values[1..]);
        Self::new(arcs)
    }

    /// Content octets: first two arcs packed as `40 * a + b`, remaining
    /// arcs base-128 with the continuation bit on all but the final octet.
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::new();
        base128(&mut out, self.0[0] * 40 + self.0[1]);
        for &arc in &self.0[2..] {
            base128(&mut out, arc);
        }
        out
    }
}

fn base128(out: &mut Vec<u8>, value: u64) {
    let mut groups = [0u8; 10];
    let mut count = 0;
    let mut v = value;
    loop {
        groups[count] = (v & 0x7f) as u8;
        count += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (1..count).rev() {
        out.push(groups[i] | 0x80);
    }
    out.push(groups[0]);
}

impl Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dotted =
            self.0.iter().map(ToString::to_string).collect::<Vec<_>>().join(".");
        write!(f, "{dotted}")
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let arcs = s
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| Error::InvalidValue(format!("invalid OID arc `{part}`")))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(arcs)
    }
}

/// A decoded ASN.1 value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// BOOLEAN.
    Boolean(bool),
    /// INTEGER.
    Integer(Integer),
    /// BIT STRING.
    BitString(BitString),
    /// OCTET STRING.
    OctetString(Vec<u8>),
    /// NULL.
    Null,
    /// OBJECT IDENTIFIER.
    ObjectIdentifier(Oid),
    /// SEQUENCE of child nodes.
    Sequence(Vec<Node>),
}

impl Value {
    /// The universal type identifier for this value.
    #[must_use]
    pub const fn type_id(&self) -> u8 {
        match self {
            Self::Boolean(_) => BOOLEAN,
            Self::Integer(_) => INTEGER,
            Self::BitString(_) => BIT_STRING,
            Self::OctetString(_) => OCTET_STRING,
            Self::Null => NULL,
            Self::ObjectIdentifier(_) => OBJECT_IDENTIFIER,
            Self::Sequence(_) => SEQUENCE,
        }
    }

    /// Whether an identifier octet's tag number matches this value's type.
    #[must_use]
    pub const fn check_type(&self, tag: u8) -> bool {
        tag & 0x1f == self.type_id()
    }

    /// Content octets for this value (no tag, no length).
    ///
    /// # Errors
    ///
    /// Propagates encoding failures from sequence children.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        match self {
            Self::Boolean(v) => Ok(vec![if *v { 0xff } else { 0x00 }]),
            Self::Integer(v) => Ok(v.to_der()),
            Self::BitString(v) => Ok(v.to_der()),
            Self::OctetString(v) => Ok(v.clone()),
            Self::Null => Ok(vec![]),
            Self::ObjectIdentifier(v) => Ok(v.to_der()),
            Self::Sequence(children) => {
                let mut out = Vec::new();
                for child in children {
                    out.extend_from_slice(&child.encode()?);
                }
                Ok(out)
            }
        }
    }
}

/// A value plus the framing options that control its encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// The value to encode.
    pub value: Value,
    /// Tag class.
    pub class: Class,
    /// Primitive or constructed content.
    pub method: Method,
    /// Explicit tag number: the universal TLV is wrapped in an outer
    /// constructed TLV carrying this tag.
    pub explicit: Option<u8>,
    /// Implicit tag number: replaces the universal tag number in place.
    pub implicit: Option<u8>,
}

impl Node {
    /// A universal-class node with the value's natural method.
    #[must_use]
    pub fn universal(value: Value) -> Self {
        let method = match value {
            Value::Sequence(_) => Method::Constructed,
            _ => Method::Primitive,
        };
        Self { value, class: Class::Universal, method, explicit: None, implicit: None }
    }

    /// Encode the node as a TLV.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when the tagging options are inconsistent: both
    /// explicit and implicit set, a non-universal class without a tag
    /// number, a universal class with one, or a tag number above 30.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.check_tagging()?;

        let method = match self.value {
            Value::Sequence(_) => Method::Constructed,
            _ => self.method,
        };
        let content = self.value.to_der()?;

        if let Some(tag) = self.explicit {
            let inner = tlv(Class::Universal as u8 | method as u8 | self.value.type_id(), &content);
            return Ok(tlv(self.class as u8 | Method::Constructed as u8 | tag, &inner));
        }
        if let Some(tag) = self.implicit {
            return Ok(tlv(self.class as u8 | method as u8 | tag, &content));
        }
        Ok(tlv(self.class as u8 | method as u8 | self.value.type_id(), &content))
    }

    fn check_tagging(&self) -> Result<()> {
        if self.explicit.is_some() && self.implicit.is_some() {
            return Err(Error::InvalidValue(
                "at most one of explicit/implicit may be set".to_string(),
            ));
        }
        let tag = self.explicit.or(self.implicit);
        if let Some(tag) = tag {
            if tag > MAX_TAG {
                return Err(Error::InvalidValue(format!("tag number {tag} out of range")));
            }
        }
        if self.class == Class::Universal && tag.is_some() {
            return Err(Error::InvalidValue(
                "universal class must not carry a tag number".to_string(),
            ));
        }
        if self.class != Class::Universal && tag.is_none() {
            return Err(Error::InvalidValue(
                "non-universal class requires a tag number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Assemble a tag/length/value triple.
#[must_use]
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let len = length::encode(content.len(), false);
    let mut out = Vec::with_capacity(1 + len.len() + content.len());
    out.push(tag);
    out.extend_from_slice(&len);
    out.extend_from_slice(content);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integer_boundaries() {
        let encode = |v: i64| Node::universal(Value::Integer(Integer::from_i64(v))).encode();
        assert_eq!(encode(0).unwrap(), vec![0x02, 0x01, 0x00]);
        assert_eq!(encode(128).unwrap(), vec![0x02, 0x02, 0x00, 0x80]);
        assert_eq!(encode(-128).unwrap(), vec![0x02, 0x01, 0x80]);
        assert_eq!(encode(256).unwrap(), vec![0x02, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn integer_unsigned_padding() {
        let n = Integer::from_unsigned_be(&[0x80]);
        assert_eq!(n.to_der(), vec![0x00, 0x80]);
        assert_eq!(n.magnitude(), &[0x80]);
        assert!(!n.is_negative());

        let decoded = Integer::from_der(&[0x00, 0x80]).unwrap();
        assert_eq!(decoded.to_i64(), Some(128));
    }

    #[test]
    fn rsa_oid() {
        let oid: Oid = "1.2.840.113549".parse().unwrap();
        let node = Node::universal(Value::ObjectIdentifier(oid.clone())).encode().unwrap();
        assert_eq!(node, vec![0x06, 0x06, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d]);

        let round = Oid::from_der(&node[2..]).unwrap();
        assert_eq!(round, oid);
        assert_eq!(round.to_string(), "1.2.840.113549");
    }

    #[test]
    fn oid_arc_constraints() {
        assert!(Oid::new(vec![3, 1]).is_err());
        assert!(Oid::new(vec![1, 40]).is_err());
        assert!(Oid::new(vec![2, 100]).is_ok());
        assert!(Oid::new(vec![1]).is_err());
    }

    #[test]
    fn bit_string() {
        let bits = BitString::new(*b"Hello");
        let node = Node::universal(Value::BitString(bits.clone())).encode().unwrap();
        assert_eq!(node, vec![0x03, 0x06, 0x00, 0x48, 0x65, 0x6c, 0x6c, 0x6f]);
        assert_eq!(BitString::from_der(&node[2..]).unwrap(), bits);
    }

    #[test]
    fn null_and_boolean() {
        assert_eq!(Node::universal(Value::Null).encode().unwrap(), vec![0x05, 0x00]);
        assert_eq!(
            Node::universal(Value::Boolean(true)).encode().unwrap(),
            vec![0x01, 0x01, 0xff]
        );
    }

    #[test]
    fn explicit_wrapping() {
        let node = Node {
            value: Value::Integer(Integer::from_i64(5)),
            class: Class::ContextSpecific,
            method: Method::Primitive,
            explicit: Some(0),
            implicit: None,
        };
        // [0] EXPLICIT wraps the universal TLV
        assert_eq!(node.encode().unwrap(), vec![0xa0, 0x03, 0x02, 0x01, 0x05]);
    }

    #[test]
    fn implicit_retagging() {
        let node = Node {
            value: Value::OctetString(vec![0xde, 0xad]),
            class: Class::ContextSpecific,
            method: Method::Primitive,
            explicit: None,
            implicit: Some(1),
        };
        assert_eq!(node.encode().unwrap(), vec![0x81, 0x02, 0xde, 0xad]);
    }

    #[test]
    fn tagging_invariants() {
        let mut node = Node::universal(Value::Null);
        node.explicit = Some(0);
        node.implicit = Some(1);
        node.class = Class::ContextSpecific;
        assert!(node.encode().is_err());

        let mut node = Node::universal(Value::Null);
        node.class = Class::ContextSpecific;
        assert!(node.encode().is_err());

        let mut node = Node::universal(Value::Null);
        node.explicit = Some(0);
        assert!(node.encode().is_err());
    }

    #[test]
    fn sequence_concatenates_children() {
        let seq = Value::Sequence(vec![
            Node::universal(Value::Integer(Integer::from_i64(1))),
            Node::universal(Value::OctetString(vec![0xab])),
        ]);
        assert_eq!(
            Node::universal(seq).encode().unwrap(),
            vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x04, 0x01, 0xab]
        );
    }
}
