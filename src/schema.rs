//! Schema declarations.
//!
//! A [`SchemaNode`] tree describes the shape of a value. It is purely
//! structural; [`crate::codec::Protocol::compile`] is the only thing that
//! interprets it.

use serde_json::Value as Json;

use crate::error::SchemaError;

/// The kind of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    UInt8,
    UInt16,
    UInt32,
    /// Signed 32-bit, two's complement.
    Int32,
    String,
    /// Opaque bytes.
    Buffer,
    Boolean,
    /// Signed arbitrary-precision integer, zigzag mapped on the wire.
    BigInt,
    /// Unsigned arbitrary-precision integer.
    UBigInt,
    /// Any structural value carried as JSON text.
    JsonFallback,
    /// Zero-width marker; the field may be absent.
    Undefined,
    /// Variable-length sequence of one element shape.
    Array(Box<SchemaNode>),
    /// Fixed-length positional tuple.
    Union(Vec<SchemaNode>),
    /// Named record; field order is the write order.
    Object(Vec<SchemaNode>),
}

impl Kind {
    /// The declaration name of this kind, as used in error messages and in
    /// JSON declarations.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::UInt8 => "UInt8",
            Kind::UInt16 => "UInt16",
            Kind::UInt32 => "UInt32",
            Kind::Int32 => "Int32",
            Kind::String => "String",
            Kind::Buffer => "Buffer",
            Kind::Boolean => "Boolean",
            Kind::BigInt => "BigInt",
            Kind::UBigInt => "UBigInt",
            Kind::JsonFallback => "JSONFallback",
            Kind::Undefined => "Undefined",
            Kind::Array(_) => "Array",
            Kind::Union(_) => "Union",
            Kind::Object(_) => "Object",
        }
    }

    /// Fewest bytes any value of this kind occupies on the wire.
    pub fn min_width(&self) -> usize {
        match self {
            Kind::Undefined => 0,
            Kind::UInt16 => 2,
            Kind::UInt32 | Kind::Int32 => 4,
            Kind::UInt8
            | Kind::String
            | Kind::Buffer
            | Kind::Boolean
            | Kind::BigInt
            | Kind::UBigInt
            | Kind::JsonFallback
            | Kind::Array(_)
            | Kind::Union(_)
            | Kind::Object(_) => 1,
        }
    }
}

/// A named node of a schema tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Diagnostic name; for object fields it is also the key.
    pub name: String,
    pub kind: Kind,
}

impl SchemaNode {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        SchemaNode {
            name: name.into(),
            kind,
        }
    }

    pub fn uint8(name: impl Into<String>) -> Self {
        Self::new(name, Kind::UInt8)
    }

    pub fn uint16(name: impl Into<String>) -> Self {
        Self::new(name, Kind::UInt16)
    }

    pub fn uint32(name: impl Into<String>) -> Self {
        Self::new(name, Kind::UInt32)
    }

    pub fn int32(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Int32)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, Kind::String)
    }

    pub fn buffer(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Buffer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Boolean)
    }

    pub fn bigint(name: impl Into<String>) -> Self {
        Self::new(name, Kind::BigInt)
    }

    pub fn ubigint(name: impl Into<String>) -> Self {
        Self::new(name, Kind::UBigInt)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, Kind::JsonFallback)
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        Self::new(name, Kind::Undefined)
    }

    pub fn array(name: impl Into<String>, element: SchemaNode) -> Self {
        Self::new(name, Kind::Array(Box::new(element)))
    }

    pub fn union(name: impl Into<String>, elements: Vec<SchemaNode>) -> Self {
        Self::new(name, Kind::Union(elements))
    }

    pub fn object(name: impl Into<String>, fields: Vec<SchemaNode>) -> Self {
        Self::new(name, Kind::Object(fields))
    }

    /// Parse a JSON declaration such as
    /// `{"type": "Array", "name": "tags", "element": {"type": "String", "name": "tag"}}`.
    ///
    /// Composite kinds take their children from `element` (arrays), `elements`
    /// (unions) or `fields` (objects). `JSONObject` is accepted as an alias of
    /// `JSONFallback`.
    pub fn from_json(decl: &Json) -> Result<Self, SchemaError> {
        let obj = decl
            .as_object()
            .ok_or_else(|| SchemaError::Malformed(format!("declaration must be an object, got {decl}")))?;
        let name = obj
            .get("name")
            .and_then(Json::as_str)
            .ok_or_else(|| SchemaError::Malformed(format!("declaration without a name: {decl}")))?;
        let kind = obj
            .get("type")
            .and_then(Json::as_str)
            .ok_or_else(|| SchemaError::Malformed(format!("declaration '{name}' without a type")))?;

        let children = |key: &str| -> Result<Vec<SchemaNode>, SchemaError> {
            obj.get(key)
                .and_then(Json::as_array)
                .ok_or_else(|| SchemaError::Malformed(format!("{kind} '{name}' requires '{key}'")))?
                .iter()
                .map(SchemaNode::from_json)
                .collect()
        };

        let kind = match kind {
            "UInt8" => Kind::UInt8,
            "UInt16" => Kind::UInt16,
            "UInt32" => Kind::UInt32,
            "Int32" => Kind::Int32,
            "String" => Kind::String,
            "Buffer" => Kind::Buffer,
            "Boolean" => Kind::Boolean,
            "BigInt" => Kind::BigInt,
            "UBigInt" => Kind::UBigInt,
            "JSONFallback" | "JSONObject" => Kind::JsonFallback,
            "Undefined" => Kind::Undefined,
            "Array" => {
                let element = obj.get("element").ok_or_else(|| {
                    SchemaError::Malformed(format!("Array '{name}' requires 'element'"))
                })?;
                Kind::Array(Box::new(SchemaNode::from_json(element)?))
            }
            "Union" => Kind::Union(children("elements")?),
            "Object" => Kind::Object(children("fields")?),
            other => {
                return Err(SchemaError::UnknownKind {
                    name: name.to_string(),
                    kind: other.to_string(),
                })
            }
        };
        Ok(SchemaNode::new(name, kind))
    }

    /// Parse a JSON declaration from text.
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        let decl: Json =
            serde_json::from_str(text).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        Self::from_json(&decl)
    }
}
