/// Errors raised while compiling or loading a schema declaration.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown kind '{kind}' declared for field '{name}'")]
    UnknownKind { name: String, kind: String },

    #[error("malformed declaration: {0}")]
    Malformed(String),

    #[error("object '{name}' declares {count} fields, at most 255 are supported")]
    TooManyFields { name: String, count: usize },

    #[error("union '{name}' declares {count} elements, at most 255 are supported")]
    TooManyElements { name: String, count: usize },

    #[error("duplicate field '{field}' in object '{name}'")]
    DuplicateField { name: String, field: String },
}

/// Errors from the schema-driven and tagged encoders.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("type mismatch for field '{field}': expected {expected}, got {actual}")]
    WriteType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("value {value} is out of range for field '{field}' of kind {kind}")]
    OutOfRange {
        field: String,
        kind: &'static str,
        value: String,
    },

    #[error("unknown key '{key}' in object '{object}'")]
    UnknownKey { object: String, key: String },

    #[error("missing field '{field}' in object '{object}'")]
    MissingField { object: String, field: String },

    #[error("union '{field}' expects {expected} elements, got {actual}")]
    UnionArity {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("json encoding failed for field '{field}': {source}")]
    Json {
        field: String,
        source: serde_json::Error,
    },

    #[error("cannot serialize {0}")]
    Unsupported(String),
}

/// Errors from the schema-driven and tagged decoders.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("read past end of input at offset {offset}: need {need} bytes, have {have}")]
    OutOfBounds {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("varint at offset {offset} announces {len} bytes, at most {max} are allowed")]
    VarintTooLong { offset: usize, len: usize, max: usize },

    #[error("varint at offset {offset} overflows the target integer width")]
    VarintOverflow { offset: usize },

    #[error("invalid utf-8 string at offset {offset}: {source}")]
    InvalidUtf8 {
        offset: usize,
        source: std::str::Utf8Error,
    },

    #[error("invalid boolean byte {byte:#04x} at offset {offset}")]
    InvalidBoolean { offset: usize, byte: u8 },

    #[error("array at offset {offset} announces {count} elements, at most {max} are allowed")]
    LengthLimit { offset: usize, count: u64, max: u64 },

    #[error("negative zero big integer at offset {offset}")]
    NegativeZero { offset: usize },

    #[error("unknown key '{key}' in object '{object}'")]
    UnknownKey { object: String, key: String },

    #[error("duplicate key '{key}' in object '{object}'")]
    DuplicateKey { object: String, key: String },

    #[error("missing field '{field}' in object '{object}'")]
    MissingField { object: String, field: String },

    #[error("union '{field}' expects {expected} elements, got {actual}")]
    UnionArity {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown wire tag {tag} at offset {offset}")]
    UnknownWireTag { tag: u8, offset: usize },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{remaining} trailing bytes after value")]
    TrailingBytes { remaining: usize },

    #[error("nesting deeper than {0} levels")]
    DepthLimit(usize),

    #[error("field '{field}' ({kind}): {source}")]
    InField {
        field: String,
        kind: &'static str,
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Attach the declared field name and kind to a low-level read failure.
    ///
    /// Errors that already carry field context are returned unchanged, so only
    /// the innermost field is reported.
    pub fn in_field(self, field: &str, kind: &'static str) -> Self {
        match self {
            DecodeError::InField { .. }
            | DecodeError::UnknownKey { .. }
            | DecodeError::DuplicateKey { .. }
            | DecodeError::MissingField { .. }
            | DecodeError::UnionArity { .. } => self,
            other => DecodeError::InField {
                field: field.to_string(),
                kind,
                source: Box::new(other),
            },
        }
    }

    /// The underlying failure with any field context stripped.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            DecodeError::InField { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Top-level error type that wraps all sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_field_wraps_once() {
        let err = DecodeError::OutOfBounds {
            offset: 3,
            need: 4,
            have: 1,
        }
        .in_field("inner", "UInt32")
        .in_field("outer", "Object");

        match &err {
            DecodeError::InField { field, kind, .. } => {
                assert_eq!(field, "inner");
                assert_eq!(*kind, "UInt32");
            }
            other => panic!("expected field context, got {other:?}"),
        }
        assert!(matches!(err.root_cause(), DecodeError::OutOfBounds { need: 4, .. }));
    }

    #[test]
    fn test_write_type_message() {
        let err = EncodeError::WriteType {
            field: "element".into(),
            expected: "String",
            actual: "integer",
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for field 'element': expected String, got integer"
        );
    }
}
