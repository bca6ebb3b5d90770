use super::error::{RecordError, RecordResult};

/// Attribute data type. The STRING variant carries its fixed byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,           // 4 bytes
    String(usize), // n bytes, fixed length
    Float,         // 4 bytes
    Bool,          // 1 byte
}

impl DataType {
    /// Width in bytes of a value of this type inside a record buffer.
    pub fn size(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::String(n) => *n,
            DataType::Float => 4,
            DataType::Bool => 1,
        }
    }

    /// Integer code used in on-disk table metadata.
    pub fn type_code(&self) -> u8 {
        match self {
            DataType::Int => 0,
            DataType::String(_) => 1,
            DataType::Float => 2,
            DataType::Bool => 3,
        }
    }

    /// Fixed length recorded in metadata (0 for non-STRING types).
    pub fn type_length(&self) -> usize {
        match self {
            DataType::String(n) => *n,
            _ => 0,
        }
    }

    pub fn from_code(code: u8, length: usize) -> RecordResult<Self> {
        match code {
            0 => Ok(DataType::Int),
            1 => Ok(DataType::String(length)),
            2 => Ok(DataType::Float),
            3 => Ok(DataType::Bool),
            _ => Err(RecordError::CorruptMetadata(format!(
                "unknown type code {}",
                code
            ))),
        }
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    String(String),
    Float(f32),
    Bool(bool),
}

impl Value {
    /// Encode this value into `buf` at the attribute's window. Scalars are
    /// little-endian; strings are zero-padded to the declared width.
    pub fn encode(&self, data_type: &DataType, buf: &mut [u8]) -> RecordResult<()> {
        debug_assert_eq!(buf.len(), data_type.size());

        match (self, data_type) {
            (Value::Int(i), DataType::Int) => buf.copy_from_slice(&i.to_le_bytes()),
            (Value::Float(f), DataType::Float) => buf.copy_from_slice(&f.to_le_bytes()),
            (Value::Bool(b), DataType::Bool) => buf[0] = *b as u8,
            (Value::String(s), DataType::String(max_len)) => {
                let bytes = s.as_bytes();
                if bytes.len() > *max_len {
                    return Err(RecordError::StringTooLong {
                        len: bytes.len(),
                        max: *max_len,
                    });
                }
                buf.fill(0);
                buf[..bytes.len()].copy_from_slice(bytes);
            }
            _ => {
                return Err(RecordError::TypeMismatch {
                    expected: format!("{:?}", data_type),
                    actual: format!("{:?}", self),
                })
            }
        }
        Ok(())
    }

    /// Decode a value of `data_type` from its window in a record buffer.
    /// Strings stop at the first NUL within the fixed window.
    pub fn decode(data_type: &DataType, buf: &[u8]) -> RecordResult<Self> {
        debug_assert_eq!(buf.len(), data_type.size());

        match data_type {
            DataType::Int => {
                let mut b = [0u8; 4];
                b.copy_from_slice(buf);
                Ok(Value::Int(i32::from_le_bytes(b)))
            }
            DataType::Float => {
                let mut b = [0u8; 4];
                b.copy_from_slice(buf);
                Ok(Value::Float(f32::from_le_bytes(b)))
            }
            DataType::Bool => Ok(Value::Bool(buf[0] != 0)),
            DataType::String(_) => {
                let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                let s = String::from_utf8(buf[..end].to_vec()).map_err(|e| {
                    RecordError::Deserialization(format!("invalid UTF-8 in string value: {}", e))
                })?;
                Ok(Value::String(s))
            }
        }
    }

    /// The boolean carried by this value, for predicate results.
    pub fn as_bool(&self) -> RecordResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RecordError::TypeMismatch {
                expected: "Bool".to_string(),
                actual: format!("{:?}", other),
            }),
        }
    }
}
