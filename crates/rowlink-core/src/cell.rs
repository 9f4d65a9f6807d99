//! Typed cells.
//!
//! [`Cell`] is a named, typed value inside a [`Row`](crate::Row).
//! [`CellValue`] carries the payload, one variant per [`DataType`].

use serde::{Deserialize, Serialize};

/// The declared type of a cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// A boolean value.
    Boolean,
    /// A 16-bit signed integer.
    Short,
    /// A 32-bit signed integer.
    Int,
    /// A 64-bit signed integer.
    Long,
    /// A 32-bit float.
    Float,
    /// A 64-bit float.
    Double,
    /// A UTF-8 string.
    String,
    /// Raw bytes.
    Bytes,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Boolean => "BOOLEAN",
            Self::Short => "SHORT",
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::String => "STRING",
            Self::Bytes => "BYTES",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "BOOLEAN" | "BOOL" => Ok(Self::Boolean),
            "SHORT" => Ok(Self::Short),
            "INT" => Ok(Self::Int),
            "LONG" => Ok(Self::Long),
            "FLOAT" => Ok(Self::Float),
            "DOUBLE" => Ok(Self::Double),
            "STRING" => Ok(Self::String),
            "BYTES" => Ok(Self::Bytes),
            other => Err(format!("unknown data type '{other}'")),
        }
    }
}

/// A typed cell payload.
///
/// Serialize-only: the wire form is JSON, which does not preserve numeric
/// widths, so rows are never read back through this type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// A boolean value.
    Boolean(bool),
    /// A 16-bit signed integer.
    Short(i16),
    /// A 32-bit signed integer.
    Int(i32),
    /// A 64-bit signed integer.
    Long(i64),
    /// A 32-bit float.
    Float(f32),
    /// A 64-bit float.
    Double(f64),
    /// A UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Returns the [`DataType`] of this value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Short(_) => DataType::Short,
            Self::Int(_) => DataType::Int,
            Self::Long(_) => DataType::Long,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::String(_) => DataType::String,
            Self::Bytes(_) => DataType::Bytes,
        }
    }

    /// Returns the serialized width of this value in bytes.
    ///
    /// Fixed widths for numerics and booleans, payload lengths for
    /// strings and bytes. Used for raw-record size metering.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        match self {
            Self::Boolean(_) => 1,
            Self::Short(_) => 2,
            Self::Int(_) | Self::Float(_) => 4,
            Self::Long(_) | Self::Double(_) => 8,
            Self::String(s) => s.len() as u64,
            Self::Bytes(b) => b.len() as u64,
        }
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i16> for CellValue {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for CellValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// A named, typed value inside a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    /// Cell name, matched against column definitions during validation.
    pub name: String,
    /// The typed payload.
    pub value: CellValue,
}

impl Cell {
    /// Creates a cell from a name and anything convertible to a [`CellValue`].
    pub fn new(name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the serialized width of this cell (name plus value).
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.name.len() as u64 + self.value.byte_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_roundtrip() {
        for dt in [
            DataType::Boolean,
            DataType::Short,
            DataType::Int,
            DataType::Long,
            DataType::Float,
            DataType::Double,
            DataType::String,
            DataType::Bytes,
        ] {
            let parsed: DataType = dt.to_string().parse().unwrap();
            assert_eq!(parsed, dt);
        }
    }

    #[test]
    fn test_data_type_parse_case_insensitive() {
        assert_eq!("int".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("bool".parse::<DataType>().unwrap(), DataType::Boolean);
        assert!("decimal".parse::<DataType>().is_err());
    }

    #[test]
    fn test_cell_value_data_type() {
        assert_eq!(CellValue::from(1i32).data_type(), DataType::Int);
        assert_eq!(CellValue::from("x").data_type(), DataType::String);
        assert_eq!(CellValue::from(vec![1u8]).data_type(), DataType::Bytes);
    }

    #[test]
    fn test_byte_sizes() {
        assert_eq!(CellValue::from(true).byte_size(), 1);
        assert_eq!(CellValue::from(7i16).byte_size(), 2);
        assert_eq!(CellValue::from(7i32).byte_size(), 4);
        assert_eq!(CellValue::from(7i64).byte_size(), 8);
        assert_eq!(CellValue::from("abc").byte_size(), 3);
        assert_eq!(Cell::new("id", 1i64).byte_size(), 2 + 8);
    }
}
