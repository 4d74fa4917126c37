//! Logical record schema. Pure data; no Arrow dependency here.
//!
//! `rowstream-io` maps these onto Arrow/Parquet types at the I/O boundary.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Row, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Binary,
}

impl DataType {
    /// Whether a non-null scalar can be stored in a column of this type.
    ///
    /// Widening is allowed (`I32` into `Int64`, `F32` into `Float64`); narrowing is not.
    pub fn accepts(&self, value: &Scalar) -> bool {
        matches!(
            (self, value),
            (DataType::Boolean, Scalar::Bool(_))
                | (DataType::Int32, Scalar::I32(_))
                | (DataType::Int64, Scalar::I32(_) | Scalar::I64(_))
                | (DataType::Float32, Scalar::F32(_))
                | (DataType::Float64, Scalar::F32(_) | Scalar::F64(_))
                | (DataType::Utf8, Scalar::Str(_))
                | (DataType::Binary, Scalar::Bin(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reject schemas that cannot describe a record: no fields, or duplicate names.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::Schema("record schema has no fields".into()));
        }
        for (i, f) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|g| g.name == f.name) {
                return Err(Error::Schema(format!("duplicate field name '{}'", f.name)));
            }
        }
        Ok(())
    }

    /// Check that `row` can be stored under this schema.
    pub fn check_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.fields.len() {
            return Err(Error::Schema(format!(
                "row has {} values but schema has {} fields",
                row.len(),
                self.fields.len()
            )));
        }
        for (field, value) in self.fields.iter().zip(row.iter()) {
            match value {
                Scalar::Null if field.nullable => {}
                Scalar::Null => {
                    return Err(Error::Schema(format!(
                        "null value in non-nullable field '{}'",
                        field.name
                    )))
                }
                v if field.data_type.accepts(v) => {}
                v => {
                    return Err(Error::Schema(format!(
                        "type mismatch in field '{}': expected {:?}, got {}",
                        field.name,
                        field.data_type,
                        v.type_name()
                    )))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ])
    }

    #[test]
    fn check_row_accepts_widening_and_nulls() {
        let s = schema();
        assert!(s.check_row(&vec![Scalar::I32(1), Scalar::Null]).is_ok());
        assert!(s
            .check_row(&vec![Scalar::I64(1), Scalar::Str("a".into())])
            .is_ok());
    }

    #[test]
    fn check_row_rejects_bad_rows() {
        let s = schema();
        assert!(s.check_row(&vec![Scalar::I64(1)]).is_err());
        assert!(s.check_row(&vec![Scalar::Null, Scalar::Null]).is_err());
        let err = s
            .check_row(&vec![Scalar::Str("x".into()), Scalar::Null])
            .unwrap_err();
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn validate_rejects_duplicates() {
        let s = Schema::new(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("a", DataType::Utf8, false),
        ]);
        assert!(s.validate().is_err());
        assert!(Schema::new(vec![]).validate().is_err());
        assert!(schema().validate().is_ok());
    }
}
