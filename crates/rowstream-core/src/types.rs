//! Scalar values and rows exchanged between `Record` types and the format engine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

/// One record in schema field order.
pub type Row = Vec<Scalar>;

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "Null",
            Scalar::Bool(_) => "Bool",
            Scalar::I32(_) => "I32",
            Scalar::I64(_) => "I64",
            Scalar::F32(_) => "F32",
            Scalar::F64(_) => "F64",
            Scalar::Str(_) => "Str",
            Scalar::Bin(_) => "Bin",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value, widening `I32`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::I32(v) => Some(*v as i64),
            Scalar::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value, widening `F32`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::F32(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Scalar::Bin(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::F32(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Scalar::Bin(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// Sequential field cursor over a decoded row, used by `Record::from_row`.
///
/// Every accessor consumes one value and fails with `Error::Schema` naming the
/// position when the value has the wrong type or the row is too short.
pub struct RowReader {
    values: std::vec::IntoIter<Scalar>,
    pos: usize,
}

macro_rules! required {
    ($name:ident, $opt:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty> {
            let pos = self.pos;
            self.$opt()?
                .ok_or_else(|| Error::Schema(format!("unexpected null at position {}", pos)))
        }
    };
}

impl RowReader {
    pub fn new(row: Row) -> Self {
        Self {
            values: row.into_iter(),
            pos: 0,
        }
    }

    fn take(&mut self) -> Result<Scalar> {
        let v = self.values.next().ok_or_else(|| {
            Error::Schema(format!("row ended before position {}", self.pos))
        })?;
        self.pos += 1;
        Ok(v)
    }

    fn mismatch(&self, expected: &str, got: &Scalar) -> Error {
        Error::Schema(format!(
            "expected {} at position {}, got {}",
            expected,
            self.pos.saturating_sub(1),
            got.type_name()
        ))
    }

    pub fn opt_bool(&mut self) -> Result<Option<bool>> {
        match self.take()? {
            Scalar::Null => Ok(None),
            Scalar::Bool(v) => Ok(Some(v)),
            other => Err(self.mismatch("Bool", &other)),
        }
    }

    pub fn opt_i32(&mut self) -> Result<Option<i32>> {
        match self.take()? {
            Scalar::Null => Ok(None),
            Scalar::I32(v) => Ok(Some(v)),
            other => Err(self.mismatch("I32", &other)),
        }
    }

    pub fn opt_i64(&mut self) -> Result<Option<i64>> {
        match self.take()? {
            Scalar::Null => Ok(None),
            Scalar::I64(v) => Ok(Some(v)),
            Scalar::I32(v) => Ok(Some(v as i64)),
            other => Err(self.mismatch("I64", &other)),
        }
    }

    pub fn opt_f32(&mut self) -> Result<Option<f32>> {
        match self.take()? {
            Scalar::Null => Ok(None),
            Scalar::F32(v) => Ok(Some(v)),
            other => Err(self.mismatch("F32", &other)),
        }
    }

    pub fn opt_f64(&mut self) -> Result<Option<f64>> {
        match self.take()? {
            Scalar::Null => Ok(None),
            Scalar::F64(v) => Ok(Some(v)),
            Scalar::F32(v) => Ok(Some(v as f64)),
            other => Err(self.mismatch("F64", &other)),
        }
    }

    pub fn opt_string(&mut self) -> Result<Option<String>> {
        match self.take()? {
            Scalar::Null => Ok(None),
            Scalar::Str(v) => Ok(Some(v)),
            other => Err(self.mismatch("Str", &other)),
        }
    }

    pub fn opt_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        match self.take()? {
            Scalar::Null => Ok(None),
            Scalar::Bin(v) => Ok(Some(v)),
            other => Err(self.mismatch("Bin", &other)),
        }
    }

    required!(bool, opt_bool, bool);
    required!(i32, opt_i32, i32);
    required!(i64, opt_i64, i64);
    required!(f32, opt_f32, f32);
    required!(f64, opt_f64, f64);
    required!(string, opt_string, String);
    required!(bytes, opt_bytes, Vec<u8>);

    /// Fail if values are left over after the record consumed its fields.
    pub fn finish(mut self) -> Result<()> {
        match self.values.next() {
            None => Ok(()),
            Some(_) => Err(Error::Schema(format!(
                "row has more than {} values",
                self.pos
            ))),
        }
    }
}
