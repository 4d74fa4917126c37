//! The `Record` trait: a compile-time schema descriptor for a row type.
//!
//! Readers and writers are generic over `T: Record`; the format engine never
//! inspects `T` at runtime beyond these three functions.

use crate::error::Result;
use crate::schema::Schema;
use crate::types::Row;

/// A fixed-shape record that can be stored as one row of a columnar file.
///
/// `to_row` must emit values in `schema()` field order. `from_row` receives
/// rows in the same order; `RowReader` is the usual way to consume them.
///
/// ```rust
/// use rowstream_core::prelude::*;
///
/// struct Trip { id: i64, city: Option<String> }
///
/// impl Record for Trip {
///     fn schema() -> Schema {
///         Schema::new(vec![
///             Field::new("id", DataType::Int64, false),
///             Field::new("city", DataType::Utf8, true),
///         ])
///     }
///     fn to_row(&self) -> Row {
///         vec![self.id.into(), self.city.clone().into()]
///     }
///     fn from_row(row: Row) -> Result<Self> {
///         let mut r = RowReader::new(row);
///         let trip = Trip { id: r.i64()?, city: r.opt_string()? };
///         r.finish()?;
///         Ok(trip)
///     }
/// }
/// ```
pub trait Record: Sized + Send + 'static {
    fn schema() -> Schema;

    fn to_row(&self) -> Row;

    fn from_row(row: Row) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataType, Field};
    use crate::types::{RowReader, Scalar};

    #[derive(Debug, PartialEq)]
    struct Point {
        x: f64,
        y: f64,
        label: Option<String>,
    }

    impl Record for Point {
        fn schema() -> Schema {
            Schema::new(vec![
                Field::new("x", DataType::Float64, false),
                Field::new("y", DataType::Float64, false),
                Field::new("label", DataType::Utf8, true),
            ])
        }

        fn to_row(&self) -> Row {
            vec![self.x.into(), self.y.into(), self.label.clone().into()]
        }

        fn from_row(row: Row) -> Result<Self> {
            let mut r = RowReader::new(row);
            let p = Point {
                x: r.f64()?,
                y: r.f64()?,
                label: r.opt_string()?,
            };
            r.finish()?;
            Ok(p)
        }
    }

    #[test]
    fn to_row_matches_schema() {
        let p = Point {
            x: 1.0,
            y: 2.5,
            label: None,
        };
        let row = p.to_row();
        assert!(Point::schema().check_row(&row).is_ok());
        assert_eq!(row[2], Scalar::Null);
        assert_eq!(Point::from_row(row).unwrap(), p);
    }
}
