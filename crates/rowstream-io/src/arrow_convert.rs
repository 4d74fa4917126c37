//! Arrow conversion utilities for the Parquet boundary.
//!
//! Converts between row-major `Row`s (what `Record` produces/consumes) and
//! column-major Arrow `RecordBatch`es (what the Parquet engine reads/writes).

use std::sync::Arc;

use arrow_array::builder::{
    BinaryBuilder, BooleanBuilder, Float32Builder, Float64Builder, Int32Builder, Int64Builder,
    StringBuilder,
};
use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Float32Array, Float64Array, Int32Array,
    Int64Array, LargeBinaryArray, LargeStringArray, RecordBatch, StringArray,
};
use arrow_schema::{DataType as ArrowDataType, Field as ArrowField, Schema as ArrowSchema, SchemaRef};

use rowstream_core::schema::{DataType, Schema};
use rowstream_core::types::{Row, Scalar};

use crate::error::{Error, Result};

/// Convert rowstream-core DataType to Arrow DataType.
pub fn to_arrow_data_type(dtype: DataType) -> ArrowDataType {
    match dtype {
        DataType::Boolean => ArrowDataType::Boolean,
        DataType::Int32 => ArrowDataType::Int32,
        DataType::Int64 => ArrowDataType::Int64,
        DataType::Float32 => ArrowDataType::Float32,
        DataType::Float64 => ArrowDataType::Float64,
        DataType::Utf8 => ArrowDataType::Utf8,
        DataType::Binary => ArrowDataType::Binary,
    }
}

/// Convert a record Schema to an Arrow Schema.
pub fn to_arrow_schema(schema: &Schema) -> ArrowSchema {
    let fields: Vec<ArrowField> = schema
        .fields
        .iter()
        .map(|field| {
            ArrowField::new(
                field.name.clone(),
                to_arrow_data_type(field.data_type),
                field.nullable,
            )
        })
        .collect();
    ArrowSchema::new(fields)
}

fn same_physical_type(stored: &ArrowDataType, wanted: &ArrowDataType) -> bool {
    matches!(
        (stored, wanted),
        (ArrowDataType::LargeUtf8, ArrowDataType::Utf8)
            | (ArrowDataType::LargeBinary, ArrowDataType::Binary)
    ) || stored == wanted
}

/// Check that a stored file schema can be decoded into records with `expected`.
///
/// Field names and order must match and types must agree. A nullable stored
/// column may back a non-nullable record field; actual nulls fail at decode.
pub fn check_file_schema(stored: &ArrowSchema, expected: &Schema) -> Result<()> {
    if stored.fields().len() != expected.fields.len() {
        return Err(Error::Schema(format!(
            "file has {} columns but record type has {} fields",
            stored.fields().len(),
            expected.fields.len()
        )));
    }
    for (idx, (s, e)) in stored.fields().iter().zip(&expected.fields).enumerate() {
        if s.name() != &e.name {
            return Err(Error::Schema(format!(
                "column name mismatch at index {}: file has '{}' but record expects '{}'",
                idx,
                s.name(),
                e.name
            )));
        }
        let wanted = to_arrow_data_type(e.data_type);
        if !same_physical_type(s.data_type(), &wanted) {
            return Err(Error::Schema(format!(
                "column '{}' has type {:?} in file but record expects {:?}",
                e.name,
                s.data_type(),
                wanted
            )));
        }
    }
    Ok(())
}

/// Build a RecordBatch from rows already checked against `schema`.
pub fn rows_to_record_batch(rows: &[Row], schema: SchemaRef) -> Result<RecordBatch> {
    if rows.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    let arrays = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| build_column(rows, idx, field))
        .collect::<Result<Vec<_>>>()?;
    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn cell<'a>(row: &'a Row, idx: usize) -> Result<&'a Scalar> {
    row.get(idx)
        .ok_or_else(|| Error::Schema(format!("row has no value for column {}", idx)))
}

fn mismatch(field: &ArrowField, val: &Scalar) -> Error {
    Error::Schema(format!(
        "type mismatch in column '{}': expected {:?}, got {}",
        field.name(),
        field.data_type(),
        val.type_name()
    ))
}

fn null_in(field: &ArrowField) -> Error {
    Error::Schema(format!(
        "null value in non-nullable column '{}'",
        field.name()
    ))
}

/// One builder loop per Arrow type: `$pat => $val` maps an accepted scalar to a value.
macro_rules! build {
    ($builder:expr, $rows:expr, $idx:expr, $field:expr, { $($pat:pat => $val:expr),+ $(,)? }) => {{
        let mut builder = $builder;
        for row in $rows {
            match cell(row, $idx)? {
                Scalar::Null if $field.is_nullable() => builder.append_null(),
                Scalar::Null => return Err(null_in($field)),
                $($pat => builder.append_value($val),)+
                other => return Err(mismatch($field, other)),
            }
        }
        Arc::new(builder.finish()) as ArrayRef
    }};
}

fn build_column(rows: &[Row], idx: usize, field: &ArrowField) -> Result<ArrayRef> {
    let n = rows.len();
    let array = match field.data_type() {
        ArrowDataType::Boolean => build!(BooleanBuilder::with_capacity(n), rows, idx, field, {
            Scalar::Bool(b) => *b,
        }),
        ArrowDataType::Int32 => build!(Int32Builder::with_capacity(n), rows, idx, field, {
            Scalar::I32(i) => *i,
        }),
        ArrowDataType::Int64 => build!(Int64Builder::with_capacity(n), rows, idx, field, {
            Scalar::I32(i) => *i as i64,
            Scalar::I64(i) => *i,
        }),
        ArrowDataType::Float32 => build!(Float32Builder::with_capacity(n), rows, idx, field, {
            Scalar::F32(f) => *f,
        }),
        ArrowDataType::Float64 => build!(Float64Builder::with_capacity(n), rows, idx, field, {
            Scalar::F32(f) => *f as f64,
            Scalar::F64(f) => *f,
        }),
        ArrowDataType::Utf8 => build!(StringBuilder::with_capacity(n, 0), rows, idx, field, {
            Scalar::Str(s) => s.as_str(),
        }),
        ArrowDataType::Binary => build!(BinaryBuilder::with_capacity(n, 0), rows, idx, field, {
            Scalar::Bin(b) => b.as_slice(),
        }),
        other => {
            return Err(Error::Other(format!(
                "Unsupported Arrow data type for conversion: {:?}",
                other
            )))
        }
    };
    Ok(array)
}

/// Convert a RecordBatch into rows in column order.
pub fn record_batch_to_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
    let num_rows = batch.num_rows();
    let mut rows: Vec<Row> = (0..num_rows)
        .map(|_| Vec::with_capacity(batch.num_columns()))
        .collect();
    for array in batch.columns() {
        let values = column_values(array)?;
        for (row, v) in rows.iter_mut().zip(values) {
            row.push(v);
        }
    }
    Ok(rows)
}

fn downcast<'a, A: 'static>(array: &'a ArrayRef) -> Result<&'a A> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        Error::Other(format!(
            "Failed to cast {:?} array to {}",
            array.data_type(),
            std::any::type_name::<A>()
        ))
    })
}

fn collect<A, F>(array: &ArrayRef, f: F) -> Result<Vec<Scalar>>
where
    A: Array + 'static,
    F: Fn(&A, usize) -> Scalar,
{
    let arr = downcast::<A>(array)?;
    Ok((0..arr.len())
        .map(|i| if arr.is_null(i) { Scalar::Null } else { f(arr, i) })
        .collect())
}

/// Decode one Arrow column into scalars.
fn column_values(array: &ArrayRef) -> Result<Vec<Scalar>> {
    match array.data_type() {
        ArrowDataType::Boolean => collect::<BooleanArray, _>(array, |a, i| Scalar::Bool(a.value(i))),
        ArrowDataType::Int32 => collect::<Int32Array, _>(array, |a, i| Scalar::I32(a.value(i))),
        ArrowDataType::Int64 => collect::<Int64Array, _>(array, |a, i| Scalar::I64(a.value(i))),
        ArrowDataType::Float32 => collect::<Float32Array, _>(array, |a, i| Scalar::F32(a.value(i))),
        ArrowDataType::Float64 => collect::<Float64Array, _>(array, |a, i| Scalar::F64(a.value(i))),
        ArrowDataType::Utf8 => {
            collect::<StringArray, _>(array, |a, i| Scalar::Str(a.value(i).to_string()))
        }
        ArrowDataType::LargeUtf8 => {
            collect::<LargeStringArray, _>(array, |a, i| Scalar::Str(a.value(i).to_string()))
        }
        ArrowDataType::Binary => {
            collect::<BinaryArray, _>(array, |a, i| Scalar::Bin(a.value(i).to_vec()))
        }
        ArrowDataType::LargeBinary => {
            collect::<LargeBinaryArray, _>(array, |a, i| Scalar::Bin(a.value(i).to_vec()))
        }
        other => Err(Error::Other(format!(
            "Unsupported Arrow data type: {:?}",
            other
        ))),
    }
}
