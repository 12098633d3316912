//! Arrow `RecordBatch` interchange.
//!
//! Only non-nullable numeric columns cross the boundary; anything else is
//! rejected before device allocation.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int8Array, Int16Array, Int32Array, Int64Array,
    UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::{VectraError, VectraResult};
use crate::types::{HostColumn, HostTable};

macro_rules! column_from_array {
    ($array:expr, $arrow_ty:ty) => {{
        let typed = $array
            .as_any()
            .downcast_ref::<$arrow_ty>()
            .ok_or_else(|| VectraError::UnsupportedType($array.data_type().to_string()))?;
        HostColumn::from(typed.values().to_vec())
    }};
}

/// Convert a record batch into host columns.
pub fn host_table_from_batch(batch: &RecordBatch) -> VectraResult<HostTable> {
    let mut table = HostTable::new();
    for (field, array) in batch.schema().fields().iter().zip(batch.columns()) {
        if array.null_count() > 0 {
            return Err(VectraError::UnsupportedType(format!(
                "column '{}' contains nulls",
                field.name()
            )));
        }
        let column = match field.data_type() {
            DataType::Int8 => column_from_array!(array, Int8Array),
            DataType::Int16 => column_from_array!(array, Int16Array),
            DataType::Int32 => column_from_array!(array, Int32Array),
            DataType::Int64 => column_from_array!(array, Int64Array),
            DataType::UInt8 => column_from_array!(array, UInt8Array),
            DataType::UInt16 => column_from_array!(array, UInt16Array),
            DataType::UInt32 => column_from_array!(array, UInt32Array),
            DataType::UInt64 => column_from_array!(array, UInt64Array),
            DataType::Float32 => column_from_array!(array, Float32Array),
            DataType::Float64 => column_from_array!(array, Float64Array),
            other => {
                return Err(VectraError::UnsupportedType(format!(
                    "column '{}' has type {other}",
                    field.name()
                )));
            }
        };
        table.push(field.name(), column)?;
    }
    Ok(table)
}

/// Convert host columns into a record batch.
pub fn batch_from_host_table(table: &HostTable) -> VectraResult<RecordBatch> {
    let mut fields = Vec::with_capacity(table.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.len());
    for (name, column) in table.iter() {
        let (data_type, array): (DataType, ArrayRef) = match column {
            HostColumn::I8(v) => (DataType::Int8, Arc::new(Int8Array::from(v.clone()))),
            HostColumn::I16(v) => (DataType::Int16, Arc::new(Int16Array::from(v.clone()))),
            HostColumn::I32(v) => (DataType::Int32, Arc::new(Int32Array::from(v.clone()))),
            HostColumn::I64(v) => (DataType::Int64, Arc::new(Int64Array::from(v.clone()))),
            HostColumn::U8(v) => (DataType::UInt8, Arc::new(UInt8Array::from(v.clone()))),
            HostColumn::U16(v) => (DataType::UInt16, Arc::new(UInt16Array::from(v.clone()))),
            HostColumn::U32(v) => (DataType::UInt32, Arc::new(UInt32Array::from(v.clone()))),
            HostColumn::U64(v) => (DataType::UInt64, Arc::new(UInt64Array::from(v.clone()))),
            HostColumn::F32(v) => (DataType::Float32, Arc::new(Float32Array::from(v.clone()))),
            HostColumn::F64(v) => (DataType::Float64, Arc::new(Float64Array::from(v.clone()))),
        };
        fields.push(Field::new(name, data_type, false));
        arrays.push(array);
    }
    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        arrays,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_names_and_types() {
        let table = HostTable::new()
            .with("id", vec![1i64, 2, 3])
            .unwrap()
            .with("score", vec![0.5f32, 1.5, 2.5])
            .unwrap();
        let batch = batch_from_host_table(&table).unwrap();
        assert_eq!(batch.num_rows(), 3);
        let back = host_table_from_batch(&batch).unwrap();
        let names: Vec<&str> = back.names().collect();
        assert_eq!(names, vec!["id", "score"]);
        assert_eq!(back.get("score"), table.get("score"));
    }

    #[test]
    fn nullable_data_rejected() {
        let array = Int32Array::from(vec![Some(1), None, Some(3)]);
        let schema = Schema::new(vec![Field::new("x", DataType::Int32, true)]);
        let batch = RecordBatch::try_new(Arc::new(schema), vec![Arc::new(array)]).unwrap();
        assert!(matches!(
            host_table_from_batch(&batch),
            Err(VectraError::UnsupportedType(_))
        ));
    }

    #[test]
    fn non_numeric_type_rejected() {
        let array = arrow::array::StringArray::from(vec!["a", "b"]);
        let schema = Schema::new(vec![Field::new("s", DataType::Utf8, false)]);
        let batch = RecordBatch::try_new(Arc::new(schema), vec![Arc::new(array)]).unwrap();
        assert!(host_table_from_batch(&batch).is_err());
    }
}
