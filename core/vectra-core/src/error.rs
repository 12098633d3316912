//! Error types for the Vectra execution engine.
//!
//! All public APIs return `VectraResult<T>` — no panics in library code.
//! Shape, bounds, and column errors are detected eagerly, before any kernel
//! call; a kernel build failure keeps the rendered source for diagnosis.

use thiserror::Error;

/// Unified error type for all Vectra operations.
#[derive(Debug, Error)]
pub enum VectraError {
    /// Mismatched column lengths or sequence/range length disagreement
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// View window outside the underlying vector's capacity
    #[error("window [{first}, {last}] out of bounds for capacity {capacity}")]
    Bounds {
        first: usize,
        last: usize,
        capacity: usize,
    },

    /// Row window that does not resolve to a valid range of the frame
    #[error("row window [{start}, {end}) is invalid for frame of size {size}")]
    InvalidWindow { start: i64, end: i64, size: usize },

    /// Element index outside the active window. Signed so scatter can
    /// report a negative computed address as-is.
    #[error("index {index} out of bounds for window of size {size}")]
    IndexOutOfBounds { index: i64, size: usize },

    /// Column name already present in the collection
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    /// Requested column does not exist
    #[error("column '{0}' not found")]
    MissingColumn(String),

    /// Reorder list is not an exact permutation of the existing columns
    #[error("reorder list is not a permutation of the existing columns: {0}")]
    Permutation(String),

    /// Two columns of one frame disagree on their active window size
    #[error("inconsistent column sizes: {0}")]
    InconsistentSize(String),

    /// Key and value column sets of a group-by overlap
    #[error("columns present in both key and value sets: {0}")]
    OverlappingColumns(String),

    /// Caller-provided output buffer cannot hold the input row count
    #[error("output capacity {capacity} is smaller than the {required} input rows")]
    Capacity { capacity: usize, required: usize },

    /// Type mismatch between expected and actual element types
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Host data with an element type outside the supported numeric set
    #[error("unsupported element type: {0}")]
    UnsupportedType(String),

    /// Kernel compilation failure; the rendered source is retained
    #[error("kernel build failed for {signature}: {reason}")]
    KernelBuild {
        signature: String,
        reason: String,
        source_text: String,
    },

    /// Invalid operation
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Apache Arrow error (RecordBatch interchange)
    #[error("arrow error: {source}")]
    Arrow {
        #[from]
        source: arrow::error::ArrowError,
    },
}

/// Result type alias for all Vectra operations.
pub type VectraResult<T> = Result<T, VectraError>;

impl From<serde_json::Error> for VectraError {
    fn from(err: serde_json::Error) -> Self {
        VectraError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_bounds() {
        let err = VectraError::Bounds {
            first: 3,
            last: 12,
            capacity: 10,
        };
        assert_eq!(
            err.to_string(),
            "window [3, 12] out of bounds for capacity 10"
        );
    }

    #[test]
    fn error_display_missing_column() {
        let err = VectraError::MissingColumn("net_key".to_string());
        assert_eq!(err.to_string(), "column 'net_key' not found");
    }

    #[test]
    fn error_display_capacity() {
        let err = VectraError::Capacity {
            capacity: 8,
            required: 16,
        };
        assert!(err.to_string().contains("smaller than the 16 input rows"));
    }

    #[test]
    fn kernel_build_keeps_source() {
        let err = VectraError::KernelBuild {
            signature: "reduce_i32_sum".to_string(),
            reason: "operator count mismatch".to_string(),
            source_text: "extern \"C\" __global__ void reduce_i32_sum()".to_string(),
        };
        assert!(err.to_string().contains("reduce_i32_sum"));
        if let VectraError::KernelBuild { source_text, .. } = err {
            assert!(source_text.contains("__global__"));
        }
    }

    #[test]
    fn vectra_result_err() {
        let result: VectraResult<i32> = Err(VectraError::DuplicateColumn("x".into()));
        assert!(result.is_err());
    }
}
