//! # Vectra — Columnar Data-Parallel Execution Engine
//!
//! Vectra keeps named, typed columns resident on a device, exposes windowed
//! views over them, and runs sort, reduction, transform, scatter, and
//! group-by kernels that are specialized per element-type combination and
//! memoized in a per-context cache.
//!
//! ## Key ideas
//!
//! - **Device vectors and views**: fixed-capacity typed buffers, addressed
//!   through `[first, last]` windows. Re-windowing never reallocates.
//! - **Data frames**: equal-window column collections. `view` windows every
//!   column together; clones share storage.
//! - **Kernel specialization**: operations are keyed by a [`KernelSignature`]
//!   (kind, column types, flags) and compiled at most once per
//!   [`ExecutionContext`].
//! - **Expression graphs**: elementwise computations enter transforms,
//!   reductions, and scatters through the [`ExpressionGraph`] trait.
//!
//! ## Quick start
//!
//! ```rust
//! use vectra_core::{DataFrame, ExecutionContext, HostTable, ReduceOp, Scalar};
//!
//! # fn main() -> vectra_core::VectraResult<()> {
//! let ctx = ExecutionContext::with_default_builder();
//! let table = HostTable::new()
//!     .with("key", vec![3i32, 1, 3, 2, 1, 3])?
//!     .with("amount", vec![3i64, 10, 2, 5, 20, 1])?;
//! let frame = DataFrame::from_host(ctx, &table)?;
//!
//! let mut grouped = frame.group_by(&["key"])?;
//! let sums = grouped.agg(&[("amount", ReduceOp::Sum)], None)?;
//! assert_eq!(sums.size()?, 3);
//! assert_eq!(sums.column("amount")?.get(0)?, Scalar::I64(30));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module structure
//!
//! - [`types`] — element types, scalars, host columns and tables
//! - [`vector`] — device vectors, buffers, windowed views
//! - [`frame`] — column collections, data frames, Arrow interchange
//! - [`graph`] — expression graphs over named columns
//! - [`kernel`] — signatures, builders, the memoized cache, contexts
//! - [`ops`] — sort, reduce, transform, scatter, and group-by drivers

pub mod error;
pub mod frame;
pub mod graph;
pub mod kernel;
pub mod ops;
pub mod types;
pub mod vector;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use error::{VectraError, VectraResult};
pub use frame::{ColumnGroup, DataFrame};
pub use graph::{ColumnExpr, ExpressionGraph};
pub use kernel::{
    CompiledKernel, ExecutionContext, KernelBuilder, KernelCache, KernelOp, KernelSignature,
    ReduceOp,
};
pub use ops::{GroupBy, ReduceSpec};
pub use types::{ElementType, HostColumn, HostTable, Scalar};
pub use vector::{DeviceVector, DeviceView};
