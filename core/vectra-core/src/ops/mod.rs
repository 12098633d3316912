//! Algorithm drivers over data frames.
//!
//! Each driver derives a `KernelSignature` from the frame's column types,
//! resolves the kernel through the frame's execution context, and invokes it
//! on the columns' active windows. Drivers are split one file per operation.

mod group_by;
mod reduce;
mod scatter;
mod sort;
mod transform;

pub use group_by::GroupBy;
pub use reduce::ReduceSpec;
