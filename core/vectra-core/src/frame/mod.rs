//! Column collections, data frames, and host interchange.

pub mod arrow;
mod column_set;
mod data_frame;

pub use column_set::ColumnGroup;
pub use data_frame::DataFrame;
