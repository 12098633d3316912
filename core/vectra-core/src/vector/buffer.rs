//! Device buffer — the opaque storage handle behind a `DeviceVector`.
//!
//! Storage is one contiguous typed allocation. All access goes through the
//! owning vector's lock; the buffer itself performs no synchronization and
//! no bounds checking beyond the slice operations it delegates to.

use crate::types::{ElementType, HostColumn, Scalar};

/// Fixed-capacity typed storage for one column.
#[derive(Debug)]
pub struct DeviceBuffer {
    data: HostColumn,
}

impl DeviceBuffer {
    /// Take ownership of host data without copying.
    pub fn from_host(column: HostColumn) -> Self {
        Self { data: column }
    }

    /// Zero-initialized buffer.
    pub fn zeros(dtype: ElementType, len: usize) -> Self {
        Self {
            data: HostColumn::zeros(dtype, len),
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Host-visible copy of `len` elements starting at `first`.
    pub fn read(&self, first: usize, len: usize) -> HostColumn {
        self.data.slice(first, len)
    }

    /// Element-wise write of `values` starting at `first`, casting if the
    /// element types differ.
    pub fn write(&mut self, first: usize, values: &HostColumn) {
        self.data.write_at(first, values);
    }

    /// Broadcast `value` across `len` elements starting at `first`.
    pub fn fill(&mut self, first: usize, len: usize, value: Scalar) {
        self.data.fill_at(first, len, value);
    }

    pub fn get(&self, i: usize) -> Scalar {
        self.data.scalar_at(i)
    }

    pub fn set(&mut self, i: usize, value: Scalar) {
        self.data.set(i, value);
    }

    /// Full-capacity host copy.
    pub fn to_host(&self) -> HostColumn {
        self.data.clone()
    }
}
