//! Device-resident vectors and windowed, non-owning views.
//!
//! A `DeviceVector` owns one fixed-capacity typed buffer. Collections hold
//! vectors behind `Arc`, and every access path goes through a `DeviceView`
//! window, so a view can never outlive or re-target its vector.

mod buffer;
mod view;

pub use buffer::DeviceBuffer;
pub use view::DeviceView;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{VectraError, VectraResult};
use crate::types::{ElementType, HostColumn, Scalar};

/// A typed, fixed-capacity device buffer owned by the collection that
/// created it.
///
/// Element type and capacity are fixed at creation. Mutation happens through
/// views, which share the vector via `Arc` and lock the buffer per access.
#[derive(Debug)]
pub struct DeviceVector {
    dtype: ElementType,
    capacity: usize,
    buffer: RwLock<DeviceBuffer>,
}

impl DeviceVector {
    /// Create a vector by moving host data onto the device.
    ///
    /// Zero-length columns are rejected: every view window must address at
    /// least one element.
    pub fn from_host(column: HostColumn) -> VectraResult<Arc<Self>> {
        if column.is_empty() {
            return Err(VectraError::Shape(
                "cannot create a device vector from a zero-length column".to_string(),
            ));
        }
        let dtype = column.element_type();
        let capacity = column.len();
        Ok(Arc::new(Self {
            dtype,
            capacity,
            buffer: RwLock::new(DeviceBuffer::from_host(column)),
        }))
    }

    /// Allocate a zero-initialized vector of `capacity` elements.
    pub fn zeros(dtype: ElementType, capacity: usize) -> VectraResult<Arc<Self>> {
        if capacity == 0 {
            return Err(VectraError::Shape(
                "cannot allocate a zero-capacity device vector".to_string(),
            ));
        }
        Ok(Arc::new(Self {
            dtype,
            capacity,
            buffer: RwLock::new(DeviceBuffer::zeros(dtype, capacity)),
        }))
    }

    pub fn element_type(&self) -> ElementType {
        self.dtype
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Full-capacity host copy, ignoring any view windows.
    pub fn to_host(&self) -> HostColumn {
        self.buffer.read().to_host()
    }

    pub(crate) fn read(&self, first: usize, len: usize) -> HostColumn {
        self.buffer.read().read(first, len)
    }

    pub(crate) fn write(&self, first: usize, values: &HostColumn) {
        self.buffer.write().write(first, values);
    }

    pub(crate) fn fill(&self, first: usize, len: usize, value: Scalar) {
        self.buffer.write().fill(first, len, value);
    }

    pub(crate) fn get(&self, i: usize) -> Scalar {
        self.buffer.read().get(i)
    }

    pub(crate) fn set(&self, i: usize, value: Scalar) {
        self.buffer.write().set(i, value);
    }
}
