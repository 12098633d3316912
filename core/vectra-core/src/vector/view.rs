//! Windowed views over device vectors.

use std::sync::Arc;

use crate::error::{VectraError, VectraResult};
use crate::types::{ElementType, HostColumn, Scalar};
use crate::vector::DeviceVector;

/// A non-owning window `[first, last]` (inclusive) over a `DeviceVector`.
///
/// Re-windowing replaces the bounds but never the vector reference. The
/// window always addresses at least one element; bounds are validated
/// eagerly on construction.
#[derive(Debug, Clone)]
pub struct DeviceView {
    vector: Arc<DeviceVector>,
    first: usize,
    last: usize,
}

impl DeviceView {
    /// View over the full capacity of `vector`.
    pub fn full(vector: Arc<DeviceVector>) -> Self {
        let last = vector.capacity() - 1;
        Self {
            vector,
            first: 0,
            last,
        }
    }

    /// View over `[first, last]` of `vector`.
    pub fn new(vector: Arc<DeviceVector>, first: usize, last: usize) -> VectraResult<Self> {
        if first > last || last >= vector.capacity() {
            return Err(VectraError::Bounds {
                first,
                last,
                capacity: vector.capacity(),
            });
        }
        Ok(Self {
            vector,
            first,
            last,
        })
    }

    pub fn element_type(&self) -> ElementType {
        self.vector.element_type()
    }

    pub fn vector(&self) -> &Arc<DeviceVector> {
        &self.vector
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn last(&self) -> usize {
        self.last
    }

    /// Number of elements addressed by the window.
    pub fn size(&self) -> usize {
        self.last - self.first + 1
    }

    /// Re-window to the absolute range `[first, last]` of the same vector.
    pub fn window(&self, first: usize, last: usize) -> VectraResult<Self> {
        Self::new(Arc::clone(&self.vector), first, last)
    }

    /// Shrink the window to its first `len` elements.
    pub fn narrowed(&self, len: usize) -> VectraResult<Self> {
        if len == 0 || len > self.size() {
            return Err(VectraError::Shape(format!(
                "cannot narrow a window of size {} to {} elements",
                self.size(),
                len
            )));
        }
        self.window(self.first, self.first + len - 1)
    }

    /// Host-visible copy of the whole window.
    pub fn read(&self) -> HostColumn {
        self.vector.read(self.first, self.size())
    }

    /// Host-visible copy of `len` elements starting at window offset
    /// `offset`.
    pub fn read_range(&self, offset: usize, len: usize) -> VectraResult<HostColumn> {
        self.check_range(offset, len)?;
        Ok(self.vector.read(self.first + offset, len))
    }

    /// Single element at window offset `index`.
    pub fn get(&self, index: usize) -> VectraResult<Scalar> {
        self.check_range(index, 1)?;
        Ok(self.vector.get(self.first + index))
    }

    /// Write a single element at window offset `index`, cast to the
    /// vector's element type.
    pub fn set(&self, index: usize, value: Scalar) -> VectraResult<()> {
        self.check_range(index, 1)?;
        self.vector.set(self.first + index, value);
        Ok(())
    }

    /// Element-wise assignment of `values` to `len` elements starting at
    /// window offset `offset`. The sequence length must equal the addressed
    /// range length.
    pub fn write_range(&self, offset: usize, len: usize, values: &HostColumn) -> VectraResult<()> {
        if values.len() != len {
            return Err(VectraError::Shape(format!(
                "sequence of length {} does not match addressed range of length {}",
                values.len(),
                len
            )));
        }
        self.check_range(offset, len)?;
        self.vector.write(self.first + offset, values);
        Ok(())
    }

    /// Broadcast `value` to every element of the window.
    pub fn fill(&self, value: Scalar) {
        self.vector.fill(self.first, self.size(), value);
    }

    /// Broadcast `value` to `len` elements starting at window offset
    /// `offset`.
    pub fn fill_range(&self, offset: usize, len: usize, value: Scalar) -> VectraResult<()> {
        self.check_range(offset, len)?;
        self.vector.fill(self.first + offset, len, value);
        Ok(())
    }

    fn check_range(&self, offset: usize, len: usize) -> VectraResult<()> {
        if offset + len > self.size() {
            return Err(VectraError::IndexOutOfBounds {
                index: (offset + len - 1) as i64,
                size: self.size(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: Vec<i32>) -> Arc<DeviceVector> {
        DeviceVector::from_host(HostColumn::from(values)).unwrap()
    }

    #[test]
    fn size_is_inclusive_window_length() {
        let v = vector((0..10).collect());
        let view = DeviceView::new(v, 3, 7).unwrap();
        assert_eq!(view.size(), 5);
        assert_eq!(view.read(), HostColumn::from(vec![3i32, 4, 5, 6, 7]));
    }

    #[test]
    fn out_of_capacity_window_rejected() {
        let v = vector((0..4).collect());
        assert!(matches!(
            DeviceView::new(Arc::clone(&v), 0, 4),
            Err(VectraError::Bounds { .. })
        ));
        assert!(DeviceView::new(v, 3, 2).is_err());
    }

    #[test]
    fn rewindow_keeps_vector() {
        let v = vector((0..10).collect());
        let view = DeviceView::full(Arc::clone(&v));
        let sub = view.window(2, 5).unwrap();
        assert!(Arc::ptr_eq(sub.vector(), &v));
        assert_eq!(sub.size(), 4);
    }

    #[test]
    fn read_range_length_matches_request() {
        let v = vector((0..10).collect());
        let view = DeviceView::new(v, 2, 8).unwrap();
        let got = view.read_range(1, 3).unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got, HostColumn::from(vec![3i32, 4, 5]));
        assert!(view.read_range(5, 3).is_err());
    }

    #[test]
    fn write_offsets_by_first() {
        let v = vector(vec![0; 6]);
        let view = DeviceView::new(Arc::clone(&v), 2, 5).unwrap();
        view.write_range(1, 2, &HostColumn::from(vec![7i32, 8]))
            .unwrap();
        assert_eq!(v.to_host(), HostColumn::from(vec![0i32, 0, 0, 7, 8, 0]));
    }

    #[test]
    fn write_shape_mismatch_rejected() {
        let v = vector(vec![0; 6]);
        let view = DeviceView::full(v);
        let err = view.write_range(0, 3, &HostColumn::from(vec![1i32, 2]));
        assert!(matches!(err, Err(VectraError::Shape(_))));
    }

    #[test]
    fn broadcast_fills_active_window_only() {
        let v = vector(vec![0; 5]);
        let view = DeviceView::new(Arc::clone(&v), 1, 3).unwrap();
        view.fill(Scalar::I32(9));
        assert_eq!(v.to_host(), HostColumn::from(vec![0i32, 9, 9, 9, 0]));
    }

    #[test]
    fn narrowed_keeps_first_bound() {
        let v = vector((0..8).collect());
        let view = DeviceView::new(v, 2, 7).unwrap();
        let narrowed = view.narrowed(3).unwrap();
        assert_eq!((narrowed.first(), narrowed.last()), (2, 4));
        assert!(view.narrowed(0).is_err());
        assert!(view.narrowed(7).is_err());
    }
}
