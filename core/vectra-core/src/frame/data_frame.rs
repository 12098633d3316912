//! Device data frames — equal-window column collections.
//!
//! A `DataFrame` is a `ColumnGroup` with one extra invariant: every column's
//! active window has the same size. Row windowing (`view`) re-windows all
//! columns together; `base` restores the full windows. Clones share device
//! storage, so a windowed clone writes through to the frame it came from.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;

use crate::error::{VectraError, VectraResult};
use crate::frame::arrow::{batch_from_host_table, host_table_from_batch};
use crate::frame::column_set::ColumnGroup;
use crate::kernel::ExecutionContext;
use crate::types::{ElementType, HostColumn, HostTable, Scalar};
use crate::vector::{DeviceVector, DeviceView};

#[derive(Debug, Clone)]
pub struct DataFrame {
    group: ColumnGroup,
}

impl DataFrame {
    pub fn empty(ctx: Arc<ExecutionContext>) -> Self {
        Self {
            group: ColumnGroup::empty(ctx),
        }
    }

    /// Move a host table onto the device. All columns must have one common,
    /// non-zero length.
    pub fn from_host(ctx: Arc<ExecutionContext>, table: &HostTable) -> VectraResult<Self> {
        let mut lengths = table.iter().map(|(_, c)| c.len());
        if let Some(n) = lengths.next() {
            if lengths.any(|len| len != n) {
                let all: Vec<String> = table.iter().map(|(_, c)| c.len().to_string()).collect();
                return Err(VectraError::Shape(format!(
                    "columns differ in length: {}",
                    all.join(", ")
                )));
            }
        }
        Ok(Self {
            group: ColumnGroup::from_host(ctx, table)?,
        })
    }

    /// Move an Arrow record batch onto the device.
    pub fn from_record_batch(ctx: Arc<ExecutionContext>, batch: &RecordBatch) -> VectraResult<Self> {
        Self::from_host(ctx, &host_table_from_batch(batch)?)
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        self.group.context()
    }

    pub fn names(&self) -> &[String] {
        self.group.names()
    }

    pub fn column_count(&self) -> usize {
        self.group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.group.contains(name)
    }

    pub fn element_type(&self, name: &str) -> VectraResult<ElementType> {
        self.group.element_type(name)
    }

    /// Active window of one column.
    pub fn column(&self, name: &str) -> VectraResult<&DeviceView> {
        self.group.view(name)
    }

    /// Host copy of one column's active window.
    pub fn column_host(&self, name: &str) -> VectraResult<HostColumn> {
        self.group.column_host(name)
    }

    /// Number of rows in the active window. Zero for a frame without
    /// columns.
    pub fn size(&self) -> VectraResult<usize> {
        let sizes: Vec<usize> = self
            .names()
            .iter()
            .map(|n| self.group.view(n).map(|v| v.size()))
            .collect::<VectraResult<_>>()?;
        match sizes.first() {
            None => Ok(0),
            Some(&n) if sizes.iter().all(|&s| s == n) => Ok(n),
            _ => {
                let all: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
                Err(VectraError::InconsistentSize(all.join(", ")))
            }
        }
    }

    /// Absolute `[first, last+1)` bounds of the active window.
    pub fn index_bounds(&self) -> VectraResult<(usize, usize)> {
        self.size()?;
        let first_name = self.names().first().ok_or_else(|| {
            VectraError::InvalidOperation("frame has no columns".to_string())
        })?;
        let view = self.group.view(first_name)?;
        Ok((view.first(), view.last() + 1))
    }

    /// Row window `[start, end)` relative to the current window.
    ///
    /// Negative indices resolve from the end; an end past the window clamps
    /// to it. The resolved window must be non-empty.
    pub fn view(&self, start: i64, end: i64) -> VectraResult<DataFrame> {
        let size = self.size()?;
        let n = size as i64;
        let mut s = start;
        if s < 0 {
            s += n;
        }
        let mut e = end;
        if e < 0 {
            e += n;
        }
        if e > n {
            e = n;
        }
        if s < 0 || s >= e {
            return Err(VectraError::InvalidWindow { start, end, size });
        }
        let (first, _) = self.index_bounds()?;
        let mut frame = self.clone();
        frame
            .group
            .window_all(first + s as usize, first + e as usize - 1)?;
        Ok(frame)
    }

    /// The same frame with every window reset to full capacity.
    pub fn base(&self) -> DataFrame {
        let mut frame = self.clone();
        frame.group.base();
        frame
    }

    /// Deep copy: fresh device storage, same windows.
    pub fn copy(&self) -> VectraResult<DataFrame> {
        let mut copied = DataFrame::empty(Arc::clone(self.group.context()));
        for name in self.names() {
            let old_view = self.group.view(name)?;
            let vector = DeviceVector::from_host(old_view.vector().to_host())?;
            let view = DeviceView::new(Arc::clone(&vector), old_view.first(), old_view.last())?;
            copied.group.insert(name, vector, view)?;
        }
        Ok(copied)
    }

    /// Sub-frame over `names`, sharing storage with full windows.
    pub fn select(&self, names: &[&str]) -> VectraResult<DataFrame> {
        Ok(Self {
            group: self.group.select(names)?,
        })
    }

    /// Add a host column. Its length must match the frame's capacity; the
    /// new column's window is aligned to the current window.
    pub fn add_host(&mut self, name: &str, column: impl Into<HostColumn>) -> VectraResult<()> {
        let column = column.into();
        if self.is_empty() {
            let vector = DeviceVector::from_host(column)?;
            let view = DeviceView::full(Arc::clone(&vector));
            return self.group.insert(name, vector, view);
        }
        let capacity = self.capacity()?;
        if column.len() != capacity {
            return Err(VectraError::Shape(format!(
                "column '{name}' has length {}, frame capacity is {capacity}",
                column.len()
            )));
        }
        let (first, end) = self.index_bounds()?;
        let vector = DeviceVector::from_host(column)?;
        let view = DeviceView::new(Arc::clone(&vector), first, end - 1)?;
        self.group.insert(name, vector, view)
    }

    /// Add a zero-initialized column of `len` elements. On a non-empty frame
    /// `len` must match the capacity.
    pub fn add_zeros(&mut self, name: &str, dtype: ElementType, len: usize) -> VectraResult<()> {
        if !self.is_empty() {
            let capacity = self.capacity()?;
            if len != capacity {
                return Err(VectraError::Shape(format!(
                    "column '{name}' has length {len}, frame capacity is {capacity}"
                )));
            }
            let (first, end) = self.index_bounds()?;
            let vector = DeviceVector::zeros(dtype, len)?;
            let view = DeviceView::new(Arc::clone(&vector), first, end - 1)?;
            return self.group.insert(name, vector, view);
        }
        let vector = DeviceVector::zeros(dtype, len)?;
        let view = DeviceView::full(Arc::clone(&vector));
        self.group.insert(name, vector, view)
    }

    pub fn drop_column(&mut self, name: &str) -> VectraResult<()> {
        self.group.remove(name)
    }

    pub fn reorder(&mut self, names: &[&str]) -> VectraResult<()> {
        self.group.reorder(names)
    }

    /// Broadcast `value` across every column's active window, cast to each
    /// column's element type.
    pub fn fill(&self, value: Scalar) -> VectraResult<()> {
        for name in self.names() {
            self.group.view(name)?.fill(value);
        }
        Ok(())
    }

    /// Broadcast one value per named column across the active window.
    /// Validates every name before the first write.
    pub fn fill_rows(&self, values: &[(&str, Scalar)]) -> VectraResult<()> {
        for (name, _) in values {
            self.group.view(name)?;
        }
        for (name, value) in values {
            self.group.view(name)?.fill(*value);
        }
        Ok(())
    }

    /// Write `rows` into the window starting at row `offset`. Validates
    /// names, lengths, and bounds before the first write.
    pub fn write_rows(&self, offset: usize, rows: &HostTable) -> VectraResult<()> {
        let size = self.size()?;
        let mut len = None;
        for (name, column) in rows.iter() {
            self.group.view(name)?;
            match len {
                None => len = Some(column.len()),
                Some(n) if n == column.len() => {}
                Some(n) => {
                    return Err(VectraError::Shape(format!(
                        "row columns differ in length: {n} vs {}",
                        column.len()
                    )));
                }
            }
        }
        let Some(len) = len else { return Ok(()) };
        if offset + len > size {
            return Err(VectraError::IndexOutOfBounds {
                index: (offset + len - 1) as i64,
                size,
            });
        }
        for (name, column) in rows.iter() {
            self.group.view(name)?.write_range(offset, len, column)?;
        }
        Ok(())
    }

    /// Assign one row of the active window.
    pub fn set_row(&self, index: usize, values: &[(&str, Scalar)]) -> VectraResult<()> {
        for (name, _) in values {
            self.group.view(name)?;
        }
        for (name, value) in values {
            self.group.view(name)?.set(index, *value)?;
        }
        Ok(())
    }

    /// Host copy of every active window.
    pub fn to_host(&self) -> VectraResult<HostTable> {
        self.group.to_host()
    }

    /// Arrow record batch of every active window.
    pub fn to_record_batch(&self) -> VectraResult<RecordBatch> {
        batch_from_host_table(&self.to_host()?)
    }

    fn capacity(&self) -> VectraResult<usize> {
        let first_name = self.names().first().ok_or_else(|| {
            VectraError::InvalidOperation("frame has no columns".to_string())
        })?;
        Ok(self.group.vector(first_name)?.capacity())
    }

    pub(crate) fn group(&self) -> &ColumnGroup {
        &self.group
    }

    pub(crate) fn group_mut(&mut self) -> &mut ColumnGroup {
        &mut self.group
    }
}
