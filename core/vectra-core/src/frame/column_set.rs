//! Ordered, name-keyed collections of device vectors and their views.
//!
//! A `ColumnGroup` pairs every vector with exactly one active view and keeps
//! the two maps aligned under insertion, removal, and reordering. Cloning a
//! group clones windows, never storage: the clone addresses the same device
//! vectors.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use crate::error::{VectraError, VectraResult};
use crate::kernel::ExecutionContext;
use crate::types::{ElementType, HostColumn, HostTable};
use crate::vector::{DeviceVector, DeviceView};

#[derive(Debug, Clone)]
pub struct ColumnGroup {
    ctx: Arc<ExecutionContext>,
    order: Vec<String>,
    vectors: AHashMap<String, Arc<DeviceVector>>,
    views: AHashMap<String, DeviceView>,
}

impl ColumnGroup {
    pub fn empty(ctx: Arc<ExecutionContext>) -> Self {
        Self {
            ctx,
            order: Vec::new(),
            vectors: AHashMap::new(),
            views: AHashMap::new(),
        }
    }

    /// Move every column of `table` onto the device, full views.
    pub fn from_host(ctx: Arc<ExecutionContext>, table: &HostTable) -> VectraResult<Self> {
        let mut group = Self::empty(ctx);
        for (name, column) in table.iter() {
            let vector = DeviceVector::from_host(column.clone())?;
            let view = DeviceView::full(Arc::clone(&vector));
            group.insert(name, vector, view)?;
        }
        Ok(group)
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.ctx
    }

    /// Column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vectors.contains_key(name)
    }

    pub fn element_type(&self, name: &str) -> VectraResult<ElementType> {
        Ok(self.view(name)?.element_type())
    }

    pub fn view(&self, name: &str) -> VectraResult<&DeviceView> {
        self.views
            .get(name)
            .ok_or_else(|| VectraError::MissingColumn(name.to_string()))
    }

    pub fn vector(&self, name: &str) -> VectraResult<&Arc<DeviceVector>> {
        self.vectors
            .get(name)
            .ok_or_else(|| VectraError::MissingColumn(name.to_string()))
    }

    /// Register a vector under `name` with `view` as its active window.
    pub fn insert(
        &mut self,
        name: &str,
        vector: Arc<DeviceVector>,
        view: DeviceView,
    ) -> VectraResult<()> {
        if self.contains(name) {
            return Err(VectraError::DuplicateColumn(name.to_string()));
        }
        self.order.push(name.to_string());
        self.vectors.insert(name.to_string(), vector);
        self.views.insert(name.to_string(), view);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> VectraResult<()> {
        if !self.contains(name) {
            return Err(VectraError::MissingColumn(name.to_string()));
        }
        self.order.retain(|n| n != name);
        self.vectors.remove(name);
        self.views.remove(name);
        Ok(())
    }

    /// Reorder columns. `names` must be an exact permutation of the current
    /// column set.
    pub fn reorder(&mut self, names: &[&str]) -> VectraResult<()> {
        let requested: AHashSet<&str> = names.iter().copied().collect();
        let current: AHashSet<&str> = self.order.iter().map(|n| n.as_str()).collect();
        if requested.len() != names.len() || requested != current {
            return Err(VectraError::Permutation(names.join(", ")));
        }
        self.order = names.iter().map(|n| n.to_string()).collect();
        Ok(())
    }

    /// Sub-collection over `names`, sharing storage. The selection starts
    /// from full views regardless of this group's windows.
    pub fn select(&self, names: &[&str]) -> VectraResult<Self> {
        let mut group = Self::empty(Arc::clone(&self.ctx));
        for name in names {
            let vector = Arc::clone(self.vector(name)?);
            let view = DeviceView::full(Arc::clone(&vector));
            group.insert(name, vector, view)?;
        }
        Ok(group)
    }

    /// Reset every view to the full capacity of its vector.
    pub fn base(&mut self) {
        for (name, vector) in &self.vectors {
            self.views
                .insert(name.clone(), DeviceView::full(Arc::clone(vector)));
        }
    }

    /// Shrink every view to its first `len` elements.
    pub fn narrow_all(&mut self, len: usize) -> VectraResult<()> {
        for view in self.views.values_mut() {
            *view = view.narrowed(len)?;
        }
        Ok(())
    }

    /// Re-window every view to the absolute range `[first, last]`.
    pub fn window_all(&mut self, first: usize, last: usize) -> VectraResult<()> {
        for view in self.views.values_mut() {
            *view = view.window(first, last)?;
        }
        Ok(())
    }

    /// Host copy of every active window, in column order.
    pub fn to_host(&self) -> VectraResult<HostTable> {
        let mut table = HostTable::new();
        for name in &self.order {
            table.push(name, self.view(name)?.read())?;
        }
        Ok(table)
    }

    pub(crate) fn views_for(&self, names: &[&str]) -> VectraResult<Vec<DeviceView>> {
        names.iter().map(|n| Ok(self.view(n)?.clone())).collect()
    }

    pub(crate) fn element_types(&self, names: &[&str]) -> VectraResult<Vec<ElementType>> {
        names.iter().map(|n| self.element_type(n)).collect()
    }

    /// Host copy of one column's active window.
    pub fn column_host(&self, name: &str) -> VectraResult<HostColumn> {
        Ok(self.view(name)?.read())
    }
}
