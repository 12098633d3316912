//! Sort-based grouping and per-group aggregation.

use std::sync::Arc;

use crate::error::{VectraError, VectraResult};
use crate::frame::DataFrame;
use crate::kernel::{KernelCall, KernelOp, KernelSignature, ReduceOp};
use crate::types::ElementType;

/// A grouping of a frame by key columns.
///
/// Grouping is sort-based: the first aggregation sorts the key and value
/// columns in place, then reduces each run of equal keys. The sort happens
/// once per grouping; further aggregations reuse the sorted order.
pub struct GroupBy {
    frame: DataFrame,
    keys: Vec<String>,
    values: Vec<String>,
    stable: bool,
    sorted: bool,
}

impl DataFrame {
    /// Group by `keys`; every other column becomes a value column.
    pub fn group_by(&self, keys: &[&str]) -> VectraResult<GroupBy> {
        let values: Vec<&str> = self
            .names()
            .iter()
            .map(String::as_str)
            .filter(|name| !keys.contains(name))
            .collect();
        self.group_by_with_values(keys, &values)
    }

    /// Group by `keys` carrying only the listed value columns. Columns in
    /// neither set are left untouched by the grouping sort.
    pub fn group_by_with_values(&self, keys: &[&str], values: &[&str]) -> VectraResult<GroupBy> {
        if keys.is_empty() {
            return Err(VectraError::InvalidOperation(
                "group_by requires at least one key column".to_string(),
            ));
        }
        for name in keys.iter().chain(values) {
            self.column(name)?;
        }
        let overlap: Vec<&str> = keys
            .iter()
            .filter(|k| values.contains(k))
            .copied()
            .collect();
        if !overlap.is_empty() {
            return Err(VectraError::OverlappingColumns(overlap.join(", ")));
        }
        Ok(GroupBy {
            frame: self.clone(),
            keys: keys.iter().map(|s| s.to_string()).collect(),
            values: values.iter().map(|s| s.to_string()).collect(),
            stable: false,
            sorted: false,
        })
    }
}

impl GroupBy {
    /// Use a stable grouping sort, preserving the input order of value rows
    /// within each group.
    pub fn stable(mut self, stable: bool) -> Self {
        self.stable = stable;
        self
    }

    /// Sort the key and value columns by key. Idempotent; aggregations call
    /// this implicitly.
    pub fn sort(&mut self) -> VectraResult<()> {
        if self.sorted {
            return Ok(());
        }
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        let values: Vec<&str> = self.values.iter().map(String::as_str).collect();
        self.frame.sort(&keys, &values, self.stable)?;
        self.sorted = true;
        Ok(())
    }

    /// Reduce each listed value column per group.
    ///
    /// Returns a frame of the key columns plus one column per operator,
    /// named after the value column and narrowed to the group count. With
    /// `out`, results land in that frame's columns instead of fresh
    /// storage; it must hold one row per input row in the worst case.
    /// At least one operator is required; use [`GroupBy::count`] for a
    /// keys-only grouping.
    pub fn agg(
        &mut self,
        ops: &[(&str, ReduceOp)],
        out: Option<&DataFrame>,
    ) -> VectraResult<DataFrame> {
        if ops.is_empty() {
            return Err(VectraError::InvalidOperation(
                "agg requires at least one reduce operator; use count for keys-only groupings"
                    .to_string(),
            ));
        }
        for (name, _) in ops {
            if !self.values.iter().any(|v| v == name) {
                return Err(VectraError::MissingColumn(format!(
                    "{name} is not a value column of this grouping"
                )));
            }
        }
        self.sort()?;
        let rows = self.frame.size()?;

        let key_names: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        let value_names: Vec<&str> = ops.iter().map(|(name, _)| *name).collect();
        let key_types = self.frame.group().element_types(&key_names)?;
        let value_types = self.frame.group().element_types(&value_names)?;

        let mut columns: Vec<(&str, ElementType)> = Vec::new();
        columns.extend(key_names.iter().copied().zip(key_types.iter().copied()));
        columns.extend(value_names.iter().copied().zip(value_types.iter().copied()));
        let mut result = self.output_frame(&columns, out, rows)?;
        let result_names: Vec<&str> = columns.iter().map(|(n, _)| *n).collect();
        let output_types = result.group().element_types(&result_names)?;

        let signature = KernelSignature::new(
            KernelOp::ReduceByKey,
            key_types.into_iter().chain(value_types),
        )
        .with_key_count(self.keys.len())
        .with_outputs(output_types)
        .with_reduce_ops(ops.iter().map(|(_, op)| *op));
        let kernel = self.frame.context().kernel(&signature)?;

        let mut views = self.frame.group().views_for(&key_names)?;
        views.extend(self.frame.group().views_for(&value_names)?);
        views.extend(result.group().views_for(&result_names)?);

        tracing::debug!(target: "ops", kernel = %signature, rows, "group_by agg");
        let groups = kernel.call(&KernelCall::views(&views))?.count()?;
        result.group_mut().narrow_all(groups)?;
        Ok(result)
    }

    /// Count the rows of each group.
    ///
    /// Returns a frame of the key columns plus an `I64` column named
    /// `count`, narrowed to the group count.
    pub fn count(&mut self, out: Option<&DataFrame>) -> VectraResult<DataFrame> {
        self.sort()?;
        let rows = self.frame.size()?;

        let key_names: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        let key_types = self.frame.group().element_types(&key_names)?;

        let mut columns: Vec<(&str, ElementType)> = Vec::new();
        columns.extend(key_names.iter().copied().zip(key_types.iter().copied()));
        columns.push(("count", ElementType::I64));
        let mut result = self.output_frame(&columns, out, rows)?;
        let result_names: Vec<&str> = columns.iter().map(|(n, _)| *n).collect();
        let output_types = result.group().element_types(&result_names)?;

        let signature = KernelSignature::new(KernelOp::CountByKey, key_types)
            .with_key_count(self.keys.len())
            .with_outputs(output_types);
        let kernel = self.frame.context().kernel(&signature)?;

        let mut views = self.frame.group().views_for(&key_names)?;
        views.extend(result.group().views_for(&result_names)?);

        tracing::debug!(target: "ops", kernel = %signature, rows, "group_by count");
        let groups = kernel.call(&KernelCall::views(&views))?.count()?;
        result.group_mut().narrow_all(groups)?;
        Ok(result)
    }

    /// The grouped frame, in its current (possibly sorted) order.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Destination frame for aggregation results: either full windows over
    /// the caller's buffers or fresh zeroed columns, `required` rows either
    /// way.
    fn output_frame(
        &self,
        columns: &[(&str, ElementType)],
        out: Option<&DataFrame>,
        required: usize,
    ) -> VectraResult<DataFrame> {
        match out {
            Some(frame) => {
                let names: Vec<&str> = columns.iter().map(|(n, _)| *n).collect();
                let selected = frame.select(&names)?;
                let capacity = selected.size()?;
                if capacity < required {
                    return Err(VectraError::Capacity { capacity, required });
                }
                Ok(selected)
            }
            None => {
                let mut frame = DataFrame::empty(Arc::clone(self.frame.context()));
                for (name, dtype) in columns {
                    frame.add_zeros(name, *dtype, required)?;
                }
                Ok(frame)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::ExecutionContext;
    use crate::types::{HostColumn, HostTable};

    fn frame(table: HostTable) -> DataFrame {
        DataFrame::from_host(ExecutionContext::with_default_builder(), &table).unwrap()
    }

    fn runs_frame() -> DataFrame {
        frame(
            HostTable::new()
                .with("k", vec![1i32, 1, 2, 3, 3, 3])
                .unwrap()
                .with("v", vec![10i64, 20, 5, 1, 2, 3])
                .unwrap(),
        )
    }

    #[test]
    fn agg_sums_per_group() {
        let f = runs_frame();
        let mut grouped = f.group_by(&["k"]).unwrap();
        let result = grouped.agg(&[("v", ReduceOp::Sum)], None).unwrap();
        assert_eq!(result.size().unwrap(), 3);
        assert_eq!(
            result.column_host("k").unwrap(),
            HostColumn::from(vec![1i32, 2, 3])
        );
        assert_eq!(
            result.column_host("v").unwrap(),
            HostColumn::from(vec![30i64, 5, 6])
        );
    }

    #[test]
    fn count_measures_run_lengths() {
        let f = runs_frame();
        let mut grouped = f.group_by(&["k"]).unwrap();
        let result = grouped.count(None).unwrap();
        assert_eq!(
            result.column_host("count").unwrap(),
            HostColumn::from(vec![2i64, 1, 3])
        );
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let f = frame(
            HostTable::new()
                .with("k", vec![3i32, 1, 3, 2, 1, 3])
                .unwrap()
                .with("v", vec![3i64, 10, 2, 5, 20, 1])
                .unwrap(),
        );
        let mut grouped = f.group_by(&["k"]).unwrap();
        let result = grouped.agg(&[("v", ReduceOp::Sum)], None).unwrap();
        assert_eq!(
            result.column_host("k").unwrap(),
            HostColumn::from(vec![1i32, 2, 3])
        );
        assert_eq!(
            result.column_host("v").unwrap(),
            HostColumn::from(vec![30i64, 5, 6])
        );
    }

    #[test]
    fn second_aggregation_reuses_the_sort() {
        let f = runs_frame();
        let mut grouped = f.group_by(&["k"]).unwrap();
        grouped.agg(&[("v", ReduceOp::Sum)], None).unwrap();
        let compiles = f.context().cache().compile_count();
        let maxes = grouped.agg(&[("v", ReduceOp::Max)], None).unwrap();
        assert_eq!(
            maxes.column_host("v").unwrap(),
            HostColumn::from(vec![20i64, 5, 3])
        );
        // One new kernel (the max reduction); no second sort kernel.
        assert_eq!(f.context().cache().compile_count(), compiles + 1);
    }

    #[test]
    fn provided_buffers_receive_results() {
        let f = runs_frame();
        let mut out = DataFrame::empty(f.context().clone());
        out.add_zeros("k", crate::types::ElementType::I32, 6).unwrap();
        out.add_zeros("v", crate::types::ElementType::I64, 6).unwrap();
        let mut grouped = f.group_by(&["k"]).unwrap();
        let result = grouped.agg(&[("v", ReduceOp::Sum)], Some(&out)).unwrap();
        assert_eq!(result.size().unwrap(), 3);
        // Shared storage: the caller's buffer holds the groups.
        assert_eq!(
            out.column_host("v").unwrap(),
            HostColumn::from(vec![30i64, 5, 6, 0, 0, 0])
        );
    }

    #[test]
    fn undersized_buffer_rejected() {
        let f = runs_frame();
        let mut out = DataFrame::empty(f.context().clone());
        out.add_zeros("k", crate::types::ElementType::I32, 2).unwrap();
        out.add_zeros("v", crate::types::ElementType::I64, 2).unwrap();
        let mut grouped = f.group_by(&["k"]).unwrap();
        let err = grouped.agg(&[("v", ReduceOp::Sum)], Some(&out)).unwrap_err();
        assert!(matches!(err, VectraError::Capacity { required: 6, .. }));
    }

    #[test]
    fn key_value_overlap_rejected() {
        let f = runs_frame();
        assert!(matches!(
            f.group_by_with_values(&["k"], &["k", "v"]),
            Err(VectraError::OverlappingColumns(_))
        ));
    }

    #[test]
    fn aggregating_a_non_value_column_rejected() {
        let f = runs_frame();
        let mut grouped = f.group_by_with_values(&["k"], &[]).unwrap();
        assert!(grouped.agg(&[("v", ReduceOp::Sum)], None).is_err());
    }

    #[test]
    fn empty_aggregation_list_rejected_before_any_kernel() {
        let f = runs_frame();
        let mut grouped = f.group_by(&["k"]).unwrap();
        let err = grouped.agg(&[], None).unwrap_err();
        assert!(matches!(err, VectraError::InvalidOperation(_)));
        assert_eq!(f.context().cache().compile_count(), 0);
    }

    #[test]
    fn keys_only_grouping_counts() {
        let f = frame(HostTable::new().with("k", vec![2i32, 1, 2]).unwrap());
        let mut grouped = f.group_by(&["k"]).unwrap();
        let result = grouped.count(None).unwrap();
        assert_eq!(
            result.column_host("k").unwrap(),
            HostColumn::from(vec![1i32, 2])
        );
        assert_eq!(
            result.column_host("count").unwrap(),
            HostColumn::from(vec![1i64, 2])
        );
    }
}
