//! Frame sorting.

use crate::error::{VectraError, VectraResult};
use crate::frame::DataFrame;
use crate::kernel::{KernelCall, KernelOp, KernelSignature};

impl DataFrame {
    /// Sort rows lexicographically by `keys`, carrying `values` along with
    /// the permutation. With no keys, the value columns themselves become
    /// the sort keys. Columns not listed keep their order.
    pub fn sort(&self, keys: &[&str], values: &[&str], stable: bool) -> VectraResult<()> {
        let (keys, values) = if keys.is_empty() {
            (values, &[][..])
        } else {
            (keys, values)
        };
        if keys.is_empty() {
            return Err(VectraError::InvalidOperation(
                "sort requires at least one column".to_string(),
            ));
        }
        let names: Vec<&str> = keys.iter().chain(values).copied().collect();
        let types = self.group().element_types(&names)?;
        let signature = KernelSignature::new(KernelOp::Sort, types)
            .with_key_count(keys.len())
            .with_stable(stable);
        let kernel = self.context().kernel(&signature)?;
        let views = self.group().views_for(&names)?;
        tracing::debug!(target: "ops", kernel = %signature, rows = self.size()?, "sort");
        kernel.call(&KernelCall::views(&views))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::frame::DataFrame;
    use crate::kernel::ExecutionContext;
    use crate::types::{HostColumn, HostTable};

    fn frame(table: HostTable) -> DataFrame {
        DataFrame::from_host(ExecutionContext::with_default_builder(), &table).unwrap()
    }

    #[test]
    fn sort_carries_values() {
        let f = frame(
            HostTable::new()
                .with("k", vec![3i32, 1, 2])
                .unwrap()
                .with("v", vec![30i64, 10, 20])
                .unwrap(),
        );
        f.sort(&["k"], &["v"], false).unwrap();
        assert_eq!(f.column_host("k").unwrap(), HostColumn::from(vec![1i32, 2, 3]));
        assert_eq!(
            f.column_host("v").unwrap(),
            HostColumn::from(vec![10i64, 20, 30])
        );
    }

    #[test]
    fn stable_sort_preserves_tied_order() {
        let f = frame(
            HostTable::new()
                .with("k", vec![1i32, 0, 1, 0])
                .unwrap()
                .with("v", vec![1i32, 2, 3, 4])
                .unwrap(),
        );
        f.sort(&["k"], &["v"], true).unwrap();
        assert_eq!(
            f.column_host("v").unwrap(),
            HostColumn::from(vec![2i32, 4, 1, 3])
        );
    }

    #[test]
    fn empty_keys_sort_by_values() {
        let f = frame(HostTable::new().with("v", vec![2i32, 1, 3]).unwrap());
        f.sort(&[], &["v"], false).unwrap();
        assert_eq!(f.column_host("v").unwrap(), HostColumn::from(vec![1i32, 2, 3]));
    }

    #[test]
    fn sort_respects_window() {
        let f = frame(HostTable::new().with("v", vec![5i32, 4, 3, 2, 1]).unwrap());
        let w = f.view(1, 4).unwrap();
        w.sort(&["v"], &[], false).unwrap();
        assert_eq!(
            f.column_host("v").unwrap(),
            HostColumn::from(vec![5i32, 2, 3, 4, 1])
        );
    }

    #[test]
    fn multi_key_sort_is_lexicographic() {
        let f = frame(
            HostTable::new()
                .with("a", vec![1i32, 0, 1, 0])
                .unwrap()
                .with("b", vec![0i32, 1, 1, 0])
                .unwrap(),
        );
        f.sort(&["a", "b"], &[], false).unwrap();
        assert_eq!(f.column_host("a").unwrap(), HostColumn::from(vec![0i32, 0, 1, 1]));
        assert_eq!(f.column_host("b").unwrap(), HostColumn::from(vec![0i32, 1, 0, 1]));
    }
}
