//! Elementwise transforms.

use std::sync::Arc;

use crate::error::VectraResult;
use crate::frame::DataFrame;
use crate::graph::ExpressionGraph;
use crate::kernel::{KernelCall, KernelOp, KernelSignature, TypeTuple};

impl DataFrame {
    /// Evaluate each graph once per row of the active window and write the
    /// results to the named output columns. Results are cast to the output
    /// column's element type; outputs may alias inputs.
    pub fn transform(
        &self,
        outputs: &[(Arc<dyn ExpressionGraph>, &str)],
    ) -> VectraResult<()> {
        let mut input_names: Vec<&str> = Vec::new();
        for (graph, _) in outputs {
            input_names.extend(graph.input_columns().iter().map(|n| n.as_str()));
        }
        let output_names: Vec<&str> = outputs.iter().map(|(_, name)| *name).collect();

        let input_types: TypeTuple = self
            .group()
            .element_types(&input_names)?
            .into_iter()
            .collect();
        let output_types = self.group().element_types(&output_names)?;
        let signature = KernelSignature::new(KernelOp::Transform, input_types)
            .with_outputs(output_types);
        let kernel = self.context().kernel(&signature)?;

        let mut views = self.group().views_for(&input_names)?;
        views.extend(self.group().views_for(&output_names)?);
        let graphs: Vec<Arc<dyn ExpressionGraph>> =
            outputs.iter().map(|(g, _)| Arc::clone(g)).collect();

        tracing::debug!(target: "ops", kernel = %signature, rows = self.size()?, "transform");
        kernel.call(&KernelCall {
            pre_args: &[],
            seeds: &[],
            views: &views,
            graphs: &graphs,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ColumnExpr;
    use crate::kernel::ExecutionContext;
    use crate::types::{ElementType, HostColumn, HostTable, Scalar};

    fn frame(table: HostTable) -> DataFrame {
        DataFrame::from_host(ExecutionContext::with_default_builder(), &table).unwrap()
    }

    #[test]
    fn transform_into_fresh_column() {
        let mut f = frame(
            HostTable::new()
                .with("a", vec![1i32, 2, 3])
                .unwrap()
                .with("b", vec![10i32, 20, 30])
                .unwrap(),
        );
        f.add_zeros("sum", ElementType::I64, 3).unwrap();
        let graph = Arc::new(
            ColumnExpr::column("a", ElementType::I32).add(ColumnExpr::column("b", ElementType::I32)),
        ) as Arc<dyn ExpressionGraph>;
        f.transform(&[(graph, "sum")]).unwrap();
        assert_eq!(
            f.column_host("sum").unwrap(),
            HostColumn::from(vec![11i64, 22, 33])
        );
    }

    #[test]
    fn transform_may_alias_its_input() {
        let f = frame(HostTable::new().with("a", vec![1i32, 2, 3]).unwrap());
        let graph = Arc::new(
            ColumnExpr::column("a", ElementType::I32).mul(ColumnExpr::constant(Scalar::I32(5))),
        ) as Arc<dyn ExpressionGraph>;
        f.transform(&[(graph, "a")]).unwrap();
        assert_eq!(
            f.column_host("a").unwrap(),
            HostColumn::from(vec![5i32, 10, 15])
        );
    }

    #[test]
    fn transform_writes_only_the_window() {
        let f = frame(HostTable::new().with("a", vec![1i32, 1, 1, 1]).unwrap());
        let w = f.view(1, 3).unwrap();
        let graph = Arc::new(ColumnExpr::constant(Scalar::I32(9))) as Arc<dyn ExpressionGraph>;
        w.transform(&[(graph, "a")]).unwrap();
        assert_eq!(
            f.column_host("a").unwrap(),
            HostColumn::from(vec![1i32, 9, 9, 1])
        );
    }

    #[test]
    fn missing_output_column_is_an_error() {
        let f = frame(HostTable::new().with("a", vec![1i32]).unwrap());
        let graph =
            Arc::new(ColumnExpr::column("a", ElementType::I32)) as Arc<dyn ExpressionGraph>;
        assert!(f.transform(&[(graph, "missing")]).is_err());
    }
}
