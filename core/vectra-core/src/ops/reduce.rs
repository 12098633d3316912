//! Whole-column reductions.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{VectraError, VectraResult};
use crate::frame::DataFrame;
use crate::graph::{ColumnExpr, ExpressionGraph};
use crate::kernel::{KernelCall, KernelOp, KernelSignature, ReduceOp, TypeTuple};
use crate::types::{ElementType, Scalar};

/// One column's reduction: operator plus optional accumulator type, seed,
/// and pre-reduction elementwise transform.
pub struct ReduceSpec<'a> {
    pub column: &'a str,
    pub op: ReduceOp,
    /// Accumulator element type; defaults to the transformed column's type.
    pub output_type: Option<ElementType>,
    /// Initial accumulator; defaults to the operator identity.
    pub seed: Option<Scalar>,
    /// Elementwise transform applied before reducing; must reference one
    /// column.
    pub transform: Option<Arc<dyn ExpressionGraph>>,
}

impl<'a> ReduceSpec<'a> {
    pub fn new(column: &'a str, op: ReduceOp) -> Self {
        Self {
            column,
            op,
            output_type: None,
            seed: None,
            transform: None,
        }
    }

    pub fn output_type(mut self, dtype: ElementType) -> Self {
        self.output_type = Some(dtype);
        self
    }

    pub fn seed(mut self, seed: Scalar) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn transform(mut self, graph: Arc<dyn ExpressionGraph>) -> Self {
        self.transform = Some(graph);
        self
    }
}

impl DataFrame {
    /// Reduce each listed column to one scalar with the operator identity
    /// as the initial accumulator.
    pub fn reduce(&self, ops: &[(&str, ReduceOp)]) -> VectraResult<Vec<Scalar>> {
        let specs: Vec<ReduceSpec<'_>> = ops
            .iter()
            .map(|(column, op)| ReduceSpec::new(column, *op))
            .collect();
        self.reduce_with(&specs)
    }

    /// Reduce with per-column accumulator types, seeds, and transforms.
    pub fn reduce_with(&self, specs: &[ReduceSpec<'_>]) -> VectraResult<Vec<Scalar>> {
        let names: Vec<&str> = specs.iter().map(|s| s.column).collect();
        let input_types = self.group().element_types(&names)?;

        let mut output_types: TypeTuple = SmallVec::new();
        for (spec, input) in specs.iter().zip(&input_types) {
            if let Some(graph) = &spec.transform {
                // The kernel binds the graph to the spec's column by
                // position, so the graph must read exactly that column.
                let reads = graph.input_columns();
                if reads.len() != 1 || reads[0] != spec.column {
                    return Err(VectraError::InvalidOperation(format!(
                        "transform for column {} reads [{}]",
                        spec.column,
                        reads.join(", ")
                    )));
                }
            }
            let transformed = spec
                .transform
                .as_ref()
                .map(|g| g.output_type())
                .unwrap_or(*input);
            output_types.push(spec.output_type.unwrap_or(transformed));
        }

        let signature = KernelSignature::new(KernelOp::Reduce, input_types.iter().copied())
            .with_outputs(output_types.iter().copied())
            .with_reduce_ops(specs.iter().map(|s| s.op));
        let kernel = self.context().kernel(&signature)?;
        let views = self.group().views_for(&names)?;

        // The kernel takes transforms and seeds all-or-none; pad the gaps
        // with identities.
        let graphs: Vec<Arc<dyn ExpressionGraph>> = if specs.iter().any(|s| s.transform.is_some())
        {
            specs
                .iter()
                .zip(&input_types)
                .map(|(spec, input)| match &spec.transform {
                    Some(graph) => Arc::clone(graph),
                    None => {
                        Arc::new(ColumnExpr::column(spec.column, *input))
                            as Arc<dyn ExpressionGraph>
                    }
                })
                .collect()
        } else {
            Vec::new()
        };
        let seeds: Vec<Scalar> = if specs.iter().any(|s| s.seed.is_some()) {
            specs
                .iter()
                .zip(&output_types)
                .map(|(spec, out)| spec.seed.unwrap_or_else(|| spec.op.identity(*out)))
                .collect()
        } else {
            Vec::new()
        };

        tracing::debug!(target: "ops", kernel = %signature, rows = self.size()?, "reduce");
        kernel
            .call(&KernelCall {
                pre_args: &[],
                seeds: &seeds,
                views: &views,
                graphs: &graphs,
            })?
            .scalars()
    }
}
