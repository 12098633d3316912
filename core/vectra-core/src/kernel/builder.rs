//! Kernel construction — signature validation and specialized callables.
//!
//! A `KernelBuilder` turns a signature into a `BuiltKernel`: an opaque
//! callable plus the diagnostic source listing it was specialized from.
//! `ParallelKernelBuilder` is the built-in backend; it validates the
//! signature shape eagerly so malformed requests fail at build time, once,
//! instead of on every call.

use std::sync::Arc;

use crate::error::{VectraError, VectraResult};
use crate::graph::ExpressionGraph;
use crate::kernel::exec;
use crate::kernel::signature::{KernelOp, KernelSignature};
use crate::kernel::source;
use crate::types::Scalar;
use crate::vector::DeviceView;

/// Runtime arguments of one kernel invocation.
///
/// The signature fixes the shape (operation, column types, flags); the call
/// supplies the data. `views` follows the signature's column order: keys
/// first, then values, then outputs.
pub struct KernelCall<'a> {
    /// Scalar size arguments preceding the column arguments (scatter passes
    /// the logical output size here).
    pub pre_args: &'a [usize],
    /// Explicit initial accumulator per reduced column; empty to use the
    /// operator identities.
    pub seeds: &'a [Scalar],
    pub views: &'a [DeviceView],
    /// Expression graphs referenced by the kernel, in argument order.
    pub graphs: &'a [Arc<dyn ExpressionGraph>],
}

impl<'a> KernelCall<'a> {
    /// Call with column arguments only.
    pub fn views(views: &'a [DeviceView]) -> Self {
        Self {
            pre_args: &[],
            seeds: &[],
            views,
            graphs: &[],
        }
    }
}

/// Result of one kernel invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelOutput {
    /// The kernel wrote its results through output views.
    Unit,
    /// Number of result rows written through output views.
    Count(usize),
    /// One scalar per reduced column.
    Scalars(Vec<Scalar>),
}

impl KernelOutput {
    /// Row count of a `Count` output.
    pub fn count(&self) -> VectraResult<usize> {
        match self {
            KernelOutput::Count(n) => Ok(*n),
            other => Err(VectraError::InvalidOperation(format!(
                "expected a row count, kernel returned {other:?}"
            ))),
        }
    }

    /// Scalars of a `Scalars` output.
    pub fn scalars(self) -> VectraResult<Vec<Scalar>> {
        match self {
            KernelOutput::Scalars(v) => Ok(v),
            other => Err(VectraError::InvalidOperation(format!(
                "expected reduced scalars, kernel returned {other:?}"
            ))),
        }
    }
}

pub type KernelFn = Box<dyn Fn(&KernelCall<'_>) -> VectraResult<KernelOutput> + Send + Sync>;

/// A specialized kernel produced by a builder.
pub struct BuiltKernel {
    pub func: KernelFn,
    pub source: String,
}

impl std::fmt::Debug for BuiltKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltKernel")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Backend seam: builds a callable for a signature.
///
/// Builders must be deterministic per signature. The cache guarantees each
/// signature is built at most once per process.
pub trait KernelBuilder: Send + Sync {
    fn build(&self, signature: &KernelSignature) -> VectraResult<BuiltKernel>;
}

/// Built-in builder specializing kernels to data-parallel host execution.
#[derive(Debug, Default)]
pub struct ParallelKernelBuilder;

impl ParallelKernelBuilder {
    pub fn new() -> Self {
        Self
    }

    fn validate(signature: &KernelSignature) -> Result<(), String> {
        let ins = signature.inputs.len();
        let outs = signature.outputs.len();
        let keys = signature.key_count;
        let reductions = signature.reduce_ops.len();
        match signature.op {
            KernelOp::Sort => {
                if ins == 0 || keys == 0 || keys > ins {
                    return Err(format!(
                        "sort requires 1..=columns key columns, got {keys} of {ins}"
                    ));
                }
                if signature.outputs != signature.inputs {
                    return Err("sort permutes in place, outputs must equal inputs".to_string());
                }
                if reductions != 0 {
                    return Err("sort takes no reduce operators".to_string());
                }
            }
            KernelOp::Reduce => {
                if ins == 0 || outs != ins || reductions != ins {
                    return Err(format!(
                        "reduce requires matching column/output/operator counts, \
                         got {ins}/{outs}/{reductions}"
                    ));
                }
                if keys != 0 {
                    return Err("reduce takes no key columns".to_string());
                }
            }
            KernelOp::ReduceByKey => {
                if keys == 0 || keys >= ins {
                    return Err(format!(
                        "reduce_by_key requires keys and at least one value column, \
                         got {keys} keys of {ins} columns"
                    ));
                }
                if outs != ins || reductions != ins - keys {
                    return Err(format!(
                        "reduce_by_key requires one output per column and one operator \
                         per value column, got {outs} outputs and {reductions} operators"
                    ));
                }
            }
            KernelOp::CountByKey => {
                if keys == 0 || keys != ins {
                    return Err(format!(
                        "count_by_key takes key columns only, got {keys} keys of {ins}"
                    ));
                }
                if outs != keys + 1 {
                    return Err(format!(
                        "count_by_key requires one output per key plus a count column, \
                         got {outs}"
                    ));
                }
                if !signature.outputs[keys].is_integer() {
                    return Err("count column must be an integer type".to_string());
                }
                if reductions != 0 {
                    return Err("count_by_key takes no reduce operators".to_string());
                }
            }
            KernelOp::Transform => {
                if outs == 0 {
                    return Err("transform requires at least one output column".to_string());
                }
                if keys != 0 || reductions != 0 {
                    return Err("transform takes no keys and no reduce operators".to_string());
                }
            }
            KernelOp::Scatter => {
                if keys == 0 || keys > ins {
                    return Err(format!(
                        "scatter requires 1..=columns value-graph inputs, got {keys} of {ins}"
                    ));
                }
                if outs != 1 {
                    return Err(format!("scatter writes exactly one output, got {outs}"));
                }
                if reductions != 0 {
                    return Err("scatter takes no reduce operators".to_string());
                }
            }
        }
        Ok(())
    }
}

impl KernelBuilder for ParallelKernelBuilder {
    fn build(&self, signature: &KernelSignature) -> VectraResult<BuiltKernel> {
        let listing = source::render(signature);
        if let Err(reason) = Self::validate(signature) {
            return Err(VectraError::KernelBuild {
                signature: signature.name(),
                reason,
                source_text: listing,
            });
        }
        let sig = signature.clone();
        let func: KernelFn = Box::new(move |call| exec::execute(&sig, call));
        Ok(BuiltKernel {
            func,
            source: listing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementType;

    #[test]
    fn valid_sort_signature_builds() {
        let sig = KernelSignature::new(KernelOp::Sort, [ElementType::I32, ElementType::F64])
            .with_key_count(1);
        let built = ParallelKernelBuilder::new().build(&sig).unwrap();
        assert!(built.source.contains("__global__"));
        assert!(built.source.contains(&sig.name()));
    }

    #[test]
    fn sort_without_keys_rejected() {
        let sig = KernelSignature::new(KernelOp::Sort, [ElementType::I32]);
        let err = ParallelKernelBuilder::new().build(&sig).unwrap_err();
        assert!(matches!(err, VectraError::KernelBuild { .. }));
    }

    #[test]
    fn reduce_requires_operator_per_column() {
        let sig = KernelSignature::new(KernelOp::Reduce, [ElementType::I32, ElementType::I32]);
        assert!(ParallelKernelBuilder::new().build(&sig).is_err());
    }

    #[test]
    fn count_by_key_needs_integer_count_column() {
        let sig = KernelSignature::new(KernelOp::CountByKey, [ElementType::I32])
            .with_key_count(1)
            .with_outputs([ElementType::I32, ElementType::F64]);
        assert!(ParallelKernelBuilder::new().build(&sig).is_err());
        let ok = KernelSignature::new(KernelOp::CountByKey, [ElementType::I32])
            .with_key_count(1)
            .with_outputs([ElementType::I32, ElementType::I64]);
        assert!(ParallelKernelBuilder::new().build(&ok).is_ok());
    }
}
