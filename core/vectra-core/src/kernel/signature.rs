//! Kernel signatures — the canonical monomorphization key.
//!
//! A signature describes an operation purely by its kind, the ordered
//! element types of the columns involved, and the flags that change the
//! generated code's shape. Column names never enter the signature: two
//! operations that differ only in naming specialize to the same kernel.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::error::VectraResult;
use crate::types::{ElementType, Scalar};

/// Ordered tuple of column element types. Single-column operations use a
/// degenerate length-1 tuple so the zero/one/many-column paths are uniform.
pub type TypeTuple = SmallVec<[ElementType; 4]>;

/// Operation kinds the engine can specialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelOp {
    Sort,
    Reduce,
    ReduceByKey,
    CountByKey,
    Transform,
    Scatter,
}

impl KernelOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelOp::Sort => "sort",
            KernelOp::Reduce => "reduce",
            KernelOp::ReduceByKey => "reduce_by_key",
            KernelOp::CountByKey => "count_by_key",
            KernelOp::Transform => "transform",
            KernelOp::Scatter => "scatter",
        }
    }
}

impl fmt::Display for KernelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary associative reduction operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReduceOp {
    Sum,
    Product,
    Min,
    Max,
}

impl ReduceOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReduceOp::Sum => "sum",
            ReduceOp::Product => "product",
            ReduceOp::Min => "min",
            ReduceOp::Max => "max",
        }
    }

    /// Identity element of the operator for the given type: `0` for sum,
    /// `1` for product, the type's maximum for min, its minimum for max.
    pub fn identity(&self, dtype: ElementType) -> Scalar {
        match self {
            ReduceOp::Sum => dtype.zero(),
            ReduceOp::Product => dtype.one(),
            ReduceOp::Min => dtype.max_value(),
            ReduceOp::Max => dtype.min_value(),
        }
    }

    /// Combine two scalars in `a`'s element type.
    pub fn combine(&self, a: Scalar, b: Scalar) -> Scalar {
        match self {
            ReduceOp::Sum => a.add(b),
            ReduceOp::Product => a.mul(b),
            ReduceOp::Min => a.min_of(b),
            ReduceOp::Max => a.max_of(b),
        }
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical, hashable description of one specialized kernel.
///
/// Column order matters and is part of the signature: the tuple order must
/// match the order the columns are passed to the kernel (keys, then values,
/// then outputs). Outputs default to the input types when not overridden.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelSignature {
    pub op: KernelOp,
    pub inputs: TypeTuple,
    pub outputs: TypeTuple,
    pub reduce_ops: SmallVec<[ReduceOp; 4]>,
    /// How many leading entries of `inputs` are key (or, for scatter,
    /// value-producing) columns.
    pub key_count: usize,
    /// Sort stability flag; part of the signature because the generated
    /// primitive differs.
    pub stable: bool,
    /// Whether generated writes are bounds-validated (scatter only).
    pub checked: bool,
}

impl KernelSignature {
    pub fn new(op: KernelOp, inputs: impl IntoIterator<Item = ElementType>) -> Self {
        let inputs: TypeTuple = inputs.into_iter().collect();
        let outputs = inputs.clone();
        Self {
            op,
            inputs,
            outputs,
            reduce_ops: SmallVec::new(),
            key_count: 0,
            stable: false,
            checked: true,
        }
    }

    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = ElementType>) -> Self {
        self.outputs = outputs.into_iter().collect();
        self
    }

    pub fn with_reduce_ops(mut self, ops: impl IntoIterator<Item = ReduceOp>) -> Self {
        self.reduce_ops = ops.into_iter().collect();
        self
    }

    pub fn with_key_count(mut self, key_count: usize) -> Self {
        self.key_count = key_count;
        self
    }

    pub fn with_stable(mut self, stable: bool) -> Self {
        self.stable = stable;
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Generated kernel name, unique per signature.
    pub fn name(&self) -> String {
        let mut name = String::from(self.op.as_str());
        if self.stable {
            name.push_str("_stable");
        }
        if !self.checked {
            name.push_str("_unchecked");
        }
        if self.key_count > 0 {
            name.push_str(&format!("_k{}", self.key_count));
        }
        for t in &self.inputs {
            name.push('_');
            name.push_str(t.as_str());
        }
        if self.outputs != self.inputs {
            name.push_str("__to");
            for t in &self.outputs {
                name.push('_');
                name.push_str(t.as_str());
            }
        }
        for op in &self.reduce_ops {
            name.push('_');
            name.push_str(op.as_str());
        }
        name
    }

    /// Stable textual form for persisting cache entries across processes.
    pub fn canonical_key(&self) -> VectraResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for KernelSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_identical_signatures_hash_equal() {
        let a = KernelSignature::new(KernelOp::Sort, [ElementType::I32, ElementType::F64])
            .with_key_count(1)
            .with_stable(true);
        let b = KernelSignature::new(KernelOp::Sort, [ElementType::I32, ElementType::F64])
            .with_key_count(1)
            .with_stable(true);
        assert_eq!(a, b);
        assert_eq!(a.name(), b.name());
    }

    #[test]
    fn column_order_is_part_of_the_signature() {
        let ab = KernelSignature::new(KernelOp::Sort, [ElementType::I32, ElementType::I64]);
        let ba = KernelSignature::new(KernelOp::Sort, [ElementType::I64, ElementType::I32]);
        assert_ne!(ab, ba);
        assert_ne!(ab.name(), ba.name());
    }

    #[test]
    fn stability_distinguishes_signatures() {
        let unstable = KernelSignature::new(KernelOp::Sort, [ElementType::I32]).with_key_count(1);
        let stable = unstable.clone().with_stable(true);
        assert_ne!(unstable, stable);
    }

    #[test]
    fn outputs_default_to_inputs() {
        let sig = KernelSignature::new(KernelOp::Reduce, [ElementType::I32]);
        assert_eq!(sig.outputs, sig.inputs);
        let widened = sig.with_outputs([ElementType::I64]);
        assert!(widened.name().contains("__to_i64"));
    }

    #[test]
    fn single_column_uses_degenerate_tuple() {
        let sig = KernelSignature::new(KernelOp::Reduce, [ElementType::F32])
            .with_reduce_ops([ReduceOp::Sum]);
        assert_eq!(sig.inputs.len(), 1);
        assert_eq!(sig.name(), "reduce_f32_sum");
    }

    #[test]
    fn identity_elements() {
        assert_eq!(ReduceOp::Sum.identity(ElementType::I32), Scalar::I32(0));
        assert_eq!(ReduceOp::Product.identity(ElementType::F64), Scalar::F64(1.0));
        assert_eq!(
            ReduceOp::Min.identity(ElementType::U8),
            Scalar::U8(u8::MAX)
        );
        assert_eq!(
            ReduceOp::Max.identity(ElementType::I16),
            Scalar::I16(i16::MIN)
        );
    }

    #[test]
    fn canonical_key_round_trips() {
        let sig = KernelSignature::new(KernelOp::ReduceByKey, [ElementType::I32, ElementType::I64])
            .with_key_count(1)
            .with_reduce_ops([ReduceOp::Sum]);
        let key = sig.canonical_key().unwrap();
        let back: KernelSignature = serde_json::from_str(&key).unwrap();
        assert_eq!(back, sig);
    }
}
