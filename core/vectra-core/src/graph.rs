//! Expression graphs — externally built elementwise computations over named
//! columns.
//!
//! The engine only relies on a graph's declared output element type, its
//! ordered set of referenced input columns, and row-wise evaluation. Graph
//! construction and optimization belong to the collaborator that produced
//! the graph; `ColumnExpr` is the built-in arithmetic implementation.

use crate::error::{VectraError, VectraResult};
use crate::types::{ElementType, Scalar};

/// An elementwise computation over named column inputs.
///
/// `eval` receives one scalar per entry of `input_columns`, in order, and
/// produces one value of `output_type` per row.
pub trait ExpressionGraph: Send + Sync {
    /// Declared element type of the produced values.
    fn output_type(&self) -> ElementType;

    /// Ordered names of the referenced input columns.
    fn input_columns(&self) -> &[String];

    /// Evaluate one row.
    fn eval(&self, args: &[Scalar]) -> VectraResult<Scalar>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
enum ExprNode {
    Input(usize),
    Constant(Scalar),
    Binary {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    Cast {
        to: ElementType,
        inner: Box<ExprNode>,
    },
}

/// Arithmetic expression tree over named columns.
///
/// Binary nodes evaluate in the left operand's element type (the right
/// operand is cast first); use [`ColumnExpr::cast`] to widen explicitly.
#[derive(Debug, Clone)]
pub struct ColumnExpr {
    node: ExprNode,
    inputs: Vec<String>,
    output: ElementType,
}

impl ColumnExpr {
    /// Reference a column of the given element type.
    pub fn column(name: &str, dtype: ElementType) -> Self {
        Self {
            node: ExprNode::Input(0),
            inputs: vec![name.to_string()],
            output: dtype,
        }
    }

    /// Constant operand.
    pub fn constant(value: Scalar) -> Self {
        Self {
            output: value.element_type(),
            node: ExprNode::Constant(value),
            inputs: Vec::new(),
        }
    }

    pub fn add(self, other: ColumnExpr) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    pub fn sub(self, other: ColumnExpr) -> Self {
        self.binary(BinaryOp::Sub, other)
    }

    pub fn mul(self, other: ColumnExpr) -> Self {
        self.binary(BinaryOp::Mul, other)
    }

    pub fn div(self, other: ColumnExpr) -> Self {
        self.binary(BinaryOp::Div, other)
    }

    /// Cast the expression's result to `dtype`.
    pub fn cast(self, dtype: ElementType) -> Self {
        Self {
            node: ExprNode::Cast {
                to: dtype,
                inner: Box::new(self.node),
            },
            inputs: self.inputs,
            output: dtype,
        }
    }

    fn binary(self, op: BinaryOp, other: ColumnExpr) -> Self {
        let offset = self.inputs.len();
        let mut inputs = self.inputs;
        inputs.extend(other.inputs);
        Self {
            node: ExprNode::Binary {
                op,
                left: Box::new(self.node),
                right: Box::new(shift_inputs(other.node, offset)),
            },
            inputs,
            output: self.output,
        }
    }
}

/// Re-base input indices of a subtree appended after `offset` inputs.
fn shift_inputs(node: ExprNode, offset: usize) -> ExprNode {
    match node {
        ExprNode::Input(i) => ExprNode::Input(i + offset),
        ExprNode::Constant(v) => ExprNode::Constant(v),
        ExprNode::Binary { op, left, right } => ExprNode::Binary {
            op,
            left: Box::new(shift_inputs(*left, offset)),
            right: Box::new(shift_inputs(*right, offset)),
        },
        ExprNode::Cast { to, inner } => ExprNode::Cast {
            to,
            inner: Box::new(shift_inputs(*inner, offset)),
        },
    }
}

fn eval_node(node: &ExprNode, args: &[Scalar]) -> VectraResult<Scalar> {
    match node {
        ExprNode::Input(i) => args.get(*i).copied().ok_or_else(|| {
            VectraError::InvalidOperation(format!(
                "expression references input {i} but only {} arguments were supplied",
                args.len()
            ))
        }),
        ExprNode::Constant(v) => Ok(*v),
        ExprNode::Binary { op, left, right } => {
            let l = eval_node(left, args)?;
            let r = eval_node(right, args)?;
            match op {
                BinaryOp::Add => Ok(l.add(r)),
                BinaryOp::Sub => Ok(l.sub(r)),
                BinaryOp::Mul => Ok(l.mul(r)),
                BinaryOp::Div => l.checked_div(r).ok_or_else(|| {
                    VectraError::InvalidOperation("division by zero in expression".to_string())
                }),
            }
        }
        ExprNode::Cast { to, inner } => Ok(eval_node(inner, args)?.cast(*to)),
    }
}

impl ExpressionGraph for ColumnExpr {
    fn output_type(&self) -> ElementType {
        self.output
    }

    fn input_columns(&self) -> &[String] {
        &self.inputs
    }

    fn eval(&self, args: &[Scalar]) -> VectraResult<Scalar> {
        eval_node(&self.node, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_times_constant() {
        let expr = ColumnExpr::column("x", ElementType::I32).mul(ColumnExpr::constant(Scalar::I32(3)));
        assert_eq!(expr.output_type(), ElementType::I32);
        assert_eq!(expr.input_columns(), ["x".to_string()]);
        assert_eq!(expr.eval(&[Scalar::I32(7)]).unwrap(), Scalar::I32(21));
    }

    #[test]
    fn two_column_sum_orders_inputs() {
        let expr = ColumnExpr::column("a", ElementType::I64)
            .add(ColumnExpr::column("b", ElementType::I64));
        assert_eq!(
            expr.input_columns(),
            ["a".to_string(), "b".to_string()]
        );
        assert_eq!(
            expr.eval(&[Scalar::I64(2), Scalar::I64(40)]).unwrap(),
            Scalar::I64(42)
        );
    }

    #[test]
    fn nested_inputs_rebased() {
        // a * (b - c): inputs must resolve positionally as [a, b, c].
        let expr = ColumnExpr::column("a", ElementType::I32).mul(
            ColumnExpr::column("b", ElementType::I32).sub(ColumnExpr::column("c", ElementType::I32)),
        );
        assert_eq!(expr.input_columns().len(), 3);
        assert_eq!(
            expr.eval(&[Scalar::I32(2), Scalar::I32(10), Scalar::I32(4)])
                .unwrap(),
            Scalar::I32(12)
        );
    }

    #[test]
    fn cast_changes_output_type() {
        let expr = ColumnExpr::column("x", ElementType::I32).cast(ElementType::F64);
        assert_eq!(expr.output_type(), ElementType::F64);
        assert_eq!(expr.eval(&[Scalar::I32(5)]).unwrap(), Scalar::F64(5.0));
    }

    #[test]
    fn division_by_zero_surfaces() {
        let expr =
            ColumnExpr::column("x", ElementType::I32).div(ColumnExpr::constant(Scalar::I32(0)));
        assert!(expr.eval(&[Scalar::I32(5)]).is_err());
    }
}
