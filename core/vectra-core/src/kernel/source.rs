//! Diagnostic source listings for specialized kernels.
//!
//! The built-in backend executes natively, but every built kernel still
//! carries a rendered listing of the device code it is equivalent to. The
//! listing shows up in `KernelBuild` errors and in cache introspection,
//! making the specialization visible: one function per signature, concrete
//! element types in the parameter list.

use std::fmt::Write;

use crate::kernel::signature::{KernelOp, KernelSignature};
use crate::types::ElementType;

/// C name of a supported element type.
pub fn c_type(dtype: ElementType) -> &'static str {
    match dtype {
        ElementType::I8 => "signed char",
        ElementType::I16 => "short",
        ElementType::I32 => "int",
        ElementType::I64 => "long long",
        ElementType::U8 => "unsigned char",
        ElementType::U16 => "unsigned short",
        ElementType::U32 => "unsigned int",
        ElementType::U64 => "unsigned long long",
        ElementType::F32 => "float",
        ElementType::F64 => "double",
    }
}

/// Render the listing for one signature.
pub fn render(signature: &KernelSignature) -> String {
    let mut params: Vec<String> = vec!["const size_t n".to_string()];
    for (i, t) in signature.inputs.iter().enumerate() {
        let qualifier = if signature.op == KernelOp::Sort {
            // Sort permutes its columns in place.
            ""
        } else {
            "const "
        };
        params.push(format!("{qualifier}{}* in{i}", c_type(*t)));
    }
    if signature.op != KernelOp::Sort {
        for (i, t) in signature.outputs.iter().enumerate() {
            params.push(format!("{}* out{i}", c_type(*t)));
        }
    }

    let mut s = String::new();
    let _ = writeln!(s, "// {}", signature.name());
    let _ = writeln!(
        s,
        "extern \"C\" __global__ void {}(",
        signature.name()
    );
    let _ = writeln!(s, "    {}", params.join(",\n    "));
    let _ = writeln!(s, ") {{");
    let _ = writeln!(s, "    size_t i = blockIdx.x * blockDim.x + threadIdx.x;");
    let _ = writeln!(s, "    if (i >= n) return;");
    match signature.op {
        KernelOp::Sort => {
            let kind = if signature.stable { "stable" } else { "unstable" };
            let _ = writeln!(
                s,
                "    // {kind} lexicographic sort over {} key column(s)",
                signature.key_count
            );
        }
        KernelOp::Reduce => {
            for (i, op) in signature.reduce_ops.iter().enumerate() {
                let _ = writeln!(s, "    // out{i}[0] = {}(in{i}[0..n])", op.as_str());
            }
        }
        KernelOp::ReduceByKey => {
            let _ = writeln!(
                s,
                "    // segmented {} over runs of {} key column(s)",
                signature
                    .reduce_ops
                    .iter()
                    .map(|o| o.as_str())
                    .collect::<Vec<_>>()
                    .join("/"),
                signature.key_count
            );
        }
        KernelOp::CountByKey => {
            let _ = writeln!(
                s,
                "    // run lengths over {} key column(s)",
                signature.key_count
            );
        }
        KernelOp::Transform => {
            for i in 0..signature.outputs.len() {
                let _ = writeln!(s, "    // out{i}[i] = graph{i}(row i)");
            }
        }
        KernelOp::Scatter => {
            let guard = if signature.checked {
                "    if (addr < 0 || addr >= out_n) trap();\n"
            } else {
                ""
            };
            let _ = writeln!(s, "    // out0[addr(row i)] = value(row i)");
            let _ = write!(s, "{guard}");
        }
    }
    let _ = writeln!(s, "}}");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::signature::ReduceOp;

    #[test]
    fn listing_names_function_after_signature() {
        let sig = KernelSignature::new(KernelOp::Reduce, [ElementType::F64])
            .with_reduce_ops([ReduceOp::Max]);
        let listing = render(&sig);
        assert!(listing.contains("__global__ void reduce_f64_max("));
        assert!(listing.contains("const double* in0"));
    }

    #[test]
    fn checked_scatter_emits_guard() {
        let checked = KernelSignature::new(KernelOp::Scatter, [ElementType::I32])
            .with_key_count(1)
            .with_outputs([ElementType::I32]);
        assert!(render(&checked).contains("trap()"));
        let unchecked = checked.with_checked(false);
        assert!(!render(&unchecked).contains("trap()"));
    }
}
