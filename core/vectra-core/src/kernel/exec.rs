//! Kernel bodies — the data-parallel routines kernels specialize to.
//!
//! Every body takes the signature it was specialized for plus the runtime
//! call and works on host copies of the addressed windows: read, compute in
//! parallel, write back through the output views. Argument shapes the
//! builder cannot see (view counts, graph arity, window sizes) are checked
//! here.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::error::{VectraError, VectraResult};
use crate::kernel::builder::{KernelCall, KernelOutput};
use crate::kernel::signature::{KernelOp, KernelSignature, ReduceOp};
use crate::types::{dispatch_host, Element, ElementType, HostColumn, Scalar};
use crate::vector::DeviceView;

pub(crate) fn execute(sig: &KernelSignature, call: &KernelCall<'_>) -> VectraResult<KernelOutput> {
    match sig.op {
        KernelOp::Sort => sort(sig, call),
        KernelOp::Reduce => reduce(sig, call),
        KernelOp::ReduceByKey => reduce_by_key(sig, call),
        KernelOp::CountByKey => count_by_key(sig, call),
        KernelOp::Transform => transform(sig, call),
        KernelOp::Scatter => scatter(sig, call),
    }
}

/// All views must address windows of one common size.
fn uniform_size(views: &[DeviceView]) -> VectraResult<usize> {
    let mut sizes = views.iter().map(|v| v.size());
    let n = sizes.next().ok_or_else(|| {
        VectraError::Shape("kernel invoked without column arguments".to_string())
    })?;
    if sizes.any(|s| s != n) {
        let all: Vec<String> = views.iter().map(|v| v.size().to_string()).collect();
        return Err(VectraError::InconsistentSize(all.join(", ")));
    }
    Ok(n)
}

fn expect_views(sig: &KernelSignature, call: &KernelCall<'_>, expected: usize) -> VectraResult<()> {
    if call.views.len() != expected {
        return Err(VectraError::Shape(format!(
            "kernel {} expects {expected} column arguments, got {}",
            sig.name(),
            call.views.len()
        )));
    }
    Ok(())
}

/// Lexicographic key sort: reorders key and value windows in place.
fn sort(sig: &KernelSignature, call: &KernelCall<'_>) -> VectraResult<KernelOutput> {
    expect_views(sig, call, sig.inputs.len())?;
    let n = uniform_size(call.views)?;
    let hosts: Vec<HostColumn> = call.views.iter().map(|v| v.read()).collect();
    let keys = &hosts[..sig.key_count];

    let mut perm: Vec<usize> = (0..n).collect();
    let by_keys = |a: &usize, b: &usize| {
        for key in keys {
            match key.compare_rows(*a, *b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    };
    if sig.stable {
        perm.par_sort_by(by_keys);
    } else {
        perm.par_sort_unstable_by(by_keys);
    }

    for (view, host) in call.views.iter().zip(&hosts) {
        view.write_range(0, n, &host.take(&perm))?;
    }
    Ok(KernelOutput::Unit)
}

/// Whole-column reduction, one scalar per column.
fn reduce(sig: &KernelSignature, call: &KernelCall<'_>) -> VectraResult<KernelOutput> {
    expect_views(sig, call, sig.inputs.len())?;
    if !call.graphs.is_empty() && call.graphs.len() != call.views.len() {
        return Err(VectraError::Shape(format!(
            "reduce takes one transform per column or none, got {} for {} columns",
            call.graphs.len(),
            call.views.len()
        )));
    }
    if !call.seeds.is_empty() && call.seeds.len() != call.views.len() {
        return Err(VectraError::Shape(format!(
            "reduce takes one seed per column or none, got {} for {} columns",
            call.seeds.len(),
            call.views.len()
        )));
    }

    let mut results = Vec::with_capacity(call.views.len());
    for (i, view) in call.views.iter().enumerate() {
        let mut col = view.read();
        if let Some(graph) = call.graphs.get(i) {
            if graph.input_columns().len() != 1 {
                return Err(VectraError::InvalidOperation(format!(
                    "reduce transform must reference exactly one column, got {}",
                    graph.input_columns().len()
                )));
            }
            let values = (0..col.len())
                .into_par_iter()
                .map(|r| graph.eval(&[col.scalar_at(r)]))
                .collect::<VectraResult<Vec<Scalar>>>()?;
            col = HostColumn::from_scalars(graph.output_type(), &values);
        }
        let col = col.cast(sig.outputs[i]);
        let op = sig.reduce_ops[i];
        let mut acc = reduce_column(&col, op);
        if let Some(seed) = call.seeds.get(i) {
            acc = op.combine(acc, *seed);
        }
        results.push(acc);
    }
    Ok(KernelOutput::Scalars(results))
}

/// Segmented reduction over pre-sorted keys.
///
/// Column order: keys, values, key outputs, value outputs. Returns the
/// number of distinct key runs; outputs are written to the first `g` slots
/// of their windows.
fn reduce_by_key(sig: &KernelSignature, call: &KernelCall<'_>) -> VectraResult<KernelOutput> {
    let k = sig.key_count;
    expect_views(sig, call, sig.inputs.len() + sig.outputs.len())?;
    let (inputs, outputs) = call.views.split_at(sig.inputs.len());
    let n = uniform_size(inputs)?;

    let keys: Vec<HostColumn> = inputs[..k].iter().map(|v| v.read()).collect();
    let starts = group_starts(&keys, n);
    let g = starts.len();
    check_output_capacity(outputs, g)?;

    for (i, key) in keys.iter().enumerate() {
        let gathered = key.take(&starts).cast(outputs[i].element_type());
        outputs[i].write_range(0, g, &gathered)?;
    }
    for (j, op) in sig.reduce_ops.iter().enumerate() {
        let col = inputs[k + j].read().cast(sig.outputs[k + j]);
        let reduced = grouped_reduce(&col, &starts, n, *op);
        outputs[k + j].write_range(0, g, &reduced)?;
    }
    Ok(KernelOutput::Count(g))
}

/// Run-length count over pre-sorted keys.
///
/// Column order: keys, key outputs, count output.
fn count_by_key(sig: &KernelSignature, call: &KernelCall<'_>) -> VectraResult<KernelOutput> {
    let k = sig.key_count;
    expect_views(sig, call, 2 * k + 1)?;
    let (inputs, outputs) = call.views.split_at(k);
    let n = uniform_size(inputs)?;

    let keys: Vec<HostColumn> = inputs.iter().map(|v| v.read()).collect();
    let starts = group_starts(&keys, n);
    let g = starts.len();
    check_output_capacity(outputs, g)?;

    for (i, key) in keys.iter().enumerate() {
        let gathered = key.take(&starts).cast(outputs[i].element_type());
        outputs[i].write_range(0, g, &gathered)?;
    }
    let counts: Vec<i64> = starts
        .iter()
        .enumerate()
        .map(|(gi, &s)| (starts.get(gi + 1).copied().unwrap_or(n) - s) as i64)
        .collect();
    let counts = HostColumn::from(counts).cast(sig.outputs[k]);
    outputs[k].write_range(0, g, &counts)?;
    Ok(KernelOutput::Count(g))
}

/// Elementwise graph evaluation, one output column per graph.
///
/// Column order: the concatenated graph inputs, then one output per graph.
fn transform(sig: &KernelSignature, call: &KernelCall<'_>) -> VectraResult<KernelOutput> {
    let input_count: usize = call.graphs.iter().map(|g| g.input_columns().len()).sum();
    if call.graphs.is_empty() {
        return Err(VectraError::Shape(
            "transform invoked without expression graphs".to_string(),
        ));
    }
    expect_views(sig, call, input_count + call.graphs.len())?;
    let n = uniform_size(call.views)?;
    let (input_views, output_views) = call.views.split_at(input_count);

    let mut offset = 0;
    for (gi, graph) in call.graphs.iter().enumerate() {
        let arity = graph.input_columns().len();
        let hosts: Vec<HostColumn> = input_views[offset..offset + arity]
            .iter()
            .map(|v| v.read())
            .collect();
        offset += arity;

        let values = (0..n)
            .into_par_iter()
            .map(|r| {
                let args: Vec<Scalar> = hosts.iter().map(|h| h.scalar_at(r)).collect();
                graph.eval(&args)
            })
            .collect::<VectraResult<Vec<Scalar>>>()?;
        let out = HostColumn::from_scalars(output_views[gi].element_type(), &values);
        output_views[gi].write_range(0, n, &out)?;
    }
    Ok(KernelOutput::Unit)
}

/// Scatter computed values to computed addresses of the output window.
///
/// Column order: value-graph inputs, address-graph inputs, output.
/// `pre_args[0]`, when present, caps the writable prefix of the output
/// window. When two rows address the same slot the later row wins.
fn scatter(sig: &KernelSignature, call: &KernelCall<'_>) -> VectraResult<KernelOutput> {
    expect_views(sig, call, sig.inputs.len() + 1)?;
    let [value_graph, addr_graph] = call.graphs else {
        return Err(VectraError::Shape(format!(
            "scatter requires a value graph and an address graph, got {}",
            call.graphs.len()
        )));
    };
    let k = sig.key_count;
    let (inputs, out) = call.views.split_at(sig.inputs.len());
    let out = &out[0];
    if value_graph.input_columns().len() != k
        || addr_graph.input_columns().len() != inputs.len() - k
    {
        return Err(VectraError::Shape(format!(
            "scatter graph arity {}+{} does not match {} value and {} address columns",
            value_graph.input_columns().len(),
            addr_graph.input_columns().len(),
            k,
            inputs.len() - k
        )));
    }
    let n = uniform_size(inputs)?;
    let out_size = call.pre_args.first().copied().unwrap_or(out.size());
    if out_size > out.size() {
        return Err(VectraError::Shape(format!(
            "scatter output size {out_size} exceeds the output window of {}",
            out.size()
        )));
    }

    let value_hosts: Vec<HostColumn> = inputs[..k].iter().map(|v| v.read()).collect();
    let addr_hosts: Vec<HostColumn> = inputs[k..].iter().map(|v| v.read()).collect();
    let checked = sig.checked;
    let pairs = (0..n)
        .into_par_iter()
        .map(|r| {
            let vargs: Vec<Scalar> = value_hosts.iter().map(|h| h.scalar_at(r)).collect();
            let value = value_graph.eval(&vargs)?;
            let aargs: Vec<Scalar> = addr_hosts.iter().map(|h| h.scalar_at(r)).collect();
            let Scalar::I64(addr) = addr_graph.eval(&aargs)?.cast(ElementType::I64) else {
                unreachable!()
            };
            if checked && (addr < 0 || addr as usize >= out_size) {
                return Err(VectraError::IndexOutOfBounds {
                    index: addr,
                    size: out_size,
                });
            }
            Ok((addr as usize, value))
        })
        .collect::<VectraResult<Vec<(usize, Scalar)>>>()?;

    let mut host = out.read();
    for (addr, value) in pairs {
        if checked {
            host.set(addr, value);
        } else {
            // Addresses were not validated; the caller vouched for them.
            unsafe { host.set_unchecked(addr, value) };
        }
    }
    out.write_range(0, out.size(), &host)?;
    Ok(KernelOutput::Unit)
}

/// Indices where a new run of equal key rows begins. Index 0 always starts
/// a run.
fn group_starts(keys: &[HostColumn], n: usize) -> Vec<usize> {
    let flags: Vec<bool> = (0..n)
        .into_par_iter()
        .map(|i| {
            i == 0
                || keys
                    .iter()
                    .any(|key| key.compare_rows(i - 1, i) != Ordering::Equal)
        })
        .collect();
    flags
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| start.then_some(i))
        .collect()
}

fn check_output_capacity(outputs: &[DeviceView], required: usize) -> VectraResult<()> {
    for out in outputs {
        if out.size() < required {
            return Err(VectraError::Capacity {
                capacity: out.size(),
                required,
            });
        }
    }
    Ok(())
}

fn reduce_column(col: &HostColumn, op: ReduceOp) -> Scalar {
    let identity = op.identity(col.element_type());
    dispatch_host!(col, v => {
        let id = Element::from_scalar(identity);
        v.par_iter()
            .copied()
            .reduce(
                || id,
                |a, b| match op {
                    ReduceOp::Sum => a.elem_add(b),
                    ReduceOp::Product => a.elem_mul(b),
                    ReduceOp::Min => a.elem_min(b),
                    ReduceOp::Max => a.elem_max(b),
                },
            )
            .to_scalar()
    })
}

/// Per-run reduction of a column segmented by `starts`.
fn grouped_reduce(col: &HostColumn, starts: &[usize], n: usize, op: ReduceOp) -> HostColumn {
    dispatch_host!(col, v => {
        let groups: Vec<_> = starts
            .par_iter()
            .enumerate()
            .map(|(gi, &s)| {
                let end = starts.get(gi + 1).copied().unwrap_or(n);
                let mut acc = v[s];
                for &x in &v[s + 1..end] {
                    acc = match op {
                        ReduceOp::Sum => acc.elem_add(x),
                        ReduceOp::Product => acc.elem_mul(x),
                        ReduceOp::Min => acc.elem_min(x),
                        ReduceOp::Max => acc.elem_max(x),
                    };
                }
                acc
            })
            .collect();
        HostColumn::from(groups)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ColumnExpr, ExpressionGraph};
    use crate::kernel::signature::KernelOp;
    use crate::vector::DeviceVector;
    use std::sync::Arc;

    fn view(values: Vec<i32>) -> DeviceView {
        DeviceView::full(DeviceVector::from_host(HostColumn::from(values)).unwrap())
    }

    #[test]
    fn sort_reorders_values_with_keys() {
        let keys = view(vec![3, 1, 2]);
        let vals = view(vec![30, 10, 20]);
        let sig = KernelSignature::new(KernelOp::Sort, [ElementType::I32, ElementType::I32])
            .with_key_count(1);
        let views = [keys.clone(), vals.clone()];
        execute(&sig, &KernelCall::views(&views)).unwrap();
        assert_eq!(keys.read(), HostColumn::from(vec![1i32, 2, 3]));
        assert_eq!(vals.read(), HostColumn::from(vec![10i32, 20, 30]));
    }

    #[test]
    fn reduce_applies_seed_after_identity() {
        let col = view(vec![1, 2, 3]);
        let sig = KernelSignature::new(KernelOp::Reduce, [ElementType::I32])
            .with_reduce_ops([ReduceOp::Sum]);
        let views = [col];
        let call = KernelCall {
            pre_args: &[],
            seeds: &[Scalar::I32(100)],
            views: &views,
            graphs: &[],
        };
        let out = execute(&sig, &call).unwrap();
        assert_eq!(out, KernelOutput::Scalars(vec![Scalar::I32(106)]));
    }

    #[test]
    fn reduce_by_key_sums_runs() {
        let keys = view(vec![1, 1, 2, 3, 3, 3]);
        let vals = view(vec![10, 20, 5, 1, 2, 3]);
        let key_out = view(vec![0; 6]);
        let val_out = view(vec![0; 6]);
        let sig = KernelSignature::new(
            KernelOp::ReduceByKey,
            [ElementType::I32, ElementType::I32],
        )
        .with_key_count(1)
        .with_reduce_ops([ReduceOp::Sum]);
        let views = [keys, vals, key_out.clone(), val_out.clone()];
        let out = execute(&sig, &KernelCall::views(&views)).unwrap();
        assert_eq!(out, KernelOutput::Count(3));
        assert_eq!(
            key_out.read_range(0, 3).unwrap(),
            HostColumn::from(vec![1i32, 2, 3])
        );
        assert_eq!(
            val_out.read_range(0, 3).unwrap(),
            HostColumn::from(vec![30i32, 5, 6])
        );
    }

    #[test]
    fn reduce_by_key_rejects_small_output() {
        let keys = view(vec![1, 2, 3]);
        let vals = view(vec![1, 1, 1]);
        let key_out = view(vec![0; 2]);
        let val_out = view(vec![0; 2]);
        let sig = KernelSignature::new(
            KernelOp::ReduceByKey,
            [ElementType::I32, ElementType::I32],
        )
        .with_key_count(1)
        .with_reduce_ops([ReduceOp::Sum]);
        let views = [keys, vals, key_out, val_out];
        let err = execute(&sig, &KernelCall::views(&views)).unwrap_err();
        assert!(matches!(err, VectraError::Capacity { required: 3, .. }));
    }

    #[test]
    fn count_by_key_counts_runs() {
        let keys = view(vec![1, 1, 2, 3, 3, 3]);
        let key_out = view(vec![0; 6]);
        let count_out = DeviceView::full(DeviceVector::zeros(ElementType::I64, 6).unwrap());
        let sig = KernelSignature::new(KernelOp::CountByKey, [ElementType::I32])
            .with_key_count(1)
            .with_outputs([ElementType::I32, ElementType::I64]);
        let views = [keys, key_out, count_out.clone()];
        let out = execute(&sig, &KernelCall::views(&views)).unwrap();
        assert_eq!(out, KernelOutput::Count(3));
        assert_eq!(
            count_out.read_range(0, 3).unwrap(),
            HostColumn::from(vec![2i64, 1, 3])
        );
    }

    #[test]
    fn transform_writes_graph_results() {
        let x = view(vec![1, 2, 3]);
        let out = view(vec![0; 3]);
        let graph: Arc<dyn ExpressionGraph> = Arc::new(
            ColumnExpr::column("x", ElementType::I32).mul(ColumnExpr::constant(Scalar::I32(10))),
        );
        let sig = KernelSignature::new(KernelOp::Transform, [ElementType::I32])
            .with_outputs([ElementType::I32]);
        let views = [x, out.clone()];
        let graphs = [graph];
        let call = KernelCall {
            pre_args: &[],
            seeds: &[],
            views: &views,
            graphs: &graphs,
        };
        execute(&sig, &call).unwrap();
        assert_eq!(out.read(), HostColumn::from(vec![10i32, 20, 30]));
    }

    #[test]
    fn checked_scatter_rejects_out_of_range_address() {
        let values = view(vec![7, 8]);
        let addrs = view(vec![0, 5]);
        let out = view(vec![0; 3]);
        let sig = KernelSignature::new(KernelOp::Scatter, [ElementType::I32, ElementType::I32])
            .with_key_count(1)
            .with_outputs([ElementType::I32]);
        let graphs: [Arc<dyn ExpressionGraph>; 2] = [
            Arc::new(ColumnExpr::column("v", ElementType::I32)),
            Arc::new(ColumnExpr::column("a", ElementType::I32)),
        ];
        let views = [values, addrs, out];
        let call = KernelCall {
            pre_args: &[],
            seeds: &[],
            views: &views,
            graphs: &graphs,
        };
        let err = execute(&sig, &call).unwrap_err();
        assert!(matches!(
            err,
            VectraError::IndexOutOfBounds { index: 5, size: 3 }
        ));
    }

    #[test]
    fn checked_scatter_reports_negative_addresses_signed() {
        let values = view(vec![7]);
        let addrs = view(vec![-4]);
        let out = view(vec![0; 3]);
        let sig = KernelSignature::new(KernelOp::Scatter, [ElementType::I32, ElementType::I32])
            .with_key_count(1)
            .with_outputs([ElementType::I32]);
        let graphs: [Arc<dyn ExpressionGraph>; 2] = [
            Arc::new(ColumnExpr::column("v", ElementType::I32)),
            Arc::new(ColumnExpr::column("a", ElementType::I32)),
        ];
        let views = [values, addrs, out];
        let call = KernelCall {
            pre_args: &[],
            seeds: &[],
            views: &views,
            graphs: &graphs,
        };
        let err = execute(&sig, &call).unwrap_err();
        assert!(matches!(
            err,
            VectraError::IndexOutOfBounds { index: -4, size: 3 }
        ));
        assert!(err.to_string().contains("-4"));
    }

    #[test]
    fn scatter_writes_values_at_addresses() {
        let values = view(vec![7, 8, 9]);
        let addrs = view(vec![2, 0, 1]);
        let out = view(vec![0; 3]);
        let sig = KernelSignature::new(KernelOp::Scatter, [ElementType::I32, ElementType::I32])
            .with_key_count(1)
            .with_outputs([ElementType::I32]);
        let graphs: [Arc<dyn ExpressionGraph>; 2] = [
            Arc::new(ColumnExpr::column("v", ElementType::I32)),
            Arc::new(ColumnExpr::column("a", ElementType::I32)),
        ];
        let views = [values, addrs, out.clone()];
        let call = KernelCall {
            pre_args: &[],
            seeds: &[],
            views: &views,
            graphs: &graphs,
        };
        execute(&sig, &call).unwrap();
        assert_eq!(out.read(), HostColumn::from(vec![8i32, 9, 7]));
    }
}
