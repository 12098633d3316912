//! Scatter writes.

use std::sync::Arc;

use crate::error::{VectraError, VectraResult};
use crate::frame::DataFrame;
use crate::graph::ExpressionGraph;
use crate::kernel::{KernelCall, KernelOp, KernelSignature};

impl DataFrame {
    /// For each row of the active window, evaluate `values` and `addresses`
    /// and write the value at the addressed slot of `output`'s window.
    /// Every address is validated against the output window before any
    /// write. When two rows address the same slot the later row wins.
    pub fn scatter(
        &self,
        values: &Arc<dyn ExpressionGraph>,
        addresses: &Arc<dyn ExpressionGraph>,
        output: &str,
        out_size: Option<usize>,
    ) -> VectraResult<()> {
        self.scatter_inner(values, addresses, output, out_size, true)
    }

    /// Scatter without address validation.
    ///
    /// # Safety
    /// Every evaluated address must lie inside `output`'s window (or inside
    /// `out_size` when given); an out-of-range address is undefined
    /// behavior.
    pub unsafe fn scatter_unchecked(
        &self,
        values: &Arc<dyn ExpressionGraph>,
        addresses: &Arc<dyn ExpressionGraph>,
        output: &str,
        out_size: Option<usize>,
    ) -> VectraResult<()> {
        self.scatter_inner(values, addresses, output, out_size, false)
    }

    fn scatter_inner(
        &self,
        values: &Arc<dyn ExpressionGraph>,
        addresses: &Arc<dyn ExpressionGraph>,
        output: &str,
        out_size: Option<usize>,
        checked: bool,
    ) -> VectraResult<()> {
        if !addresses.output_type().is_integer() {
            return Err(VectraError::InvalidOperation(format!(
                "scatter addresses must be an integer type, got {}",
                addresses.output_type()
            )));
        }
        let mut input_names: Vec<&str> =
            values.input_columns().iter().map(|n| n.as_str()).collect();
        input_names.extend(addresses.input_columns().iter().map(|n| n.as_str()));

        let input_types = self.group().element_types(&input_names)?;
        let output_type = self.element_type(output)?;
        let signature = KernelSignature::new(KernelOp::Scatter, input_types)
            .with_key_count(values.input_columns().len())
            .with_outputs([output_type])
            .with_checked(checked);
        let kernel = self.context().kernel(&signature)?;

        let mut views = self.group().views_for(&input_names)?;
        views.push(self.column(output)?.clone());
        let graphs: [Arc<dyn ExpressionGraph>; 2] = [Arc::clone(values), Arc::clone(addresses)];
        let pre_args: Vec<usize> = out_size.into_iter().collect();

        tracing::debug!(target: "ops", kernel = %signature, rows = self.size()?, "scatter");
        kernel.call(&KernelCall {
            pre_args: &pre_args,
            seeds: &[],
            views: &views,
            graphs: &graphs,
        })?;
        Ok(())
    }
}
