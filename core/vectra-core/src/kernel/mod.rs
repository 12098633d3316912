//! Kernel specialization, caching, and the execution context.
//!
//! Operations are described by a `KernelSignature` (kind, column types,
//! flags), built into callables by a `KernelBuilder`, and memoized in a
//! `KernelCache`. An `ExecutionContext` ties a cache to the collections
//! that share it; nothing here is process-global, so two contexts never
//! share compiled state.

mod builder;
mod cache;
mod exec;
mod signature;
pub mod source;

pub use builder::{BuiltKernel, KernelBuilder, KernelCall, KernelFn, KernelOutput,
    ParallelKernelBuilder};
pub use cache::{CompiledKernel, KernelCache};
pub use signature::{KernelOp, KernelSignature, ReduceOp, TypeTuple};

use std::sync::Arc;

use crate::error::VectraResult;

/// Shared execution state: the kernel cache and the builder behind it.
///
/// Collections hold their context behind `Arc`; every operation on a
/// collection resolves kernels through the context it was created with.
#[derive(Debug)]
pub struct ExecutionContext {
    cache: KernelCache,
}

impl ExecutionContext {
    /// Context backed by a custom kernel builder.
    pub fn with_builder(builder: Arc<dyn KernelBuilder>) -> Arc<Self> {
        Arc::new(Self {
            cache: KernelCache::new(builder),
        })
    }

    /// Context backed by the built-in data-parallel builder.
    pub fn with_default_builder() -> Arc<Self> {
        Self::with_builder(Arc::new(ParallelKernelBuilder::new()))
    }

    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }

    /// Resolve the kernel for `signature`, compiling on first use.
    pub fn kernel(&self, signature: &KernelSignature) -> VectraResult<Arc<CompiledKernel>> {
        self.cache.get_kernel(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementType;

    #[test]
    fn contexts_do_not_share_cached_state() {
        let a = ExecutionContext::with_default_builder();
        let b = ExecutionContext::with_default_builder();
        let sig = KernelSignature::new(KernelOp::Reduce, [ElementType::I32])
            .with_reduce_ops([ReduceOp::Sum]);
        a.kernel(&sig).unwrap();
        assert_eq!(a.cache().len(), 1);
        assert_eq!(b.cache().len(), 0);
    }
}
