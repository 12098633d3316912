//! Memoized kernel cache.
//!
//! Kernels are specialized per signature and compiled at most once per
//! process. Lookups are lock-free on the hit path; on a miss, concurrent
//! requests for the same signature serialize on a per-signature build lock
//! so exactly one of them compiles. Failed builds are never cached: the
//! next request retries.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::VectraResult;
use crate::kernel::builder::{KernelBuilder, KernelCall, KernelFn, KernelOutput};
use crate::kernel::signature::KernelSignature;

/// A cached, ready-to-invoke kernel.
pub struct CompiledKernel {
    signature: KernelSignature,
    source: String,
    func: KernelFn,
}

impl CompiledKernel {
    pub fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    /// Rendered listing the kernel was specialized from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn call(&self, call: &KernelCall<'_>) -> VectraResult<KernelOutput> {
        (self.func)(call)
    }
}

impl fmt::Debug for CompiledKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledKernel")
            .field("signature", &self.signature.name())
            .finish_non_exhaustive()
    }
}

/// Signature-keyed cache of compiled kernels.
pub struct KernelCache {
    builder: Arc<dyn KernelBuilder>,
    entries: DashMap<KernelSignature, Arc<CompiledKernel>>,
    build_locks: DashMap<KernelSignature, Arc<Mutex<()>>>,
    compiled: AtomicU64,
}

impl KernelCache {
    pub fn new(builder: Arc<dyn KernelBuilder>) -> Self {
        Self {
            builder,
            entries: DashMap::new(),
            build_locks: DashMap::new(),
            compiled: AtomicU64::new(0),
        }
    }

    /// Look up the kernel for `signature`, compiling it on first use.
    pub fn get_kernel(&self, signature: &KernelSignature) -> VectraResult<Arc<CompiledKernel>> {
        if let Some(hit) = self.entries.get(signature) {
            return Ok(Arc::clone(&hit));
        }

        let lock = self
            .build_locks
            .entry(signature.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock();

        // Another caller may have compiled while we waited on the lock.
        if let Some(hit) = self.entries.get(signature) {
            return Ok(Arc::clone(&hit));
        }

        let started = Instant::now();
        let built = self.builder.build(signature)?;
        let kernel = Arc::new(CompiledKernel {
            signature: signature.clone(),
            source: built.source,
            func: built.func,
        });
        self.entries.insert(signature.clone(), Arc::clone(&kernel));
        self.compiled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            target: "kernel",
            kernel = %signature,
            elapsed_us = started.elapsed().as_micros() as u64,
            "kernel specialized"
        );
        Ok(kernel)
    }

    /// Number of builds performed, including entries since cleared.
    pub fn compile_count(&self) -> u64 {
        self.compiled.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, signature: &KernelSignature) -> bool {
        self.entries.contains_key(signature)
    }

    /// Drop every cached kernel. The compile counter is preserved.
    pub fn clear(&self) {
        self.entries.clear();
        self.build_locks.clear();
    }
}

impl fmt::Debug for KernelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelCache")
            .field("entries", &self.entries.len())
            .field("compiled", &self.compile_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VectraError;
    use crate::kernel::builder::{BuiltKernel, ParallelKernelBuilder};
    use crate::kernel::signature::{KernelOp, ReduceOp};
    use crate::types::ElementType;

    fn cache() -> KernelCache {
        KernelCache::new(Arc::new(ParallelKernelBuilder::new()))
    }

    fn sum_sig(dtype: ElementType) -> KernelSignature {
        KernelSignature::new(KernelOp::Reduce, [dtype]).with_reduce_ops([ReduceOp::Sum])
    }

    #[test]
    fn second_lookup_hits_without_recompiling() {
        let cache = cache();
        let sig = sum_sig(ElementType::I32);
        let first = cache.get_kernel(&sig).unwrap();
        let second = cache.get_kernel(&sig).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compile_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_signatures_compile_separately() {
        let cache = cache();
        cache.get_kernel(&sum_sig(ElementType::I32)).unwrap();
        cache.get_kernel(&sum_sig(ElementType::I64)).unwrap();
        assert_eq!(cache.compile_count(), 2);
    }

    #[test]
    fn concurrent_misses_compile_once() {
        struct SlowBuilder;
        impl KernelBuilder for SlowBuilder {
            fn build(&self, sig: &KernelSignature) -> VectraResult<BuiltKernel> {
                std::thread::sleep(std::time::Duration::from_millis(20));
                ParallelKernelBuilder::new().build(sig)
            }
        }
        let cache = Arc::new(KernelCache::new(Arc::new(SlowBuilder)));
        let sig = sum_sig(ElementType::F64);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let sig = sig.clone();
                std::thread::spawn(move || cache.get_kernel(&sig).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.compile_count(), 1);
    }

    #[test]
    fn failed_builds_are_not_cached() {
        let cache = cache();
        // Sort without key columns never validates.
        let bad = KernelSignature::new(KernelOp::Sort, [ElementType::I32]);
        assert!(matches!(
            cache.get_kernel(&bad),
            Err(VectraError::KernelBuild { .. })
        ));
        assert!(cache.is_empty());
        // A retry goes through the builder again (and fails again).
        assert!(cache.get_kernel(&bad).is_err());
    }

    #[test]
    fn clear_keeps_compile_count() {
        let cache = cache();
        let sig = sum_sig(ElementType::U8);
        cache.get_kernel(&sig).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        cache.get_kernel(&sig).unwrap();
        assert_eq!(cache.compile_count(), 2);
    }
}
