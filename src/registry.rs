use parking_lot::RwLock;

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use crate::{Extensions, Feature, FeatureSet, UsageSet};

/// Observed feature usage, shared between every recording thread.
///
/// All state is a set of flags that only ever go from `false` to `true`, so
/// marking needs no locking and the order of observations does not matter.
#[derive(Debug)]
pub struct FeatureRegistry {
    features: [AtomicBool; Feature::COUNT],
    extensions: AtomicU32,
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self {
            features: std::array::from_fn(|_| AtomicBool::new(false)),
            extensions: AtomicU32::new(0),
        }
    }

    /// Record that `feature` was used.
    pub fn mark(&self, feature: Feature) {
        let flag = &self.features[feature as usize];
        if !flag.load(Ordering::Relaxed) && !flag.swap(true, Ordering::Relaxed) {
            log::trace!("Feature {} used", feature);
        }
    }

    /// Record that the behavior of every extension in `extensions` was used.
    pub fn mark_extensions(&self, extensions: Extensions) {
        let current = self.extensions.load(Ordering::Relaxed);
        if current & extensions.bits() == extensions.bits() {
            return;
        }
        let previous = self.extensions.fetch_or(extensions.bits(), Ordering::Relaxed);
        let added = extensions - Extensions::from_bits_truncate(previous);
        if !added.is_empty() {
            log::trace!("Extensions {:?} used", added);
        }
    }

    /// Merge a whole usage set, e.g. the declarations of a shader module.
    pub fn record(&self, usage: &UsageSet) {
        for feature in usage.features.iter() {
            self.mark(feature);
        }
        if !usage.extensions.is_empty() {
            self.mark_extensions(usage.extensions);
        }
    }

    pub fn is_used(&self, feature: Feature) -> bool {
        self.features[feature as usize].load(Ordering::Relaxed)
    }

    pub fn extensions(&self) -> Extensions {
        Extensions::from_bits_truncate(self.extensions.load(Ordering::Relaxed))
    }

    /// A point-in-time copy of the observed usage.
    ///
    /// Observations racing with this call may or may not be included.
    pub fn snapshot(&self) -> UsageSet {
        UsageSet {
            features: Feature::ALL
                .iter()
                .copied()
                .filter(|&feature| self.is_used(feature))
                .collect::<FeatureSet>(),
            extensions: self.extensions(),
        }
    }
}

static CURRENT: RwLock<Option<Arc<FeatureRegistry>>> = parking_lot::const_rwlock(None);

/// The process-wide registry, created on first use.
pub fn current() -> Arc<FeatureRegistry> {
    if let Some(ref registry) = *CURRENT.read() {
        return Arc::clone(registry);
    }
    let mut guard = CURRENT.write();
    let registry = guard.get_or_insert_with(|| {
        log::info!("Creating feature registry");
        Arc::new(FeatureRegistry::new())
    });
    Arc::clone(registry)
}

/// Drop all accumulated usage and start a fresh process-wide registry.
///
/// Handles obtained from [`current`] before the reset stay valid, but are
/// detached: further observations through them are not seen by the new
/// registry. Callers should reset between capture sessions, when no
/// recording is in flight.
pub fn reset() {
    let mut guard = CURRENT.write();
    if guard.is_some() {
        log::info!("Resetting feature registry");
    }
    *guard = Some(Arc::new(FeatureRegistry::new()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn marks_are_sticky() {
        let registry = FeatureRegistry::new();
        assert!(!registry.is_used(Feature::WideLines));
        registry.mark(Feature::WideLines);
        registry.mark(Feature::WideLines);
        assert!(registry.is_used(Feature::WideLines));
        assert_eq!(registry.snapshot().features.len(), 1);
    }

    #[test]
    fn extensions_accumulate() {
        let registry = FeatureRegistry::new();
        registry.mark_extensions(Extensions::INDEX_TYPE_UINT8);
        registry.mark_extensions(Extensions::SHADER_ATOMIC_INT64 | Extensions::INDEX_TYPE_UINT8);
        assert_eq!(
            registry.extensions(),
            Extensions::INDEX_TYPE_UINT8 | Extensions::SHADER_ATOMIC_INT64
        );
    }

    #[test]
    fn record_merged_usage() {
        let registry = FeatureRegistry::new();
        let shader = UsageSet {
            features: [Feature::ShaderInt64].into_iter().collect(),
            extensions: Extensions::SHADER_ATOMIC_INT64,
        };
        let pipeline = UsageSet::from_features(&[Feature::WideLines, Feature::ShaderInt64]);
        let merged = shader.union(pipeline);
        assert_eq!(merged.features.len(), 2);
        assert_eq!(merged, pipeline.union(shader));

        registry.record(&merged);
        assert_eq!(registry.snapshot(), merged);
    }

    #[test]
    fn concurrent_marks_converge() {
        let registry = Arc::new(FeatureRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for feature in Feature::ALL.iter().copied().skip(i).step_by(3) {
                        registry.mark(feature);
                    }
                    registry.mark_extensions(Extensions::SHADER_SUBGROUP_ROTATE);
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.features.len(), Feature::COUNT);
        assert_eq!(snapshot.extensions, Extensions::SHADER_SUBGROUP_ROTATE);
    }

    // The only test touching the process-wide registry.
    #[test]
    fn global_lifecycle() {
        let first = current();
        assert!(Arc::ptr_eq(&first, &current()));
        first.mark(Feature::LogicOp);
        assert!(current().is_used(Feature::LogicOp));

        reset();
        let second = current();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!second.is_used(Feature::LogicOp));
        assert!(first.is_used(Feature::LogicOp));
    }
}
