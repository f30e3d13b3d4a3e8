//! Named feature flags queried through `is_supported`.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

/// Set when an access control validator is attached to an entity instance.
pub const ACCESS_CONTROL_VALIDATION: &str = "access_control_validation";
/// Set by protocols able to carry an access control validator.
pub const ACCESS_CONTROL_VALIDATOR: &str = "access_control_validator";
/// Set by entities that rewrite their call stacks after resolution.
pub const CALL_STACK_OPTIMIZATION: &str = "call_stack_optimization";
/// Set by validators maintaining an operation deny list.
pub const BLACKLISTING: &str = "blacklisting";

type Probe = Arc<dyn Fn() -> bool + Send + Sync>;

/// A single feature entry: either fixed, or evaluated on every query.
#[derive(Clone)]
pub enum Capability {
    Flag(bool),
    Probe(Probe),
}

impl Capability {
    pub fn probe(f: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Capability::Probe(Arc::new(f))
    }

    pub fn evaluate(&self) -> bool {
        match self {
            Capability::Flag(value) => *value,
            Capability::Probe(probe) => probe(),
        }
    }
}

impl Debug for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Capability::Flag(value) => write!(f, "Flag({value})"),
            Capability::Probe(_) => write!(f, "Probe"),
        }
    }
}

/// Feature name to capability mapping. Unknown features are unsupported.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    features: HashMap<String, Capability>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, feature: impl Into<String>, capability: Capability) -> &mut Self {
        self.features.insert(feature.into(), capability);
        self
    }

    pub fn set_flag(&mut self, feature: impl Into<String>, value: bool) -> &mut Self {
        self.set(feature, Capability::Flag(value))
    }

    pub fn with_flag(mut self, feature: impl Into<String>, value: bool) -> Self {
        self.set_flag(feature, value);
        self
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains_key(feature)
    }

    pub fn is_supported(&self, feature: &str) -> bool {
        self.features
            .get(feature)
            .map(Capability::evaluate)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_unknown_feature_is_unsupported() {
        let caps = Capabilities::new();
        assert!(!caps.is_supported("anything"));
        assert!(!caps.contains("anything"));
    }

    #[test]
    fn test_flags() {
        let caps = Capabilities::new()
            .with_flag(BLACKLISTING, true)
            .with_flag(CALL_STACK_OPTIMIZATION, false);
        assert!(caps.is_supported(BLACKLISTING));
        assert!(!caps.is_supported(CALL_STACK_OPTIMIZATION));
        assert!(caps.contains(CALL_STACK_OPTIMIZATION));
    }

    #[test]
    fn test_probe_is_evaluated_on_every_query() {
        let state = Arc::new(AtomicBool::new(false));
        let probe_state = Arc::clone(&state);
        let mut caps = Capabilities::new();
        caps.set(
            ACCESS_CONTROL_VALIDATION,
            Capability::probe(move || probe_state.load(Ordering::SeqCst)),
        );

        assert!(!caps.is_supported(ACCESS_CONTROL_VALIDATION));
        state.store(true, Ordering::SeqCst);
        assert!(caps.is_supported(ACCESS_CONTROL_VALIDATION));
    }
}
