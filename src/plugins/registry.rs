use crate::error::ProbeError;
use crate::models::{ModelDescriptor, OpData, OpSpec};
use crate::plugins::{keras, python_script};
use std::fmt;
use std::path::Path;

/// Claims a script for a framework family, or declines with `None`.
pub type Capability = fn(&OpSpec, &Path) -> Option<ModelDescriptor>;

/// Fills framework defaults into an operation definition.
pub type OpDataHook = fn(&mut OpData, &Path);

#[derive(Clone)]
pub struct Detector {
    pub name: &'static str,
    pub priority: i32,
    pub capability: Capability,
    pub op_data_hook: Option<OpDataHook>,
}

/// Detectors ordered by descending priority; equal priorities keep their
/// registration order.
#[derive(Clone, Default)]
pub struct DetectorRegistry {
    detectors: Vec<Detector>,
}

impl Detector {
    pub fn new(name: &'static str, priority: i32, capability: Capability) -> Self {
        Self {
            name,
            priority,
            capability,
            op_data_hook: None,
        }
    }

    pub fn with_op_data_hook(mut self, hook: OpDataHook) -> Self {
        self.op_data_hook = Some(hook);
        self
    }
}

impl fmt::Debug for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("op_data_hook", &self.op_data_hook.is_some())
            .finish()
    }
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in detectors: Keras scripts, then any Python script.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(keras::detector());
        registry.register(python_script::detector());
        registry
    }

    pub fn register(&mut self, detector: Detector) {
        let position = self
            .detectors
            .iter()
            .position(|existing| existing.priority < detector.priority)
            .unwrap_or(self.detectors.len());
        self.detectors.insert(position, detector);
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn for_name(&self, name: &str) -> Option<&Detector> {
        self.detectors.iter().find(|detector| detector.name == name)
    }

    /// Returns the first claim in priority order.
    pub fn resolve(&self, opspec: &OpSpec, dir: &Path) -> Result<ModelDescriptor, ProbeError> {
        for detector in &self.detectors {
            if let Some(mut descriptor) = (detector.capability)(opspec, dir) {
                tracing::debug!(
                    opspec = %opspec,
                    detector = detector.name,
                    priority = detector.priority,
                    "detector claimed operation"
                );
                descriptor.detector = detector.name.to_string();
                return Ok(descriptor);
            }
        }

        tracing::debug!(opspec = %opspec, "no detector claimed operation");
        Err(ProbeError::NotApplicable {
            opspec: opspec.to_string(),
        })
    }

    /// Lets the named detector fill defaults into `op_data`. Unknown
    /// detectors and detectors without a hook leave it unchanged.
    pub fn backfill_op_data(&self, detector: &str, op_data: &mut OpData, dir: &Path) {
        if let Some(hook) = self.for_name(detector).and_then(|d| d.op_data_hook) {
            hook(op_data, dir);
        }
    }
}
