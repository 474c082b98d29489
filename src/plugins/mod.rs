// Plugins module - ranked detectors that classify scripts by framework

pub mod keras;
pub mod modules;
pub mod python_script;
pub mod registry;

pub use modules::find_module;
pub use registry::{Capability, Detector, DetectorRegistry, OpDataHook};
