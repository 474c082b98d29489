//! Fallback detector for any Python script. Claims carry no framework
//! defaults.

use crate::models::{ModelDescriptor, OpSpec};
use crate::parser::LanguageDetector;
use crate::plugins::registry::Detector;
use std::path::Path;

pub const NAME: &str = "python_script";
pub const PRIORITY: i32 = 0;

pub fn detector() -> Detector {
    Detector::new(NAME, PRIORITY, resolve_model_op)
}

fn resolve_model_op(opspec: &OpSpec, dir: &Path) -> Option<ModelDescriptor> {
    let path = dir.join(opspec.as_str());
    if !LanguageDetector::new().is_python_script(&path) {
        return None;
    }
    Some(ModelDescriptor::new(opspec.to_string(), path))
}
