//! Keras scripts: a Keras import plus a `fit` or `predict` call.

use crate::models::{
    CallSite, ImportTable, ModelDescriptor, Objective, OpData, OpSpec, OutputScalar,
    ScriptAnalysis,
};
use crate::parser::{LanguageDetector, ScriptAnalyzer};
use crate::plugins::modules::find_module;
use crate::plugins::registry::Detector;
use std::path::Path;

pub const NAME: &str = "keras";
pub const PRIORITY: i32 = 50;

pub const KERAS_OUTPUT_SCALARS: &[(&str, &str)] = &[
    ("step", r"Epoch ([0-9]+)/[0-9]+"),
    ("loss", r"step - loss: ([0-9\.]+)"),
    ("acc", r"acc: ([0-9\.]+) - val_loss"),
    ("val_loss", r"val_loss: ([0-9\.]+)"),
    ("val_acc", r"val_acc: ([0-9\.]+)"),
];

pub const KERAS_BASE_COMPARE: &[&str] = &["loss step as step", "loss", "acc", "val_loss", "val_acc"];

const TRAIN_CALL: &str = "fit";
const PREDICT_CALL: &str = "predict";

pub fn detector() -> Detector {
    Detector::new(NAME, PRIORITY, resolve_model_op).with_op_data_hook(backfill_op_data)
}

pub fn output_scalars() -> Vec<OutputScalar> {
    KERAS_OUTPUT_SCALARS
        .iter()
        .map(|(metric, pattern)| OutputScalar::new(metric, pattern))
        .collect()
}

pub fn base_compare() -> Vec<String> {
    KERAS_BASE_COMPARE.iter().map(|col| col.to_string()).collect()
}

fn resolve_model_op(opspec: &OpSpec, dir: &Path) -> Option<ModelDescriptor> {
    let path = dir.join(opspec.as_str());
    if !LanguageDetector::new().is_python_script(&path) {
        return None;
    }

    let analysis = match ScriptAnalyzer::new().analyze_path(&path) {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::debug!(script = %path.display(), "keras detector declining: {}", e);
            return None;
        }
    };

    if !imports_keras(&analysis.imports) {
        return None;
    }
    let basis = op_method(&analysis)?;
    tracing::debug!(
        script = %path.display(),
        call = %basis.name,
        line = basis.line,
        "keras script"
    );

    Some(
        ModelDescriptor::new(opspec.to_string(), path)
            .with_output_scalars(output_scalars())
            .with_compare_columns(base_compare())
            .with_objective(Objective::maximize("val_acc")),
    )
}

pub fn is_keras_script(analysis: &ScriptAnalysis) -> bool {
    imports_keras(&analysis.imports) && op_method(analysis).is_some()
}

pub fn imports_keras(imports: &ImportTable) -> bool {
    imports
        .iter()
        .any(|name| name == "keras" || name.starts_with("keras.") || name.starts_with("tensorflow.keras"))
}

/// The call an operation on the script would run.
///
/// Scanning from the last call back, the first `fit` wins outright. Without
/// any `fit`, the `predict` seen last in that scan (the earliest in source)
/// is used. This is a heuristic, not the framework's real entry point.
pub fn op_method(analysis: &ScriptAnalysis) -> Option<&CallSite> {
    let mut predict = None;
    for call in analysis.calls.iter().rev() {
        if call.name == TRAIN_CALL {
            return Some(call);
        } else if call.name == PREDICT_CALL {
            predict = Some(call);
        }
    }
    predict
}

/// Fills `compare` and `output-scalars` for a Keras main module. Missing
/// modules and scripts that no longer look like Keras leave `op_data` as is.
pub fn backfill_op_data(op_data: &mut OpData, dir: &Path) {
    if op_data.compare.is_some() && op_data.output_scalars.is_some() {
        return;
    }

    let (_search_path, module_path) = match find_module(&op_data.main, dir) {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!("skipping keras defaults: {}", e);
            return;
        }
    };

    let analysis = match ScriptAnalyzer::new().analyze_path(&module_path) {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::debug!("skipping keras defaults: {}", e);
            return;
        }
    };
    if !is_keras_script(&analysis) {
        return;
    }

    if op_data.compare.is_none() {
        let mut compare: Vec<String> = op_data
            .flags
            .names()
            .filter(|name| !name.starts_with('$'))
            .map(|name| format!("={}", name))
            .collect();
        compare.extend(base_compare());
        op_data.compare = Some(compare);
    }

    if op_data.output_scalars.is_none() {
        op_data.output_scalars = Some(output_scalars());
    }
}
