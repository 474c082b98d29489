use crate::error::ProbeError;
use std::path::{Path, PathBuf};

/// Resolves a main module reference (`pkg.train`, optionally followed by
/// arguments) to `(search_path, file_path)` under `dir`. Only plain path
/// lookup is done: `dir/pkg/train.py`, then `dir/pkg/train/__init__.py`.
pub fn find_module(main: &str, dir: &Path) -> Result<(PathBuf, PathBuf), ProbeError> {
    let not_found = || ProbeError::ModuleNotFound {
        module: main.to_string(),
        dir: dir.to_path_buf(),
    };

    let module = main.split_whitespace().next().ok_or_else(not_found)?;
    if module.split('.').any(|part| part.is_empty()) {
        return Err(not_found());
    }

    let mut base = dir.to_path_buf();
    for part in module.split('.') {
        base.push(part);
    }

    let candidates = [base.with_extension("py"), base.join("__init__.py")];
    for candidate in candidates {
        if candidate.is_file() {
            tracing::debug!(module, path = %candidate.display(), "found module");
            return Ok((dir.to_path_buf(), candidate));
        }
    }

    Err(ProbeError::ModuleNotFound {
        module: module.to_string(),
        dir: dir.to_path_buf(),
    })
}
