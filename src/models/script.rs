use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub content: String,
    pub path: PathBuf,
}

impl Script {
    pub fn new(content: String, path: PathBuf) -> Self {
        Self { content, path }
    }

    pub fn from_path(path: &Path) -> Result<Self, ProbeError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(content, path.to_path_buf()))
    }
}
