use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct LanguageDetector;

impl LanguageDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect_from_extension(path: &Path) -> bool {
        matches!(path.extension().and_then(|ext| ext.to_str()), Some("py"))
    }

    pub fn detect_from_shebang(content: &str) -> bool {
        match content.lines().next() {
            Some(first_line) if first_line.starts_with("#!") => first_line.contains("python"),
            _ => false,
        }
    }

    /// A Python script is an existing file with a `.py` extension, or an
    /// extensionless file with a python shebang.
    pub fn is_python_script(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        if Self::detect_from_extension(path) {
            return true;
        }
        if path.extension().is_some() {
            return false;
        }
        File::open(path)
            .ok()
            .and_then(|file| BufReader::new(file).lines().next())
            .and_then(Result::ok)
            .is_some_and(|line| Self::detect_from_shebang(&line))
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}
