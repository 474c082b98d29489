// Parser module - static analysis of Python scripts

pub mod extractor;
pub mod language;
pub mod literal;
pub mod tree_sitter;

pub use extractor::ScriptAnalyzer;
pub use language::LanguageDetector;
pub use self::tree_sitter::{ParseTree, TreeSitterParser};
