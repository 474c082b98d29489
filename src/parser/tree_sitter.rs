use crate::error::ProbeError;
use std::path::Path;
use std::time::Instant;
use ::tree_sitter::{Node, Parser, Tree};

pub struct TreeSitterParser {
    parser: Parser,
}

pub struct ParseTree {
    pub tree: Tree,
    pub total_nodes: usize,
    pub parse_time_ms: u64,
}

impl TreeSitterParser {
    pub fn new() -> Result<Self, ProbeError> {
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_python::language())
            .map_err(|e| ProbeError::ConfigError(format!("Python grammar unavailable: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parses Python source. Any syntax error in the tree is reported as a
    /// `ParseError` naming `path`.
    pub fn parse(&mut self, source_code: &str, path: &Path) -> Result<ParseTree, ProbeError> {
        let start_time = Instant::now();

        let tree = self
            .parser
            .parse(source_code, None)
            .ok_or_else(|| ProbeError::ParseError {
                path: path.to_path_buf(),
                detail: "parser returned no tree".to_string(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            let detail = match first_error(root) {
                Some(node) => format!(
                    "invalid syntax at line {}, column {}",
                    node.start_position().row + 1,
                    node.start_position().column + 1
                ),
                None => "invalid syntax".to_string(),
            };
            return Err(ProbeError::ParseError {
                path: path.to_path_buf(),
                detail,
            });
        }

        let total_nodes = count_nodes(root);
        let parse_time_ms = start_time.elapsed().as_millis() as u64;

        Ok(ParseTree {
            tree,
            total_nodes,
            parse_time_ms,
        })
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

fn count_nodes(node: Node<'_>) -> usize {
    let mut cursor = node.walk();
    let mut count = 0;
    loop {
        count += 1;
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return count;
            }
        }
    }
}
