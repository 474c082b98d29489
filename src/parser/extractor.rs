use crate::error::ProbeError;
use crate::models::{ArgValue, CallSite, ImportTable, Script, ScriptAnalysis};
use crate::parser::literal::{literal_value, named_children};
use crate::parser::tree_sitter::TreeSitterParser;
use std::path::Path;
use tree_sitter::Node;

/// Builds the import table and call-site list of a Python script without
/// running it.
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_path(&self, path: &Path) -> Result<ScriptAnalysis, ProbeError> {
        let script = Script::from_path(path)?;
        self.analyze_script(&script)
    }

    pub fn analyze_script(&self, script: &Script) -> Result<ScriptAnalysis, ProbeError> {
        self.analyze_source(&script.content, &script.path)
    }

    pub fn analyze_source(&self, source: &str, path: &Path) -> Result<ScriptAnalysis, ProbeError> {
        let mut parser = TreeSitterParser::new()?;
        let parse_tree = parser.parse(source, path)?;

        let mut analysis = ScriptAnalysis::default();
        collect(parse_tree.tree.root_node(), source.as_bytes(), &mut analysis);

        tracing::debug!(
            script = %path.display(),
            nodes = parse_tree.total_nodes,
            imports = analysis.imports.len(),
            calls = analysis.calls.len(),
            parse_time_ms = parse_tree.parse_time_ms,
            "analyzed script"
        );

        Ok(analysis)
    }
}

impl Default for ScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

// Pre-order walk so calls come out in source order, outer calls first.
fn collect(node: Node<'_>, source: &[u8], analysis: &mut ScriptAnalysis) {
    match node.kind() {
        "import_statement" => collect_import(node, source, &mut analysis.imports),
        "import_from_statement" => collect_import_from(node, source, &mut analysis.imports),
        "future_import_statement" => collect_future_import(node, source, &mut analysis.imports),
        "call" => {
            if let Some(call) = call_site(node, source) {
                analysis.calls.push(call);
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    for child in children {
        collect(child, source, analysis);
    }
}

fn dotted_text(node: Node<'_>, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let dotted: String = text.split_whitespace().collect();
    if dotted.is_empty() {
        None
    } else {
        Some(dotted)
    }
}

/// The imported dotted path of a `dotted_name` or `aliased_import`.
fn imported_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "aliased_import" => dotted_text(node.child_by_field_name("name")?, source),
        "dotted_name" => dotted_text(node, source),
        _ => None,
    }
}

fn collect_import(node: Node<'_>, source: &[u8], imports: &mut ImportTable) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        if let Some(module) = imported_name(name, source) {
            imports.insert(module);
        }
    }
}

fn collect_import_from(node: Node<'_>, source: &[u8], imports: &mut ImportTable) {
    let module = match node
        .child_by_field_name("module_name")
        .and_then(|module| dotted_text(module, source))
    {
        Some(module) => module,
        None => return,
    };
    imports.insert(module.clone());

    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        if let Some(member) = imported_name(name, source) {
            imports.insert(join_module(&module, &member));
        }
    }
}

fn collect_future_import(node: Node<'_>, source: &[u8], imports: &mut ImportTable) {
    imports.insert("__future__".to_string());
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        if let Some(member) = imported_name(name, source) {
            imports.insert(join_module("__future__", &member));
        }
    }
}

fn join_module(module: &str, member: &str) -> String {
    // Relative imports such as `from . import x` already end in a dot
    if module.ends_with('.') {
        format!("{}{}", module, member)
    } else {
        format!("{}.{}", module, member)
    }
}

fn call_site(node: Node<'_>, source: &[u8]) -> Option<CallSite> {
    let function = node.child_by_field_name("function")?;
    let name_node = match function.kind() {
        "identifier" => function,
        "attribute" => function.child_by_field_name("attribute")?,
        _ => return None,
    };
    let name = name_node.utf8_text(source).ok()?.to_string();
    let mut call = CallSite::new(name, node.start_position().row + 1);

    let arguments = match node.child_by_field_name("arguments") {
        Some(arguments) => arguments,
        None => return Some(call),
    };

    if arguments.kind() != "argument_list" {
        // A bare generator argument: f(x for x in xs)
        call.positional_args.push(ArgValue::Opaque);
        return Some(call);
    }

    for argument in named_children(arguments) {
        match argument.kind() {
            "keyword_argument" => {
                let key = argument
                    .child_by_field_name("name")
                    .and_then(|key| key.utf8_text(source).ok());
                let value = argument
                    .child_by_field_name("value")
                    .map(|value| literal_value(value, source))
                    .unwrap_or(ArgValue::Opaque);
                if let Some(key) = key {
                    call.keyword_args.push((key.to_string(), value));
                }
            }
            // `**kwargs` is recorded under the key `**`
            "dictionary_splat" => call.keyword_args.push(("**".to_string(), ArgValue::Opaque)),
            "list_splat" => call.positional_args.push(ArgValue::Opaque),
            _ => call.positional_args.push(literal_value(argument, source)),
        }
    }

    Some(call)
}
