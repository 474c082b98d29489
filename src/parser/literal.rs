//! Reads Python literal constants out of syntax nodes.
//!
//! Only values whose meaning is fixed by the source text are read: numbers,
//! strings without interpolation, `True`/`False`/`None`, negated numbers and
//! containers of those. Everything else is opaque.

use crate::models::ArgValue;
use serde_json::{Map, Number, Value};
use tree_sitter::Node;

pub fn literal_value(node: Node<'_>, source: &[u8]) -> ArgValue {
    match eval(node, source) {
        Some(value) => ArgValue::Literal(value),
        None => ArgValue::Opaque,
    }
}

fn eval(node: Node<'_>, source: &[u8]) -> Option<Value> {
    match node.kind() {
        "integer" => parse_integer(text(node, source)?),
        "float" => parse_float(text(node, source)?),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "none" => Some(Value::Null),
        "string" => parse_string(node, source).map(Value::String),
        "concatenated_string" => {
            let mut joined = String::new();
            for part in named_children(node) {
                joined.push_str(&parse_string(part, source)?);
            }
            Some(Value::String(joined))
        }
        "unary_operator" => {
            let operator = node.child_by_field_name("operator")?;
            let argument = eval(node.child_by_field_name("argument")?, source)?;
            match (text(operator, source)?, argument) {
                ("-", Value::Number(n)) => negate(&n),
                ("+", Value::Number(n)) => Some(Value::Number(n)),
                _ => None,
            }
        }
        "parenthesized_expression" => {
            let inner = named_children(node).into_iter().next()?;
            eval(inner, source)
        }
        "list" | "tuple" | "set" => named_children(node)
            .into_iter()
            .map(|item| eval(item, source))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        "dictionary" => {
            let mut map = Map::new();
            for pair in named_children(node) {
                if pair.kind() != "pair" {
                    return None;
                }
                let key = match eval(pair.child_by_field_name("key")?, source)? {
                    Value::String(key) => key,
                    _ => return None,
                };
                let value = eval(pair.child_by_field_name("value")?, source)?;
                map.insert(key, value);
            }
            Some(Value::Object(map))
        }
        _ => None,
    }
}

/// Named children, without comments.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    children
}

fn text<'a>(node: Node<'_>, source: &'a [u8]) -> Option<&'a str> {
    node.utf8_text(source).ok()
}

fn parse_integer(raw: &str) -> Option<Value> {
    let cleaned = raw.replace('_', "").to_ascii_lowercase();
    let parsed = if let Some(hex) = cleaned.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = cleaned.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        cleaned.parse::<i64>().ok()
    };
    parsed.map(|n| Value::Number(n.into()))
}

fn parse_float(raw: &str) -> Option<Value> {
    let cleaned = raw.replace('_', "");
    // Imaginary literals have no JSON counterpart
    if cleaned.ends_with('j') || cleaned.ends_with('J') {
        return None;
    }
    let parsed: f64 = cleaned.parse().ok()?;
    Number::from_f64(parsed).map(Value::Number)
}

fn negate(n: &Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return i.checked_neg().map(|v| Value::Number(v.into()));
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(-f))
        .map(Value::Number)
}

fn parse_string(node: Node<'_>, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let mut cursor = node.walk();
    if node
        .named_children(&mut cursor)
        .any(|child| child.kind() == "interpolation")
    {
        return None;
    }

    let raw = text(node, source)?;
    let quote_start = raw.find(|c: char| c == '\'' || c == '"')?;
    let prefix = raw[..quote_start].to_ascii_lowercase();
    if prefix.contains('b') {
        return None;
    }

    let body = &raw[quote_start..];
    let delimiter = if body.starts_with("\"\"\"") || body.starts_with("'''") {
        &body[..3]
    } else {
        &body[..1]
    };
    let inner = body
        .strip_prefix(delimiter)?
        .strip_suffix(delimiter)?;

    let inner = if prefix.contains('f') {
        inner.replace("{{", "{").replace("}}", "}")
    } else {
        inner.to_string()
    };

    if prefix.contains('r') {
        Some(inner)
    } else {
        unescape(&inner)
    }
}

/// Decodes Python escape sequences. Named escapes (`\N{...}`) and invalid
/// code points make the literal opaque.
fn unescape(inner: &str) -> Option<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            // Line continuation inside the literal
            Some('\n') => {}
            Some(digit @ '0'..='7') => {
                let mut code = digit.to_digit(8)?;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            code = code * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code)?);
            }
            Some('x') => out.push(hex_escape(&mut chars, 2)?),
            Some('u') => out.push(hex_escape(&mut chars, 4)?),
            Some('U') => out.push(hex_escape(&mut chars, 8)?),
            Some('N') => return None,
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Some(out)
}

fn hex_escape<I>(chars: &mut I, digits: usize) -> Option<char>
where
    I: Iterator<Item = char>,
{
    let mut code = 0u32;
    for _ in 0..digits {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(code)
}
