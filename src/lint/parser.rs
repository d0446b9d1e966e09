//! Tree-sitter parsing and syntax gating for the lint engine

use super::{ExtractionError, ParserOptions, SourceType};
use std::cell::RefCell;
use tree_sitter::{Node, Parser, Tree};

/// Deepest syntax tree the scope analysis will walk. Deeper input is refused
/// rather than risking the worker thread's stack.
pub(crate) const MAX_NESTING_DEPTH: usize = 300;

// Parsers are expensive to create but reusable; rayon workers and the
// blocking pool each keep their own.
thread_local! {
    static JS_PARSER: RefCell<Option<Parser>> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_javascript::LANGUAGE.into())
            .ok()
            .map(|_| p)
    });
}

/// Parse JavaScript (with JSX) and reject trees the configured parser would
/// not accept.
pub(crate) fn parse_module(code: &str, options: &ParserOptions) -> Result<Tree, ExtractionError> {
    let tree = JS_PARSER
        .with(|cell| {
            cell.borrow_mut()
                .as_mut()
                .and_then(|parser| parser.parse(code, None))
        })
        .ok_or_else(|| ExtractionError::Engine("JavaScript parser unavailable".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let offending = first_error_node(root).unwrap_or(root);
        let (line, column) = position(code, offending);
        let message = if offending.is_missing() {
            format!("Missing '{}'", offending.kind())
        } else {
            match token_at(code, offending) {
                Some(token) => format!("Unexpected token {}", token),
                None => "Unexpected token".to_string(),
            }
        };
        return Err(ExtractionError::Parse {
            line,
            column,
            message,
        });
    }

    if !options.jsx {
        if let Some(node) = find_kind(root, |k| k.starts_with("jsx_")) {
            let (line, column) = position(code, node);
            return Err(ExtractionError::Parse {
                line,
                column,
                message: "Unexpected token <".to_string(),
            });
        }
    }

    if options.source_type != SourceType::Module {
        let module_only = find_kind(root, |k| k == "import_statement" || k == "export_statement");
        if let Some(node) = module_only {
            let (line, column) = position(code, node);
            return Err(ExtractionError::Parse {
                line,
                column,
                message: "'import' and 'export' may appear only with 'sourceType: module'"
                    .to_string(),
            });
        }
    }

    if nesting_depth(root) > MAX_NESTING_DEPTH {
        return Err(ExtractionError::Engine(
            "maximum nesting depth exceeded".to_string(),
        ));
    }

    Ok(tree)
}

/// Depth of the deepest node below `root`, measured without recursion
pub(crate) fn nesting_depth(root: Node) -> usize {
    let mut cursor = root.walk();
    let mut depth = 0;
    let mut deepest = 0;
    loop {
        if cursor.goto_first_child() {
            depth += 1;
            deepest = deepest.max(depth);
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return deepest;
            }
            depth -= 1;
        }
    }
}

/// 1-based line and UTF-16 column of a node's start
pub(crate) fn position(code: &str, node: Node) -> (usize, usize) {
    let point = node.start_position();
    let start = node.start_byte().min(code.len());
    let line_start = start.saturating_sub(point.column);
    let prefix = code.get(line_start..start).unwrap_or("");
    (point.row + 1, prefix.encode_utf16().count() + 1)
}

pub(crate) fn node_text<'a>(node: Node, code: &'a str) -> &'a str {
    code.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

fn token_at(code: &str, node: Node) -> Option<String> {
    let text = node_text(node, code).trim();
    let token: String = text
        .chars()
        .take_while(|c| !c.is_whitespace())
        .take(20)
        .collect();
    (!token.is_empty()).then_some(token)
}

fn first_error_node(root: Node) -> Option<Node> {
    find_node(root, |node| node.is_error() || node.is_missing())
}

fn find_kind(root: Node, pred: impl Fn(&str) -> bool) -> Option<Node> {
    find_node(root, |node| pred(node.kind()))
}

/// Pre-order search; returns the first node (in source order) matching `pred`
fn find_node(root: Node, pred: impl Fn(Node) -> bool) -> Option<Node> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if pred(node) {
            return Some(node);
        }

        if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}
