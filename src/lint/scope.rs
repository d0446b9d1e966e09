//! Scope analysis over a tree-sitter JavaScript tree
//!
//! Runs in two passes so hoisted declarations (`var`, function declarations)
//! are visible to references that appear before them: the first pass builds
//! the scope tree and declares every binding, the second resolves every
//! identifier reference against it.

use super::parser::{node_text, position};
use std::collections::HashMap;
use tree_sitter::{Node, Tree};

pub(crate) type ScopeId = usize;
pub(crate) type BindingId = usize;

const FUNCTION_KINDS: [&str; 7] = [
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

fn is_function_kind(kind: &str) -> bool {
    FUNCTION_KINDS.contains(&kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Program,
    Function,
    Block,
}

#[derive(Debug)]
pub(crate) struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    names: HashMap<String, BindingId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind {
    Variable,
    Function,
    Class,
    Parameter,
    Import,
    CatchParam,
    /// Name of a function or class expression, visible only inside it
    ExpressionName,
    /// The implicit `arguments` object of non-arrow functions
    ImplicitArguments,
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub line: usize,
    pub column: usize,
    pub reads: usize,
    pub writes: usize,
    pub initialized: bool,
    pub exported: bool,
    /// Position of the formal parameter this binding came from
    pub param_index: Option<usize>,
    /// The parameter is a plain identifier, not a pattern or rest element
    pub simple_param: bool,
    pub scope: ScopeId,
    /// Scope created by the declared function; reads from inside it are
    /// recursion, not uses
    pub own_scope: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnresolvedRef {
    pub name: String,
    pub line: usize,
    pub column: usize,
    pub in_typeof: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ScopeAnalysis {
    pub scopes: Vec<Scope>,
    pub bindings: Vec<Binding>,
    pub unresolved: Vec<UnresolvedRef>,
    /// Member accesses on an unshadowed `console`
    pub console_uses: Vec<(usize, usize)>,
    pub debugger_statements: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternMode {
    /// Identifiers in the pattern are being declared
    Declaration,
    /// Identifiers in the pattern are assignment targets
    Assignment,
}

#[derive(Debug, Clone, Copy, Default)]
struct DeclareFlags {
    initialized: bool,
    exported: bool,
    param_index: Option<usize>,
    simple_param: bool,
}

pub(crate) fn analyze(tree: &Tree, code: &str) -> ScopeAnalysis {
    let mut analyzer = Analyzer {
        code,
        result: ScopeAnalysis::default(),
        scope_of_node: HashMap::new(),
        self_assigned: None,
    };
    let root = tree.root_node();
    let program = analyzer.enter(root, None, ScopeKind::Program);
    analyzer.declare(root, program);
    analyzer.resolve(root, program);
    analyzer.result
}

struct Analyzer<'a> {
    code: &'a str,
    result: ScopeAnalysis,
    scope_of_node: HashMap<usize, ScopeId>,
    /// Target of the assignment whose right-hand side is being resolved,
    /// when the assignment's own value is discarded
    self_assigned: Option<BindingId>,
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    children
}

fn is_exported(declaration: Node) -> bool {
    declaration
        .parent()
        .map(|parent| parent.kind() == "export_statement")
        .unwrap_or(false)
}

/// The expression's value is discarded by an enclosing expression statement
fn is_statement_value(node: Node) -> bool {
    node.parent()
        .map(|parent| parent.kind() == "expression_statement")
        .unwrap_or(false)
}

fn field_id(node: Node, field: &str) -> Option<usize> {
    node.child_by_field_name(field).map(|n| n.id())
}

impl<'a> Analyzer<'a> {
    // ───────────────────────────── scopes ─────────────────────────────

    fn enter(&mut self, node: Node, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        let id = self.result.scopes.len();
        self.result.scopes.push(Scope {
            parent,
            kind,
            names: HashMap::new(),
        });
        self.scope_of_node.insert(node.id(), id);
        id
    }

    /// Nearest enclosing function or program scope (`var` target)
    fn function_scope(&self, mut scope: ScopeId) -> ScopeId {
        loop {
            let current = &self.result.scopes[scope];
            match (current.kind, current.parent) {
                (ScopeKind::Block, Some(parent)) => scope = parent,
                _ => return scope,
            }
        }
    }

    fn lookup(&self, mut scope: ScopeId, name: &str) -> Option<BindingId> {
        loop {
            let current = &self.result.scopes[scope];
            if let Some(id) = current.names.get(name) {
                return Some(*id);
            }
            scope = current.parent?;
        }
    }

    fn is_within(&self, mut scope: ScopeId, ancestor: ScopeId) -> bool {
        loop {
            if scope == ancestor {
                return true;
            }
            match self.result.scopes[scope].parent {
                Some(parent) => scope = parent,
                None => return false,
            }
        }
    }

    fn bind(&mut self, scope: ScopeId, node: Node, kind: BindingKind, flags: DeclareFlags) -> BindingId {
        let name = node_text(node, self.code).to_string();
        if let Some(existing) = self.result.scopes[scope].names.get(&name).copied() {
            self.result.bindings[existing].initialized |= flags.initialized;
            return existing;
        }
        let (line, column) = position(self.code, node);
        let id = self.result.bindings.len();
        self.result.bindings.push(Binding {
            name: name.clone(),
            kind,
            line,
            column,
            reads: 0,
            writes: 0,
            initialized: flags.initialized,
            exported: flags.exported,
            param_index: flags.param_index,
            simple_param: flags.simple_param,
            scope,
            own_scope: None,
        });
        self.result.scopes[scope].names.insert(name, id);
        id
    }

    fn bind_implicit_arguments(&mut self, scope: ScopeId) {
        let id = self.result.bindings.len();
        self.result.bindings.push(Binding {
            name: "arguments".to_string(),
            kind: BindingKind::ImplicitArguments,
            line: 0,
            column: 0,
            reads: 0,
            writes: 0,
            initialized: true,
            exported: false,
            param_index: None,
            simple_param: false,
            scope,
            own_scope: None,
        });
        self.result.scopes[scope]
            .names
            .insert("arguments".to_string(), id);
    }

    // ──────────────────────── pass 1: declarations ────────────────────────

    fn declare(&mut self, node: Node, scope: ScopeId) {
        let kind = node.kind();
        let mut inner = scope;

        match kind {
            "function_declaration" | "generator_function_declaration" => {
                let own = self.enter(node, Some(scope), ScopeKind::Function);
                if let Some(name) = node.child_by_field_name("name") {
                    let flags = DeclareFlags {
                        exported: is_exported(node),
                        ..DeclareFlags::default()
                    };
                    let id = self.bind(scope, name, BindingKind::Function, flags);
                    self.result.bindings[id].own_scope = Some(own);
                }
                self.declare_parameters(node, own, true);
                inner = own;
            }
            "function_expression" | "function" | "generator_function" | "method_definition" => {
                let own = self.enter(node, Some(scope), ScopeKind::Function);
                if kind != "method_definition" {
                    if let Some(name) = node.child_by_field_name("name") {
                        self.bind(own, name, BindingKind::ExpressionName, DeclareFlags::default());
                    }
                }
                self.declare_parameters(node, own, true);
                inner = own;
            }
            "arrow_function" => {
                let own = self.enter(node, Some(scope), ScopeKind::Function);
                self.declare_parameters(node, own, false);
                inner = own;
            }
            "class_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let flags = DeclareFlags {
                        exported: is_exported(node),
                        ..DeclareFlags::default()
                    };
                    self.bind(scope, name, BindingKind::Class, flags);
                }
            }
            "class" => {
                let own = self.enter(node, Some(scope), ScopeKind::Block);
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(own, name, BindingKind::ExpressionName, DeclareFlags::default());
                }
                inner = own;
            }
            "variable_declaration" | "lexical_declaration" => {
                let target = if kind == "variable_declaration" {
                    self.function_scope(scope)
                } else {
                    scope
                };
                let exported = is_exported(node);
                for declarator in named_children(node) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    if let Some(name) = declarator.child_by_field_name("name") {
                        let flags = DeclareFlags {
                            initialized: declarator.child_by_field_name("value").is_some(),
                            exported,
                            ..DeclareFlags::default()
                        };
                        self.declare_pattern(name, target, BindingKind::Variable, flags);
                    }
                }
            }
            "import_statement" => {
                self.declare_imports(node, scope);
                return;
            }
            "catch_clause" => {
                let own = self.enter(node, Some(scope), ScopeKind::Block);
                if let Some(param) = node.child_by_field_name("parameter") {
                    self.declare_pattern(param, own, BindingKind::CatchParam, DeclareFlags::default());
                }
                inner = own;
            }
            "statement_block" => {
                let is_function_body = node
                    .parent()
                    .map(|parent| is_function_kind(parent.kind()))
                    .unwrap_or(false);
                if !is_function_body {
                    inner = self.enter(node, Some(scope), ScopeKind::Block);
                }
            }
            "for_statement" | "switch_body" | "class_body" => {
                inner = self.enter(node, Some(scope), ScopeKind::Block);
            }
            "for_in_statement" => {
                let own = self.enter(node, Some(scope), ScopeKind::Block);
                let declaration_kind = node
                    .child_by_field_name("kind")
                    .map(|k| node_text(k, self.code));
                if let (Some(decl), Some(left)) = (declaration_kind, node.child_by_field_name("left")) {
                    let target = if decl == "var" {
                        self.function_scope(own)
                    } else {
                        own
                    };
                    let flags = DeclareFlags {
                        initialized: true,
                        ..DeclareFlags::default()
                    };
                    self.declare_pattern(left, target, BindingKind::Variable, flags);
                }
                inner = own;
            }
            _ => {}
        }

        for child in named_children(node) {
            self.declare(child, inner);
        }
    }

    fn declare_parameters(&mut self, function: Node, own: ScopeId, has_arguments: bool) {
        if has_arguments {
            self.bind_implicit_arguments(own);
        }
        if let Some(single) = function.child_by_field_name("parameter") {
            self.declare_parameter(single, 0, own);
        }
        if let Some(params) = function.child_by_field_name("parameters") {
            for (index, param) in named_children(params).into_iter().enumerate() {
                self.declare_parameter(param, index, own);
            }
        }
    }

    fn declare_parameter(&mut self, param: Node, index: usize, own: ScopeId) {
        let flags = DeclareFlags {
            param_index: Some(index),
            simple_param: param.kind() == "identifier",
            ..DeclareFlags::default()
        };
        self.declare_pattern(param, own, BindingKind::Parameter, flags);
    }

    fn declare_pattern(&mut self, node: Node, scope: ScopeId, kind: BindingKind, flags: DeclareFlags) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                self.bind(scope, node, kind, flags);
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.declare_pattern(left, scope, kind, flags);
                }
            }
            "pair_pattern" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.declare_pattern(value, scope, kind, flags);
                }
            }
            "rest_pattern" | "object_pattern" | "array_pattern" => {
                for child in named_children(node) {
                    self.declare_pattern(child, scope, kind, flags);
                }
            }
            _ => {}
        }
    }

    fn declare_imports(&mut self, import: Node, scope: ScopeId) {
        let mut cursor = import.walk();
        let Some(clause) = import
            .named_children(&mut cursor)
            .find(|child| child.kind() == "import_clause")
        else {
            return;
        };

        for part in named_children(clause) {
            match part.kind() {
                "identifier" => {
                    self.bind(scope, part, BindingKind::Import, DeclareFlags::default());
                }
                "namespace_import" => {
                    for name in named_children(part) {
                        if name.kind() == "identifier" {
                            self.bind(scope, name, BindingKind::Import, DeclareFlags::default());
                        }
                    }
                }
                "named_imports" => {
                    for specifier in named_children(part) {
                        if specifier.kind() != "import_specifier" {
                            continue;
                        }
                        let local = specifier
                            .child_by_field_name("alias")
                            .or_else(|| specifier.child_by_field_name("name"));
                        if let Some(local) = local.filter(|n| n.kind() == "identifier") {
                            self.bind(scope, local, BindingKind::Import, DeclareFlags::default());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // ──────────────────────── pass 2: references ────────────────────────

    fn resolve(&mut self, node: Node, scope: ScopeId) {
        let scope = self.scope_of_node.get(&node.id()).copied().unwrap_or(scope);
        let kind = node.kind();

        match kind {
            "identifier" | "shorthand_property_identifier" => {
                self.reference(node, scope, Access::Read, false);
            }
            "debugger_statement" => {
                let pos = position(self.code, node);
                self.result.debugger_statements.push(pos);
            }
            "import_statement" => {}
            _ if is_function_kind(kind) => {
                // A function may run later, so reads inside it always count
                let outer = self.self_assigned.take();
                let name = field_id(node, "name");
                let single = field_id(node, "parameter");
                let params = node.child_by_field_name("parameters");
                for child in named_children(node) {
                    if Some(child.id()) == name || Some(child.id()) == single {
                        // Computed method names are ordinary expressions
                        if child.kind() == "computed_property_name" {
                            self.resolve_children(child, scope);
                        }
                        continue;
                    }
                    if params.map(|p| p.id()) == Some(child.id()) {
                        for param in named_children(child) {
                            self.resolve_pattern(param, scope, PatternMode::Declaration);
                        }
                        continue;
                    }
                    self.resolve(child, scope);
                }
                self.self_assigned = outer;
            }
            "class_declaration" | "class" => {
                let name = field_id(node, "name");
                for child in named_children(node) {
                    if Some(child.id()) != name {
                        self.resolve(child, scope);
                    }
                }
            }
            "variable_declarator" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.resolve_pattern(name, scope, PatternMode::Declaration);
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.resolve(value, scope);
                }
            }
            "export_statement" => {
                // Re-exports name another module's bindings
                if node.child_by_field_name("source").is_none() {
                    self.resolve_children(node, scope);
                }
            }
            "export_specifier" => {
                if let Some(name) = node.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        self.reference(name, scope, Access::Read, false);
                    }
                }
            }
            "catch_clause" => {
                if let Some(param) = node.child_by_field_name("parameter") {
                    self.resolve_pattern(param, scope, PatternMode::Declaration);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.resolve(body, scope);
                }
            }
            "for_in_statement" => {
                let mode = if node.child_by_field_name("kind").is_some() {
                    PatternMode::Declaration
                } else {
                    PatternMode::Assignment
                };
                let left = field_id(node, "left");
                for child in named_children(node) {
                    if Some(child.id()) == left {
                        self.resolve_pattern(child, scope, mode);
                    } else {
                        self.resolve(child, scope);
                    }
                }
            }
            "assignment_expression" => {
                let left = node.child_by_field_name("left");
                if let Some(left) = left {
                    self.resolve_pattern(left, scope, PatternMode::Assignment);
                }
                // `x = x + 1` as a statement reads `x` only to overwrite it
                let target = left
                    .filter(|l| l.kind() == "identifier" && is_statement_value(node))
                    .and_then(|l| self.lookup(scope, node_text(l, self.code)));
                if let Some(right) = node.child_by_field_name("right") {
                    let outer = self.self_assigned;
                    if target.is_some() {
                        self.self_assigned = target;
                    }
                    self.resolve(right, scope);
                    self.self_assigned = outer;
                }
            }
            "augmented_assignment_expression" | "update_expression" => {
                let target_field = if kind == "update_expression" {
                    "argument"
                } else {
                    "left"
                };
                let target = field_id(node, target_field);
                let access = if is_statement_value(node) {
                    Access::Write
                } else {
                    Access::ReadWrite
                };
                for child in named_children(node) {
                    if Some(child.id()) == target && child.kind() == "identifier" {
                        self.reference(child, scope, access, false);
                    } else {
                        self.resolve(child, scope);
                    }
                }
            }
            "unary_expression" => {
                let is_typeof = node
                    .child_by_field_name("operator")
                    .map(|op| node_text(op, self.code) == "typeof")
                    .unwrap_or(false);
                match node.child_by_field_name("argument") {
                    Some(arg) if is_typeof && arg.kind() == "identifier" => {
                        self.reference(arg, scope, Access::Read, true);
                    }
                    _ => self.resolve_children(node, scope),
                }
            }
            "member_expression" | "subscript_expression" => {
                if let Some(object) = node.child_by_field_name("object") {
                    if object.kind() == "identifier"
                        && node_text(object, self.code) == "console"
                        && self.lookup(scope, "console").is_none()
                    {
                        let pos = position(self.code, node);
                        self.result.console_uses.push(pos);
                    }
                }
                if kind == "member_expression" {
                    // The property name is not a reference
                    if let Some(object) = node.child_by_field_name("object") {
                        self.resolve(object, scope);
                    }
                } else {
                    self.resolve_children(node, scope);
                }
            }
            "jsx_opening_element" | "jsx_self_closing_element" => {
                let name = node.child_by_field_name("name");
                for child in named_children(node) {
                    if Some(child.id()) == name.map(|n| n.id()) {
                        self.resolve_jsx_name(child, scope);
                    } else {
                        self.resolve(child, scope);
                    }
                }
            }
            "jsx_closing_element" => {}
            _ => self.resolve_children(node, scope),
        }
    }

    fn resolve_children(&mut self, node: Node, scope: ScopeId) {
        for child in named_children(node) {
            self.resolve(child, scope);
        }
    }

    fn resolve_jsx_name(&mut self, name: Node, scope: ScopeId) {
        match name.kind() {
            "identifier" => {
                // Lowercase tags are intrinsic elements, not variables
                let is_component = node_text(name, self.code)
                    .chars()
                    .next()
                    .map(|c| c.is_uppercase() || c == '_' || c == '$')
                    .unwrap_or(false);
                if is_component {
                    self.reference(name, scope, Access::Read, false);
                }
            }
            "member_expression" | "nested_identifier" => {
                if let Some(first) = named_children(name).into_iter().next() {
                    self.resolve_jsx_object(first, scope);
                }
            }
            _ => {}
        }
    }

    fn resolve_jsx_object(&mut self, node: Node, scope: ScopeId) {
        match node.kind() {
            "identifier" => self.reference(node, scope, Access::Read, false),
            "member_expression" | "nested_identifier" => {
                if let Some(first) = named_children(node).into_iter().next() {
                    self.resolve_jsx_object(first, scope);
                }
            }
            _ => {}
        }
    }

    fn resolve_pattern(&mut self, node: Node, scope: ScopeId, mode: PatternMode) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                if mode == PatternMode::Assignment {
                    self.reference(node, scope, Access::Write, false);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.resolve_pattern(left, scope, mode);
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.resolve(right, scope);
                }
            }
            "pair_pattern" => {
                if let Some(key) = node.child_by_field_name("key") {
                    if key.kind() == "computed_property_name" {
                        self.resolve(key, scope);
                    }
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.resolve_pattern(value, scope, mode);
                }
            }
            "rest_pattern" | "object_pattern" | "array_pattern" => {
                for child in named_children(node) {
                    self.resolve_pattern(child, scope, mode);
                }
            }
            _ => self.resolve(node, scope),
        }
    }

    fn reference(&mut self, node: Node, scope: ScopeId, access: Access, in_typeof: bool) {
        let name = node_text(node, self.code);
        match self.lookup(scope, name) {
            Some(id) => {
                let recursive = self.result.bindings[id]
                    .own_scope
                    .map(|own| self.is_within(scope, own))
                    .unwrap_or(false);
                let for_itself = self.self_assigned == Some(id);
                let binding = &mut self.result.bindings[id];
                match access {
                    Access::Read if !recursive && !for_itself => binding.reads += 1,
                    Access::Read => {}
                    Access::Write => binding.writes += 1,
                    Access::ReadWrite => {
                        binding.writes += 1;
                        if !recursive {
                            binding.reads += 1;
                        }
                    }
                }
            }
            None => {
                let (line, column) = position(self.code, node);
                self.result.unresolved.push(UnresolvedRef {
                    name: name.to_string(),
                    line,
                    column,
                    in_typeof,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::parser::parse_module;
    use crate::lint::ParserOptions;

    fn run(code: &str) -> ScopeAnalysis {
        let tree = parse_module(code, &ParserOptions::default()).unwrap();
        analyze(&tree, code)
    }

    fn binding<'a>(analysis: &'a ScopeAnalysis, name: &str) -> &'a Binding {
        analysis
            .bindings
            .iter()
            .find(|b| b.name == name)
            .unwrap_or_else(|| panic!("no binding named {name}"))
    }

    #[test]
    fn test_hoisted_function_is_resolved() {
        let analysis = run("run();\nfunction run() { return 1; }\n");
        assert!(analysis.unresolved.is_empty());
        assert_eq!(binding(&analysis, "run").reads, 1);
    }

    #[test]
    fn test_var_hoists_out_of_blocks() {
        let analysis = run("function f() { if (true) { var x = 1; } return x; }\nf();\n");
        assert!(analysis.unresolved.is_empty());
        assert_eq!(binding(&analysis, "x").reads, 1);
    }

    #[test]
    fn test_let_is_block_scoped() {
        let analysis = run("{ let y = 1; }\nexport default y;\n");
        assert_eq!(analysis.unresolved.len(), 1);
        assert_eq!(analysis.unresolved[0].name, "y");
        assert_eq!(analysis.unresolved[0].line, 2);
    }

    #[test]
    fn test_recursion_is_not_a_use() {
        let analysis = run("function loop(n) { return n && loop(n - 1); }\n");
        let f = binding(&analysis, "loop");
        assert_eq!(f.reads, 0);
        assert_eq!(binding(&analysis, "n").reads, 2);
    }

    #[test]
    fn test_destructuring_declares_each_name() {
        let analysis = run("const { a, b: { c }, ...rest } = obj;\nconst [d = a, , e] = list;\n");
        for name in ["a", "c", "rest", "d", "e"] {
            binding(&analysis, name);
        }
        assert_eq!(binding(&analysis, "a").reads, 1);
        let unresolved: Vec<_> = analysis.unresolved.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(unresolved, vec!["obj", "list"]);
    }

    #[test]
    fn test_assignment_counts_as_write() {
        let analysis = run("let count;\ncount = 2;\ncount += 1;\n");
        let count = binding(&analysis, "count");
        assert_eq!(count.writes, 2);
        assert_eq!(count.reads, 0);
    }

    #[test]
    fn test_update_inside_expression_is_a_read() {
        let analysis = run("let i = 0;\nexport const next = () => i++;\n");
        assert_eq!(binding(&analysis, "i").reads, 1);
    }

    #[test]
    fn test_typeof_marks_reference() {
        let analysis = run("if (typeof window2 === 'undefined') {}\n");
        assert_eq!(analysis.unresolved.len(), 1);
        assert!(analysis.unresolved[0].in_typeof);
    }

    #[test]
    fn test_console_use_recorded_unless_shadowed() {
        let analysis = run("console.log(1);\nfunction f(console) { console.log(2); }\nf();\n");
        assert_eq!(analysis.console_uses, vec![(1, 1)]);
    }

    #[test]
    fn test_jsx_components_are_references() {
        let analysis = run("import Button from './Button';\nexport const App = () => <div><Button label={title} /></div>;\n");
        assert_eq!(binding(&analysis, "Button").reads, 1);
        let unresolved: Vec<_> = analysis.unresolved.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(unresolved, vec!["title"]);
    }

    #[test]
    fn test_property_names_are_not_references() {
        let analysis = run("const o = { key: 1 };\nexport const v = o.key;\n");
        assert!(analysis.unresolved.is_empty());
    }

    #[test]
    fn test_catch_parameter_is_scoped_to_clause() {
        let analysis = run("try { run(); } catch (err) { report(err); }\n");
        let names: Vec<_> = analysis.unresolved.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["run", "report"]);
        assert_eq!(binding(&analysis, "err").kind, BindingKind::CatchParam);
    }

    #[test]
    fn test_exported_bindings_are_flagged() {
        let analysis = run("export function a() {}\nexport const b = 1;\nfunction c() {}\n");
        assert!(binding(&analysis, "a").exported);
        assert!(binding(&analysis, "b").exported);
        assert!(!binding(&analysis, "c").exported);
    }

    #[test]
    fn test_export_specifier_reads_local() {
        let analysis = run("const local = 1;\nexport { local as renamed };\n");
        assert_eq!(binding(&analysis, "local").reads, 1);
        assert!(analysis.unresolved.is_empty());
    }

    #[test]
    fn test_arguments_is_implicit_in_functions() {
        let analysis = run("export function f() { return arguments.length; }\n");
        assert!(analysis.unresolved.is_empty());
    }

    #[test]
    fn test_bracket_access_on_console_is_recorded() {
        let analysis = run("export const v = console['log'];\nexport const w = list[idx];\n");
        assert_eq!(analysis.console_uses, vec![(1, 18)]);
        let unresolved: Vec<_> = analysis.unresolved.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(unresolved, vec!["console", "list", "idx"]);
    }

    #[test]
    fn test_reassigning_from_itself_is_not_a_read() {
        let analysis = run("let x = 0;\nx = x + 1;\n");
        let x = binding(&analysis, "x");
        assert_eq!(x.reads, 0);
        assert_eq!(x.writes, 1);
    }

    #[test]
    fn test_self_assignment_used_as_value_is_a_read() {
        let analysis = run("let x = 0;\nexport const y = (x = x + 1);\nlet z = 0;\nz = () => z;\n");
        assert_eq!(binding(&analysis, "x").reads, 1);
        assert_eq!(binding(&analysis, "z").reads, 1);
    }

    #[test]
    fn test_only_identifier_parameters_are_simple() {
        let analysis = run("export function f({ a }, [b], c = 1, d, ...e) { return d; }\n");
        for name in ["a", "b", "c", "e"] {
            assert!(!binding(&analysis, name).simple_param, "{name}");
        }
        assert!(binding(&analysis, "d").simple_param);
        assert_eq!(binding(&analysis, "a").param_index, Some(0));
        assert_eq!(binding(&analysis, "d").param_index, Some(3));
    }
}
