//! The fixed rule set, evaluated over a finished scope analysis

use super::scope::{BindingKind, ScopeAnalysis};
use super::{
    DiagnosticEntry, Environments, LintConfig, Severity, RULE_NO_CONSOLE, RULE_NO_DEBUGGER,
    RULE_NO_UNDEF, RULE_NO_UNUSED_VARS,
};
use std::collections::{HashMap, HashSet};

/// Globals every script can see
const BUILTIN_GLOBALS: &[&str] = &[
    "Array", "Boolean", "Date", "decodeURI", "decodeURIComponent", "encodeURI",
    "encodeURIComponent", "Error", "escape", "eval", "EvalError", "Function", "Infinity",
    "isFinite", "isNaN", "JSON", "Math", "NaN", "Number", "Object", "parseFloat", "parseInt",
    "RangeError", "ReferenceError", "RegExp", "String", "SyntaxError", "TypeError", "undefined",
    "unescape", "URIError",
];

const ES6_GLOBALS: &[&str] = &[
    "ArrayBuffer", "BigInt", "BigInt64Array", "BigUint64Array", "DataView", "Float32Array",
    "Float64Array", "globalThis", "Int16Array", "Int32Array", "Int8Array", "Intl", "Map",
    "Promise", "Proxy", "Reflect", "Set", "SharedArrayBuffer", "Atomics", "Symbol",
    "Uint16Array", "Uint32Array", "Uint8Array", "Uint8ClampedArray", "WeakMap", "WeakSet",
    "WeakRef", "FinalizationRegistry", "AggregateError",
];

const BROWSER_GLOBALS: &[&str] = &[
    "AbortController", "addEventListener", "alert", "atob", "Blob", "btoa",
    "cancelAnimationFrame", "clearInterval", "clearTimeout", "confirm", "console", "crypto",
    "CustomEvent", "document", "DOMParser", "Element", "Event", "EventTarget", "fetch", "File",
    "FileReader", "FormData", "getComputedStyle", "Headers", "history", "HTMLElement",
    "Image", "IntersectionObserver", "localStorage", "location", "matchMedia",
    "MutationObserver", "navigator", "Node", "performance", "postMessage", "prompt",
    "queueMicrotask", "removeEventListener", "Request", "requestAnimationFrame",
    "ResizeObserver", "Response", "screen", "self", "sessionStorage", "setInterval",
    "setTimeout", "structuredClone", "TextDecoder", "TextEncoder", "URL", "URLSearchParams",
    "WebSocket", "window", "Worker", "XMLHttpRequest",
];

const NODE_GLOBALS: &[&str] = &[
    "__dirname", "__filename", "Buffer", "clearImmediate", "clearInterval", "clearTimeout",
    "console", "exports", "global", "module", "process", "queueMicrotask", "require",
    "setImmediate", "setInterval", "setTimeout", "structuredClone", "TextDecoder",
    "TextEncoder", "URL", "URLSearchParams", "fetch",
];

/// The set of global names visible under the given environments
pub(crate) fn globals_for(env: &Environments) -> HashSet<&'static str> {
    let mut globals: HashSet<&'static str> = BUILTIN_GLOBALS.iter().copied().collect();
    if env.es6 {
        globals.extend(ES6_GLOBALS.iter().copied());
    }
    if env.browser {
        globals.extend(BROWSER_GLOBALS.iter().copied());
    }
    if env.node {
        globals.extend(NODE_GLOBALS.iter().copied());
    }
    globals
}

fn diagnostic(
    line: usize,
    column: usize,
    message: String,
    rule: &str,
    severity: Severity,
) -> DiagnosticEntry {
    DiagnosticEntry {
        line,
        column,
        message,
        rule_id: Some(rule.to_string()),
        severity,
    }
}

/// Evaluate every enabled rule. Output is sorted by position; findings at
/// the same position keep rule order.
pub(crate) fn evaluate(analysis: &ScopeAnalysis, config: &LintConfig) -> Vec<DiagnosticEntry> {
    let mut out = Vec::new();

    let severity = config.severity(RULE_NO_DEBUGGER);
    if severity != Severity::Off {
        for (line, column) in &analysis.debugger_statements {
            out.push(diagnostic(
                *line,
                *column,
                "Unexpected 'debugger' statement.".to_string(),
                RULE_NO_DEBUGGER,
                severity,
            ));
        }
    }

    let severity = config.severity(RULE_NO_CONSOLE);
    if severity != Severity::Off {
        for (line, column) in &analysis.console_uses {
            out.push(diagnostic(
                *line,
                *column,
                "Unexpected console statement.".to_string(),
                RULE_NO_CONSOLE,
                severity,
            ));
        }
    }

    let severity = config.severity(RULE_NO_UNDEF);
    if severity != Severity::Off {
        let globals = globals_for(&config.env);
        for reference in &analysis.unresolved {
            if reference.in_typeof || globals.contains(reference.name.as_str()) {
                continue;
            }
            out.push(diagnostic(
                reference.line,
                reference.column,
                format!("'{}' is not defined.", reference.name),
                RULE_NO_UNDEF,
                severity,
            ));
        }
    }

    let severity = config.severity(RULE_NO_UNUSED_VARS);
    if severity != Severity::Off {
        out.extend(unused_vars(analysis, severity));
    }

    out.sort_by_key(|d| (d.line, d.column));
    out
}

fn unused_vars(analysis: &ScopeAnalysis, severity: Severity) -> Vec<DiagnosticEntry> {
    // "after-used": a plain identifier parameter is reported only when no
    // later parameter is used. Destructured and rest parameters always are.
    let mut last_used_param: HashMap<usize, usize> = HashMap::new();
    for binding in &analysis.bindings {
        if let (BindingKind::Parameter, Some(index)) = (binding.kind, binding.param_index) {
            if binding.reads > 0 {
                let entry = last_used_param.entry(binding.scope).or_insert(index);
                *entry = (*entry).max(index);
            }
        }
    }

    analysis
        .bindings
        .iter()
        .filter(|b| b.reads == 0 && !b.exported)
        .filter(|b| {
            !matches!(
                b.kind,
                BindingKind::CatchParam | BindingKind::ExpressionName | BindingKind::ImplicitArguments
            )
        })
        .filter(|b| match (b.kind, b.param_index) {
            (BindingKind::Parameter, Some(index)) if b.simple_param => last_used_param
                .get(&b.scope)
                .map(|last| index > *last)
                .unwrap_or(true),
            _ => true,
        })
        .map(|b| {
            let assigned = b.kind == BindingKind::Variable && (b.initialized || b.writes > 0);
            let message = if assigned {
                format!("'{}' is assigned a value but never used.", b.name)
            } else {
                format!("'{}' is defined but never used.", b.name)
            };
            diagnostic(b.line, b.column, message, RULE_NO_UNUSED_VARS, severity)
        })
        .collect()
}
