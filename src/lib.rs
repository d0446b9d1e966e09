//! CodePilot library crate
//!
//! Lints JavaScript sources with a built-in engine, asks a text-generation
//! backend to explain and fix what the linter found, and gates automatic
//! analysis behind user consent and a per-file quiet period.

pub mod assist;
pub mod config;
pub mod lint;
pub mod llm;
pub mod pipeline;
pub mod presentation;
pub mod project;
pub mod remediation;
pub mod util;
