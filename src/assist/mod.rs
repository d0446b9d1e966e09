//! Assistant flows beyond error detection: chat, snippet generation and
//! whole-chunk review. Each sends one fixed template and reads back JSON.

mod chat;
mod chunk;
mod generate;

pub use chat::chat;
pub use chunk::{analyze_long_code_chunk, ErrorLocation};
pub use generate::generate_code_snippet;

/// Per-file budget when project files are rendered into a prompt
const MAX_CONTEXT_CHARS_PER_FILE: usize = 8_000;
/// Budget for a single code chunk or free-form context block
const MAX_CHUNK_CHARS: usize = 60_000;
