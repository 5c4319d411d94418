//! Turning an execution result into channel-sized delivery parts.
//!
//! Rendering happens exactly once, at cache-write time. The cache stores
//! the final parts so a replay reaction never has to re-render (or worse,
//! re-execute) anything.
//!
//! Chunking splits on line boundaries so no part exceeds the channel limit.
//! A single line longer than the limit cannot be split without corrupting
//! it, so it is emitted as one oversize part; the deliverer ships those as
//! file attachments instead of inline messages.

use crate::backend::ExecutionResult;

/// Default channel message length limit (Discord's classic 2000).
pub const DEFAULT_CHAR_LIMIT: usize = 2000;

/// Characters consumed by wrapping a part in an untagged code fence
/// (```` ```\n ```` before and `\n```` ``` ````` after).
pub const CODE_FENCE_OVERHEAD: usize = 8;

/// Render a result to one human-readable text.
///
/// Non-empty fields appear in the order stdout, stderr, compile error,
/// followed by the exit code when non-zero. A clean run with only stdout
/// renders as the stdout text alone.
pub fn render(result: &ExecutionResult) -> String {
    let mut out = String::new();
    for section in [&result.stdout, &result.stderr, &result.compile_error] {
        if let Some(text) = section {
            if !text.is_empty() {
                out.push_str(text);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }
    if result.exit_code != 0 {
        out.push_str(&format!("exit code {}\n", result.exit_code));
    }
    if out.is_empty() {
        out.push_str("(no output)\n");
    }
    out
}

/// Split rendered text into parts of at most `limit` characters, breaking
/// only at line boundaries. Lines longer than `limit` become single
/// oversize parts.
pub fn chunk(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if line.len() > limit {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            parts.push(line.to_string());
            continue;
        }
        if current.len() + line.len() > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Render and chunk in one go, the way the compile path consumes it.
pub fn render_parts(result: &ExecutionResult, limit: usize) -> Vec<String> {
    chunk(&render(result), limit)
}
