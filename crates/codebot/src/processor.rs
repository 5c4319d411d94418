//! Language-specific source preprocessing applied before dispatch.
//!
//! The remote executors compile a single file whose name is chosen by the
//! backend, so some languages need small deterministic fixes before the
//! snippet is submitted. Java is the one with a mandatory fix today: a
//! top-level `public class X` would force a filename the backend does not
//! use, so the `public` modifier is stripped from that declaration.
//!
//! Pure and synchronous: no I/O, no shared state.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static JAVA_PUBLIC_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\Apublic\s+(class\b)").unwrap());

/// Why a snippet could not be prepared for submission.
///
/// These are user-level failures: the pipeline surfaces them as a compile
/// result with exit code 1 rather than dropping the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("no language tag on the code block")]
    MissingLanguage,
}

/// Normalize a snippet for the given language tag.
///
/// Trims leading and trailing blank lines, then applies the per-language
/// adaptation. Languages without an adaptation pass through unchanged
/// (modulo the outer trim).
pub fn process(text: &str, lang: &str) -> Result<String, ProcessError> {
    if lang.trim().is_empty() {
        return Err(ProcessError::MissingLanguage);
    }

    let trimmed = trim_blank_lines(text);
    let fixed = match lang.trim().to_ascii_lowercase().as_str() {
        "java" => JAVA_PUBLIC_CLASS.replace(&trimmed, "$1").into_owned(),
        _ => trimmed,
    };
    Ok(fixed)
}

/// Drop fully blank leading/trailing lines, keeping interior lines and the
/// indentation of the first code line intact.
fn trim_blank_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}
