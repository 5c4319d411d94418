//! Fenced code-block parsing for chat message bodies.
//!
//! A message body is a sequence of plain text spans and triple-backtick
//! fenced code spans. The opening fence may carry a language tag on the
//! same line:
//!
//! ```text
//! some text ```java
//! class A {}
//! ``` more text
//! ```
//!
//! Parsing is lossless: [`MessageBody::to_string`] reproduces a well-formed
//! input verbatim, which keeps edited-message handling honest (we re-parse
//! whatever the platform hands us and never normalize user text).

use std::fmt;

const FENCE: &str = "```";

/// One extracted fenced span: language tag plus raw code text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub lang: String,
    pub text: String,
}

/// A single span of a parsed message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart {
    /// Plain text between fences, kept verbatim.
    Text(String),
    /// A fenced code span. `lang` is the raw first line after the opening
    /// fence (may be empty); `text` is everything between that line's
    /// newline and the closing fence.
    Code { lang: String, text: String },
}

impl MessagePart {
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code { .. })
    }
}

/// A chat message body parsed into interleaved text and code spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    parts: Vec<MessagePart>,
}

impl MessageBody {
    /// Parse a raw message body.
    ///
    /// An unterminated fence, or a fenced span without a newline after the
    /// opening line, is not a code block; such spans stay in the text
    /// stream untouched.
    pub fn parse(raw: &str) -> Self {
        let mut parts = Vec::new();
        let mut rest = raw;

        while let Some(open) = rest.find(FENCE) {
            let after_open = &rest[open + FENCE.len()..];

            let Some((lang, body_and_rest)) = after_open.split_once('\n') else {
                break;
            };
            let Some(close) = body_and_rest.find(FENCE) else {
                break;
            };

            if open > 0 {
                parts.push(MessagePart::Text(rest[..open].to_string()));
            }
            parts.push(MessagePart::Code {
                lang: lang.to_string(),
                text: body_and_rest[..close].to_string(),
            });
            rest = &body_and_rest[close + FENCE.len()..];
        }

        if !rest.is_empty() {
            parts.push(MessagePart::Text(rest.to_string()));
        }
        Self { parts }
    }

    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }

    /// The first fenced span, if any. Later blocks in the same message are
    /// ignored by the pipeline (multi-block compilation is a non-goal).
    pub fn first_code_block(&self) -> Option<CodeBlock> {
        self.parts.iter().find_map(|p| match p {
            MessagePart::Code { lang, text } => Some(CodeBlock {
                lang: lang.trim().to_string(),
                text: text.clone(),
            }),
            MessagePart::Text(_) => None,
        })
    }
}

impl fmt::Display for MessageBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                MessagePart::Text(t) => write!(f, "{t}")?,
                MessagePart::Code { lang, text } => write!(f, "{FENCE}{lang}\n{text}{FENCE}")?,
            }
        }
        Ok(())
    }
}

/// Wrap `text` in a plain (untagged) code fence for inline delivery.
pub fn to_code_fence(text: &str) -> String {
    format!("{FENCE}\n{text}\n{FENCE}")
}
