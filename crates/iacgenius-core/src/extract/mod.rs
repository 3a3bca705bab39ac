//! Response extraction
//!
//! Pulls the generated code out of a model's free-form reply.
//!
//! Policy:
//! - one fenced block: its body, verbatim
//! - several fenced blocks: the first one. Models often append a usage
//!   snippet after the configuration; when they instead lead with an
//!   unrelated example this picks the wrong block.
//! - no fenced block: the whole trimmed reply, unless it reads as prose
//!
//! Both backtick and tilde fences are recognised. The fence's info string
//! is reported as the detected format but is advisory only.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::types::{GeneratedArtifact, ProviderResponse};

/// Extraction failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("the response was empty")]
    EmptyResponse,

    #[error("no code block found in the response")]
    NoCodeBlockFound,

    #[error("the code block in the response is empty")]
    EmptyCodeBlock,

    /// Usually a reply cut off by the token limit
    #[error("the code block starting on line {line} is never closed")]
    UnterminatedFence { line: usize },
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Sentence-ending punctuation after a word, at end of line or before whitespace
static SENTENCE_END: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\w[.!?](\s|$)").ok());

static DOUBLE_QUOTED: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r#""(?:[^"\\]|\\.)*""#).ok());

/// A code region pulled out of a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub body: String,
    pub language: Option<String>,
}

#[derive(Debug)]
struct Fence {
    marker: char,
    width: usize,
    language: Option<String>,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let width = trimmed.chars().take_while(|c| *c == marker).count();
        if width < 3 {
            return None;
        }
        let info = trimmed[width..].trim();
        // Backtick fences cannot carry backticks in the info string
        if marker == '`' && info.contains('`') {
            return None;
        }
        let language = info
            .split_whitespace()
            .next()
            .map(|tag| tag.trim_start_matches('{').trim_end_matches('}').to_string())
            .filter(|tag| !tag.is_empty());
        Some(Self { marker, width, language })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.len() >= self.width && trimmed.chars().all(|c| c == self.marker)
    }
}

/// Stateless extractor; see the module docs for the block selection policy
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the code region from `raw_text`
    pub fn extract(&self, raw_text: &str) -> ExtractionResult<CodeBlock> {
        let trimmed = raw_text.trim();
        if trimmed.is_empty() {
            return Err(ExtractionError::EmptyResponse);
        }

        let blocks = fenced_blocks(raw_text)?;
        if blocks.len() > 1 {
            debug!(count = blocks.len(), "Response has several code blocks, using the first");
        }

        match blocks.into_iter().next() {
            Some(block) if block.body.trim().is_empty() => Err(ExtractionError::EmptyCodeBlock),
            Some(block) => Ok(block),
            None if looks_like_prose(trimmed) => Err(ExtractionError::NoCodeBlockFound),
            None => {
                debug!("Response has no code fence, using the whole reply");
                Ok(CodeBlock {
                    body: trimmed.to_string(),
                    language: None,
                })
            }
        }
    }

    /// Extract and attach the provenance of `response`
    pub fn extract_artifact(&self, response: &ProviderResponse) -> ExtractionResult<GeneratedArtifact> {
        let block = self.extract(&response.raw_text)?;
        Ok(GeneratedArtifact {
            code_body: block.body,
            detected_format: block.language,
            source_provider: response.provider_name.clone(),
            source_model: response.model_name.clone(),
        })
    }
}

/// All complete fenced blocks, in order
///
/// A fence left open after at least one complete block is ignored; a fence
/// left open before any complete block is an error.
fn fenced_blocks(text: &str) -> ExtractionResult<Vec<CodeBlock>> {
    let mut blocks = Vec::new();
    let mut open: Option<(Fence, usize, Vec<&str>)> = None;

    for (index, line) in text.lines().enumerate() {
        match open.take() {
            Some((fence, _, body)) if fence.closes(line) => {
                blocks.push(CodeBlock {
                    body: body.join("\n"),
                    language: fence.language,
                });
            }
            Some((fence, start, mut body)) => {
                body.push(line);
                open = Some((fence, start, body));
            }
            None => {
                if let Some(fence) = Fence::open(line) {
                    open = Some((fence, index + 1, Vec::new()));
                }
            }
        }
    }

    match open {
        Some((_, line, _)) if blocks.is_empty() => Err(ExtractionError::UnterminatedFence { line }),
        _ => Ok(blocks),
    }
}

/// Whether unfenced text reads as prose rather than code
///
/// Comment lines and double-quoted strings are ignored, so a YAML
/// `description: "A bucket. Versioned."` does not count.
fn looks_like_prose(text: &str) -> bool {
    let (Some(sentence_end), Some(quoted)) = (SENTENCE_END.as_ref(), DOUBLE_QUOTED.as_ref()) else {
        return false;
    };
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("//"))
        .any(|line| sentence_end.is_match(&quoted.replace_all(line, "\"\"")))
}
