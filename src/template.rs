//! Reverse parsing of rendered chat-template text.
//!
//! A [`ChatTemplateSpec`] declares, per role, the delimiter that opens a
//! message and (optionally) the one that closes it. [`ReverseParser`] turns
//! text rendered with such a template back into [`Turn`]s in three stages:
//!
//! 1. **Scan**: locate every delimiter occurrence, ordered by position.
//! 2. **Parse**: pair start and end tokens into message blocks, rejecting
//!    nesting and unclosed blocks.
//! 3. **Compose**: cut the content out of the text and build turns.
//!
//! Prefix-only delimiters (no end delimiter) close at the next start
//! delimiter or at the end of the text.

use crate::ir::{Role, Turn};
use memchr::memmem;
use thiserror::Error;

/// Errors raised while validating a template or reverse parsing text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template itself is not reversible.
    #[error("invalid template '{name}': {reason}")]
    InvalidSpec {
        /// Template name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// No delimiter of the template occurs in the text.
    #[error("no '{template}' delimiters found in text")]
    UnknownDelimiter {
        /// Template name
        template: String,
    },

    /// A block opened while another was still open.
    #[error("nested message block for role '{inner}' at byte {position} inside open '{outer}' block")]
    NestedBlock {
        /// Role of the open block
        outer: String,
        /// Role of the block that tried to open
        inner: String,
        /// Byte offset of the offending delimiter
        position: usize,
    },

    /// A block was never closed, or an end delimiter had nothing to close.
    #[error("unclosed message block: {detail}")]
    UnclosedBlock {
        /// Description of the dangling delimiter
        detail: String,
    },

    /// A block has no content and empty content is not allowed.
    #[error("empty content for role '{role}' at byte {position}")]
    EmptyContent {
        /// Role of the empty block
        role: String,
        /// Byte offset of the block's start delimiter
        position: usize,
    },
}

/// Delimiters of one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimiterSpec {
    /// Role introduced by the delimiter
    pub role: Role,
    /// Text that opens a message of this role
    pub start: String,
    /// Text that closes it, if any
    pub end: Option<String>,
}

impl DelimiterSpec {
    /// Creates a paired delimiter.
    #[must_use]
    pub fn paired(role: Role, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            role,
            start: start.into(),
            end: Some(end.into()),
        }
    }

    /// Creates a prefix-only delimiter.
    #[must_use]
    pub fn prefix(role: Role, start: impl Into<String>) -> Self {
        Self {
            role,
            start: start.into(),
            end: None,
        }
    }
}

/// Contract of a reversible chat template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTemplateSpec {
    name: String,
    delimiters: Vec<DelimiterSpec>,
    allow_nesting: bool,
    normalize_whitespace: bool,
}

impl ChatTemplateSpec {
    /// Creates and validates a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidSpec`] if the name is empty, there are
    /// no delimiters, start delimiters repeat, or one delimiter contains
    /// another.
    pub fn new(
        name: impl Into<String>,
        delimiters: Vec<DelimiterSpec>,
    ) -> Result<Self, TemplateError> {
        let spec = Self {
            name: name.into(),
            delimiters,
            allow_nesting: false,
            normalize_whitespace: true,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// ChatML: `<|im_start|>role\ncontent<|im_end|>`.
    #[must_use]
    pub fn chatml() -> Self {
        let block = |role: Role| {
            let start = format!("<|im_start|>{role}\n");
            DelimiterSpec::paired(role, start, "<|im_end|>")
        };

        Self {
            name: "chatml".to_string(),
            delimiters: vec![
                block(Role::System),
                block(Role::User),
                block(Role::Assistant),
                block(Role::Function),
            ],
            allow_nesting: false,
            normalize_whitespace: true,
        }
    }

    /// Llama-2: `[INST] user [/INST] assistant </s>`.
    #[must_use]
    pub fn llama2() -> Self {
        Self {
            name: "llama2".to_string(),
            delimiters: vec![
                DelimiterSpec::paired(Role::User, "[INST] ", " [/INST]"),
                DelimiterSpec::paired(Role::Assistant, "[/INST] ", " </s>"),
            ],
            allow_nesting: false,
            normalize_whitespace: true,
        }
    }

    /// Permits a block to open while another is open.
    #[must_use]
    pub const fn with_nesting(mut self, allow: bool) -> Self {
        self.allow_nesting = allow;
        self
    }

    /// Enables or disables whitespace normalisation of parsed content.
    #[must_use]
    pub const fn with_whitespace_normalization(mut self, enabled: bool) -> Self {
        self.normalize_whitespace = enabled;
        self
    }

    /// Template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delimiter specifications in declaration order.
    #[must_use]
    pub fn delimiters(&self) -> &[DelimiterSpec] {
        &self.delimiters
    }

    /// Returns the delimiters declared for `role`.
    #[must_use]
    pub fn delimiter_for(&self, role: &Role) -> Option<&DelimiterSpec> {
        self.delimiters.iter().find(|d| &d.role == role)
    }

    /// Checks that the template can be parsed back unambiguously.
    ///
    /// End delimiters may be shared between roles; the role of a block is
    /// decided by its start delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidSpec`] describing the first violation.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let invalid = |reason: String| TemplateError::InvalidSpec {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("template name cannot be empty".to_string()));
        }
        if self.delimiters.is_empty() {
            return Err(invalid("at least one delimiter is required".to_string()));
        }

        let mut all: Vec<&str> = Vec::new();
        for spec in &self.delimiters {
            if spec.start.is_empty() {
                return Err(invalid(format!("empty start delimiter for role '{}'", spec.role)));
            }
            if all.contains(&spec.start.as_str()) {
                return Err(invalid(format!("duplicate start delimiter {:?}", spec.start)));
            }
            all.push(&spec.start);
        }
        for end in self.delimiters.iter().filter_map(|d| d.end.as_deref()) {
            if end.is_empty() {
                return Err(invalid("empty end delimiter".to_string()));
            }
            if !all.contains(&end) {
                all.push(end);
            }
        }

        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                if a.contains(b) || b.contains(a) {
                    return Err(invalid(format!("delimiters {a:?} and {b:?} overlap")));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Start,
    End,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    /// Index into the template's delimiters; `None` for end tokens
    spec: Option<usize>,
    position: usize,
    delimiter: &'a str,
}

#[derive(Debug, Clone, Copy)]
struct Block {
    spec: usize,
    start_position: usize,
    content_start: usize,
    content_end: usize,
}

/// Parses rendered template text back into turns.
#[derive(Debug, Clone)]
pub struct ReverseParser {
    spec: ChatTemplateSpec,
    allow_empty_content: bool,
}

impl ReverseParser {
    /// Creates a parser for a template; empty content is rejected.
    #[must_use]
    pub const fn new(spec: ChatTemplateSpec) -> Self {
        Self {
            spec,
            allow_empty_content: false,
        }
    }

    /// Allows messages whose content is empty.
    #[must_use]
    pub const fn allow_empty_content(mut self, allow: bool) -> Self {
        self.allow_empty_content = allow;
        self
    }

    /// The template this parser reverses.
    #[must_use]
    pub const fn spec(&self) -> &ChatTemplateSpec {
        &self.spec
    }

    /// Parses `text` into turns in source order.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] if no delimiter is present, blocks nest or
    /// stay open, or a block is empty while empty content is not allowed.
    pub fn parse(&self, text: &str) -> Result<Vec<Turn>, TemplateError> {
        let tokens = self.scan(text);
        if tokens.is_empty() {
            return Err(TemplateError::UnknownDelimiter {
                template: self.spec.name.clone(),
            });
        }

        let blocks = self.pair(text, &tokens)?;
        self.compose(text, &blocks)
    }

    fn scan<'a>(&'a self, text: &str) -> Vec<Token<'a>> {
        let haystack = text.as_bytes();
        let mut tokens = Vec::new();

        for (index, spec) in self.spec.delimiters.iter().enumerate() {
            for position in memmem::find_iter(haystack, spec.start.as_bytes()) {
                tokens.push(Token {
                    kind: TokenKind::Start,
                    spec: Some(index),
                    position,
                    delimiter: &spec.start,
                });
            }
        }

        // Shared end delimiters are scanned once
        let mut seen_ends: Vec<&str> = Vec::new();
        for end in self.spec.delimiters.iter().filter_map(|d| d.end.as_deref()) {
            if seen_ends.contains(&end) {
                continue;
            }
            seen_ends.push(end);
            for position in memmem::find_iter(haystack, end.as_bytes()) {
                tokens.push(Token {
                    kind: TokenKind::End,
                    spec: None,
                    position,
                    delimiter: end,
                });
            }
        }

        tokens.sort_by_key(|t| t.position);
        tokens
    }

    fn pair(&self, text: &str, tokens: &[Token<'_>]) -> Result<Vec<Block>, TemplateError> {
        let delimiters = &self.spec.delimiters;
        let mut blocks = Vec::new();
        let mut stack: Vec<Token<'_>> = Vec::new();

        let close = |open: &Token<'_>, end: usize| Block {
            spec: open.spec.unwrap_or_default(),
            start_position: open.position,
            content_start: open.position + open.delimiter.len(),
            content_end: end,
        };
        let is_prefix_only =
            |open: &Token<'_>| open.spec.is_some_and(|i| delimiters[i].end.is_none());

        for token in tokens {
            match token.kind {
                TokenKind::Start => {
                    if let Some(open) = stack.last().copied() {
                        if is_prefix_only(&open) {
                            stack.pop();
                            blocks.push(close(&open, token.position));
                        } else if !self.spec.allow_nesting {
                            return Err(TemplateError::NestedBlock {
                                outer: role_name(delimiters, &open),
                                inner: role_name(delimiters, token),
                                position: token.position,
                            });
                        }
                    }
                    stack.push(*token);
                }
                TokenKind::End => {
                    let Some(open) = stack.pop() else {
                        return Err(TemplateError::UnclosedBlock {
                            detail: format!(
                                "end delimiter {:?} at byte {} has no matching start",
                                token.delimiter, token.position
                            ),
                        });
                    };

                    let content_start = open.position + open.delimiter.len();
                    let expected = open.spec.and_then(|i| delimiters[i].end.as_deref());
                    let matches = expected.is_some_and(|end| end == token.delimiter);
                    if !matches || token.position < content_start {
                        stack.push(open);
                        continue;
                    }

                    blocks.push(close(&open, token.position));
                }
            }
        }

        if let Some(open) = stack.pop() {
            if is_prefix_only(&open) && stack.is_empty() {
                blocks.push(close(&open, text.len()));
            } else {
                let expected = open
                    .spec
                    .and_then(|i| delimiters[i].end.as_deref())
                    .unwrap_or_default();
                return Err(TemplateError::UnclosedBlock {
                    detail: format!(
                        "block for role '{}' opened at byte {} never reaches {:?}",
                        role_name(delimiters, &open),
                        open.position,
                        expected
                    ),
                });
            }
        }

        blocks.sort_by_key(|b| b.start_position);
        Ok(blocks)
    }

    fn compose(&self, text: &str, blocks: &[Block]) -> Result<Vec<Turn>, TemplateError> {
        blocks
            .iter()
            .map(|block| {
                let raw = text.get(block.content_start..block.content_end).unwrap_or_default();
                let content = if self.spec.normalize_whitespace {
                    normalize_whitespace(raw)
                } else {
                    raw.to_string()
                };

                let role = self.spec.delimiters[block.spec].role.clone();
                if content.trim().is_empty() && !self.allow_empty_content {
                    return Err(TemplateError::EmptyContent {
                        role: role.to_string(),
                        position: block.start_position,
                    });
                }

                Ok(Turn::new(role, content))
            })
            .collect()
    }
}

fn role_name(delimiters: &[DelimiterSpec], token: &Token<'_>) -> String {
    token
        .spec
        .map_or_else(String::new, |i| delimiters[i].role.to_string())
}

/// Trims every line and drops blank ones.
fn normalize_whitespace(text: &str) -> String {
    text.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_are_valid() {
        assert!(ChatTemplateSpec::chatml().validate().is_ok());
        assert!(ChatTemplateSpec::llama2().validate().is_ok());
    }

    #[test]
    fn test_chatml_parse() {
        let parser = ReverseParser::new(ChatTemplateSpec::chatml());
        let text = "<|im_start|>system\nBe brief.<|im_end|>\n<|im_start|>user\nHello<|im_end|>\n<|im_start|>assistant\nHi!<|im_end|>";
        let turns = parser.parse(text).unwrap();

        assert_eq!(
            turns,
            vec![
                Turn::system("Be brief."),
                Turn::user("Hello"),
                Turn::assistant("Hi!"),
            ]
        );
    }

    #[test]
    fn test_llama2_parse() {
        let parser = ReverseParser::new(ChatTemplateSpec::llama2());
        let text = "<s>[INST] What is 2+2? [/INST] 4 </s><s>[INST] And 3+3? [/INST] 6 </s>";
        let turns = parser.parse(text).unwrap();

        let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["What is 2+2?", "4", "And 3+3?", "6"]);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[test]
    fn test_normalization_drops_blank_lines() {
        let parser = ReverseParser::new(ChatTemplateSpec::chatml());
        let turns = parser
            .parse("<|im_start|>user\n  line one  \n\n  line two\n<|im_end|>")
            .unwrap();
        assert_eq!(turns[0].content, "line one\nline two");
    }

    #[test]
    fn test_without_normalization_keeps_content() {
        let spec = ChatTemplateSpec::chatml().with_whitespace_normalization(false);
        let parser = ReverseParser::new(spec);
        let turns = parser.parse("<|im_start|>user\na\n\n b<|im_end|>").unwrap();
        assert_eq!(turns[0].content, "a\n\n b");
    }

    #[test]
    fn test_no_delimiters() {
        let parser = ReverseParser::new(ChatTemplateSpec::chatml());
        let err = parser.parse("plain text").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownDelimiter { .. }));
    }

    #[test]
    fn test_nested_block_rejected() {
        let parser = ReverseParser::new(ChatTemplateSpec::chatml());
        let err = parser
            .parse("<|im_start|>user\nhi <|im_start|>assistant\nyo<|im_end|>")
            .unwrap_err();
        assert!(matches!(err, TemplateError::NestedBlock { .. }));
    }

    #[test]
    fn test_unclosed_block_rejected() {
        let parser = ReverseParser::new(ChatTemplateSpec::chatml());
        let err = parser.parse("<|im_start|>user\nhi").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedBlock { .. }));

        let err = parser.parse("hi<|im_end|>").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedBlock { .. }));
    }

    #[test]
    fn test_empty_content() {
        let parser = ReverseParser::new(ChatTemplateSpec::chatml());
        let text = "<|im_start|>user\n<|im_end|>";
        assert!(matches!(
            parser.parse(text).unwrap_err(),
            TemplateError::EmptyContent { .. }
        ));

        let turns = parser.clone().allow_empty_content(true).parse(text).unwrap();
        assert_eq!(turns[0].content, "");
    }

    #[test]
    fn test_prefix_only_delimiters() {
        let spec = ChatTemplateSpec::new(
            "plain",
            vec![
                DelimiterSpec::prefix(Role::User, "User: "),
                DelimiterSpec::prefix(Role::Assistant, "Bot: "),
            ],
        )
        .unwrap();
        let turns = ReverseParser::new(spec)
            .parse("User: hi there\nBot: hello\nUser: bye")
            .unwrap();

        let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["hi there", "hello", "bye"]);
    }

    #[test]
    fn test_invalid_specs() {
        let duplicate = ChatTemplateSpec::new(
            "dup",
            vec![
                DelimiterSpec::prefix(Role::User, "X"),
                DelimiterSpec::prefix(Role::Assistant, "X"),
            ],
        );
        assert!(matches!(duplicate, Err(TemplateError::InvalidSpec { .. })));

        let overlapping = ChatTemplateSpec::new(
            "overlap",
            vec![
                DelimiterSpec::prefix(Role::User, "User"),
                DelimiterSpec::prefix(Role::Assistant, "User: "),
            ],
        );
        assert!(matches!(overlapping, Err(TemplateError::InvalidSpec { .. })));

        assert!(ChatTemplateSpec::new("empty", vec![]).is_err());
    }
}
