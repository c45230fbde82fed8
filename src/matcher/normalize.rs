//! Text normalization and tokenization for question matching
//!
//! Normalization rules: lowercase, punctuation treated as whitespace,
//! whitespace runs collapsed. Tokens keep their byte offsets into the raw
//! input so match snippets can be sliced from the original extracted text.

use std::collections::BTreeSet;

/// A normalized token with its span in the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased token content
    pub text: String,
    /// Byte offset of the token start in the raw input
    pub start: usize,
    /// Byte offset one past the token end in the raw input
    pub end: usize,
}

/// Split raw text into lowercased alphanumeric tokens.
///
/// Any non-alphanumeric character is a separator, which covers both
/// punctuation stripping and whitespace collapsing in one pass.
pub fn tokenize(raw: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;

    for (idx, ch) in raw.char_indices() {
        if ch.is_alphanumeric() {
            if current.is_empty() {
                start = idx;
            }
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(Token {
                text: std::mem::take(&mut current),
                start,
                end: idx,
            });
        }
    }
    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            start,
            end: raw.len(),
        });
    }

    tokens
}

/// Unique token contents, ordered.
pub fn token_set(tokens: &[Token]) -> BTreeSet<String> {
    tokens.iter().map(|t| t.text.clone()).collect()
}

/// Order-insensitive canonical form: unique tokens, sorted, space-joined.
///
/// Edit distance over this form compares wording without being thrown off by
/// phrase order ("solve for x: 2x + 5 = 15" vs "2x + 5 = 15 solve for x").
pub fn canonical_form(tokens: &BTreeSet<String>) -> String {
    tokens
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
