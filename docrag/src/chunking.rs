//! Paragraph-first document chunking.
//!
//! Text is split on blank lines into paragraphs. Paragraphs are packed into
//! chunks of at most `chunk_size` characters; a paragraph that is longer than
//! `chunk_size` on its own is broken into sentences at terminal punctuation
//! and the sentences are packed the same way.
//!
//! With `chunk_overlap > 0` each new chunk starts with the trailing
//! `chunk_overlap` characters of the previous one, as long as that still
//! fits within `chunk_size`. The only chunks allowed to exceed `chunk_size`
//! are those holding a single sentence that is longer than `chunk_size`.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{Chunk, ChunkMetadata};
use crate::error::Result;

/// Joiner between paragraphs inside a chunk.
const PARAGRAPH_JOINER: &str = "\n\n";

/// Joiner between sentences of the same paragraph.
const SENTENCE_JOINER: &str = " ";

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph regex is valid"));

/// A packable piece of text and the joiner that precedes it inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Unit<'a> {
    text: &'a str,
    joiner: &'static str,
}

/// Split `text` into ordered, non-empty chunks.
///
/// Chunk ids are random UUIDs; ordinals run from `0` in document order.
/// Sizes are measured in characters (Unicode scalar values).
///
/// # Errors
///
/// Returns [`RagError::InvalidConfig`](crate::RagError::InvalidConfig) if
/// `chunk_size == 0` or `chunk_overlap >= chunk_size`.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::chunking::split_text;
///
/// let chunks = split_text("A.\n\nB.\n\nC.", 5, 0)?;
/// assert_eq!(chunks.len(), 3);
/// ```
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    RagConfig::validate_chunking(chunk_size, chunk_overlap)?;

    let pieces = pack_units(&split_units(text, chunk_size), chunk_size, chunk_overlap);

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            id: Uuid::new_v4().to_string(),
            text,
            metadata: ChunkMetadata { index },
        })
        .collect())
}

/// Break text into paragraphs, and oversized paragraphs into sentences.
fn split_units(text: &str, chunk_size: usize) -> Vec<Unit<'_>> {
    let mut units = Vec::new();
    for paragraph in PARAGRAPH_BREAK.split(text).map(str::trim).filter(|p| !p.is_empty()) {
        if char_len(paragraph) > chunk_size {
            for (i, sentence) in split_sentences(paragraph).into_iter().enumerate() {
                let joiner = if i == 0 { PARAGRAPH_JOINER } else { SENTENCE_JOINER };
                units.push(Unit { text: sentence, joiner });
            }
        } else {
            units.push(Unit { text: paragraph, joiner: PARAGRAPH_JOINER });
        }
    }
    units
}

/// Split a paragraph after terminal punctuation, keeping the punctuation.
///
/// ASCII `.`, `!` and `?` end a sentence only when followed by whitespace or
/// the end of the paragraph, so decimals and ellipses stay intact. Full-width
/// `。`, `！` and `？` always end a sentence.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let end = i + c.len_utf8();
        let boundary = match c {
            '。' | '！' | '？' => true,
            '.' | '!' | '?' => chars.peek().map_or(true, |(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            let sentence = paragraph[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Greedily pack units into chunk texts.
fn pack_units(units: &[Unit<'_>], chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for unit in units {
        let unit_len = char_len(unit.text);

        if current_len == 0 {
            current.push_str(unit.text);
            current_len = unit_len;
            continue;
        }

        let joiner_len = char_len(unit.joiner);
        if current_len + joiner_len + unit_len <= chunk_size {
            current.push_str(unit.joiner);
            current.push_str(unit.text);
            current_len += joiner_len + unit_len;
            continue;
        }

        let closed = current.trim().to_string();
        let seed = overlap_seed(&closed, chunk_overlap).to_string();
        chunks.push(closed);

        current = String::new();
        let seed_len = char_len(&seed);
        if seed_len > 0 && seed_len + joiner_len + unit_len <= chunk_size {
            current.push_str(&seed);
            current.push_str(unit.joiner);
            current_len = seed_len + joiner_len;
        } else {
            current_len = 0;
        }
        current.push_str(unit.text);
        current_len += unit_len;
    }

    let last = current.trim();
    if !last.is_empty() {
        chunks.push(last.to_string());
    }
    chunks
}

/// The trailing `overlap` characters of `text`, moved forward to a word
/// boundary when the cut falls inside a word.
fn overlap_seed(text: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    let total = char_len(text);
    if total <= overlap {
        return text.trim();
    }

    let cut = text.char_indices().nth(total - overlap).map_or(text.len(), |(i, _)| i);
    let tail = &text[cut..];
    let mid_word = match (text[..cut].chars().next_back(), tail.chars().next()) {
        (Some(before), Some(after)) => splits_word(before, after),
        _ => false,
    };

    let tail = match tail.find(char::is_whitespace) {
        Some(ws) if mid_word => &tail[ws..],
        None if mid_word => "",
        _ => tail,
    };
    tail.trim()
}

/// Whether a cut between `before` and `after` lands inside a word.
///
/// CJK text has no spaces between words, so any cut next to a CJK
/// character counts as a boundary.
fn splits_word(before: char, after: char) -> bool {
    !before.is_whitespace() && !after.is_whitespace() && !is_cjk(before) && !is_cjk(after)
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303F}'   // symbols and punctuation
        | '\u{3040}'..='\u{30FF}' // kana
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}' // hangul
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FFEF}' // full-width forms
    )
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
