//! Heading-aware document chunking with structural overlap.
//!
//! A document is cut into sections at markdown headings. Small sections become
//! one chunk each; larger ones are packed paragraph by paragraph, and any
//! paragraph that alone exceeds the limit is packed sentence by sentence.
//! Every chunk carries its section heading as a `"<heading>: "` prefix.

use crate::types::Chunk;
use regex::Regex;
use std::sync::LazyLock;

/// Label of the implicit section holding text before the first heading.
pub const INTRODUCTION: &str = "Introduction";

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const SENTENCE_SEPARATOR: &str = " ";

/// Paragraphs carried into the next chunk when overlap is enabled.
const PARAGRAPH_CARRY: usize = 1;

/// Sentences carried into the next chunk when overlap is enabled.
const SENTENCE_CARRY: usize = 2;

/// 1-6 `#`, whitespace, then the title.
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+)$").expect("heading pattern"));

/// A blank or whitespace-only line between paragraphs.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern"));

/// Sentence-ending punctuation and the whitespace after it.
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence end pattern"));

/// A heading and the trimmed text under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub content: String,
}

/// Chunk one document.
///
/// `max_chunk_size` bounds the body of each chunk in characters (the heading
/// prefix is not counted). The only chunk allowed to exceed it is one made of
/// a single sentence that is itself longer than the limit. An `overlap_size`
/// of 0 disables carrying; any other value enables the structural overlap of
/// one paragraph or two sentences.
pub fn chunk_document(
    source_id: &str,
    text: &str,
    max_chunk_size: usize,
    overlap_size: usize,
) -> Vec<Chunk> {
    let overlap = overlap_size > 0;
    let mut chunks = Vec::new();

    for (section_index, section) in parse_sections(text).into_iter().enumerate() {
        if section.content.is_empty() {
            continue;
        }
        let bodies = chunk_section(&section.content, max_chunk_size, overlap);
        let chunks_in_section = bodies.len();

        for (chunk_index, body) in bodies.into_iter().enumerate() {
            chunks.push(Chunk::new(
                with_heading(&section.heading, &body),
                source_id,
                section.heading.clone(),
                section_index * chunks_in_section + chunk_index,
            ));
        }
    }

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        source_id,
        chunks.len(),
        max_chunk_size,
        overlap
    );

    chunks
}

/// Split a document into heading-delimited sections.
///
/// A heading followed by at least one line (blank lines included) opens a
/// section, so a heading with a blank body still takes a section index; its
/// content is empty and `chunk_document` emits nothing for it. A heading
/// directly followed by another heading opens none.
pub fn parse_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut heading = INTRODUCTION.to_string();
    let mut lines: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if let Some(title) = heading_title(line) {
            push_section(&mut sections, &heading, &lines);
            heading = title.to_string();
            lines.clear();
        } else {
            lines.push(line);
        }
    }
    push_section(&mut sections, &heading, &lines);

    sections
}

fn push_section(sections: &mut Vec<Section>, heading: &str, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    sections.push(Section {
        heading: heading.to_string(),
        content: lines.join("\n").trim().to_string(),
    });
}

/// Trimmed title of a heading line. `#   ` is a heading with an empty title.
fn heading_title(line: &str) -> Option<&str> {
    HEADING
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|title| title.as_str().trim())
}

fn with_heading(heading: &str, body: &str) -> String {
    if heading.is_empty() || heading.eq_ignore_ascii_case(INTRODUCTION) {
        body.to_string()
    } else {
        format!("{}: {}", heading, body)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Cut one section's content into chunk bodies.
fn chunk_section(content: &str, max: usize, overlap: bool) -> Vec<String> {
    if char_len(content) <= max {
        return vec![content.to_string()];
    }

    let carry = |n| if overlap { n } else { 0 };
    let mut chunks = Vec::new();
    let mut paragraphs = Packer::new(max, PARAGRAPH_SEPARATOR, carry(PARAGRAPH_CARRY));

    for paragraph in split_paragraphs(content) {
        if char_len(paragraph) > max {
            // Long paragraphs never share a chunk with their neighbours
            chunks.extend(paragraphs.finish());
            paragraphs = Packer::new(max, PARAGRAPH_SEPARATOR, carry(PARAGRAPH_CARRY));

            let mut sentences = Packer::new(max, SENTENCE_SEPARATOR, carry(SENTENCE_CARRY));
            for sentence in split_sentences(paragraph) {
                sentences.push(sentence);
            }
            chunks.extend(sentences.finish());
            continue;
        }

        paragraphs.push(paragraph);
    }

    chunks.extend(paragraphs.finish());
    chunks
}

/// Paragraphs are separated by lines containing only whitespace.
fn split_paragraphs(content: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(content)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split after `.`, `!` or `?` when followed by whitespace; the whitespace
/// run is dropped.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for end in SENTENCE_END.find_iter(paragraph) {
        // punctuation is one byte
        sentences.push(&paragraph[start..end.start() + 1]);
        start = end.end();
    }
    if start < paragraph.len() {
        sentences.push(&paragraph[start..]);
    }

    sentences
}

/// Greedy packing of items into separator-joined chunks.
///
/// When an item does not fit, the running chunk is emitted and its last
/// `carry` items seed the next one. Carried items are dropped oldest-first
/// until the new item fits beside them.
struct Packer<'a> {
    max: usize,
    separator: &'a str,
    carry: usize,
    items: Vec<&'a str>,
    len: usize,
    out: Vec<String>,
}

impl<'a> Packer<'a> {
    fn new(max: usize, separator: &'a str, carry: usize) -> Self {
        Self {
            max,
            separator,
            carry,
            items: Vec::new(),
            len: 0,
            out: Vec::new(),
        }
    }

    fn joined_len(&self, items: &[&str]) -> usize {
        let text: usize = items.iter().map(|s| char_len(s)).sum();
        text + char_len(self.separator) * items.len().saturating_sub(1)
    }

    fn with_item_len(&self, items: &[&str], item_len: usize) -> usize {
        if items.is_empty() {
            item_len
        } else {
            self.joined_len(items) + char_len(self.separator) + item_len
        }
    }

    fn push(&mut self, item: &'a str) {
        let item_len = char_len(item);

        if !self.items.is_empty() && self.len + char_len(self.separator) + item_len > self.max {
            self.out.push(self.items.join(self.separator));

            let keep_from = self.items.len().saturating_sub(self.carry);
            let mut tail = self.items.split_off(keep_from);
            while !tail.is_empty() && self.with_item_len(&tail, item_len) > self.max {
                tail.remove(0);
            }

            self.len = self.joined_len(&tail);
            self.items = tail;
        }

        self.len = self.with_item_len(&self.items, item_len);
        self.items.push(item);
    }

    fn finish(mut self) -> Vec<String> {
        if !self.items.is_empty() {
            self.out.push(self.items.join(self.separator));
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn words(text: &str) -> HashSet<String> {
        text.split_whitespace()
            .map(|w| w.trim_end_matches(':').to_string())
            .collect()
    }

    fn body<'a>(chunk: &'a Chunk) -> &'a str {
        chunk
            .content
            .strip_prefix(&format!("{}: ", chunk.heading))
            .unwrap_or(&chunk.content)
    }

    #[test]
    fn test_empty_document() {
        assert!(chunk_document("empty.md", "", 100, 20).is_empty());
        assert!(chunk_document("blank.md", "  \n\n \t\n", 100, 20).is_empty());
    }

    #[test]
    fn test_no_headings_single_introduction() {
        let chunks = chunk_document("faq.txt", "Our office opens at 9am.", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading, INTRODUCTION);
        // no prefix for the implicit section
        assert_eq!(chunks[0].content, "Our office opens at 9am.");
        assert_eq!(chunks[0].source_id, "faq.txt");
    }

    #[test]
    fn test_heading_prefix_and_sections() {
        let doc = "Welcome text.\n\n# Refunds\nOur refund policy allows returns within 30 days.\n\n## Shipping\nWe ship worldwide.\n";
        let chunks = chunk_document("billing.md", doc, 1000, 200);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "Welcome text.");
        assert_eq!(
            chunks[1].content,
            "Refunds: Our refund policy allows returns within 30 days."
        );
        assert_eq!(chunks[2].heading, "Shipping");
        assert_eq!(chunks[2].content, "Shipping: We ship worldwide.");
    }

    #[test]
    fn test_heading_detection() {
        assert_eq!(heading_title("# Title"), Some("Title"));
        assert_eq!(heading_title("###### Deep  "), Some("Deep"));
        assert_eq!(heading_title("####### Too deep"), None);
        assert_eq!(heading_title("#NoSpace"), None);
        assert_eq!(heading_title("#   "), Some(""));
        assert_eq!(heading_title("#"), None);
        assert_eq!(heading_title(" # Indented"), None);
    }

    #[test]
    fn test_empty_title_heading_leaves_body() {
        let chunks = chunk_document("a.md", "#   \nbody text", 1000, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading, "");
        assert_eq!(chunks[0].content, "body text");
    }

    #[test]
    fn test_explicit_introduction_heading_not_prefixed() {
        let chunks = chunk_document("a.md", "# introduction\nHello there.", 1000, 0);
        assert_eq!(chunks[0].content, "Hello there.");
    }

    #[test]
    fn test_blank_sections_keep_their_index() {
        let doc = "# Empty\n\n   \n# Back to back\n# Full\nSome content.";
        let sections = parse_sections(doc);
        let headings: Vec<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Empty", "Full"]);
        assert_eq!(sections[0].content, "");

        let chunks = chunk_document("gaps.md", doc, 1000, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading, "Full");
        assert_eq!(chunks[0].sequence_index, 1);
    }

    #[test]
    fn test_size_bound_and_coverage() {
        let paragraphs: Vec<String> = (0..12)
            .map(|i| format!("Paragraph{} talks about topic{} in some detail here.", i, i))
            .collect();
        let doc = format!("# Guide\n{}", paragraphs.join("\n\n"));

        let chunks = chunk_document("guide.md", &doc, 120, 0);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(body(chunk)) <= 120, "chunk too long: {:?}", chunk.content);
        }

        let mut seen = HashSet::new();
        for chunk in &chunks {
            seen.extend(words(body(chunk)));
        }
        for word in words(&paragraphs.join(" ")) {
            assert!(seen.contains(&word), "missing word {}", word);
        }
    }

    #[test]
    fn test_paragraph_overlap_carries_last_paragraph() {
        let doc = "# FAQ\nAlpha paragraph one.\n\nBeta paragraph two.\n\nGamma paragraph three.";
        let chunks = chunk_document("faq.md", doc, 45, 10);

        assert_eq!(chunks.len(), 2);
        assert_eq!(body(&chunks[0]), "Alpha paragraph one.\n\nBeta paragraph two.");
        assert_eq!(body(&chunks[1]), "Beta paragraph two.\n\nGamma paragraph three.");
    }

    #[test]
    fn test_no_overlap_when_disabled() {
        let doc = "# FAQ\nAlpha paragraph one.\n\nBeta paragraph two.\n\nGamma paragraph three.";
        let chunks = chunk_document("faq.md", doc, 45, 0);

        assert_eq!(chunks.len(), 2);
        assert_eq!(body(&chunks[1]), "Gamma paragraph three.");
    }

    #[test]
    fn test_long_paragraph_split_by_sentences() {
        let sentences = [
            "First sentence here.",
            "Second one follows!",
            "Is this the third?",
            "Fourth closes it.",
        ];
        let doc = format!("# Steps\nShort intro.\n\n{}", sentences.join(" "));
        let chunks = chunk_document("steps.md", &doc, 60, 50);

        // intro is flushed on its own, without carry into the sentence chunks
        assert_eq!(body(&chunks[0]), "Short intro.");
        assert_eq!(
            body(&chunks[1]),
            "First sentence here. Second one follows! Is this the third?"
        );
        // last two sentences carried
        assert_eq!(
            body(&chunks[2]),
            "Second one follows! Is this the third? Fourth closes it."
        );
        for chunk in &chunks {
            assert!(char_len(body(chunk)) <= 60);
        }
    }

    #[test]
    fn test_carry_dropped_when_it_would_overflow() {
        let long = "x".repeat(30);
        let doc = format!("# S\n{a}\n\n{b}\n\n{c}", a = long, b = long, c = "y".repeat(40));
        let chunks = chunk_document("s.md", &doc, 65, 1);

        for chunk in &chunks {
            assert!(char_len(body(chunk)) <= 65);
        }
        assert_eq!(body(chunks.last().unwrap()), "y".repeat(40));
    }

    #[test]
    fn test_oversized_sentence_kept_whole() {
        let sentence = "word ".repeat(30).trim().to_string();
        let doc = format!("# Big\n{}", sentence);
        let chunks = chunk_document("big.md", &doc, 50, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(body(&chunks[0]), sentence);
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two!  Three? Four"),
            vec!["One.", "Two!", "Three?", "Four"]
        );
        assert_eq!(split_sentences("v1.2 is out."), vec!["v1.2 is out."]);
    }

    #[test]
    fn test_split_paragraphs_whitespace_lines() {
        let paragraphs = split_paragraphs("a\nb\n  \t\nc\n\n\n d ");
        assert_eq!(paragraphs, vec!["a\nb", "c", "d"]);
    }

    #[test]
    fn test_sequence_index_formula() {
        let doc = "# A\nOne.\n\n# B\nFirst paragraph text.\n\nSecond paragraph text.";
        let chunks = chunk_document("seq.md", doc, 25, 0);

        // section 0 has one chunk, section 1 has two
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[1].sequence_index, 2);
        assert_eq!(chunks[2].sequence_index, 3);
    }

    #[test]
    fn test_multibyte_lengths_in_chars() {
        let doc = "# Café\nÉté à Paris. Ça coûte cher.";
        let chunks = chunk_document("fr.md", doc, 30, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Café: Été à Paris. Ça coûte cher.");
    }
}
