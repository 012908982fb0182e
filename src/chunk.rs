//! Splitting long text into page-sized chunks.
//!
//! Telegraph rejects pages whose JSON payload grows past ~64KB, and text
//! roughly doubles in size once converted to nodes. Long documents are
//! therefore cut into chunks of at most `max_bytes` bytes, one page each.
//!
//! Chunks follow line boundaries so Markdown structure survives the cut. The
//! only exception is a single line longer than the budget: it is force-split
//! at the largest UTF-8 character boundary that fits. That is the one place a
//! chunk boundary lands inside a logical line, so a paragraph written as one
//! enormous unbroken line will be rendered across two pages.
//!
//! Concatenating the chunk texts always reproduces the input byte for byte.

/// One page worth of text. `part` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    pub part: usize,
    pub text: String,
}

/// Split `text` into ordered chunks of at most `max_bytes` bytes each.
///
/// `max_bytes` of zero is treated as one, so every chunk still makes
/// progress. Empty input yields a single empty chunk.
pub fn chunk(text: &str, max_bytes: usize) -> Vec<PageChunk> {
    let max = max_bytes.max(1);
    if text.len() <= max {
        return number(vec![text.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        let mut line = line;
        while line.len() > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let cut = floor_char_boundary(line, max);
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }
        if current.len() + line.len() > max && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    number(chunks)
}

fn number(texts: Vec<String>) -> Vec<PageChunk> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageChunk { part: i + 1, text })
        .collect()
}

/// Largest index `<= max` that is a char boundary of `s`, but never zero
/// for a non-empty `s` (a single character wider than `max` is kept whole).
fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut cut = max.min(s.len());
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    if cut == 0 {
        cut = s.chars().next().map(char::len_utf8).unwrap_or(0);
    }
    cut
}
