//! Line interning for line-mode diffs.
//!
//! Long texts diff much faster when each distinct line is collapsed into a
//! single token char first. The diff then runs over the token streams and the
//! result is rehydrated back into line text.

use std::collections::HashMap;

use crate::core::diff::Edit;

// Token indices at or above the surrogate range shift past it, so the usable
// slot space ends a little below char::MAX. Past this many distinct lines the
// remainder of a text is interned as one blob.
const SURROGATE_BASE: u32 = 0xD800;
const SURROGATE_SPAN: u32 = 0x800;
const MAX_LINES: usize = 0x0010_8000;

fn token_of(slot: usize) -> char {
    let n = slot as u32;
    let n = if n >= SURROGATE_BASE { n + SURROGATE_SPAN } else { n };
    // Slots are capped at MAX_LINES, which keeps n inside the scalar range.
    char::from_u32(n).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn slot_of(token: char) -> usize {
    let n = token as u32;
    let n = if n >= SURROGATE_BASE + SURROGATE_SPAN { n - SURROGATE_SPAN } else { n };
    n as usize
}

/// Intern both texts line by line.
///
/// Returns one token stream per text plus the shared line table. Slot 0 of
/// the table stays blank so that no token maps to index zero. Each line keeps
/// its trailing `\n`; the final line may lack one.
pub fn encode(a: &[char], b: &[char]) -> (Vec<char>, Vec<char>, Vec<Vec<char>>) {
    let mut table: Vec<Vec<char>> = vec![Vec::new()];
    let mut slots: HashMap<String, usize> = HashMap::new();
    let tokens_a = munge(a, &mut table, &mut slots);
    let tokens_b = munge(b, &mut table, &mut slots);
    (tokens_a, tokens_b, table)
}

fn munge(text: &[char], table: &mut Vec<Vec<char>>, slots: &mut HashMap<String, usize>) -> Vec<char> {
    let mut tokens = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let end = if table.len() >= MAX_LINES {
            text.len()
        } else {
            match text[start..].iter().position(|&c| c == '\n') {
                Some(i) => start + i + 1,
                None => text.len(),
            }
        };
        let line = &text[start..end];
        let key: String = line.iter().collect();
        let slot = *slots.entry(key).or_insert_with(|| {
            table.push(line.to_vec());
            table.len() - 1
        });
        tokens.push(token_of(slot));
        start = end;
    }
    tokens
}

/// Replace each edit's token chars with the interned line text.
pub fn decode(edits: &mut [Edit], table: &[Vec<char>]) {
    for edit in edits.iter_mut() {
        let mut text = Vec::new();
        for &token in &edit.chars {
            if let Some(line) = table.get(slot_of(token)) {
                text.extend_from_slice(line);
            }
        }
        edit.chars = text;
    }
}
