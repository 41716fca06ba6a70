//! Character-level diff engine.
//!
//! Finds the differences between two texts as an ordered edit script of
//! delete/insert/equal runs. The core is Myers' O(ND) bisection with the
//! usual speedups layered on top: common prefix/suffix trimming, a
//! containment shortcut, the half-match heuristic, and an optional line-mode
//! pre-pass for large inputs. Cleanup passes rewrite a raw script into
//! something a human (or the patch engine) is happier with.

use std::fmt::Write as _;
use std::fs;
use std::time::{Duration, Instant};

use anyhow::{Context, Result as CliResult};
use itertools::Itertools;
use owo_colors::OwoColorize;
use tracing::debug;

use crate::cli::{AppContext, DiffArgs, DiffFormat};
use crate::core::error::{Error, Result};
use crate::core::lines;
use crate::core::text::{self, common_prefix, common_suffix, from_chars, to_chars};
use crate::infra::config::load_config;
use crate::infra::escape::{escape, unescape};

/// What a single edit run does to the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Run exists in the source only.
    Delete,
    /// Run exists in the target only.
    Insert,
    /// Run is shared by both texts.
    Equal,
}

/// One run of an edit script, measured in code points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    pub chars: Vec<char>,
}

impl Edit {
    pub fn from_chars(kind: EditKind, chars: Vec<char>) -> Self {
        Self { kind, chars }
    }

    pub fn delete(text: &str) -> Self {
        Self::from_chars(EditKind::Delete, to_chars(text))
    }

    pub fn insert(text: &str) -> Self {
        Self::from_chars(EditKind::Insert, to_chars(text))
    }

    pub fn equal(text: &str) -> Self {
        Self::from_chars(EditKind::Equal, to_chars(text))
    }

    /// The run's text as an owned string.
    pub fn text(&self) -> String {
        from_chars(&self.chars)
    }
}

/// Tuning knobs for the diff engine.
#[derive(Debug, Clone, Copy)]
pub struct DiffConfig {
    /// Seconds to spend before the bisection settles for a coarse result.
    /// Zero or negative means no limit (and disables the half-match
    /// heuristic, which can produce non-minimal diffs).
    pub timeout_secs: f32,
    /// Cost of an empty edit operation, in chars, for `cleanup_efficiency`.
    pub edit_cost: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { timeout_secs: 1.0, edit_cost: 4 }
    }
}

/// Diff driver. Cheap to construct; holds only configuration.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    pub config: DiffConfig,
}

/// Result of the half-match heuristic, already oriented source/target.
struct HalfMatch {
    a_prefix: Vec<char>,
    a_suffix: Vec<char>,
    b_prefix: Vec<char>,
    b_suffix: Vec<char>,
    common: Vec<char>,
}

impl DiffEngine {
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    /// Diff two texts into an edit script.
    ///
    /// `check_lines` allows the line-mode pre-pass for large inputs; it
    /// trades a slightly coarser diff for a lot of speed.
    pub fn diff(&self, a: &str, b: &str, check_lines: bool) -> Vec<Edit> {
        self.diff_chars(&to_chars(a), &to_chars(b), check_lines)
    }

    /// As [`diff`](Self::diff), on pre-split code points.
    pub fn diff_chars(&self, a: &[char], b: &[char], check_lines: bool) -> Vec<Edit> {
        self.main(a, b, check_lines, self.deadline())
    }

    fn deadline(&self) -> Option<Instant> {
        (self.config.timeout_secs > 0.0)
            .then(|| Instant::now() + Duration::from_secs_f32(self.config.timeout_secs))
    }

    fn main(&self, a: &[char], b: &[char], check_lines: bool, deadline: Option<Instant>) -> Vec<Edit> {
        if a == b {
            if a.is_empty() {
                return Vec::new();
            }
            return vec![Edit::from_chars(EditKind::Equal, a.to_vec())];
        }

        // Trim what the texts agree on; the middle is the interesting part.
        let prefix_len = common_prefix(a, b);
        let prefix = &a[..prefix_len];
        let (a, b) = (&a[prefix_len..], &b[prefix_len..]);
        let suffix_len = common_suffix(a, b);
        let suffix = &a[a.len() - suffix_len..];
        let (a, b) = (&a[..a.len() - suffix_len], &b[..b.len() - suffix_len]);

        let mut edits = self.compute(a, b, check_lines, deadline);
        if !prefix.is_empty() {
            edits.insert(0, Edit::from_chars(EditKind::Equal, prefix.to_vec()));
        }
        if !suffix.is_empty() {
            edits.push(Edit::from_chars(EditKind::Equal, suffix.to_vec()));
        }
        cleanup_merge(&mut edits);
        edits
    }

    /// Diff the trimmed middle block, assuming no common affixes remain.
    fn compute(&self, a: &[char], b: &[char], check_lines: bool, deadline: Option<Instant>) -> Vec<Edit> {
        if a.is_empty() {
            return vec![Edit::from_chars(EditKind::Insert, b.to_vec())];
        }
        if b.is_empty() {
            return vec![Edit::from_chars(EditKind::Delete, a.to_vec())];
        }

        let (long, short, kind) = if a.len() > b.len() {
            (a, b, EditKind::Delete)
        } else {
            (b, a, EditKind::Insert)
        };
        if let Some(i) = text::find(long, short) {
            // The shorter text sits whole inside the longer one.
            return vec![
                Edit::from_chars(kind, long[..i].to_vec()),
                Edit::from_chars(EditKind::Equal, short.to_vec()),
                Edit::from_chars(kind, long[i + short.len()..].to_vec()),
            ];
        }
        if short.len() == 1 {
            // Single char can't be in both texts after the containment check.
            return vec![
                Edit::from_chars(EditKind::Delete, a.to_vec()),
                Edit::from_chars(EditKind::Insert, b.to_vec()),
            ];
        }

        if let Some(hm) = self.half_match(a, b) {
            let mut edits = self.main(&hm.a_prefix, &hm.b_prefix, check_lines, deadline);
            edits.push(Edit::from_chars(EditKind::Equal, hm.common));
            edits.extend(self.main(&hm.a_suffix, &hm.b_suffix, check_lines, deadline));
            return edits;
        }

        if check_lines && a.len() > 100 && b.len() > 100 {
            return self.line_mode(a, b, deadline);
        }

        self.bisect(a, b, deadline)
    }

    /// Do the texts share a substring at least half the length of the longer
    /// one? Skipped with unlimited time: the shortcut can be non-minimal.
    fn half_match(&self, a: &[char], b: &[char]) -> Option<HalfMatch> {
        if self.config.timeout_secs <= 0.0 {
            return None;
        }
        let (long, short) = if a.len() > b.len() { (a, b) } else { (b, a) };
        if long.len() < 4 || short.len() * 2 < long.len() {
            return None;
        }

        // Seed from the second and third quarters of the longer text.
        let hm1 = half_match_at(long, short, (long.len() + 3) / 4);
        let hm2 = half_match_at(long, short, (long.len() + 1) / 2);
        let (long_pre, long_suf, short_pre, short_suf, common) = match (hm1, hm2) {
            (None, None) => return None,
            (Some(h), None) | (None, Some(h)) => h,
            (Some(h1), Some(h2)) => {
                if h1.4.len() > h2.4.len() {
                    h1
                } else {
                    h2
                }
            }
        };

        Some(if a.len() > b.len() {
            HalfMatch {
                a_prefix: long_pre,
                a_suffix: long_suf,
                b_prefix: short_pre,
                b_suffix: short_suf,
                common,
            }
        } else {
            HalfMatch {
                a_prefix: short_pre,
                a_suffix: short_suf,
                b_prefix: long_pre,
                b_suffix: long_suf,
                common,
            }
        })
    }

    /// Collapse runs of identical lines into single tokens, diff those, then
    /// re-diff the changed spans character by character.
    fn line_mode(&self, a: &[char], b: &[char], deadline: Option<Instant>) -> Vec<Edit> {
        let (tokens_a, tokens_b, table) = lines::encode(a, b);
        let mut edits = self.main(&tokens_a, &tokens_b, false, deadline);
        lines::decode(&mut edits, &table);
        cleanup_semantic(&mut edits);

        // Walk the script, re-diffing each paired delete/insert run.
        edits.push(Edit::equal(""));
        let mut pointer = 0;
        let mut count_delete = 0;
        let mut count_insert = 0;
        let mut text_delete: Vec<char> = Vec::new();
        let mut text_insert: Vec<char> = Vec::new();
        while pointer < edits.len() {
            match edits[pointer].kind {
                EditKind::Insert => {
                    count_insert += 1;
                    text_insert.extend_from_slice(&edits[pointer].chars);
                }
                EditKind::Delete => {
                    count_delete += 1;
                    text_delete.extend_from_slice(&edits[pointer].chars);
                }
                EditKind::Equal => {
                    if count_delete >= 1 && count_insert >= 1 {
                        let sub = self.main(&text_delete, &text_insert, false, deadline);
                        let start = pointer - count_delete - count_insert;
                        let sub_len = sub.len();
                        edits.splice(start..pointer, sub);
                        pointer = start + sub_len;
                    }
                    count_insert = 0;
                    count_delete = 0;
                    text_delete.clear();
                    text_insert.clear();
                }
            }
            pointer += 1;
        }
        edits.pop();
        edits
    }

    /// Myers bisection: walk the edit graph from both ends at once and split
    /// the problem at the point where the paths overlap.
    fn bisect(&self, a: &[char], b: &[char], deadline: Option<Instant>) -> Vec<Edit> {
        let a_len = a.len() as isize;
        let b_len = b.len() as isize;
        let max_d = (a_len + b_len + 1) / 2;
        let v_offset = max_d;
        let v_length = (2 * max_d) as usize + 1;
        let mut v1 = vec![-1isize; v_length];
        let mut v2 = vec![-1isize; v_length];
        v1[(v_offset + 1) as usize] = 0;
        v2[(v_offset + 1) as usize] = 0;
        let delta = a_len - b_len;
        // With an odd delta the forward path detects the overlap; even, the
        // reverse path does.
        let front = delta % 2 != 0;
        let mut k1start = 0isize;
        let mut k1end = 0isize;
        let mut k2start = 0isize;
        let mut k2end = 0isize;

        for d in 0..max_d {
            if deadline.is_some_and(|t| Instant::now() > t) {
                debug!(d, "bisect deadline hit, settling for a coarse diff");
                break;
            }

            let mut k1 = -d + k1start;
            while k1 <= d - k1end {
                let k1_offset = (v_offset + k1) as usize;
                let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
                    v1[k1_offset + 1]
                } else {
                    v1[k1_offset - 1] + 1
                };
                let mut y1 = x1 - k1;
                while x1 < a_len && y1 < b_len && a[x1 as usize] == b[y1 as usize] {
                    x1 += 1;
                    y1 += 1;
                }
                v1[k1_offset] = x1;
                if x1 > a_len {
                    // Ran off the right of the graph.
                    k1end += 2;
                } else if y1 > b_len {
                    // Ran off the bottom of the graph.
                    k1start += 2;
                } else if front {
                    let k2_offset = v_offset + delta - k1;
                    if k2_offset >= 0 && (k2_offset as usize) < v_length && v2[k2_offset as usize] != -1 {
                        let x2 = a_len - v2[k2_offset as usize];
                        if x1 >= x2 {
                            return self.bisect_split(a, b, x1 as usize, y1 as usize, deadline);
                        }
                    }
                }
                k1 += 2;
            }

            let mut k2 = -d + k2start;
            while k2 <= d - k2end {
                let k2_offset = (v_offset + k2) as usize;
                let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
                    v2[k2_offset + 1]
                } else {
                    v2[k2_offset - 1] + 1
                };
                let mut y2 = x2 - k2;
                while x2 < a_len
                    && y2 < b_len
                    && a[(a_len - x2 - 1) as usize] == b[(b_len - y2 - 1) as usize]
                {
                    x2 += 1;
                    y2 += 1;
                }
                v2[k2_offset] = x2;
                if x2 > a_len {
                    k2end += 2;
                } else if y2 > b_len {
                    k2start += 2;
                } else if !front {
                    let k1_offset = v_offset + delta - k2;
                    if k1_offset >= 0 && (k1_offset as usize) < v_length && v1[k1_offset as usize] != -1 {
                        let x1 = v1[k1_offset as usize];
                        let y1 = v_offset + x1 - k1_offset;
                        let x2 = a_len - x2;
                        if x1 >= x2 {
                            return self.bisect_split(a, b, x1 as usize, y1 as usize, deadline);
                        }
                    }
                }
                k2 += 2;
            }
        }

        // Ran out of time or the texts share nothing at all.
        vec![
            Edit::from_chars(EditKind::Delete, a.to_vec()),
            Edit::from_chars(EditKind::Insert, b.to_vec()),
        ]
    }

    fn bisect_split(
        &self,
        a: &[char],
        b: &[char],
        x: usize,
        y: usize,
        deadline: Option<Instant>,
    ) -> Vec<Edit> {
        let mut edits = self.main(&a[..x], &b[..y], false, deadline);
        edits.extend(self.main(&a[x..], &b[y..], false, deadline));
        edits
    }

    /// Fold equalities cheaper than `edit_cost` into the surrounding changes.
    pub fn cleanup_efficiency(&self, edits: &mut Vec<Edit>) {
        let edit_cost = self.config.edit_cost;
        let mut changes = false;
        let mut equalities: Vec<usize> = Vec::new();
        let mut last_equality: Option<Vec<char>> = None;
        let mut pointer = 0;
        // Change flags on either side of the candidate equality.
        let mut pre_ins = false;
        let mut pre_del = false;
        let mut post_ins = false;
        let mut post_del = false;

        while pointer < edits.len() {
            if edits[pointer].kind == EditKind::Equal {
                if edits[pointer].chars.len() < edit_cost && (post_ins || post_del) {
                    equalities.push(pointer);
                    pre_ins = post_ins;
                    pre_del = post_del;
                    last_equality = Some(edits[pointer].chars.clone());
                } else {
                    equalities.clear();
                    last_equality = None;
                }
                post_ins = false;
                post_del = false;
                pointer += 1;
                continue;
            }

            if edits[pointer].kind == EditKind::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            // An equality is expendable surrounded by all four change kinds,
            // or by three when it is shorter than half the edit cost.
            let qualifies = last_equality.as_ref().is_some_and(|eq| {
                !eq.is_empty()
                    && ((pre_ins && pre_del && post_ins && post_del)
                        || (eq.len() * 2 < edit_cost
                            && (pre_ins as u8 + pre_del as u8 + post_ins as u8 + post_del as u8) == 3))
            });
            if qualifies {
                if let (Some(eq), Some(&idx)) = (last_equality.take(), equalities.last()) {
                    edits.insert(idx, Edit::from_chars(EditKind::Delete, eq));
                    edits[idx + 1].kind = EditKind::Insert;
                    equalities.pop();
                    changes = true;
                    if pre_ins && pre_del {
                        post_ins = true;
                        post_del = true;
                        equalities.clear();
                        pointer += 1;
                    } else {
                        equalities.pop();
                        pointer = equalities.last().map_or(0, |&p| p + 1);
                        post_ins = false;
                        post_del = false;
                    }
                    continue;
                }
            }
            pointer += 1;
        }

        if changes {
            cleanup_merge(edits);
        }
    }
}

/// One seed probe of the half-match heuristic. Returns long-prefix,
/// long-suffix, short-prefix, short-suffix and the common middle.
type HalfMatchParts = (Vec<char>, Vec<char>, Vec<char>, Vec<char>, Vec<char>);

fn half_match_at(long: &[char], short: &[char], i: usize) -> Option<HalfMatchParts> {
    let seed = &long[i..i + long.len() / 4];
    let mut best_common: Vec<char> = Vec::new();
    let mut best = (Vec::new(), Vec::new(), Vec::new(), Vec::new());

    let mut j = text::find_from(short, seed, 0);
    while let Some(at) = j {
        let prefix_len = common_prefix(&long[i..], &short[at..]);
        let suffix_len = common_suffix(&long[..i], &short[..at]);
        if best_common.len() < suffix_len + prefix_len {
            best_common = short[at - suffix_len..at + prefix_len].to_vec();
            best = (
                long[..i - suffix_len].to_vec(),
                long[i + prefix_len..].to_vec(),
                short[..at - suffix_len].to_vec(),
                short[at + prefix_len..].to_vec(),
            );
        }
        j = text::find_from(short, seed, at + 1);
    }

    if best_common.len() * 2 >= long.len() {
        Some((best.0, best.1, best.2, best.3, best_common))
    } else {
        None
    }
}

/// Coalesce an edit script: merge same-kind runs, factor common affixes out
/// of paired delete/inserts, and slide lone edits against their neighbours.
/// Idempotent; any script of equalities it emits is maximally merged.
pub fn cleanup_merge(edits: &mut Vec<Edit>) {
    loop {
        if edits.is_empty() {
            return;
        }
        edits.push(Edit::equal("")); // sentinel
        let mut pointer = 0;
        let mut count_delete = 0;
        let mut count_insert = 0;
        let mut text_delete: Vec<char> = Vec::new();
        let mut text_insert: Vec<char> = Vec::new();

        while pointer < edits.len() {
            match edits[pointer].kind {
                EditKind::Insert => {
                    count_insert += 1;
                    text_insert.extend_from_slice(&edits[pointer].chars);
                    pointer += 1;
                }
                EditKind::Delete => {
                    count_delete += 1;
                    text_delete.extend_from_slice(&edits[pointer].chars);
                    pointer += 1;
                }
                EditKind::Equal => {
                    if count_delete + count_insert > 1 {
                        if count_delete != 0 && count_insert != 0 {
                            // Factor out any common prefix.
                            let prefix = common_prefix(&text_insert, &text_delete);
                            if prefix > 0 {
                                let x = pointer - count_delete - count_insert;
                                if x > 0 && edits[x - 1].kind == EditKind::Equal {
                                    edits[x - 1].chars.extend_from_slice(&text_insert[..prefix]);
                                } else {
                                    edits.insert(
                                        0,
                                        Edit::from_chars(EditKind::Equal, text_insert[..prefix].to_vec()),
                                    );
                                    pointer += 1;
                                }
                                text_insert.drain(..prefix);
                                text_delete.drain(..prefix);
                            }
                            // Factor out any common suffix.
                            let suffix = common_suffix(&text_insert, &text_delete);
                            if suffix > 0 {
                                let mut merged = text_insert[text_insert.len() - suffix..].to_vec();
                                merged.extend_from_slice(&edits[pointer].chars);
                                edits[pointer].chars = merged;
                                text_insert.truncate(text_insert.len() - suffix);
                                text_delete.truncate(text_delete.len() - suffix);
                            }
                        }
                        // Replace the run with at most one delete and one insert.
                        let start = pointer - count_delete - count_insert;
                        let mut replacement = Vec::with_capacity(2);
                        if !text_delete.is_empty() {
                            replacement.push(Edit::from_chars(EditKind::Delete, text_delete.clone()));
                        }
                        if !text_insert.is_empty() {
                            replacement.push(Edit::from_chars(EditKind::Insert, text_insert.clone()));
                        }
                        let added = replacement.len();
                        edits.splice(start..pointer, replacement);
                        pointer = start + added + 1;
                    } else if pointer != 0 && edits[pointer - 1].kind == EditKind::Equal {
                        // Merge this equality into the previous one.
                        let merged = edits.remove(pointer);
                        edits[pointer - 1].chars.extend_from_slice(&merged.chars);
                    } else {
                        pointer += 1;
                    }
                    count_insert = 0;
                    count_delete = 0;
                    text_delete.clear();
                    text_insert.clear();
                }
            }
        }
        if edits.last().is_some_and(|e| e.chars.is_empty()) {
            edits.pop(); // drop the sentinel
        }

        // Second pass: slide single edits that sit between equalities, which
        // can free up further merges.
        let mut changes = false;
        let mut pointer = 1;
        while edits.len() >= 3 && pointer < edits.len() - 1 {
            if edits[pointer - 1].kind == EditKind::Equal && edits[pointer + 1].kind == EditKind::Equal {
                if edits[pointer].chars.ends_with(&edits[pointer - 1].chars) {
                    // Shift the edit left over the previous equality.
                    let prev = edits[pointer - 1].chars.clone();
                    let keep = edits[pointer].chars.len() - prev.len();
                    let mut shifted = prev.clone();
                    shifted.extend_from_slice(&edits[pointer].chars[..keep]);
                    edits[pointer].chars = shifted;
                    let mut next = prev;
                    next.extend_from_slice(&edits[pointer + 1].chars);
                    edits[pointer + 1].chars = next;
                    edits.remove(pointer - 1);
                    changes = true;
                } else if edits[pointer].chars.starts_with(&edits[pointer + 1].chars) {
                    // Shift the edit right over the next equality.
                    let next = edits[pointer + 1].chars.clone();
                    edits[pointer - 1].chars.extend_from_slice(&next);
                    let mut shifted = edits[pointer].chars[next.len()..].to_vec();
                    shifted.extend_from_slice(&next);
                    edits[pointer].chars = shifted;
                    edits.remove(pointer + 1);
                    changes = true;
                }
            }
            pointer += 1;
        }
        if !changes {
            return;
        }
    }
}

/// Reduce the number of edits by discarding semantically trivial equalities,
/// then eliminate overlaps between deletions and insertions.
pub fn cleanup_semantic(edits: &mut Vec<Edit>) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;
    let mut pointer = 0;
    // Lengths of changes either side of the candidate equality.
    let mut insertions1 = 0;
    let mut deletions1 = 0;
    let mut insertions2 = 0;
    let mut deletions2 = 0;

    while pointer < edits.len() {
        if edits[pointer].kind == EditKind::Equal {
            equalities.push(pointer);
            insertions1 = insertions2;
            deletions1 = deletions2;
            insertions2 = 0;
            deletions2 = 0;
            last_equality = Some(edits[pointer].chars.clone());
            pointer += 1;
            continue;
        }

        if edits[pointer].kind == EditKind::Insert {
            insertions2 += edits[pointer].chars.len();
        } else {
            deletions2 += edits[pointer].chars.len();
        }
        // Is the equality smaller than the changes on both of its sides?
        let expendable = last_equality.as_ref().is_some_and(|eq| {
            !eq.is_empty()
                && eq.len() <= insertions1.max(deletions1)
                && eq.len() <= insertions2.max(deletions2)
        });
        if expendable {
            if let (Some(eq), Some(&idx)) = (last_equality.take(), equalities.last()) {
                // Duplicate the record: a deletion of it, then it reinserted.
                edits.insert(idx, Edit::from_chars(EditKind::Delete, eq.clone()));
                edits[idx + 1] = Edit::from_chars(EditKind::Insert, eq);
                equalities.pop();
                equalities.pop();
                pointer = equalities.last().map_or(0, |&p| p + 1);
                insertions1 = 0;
                deletions1 = 0;
                insertions2 = 0;
                deletions2 = 0;
                changes = true;
                continue;
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(edits);
    }
    cleanup_semantic_lossless(edits);

    // Find overlaps between deletions and insertions:
    // <del>abcxxx</del><ins>xxxdef</ins> -> <del>abc</del>xxx<ins>def</ins>
    // <del>xxxabc</del><ins>defxxx</ins> -> <ins>def</ins>xxx<del>abc</del>
    let mut pointer = 1;
    while pointer < edits.len() {
        if edits[pointer - 1].kind == EditKind::Delete && edits[pointer].kind == EditKind::Insert {
            let deletion = edits[pointer - 1].chars.clone();
            let insertion = edits[pointer].chars.clone();
            let overlap1 = text::common_overlap(&deletion, &insertion);
            let overlap2 = text::common_overlap(&insertion, &deletion);
            if overlap1 >= overlap2 {
                if overlap1 * 2 >= deletion.len() || overlap1 * 2 >= insertion.len() {
                    edits.insert(
                        pointer,
                        Edit::from_chars(EditKind::Equal, insertion[..overlap1].to_vec()),
                    );
                    edits[pointer - 1].chars = deletion[..deletion.len() - overlap1].to_vec();
                    edits[pointer + 1].chars = insertion[overlap1..].to_vec();
                    pointer += 1;
                }
            } else if overlap2 * 2 >= deletion.len() || overlap2 * 2 >= insertion.len() {
                // Reverse overlap: swap the edits around the shared middle.
                edits.insert(
                    pointer,
                    Edit::from_chars(EditKind::Equal, deletion[..overlap2].to_vec()),
                );
                edits[pointer - 1] = Edit::from_chars(
                    EditKind::Insert,
                    insertion[..insertion.len() - overlap2].to_vec(),
                );
                edits[pointer + 1] = Edit::from_chars(EditKind::Delete, deletion[overlap2..].to_vec());
                pointer += 1;
            }
            pointer += 1;
        }
        pointer += 1;
    }
}

/// Slide edits sandwiched between equalities to align with word, line or
/// sentence boundaries. Purely cosmetic; the script stays equivalent.
pub fn cleanup_semantic_lossless(edits: &mut Vec<Edit>) {
    let mut pointer = 1;
    while edits.len() >= 3 && pointer < edits.len() - 1 {
        if edits[pointer - 1].kind == EditKind::Equal && edits[pointer + 1].kind == EditKind::Equal {
            let mut equality1 = edits[pointer - 1].chars.clone();
            let mut edit = edits[pointer].chars.clone();
            let mut equality2 = edits[pointer + 1].chars.clone();

            // Shift the edit as far left as possible.
            let offset = common_suffix(&equality1, &edit);
            if offset > 0 {
                let common = edit[edit.len() - offset..].to_vec();
                equality1.truncate(equality1.len() - offset);
                let mut shifted = common.clone();
                shifted.extend_from_slice(&edit[..edit.len() - offset]);
                edit = shifted;
                let mut eq2 = common;
                eq2.extend_from_slice(&equality2);
                equality2 = eq2;
            }

            // Step right one char at a time, keeping the best-scoring split.
            let mut best_equality1 = equality1.clone();
            let mut best_edit = edit.clone();
            let mut best_equality2 = equality2.clone();
            let mut best_score = boundary_score(&equality1, &edit) + boundary_score(&edit, &equality2);
            while !edit.is_empty() && !equality2.is_empty() && edit[0] == equality2[0] {
                equality1.push(edit[0]);
                edit.rotate_left(1);
                let last = edit.len() - 1;
                edit[last] = equality2[0];
                equality2.remove(0);
                let score = boundary_score(&equality1, &edit) + boundary_score(&edit, &equality2);
                // Ties favour the rightmost position.
                if score >= best_score {
                    best_score = score;
                    best_equality1 = equality1.clone();
                    best_edit = edit.clone();
                    best_equality2 = equality2.clone();
                }
            }

            if edits[pointer - 1].chars != best_equality1 {
                // The slide moved something; rewrite the three records.
                if !best_equality1.is_empty() {
                    edits[pointer - 1].chars = best_equality1;
                } else {
                    edits.remove(pointer - 1);
                    pointer -= 1;
                }
                edits[pointer].chars = best_edit;
                if !best_equality2.is_empty() {
                    edits[pointer + 1].chars = best_equality2;
                } else {
                    edits.remove(pointer + 1);
                    pointer -= 1;
                }
            }
        }
        pointer += 1;
    }
}

/// Score how "natural" a boundary between two texts is. 6 is a text edge,
/// 5 a blank line, 4 a line break, 3 a sentence end, 2 whitespace,
/// 1 other non-alphanumeric, 0 an interior split.
fn boundary_score(one: &[char], two: &[char]) -> usize {
    if one.is_empty() || two.is_empty() {
        return 6;
    }
    let char1 = one[one.len() - 1];
    let char2 = two[0];
    let non_alnum1 = !char1.is_alphanumeric();
    let non_alnum2 = !char2.is_alphanumeric();
    let whitespace1 = non_alnum1 && char1.is_whitespace();
    let whitespace2 = non_alnum2 && char2.is_whitespace();
    let line_break1 = whitespace1 && (char1 == '\n' || char1 == '\r');
    let line_break2 = whitespace2 && (char2 == '\n' || char2 == '\r');
    let blank_line1 = line_break1 && ends_with_blank_line(one);
    let blank_line2 = line_break2 && starts_with_blank_line(two);

    if blank_line1 || blank_line2 {
        5
    } else if line_break1 || line_break2 {
        4
    } else if non_alnum1 && !whitespace1 && whitespace2 {
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

// Matches /\n\r?\n$/.
fn ends_with_blank_line(text: &[char]) -> bool {
    let n = text.len();
    (n >= 2 && text[n - 2] == '\n' && text[n - 1] == '\n')
        || (n >= 3 && text[n - 3] == '\n' && text[n - 2] == '\r' && text[n - 1] == '\n')
}

// Matches /^\r?\n\r?\n/.
fn starts_with_blank_line(text: &[char]) -> bool {
    let after_cr = |i: usize| if text.get(i) == Some(&'\r') { i + 1 } else { i };
    let i = after_cr(0);
    if text.get(i) != Some(&'\n') {
        return false;
    }
    let j = after_cr(i + 1);
    text.get(j) == Some(&'\n')
}

/// The source text the script was computed from.
pub fn source_text(edits: &[Edit]) -> String {
    from_chars(&source_chars(edits))
}

/// Source text as code points (everything but insertions).
pub fn source_chars(edits: &[Edit]) -> Vec<char> {
    let mut out = Vec::new();
    for edit in edits {
        if edit.kind != EditKind::Insert {
            out.extend_from_slice(&edit.chars);
        }
    }
    out
}

/// The target text the script produces.
pub fn target_text(edits: &[Edit]) -> String {
    from_chars(&target_chars(edits))
}

/// Target text as code points (everything but deletions).
pub fn target_chars(edits: &[Edit]) -> Vec<char> {
    let mut out = Vec::new();
    for edit in edits {
        if edit.kind != EditKind::Delete {
            out.extend_from_slice(&edit.chars);
        }
    }
    out
}

/// Levenshtein distance implied by a script: the larger side of each paired
/// insertion/deletion block counts once.
pub fn levenshtein(edits: &[Edit]) -> usize {
    let mut distance = 0;
    let mut insertions = 0;
    let mut deletions = 0;
    for edit in edits {
        match edit.kind {
            EditKind::Insert => insertions += edit.chars.len(),
            EditKind::Delete => deletions += edit.chars.len(),
            EditKind::Equal => {
                distance += insertions.max(deletions);
                insertions = 0;
                deletions = 0;
            }
        }
    }
    distance + insertions.max(deletions)
}

/// Translate a source-text offset to its target-text equivalent. Offsets
/// inside a deletion map to the start of the run.
pub fn x_index(edits: &[Edit], loc: usize) -> usize {
    let mut chars1 = 0;
    let mut chars2 = 0;
    let mut last_chars1 = 0;
    let mut last_chars2 = 0;
    let mut hit: Option<&Edit> = None;
    for edit in edits {
        if edit.kind != EditKind::Insert {
            chars1 += edit.chars.len();
        }
        if edit.kind != EditKind::Delete {
            chars2 += edit.chars.len();
        }
        if chars1 > loc {
            hit = Some(edit);
            break;
        }
        last_chars1 = chars1;
        last_chars2 = chars2;
    }
    if hit.is_some_and(|e| e.kind == EditKind::Delete) {
        return last_chars2;
    }
    last_chars2 + (loc - last_chars1)
}

/// Render a script as minimal HTML with per-kind styling.
pub fn pretty_html(edits: &[Edit]) -> String {
    let mut html = String::new();
    for edit in edits {
        let text = edit
            .text()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('\n', "&para;<br>");
        let _ = match edit.kind {
            EditKind::Insert => {
                write!(html, "<ins style=\"background:#e6ffe6;\">{text}</ins>")
            }
            EditKind::Delete => {
                write!(html, "<del style=\"background:#ffe6e6;\">{text}</del>")
            }
            EditKind::Equal => write!(html, "<span>{text}</span>"),
        };
    }
    html
}

/// Encode a script as a compact delta: `=N` keeps N chars, `-N` drops N,
/// `+text` inserts percent-escaped text. Tokens are tab-separated.
pub fn to_delta(edits: &[Edit]) -> String {
    edits
        .iter()
        .map(|edit| match edit.kind {
            EditKind::Insert => format!("+{}", escape(&edit.text())),
            EditKind::Delete => format!("-{}", edit.chars.len()),
            EditKind::Equal => format!("={}", edit.chars.len()),
        })
        .join("\t")
}

/// Rebuild the full script from the source text and a delta produced by
/// [`to_delta`].
pub fn from_delta(source: &str, delta: &str) -> Result<Vec<Edit>> {
    let chars = to_chars(source);
    let mut edits = Vec::new();
    let mut pointer = 0;

    for token in delta.split('\t') {
        if token.is_empty() {
            // Blank tokens are fine (a trailing \t produces one).
            continue;
        }
        match token.as_bytes()[0] {
            b'+' => {
                let text =
                    unescape(&token[1..]).map_err(|_| Error::MalformedDelta(token.to_string()))?;
                edits.push(Edit::insert(&text));
            }
            op @ (b'-' | b'=') => {
                let n: usize = token[1..]
                    .parse()
                    .map_err(|_| Error::MalformedDelta(token.to_string()))?;
                let end = pointer + n;
                if end > chars.len() {
                    return Err(Error::DeltaLengthMismatch { covered: end, expected: chars.len() });
                }
                let kind = if op == b'=' { EditKind::Equal } else { EditKind::Delete };
                edits.push(Edit::from_chars(kind, chars[pointer..end].to_vec()));
                pointer = end;
            }
            _ => return Err(Error::MalformedDelta(token.to_string())),
        }
    }

    if pointer != chars.len() {
        return Err(Error::DeltaLengthMismatch { covered: pointer, expected: chars.len() });
    }
    Ok(edits)
}

/// `pup diff` entry point.
pub fn run(args: &DiffArgs, ctx: &AppContext) -> CliResult<()> {
    let cfg = load_config()?;
    let old = fs::read_to_string(&args.old)
        .with_context(|| format!("read {}", args.old.display()))?;
    let new = fs::read_to_string(&args.new)
        .with_context(|| format!("read {}", args.new.display()))?;

    let mut diff_config = cfg.diff_config();
    if let Some(timeout) = args.timeout {
        diff_config.timeout_secs = timeout;
    }
    if let Some(edit_cost) = args.edit_cost {
        diff_config.edit_cost = edit_cost;
    }

    let engine = DiffEngine::new(diff_config);
    let mut edits = engine.diff(&old, &new, !args.no_line_mode);
    if !args.raw {
        cleanup_semantic(&mut edits);
    }

    match args.format {
        DiffFormat::Text => render_terminal(&edits, ctx),
        DiffFormat::Delta => println!("{}", to_delta(&edits)),
        DiffFormat::Html => println!("{}", pretty_html(&edits)),
    }
    Ok(())
}

fn render_terminal(edits: &[Edit], ctx: &AppContext) {
    let mut out = String::new();
    for edit in edits {
        let text = edit.text();
        match edit.kind {
            EditKind::Equal => out.push_str(&text),
            EditKind::Insert => {
                if ctx.no_color {
                    let _ = write!(out, "{{+{text}+}}");
                } else {
                    let _ = write!(out, "{}", text.green());
                }
            }
            EditKind::Delete => {
                if ctx.no_color {
                    let _ = write!(out, "{{-{text}-}}");
                } else {
                    let _ = write!(out, "{}", text.red().strikethrough());
                }
            }
        }
    }
    print!("{out}");
    if !out.ends_with('\n') {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(s: &str) -> Edit {
        Edit::equal(s)
    }
    fn del(s: &str) -> Edit {
        Edit::delete(s)
    }
    fn ins(s: &str) -> Edit {
        Edit::insert(s)
    }

    fn engine() -> DiffEngine {
        DiffEngine::default()
    }

    fn no_timeout_engine() -> DiffEngine {
        DiffEngine::new(DiffConfig { timeout_secs: 0.0, edit_cost: 4 })
    }

    fn half_match(a: &str, b: &str) -> Option<(String, String, String, String, String)> {
        engine()
            .half_match(&to_chars(a), &to_chars(b))
            .map(|hm| {
                (
                    from_chars(&hm.a_prefix),
                    from_chars(&hm.a_suffix),
                    from_chars(&hm.b_prefix),
                    from_chars(&hm.b_suffix),
                    from_chars(&hm.common),
                )
            })
    }

    fn owned(parts: (&str, &str, &str, &str, &str)) -> (String, String, String, String, String) {
        (
            parts.0.to_string(),
            parts.1.to_string(),
            parts.2.to_string(),
            parts.3.to_string(),
            parts.4.to_string(),
        )
    }

    #[test]
    fn half_match_no_match() {
        assert_eq!(half_match("1234567890", "abcdef"), None);
        assert_eq!(half_match("12345", "23"), None);
    }

    #[test]
    fn half_match_single() {
        assert_eq!(
            half_match("1234567890", "a345678z"),
            Some(owned(("12", "90", "a", "z", "345678")))
        );
        assert_eq!(
            half_match("a345678z", "1234567890"),
            Some(owned(("a", "z", "12", "90", "345678")))
        );
        assert_eq!(
            half_match("abc56789z", "1234567890"),
            Some(owned(("abc", "z", "1234", "0", "56789")))
        );
        assert_eq!(
            half_match("a23456xyz", "1234567890"),
            Some(owned(("a", "xyz", "1", "7890", "23456")))
        );
    }

    #[test]
    fn half_match_multiple() {
        assert_eq!(
            half_match("121231234123451234123121", "a1234123451234z"),
            Some(owned(("12123", "123121", "a", "z", "1234123451234")))
        );
    }

    #[test]
    fn half_match_non_optimal() {
        // Optimal diff would be -q+x=H-i+e=lloHe+Hu=llo-Hew+y, not this.
        assert_eq!(
            half_match("qHilloHelloHew", "xHelloHeHulloy"),
            Some(owned(("qHillo", "w", "x", "Hulloy", "HelloHe")))
        );
    }

    #[test]
    fn half_match_disabled_without_timeout() {
        let eng = no_timeout_engine();
        assert!(
            eng.half_match(&to_chars("qHilloHelloHew"), &to_chars("xHelloHeHulloy"))
                .is_none()
        );
    }

    #[test]
    fn cleanup_merge_null() {
        let mut edits = Vec::new();
        cleanup_merge(&mut edits);
        assert!(edits.is_empty());
    }

    #[test]
    fn cleanup_merge_no_change() {
        let mut edits = vec![eq("a"), del("b"), ins("c")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![eq("a"), del("b"), ins("c")]);
    }

    #[test]
    fn cleanup_merge_coalesces_runs() {
        let mut edits = vec![eq("a"), eq("b"), eq("c")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![eq("abc")]);

        let mut edits = vec![del("a"), del("b"), del("c")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![del("abc")]);

        let mut edits = vec![ins("a"), ins("b"), ins("c")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![ins("abc")]);
    }

    #[test]
    fn cleanup_merge_interleaved() {
        let mut edits = vec![del("a"), ins("b"), del("c"), ins("d"), eq("e"), eq("f")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![del("ac"), ins("bd"), eq("ef")]);
    }

    #[test]
    fn cleanup_merge_factors_prefix_and_suffix() {
        let mut edits = vec![del("a"), ins("abc"), del("dc")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![eq("a"), del("d"), ins("b"), eq("c")]);

        let mut edits = vec![eq("x"), del("a"), ins("abc"), del("dc"), eq("y")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![eq("xa"), del("d"), ins("b"), eq("cy")]);
    }

    #[test]
    fn cleanup_merge_slides_edits() {
        let mut edits = vec![eq("a"), ins("ba"), eq("c")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![ins("ab"), eq("ac")]);

        let mut edits = vec![eq("c"), ins("ab"), eq("a")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![eq("ca"), ins("ba")]);

        let mut edits = vec![eq("a"), del("b"), eq("c"), del("ac"), eq("x")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![del("abc"), eq("acx")]);

        let mut edits = vec![eq("x"), del("ca"), eq("c"), del("b"), eq("a")];
        cleanup_merge(&mut edits);
        assert_eq!(edits, vec![eq("xca"), del("cba")]);
    }

    #[test]
    fn cleanup_merge_is_idempotent() {
        let mut edits = vec![eq("a"), ins("ba"), eq("c")];
        cleanup_merge(&mut edits);
        let once = edits.clone();
        cleanup_merge(&mut edits);
        assert_eq!(edits, once);
    }

    #[test]
    fn cleanup_semantic_null() {
        let mut edits = Vec::new();
        cleanup_semantic(&mut edits);
        assert!(edits.is_empty());
    }

    #[test]
    fn cleanup_semantic_no_elimination() {
        let mut edits = vec![del("ab"), ins("cd"), eq("12"), del("e")];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![del("ab"), ins("cd"), eq("12"), del("e")]);

        let mut edits = vec![del("abc"), ins("ABC"), eq("1234"), del("wxyz")];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![del("abc"), ins("ABC"), eq("1234"), del("wxyz")]);
    }

    #[test]
    fn cleanup_semantic_simple_elimination() {
        let mut edits = vec![del("a"), eq("b"), del("c")];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![del("abc"), ins("b")]);
    }

    #[test]
    fn cleanup_semantic_backpass_elimination() {
        let mut edits = vec![del("ab"), eq("cd"), del("e"), eq("f"), ins("g")];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![del("abcdef"), ins("cdfg")]);
    }

    #[test]
    fn cleanup_semantic_multiple_eliminations() {
        let mut edits = vec![
            ins("1"),
            eq("A"),
            del("B"),
            ins("2"),
            eq("_"),
            ins("1"),
            eq("A"),
            del("B"),
            ins("2"),
        ];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![del("AB_AB"), ins("1A2_1A2")]);
    }

    #[test]
    fn cleanup_semantic_word_boundaries() {
        let mut edits = vec![eq("The c"), del("ow and the c"), eq("at.")];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![eq("The "), del("cow and the "), eq("cat.")]);
    }

    #[test]
    fn cleanup_semantic_overlap_eliminations() {
        let mut edits = vec![del("abcxx"), ins("xxdef")];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![del("abcxx"), ins("xxdef")]);

        let mut edits = vec![del("abcxxx"), ins("xxxdef")];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![del("abc"), eq("xxx"), ins("def")]);

        let mut edits = vec![del("xxxabc"), ins("defxxx")];
        cleanup_semantic(&mut edits);
        assert_eq!(edits, vec![ins("def"), eq("xxx"), del("abc")]);

        let mut edits = vec![
            del("abcd1212"),
            ins("1212efghi"),
            eq("----"),
            del("A3"),
            ins("3BC"),
        ];
        cleanup_semantic(&mut edits);
        assert_eq!(
            edits,
            vec![
                del("abcd"),
                eq("1212"),
                ins("efghi"),
                eq("----"),
                del("A"),
                eq("3"),
                ins("BC"),
            ]
        );
    }

    #[test]
    fn lossless_null() {
        let mut edits = Vec::new();
        cleanup_semantic_lossless(&mut edits);
        assert!(edits.is_empty());
    }

    #[test]
    fn lossless_blank_lines() {
        let mut edits = vec![
            eq("AAA\r\n\r\nBBB"),
            ins("\r\nDDD\r\n\r\nBBB"),
            eq("\r\nEEE"),
        ];
        cleanup_semantic_lossless(&mut edits);
        assert_eq!(
            edits,
            vec![
                eq("AAA\r\n\r\n"),
                ins("BBB\r\nDDD\r\n\r\n"),
                eq("BBB\r\nEEE"),
            ]
        );
    }

    #[test]
    fn lossless_line_boundaries() {
        let mut edits = vec![eq("AAA\r\nBBB"), ins(" DDD\r\nBBB"), eq(" EEE")];
        cleanup_semantic_lossless(&mut edits);
        assert_eq!(edits, vec![eq("AAA\r\n"), ins("BBB DDD\r\n"), eq("BBB EEE")]);
    }

    #[test]
    fn lossless_word_boundaries() {
        let mut edits = vec![eq("The c"), ins("ow and the c"), eq("at.")];
        cleanup_semantic_lossless(&mut edits);
        assert_eq!(edits, vec![eq("The "), ins("cow and the "), eq("cat.")]);
    }

    #[test]
    fn lossless_alphanumeric_boundaries() {
        let mut edits = vec![eq("The-c"), ins("ow-and-the-c"), eq("at.")];
        cleanup_semantic_lossless(&mut edits);
        assert_eq!(edits, vec![eq("The-"), ins("cow-and-the-"), eq("cat.")]);
    }

    #[test]
    fn lossless_hitting_the_ends() {
        let mut edits = vec![eq("a"), del("a"), eq("ax")];
        cleanup_semantic_lossless(&mut edits);
        assert_eq!(edits, vec![del("a"), eq("aax")]);

        let mut edits = vec![eq("xa"), del("a"), eq("a")];
        cleanup_semantic_lossless(&mut edits);
        assert_eq!(edits, vec![eq("xaa"), del("a")]);
    }

    #[test]
    fn lossless_sentence_boundaries() {
        let mut edits = vec![eq("The xxx. The "), ins("zzz. The "), eq("yyy.")];
        cleanup_semantic_lossless(&mut edits);
        assert_eq!(edits, vec![eq("The xxx."), ins(" The zzz."), eq(" The yyy.")]);
    }

    #[test]
    fn efficiency_null() {
        let mut edits = Vec::new();
        engine().cleanup_efficiency(&mut edits);
        assert!(edits.is_empty());
    }

    #[test]
    fn efficiency_no_elimination() {
        let mut edits = vec![del("ab"), ins("12"), eq("wxyz"), del("cd"), ins("34")];
        engine().cleanup_efficiency(&mut edits);
        assert_eq!(edits, vec![del("ab"), ins("12"), eq("wxyz"), del("cd"), ins("34")]);
    }

    #[test]
    fn efficiency_four_edit_elimination() {
        let mut edits = vec![del("ab"), ins("12"), eq("xyz"), del("cd"), ins("34")];
        engine().cleanup_efficiency(&mut edits);
        assert_eq!(edits, vec![del("abxyzcd"), ins("12xyz34")]);
    }

    #[test]
    fn efficiency_three_edit_elimination() {
        let mut edits = vec![ins("12"), eq("x"), del("cd"), ins("34")];
        engine().cleanup_efficiency(&mut edits);
        assert_eq!(edits, vec![del("xcd"), ins("12x34")]);
    }

    #[test]
    fn efficiency_backpass_elimination() {
        let mut edits = vec![
            del("ab"),
            ins("12"),
            eq("xy"),
            ins("34"),
            eq("z"),
            del("cd"),
            ins("56"),
        ];
        engine().cleanup_efficiency(&mut edits);
        assert_eq!(edits, vec![del("abxyzcd"), ins("12xy34z56")]);
    }

    #[test]
    fn efficiency_high_cost_elimination() {
        let eng = DiffEngine::new(DiffConfig { timeout_secs: 1.0, edit_cost: 5 });
        let mut edits = vec![del("ab"), ins("12"), eq("wxyz"), del("cd"), ins("34")];
        eng.cleanup_efficiency(&mut edits);
        assert_eq!(edits, vec![del("abwxyzcd"), ins("12wxyz34")]);
    }

    #[test]
    fn diff_trivial_cases() {
        assert_eq!(engine().diff("", "", false), Vec::<Edit>::new());
        assert_eq!(engine().diff("abc", "abc", false), vec![eq("abc")]);
        assert_eq!(
            engine().diff("abc", "ab123c", false),
            vec![eq("ab"), ins("123"), eq("c")]
        );
        assert_eq!(
            engine().diff("a123bc", "abc", false),
            vec![eq("a"), del("123"), eq("bc")]
        );
    }

    #[test]
    fn diff_double_edits() {
        assert_eq!(
            engine().diff("abc", "a123b456c", false),
            vec![eq("a"), ins("123"), eq("b"), ins("456"), eq("c")]
        );
        assert_eq!(
            engine().diff("a123b456c", "abc", false),
            vec![eq("a"), del("123"), eq("b"), del("456"), eq("c")]
        );
    }

    #[test]
    fn diff_real_cases() {
        // Run with no timeout so the bisection is deterministic.
        let eng = no_timeout_engine();
        assert_eq!(eng.diff("a", "b", false), vec![del("a"), ins("b")]);
        assert_eq!(
            eng.diff("Apples are a fruit.", "Bananas are also fruit.", false),
            vec![
                del("Apple"),
                ins("Banana"),
                eq("s are a"),
                ins("lso"),
                eq(" fruit."),
            ]
        );
        assert_eq!(
            eng.diff("ax\t", "\u{680}x\0", false),
            vec![del("a"), ins("\u{680}"), eq("x"), del("\t"), ins("\0")]
        );
    }

    #[test]
    fn diff_overlaps() {
        let eng = no_timeout_engine();
        assert_eq!(
            eng.diff("1ayb2", "abxab", false),
            vec![del("1"), eq("a"), del("y"), eq("b"), del("2"), ins("xab")]
        );
        assert_eq!(
            eng.diff("abcy", "xaxcxabc", false),
            vec![ins("xaxcx"), eq("abc"), del("y")]
        );
        assert_eq!(
            eng.diff(
                "ABCDa=bcd=efghijklmnopqrsEFGHIJKLMNOefg",
                "a-bcd-efghijklmnopqrs",
                false
            ),
            vec![
                del("ABCD"),
                eq("a"),
                del("="),
                ins("-"),
                eq("bcd"),
                del("="),
                ins("-"),
                eq("efghijklmnopqrs"),
                del("EFGHIJKLMNOefg"),
            ]
        );
    }

    #[test]
    fn diff_large_equality() {
        let eng = no_timeout_engine();
        assert_eq!(
            eng.diff("a [[Pennsylvania]] and [[New", " and [[Pennsylvania]]", false),
            vec![ins(" "), eq("a"), ins("nd"), eq(" [[Pennsylvania]]"), del(" and [[New")]
        );
    }

    #[test]
    fn diff_reconstructs_both_texts() {
        let a = "The quick brown fox jumps over the lazy dog.";
        let b = "That quick brown fox jumped over a lazy dog.";
        let edits = engine().diff(a, b, false);
        assert_eq!(source_text(&edits), a);
        assert_eq!(target_text(&edits), b);
    }

    #[test]
    fn diff_timeout_degrades_to_coarse_script() {
        let timeout = 0.1f32;
        let eng = DiffEngine::new(DiffConfig { timeout_secs: timeout, edit_cost: 4 });
        let mut a = String::from(
            "`Twas brillig, and the slithy toves\nDid gyre and gimble in the wabe:\n\
             All mimsy were the borogoves,\nAnd the mome raths outgrabe.\n",
        );
        let mut b = String::from(
            "I am the very model of a modern major general,\n\
             I've information vegetable, animal, and mineral,\n\
             I know the kings of England, and I quote the fights historical,\n\
             From Marathon to Waterloo, in order categorical.\n",
        );
        // Double both until the bisection cannot possibly finish in time.
        for _ in 0..10 {
            a = format!("{a}{a}");
            b = format!("{b}{b}");
        }

        let start = Instant::now();
        let edits = eng.diff(&a, &b, false);
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_secs_f32(timeout));
        // Loose ceiling; the deadline is only checked once per bisection
        // step, so the overshoot is one step's work.
        assert!(elapsed < Duration::from_secs_f32(timeout * 20.0));
        // The coarse script still reconstructs both texts.
        assert_eq!(source_text(&edits), a);
        assert_eq!(target_text(&edits), b);
    }

    #[test]
    fn diff_line_mode_matches_char_mode() {
        let a = "1234567890\n".repeat(13);
        let b = "abcdefghij\n".repeat(13);
        let eng = engine();
        let char_mode = eng.diff(&a, &b, false);
        let line_mode = eng.diff(&a, &b, true);
        assert_eq!(target_text(&char_mode), b);
        assert_eq!(target_text(&line_mode), b);
        assert_eq!(source_text(&line_mode), a);
    }

    #[test]
    fn diff_line_mode_overlap() {
        let a = "1234567890\n".repeat(13);
        let b = "abcdefghij\n1234567890\n1234567890\n1234567890\nabcdefghij\n1234567890\n\
                 1234567890\n1234567890\nabcdefghij\n";
        let eng = engine();
        let mut line_mode = eng.diff(&a, b, true);
        cleanup_semantic(&mut line_mode);
        assert_eq!(source_text(&line_mode), a);
        assert_eq!(target_text(&line_mode), b);
    }

    #[test]
    fn levenshtein_fixtures() {
        assert_eq!(levenshtein(&[del("abc"), ins("1234"), eq("xyz")]), 4);
        assert_eq!(levenshtein(&[eq("xyz"), del("abc"), ins("1234")]), 4);
        assert_eq!(levenshtein(&[del("abc"), eq("xyz"), ins("1234")]), 7);
    }

    #[test]
    fn x_index_fixtures() {
        assert_eq!(x_index(&[del("a"), ins("1234"), eq("xyz")], 2), 5);
        assert_eq!(x_index(&[eq("a"), del("1234"), eq("xyz")], 3), 1);
    }

    #[test]
    fn pretty_html_fixture() {
        let edits = vec![eq("a\n"), del("<B>b</B>"), ins("c&d")];
        assert_eq!(
            pretty_html(&edits),
            "<span>a&para;<br></span><del style=\"background:#ffe6e6;\">&lt;B&gt;b&lt;/B&gt;\
             </del><ins style=\"background:#e6ffe6;\">c&amp;d</ins>"
        );
    }

    #[test]
    fn delta_round_trip() {
        let edits = vec![
            eq("jump"),
            del("s"),
            ins("ed"),
            eq(" over "),
            del("the"),
            ins("a"),
            eq(" lazy"),
            ins("old dog"),
        ];
        let source = source_text(&edits);
        assert_eq!(source, "jumps over the lazy");
        let delta = to_delta(&edits);
        assert_eq!(delta, "=4\t-1\t+ed\t=6\t-3\t+a\t=5\t+old dog");
        assert_eq!(from_delta(&source, &delta), Ok(edits));
    }

    #[test]
    fn delta_length_mismatches() {
        let delta = "=4\t-1\t+ed\t=6\t-3\t+a\t=5\t+old dog";
        let long = format!("{}x", "jumps over the lazy");
        assert!(matches!(
            from_delta(&long, delta),
            Err(Error::DeltaLengthMismatch { .. })
        ));
        assert!(matches!(
            from_delta(&"jumps over the lazy"[1..], delta),
            Err(Error::DeltaLengthMismatch { .. })
        ));
    }

    #[test]
    fn delta_bad_tokens() {
        assert!(matches!(from_delta("", "x"), Err(Error::MalformedDelta(_))));
        assert!(matches!(from_delta("ab", "=x"), Err(Error::MalformedDelta(_))));
        assert!(matches!(from_delta("ab", "--1"), Err(Error::MalformedDelta(_))));
    }

    #[test]
    fn delta_unicode() {
        let edits = vec![
            eq("\u{680} \0 \t %"),
            del("\u{681} \u{1} \n ^"),
            ins("\u{682} \u{2} \\ |"),
        ];
        let source = source_text(&edits);
        let delta = to_delta(&edits);
        assert_eq!(delta, "=7\t-7\t+%DA%82 %02 %5C %7C");
        assert_eq!(from_delta(&source, &delta), Ok(edits));
    }

    #[test]
    fn delta_verbatim_specials() {
        let edits = vec![ins("A-Z a-z 0-9 - _ . ! ~ * ' ( ) ; / ? : @ & = + $ , # ")];
        let delta = to_delta(&edits);
        assert_eq!(delta, "+A-Z a-z 0-9 - _ . ! ~ * ' ( ) ; / ? : @ & = + $ , # ");
        assert_eq!(from_delta("", &delta), Ok(edits));
    }
}
