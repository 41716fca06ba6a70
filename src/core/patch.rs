//! Fuzzy patching.
//!
//! Patches carry their own context, so they survive being applied to text
//! that has drifted from the original. Locations are re-found with the
//! bitap matcher and hunk bodies are re-aligned with a character diff when
//! the context no longer matches exactly.
//!
//! The wire format is unidiff-shaped but not unidiff: coordinates count code
//! points, not lines, and body text is percent-escaped.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::mem;
use std::sync::LazyLock;

use anyhow::{Context, Result as CliResult, bail};
use regex::Regex;
use serde_json::json;
use tracing::debug;

use crate::cli::{AppContext, ApplyArgs, MakeArgs};
use crate::core::diff::{
    DiffEngine, Edit, EditKind, cleanup_semantic, cleanup_semantic_lossless, levenshtein,
    source_chars, target_chars, x_index,
};
use crate::core::error::{Error, Result};
use crate::core::matcher::Matcher;
use crate::core::text::{self, from_chars, to_chars};
use crate::infra::config::load_config;
use crate::infra::escape::{escape, unescape};

/// Tuning knobs for the patch engine.
#[derive(Debug, Clone, Copy)]
pub struct PatchConfig {
    /// How bad a fuzzy-matched hunk may be before its deletion is refused.
    /// Same 0.0 (perfect) to 1.0 (anything) scale as the match threshold.
    pub delete_threshold: f64,
    /// Chars of context carried on each side of a hunk.
    pub margin: usize,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self { delete_threshold: 0.5, margin: 4 }
    }
}

/// One hunk: an edit script plus its coordinates in both texts.
///
/// `start1`/`length1` address the source text, `start2`/`length2` the target,
/// all in code points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub edits: Vec<Edit>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

// Zero-length ranges keep the unadjusted offset, matching unidiff's special
// case for pure insertions and deletions.
fn coords(start: usize, length: usize) -> String {
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        n => format!("{},{}", start + 1, n),
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            coords(self.start1, self.length1),
            coords(self.start2, self.length2)
        )?;
        for edit in &self.edits {
            let sign = match edit.kind {
                EditKind::Insert => '+',
                EditKind::Delete => '-',
                EditKind::Equal => ' ',
            };
            writeln!(f, "{sign}{}", escape(&edit.text()))?;
        }
        Ok(())
    }
}

/// An ordered list of hunks, the unit of serialization and application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    pub patches: Vec<Patch>,
}

impl fmt::Display for PatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for patch in &self.patches {
            write!(f, "{patch}")?;
        }
        Ok(())
    }
}

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@$").unwrap());

fn parse_coords(
    start: Option<regex::Match<'_>>,
    length: Option<regex::Match<'_>>,
    line: &str,
) -> Result<(usize, usize)> {
    let err = || Error::MalformedPatchHeader(line.to_string());
    let start: usize = start.ok_or_else(err)?.as_str().parse().map_err(|_| err())?;
    Ok(match length {
        None => (start.checked_sub(1).ok_or_else(err)?, 1),
        Some(l) if l.as_str() == "0" => (start, 0),
        Some(l) => {
            let n = l.as_str().parse().map_err(|_| err())?;
            (start.checked_sub(1).ok_or_else(err)?, n)
        }
    })
}

impl PatchSet {
    /// Parse the textual form back into hunks.
    pub fn parse(text: &str) -> Result<Self> {
        let mut patches = Vec::new();
        let lines: Vec<&str> = text.lines().collect();
        let mut i = 0;
        while i < lines.len() {
            if lines[i].is_empty() {
                i += 1;
                continue;
            }
            let caps = HEADER_RE
                .captures(lines[i])
                .ok_or_else(|| Error::MalformedPatchHeader(lines[i].to_string()))?;
            let (start1, length1) = parse_coords(caps.get(1), caps.get(2), lines[i])?;
            let (start2, length2) = parse_coords(caps.get(3), caps.get(4), lines[i])?;
            let mut patch = Patch { edits: Vec::new(), start1, start2, length1, length2 };
            i += 1;
            while i < lines.len() {
                let line = lines[i];
                let Some(sign) = line.chars().next() else {
                    i += 1;
                    continue;
                };
                let kind = match sign {
                    '+' => EditKind::Insert,
                    '-' => EditKind::Delete,
                    ' ' => EditKind::Equal,
                    '@' => break,
                    _ => return Err(Error::MalformedPatchBody(line.to_string())),
                };
                let body = unescape(&line[sign.len_utf8()..])
                    .map_err(|_| Error::MalformedPatchBody(line.to_string()))?;
                patch.edits.push(Edit::from_chars(kind, to_chars(&body)));
                i += 1;
            }
            patches.push(patch);
        }
        Ok(Self { patches })
    }
}

/// What to build a patch set from.
///
/// `Texts` diffs for you; the other two take a precomputed script, with or
/// without the source text it was computed from.
pub enum PatchSource<'a> {
    Texts(&'a str, &'a str),
    Edits(&'a [Edit]),
    TextAndEdits(&'a str, &'a [Edit]),
}

/// Builds and applies patch sets. Composes the diff engine and the matcher;
/// their configs ride along.
#[derive(Debug, Clone, Default)]
pub struct PatchEngine {
    pub config: PatchConfig,
    pub diff: DiffEngine,
    pub matcher: Matcher,
}

impl PatchEngine {
    pub fn new(config: PatchConfig, diff: DiffEngine, matcher: Matcher) -> Self {
        Self { config, diff, matcher }
    }

    /// Build a patch set from any of the three source conventions.
    pub fn build(&self, source: PatchSource<'_>) -> PatchSet {
        let patches = match source {
            PatchSource::Texts(a, b) => {
                let a_chars = to_chars(a);
                let mut edits = self.diff.diff_chars(&a_chars, &to_chars(b), true);
                if edits.len() > 2 {
                    cleanup_semantic(&mut edits);
                    self.diff.cleanup_efficiency(&mut edits);
                }
                self.make(&a_chars, &edits)
            }
            PatchSource::Edits(edits) => self.make(&source_chars(edits), edits),
            PatchSource::TextAndEdits(a, edits) => self.make(&to_chars(a), edits),
        };
        PatchSet { patches }
    }

    /// Chop an edit script into hunks with rolling context.
    fn make(&self, source: &[char], edits: &[Edit]) -> Vec<Patch> {
        let mut patches = Vec::new();
        if edits.is_empty() {
            return patches;
        }
        let margin = self.config.margin;
        let mut patch = Patch::default();
        let mut char_count1 = 0;
        let mut char_count2 = 0;
        // Context is rolling: each hunk's coordinates assume every earlier
        // hunk has already been applied.
        let mut pre_patch: Vec<char> = source.to_vec();
        let mut post_patch: Vec<char> = source.to_vec();

        for (i, edit) in edits.iter().enumerate() {
            if patch.edits.is_empty() && edit.kind != EditKind::Equal {
                patch.start1 = char_count1;
                patch.start2 = char_count2;
            }
            match edit.kind {
                EditKind::Insert => {
                    patch.edits.push(edit.clone());
                    patch.length2 += edit.chars.len();
                    post_patch.splice(char_count2..char_count2, edit.chars.iter().copied());
                }
                EditKind::Delete => {
                    patch.length1 += edit.chars.len();
                    patch.edits.push(edit.clone());
                    post_patch.drain(char_count2..char_count2 + edit.chars.len());
                }
                EditKind::Equal => {
                    if edit.chars.len() <= 2 * margin
                        && !patch.edits.is_empty()
                        && i + 1 != edits.len()
                    {
                        // Small equality in the middle of a hunk.
                        patch.edits.push(edit.clone());
                        patch.length1 += edit.chars.len();
                        patch.length2 += edit.chars.len();
                    }
                    if edit.chars.len() >= 2 * margin && !patch.edits.is_empty() {
                        // Enough room for full context on both sides.
                        self.add_context(&mut patch, &pre_patch);
                        patches.push(mem::take(&mut patch));
                        pre_patch = post_patch.clone();
                        char_count1 = char_count2;
                    }
                }
            }
            if edit.kind != EditKind::Insert {
                char_count1 += edit.chars.len();
            }
            if edit.kind != EditKind::Delete {
                char_count2 += edit.chars.len();
            }
        }
        if !patch.edits.is_empty() {
            self.add_context(&mut patch, &pre_patch);
            patches.push(patch);
        }
        patches
    }

    /// Grow a hunk's context until it identifies a unique spot in `text`.
    fn add_context(&self, patch: &mut Patch, text: &[char]) {
        if text.is_empty() {
            return;
        }
        let margin = self.config.margin;
        let max_bits = self.matcher.config.max_bits;
        let mut pattern = text[patch.start2..patch.start2 + patch.length1].to_vec();
        let mut padding = 0;
        while text::find(text, &pattern) != text::rfind(text, &pattern)
            && (max_bits == 0 || pattern.len() < max_bits.saturating_sub(2 * margin))
        {
            padding += margin;
            let start = patch.start2.saturating_sub(padding);
            let end = (patch.start2 + patch.length1 + padding).min(text.len());
            pattern = text[start..end].to_vec();
        }
        // One margin beyond the unique window.
        padding += margin;

        let prefix = &text[patch.start2.saturating_sub(padding)..patch.start2];
        if !prefix.is_empty() {
            patch.edits.insert(0, Edit::from_chars(EditKind::Equal, prefix.to_vec()));
        }
        let suffix_start = patch.start2 + patch.length1;
        let suffix = &text[suffix_start..(suffix_start + padding).min(text.len())];
        if !suffix.is_empty() {
            patch.edits.push(Edit::from_chars(EditKind::Equal, suffix.to_vec()));
        }
        // start1 == start2 held when the hunk opened, so both stay in range.
        patch.start1 -= prefix.len();
        patch.start2 -= prefix.len();
        patch.length1 += prefix.len() + suffix.len();
        patch.length2 += prefix.len() + suffix.len();
    }

    /// Split any hunk whose source span exceeds the matcher's bit width.
    /// No-op when the matcher is uncapped.
    pub fn split_max(&self, patches: &mut Vec<Patch>) {
        let patch_size = self.matcher.config.max_bits;
        if patch_size == 0 {
            return;
        }
        let margin = self.config.margin;
        let mut i = 0;
        while i < patches.len() {
            if patches[i].length1 <= patch_size {
                i += 1;
                continue;
            }
            let big = patches.remove(i);
            let mut start1 = big.start1;
            let mut start2 = big.start2;
            let mut edits: VecDeque<Edit> = big.edits.into();
            let mut pre_context: Vec<char> = Vec::new();

            while !edits.is_empty() {
                let mut patch = Patch {
                    start1: start1 - pre_context.len(),
                    start2: start2 - pre_context.len(),
                    ..Patch::default()
                };
                let mut empty = true;
                if !pre_context.is_empty() {
                    patch.length1 = pre_context.len();
                    patch.length2 = pre_context.len();
                    patch.edits.push(Edit::from_chars(EditKind::Equal, pre_context.clone()));
                }

                while patch.length1 < patch_size.saturating_sub(margin) {
                    let Some(mut edit) = edits.pop_front() else {
                        break;
                    };
                    match edit.kind {
                        EditKind::Insert => {
                            // Insertions never count against the span.
                            patch.length2 += edit.chars.len();
                            start2 += edit.chars.len();
                            empty = false;
                            patch.edits.push(edit);
                        }
                        EditKind::Delete
                            if patch.edits.len() == 1
                                && patch.edits[0].kind == EditKind::Equal
                                && edit.chars.len() > 2 * patch_size =>
                        {
                            // A huge deletion passes through in one chunk.
                            patch.length1 += edit.chars.len();
                            start1 += edit.chars.len();
                            empty = false;
                            patch.edits.push(edit);
                        }
                        _ => {
                            // Deletion or equality: take only what fits.
                            let take =
                                edit.chars.len().min(patch_size - patch.length1 - margin);
                            patch.length1 += take;
                            start1 += take;
                            if edit.kind == EditKind::Equal {
                                patch.length2 += take;
                                start2 += take;
                            } else {
                                empty = false;
                            }
                            patch
                                .edits
                                .push(Edit::from_chars(edit.kind, edit.chars[..take].to_vec()));
                            if take < edit.chars.len() {
                                edit.chars.drain(..take);
                                edits.push_front(edit);
                            }
                        }
                    }
                }

                // Head context for the next subpatch, tail context for this
                // one.
                let produced = target_chars(&patch.edits);
                pre_context = produced[produced.len().saturating_sub(margin)..].to_vec();
                let remaining = source_chars(edits.make_contiguous());
                let post_context = &remaining[..margin.min(remaining.len())];
                if !post_context.is_empty() {
                    patch.length1 += post_context.len();
                    patch.length2 += post_context.len();
                    match patch.edits.last_mut() {
                        Some(last) if last.kind == EditKind::Equal => {
                            last.chars.extend_from_slice(post_context);
                        }
                        _ => {
                            patch
                                .edits
                                .push(Edit::from_chars(EditKind::Equal, post_context.to_vec()));
                        }
                    }
                }

                if !empty {
                    patches.insert(i, patch);
                    i += 1;
                }
            }
        }
    }

    /// Pad every hunk so edits at the very ends of the text still have
    /// context to match against. Returns the padding used.
    pub fn add_padding(&self, patches: &mut [Patch]) -> Vec<char> {
        let padding: Vec<char> = (1..=self.config.margin as u32)
            .filter_map(char::from_u32)
            .collect();
        let margin = padding.len();
        for patch in patches.iter_mut() {
            patch.start1 += margin;
            patch.start2 += margin;
        }

        let Some(patch) = patches.first_mut() else {
            return padding;
        };
        if patch.edits.first().is_none_or(|e| e.kind != EditKind::Equal) {
            patch.edits.insert(0, Edit::from_chars(EditKind::Equal, padding.clone()));
            patch.start1 -= margin;
            patch.start2 -= margin;
            patch.length1 += margin;
            patch.length2 += margin;
        } else if let Some(first) = patch.edits.first_mut() {
            if margin > first.chars.len() {
                // Grow the leading equality to a full margin.
                let extra = margin - first.chars.len();
                let mut grown = padding[first.chars.len()..].to_vec();
                grown.extend_from_slice(&first.chars);
                first.chars = grown;
                patch.start1 -= extra;
                patch.start2 -= extra;
                patch.length1 += extra;
                patch.length2 += extra;
            }
        }

        let Some(patch) = patches.last_mut() else {
            return padding;
        };
        if patch.edits.last().is_none_or(|e| e.kind != EditKind::Equal) {
            patch.edits.push(Edit::from_chars(EditKind::Equal, padding.clone()));
            patch.length1 += margin;
            patch.length2 += margin;
        } else if let Some(last) = patch.edits.last_mut() {
            if margin > last.chars.len() {
                let extra = margin - last.chars.len();
                last.chars.extend_from_slice(&padding[..extra]);
                patch.length1 += extra;
                patch.length2 += extra;
            }
        }
        padding
    }

    /// Apply a patch set to `text`, fuzzily.
    ///
    /// Returns the patched text plus one applied/failed flag per hunk.
    /// Failed hunks leave their span untouched.
    pub fn apply(&self, patch_set: &PatchSet, text: &str) -> Result<(String, Vec<bool>)> {
        if patch_set.patches.is_empty() {
            return Ok((text.to_string(), Vec::new()));
        }
        let mut patches = patch_set.patches.clone();
        let null_padding = self.add_padding(&mut patches);
        let mut text: Vec<char> = null_padding
            .iter()
            .copied()
            .chain(text.chars())
            .chain(null_padding.iter().copied())
            .collect();
        self.split_max(&mut patches);

        let max_bits = self.matcher.config.max_bits;
        // Tracks how far the patched text has drifted from the hunk
        // coordinates as hunks succeed or fail.
        let mut delta: isize = 0;
        let mut results = Vec::with_capacity(patches.len());
        for patch in &patches {
            let expected_loc = (patch.start2 as isize + delta).max(0) as usize;
            let text1 = source_chars(&patch.edits);
            let mut end_loc = None;
            let start_loc = if max_bits != 0 && text1.len() > max_bits {
                // Oversized hunk: anchor on its head and tail separately.
                match self.matcher.find_chars(&text, &text1[..max_bits], expected_loc)? {
                    Some(sl) => {
                        end_loc = self.matcher.find_chars(
                            &text,
                            &text1[text1.len() - max_bits..],
                            expected_loc + text1.len() - max_bits,
                        )?;
                        match end_loc {
                            Some(el) if sl < el => Some(sl),
                            _ => None,
                        }
                    }
                    None => None,
                }
            } else {
                self.matcher.find_chars(&text, &text1, expected_loc)?
            };

            let Some(start_loc) = start_loc else {
                debug!(expected_loc, "hunk location not found, skipping");
                results.push(false);
                // Keep later coordinates honest about the missed change.
                delta -= patch.length2 as isize - patch.length1 as isize;
                continue;
            };

            results.push(true);
            delta = start_loc as isize - expected_loc as isize;
            let text2: Vec<char> = match end_loc {
                None => text[start_loc..(start_loc + text1.len()).min(text.len())].to_vec(),
                Some(el) => text[start_loc..(el + max_bits).min(text.len())].to_vec(),
            };

            if text1 == text2 {
                // Perfect match: splice in the target text wholesale.
                let produced = target_chars(&patch.edits);
                text.splice(start_loc..start_loc + text1.len(), produced);
                continue;
            }

            // Imperfect match: re-align each edit through a local diff.
            let mut diffs = self.diff.diff_chars(&text1, &text2, false);
            if max_bits != 0
                && text1.len() > max_bits
                && levenshtein(&diffs) as f64 / text1.len() as f64 > self.config.delete_threshold
            {
                // The drift is too large to trust a big deletion.
                if let Some(flag) = results.last_mut() {
                    *flag = false;
                }
                continue;
            }
            cleanup_semantic_lossless(&mut diffs);
            let mut index1 = 0;
            for edit in &patch.edits {
                if edit.kind != EditKind::Equal {
                    let index2 = x_index(&diffs, index1);
                    match edit.kind {
                        EditKind::Insert => {
                            let at = start_loc + index2;
                            text.splice(at..at, edit.chars.iter().copied());
                        }
                        EditKind::Delete => {
                            let end = start_loc + x_index(&diffs, index1 + edit.chars.len());
                            text.drain(start_loc + index2..end);
                        }
                        EditKind::Equal => {}
                    }
                }
                if edit.kind != EditKind::Delete {
                    index1 += edit.chars.len();
                }
            }
        }

        // Strip the padding back off.
        text.drain(..null_padding.len());
        text.truncate(text.len() - null_padding.len());
        Ok((from_chars(&text), results))
    }
}

/// `pup make` entry point.
pub fn run_make(args: &MakeArgs, _ctx: &AppContext) -> CliResult<()> {
    let cfg = load_config()?;
    let old = fs::read_to_string(&args.old)
        .with_context(|| format!("read {}", args.old.display()))?;
    let new = fs::read_to_string(&args.new)
        .with_context(|| format!("read {}", args.new.display()))?;

    let engine = PatchEngine::new(
        cfg.patch_config(),
        DiffEngine::new(cfg.diff_config()),
        Matcher::new(cfg.match_config()),
    );
    let patch_set = engine.build(PatchSource::Texts(&old, &new));
    match &args.output {
        Some(path) => fs::write(path, patch_set.to_string())
            .with_context(|| format!("write {}", path.display()))?,
        None => print!("{patch_set}"),
    }
    Ok(())
}

/// `pup apply` entry point.
pub fn run_apply(args: &ApplyArgs, ctx: &AppContext) -> CliResult<()> {
    let cfg = load_config()?;
    let match_config = cfg.match_config();
    match_config.validate()?;
    let patch_text = fs::read_to_string(&args.patch)
        .with_context(|| format!("read {}", args.patch.display()))?;
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;

    let patch_set = PatchSet::parse(&patch_text)?;
    let engine = PatchEngine::new(
        cfg.patch_config(),
        DiffEngine::new(cfg.diff_config()),
        Matcher::new(match_config),
    );
    let (patched, applied) = engine.apply(&patch_set, &text)?;

    if args.json {
        let report = json!({ "text": patched, "applied": applied });
        println!("{report}");
        return Ok(());
    }
    match &args.output {
        Some(path) => fs::write(path, &patched)
            .with_context(|| format!("write {}", path.display()))?,
        None => print!("{patched}"),
    }
    let failed = applied.iter().filter(|ok| !**ok).count();
    if failed > 0 {
        if !ctx.quiet {
            for (i, ok) in applied.iter().enumerate() {
                if !ok {
                    eprintln!("hunk {} failed to apply", i + 1);
                }
            }
        }
        bail!("{failed} of {} hunks failed to apply", applied.len());
    }
    Ok(())
}
