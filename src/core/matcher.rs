//! Fuzzy substring search.
//!
//! Bitap with the Wu-Manber error extension: the pattern is compiled to one
//! bitmask per char and candidate matches are scored by a weighted sum of
//! edit errors and distance from the expected location.

use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result as CliResult, bail};
use tracing::debug;

use crate::cli::{AppContext, FindArgs};
use crate::core::error::{Error, Result};
use crate::core::text::{self, to_chars};
use crate::infra::config::load_config;

/// Tuning knobs for fuzzy matching.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// Score at or below which a candidate counts as a match. 0.0 demands
    /// perfection, 1.0 accepts nearly anything.
    pub threshold: f64,
    /// How far from the expected location a match may stray, in chars, before
    /// proximity alone pushes its score past 1.0. Zero pins the location
    /// exactly.
    pub distance: usize,
    /// Word width of the bit-parallel scan; patterns longer than this are
    /// rejected. Zero lifts the rejection, but patterns past the machine
    /// word still only match exactly.
    pub max_bits: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self { threshold: 0.5, distance: 1000, max_bits: 64 }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidInput(format!(
                "match threshold {} outside 0.0..=1.0",
                self.threshold
            )));
        }
        if !(1..=64).contains(&self.max_bits) && self.max_bits != 0 {
            return Err(Error::InvalidInput(format!(
                "match max_bits {} outside 1..=64",
                self.max_bits
            )));
        }
        Ok(())
    }
}

/// Fuzzy matcher. Cheap to construct; holds only configuration.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    pub config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Locate `pattern` in `text` near `loc`, fuzzily.
    ///
    /// Returns the best match position, or `None` when nothing scores under
    /// the threshold.
    pub fn find(&self, text: &str, pattern: &str, loc: usize) -> Result<Option<usize>> {
        self.find_chars(&to_chars(text), &to_chars(pattern), loc)
    }

    pub(crate) fn find_chars(
        &self,
        text: &[char],
        pattern: &[char],
        loc: usize,
    ) -> Result<Option<usize>> {
        let loc = loc.min(text.len());
        if text == pattern {
            // Shortcut covers the empty-equals-empty case too.
            return Ok(Some(0));
        }
        if text.is_empty() {
            return Ok(None);
        }
        if text.len() >= loc + pattern.len() && text[loc..loc + pattern.len()] == *pattern {
            // Perfect match at the expected location.
            return Ok(Some(loc));
        }
        self.bitap(text, pattern, loc)
    }

    fn bitap(&self, text: &[char], pattern: &[char], loc: usize) -> Result<Option<usize>> {
        if self.config.max_bits != 0 && pattern.len() > self.config.max_bits {
            return Err(Error::PatternTooLong {
                len: pattern.len(),
                max_bits: self.config.max_bits,
            });
        }
        if pattern.len() > 64 {
            // Uncapped window: the scan state is still one u64, so longer
            // patterns are only found by the exact shortcuts upstream.
            return Ok(None);
        }
        let alphabet = alphabet(pattern);
        let pattern_len = pattern.len();
        let text_len = text.len();
        // find_chars rules out the empty pattern before we get here.
        let match_mask = 1u64 << (pattern_len - 1);

        // Exact matches on either side of loc lower the score to beat.
        let mut score_threshold = self.config.threshold;
        let mut best_loc = text::find_from(text, pattern, loc);
        if let Some(found) = best_loc {
            score_threshold = self.score(0, found, loc, pattern_len).min(score_threshold);
            if let Some(found) = text::rfind(&text[..(loc + pattern_len).min(text_len)], pattern) {
                score_threshold = self.score(0, found, loc, pattern_len).min(score_threshold);
                best_loc = Some(found);
            }
        }

        let mut best = None;
        let mut bin_max = pattern_len + text_len;
        let mut last_rd: Vec<u64> = Vec::new();
        for d in 0..pattern_len {
            // Widest radius at which a match with d errors could still score
            // under the threshold, by binary search.
            let mut bin_min = 0;
            let mut bin_mid = bin_max;
            while bin_min < bin_mid {
                if self.score(d, loc + bin_mid, loc, pattern_len) <= score_threshold {
                    bin_min = bin_mid;
                } else {
                    bin_max = bin_mid;
                }
                bin_mid = (bin_max - bin_min) / 2 + bin_min;
            }
            bin_max = bin_mid;

            let mut start = loc.saturating_sub(bin_mid) + 1;
            let finish = (loc + bin_mid).min(text_len) + pattern_len;
            let mut rd = vec![0u64; finish + 2];
            rd[finish + 1] = (1u64 << d) - 1;
            let mut j = finish;
            while j >= start {
                let char_match = if text_len <= j - 1 {
                    // Past the end of the text.
                    0
                } else {
                    alphabet.get(&text[j - 1]).copied().unwrap_or(0)
                };
                rd[j] = if d == 0 {
                    (rd[j + 1].wrapping_shl(1) | 1) & char_match
                } else {
                    ((rd[j + 1].wrapping_shl(1) | 1) & char_match)
                        | ((last_rd[j + 1] | last_rd[j]).wrapping_shl(1) | 1)
                        | last_rd[j + 1]
                };
                if rd[j] & match_mask != 0 {
                    let score = self.score(d, j - 1, loc, pattern_len);
                    // Errors only grow from here; equal scores keep the
                    // earlier (closer) hit.
                    if score <= score_threshold {
                        score_threshold = score;
                        best = Some(j - 1);
                        best_loc = best;
                        if j - 1 > loc {
                            // Match is after loc; the window left of it may
                            // hide a closer one.
                            start = 1.max((2 * loc).saturating_sub(j - 1));
                        } else {
                            break;
                        }
                    }
                }
                j -= 1;
            }
            // One more error everywhere can't beat the current best.
            if self.score(d + 1, loc, loc, pattern_len) > score_threshold {
                break;
            }
            last_rd = rd;
        }
        debug!(?best, exact = ?best_loc, "bitap scan finished");
        Ok(best)
    }

    /// Weighted match score: error rate plus proximity penalty, lower is
    /// better.
    fn score(&self, errors: usize, candidate: usize, loc: usize, pattern_len: usize) -> f64 {
        let accuracy = errors as f64 / pattern_len as f64;
        let proximity = loc.abs_diff(candidate);
        if self.config.distance == 0 {
            return if proximity == 0 { accuracy } else { 1.0 };
        }
        accuracy + proximity as f64 / self.config.distance as f64
    }
}

/// One bitmask per pattern char, bit i set when the char occurs at offset
/// `len - 1 - i`.
fn alphabet(pattern: &[char]) -> HashMap<char, u64> {
    let mut masks: HashMap<char, u64> = HashMap::new();
    let len = pattern.len();
    for (i, &c) in pattern.iter().enumerate() {
        *masks.entry(c).or_insert(0) |= 1u64 << (len - 1 - i);
    }
    masks
}

/// `pup find` entry point.
pub fn run(args: &FindArgs, _ctx: &AppContext) -> CliResult<()> {
    let cfg = load_config()?;
    let mut match_config = cfg.match_config();
    if let Some(threshold) = args.threshold {
        match_config.threshold = threshold;
    }
    if let Some(distance) = args.distance {
        match_config.distance = distance;
    }
    match_config.validate()?;

    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let matcher = Matcher::new(match_config);
    match matcher.find(&text, &args.pattern, args.loc)? {
        Some(index) => println!("{index}"),
        None => bail!("no acceptable match found"),
    }
    Ok(())
}
