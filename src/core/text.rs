//! Code-point level text primitives.
//!
//! Every engine in this crate measures text in Unicode code points, so the
//! shared helpers all work on `&[char]` slices. Conversion to and from `&str`
//! happens once at the public API boundary.

/// Split a string into code points.
pub fn to_chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// Rebuild a string from code points.
pub fn from_chars(chars: &[char]) -> String {
    chars.iter().collect()
}

/// Number of code points common to the start of both slices.
///
/// Binary-search probing rather than a linear scan; slice equality on the
/// probed window is a memcmp, which beats per-char stepping on long prefixes.
pub fn common_prefix(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() || a[0] != b[0] {
        return 0;
    }
    let mut lo = 0;
    let mut hi = a.len().min(b.len());
    let mut mid = hi;
    let mut start = 0;
    while lo < mid {
        if a[start..mid] == b[start..mid] {
            lo = mid;
            start = lo;
        } else {
            hi = mid;
        }
        mid = (hi - lo) / 2 + lo;
    }
    mid
}

/// Number of code points common to the end of both slices.
pub fn common_suffix(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() || a[a.len() - 1] != b[b.len() - 1] {
        return 0;
    }
    let mut lo = 0;
    let mut hi = a.len().min(b.len());
    let mut mid = hi;
    let mut end = 0;
    while lo < mid {
        if a[a.len() - mid..a.len() - end] == b[b.len() - mid..b.len() - end] {
            lo = mid;
            end = lo;
        } else {
            hi = mid;
        }
        mid = (hi - lo) / 2 + lo;
    }
    mid
}

/// Length of the longest suffix of `a` that is a prefix of `b`.
///
/// Grows a candidate seed from a single char, jumping by the distance to the
/// next occurrence each round.
pub fn common_overlap(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Truncate to the shared window.
    let len = a.len().min(b.len());
    let a = &a[a.len() - len..];
    let b = &b[..len];
    if a == b {
        return len;
    }

    let mut best = 0;
    let mut length = 1;
    loop {
        if length > len {
            break;
        }
        let pattern = &a[len - length..];
        let Some(found) = find(b, pattern) else {
            break;
        };
        length += found;
        if found == 0 || a[len - length..] == b[..length] {
            best = length;
            length += 1;
        }
    }
    best
}

/// First occurrence of `needle` in `haystack`.
pub fn find(haystack: &[char], needle: &[char]) -> Option<usize> {
    find_from(haystack, needle, 0)
}

/// First occurrence of `needle` at or after `start`.
pub fn find_from(haystack: &[char], needle: &[char], start: usize) -> Option<usize> {
    if start > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(start);
    }
    haystack[start..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + start)
}

/// Last occurrence of `needle` in `haystack`.
pub fn rfind(haystack: &[char], needle: &[char]) -> Option<usize> {
    rfind_from(haystack, needle, 0)
}

/// Last occurrence of `needle` beginning at or after `start`.
pub fn rfind_from(haystack: &[char], needle: &[char], start: usize) -> Option<usize> {
    if start > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(haystack.len());
    }
    haystack[start..]
        .windows(needle.len())
        .rposition(|w| w == needle)
        .map(|i| i + start)
}
