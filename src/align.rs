//! Index alignment between two token sequences.
//!
//! [`diff_align`] maps positions of `a` to the positions of equal tokens in
//! `b`. Two methods are available: a Myers shortest edit script, which
//! handles many small changes well and can pair substituted tokens, and a
//! longest-matching-block matcher, which favours long identical stretches.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Alignment algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMethod {
    /// Myers O(ND) edit script.
    #[default]
    Myers,
    /// Recursive longest matching block.
    Matcher,
}

/// Alignment settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignOptions {
    /// Algorithm to use.
    pub method: AlignMethod,
    /// Myers only: pair deleted and inserted tokens of one change
    /// position-wise, as substitutions.
    pub map_differences: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffOp {
    Equal(usize, usize),
    Insert(usize),
    Delete(usize),
}

fn invalid(reason: &str) -> ConvertError {
    ConvertError::InvalidFormat {
        format: "token sequence",
        reason: reason.to_string(),
    }
}

/// Map indices of `a` to indices of `b`.
///
/// Both sequences must be non-empty and contain no empty tokens.
pub fn diff_align<S: AsRef<str>>(a: &[S], b: &[S], options: AlignOptions) -> Result<BTreeMap<usize, usize>> {
    if a.is_empty() || b.is_empty() {
        return Err(invalid("empty sequence given to diff_align"));
    }
    let a: Vec<&str> = a.iter().map(|t| t.as_ref()).collect();
    let b: Vec<&str> = b.iter().map(|t| t.as_ref()).collect();
    if a.iter().chain(b.iter()).any(|t| t.is_empty()) {
        return Err(invalid("partially empty sequence given to diff_align"));
    }

    Ok(match options.method {
        AlignMethod::Myers => from_edit_script(&myers(&a, &b), options.map_differences),
        AlignMethod::Matcher => matching_blocks(&a, &b)
            .into_iter()
            .flat_map(|(i, j, len)| (0..len).map(move |n| (i + n, j + n)))
            .collect(),
    })
}

fn from_edit_script(ops: &[DiffOp], map_differences: bool) -> BTreeMap<usize, usize> {
    let mut out = BTreeMap::new();
    let mut deleted = Vec::new();
    let mut inserted = Vec::new();

    let flush = |deleted: &mut Vec<usize>, inserted: &mut Vec<usize>, out: &mut BTreeMap<usize, usize>| {
        if map_differences {
            out.extend(deleted.iter().copied().zip(inserted.iter().copied()));
        }
        deleted.clear();
        inserted.clear();
    };

    for op in ops {
        match *op {
            DiffOp::Equal(i, j) => {
                flush(&mut deleted, &mut inserted, &mut out);
                out.insert(i, j);
            }
            DiffOp::Delete(i) => deleted.push(i),
            DiffOp::Insert(j) => inserted.push(j),
        }
    }
    flush(&mut deleted, &mut inserted, &mut out);
    out
}

/// Shortest edit script from `a` to `b`.
fn myers(a: &[&str], b: &[&str]) -> Vec<DiffOp> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (n + m) as usize;
    let offset = max as isize;
    let at = |k: isize| (k + offset) as usize;

    // v[k] = furthest x reached on diagonal k; one snapshot per round
    let mut v = vec![0isize; 2 * max + 2];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max as isize {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[at(k - 1)] < v[at(k + 1)]) {
                v[at(k + 1)]
            } else {
                v[at(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[at(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut ops = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[at(k - 1)] < v[at(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[at(prev_k)];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            ops.push(DiffOp::Equal((x - 1) as usize, (y - 1) as usize));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                ops.push(DiffOp::Insert((y - 1) as usize));
            } else {
                ops.push(DiffOp::Delete((x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }
    ops.reverse();
    ops
}

/// Matching blocks `(i, j, len)` in increasing order.
fn matching_blocks(a: &[&str], b: &[&str]) -> Vec<(usize, usize, usize)> {
    let mut b2j: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, token) in b.iter().enumerate() {
        b2j.entry(*token).or_default().push(j);
    }

    let mut blocks = Vec::new();
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, len) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if len > 0 {
            blocks.push((i, j, len));
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + len < ahi && j + len < bhi {
                queue.push((i + len, ahi, j + len, bhi));
            }
        }
    }
    blocks.sort_unstable();
    blocks
}

/// Longest block of equal tokens in `a[alo..ahi]` and `b[blo..bhi]`,
/// earliest in `a` (then `b`) among ties.
fn longest_match(
    a: &[&str],
    b2j: &HashMap<&str, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

    for (i, token) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next = HashMap::new();
        for &j in b2j.get(token).map(Vec::as_slice).unwrap_or_default() {
            if j < blo {
                continue;
            }
            if j >= bhi {
                break;
            }
            let len = j
                .checked_sub(1)
                .and_then(|prev| run_ending_at.get(&prev))
                .copied()
                .unwrap_or(0)
                + 1;
            next.insert(j, len);
            if len > best_len {
                best_i = i + 1 - len;
                best_j = j + 1 - len;
                best_len = len;
            }
        }
        run_ending_at = next;
    }
    (best_i, best_j, best_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn map(pairs: &[(usize, usize)]) -> BTreeMap<usize, usize> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_deletion_is_skipped() {
        let a = ["a", "b", "c", "d"];
        let b = ["a", "c", "d"];
        let expected = map(&[(0, 0), (2, 1), (3, 2)]);
        assert_eq!(diff_align(&a, &b, AlignOptions::default()).unwrap(), expected);
        let matcher = AlignOptions { method: AlignMethod::Matcher, ..Default::default() };
        assert_eq!(diff_align(&a, &b, matcher).unwrap(), expected);
    }

    #[test]
    fn test_substitutions_map_only_when_requested() {
        let a = ["the", "cat", "sat"];
        let b = ["the", "dog", "sat"];
        assert_eq!(diff_align(&a, &b, AlignOptions::default()).unwrap(), map(&[(0, 0), (2, 2)]));
        let mapped = AlignOptions { map_differences: true, ..Default::default() };
        assert_eq!(diff_align(&a, &b, mapped).unwrap(), map(&[(0, 0), (1, 1), (2, 2)]));
    }

    #[test]
    fn test_uneven_change_pairs_leading_tokens() {
        let a = ["x", "p", "q", "y"];
        let b = ["x", "r", "y"];
        let mapped = AlignOptions { map_differences: true, ..Default::default() };
        assert_eq!(diff_align(&a, &b, mapped).unwrap(), map(&[(0, 0), (1, 1), (3, 2)]));
    }

    #[test]
    fn test_insertions_shift_indices() {
        let a = ["a", "b"];
        let b = ["z", "a", "y", "b"];
        assert_eq!(diff_align(&a, &b, AlignOptions::default()).unwrap(), map(&[(0, 1), (1, 3)]));
    }

    #[test]
    fn test_matcher_prefers_long_block() {
        let a = ["a", "b", "c", "x", "a"];
        let b = ["a", "b", "c", "a"];
        let matcher = AlignOptions { method: AlignMethod::Matcher, ..Default::default() };
        assert_eq!(
            diff_align(&a, &b, matcher).unwrap(),
            map(&[(0, 0), (1, 1), (2, 2), (4, 3)])
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let empty: [&str; 0] = [];
        let err = diff_align(&empty, &["a"], AlignOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        let err = diff_align(&["a", ""], &["a"], AlignOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }
}
