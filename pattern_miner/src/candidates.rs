use std::{borrow::Borrow, collections::HashSet};

use tracing::debug;

use crate::Pattern;

/// Splices two equal-length patterns that differ in exactly one position `k`
/// into the two length+1 candidates
/// `p1[..k] ++ [p2[k], p1[k]] ++ p1[k+1..]` and
/// `p1[..k] ++ [p1[k], p2[k]] ++ p1[k+1..]`.
///
/// Returns `None` when the inputs are not combinable.
pub fn generate_candidate_pair(p1: &Pattern, p2: &Pattern) -> Option<(Pattern, Pattern)> {
    let a = p1.event_names();
    let b = p2.event_names();
    if a.len() != b.len() {
        return None;
    }

    let mut diff = a.iter().zip(b).enumerate().filter(|(_, (x, y))| x != y);
    let (k, _) = diff.next()?;
    if diff.next().is_some() {
        return None;
    }

    let splice = |first: &String, second: &String| {
        let mut names = Vec::with_capacity(a.len() + 1);
        names.extend_from_slice(&a[..k]);
        names.push(first.clone());
        names.push(second.clone());
        names.extend_from_slice(&a[k + 1..]);
        names
    };

    let c1 = Pattern::new(&splice(&b[k], &a[k]));
    let c2 = Pattern::new(&splice(&a[k], &b[k]));
    match (c1, c2) {
        (Ok(c1), Ok(c2)) => Some((c1, c2)),
        _ => {
            debug!(p1 = %p1, p2 = %p2, "candidate repeats an event, discarded");
            None
        }
    }
}

/// Union of all pairwise candidates of one frontier, de-duplicated by key.
///
/// Pairs are visited as `(i, j > i)` in frontier order with `c1` before `c2`;
/// the first occurrence of a key wins.
pub fn generate_candidates<P: Borrow<Pattern>>(frontier: &[P]) -> Vec<Pattern> {
    generate_candidates_capped(frontier, usize::MAX)
}

/// Like [`generate_candidates`], stopping once `max` distinct candidates exist.
pub fn generate_candidates_capped<P: Borrow<Pattern>>(frontier: &[P], max: usize) -> Vec<Pattern> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    'pairs: for (i, p1) in frontier.iter().enumerate() {
        for p2 in &frontier[i + 1..] {
            let Some((c1, c2)) = generate_candidate_pair(p1.borrow(), p2.borrow()) else {
                continue;
            };
            for candidate in [c1, c2] {
                if out.len() >= max {
                    debug!(max, "candidate cap reached");
                    break 'pairs;
                }
                if seen.insert(candidate.key()) {
                    out.push(candidate);
                }
            }
        }
    }

    out
}
