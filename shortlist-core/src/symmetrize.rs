//! Symmetrization utilities.

use crate::alignment::AlignResult;
use crate::errors::{ShortlistError, ShortlistResult};
use crate::parallel::{map_collect, DEFAULT_CHUNK_SIZE};
use crate::text::ParallelCorpus;
use crate::types::{Link, NULL_LINK};

/// Sorted `(source, target)` position pairs of one sentence pair.
pub type AlignmentSet = Vec<(Link, Link)>;

// up, down, left, right, then the diagonals
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

struct Grid {
    cols: usize,
    cells: Vec<bool>,
}

impl Grid {
    fn new(rows: usize, cols: usize) -> Self {
        Grid { cols, cells: vec![false; rows * cols] }
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> bool {
        self.cells[i * self.cols + j]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize) {
        self.cells[i * self.cols + j] = true;
    }
}

/// Symmetrize one sentence pair with the Moses "grow-diag-final-and"
/// heuristic.
///
/// `forward` has one entry per target position (a source index or
/// `NULL_LINK`), `reverse` one entry per source position.
///
/// Algorithm:
/// - A = forward ∩ reverse, U = forward ∪ reverse.
/// - Grow-diag: scan A in row-major order; for each point, visit its 8
///   neighbours in a fixed order and add any neighbour in U \ A with at
///   least one unaligned word. Repeat full scans until nothing is added.
/// - Final-and: add forward points (row-major) whose source and target are
///   both unaligned, then the same for reverse points.
///
/// Errors when an alignment has the wrong length or points outside the
/// sentence.
pub fn grow_diag_final_and_pair(
    forward: &[Link],
    reverse: &[Link],
    src_len: usize,
    tgt_len: usize,
) -> Result<AlignmentSet, String> {
    if forward.len() != tgt_len {
        return Err(format!(
            "forward alignment length ({}) != target length ({})",
            forward.len(),
            tgt_len
        ));
    }
    if reverse.len() != src_len {
        return Err(format!(
            "reverse alignment length ({}) != source length ({})",
            reverse.len(),
            src_len
        ));
    }

    let mut s_fw = Grid::new(src_len, tgt_len);
    for (j, &li) in forward.iter().enumerate() {
        if li != NULL_LINK {
            let i = li as usize;
            if i >= src_len {
                return Err(format!(
                    "forward index out of bounds: j={} -> i={} (src_len={})",
                    j, i, src_len
                ));
            }
            s_fw.set(i, j);
        }
    }
    let mut s_rev = Grid::new(src_len, tgt_len);
    for (i, &lj) in reverse.iter().enumerate() {
        if lj != NULL_LINK {
            let j = lj as usize;
            if j >= tgt_len {
                return Err(format!(
                    "reverse index out of bounds: i={} -> j={} (tgt_len={})",
                    i, j, tgt_len
                ));
            }
            s_rev.set(i, j);
        }
    }

    let mut a = Grid::new(src_len, tgt_len);
    let mut src_aligned = vec![false; src_len];
    let mut tgt_aligned = vec![false; tgt_len];
    for i in 0..src_len {
        for j in 0..tgt_len {
            if s_fw.get(i, j) && s_rev.get(i, j) {
                a.set(i, j);
                src_aligned[i] = true;
                tgt_aligned[j] = true;
            }
        }
    }

    let in_union = |i: usize, j: usize| s_fw.get(i, j) || s_rev.get(i, j);

    loop {
        let mut added = false;
        for i in 0..src_len {
            for j in 0..tgt_len {
                if !a.get(i, j) {
                    continue;
                }
                for &(di, dj) in &NEIGHBOURS {
                    let (ci, cj) = (i as isize + di, j as isize + dj);
                    if ci < 0 || cj < 0 || ci as usize >= src_len || cj as usize >= tgt_len {
                        continue;
                    }
                    let (i2, j2) = (ci as usize, cj as usize);
                    if !a.get(i2, j2)
                        && in_union(i2, j2)
                        && (!src_aligned[i2] || !tgt_aligned[j2])
                    {
                        a.set(i2, j2);
                        src_aligned[i2] = true;
                        tgt_aligned[j2] = true;
                        added = true;
                    }
                }
            }
        }
        if !added {
            break;
        }
    }

    for dir in [&s_fw, &s_rev] {
        for i in 0..src_len {
            for j in 0..tgt_len {
                if dir.get(i, j) && !a.get(i, j) && !src_aligned[i] && !tgt_aligned[j] {
                    a.set(i, j);
                    src_aligned[i] = true;
                    tgt_aligned[j] = true;
                }
            }
        }
    }

    let mut pairs = AlignmentSet::new();
    for i in 0..src_len {
        for j in 0..tgt_len {
            if a.get(i, j) {
                pairs.push((i as Link, j as Link));
            }
        }
    }
    Ok(pairs)
}

/// Symmetrize a whole corpus; skipped sentence pairs stay `None`.
pub fn grow_diag_final_and(
    forward: &AlignResult,
    reverse: &AlignResult,
    corpus: &ParallelCorpus,
) -> ShortlistResult<Vec<Option<AlignmentSet>>> {
    let n = corpus.n_pairs();
    if forward.links.len() != n || reverse.links.len() != n {
        return Err(ShortlistError::CorpusLengthMismatch {
            source_lines: forward.links.len(),
            target_lines: reverse.links.len(),
        });
    }
    map_collect(n, DEFAULT_CHUNK_SIZE, |s| symmetrize_sentence(forward, reverse, corpus, s))
        .into_iter()
        .collect()
}

/// Symmetrize sentence `s`; `None` when it took no part in training.
pub fn symmetrize_sentence(
    forward: &AlignResult,
    reverse: &AlignResult,
    corpus: &ParallelCorpus,
    s: usize,
) -> ShortlistResult<Option<AlignmentSet>> {
    let (Some((src, tgt)), Some(fwd), Some(rev)) =
        (corpus.pair(s), &forward.links[s], &reverse.links[s])
    else {
        return Ok(None);
    };
    grow_diag_final_and_pair(fwd, rev, src.len(), tgt.len())
        .map(Some)
        .map_err(|reason| ShortlistError::MalformedAlignment { sentence: s, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn symmetric_intersection_equals_union() {
        // Forward: for each target j, link to source i=j
        // Reverse: for each source i, link to target j=i
        let merged = grow_diag_final_and_pair(&[0, 1, 2], &[0, 1, 2], 3, 3).unwrap();
        assert_eq!(merged, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn asymmetric_grow_diag_then_final_and() {
        // forward: j=0->i=0, j=1->NULL, j=2->i=2
        // reverse: i=0->j=0, i=1->j=1, i=2->NULL
        // A = {(0,0)}, U = {(0,0), (1,1), (2,2)}
        // (1,1) grows off (0,0), then (2,2) off (1,1) within the same scan.
        let merged =
            grow_diag_final_and_pair(&[0, NULL_LINK, 2], &[0, 1, NULL_LINK], 3, 3).unwrap();
        assert_eq!(merged, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn final_and_prefers_forward_over_reverse() {
        // forward => {(1,0), (0,1)}, reverse => {(0,0), (1,1)}
        // Empty intersection, so growth does nothing. Final-and over the
        // forward points aligns every word and blocks the reverse points.
        let merged = grow_diag_final_and_pair(&[1, 0], &[0, 1], 2, 2).unwrap();
        assert_eq!(merged, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn growth_needs_an_unaligned_word() {
        // forward: j0->0, j1->0; reverse: i0->0, i1->1
        // A = {(0,0)}, U = {(0,0), (0,1), (1,1)}
        // (0,1) grows because target 1 is unaligned; (1,1) is a diagonal
        // neighbour with source 1 unaligned and grows too.
        let merged = grow_diag_final_and_pair(&[0, 0], &[0, 1], 2, 2).unwrap();
        assert_eq!(merged, vec![(0, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        assert!(grow_diag_final_and_pair(&[5], &[0], 1, 1).is_err());
        assert!(grow_diag_final_and_pair(&[0], &[3], 1, 1).is_err());
        assert!(grow_diag_final_and_pair(&[0, 0], &[0], 1, 1).is_err());
    }

    #[test]
    fn corpus_level_keeps_skipped_sentences() {
        let corpus = ParallelCorpus::from_plaintext("a b\n\nc\n", "x y\nz\nw\n").unwrap();
        let fwd = AlignResult {
            direction: crate::alignment::Direction::Forward,
            links: vec![Some(vec![0, 1]), None, Some(vec![0])],
            skipped: 1,
            log_likelihoods: vec![],
        };
        let rev = AlignResult {
            direction: crate::alignment::Direction::Reverse,
            links: vec![Some(vec![0, NULL_LINK]), None, Some(vec![0])],
            skipped: 1,
            log_likelihoods: vec![],
        };
        let merged = grow_diag_final_and(&fwd, &rev, &corpus).unwrap();
        assert_eq!(merged[0], Some(vec![(0, 0), (1, 1)]));
        assert_eq!(merged[1], None);
        assert_eq!(merged[2], Some(vec![(0, 0)]));

        let bad = AlignResult { links: vec![Some(vec![0, 9]), None, Some(vec![0])], ..fwd };
        let err = grow_diag_final_and(&bad, &rev, &corpus).unwrap_err();
        assert!(matches!(err, ShortlistError::MalformedAlignment { sentence: 0, .. }));
    }

    fn directional(len: usize, other: usize) -> impl Strategy<Value = Vec<Link>> {
        proptest::collection::vec(
            prop_oneof![
                1 => Just(NULL_LINK),
                4 => (0..other as Link),
            ],
            len,
        )
    }

    fn sentence_case() -> impl Strategy<Value = (usize, usize, Vec<Link>, Vec<Link>)> {
        (1usize..8, 1usize..8).prop_flat_map(|(sl, tl)| {
            (Just(sl), Just(tl), directional(tl, sl), directional(sl, tl))
        })
    }

    fn as_set(links: &[Link], forward: bool) -> Vec<(Link, Link)> {
        let mut v: Vec<_> = links
            .iter()
            .enumerate()
            .filter(|(_, &l)| l != NULL_LINK)
            .map(|(p, &l)| if forward { (l, p as Link) } else { (p as Link, l) })
            .collect();
        v.sort();
        v
    }

    proptest! {
        #[test]
        fn between_intersection_and_union((sl, tl, fwd, rev) in sentence_case()) {
            let merged = grow_diag_final_and_pair(&fwd, &rev, sl, tl).unwrap();
            let f = as_set(&fwd, true);
            let r = as_set(&rev, false);
            for p in f.iter().filter(|p| r.contains(p)) {
                prop_assert!(merged.contains(p));
            }
            for p in &merged {
                prop_assert!(f.contains(p) || r.contains(p));
            }
            prop_assert_eq!(&merged, &grow_diag_final_and_pair(&fwd, &rev, sl, tl).unwrap());
        }

        #[test]
        fn idempotent_on_symmetric_input(
            (sl, tl, perm) in (1usize..8, 1usize..8).prop_flat_map(|(sl, tl)| {
                (Just(sl), Just(tl), Just((0..tl as Link).collect::<Vec<_>>()).prop_shuffle())
            })
        ) {
            // a partial one-to-one matching, expressible in both directions
            let mut fwd = vec![NULL_LINK; tl];
            let mut rev = vec![NULL_LINK; sl];
            for (i, &j) in perm.iter().enumerate().take(sl.min(tl)) {
                if (i + j as usize) % 3 != 0 {
                    fwd[j as usize] = i as Link;
                    rev[i] = j;
                }
            }
            let merged = grow_diag_final_and_pair(&fwd, &rev, sl, tl).unwrap();
            prop_assert_eq!(merged, as_set(&fwd, true));
        }
    }
}
