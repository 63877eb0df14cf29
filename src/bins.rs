//! Positional clustering of candidate primers into bins.

use crate::primer::Primer;
use std::collections::{BTreeMap, HashMap};

/// Span above which an overlap chain is re-partitioned by minimizer. Keeps
/// the pairwise cost of a bin-pair evaluation small and bounds the product
/// length variance within a bin.
const MAX_BIN_SPAN: usize = 64;

/// A non-empty group of positionally related primers on one contig.
#[derive(Debug, Clone)]
pub struct Bin {
    pub primers: Vec<Primer>,
}

impl Bin {
    pub fn left(&self) -> usize {
        self.primers.iter().map(Primer::start).min().unwrap_or(0)
    }

    pub fn right(&self) -> usize {
        self.primers.iter().map(Primer::end).max().unwrap_or(0)
    }

    fn span(&self) -> usize {
        self.right() - self.left()
    }
}

/// Walks a position-sorted primer list and chains overlapping genomic
/// windows into bins: a candidate starting at or past the chain's right
/// edge opens a new bin.
fn chain_overlaps(primers: &[Primer]) -> Vec<Bin> {
    let mut bins: Vec<Bin> = Vec::new();
    let mut prev_end: Option<usize> = None;

    for cand in primers {
        match prev_end {
            Some(end) if cand.start() < end => {
                prev_end = Some(end.max(cand.end()));
                bins.last_mut().unwrap().primers.push(cand.clone());
            }
            _ => {
                prev_end = Some(cand.end());
                bins.push(Bin { primers: vec![cand.clone()] });
            }
        }
    }
    bins
}

/// Replaces every oversized bin by the partition of its primers under "same
/// minimizer", classes ordered by minimizer value.
fn split_oversized(bins: Vec<Bin>, minimizer_len: usize) -> Vec<Bin> {
    let mut out = Vec::with_capacity(bins.len());
    for bin in bins {
        if bin.span() <= MAX_BIN_SPAN {
            out.push(bin);
            continue;
        }
        let mut classes: BTreeMap<Vec<u8>, Vec<Primer>> = BTreeMap::new();
        for primer in bin.primers {
            classes
                .entry(primer.minimizer(minimizer_len))
                .or_default()
                .push(primer);
        }
        out.extend(classes.into_values().map(|primers| Bin { primers }));
    }
    out
}

/// Bins one genome's candidates, per contig. Input lists must already be
/// sorted by start (ties widest first), as produced by the filter stage.
pub fn build_bins(
    primers_by_contig: &HashMap<String, Vec<Primer>>,
    minimizer_len: usize,
) -> HashMap<String, Vec<Bin>> {
    primers_by_contig
        .iter()
        .map(|(contig, primers)| {
            let bins = split_oversized(chain_overlaps(primers), minimizer_len);
            (contig.clone(), bins)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primer(seq: &[u8], start: usize) -> Primer {
        Primer::new(seq.to_vec(), "c1", start)
    }

    #[test]
    fn test_chain_overlaps() {
        // windows at 0..15, 8..23 overlap; 40..55 starts a new bin
        let primers = vec![
            primer(b"ACCAACACCAACCACC", 0),
            primer(b"CAACCACAACCAACAA", 8),
            primer(b"ACCAACACCAACCACC", 40),
        ];
        let bins = chain_overlaps(&primers);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].primers.len(), 2);
        assert_eq!(bins[0].left(), 0);
        assert_eq!(bins[0].right(), 23);
        assert_eq!(bins[1].left(), 40);
    }

    #[test]
    fn test_touching_windows_do_not_chain() {
        // second window starts exactly at the chain's right edge
        let primers = vec![
            primer(b"ACCAACACCAACCACC", 0),
            primer(b"CAACCACAACCAACAA", 15),
        ];
        assert_eq!(chain_overlaps(&primers).len(), 2);
    }

    #[test]
    fn test_chain_keeps_running_maximum_end() {
        // a long window followed by a short nested one: the chain edge must
        // stay at the long window's end
        let primers = vec![
            primer(b"ACCAACACCAACCACCAA", 0), // ends at 17
            primer(b"CCAACACCAACCACCA", 1),   // ends at 16
            primer(b"CAACCACAACCAACAA", 17),  // past the edge: new bin
        ];
        let bins = chain_overlaps(&primers);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].right(), 17);
    }

    #[test]
    fn test_split_oversized_by_minimizer() {
        // one chain spanning > 64 positions
        let mut primers = Vec::new();
        for start in (0..80).step_by(8) {
            primers.push(primer(b"ACCAACACCAACCACC", start));
        }
        let chained = chain_overlaps(&primers);
        assert_eq!(chained.len(), 1);
        assert!(chained[0].span() > MAX_BIN_SPAN);

        let split = split_oversized(chained, 8);
        // identical sequences share a minimizer: one class with every primer
        assert_eq!(split.len(), 1);
        assert_eq!(split[0].primers.len(), 10);

        // distinct sequences with distinct minimizers split apart
        let mixed = vec![
            Bin {
                primers: vec![
                    primer(b"ACCAACACCAACCACC", 0),
                    primer(b"CACCAACCAAACCAAC", 70),
                ],
            },
        ];
        let split = split_oversized(mixed, 8);
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn test_small_bins_left_alone() {
        let bins = vec![Bin { primers: vec![primer(b"ACCAACACCAACCACC", 5)] }];
        let split = split_oversized(bins.clone(), 8);
        assert_eq!(split.len(), 1);
        assert_eq!(split[0].primers.len(), 1);
        assert_eq!(split[0].left(), bins[0].left());
    }
}
