//! Outgroup elimination: reject any pair that could amplify a disallowed
//! product length in an outgroup genome, and record the harmless products of
//! the pairs that remain.

use crate::args::Parameters;
use crate::fastx::GenomeSet;
use crate::kmers::{kmer_positions, KmerHasher};
use crate::primer::Primer;
use crate::seq::reverse_complement;
use crate::validate::DesignedPair;
use anyhow::{bail, Result};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

type PositionMap = HashMap<Vec<u8>, Vec<usize>, KmerHasher>;

/// Product lengths a primer pair could generate in one outgroup contig.
/// Both primers must bind: forward orientation first, then the reverse
/// orientation; a pair binding in neither yields no products.
fn contig_products(kmers: &PositionMap, fwd: &Primer, rev: &Primer) -> Vec<usize> {
    let mut products = Vec::new();

    let rev_binding = reverse_complement(rev.seq());
    if let (Some(f_starts), Some(r_starts)) = (kmers.get(fwd.seq()), kmers.get(&rev_binding)) {
        for &f in f_starts {
            for &r in r_starts {
                let len = r as i64 + rev.len() as i64 - f as i64;
                if len > 0 {
                    products.push(len as usize);
                }
            }
        }
        return products;
    }

    let fwd_binding = reverse_complement(fwd.seq());
    if let (Some(f_starts), Some(r_starts)) = (kmers.get(&fwd_binding), kmers.get(rev.seq())) {
        for &f in f_starts {
            for &r in r_starts {
                let len = f as i64 + fwd.len() as i64 - r as i64;
                if len > 0 {
                    products.push(len as usize);
                }
            }
        }
    }
    products
}

/// Screens every surviving pair against every outgroup genome. A single
/// disallowed product length rejects a pair outright; all other products
/// accumulate on the pair, per genome, as `(contig, length)` records.
pub fn remove_outgroup_pairs(
    outgroup: &GenomeSet,
    mut pairs: Vec<DesignedPair>,
    params: &Parameters,
) -> Result<Vec<DesignedPair>> {
    for (name, contigs) in outgroup {
        if pairs.is_empty() {
            break;
        }
        let starting = pairs.len();

        for contig in contigs {
            let kmers = kmer_positions(contig, params.min_len, params.max_len);

            // None marks a rejected pair; the table is shared read-only
            let verdicts: Vec<Option<BTreeSet<(String, usize)>>> = pairs
                .par_iter()
                .map(|pair| {
                    let mut found = BTreeSet::new();
                    for len in contig_products(&kmers, &pair.fwd, &pair.rev) {
                        if params.disallows(len) {
                            return None;
                        }
                        found.insert((contig.id.clone(), len));
                    }
                    Some(found)
                })
                .collect();

            pairs = pairs
                .into_iter()
                .zip(verdicts)
                .filter_map(|(mut pair, verdict)| {
                    let found = verdict?;
                    pair.outgroup.entry(name.clone()).or_default().extend(found);
                    Some(pair)
                })
                .collect();
        }

        log::debug!(
            "removed {} pairs after processing {} ({} pairs remaining)",
            starting - pairs.len(),
            name,
            pairs.len()
        );
    }

    if pairs.is_empty() {
        bail!("every candidate primer pair produced a disallowed product length in the outgroup");
    }
    Ok(pairs)
}
