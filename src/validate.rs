//! Cross-genome validation: a pair accepted on the reference genome must
//! amplify a product of acceptable length in every other ingroup genome.

use crate::args::Parameters;
use crate::pairs::CandidatePair;
use crate::primer::Primer;
use crate::seq::canonical;
use anyhow::{bail, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A pair that survived cross-genome validation, carrying its per-genome
/// amplification record. `outgroup` is filled by the outgroup eliminator;
/// an empty product set there means no product in that genome.
#[derive(Debug, Clone)]
pub struct DesignedPair {
    pub fwd: Primer,
    pub rev: Primer,
    pub ingroup: BTreeMap<String, (String, usize)>,
    pub outgroup: BTreeMap<String, BTreeSet<(String, usize)>>,
}

type SequenceIndex<'a> = HashMap<Vec<u8>, &'a Primer>;

fn index_candidates<'a>(by_contig: &'a HashMap<String, Vec<Primer>>) -> SequenceIndex<'a> {
    let mut index = SequenceIndex::with_capacity(by_contig.values().map(Vec::len).sum());
    for primer in by_contig.values().flatten() {
        // candidate sequences are canonical keys already
        index.insert(primer.seq().to_vec(), primer);
    }
    index
}

fn product_in_genome(
    index: &SequenceIndex,
    fwd_key: &[u8],
    rev_key: &[u8],
    params: &Parameters,
) -> Option<(String, usize)> {
    let k1 = index.get(fwd_key)?;
    let k2 = index.get(rev_key)?;
    if k1.contig() != k2.contig() {
        return None;
    }
    // product from whichever site lies 5'
    let (fwd, rev) = if k1.start() < k2.start() { (k1, k2) } else { (k2, k1) };
    let len = rev.end() - fwd.start() + 1;
    if len < params.min_prod_len || len > params.max_prod_len {
        return None;
    }
    Some((fwd.contig().to_string(), len))
}

/// Lifts every candidate pair from the reference genome to all other ingroup
/// genomes, dropping pairs that miss a genome, land on different contigs, or
/// amplify outside the product window anywhere.
pub fn validate_across_genomes(
    reference_name: &str,
    candidates: &BTreeMap<String, HashMap<String, Vec<Primer>>>,
    pairs: Vec<CandidatePair>,
    params: &Parameters,
) -> Result<Vec<DesignedPair>> {
    let indices: Vec<(&String, SequenceIndex)> = candidates
        .iter()
        .filter(|(name, _)| name.as_str() != reference_name)
        .map(|(name, by_contig)| (name, index_candidates(by_contig)))
        .collect();

    let validated: Vec<DesignedPair> = pairs
        .into_par_iter()
        .filter_map(|pair| {
            let fwd_key = canonical(pair.fwd.seq());
            let rev_key = canonical(pair.rev.seq());
            let mut ingroup = BTreeMap::new();
            ingroup.insert(
                reference_name.to_string(),
                (pair.fwd.contig().to_string(), pair.product_len),
            );
            for (name, index) in &indices {
                let (contig, len) = product_in_genome(index, &fwd_key, &rev_key, params)?;
                ingroup.insert((*name).clone(), (contig, len));
            }
            Some(DesignedPair {
                fwd: pair.fwd,
                rev: pair.rev,
                ingroup,
                outgroup: BTreeMap::new(),
            })
        })
        .collect();

    if validated.is_empty() {
        bail!("no candidate primer pair amplifies consistently in every ingroup genome");
    }
    Ok(validated)
}
