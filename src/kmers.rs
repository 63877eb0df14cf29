//! K-mer discovery: per-genome unique k-mers, the cross-genome intersection,
//! and the outgroup presence screen.
//!
//! Every dictionary here is keyed by the canonical form of a window (the
//! lexicographic minimum of the window and its reverse complement), so a
//! k-mer shared between genomes on opposite strands still intersects and a
//! strand-flipped second occurrence still breaks uniqueness.

use crate::fastx::{Contig, GenomeSet};
use crate::seq::canonical;
use anyhow::{bail, Result};
use dashmap::{DashMap, DashSet};
use rayon::prelude::*;
use seahash::SeaHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::BuildHasherDefault;

pub type KmerHasher = BuildHasherDefault<SeaHasher>;

/// The single genomic occurrence of a unique k-mer. `contig` indexes into the
/// genome's contig list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerSite {
    pub contig: usize,
    pub start: usize,
    pub len: usize,
}

/// Canonical k-mer sequence -> its single occurrence in one genome.
pub type KmerMap = HashMap<Vec<u8>, KmerSite, KmerHasher>;

/// Enumerates every window of length `min_len..=max_len` over all contigs of
/// one genome and keeps only the k-mers occurring exactly once (forward and
/// reverse strand occurrences counted together).
pub fn unique_kmers(contigs: &[Contig], min_len: usize, max_len: usize) -> KmerMap {
    let counts: DashMap<Vec<u8>, (KmerSite, u32), KmerHasher> =
        DashMap::with_hasher(KmerHasher::default());

    contigs.par_iter().enumerate().for_each(|(contig_idx, contig)| {
        for len in min_len..=max_len {
            if contig.seq.len() < len {
                continue;
            }
            for start in 0..=(contig.seq.len() - len) {
                let key = canonical(&contig.seq[start..start + len]);
                counts
                    .entry(key)
                    .and_modify(|(_, count)| *count += 1)
                    .or_insert((KmerSite { contig: contig_idx, start, len }, 1));
            }
        }
    });

    counts
        .into_iter()
        .filter(|(_, (_, count))| *count == 1)
        .map(|(key, (site, _))| (key, site))
        .collect()
}

/// Every canonical window of every outgroup contig. Presence only; no
/// uniqueness requirement.
pub fn outgroup_kmer_set(
    genomes: &GenomeSet,
    min_len: usize,
    max_len: usize,
) -> HashSet<Vec<u8>, KmerHasher> {
    let seen: DashSet<Vec<u8>, KmerHasher> = DashSet::with_hasher(KmerHasher::default());

    let contigs: Vec<&Contig> = genomes.values().flatten().collect();
    contigs.par_iter().for_each(|contig| {
        for len in min_len..=max_len {
            if contig.seq.len() < len {
                continue;
            }
            for start in 0..=(contig.seq.len() - len) {
                seen.insert(canonical(&contig.seq[start..start + len]));
            }
        }
    });

    seen.into_iter().collect()
}

/// All raw (strand-as-written) windows of one contig, keyed by sequence with
/// their start positions. The outgroup eliminator searches these for exact
/// binding sites in either orientation.
pub fn kmer_positions(
    contig: &Contig,
    min_len: usize,
    max_len: usize,
) -> HashMap<Vec<u8>, Vec<usize>, KmerHasher> {
    let mut positions: HashMap<Vec<u8>, Vec<usize>, KmerHasher> =
        HashMap::with_hasher(KmerHasher::default());
    for len in min_len..=max_len {
        if contig.seq.len() < len {
            continue;
        }
        for start in 0..=(contig.seq.len() - len) {
            positions
                .entry(contig.seq[start..start + len].to_vec())
                .or_default()
                .push(start);
        }
    }
    positions
}

/// Resolves the candidate k-mer set: unique within each ingroup genome,
/// shared by all ingroup genomes, absent from every outgroup genome. Returns
/// the pruned per-genome maps.
pub fn shared_unique_kmers(
    ingroup: &GenomeSet,
    outgroup: &GenomeSet,
    min_len: usize,
    max_len: usize,
) -> Result<BTreeMap<String, KmerMap>> {
    let mut per_genome: BTreeMap<String, KmerMap> = BTreeMap::new();
    for (name, contigs) in ingroup {
        let kmers = unique_kmers(contigs, min_len, max_len);
        log::debug!("{}: {} unique kmers", name, kmers.len());
        per_genome.insert(name.clone(), kmers);
    }

    // intersect key sets across the ingroup
    let mut shared: Vec<Vec<u8>> = Vec::new();
    if let Some(first) = per_genome.values().next() {
        shared = first
            .keys()
            .filter(|key| per_genome.values().skip(1).all(|m| m.contains_key(*key)))
            .cloned()
            .collect();
    }
    log::debug!("{} kmers shared by all ingroup genomes", shared.len());

    // subtract everything present anywhere in the outgroup
    if !outgroup.is_empty() {
        let excluded = outgroup_kmer_set(outgroup, min_len, max_len);
        shared.retain(|key| !excluded.contains(key));
        log::debug!("{} shared kmers absent from the outgroup", shared.len());
    }

    if shared.is_empty() {
        bail!("no candidate kmers are shared by every ingroup genome and absent from the outgroup");
    }

    let surviving: HashSet<&Vec<u8>> = shared.iter().collect();
    for kmers in per_genome.values_mut() {
        kmers.retain(|key, _| surviving.contains(key));
    }
    Ok(per_genome)
}
