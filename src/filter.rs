//! Biochemistry screen over the reference genome's candidate k-mers.
//!
//! Candidates are grouped by their left endpoint; within a group the
//! shortest acceptable k-mer wins and the rest are discarded, so each
//! genomic position contributes at most one primer.

use crate::args::Parameters;
use crate::fastx::{Contig, GenomeSet};
use crate::kmers::KmerMap;
use crate::primer::Primer;
use crate::seq::{kmp_search, reverse_complement};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

const HOMOPOLYMERS: [&[u8]; 4] = [b"AAAA", b"TTTT", b"CCCC", b"GGGG"];

/// Length of the window whose reverse complement must not re-occur inside
/// the primer (hairpin potential).
const HAIRPIN_LEN: usize = 4;

fn has_long_repeat(seq: &[u8]) -> bool {
    HOMOPOLYMERS.iter().any(|repeat| kmp_search(seq, repeat))
}

fn has_intra_complement(seq: &[u8]) -> bool {
    seq.windows(HAIRPIN_LEN)
        .any(|window| kmp_search(seq, &reverse_complement(window)))
}

fn passes_checks(primer: &Primer, params: &Parameters) -> bool {
    primer.gc_percent() >= params.min_gc
        && primer.gc_percent() <= params.max_gc
        && primer.tm() >= params.min_tm
        && primer.tm() <= params.max_tm
        && !has_long_repeat(primer.seq())
        && !has_intra_complement(primer.seq())
}

/// Evaluates the reference genome's surviving k-mers in parallel, one task
/// per `(contig, start)` group, accepting the first candidate of each group
/// (length ascending) that passes every check.
pub fn filter_candidates(
    reference: &KmerMap,
    contigs: &[Contig],
    params: &Parameters,
) -> Vec<Primer> {
    // group all kmer lengths sharing a left endpoint
    let mut groups: HashMap<(usize, usize), Vec<&[u8]>> = HashMap::new();
    for (seq, site) in reference {
        groups.entry((site.contig, site.start)).or_default().push(seq);
    }

    let mut tasks: Vec<((usize, usize), Vec<&[u8]>)> = groups.into_iter().collect();
    tasks.sort_unstable_by_key(|(position, _)| *position);
    for (_, candidates) in tasks.iter_mut() {
        candidates.sort_unstable_by_key(|seq| seq.len());
    }

    tasks
        .par_iter()
        .filter_map(|((contig_idx, start), candidates)| {
            let contig_id = &contigs[*contig_idx].id;
            candidates.iter().find_map(|seq| {
                let primer = Primer::new(seq.to_vec(), contig_id, *start);
                passes_checks(&primer, params).then_some(primer)
            })
        })
        .collect()
}

/// Lifts the accepted candidates to every ingroup genome as per-contig
/// primer lists sorted by position (ties widest first), the order the bin
/// builder expects.
pub fn candidates_by_genome(
    accepted: &[Primer],
    per_genome: &BTreeMap<String, KmerMap>,
    genomes: &GenomeSet,
) -> BTreeMap<String, HashMap<String, Vec<Primer>>> {
    let mut out: BTreeMap<String, HashMap<String, Vec<Primer>>> = BTreeMap::new();

    for (name, kmers) in per_genome {
        let contigs = &genomes[name];
        let mut by_contig: HashMap<String, Vec<Primer>> = HashMap::new();
        for candidate in accepted {
            let Some(site) = kmers.get(candidate.seq()) else {
                // the resolver guarantees every accepted key exists everywhere
                debug_assert!(false, "accepted kmer missing from genome {}", name);
                continue;
            };
            let contig_id = &contigs[site.contig].id;
            by_contig
                .entry(contig_id.clone())
                .or_default()
                .push(Primer::new(candidate.seq().to_vec(), contig_id, site.start));
        }
        for primers in by_contig.values_mut() {
            primers.sort_by(|a, b| {
                a.start().cmp(&b.start()).then(b.len().cmp(&a.len()))
            });
        }
        out.insert(name.clone(), by_contig);
    }
    out
}
