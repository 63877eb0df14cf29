//! Stage orchestration: candidate k-mers, biochemistry screen, binning,
//! pair assembly, cross-genome validation, outgroup elimination, report.

use crate::args::Parameters;
use crate::fastx::{read_genomes, GenomeSet};
use crate::validate::DesignedPair;
use crate::{bins, filter, kmers, outgroup, pairs, report, validate};
use anyhow::{bail, Context, Result};
use std::time::Instant;

/// Runs the discovery pipeline on already-loaded genomes and returns the
/// surviving pairs in deterministic output order.
pub fn design(
    ingroup: &GenomeSet,
    outgroup_genomes: &GenomeSet,
    params: &Parameters,
) -> Result<Vec<DesignedPair>> {
    let clock = Instant::now();
    log::info!("identifying kmers suitable for use as primers");
    let shared = kmers::shared_unique_kmers(ingroup, outgroup_genomes, params.min_len, params.max_len)?;
    let reference = shared.keys().next().expect("ingroup is non-empty").clone();
    log::info!(
        "{} candidate kmers per genome (reference: {}), {:?}",
        shared[&reference].len(),
        reference,
        clock.elapsed()
    );

    let clock = Instant::now();
    log::info!("evaluating candidate biochemistry");
    let accepted = filter::filter_candidates(&shared[&reference], &ingroup[&reference], params);
    if accepted.is_empty() {
        bail!("no candidate kmers passed the biochemistry screen");
    }
    log::info!("{} suitable candidate primers, {:?}", accepted.len(), clock.elapsed());

    let by_genome = filter::candidates_by_genome(&accepted, &shared, ingroup);

    let clock = Instant::now();
    log::info!("binning candidates and evaluating bin pairs");
    let binned = bins::build_bins(&by_genome[&reference], params.minimizer_len());
    let candidate_pairs = pairs::find_pairs(&binned, params)?;
    if candidate_pairs.is_empty() {
        bail!("no primer pairs survived evaluation on the reference genome");
    }
    log::info!("{} candidate pairs, {:?}", candidate_pairs.len(), clock.elapsed());

    let clock = Instant::now();
    log::info!("validating pairs across all ingroup genomes");
    let validated = validate::validate_across_genomes(&reference, &by_genome, candidate_pairs, params)?;
    log::info!("{} shared pairs, {:?}", validated.len(), clock.elapsed());

    let clock = Instant::now();
    log::info!("removing pairs with disallowed outgroup products");
    let mut final_pairs = outgroup::remove_outgroup_pairs(outgroup_genomes, validated, params)?;
    log::info!("{} pairs remaining, {:?}", final_pairs.len(), clock.elapsed());

    report::sort_pairs(&mut final_pairs);
    Ok(final_pairs)
}

/// Full run: read the sequence files, design, write the report.
pub fn run(params: &Parameters) -> Result<()> {
    let total = Instant::now();
    if let Ok(json) = serde_json::to_string(params) {
        log::debug!("parameters: {json}");
    }

    let ingroup = read_genomes(&params.ingroup, params.format).context("reading ingroup files")?;
    let outgroup_genomes =
        read_genomes(&params.outgroup, params.format).context("reading outgroup files")?;
    if let Some(name) = ingroup.keys().find(|name| outgroup_genomes.contains_key(*name)) {
        bail!("genome '{}' appears in both the ingroup and the outgroup", name);
    }

    let final_pairs = design(&ingroup, &outgroup_genomes, params)?;

    let ingroup_names: Vec<String> = ingroup.keys().cloned().collect();
    let outgroup_names: Vec<String> = outgroup_genomes.keys().cloned().collect();
    log::info!("writing {} primer pairs to {}", final_pairs.len(), params.out.display());
    report::write_pairs(&params.out, &final_pairs, &ingroup_names, &outgroup_names)?;

    log::info!("total runtime: {:?}", total.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fastx::{Contig, SeqFormat};
    use std::path::PathBuf;

    const FWD_SITE: &[u8] = b"ACCAACACCAACCACC";
    const REV_SITE: &[u8] = b"CAACCACAACCAACAA";

    /// T-padding isolates the two target windows: pure-T windows repeat and
    /// are dropped as non-unique, windows with four or more T's fail the
    /// homopolymer screen, and the short boundary overhangs either survive
    /// into the same bins as the targets or fail the GC window.
    fn synthetic_contig() -> Vec<u8> {
        let mut seq = vec![b'T'; 20];
        seq.extend_from_slice(FWD_SITE);
        seq.extend(std::iter::repeat(b'T').take(30));
        seq.extend_from_slice(REV_SITE);
        seq.extend(std::iter::repeat(b'T').take(20));
        seq
    }

    fn genome_of(seq: Vec<u8>) -> Vec<Contig> {
        vec![Contig { id: "c1".to_string(), seq }]
    }

    fn params() -> Parameters {
        Parameters {
            ingroup: vec![],
            outgroup: vec![],
            out: PathBuf::from("out.tsv"),
            format: SeqFormat::Fasta,
            min_len: 16,
            max_len: 16,
            min_gc: 40.0,
            max_gc: 60.0,
            min_tm: 30.0,
            max_tm: 80.0,
            min_prod_len: 30,
            max_prod_len: 100,
            max_tm_diff: 10.0,
            disallowed_lens: (30, 100),
            num_threads: 1,
        }
    }

    #[test]
    fn test_design_single_genome() {
        let mut ingroup = GenomeSet::new();
        ingroup.insert("g1".to_string(), genome_of(synthetic_contig()));

        let result = design(&ingroup, &GenomeSet::new(), &params()).unwrap();
        assert_eq!(result.len(), 1);
        let pair = &result[0];
        assert_eq!(pair.fwd.seq(), FWD_SITE);
        assert_eq!(pair.fwd.start(), 20);
        // the emitted reverse oligo reads off the minus strand of the
        // boundary window two bases left of the reverse site
        assert_eq!(pair.rev.seq(), b"TTCAACCACAACCAAC");
        assert_eq!(pair.rev.start(), 79);
        assert_eq!(pair.ingroup["g1"], ("c1".to_string(), 60));
        assert!((pair.fwd.tm() - 50.45).abs() < 0.1);
        assert!((pair.rev.tm() - 45.55).abs() < 0.1);
    }

    #[test]
    fn test_design_identical_genomes_agree() {
        let mut ingroup = GenomeSet::new();
        ingroup.insert("g1".to_string(), genome_of(synthetic_contig()));
        ingroup.insert("g2".to_string(), genome_of(synthetic_contig()));

        let result = design(&ingroup, &GenomeSet::new(), &params()).unwrap();
        assert_eq!(result.len(), 1);
        let pair = &result[0];
        assert_eq!(pair.ingroup["g1"], pair.ingroup["g2"]);
        assert_eq!(pair.ingroup["g1"].1, 60);
    }

    #[test]
    fn test_design_is_deterministic() {
        let mut ingroup = GenomeSet::new();
        ingroup.insert("g1".to_string(), genome_of(synthetic_contig()));
        ingroup.insert("g2".to_string(), genome_of(synthetic_contig()));

        let a = design(&ingroup, &GenomeSet::new(), &params()).unwrap();
        let b = design(&ingroup, &GenomeSet::new(), &params()).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.fwd, y.fwd);
            assert_eq!(x.rev, y.rev);
            assert_eq!(x.ingroup, y.ingroup);
        }
    }

    #[test]
    fn test_outgroup_masks_forward_region() {
        let contig = synthetic_contig();
        let mut ingroup = GenomeSet::new();
        ingroup.insert("g1".to_string(), genome_of(contig.clone()));
        // the outgroup carries the whole forward neighborhood, so every
        // candidate kmer there is subtracted and only one bin remains
        let mut outgroup_genomes = GenomeSet::new();
        outgroup_genomes.insert("o1".to_string(), genome_of(contig[10..45].to_vec()));

        let err = design(&ingroup, &outgroup_genomes, &params()).unwrap_err();
        assert!(err.to_string().contains("no primer pairs"));
    }

    #[test]
    fn test_outgroup_containing_everything_empties_intersection() {
        let contig = synthetic_contig();
        let mut ingroup = GenomeSet::new();
        ingroup.insert("g1".to_string(), genome_of(contig.clone()));
        let mut outgroup_genomes = GenomeSet::new();
        outgroup_genomes.insert("o1".to_string(), genome_of(contig));

        let err = design(&ingroup, &outgroup_genomes, &params()).unwrap_err();
        assert!(err.to_string().contains("shared"));
    }

    #[test]
    fn test_periodic_sequence_emits_no_pair() {
        // a 4-periodic sequence: the single strand-unique 16-mer carries a
        // self-complementary GTAC window and fails the hairpin screen
        let mut ingroup = GenomeSet::new();
        ingroup.insert(
            "g1".to_string(),
            genome_of(b"ACGTACGTACGTACGTACGT".to_vec()),
        );
        let mut p = params();
        p.min_prod_len = 16;
        p.max_prod_len = 20;
        p.disallowed_lens = (16, 20);

        let err = design(&ingroup, &GenomeSet::new(), &p).unwrap_err();
        assert!(err.to_string().contains("biochemistry"));
    }

    #[test]
    fn test_narrow_tm_window_rejects_all_candidates() {
        let mut ingroup = GenomeSet::new();
        ingroup.insert("g1".to_string(), genome_of(synthetic_contig()));
        let mut p = params();
        p.min_tm = 60.0;
        p.max_tm = 62.0;

        let err = design(&ingroup, &GenomeSet::new(), &p).unwrap_err();
        assert!(err.to_string().contains("biochemistry"));
    }
}
