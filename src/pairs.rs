//! Pair assembly on the reference genome: scan ordered bin pairs, emit at
//! most one suitable primer pair per bin pair, and spill accepted pairs
//! through a single-writer channel to a temp file that is read back when the
//! scan completes.

use crate::args::Parameters;
use crate::bins::Bin;
use crate::primer::Primer;
use crate::utils::temp_file_path;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::bounded;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::thread;

/// Reject a pair when an optimal end-gap-free alignment matches more than
/// this fraction of either primer.
const MAX_DIMER_IDENTITY: f64 = 0.90;

const CHANNEL_CAPACITY: usize = 1024;

/// A primer pair accepted on the reference genome. `rev` is stored
/// reverse-complemented (the oligo as ordered), anchored at the genomic end
/// of its binding window.
#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub fwd: Primer,
    pub rev: Primer,
    pub product_len: usize,
}

/// One row of the intermediate pair file:
/// `contig \t fwd_seq \t fwd_start \t rev_seq \t rev_end \t product_length`.
struct PairRow {
    contig: String,
    fwd_seq: String,
    fwd_start: usize,
    rev_seq: String,
    rev_end: usize,
    product_len: usize,
}

fn is_three_prime_gc(base: u8) -> bool {
    base == b'G' || base == b'C'
}

/// Global pairwise screen for primer dimers: match +2, mismatch -1, end gaps
/// free, internal gaps forbidden. With those scores every alignment is a
/// relative offset of the two sequences; the pair is rejected when any
/// best-scoring offset identifies more than `MAX_DIMER_IDENTITY` of either
/// primer.
fn no_primer_dimer(a: &[u8], b: &[u8]) -> bool {
    let (a_len, b_len) = (a.len() as i64, b.len() as i64);
    let mut best_score = i64::MIN;
    let mut best_rejects = false;

    for offset in -(b_len - 1)..a_len {
        let lo = offset.max(0);
        let hi = (offset + b_len).min(a_len);
        let overlap = hi - lo;
        if overlap <= 0 {
            continue;
        }
        let mut identities = 0i64;
        for i in lo..hi {
            if a[i as usize] == b[(i - offset) as usize] {
                identities += 1;
            }
        }
        let score = 3 * identities - overlap;
        let identity_frac =
            (identities as f64 / a_len as f64).max(identities as f64 / b_len as f64);
        if score > best_score {
            best_score = score;
            best_rejects = identity_frac > MAX_DIMER_IDENTITY;
        } else if score == best_score && identity_frac > MAX_DIMER_IDENTITY {
            best_rejects = true;
        }
    }
    !best_rejects
}

/// Scans `upstream x downstream` until one suitable pair is found. The
/// downstream primer is reverse-complemented on emission.
fn evaluate_bin_pair(upstream: &Bin, downstream: &Bin, params: &Parameters) -> Option<PairRow> {
    for p1 in &upstream.primers {
        if !is_three_prime_gc(*p1.seq().last()?) {
            continue;
        }
        for p2 in &downstream.primers {
            let product_len = p2.end() as i64 - p1.start() as i64 + 1;
            if product_len < params.min_prod_len as i64 || product_len > params.max_prod_len as i64
            {
                continue;
            }
            if !is_three_prime_gc(p2.seq()[0]) {
                continue;
            }
            if (p1.tm() - p2.tm()).abs() > params.max_tm_diff {
                continue;
            }
            if !no_primer_dimer(p1.seq(), p2.seq()) {
                continue;
            }
            let rev = p2.reverse_complement();
            return Some(PairRow {
                contig: p1.contig().to_string(),
                fwd_seq: p1.seq_string(),
                fwd_start: p1.start(),
                rev_seq: rev.seq_string(),
                rev_end: rev.start(),
                product_len: product_len as usize,
            });
        }
    }
    None
}

/// Orders bins by left edge and enumerates the bin pairs whose pessimistic
/// product bounds could still satisfy the length window: once even the
/// smallest conceivable product overshoots, no later partner can work.
fn eligible_bin_pairs<'a>(bins: &'a [&'a Bin], params: &Parameters) -> Vec<(&'a Bin, &'a Bin)> {
    let min_len = params.min_len as i64;
    let mut tasks = Vec::new();
    for (i, a) in bins.iter().enumerate() {
        for b in &bins[i + 1..] {
            let smallest = (b.left() as i64 + min_len) - (a.right() as i64 - min_len);
            let largest = b.right() as i64 - a.left() as i64;
            if smallest > params.max_prod_len as i64 {
                break;
            }
            if largest < (params.min_prod_len as i64) {
                continue;
            }
            tasks.push((*a, *b));
        }
    }
    tasks
}

fn load_pairs(path: &Path) -> Result<Vec<CandidatePair>> {
    let file = crate::utils::open_file(path)?;
    let mut pairs = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 6 {
            return Err(anyhow!("malformed candidate pair row: {line}"));
        }
        let contig = fields[0];
        let fwd_start: usize = fields[2].parse()?;
        let rev_end: usize = fields[4].parse()?;
        let product_len: usize = fields[5].parse()?;
        pairs.push(CandidatePair {
            fwd: Primer::new(fields[1].as_bytes().to_vec(), contig, fwd_start),
            rev: Primer::new(fields[3].as_bytes().to_vec(), contig, rev_end),
            product_len,
        });
    }
    Ok(pairs)
}

/// Evaluates every eligible bin pair of the reference genome in parallel.
/// Accepted pairs stream through a bounded channel to the single thread
/// owning the temp file (workers send `Some`, the coordinator sends the
/// `None` sentinel after join); the file is loaded back and removed before
/// returning.
pub fn find_pairs(
    bins_by_contig: &HashMap<String, Vec<Bin>>,
    params: &Parameters,
) -> Result<Vec<CandidatePair>> {
    let mut contigs: Vec<&String> = bins_by_contig.keys().collect();
    contigs.sort_unstable();

    let mut sorted: Vec<Vec<&Bin>> = Vec::new();
    for contig in &contigs {
        let mut bins: Vec<&Bin> = bins_by_contig[*contig].iter().collect();
        bins.sort_by_key(|bin| bin.left());
        sorted.push(bins);
    }
    let tasks: Vec<(&Bin, &Bin)> = sorted
        .iter()
        .flat_map(|bins| eligible_bin_pairs(bins, params))
        .collect();
    log::debug!("{} bin pairs to evaluate", tasks.len());

    let temp_path = temp_file_path("candidate-pairs");
    let writer_path = temp_path.clone();
    let (sender, receiver) = bounded::<Option<PairRow>>(CHANNEL_CAPACITY);

    let writer = thread::spawn(move || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(&writer_path)?);
        while let Ok(Some(row)) = receiver.recv() {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}",
                row.contig, row.fwd_seq, row.fwd_start, row.rev_seq, row.rev_end, row.product_len
            )?;
            out.flush()?;
        }
        out.flush()
    });

    tasks.par_iter().for_each_with(sender.clone(), |tx, (a, b)| {
        if let Some(row) = evaluate_bin_pair(a, b, params) {
            // a send only fails when the writer already died; the join below
            // surfaces that error
            let _ = tx.send(Some(row));
        }
    });
    let _ = sender.send(None);
    drop(sender);

    writer
        .join()
        .map_err(|_| anyhow!("candidate pair writer thread panicked"))?
        .context("writing candidate pair temp file")?;

    let pairs = load_pairs(&temp_path).context("reading candidate pair temp file")?;
    if let Err(e) = fs::remove_file(&temp_path) {
        log::warn!("could not remove temp file {}: {e}", temp_path.display());
    }
    Ok(pairs)
}
