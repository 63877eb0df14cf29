use crate::fastx::SeqFormat;
use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

pub const DEFAULT_PRIMER_LEN: &str = "16,20";
pub const DEFAULT_GC_RANGE: &str = "40.0,60.0";
pub const DEFAULT_TM_RANGE: &str = "55.0,68.0";
pub const DEFAULT_PCR_PROD_LEN: &str = "120,2400";
pub const DEFAULT_TM_DIFF: f64 = 5.0;

/// Parses `N` or `N,M` into an inclusive integer range; a single value
/// collapses the range, and a reversed pair is normalised.
pub fn parse_int_range(arg: &str) -> Result<(usize, usize), String> {
    let parts: Vec<&str> = arg.split(',').collect();
    if parts.is_empty() || parts.len() > 2 {
        return Err("expected a single value or 'min,max'".to_string());
    }
    let mut values = Vec::with_capacity(2);
    for part in &parts {
        values.push(
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("'{}' is not an integer", part))?,
        );
    }
    let lo = *values.iter().min().unwrap();
    let hi = *values.iter().max().unwrap();
    Ok((lo, hi))
}

/// Parses `min,max` into an inclusive float range (both values required).
pub fn parse_float_range(arg: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = arg.split(',').collect();
    if parts.len() != 2 {
        return Err("expected a range 'min,max'".to_string());
    }
    let a = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not numeric", parts[0]))?;
    let b = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not numeric", parts[1]))?;
    Ok((a.min(b), a.max(b)))
}

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Find primer pairs suitable for PCR on a set of ingroup genomes",
    long_about = "Find pairs of primers that amplify a bounded-length product in every \
ingroup genome and no disallowed product in any outgroup genome."
)]
pub struct Args {
    /// Ingroup sequence file(s); comma-separated list
    #[arg(short, long, required = true, value_delimiter = ',')]
    pub ingroup: Vec<PathBuf>,

    /// Outgroup sequence file(s); comma-separated list
    #[arg(short = 'u', long, value_delimiter = ',')]
    pub outgroup: Vec<PathBuf>,

    /// Output filename (tab-separated)
    #[arg(short, long, required = true)]
    pub out: PathBuf,

    /// File format of the ingroup and outgroup
    #[arg(short, long, value_enum, default_value = "fasta")]
    pub format: SeqFormat,

    /// A single primer length or a range specified as 'min,max'
    #[arg(short = 'p', long = "primer_len", value_parser = parse_int_range, default_value = DEFAULT_PRIMER_LEN)]
    pub primer_len: (usize, usize),

    /// Allowed percent G+C as 'min,max'
    #[arg(short = 'g', long = "gc_range", value_parser = parse_float_range, default_value = DEFAULT_GC_RANGE)]
    pub gc_range: (f64, f64),

    /// Allowed melting temperature (Tm) as 'min,max'
    #[arg(short = 't', long = "tm_range", value_parser = parse_float_range, default_value = DEFAULT_TM_RANGE)]
    pub tm_range: (f64, f64),

    /// A single PCR product length or a range specified as 'min,max'
    #[arg(short = 'r', long = "pcr_prod_len", value_parser = parse_int_range, default_value = DEFAULT_PCR_PROD_LEN)]
    pub pcr_prod_len: (usize, usize),

    /// Maximum allowable Tm difference between the primers of a pair
    #[arg(short = 'd', long = "tm_diff", default_value_t = DEFAULT_TM_DIFF)]
    pub tm_diff: f64,

    /// Number of threads for parallel processing (0 = all cores)
    #[arg(short = 'n', long = "num_threads", default_value_t = 1)]
    pub num_threads: usize,
}

/// The validated run configuration every stage reads from.
#[derive(Debug, Clone, Serialize)]
pub struct Parameters {
    pub ingroup: Vec<PathBuf>,
    pub outgroup: Vec<PathBuf>,
    pub out: PathBuf,
    pub format: SeqFormat,
    pub min_len: usize,
    pub max_len: usize,
    pub min_gc: f64,
    pub max_gc: f64,
    pub min_tm: f64,
    pub max_tm: f64,
    pub min_prod_len: usize,
    pub max_prod_len: usize,
    pub max_tm_diff: f64,
    /// Outgroup product lengths that invalidate a pair (inclusive bounds).
    /// Defaults to the allowed ingroup product range.
    pub disallowed_lens: (usize, usize),
    pub num_threads: usize,
}

impl Parameters {
    pub fn from_args(args: Args) -> Result<Self> {
        if args.ingroup.is_empty() {
            bail!("must specify one or more ingroup files");
        }
        for path in args.ingroup.iter().chain(args.outgroup.iter()) {
            if !path.is_file() {
                bail!("invalid or missing sequence file: {}", path.display());
            }
        }
        let (min_len, max_len) = args.primer_len;
        if min_len < 2 {
            bail!("primer lengths must be at least 2");
        }
        let (min_prod_len, max_prod_len) = args.pcr_prod_len;
        if max_prod_len < max_len {
            bail!("PCR products cannot be shorter than the primers themselves");
        }
        if args.tm_diff < 0.0 {
            bail!("max Tm difference cannot be negative");
        }
        let (min_gc, max_gc) = args.gc_range;
        let (min_tm, max_tm) = args.tm_range;
        Ok(Self {
            ingroup: args.ingroup,
            outgroup: args.outgroup,
            out: args.out,
            format: args.format,
            min_len,
            max_len,
            min_gc,
            max_gc,
            min_tm,
            max_tm,
            min_prod_len,
            max_prod_len,
            max_tm_diff: args.tm_diff,
            disallowed_lens: (min_prod_len, max_prod_len),
            num_threads: args.num_threads,
        })
    }

    pub fn disallows(&self, product_len: usize) -> bool {
        product_len >= self.disallowed_lens.0 && product_len <= self.disallowed_lens.1
    }

    /// Minimizer window length used when splitting oversized bins.
    pub fn minimizer_len(&self) -> usize {
        (self.min_len / 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_range() {
        assert_eq!(parse_int_range("16,20").unwrap(), (16, 20));
        assert_eq!(parse_int_range("18").unwrap(), (18, 18));
        assert_eq!(parse_int_range("20,16").unwrap(), (16, 20));
        assert!(parse_int_range("a,b").is_err());
        assert!(parse_int_range("1,2,3").is_err());
    }

    #[test]
    fn test_parse_float_range() {
        assert_eq!(parse_float_range("40.0,60.0").unwrap(), (40.0, 60.0));
        assert_eq!(parse_float_range("60,40").unwrap(), (40.0, 60.0));
        assert!(parse_float_range("55").is_err());
        assert!(parse_float_range("x,y").is_err());
    }
}
