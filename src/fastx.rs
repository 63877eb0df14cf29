//! Sequence file input: FASTA and GenBank, with transparent gzip.

use crate::utils::{genome_name, open_file};
use anyhow::{bail, Context, Result};
use bio::io::fasta;
use clap::ValueEnum;
use flate2::read::MultiGzDecoder;
use gb_io::reader::SeqReader;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeqFormat {
    Fasta,
    Genbank,
}

/// One sequence record of a genome.
#[derive(Debug, Clone)]
pub struct Contig {
    pub id: String,
    pub seq: Vec<u8>,
}

/// Genomes keyed by name; BTreeMap keeps the deterministic sorted order the
/// report columns rely on.
pub type GenomeSet = BTreeMap<String, Vec<Contig>>;

fn raw_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = open_file(path).with_context(|| format!("opening {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn read_fasta(path: &Path) -> Result<Vec<Contig>> {
    let reader = fasta::Reader::new(raw_reader(path)?);
    let mut contigs = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("parsing FASTA record in {}", path.display()))?;
        contigs.push(Contig {
            id: record.id().to_string(),
            seq: record.seq().to_ascii_uppercase(),
        });
    }
    Ok(contigs)
}

fn read_genbank(path: &Path) -> Result<Vec<Contig>> {
    let mut contigs = Vec::new();
    for (index, seq) in SeqReader::new(raw_reader(path)?).enumerate() {
        let seq = seq.with_context(|| format!("parsing GenBank record in {}", path.display()))?;
        let id = seq
            .accession
            .clone()
            .or_else(|| seq.name.clone())
            .unwrap_or_else(|| format!("record_{}", index + 1));
        contigs.push(Contig {
            id,
            seq: seq.seq.to_ascii_uppercase(),
        });
    }
    Ok(contigs)
}

/// Reads every file into `{genome name: contigs}`. The genome name is the
/// file basename without extension.
pub fn read_genomes(paths: &[PathBuf], format: SeqFormat) -> Result<GenomeSet> {
    let mut genomes = GenomeSet::new();
    for path in paths {
        let contigs = match format {
            SeqFormat::Fasta => read_fasta(path)?,
            SeqFormat::Genbank => read_genbank(path)?,
        };
        if contigs.is_empty() {
            bail!("no sequence records found in {}", path.display());
        }
        let name = genome_name(path);
        if genomes.insert(name.clone(), contigs).is_some() {
            bail!("duplicate genome name '{}' (two input files share a basename)", name);
        }
    }
    Ok(genomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::temp_file_path;
    use std::fs;

    #[test]
    fn test_read_fasta() {
        let path = temp_file_path("fasta");
        fs::write(&path, ">c1 a contig\nacgtACGT\nACGT\n>c2\nTTTT\n").unwrap();

        let genomes = read_genomes(&[path.clone()], SeqFormat::Fasta).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(genomes.len(), 1);
        let contigs = genomes.values().next().unwrap();
        assert_eq!(contigs.len(), 2);
        assert_eq!(contigs[0].id, "c1");
        assert_eq!(contigs[0].seq, b"ACGTACGTACGT");
        assert_eq!(contigs[1].id, "c2");
        assert_eq!(contigs[1].seq, b"TTTT");
    }

    #[test]
    fn test_read_missing_file() {
        let missing = PathBuf::from("/nonexistent/genome.fasta");
        assert!(read_genomes(&[missing], SeqFormat::Fasta).is_err());
    }
}
