//! The tab-separated result writer.

use crate::validate::DesignedPair;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADERS: [&str; 6] = ["fwd_seq", "fwd_Tm", "fwd_GC", "rev_seq", "rev_Tm", "rev_GC"];

/// Deterministic output order: genomic position of the pair, then sequences.
pub fn sort_pairs(pairs: &mut [DesignedPair]) {
    pairs.sort_by(|a, b| {
        a.fwd
            .contig()
            .cmp(b.fwd.contig())
            .then(a.fwd.start().cmp(&b.fwd.start()))
            .then(a.rev.start().cmp(&b.rev.start()))
            .then(a.fwd.seq().cmp(b.fwd.seq()))
            .then(a.rev.seq().cmp(b.rev.seq()))
    });
}

/// Renders one outgroup product set: `NA`/`0` when the pair never amplifies
/// there, the single record when it amplifies once, comma-joined columns for
/// multiple products.
fn outgroup_cells(products: &BTreeSet<(String, usize)>) -> (String, String) {
    match products.len() {
        0 => ("NA".to_string(), "0".to_string()),
        1 => {
            let (contig, len) = products.iter().next().unwrap();
            (contig.clone(), len.to_string())
        }
        _ => {
            let contigs: Vec<&str> = products.iter().map(|(c, _)| c.as_str()).collect();
            let lens: Vec<String> = products.iter().map(|(_, l)| l.to_string()).collect();
            (contigs.join(","), lens.join(","))
        }
    }
}

/// Writes the final pair table: six primer columns, then a contig and a
/// product-length column per genome, ingroup genomes before outgroup
/// genomes, each group in sorted name order.
pub fn write_pairs(
    path: &Path,
    pairs: &[DesignedPair],
    ingroup_names: &[String],
    outgroup_names: &[String],
) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating output file {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let mut header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    for name in ingroup_names.iter().chain(outgroup_names.iter()) {
        header.push(format!("{name}_contig"));
        header.push(format!("{name}_length"));
    }
    writeln!(out, "{}", header.join("\t"))?;

    for pair in pairs {
        let mut row = vec![
            pair.fwd.seq_string(),
            format!("{:.1}", pair.fwd.tm()),
            format!("{:.1}", pair.fwd.gc_percent()),
            pair.rev.seq_string(),
            format!("{:.1}", pair.rev.tm()),
            format!("{:.1}", pair.rev.gc_percent()),
        ];
        for name in ingroup_names {
            let (contig, len) = &pair.ingroup[name];
            row.push(contig.clone());
            row.push(len.to_string());
        }
        for name in outgroup_names {
            let empty = BTreeSet::new();
            let products = pair.outgroup.get(name).unwrap_or(&empty);
            let (contigs, lens) = outgroup_cells(products);
            row.push(contigs);
            row.push(lens);
        }
        writeln!(out, "{}", row.join("\t"))?;
    }
    out.flush()?;
    Ok(())
}
