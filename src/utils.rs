use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    File::open(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            io::Error::new(e.kind(), format!("File not found: {:?}", path.as_ref()))
        } else {
            e
        }
    })
}

/// Genome name for a sequence file: the basename without its extension, with
/// a trailing `.gz` stripped first so `strain.fasta.gz` names `strain`.
pub fn genome_name(path: &Path) -> String {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(stripped) = name.strip_suffix(".gz") {
        name = stripped.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => name[..dot].to_string(),
        _ => name,
    }
}

static TEMP_FILE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// A process-unique scratch path in the system temp directory. The counter
/// keeps concurrent pipelines inside one process (tests) from colliding.
pub fn temp_file_path(stem: &str) -> PathBuf {
    let seq = TEMP_FILE_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("panprimer-{}-{}-{}.tsv", process::id(), seq, stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genome_name() {
        assert_eq!(genome_name(Path::new("/data/strainA.fasta")), "strainA");
        assert_eq!(genome_name(Path::new("strainB.fasta.gz")), "strainB");
        assert_eq!(genome_name(Path::new("plain")), "plain");
        assert_eq!(genome_name(Path::new("dir/x.y.gbk")), "x.y");
    }

    #[test]
    fn test_temp_file_paths_are_unique() {
        let a = temp_file_path("pairs");
        let b = temp_file_path("pairs");
        assert_ne!(a, b);
    }
}
