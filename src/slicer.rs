//! Batch preparation helpers: splitting a large FASTA into pieces and pulling a
//! subset of records back out of one.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use bio::io::fasta;
use tracing::{debug, info};

use crate::error::TootError;
use crate::sequence::{FastaSource, SequenceRecord};

/// Splits `input` into at most `pieces` files named `1.fasta`, `2.fasta`, … in `out_dir`.
///
/// Records are dealt out in order; the first `count % pieces` files get one extra.
/// `out_dir` is created if missing and must be empty. Returns the number of files written.
pub fn split_fasta(input: &Path, out_dir: &Path, pieces: usize) -> Result<usize, TootError> {
    if pieces == 0 {
        return Err(TootError::Input("piece count must be at least 1".into()));
    }
    if !out_dir.exists() {
        fs::create_dir_all(out_dir).map_err(|e| TootError::workspace(out_dir, e))?;
    }
    if !out_dir.is_dir() {
        return Err(TootError::Input(format!(
            "{} must reference a directory",
            out_dir.display()
        )));
    }
    if fs::read_dir(out_dir)?.next().is_some() {
        return Err(TootError::Input(format!(
            "{} must be empty",
            out_dir.display()
        )));
    }

    let source = FastaSource::new(input);
    let count = source.records()?.count();
    let pieces = if count < pieces {
        info!("There were fewer than {pieces} proteins. Resetting size to {count}.");
        count
    } else {
        pieces
    };
    if pieces == 0 {
        return Ok(0);
    }

    let per_piece = count / pieces;
    let leftovers = count % pieces;
    let mut records = source.records()?;

    for piece in 1..=pieces {
        let size = per_piece + usize::from(piece <= leftovers);
        let path = out_dir.join(format!("{piece}.fasta"));
        let mut writer = fasta::Writer::new(
            File::create(&path).map_err(|e| TootError::workspace(&path, e))?,
        );
        for record in records.by_ref().take(size) {
            writer.write_record(record?.as_fasta())?;
        }
        writer.flush()?;
        debug!(piece, size, "wrote piece");
    }
    Ok(pieces)
}

/// Lookup key for a FASTA header: the accession of a UniProt-style id
/// (`sp|ACC|NAME`, `tr|ACC|NAME`, `|ACC|`), otherwise the id itself; dots removed.
pub fn accession_key(record: &SequenceRecord) -> String {
    let id = record.id();
    let mut fields = id.split('|');
    let accession = match (fields.next(), fields.next(), fields.next()) {
        (Some("sp" | "tr" | ""), Some(acc), Some(_)) => acc,
        _ => id,
    };
    accession.replace('.', "")
}

/// Writes the records of `input` whose [`accession_key`] is in `wanted` to `output`.
/// Returns how many were written.
pub fn extract_records(
    input: &Path,
    wanted: &HashSet<String>,
    output: &Path,
) -> Result<usize, TootError> {
    let mut writer = fasta::Writer::new(
        File::create(output).map_err(|e| TootError::workspace(output, e))?,
    );
    let mut written = 0;
    for record in FastaSource::new(input).records()? {
        let record = record?;
        if wanted.contains(&accession_key(&record)) {
            debug!(record = record.id(), "extracted");
            writer.write_record(record.as_fasta())?;
            written += 1;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Reads a plain id list, one per line; blank lines are skipped.
pub fn read_id_list(path: &Path) -> Result<HashSet<String>, TootError> {
    let body = fs::read_to_string(path)
        .map_err(|e| TootError::Input(format!("cannot read {}: {e}", path.display())))?;
    Ok(body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fasta_with(dir: &TempDir, n: usize) -> PathBuf {
        let path = dir.path().join("in.fasta");
        let body: String = (1..=n).map(|i| format!(">P{i}\nMKV\n")).collect();
        fs::write(&path, body).unwrap();
        path
    }

    fn count_records(path: &Path) -> usize {
        FastaSource::new(path).records().unwrap().count()
    }

    #[test]
    fn split_deals_leftovers_to_first_pieces() {
        let tmp = TempDir::new().unwrap();
        let input = fasta_with(&tmp, 7);
        let out = tmp.path().join("pieces");

        let written = split_fasta(&input, &out, 3).unwrap();
        assert_eq!(written, 3);
        assert_eq!(count_records(&out.join("1.fasta")), 3);
        assert_eq!(count_records(&out.join("2.fasta")), 2);
        assert_eq!(count_records(&out.join("3.fasta")), 2);
    }

    #[test]
    fn split_keeps_record_order() {
        let tmp = TempDir::new().unwrap();
        let input = fasta_with(&tmp, 4);
        let out = tmp.path().join("pieces");
        split_fasta(&input, &out, 2).unwrap();

        let ids: Vec<String> = FastaSource::new(out.join("2.fasta"))
            .records()
            .unwrap()
            .map(|r| r.unwrap().id().to_string())
            .collect();
        assert_eq!(ids, vec!["P3", "P4"]);
    }

    #[test]
    fn split_shrinks_to_record_count() {
        let tmp = TempDir::new().unwrap();
        let input = fasta_with(&tmp, 2);
        let out = tmp.path().join("pieces");

        assert_eq!(split_fasta(&input, &out, 100).unwrap(), 2);
        assert!(!out.join("3.fasta").exists());
    }

    #[test]
    fn split_refuses_non_empty_output() {
        let tmp = TempDir::new().unwrap();
        let input = fasta_with(&tmp, 2);
        let out = tmp.path().join("pieces");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("junk"), "x").unwrap();

        assert!(split_fasta(&input, &out, 2).is_err());
    }

    #[test]
    fn accession_key_handles_uniprot_and_plain_ids() {
        let sp = SequenceRecord::new("sp|P12345|ABC_HUMAN", None, b"M");
        let tr = SequenceRecord::new("tr|A0A0.1|X", None, b"M");
        let plain = SequenceRecord::new("XP_001.2", None, b"M");
        assert_eq!(accession_key(&sp), "P12345");
        assert_eq!(accession_key(&tr), "A0A01");
        assert_eq!(accession_key(&plain), "XP_0012");
    }

    #[test]
    fn extract_writes_only_wanted_records() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.fasta");
        fs::write(&input, ">sp|P1|A\nM\n>sp|P2|B\nK\n>P3 free text\nL\n").unwrap();
        let ids = tmp.path().join("ids.txt");
        fs::write(&ids, "P2\n\nP3\n").unwrap();
        let out = tmp.path().join("subset.fasta");

        let wanted = read_id_list(&ids).unwrap();
        assert_eq!(extract_records(&input, &wanted, &out).unwrap(), 2);

        let kept: Vec<String> = FastaSource::new(&out)
            .records()
            .unwrap()
            .map(|r| r.unwrap().id().to_string())
            .collect();
        assert_eq!(kept, vec!["sp|P2|B", "P3"]);
    }
}
