//! FASTA input via `bio::io::fasta`.
//!
//! A [`FastaSource`] is restartable: every call to [`FastaSource::records`]
//! reopens the file, so the batch can be scanned once for validation and
//! then iterated for the actual run.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use bio::io::fasta;

use crate::error::TootError;

/// One input sequence. The identifier doubles as a directory name.
#[derive(Debug, Clone)]
pub struct SequenceRecord(fasta::Record);

impl SequenceRecord {
    #[cfg(test)]
    pub fn new(id: &str, desc: Option<&str>, seq: &[u8]) -> Self {
        Self(fasta::Record::with_attrs(id, desc, seq))
    }

    pub fn id(&self) -> &str {
        self.0.id()
    }

    #[cfg(test)]
    pub fn seq(&self) -> &[u8] {
        self.0.seq()
    }

    /// Writes this record alone as a FASTA file.
    pub fn write_fasta(&self, path: &Path) -> std::io::Result<()> {
        let mut writer = fasta::Writer::new(File::create(path)?);
        writer.write_record(&self.0)?;
        writer.flush()
    }

    pub(crate) fn as_fasta(&self) -> &fasta::Record {
        &self.0
    }
}

impl From<fasta::Record> for SequenceRecord {
    fn from(record: fasta::Record) -> Self {
        Self(record)
    }
}

/// A FASTA file on disk, read lazily.
#[derive(Debug, Clone)]
pub struct FastaSource {
    path: PathBuf,
}

impl FastaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens the file and yields its records in order.
    pub fn records(&self) -> Result<impl Iterator<Item = Result<SequenceRecord, TootError>> + use<>, TootError> {
        let file = File::open(&self.path).map_err(|e| {
            TootError::Input(format!("cannot open {}: {e}", self.path.display()))
        })?;
        let path = self.path.clone();
        Ok(fasta::Reader::new(file).records().map(move |r| {
            r.map(SequenceRecord::from).map_err(|e| {
                TootError::Input(format!("malformed FASTA in {}: {e}", path.display()))
            })
        }))
    }

    /// Reads the whole batch once, checking that every identifier is usable as a
    /// directory name and unique. Returns the record count.
    pub fn scan(&self) -> Result<usize, TootError> {
        let mut seen = HashSet::new();
        for record in self.records()? {
            let record = record?;
            let id = record.id();
            validate_id(id)?;
            if !seen.insert(id.to_string()) {
                return Err(TootError::Input(format!(
                    "duplicate record identifier {id:?} in {}",
                    self.path.display()
                )));
            }
        }
        Ok(seen.len())
    }
}

/// Rejects identifiers that would escape or alias a workspace directory.
pub fn validate_id(id: &str) -> Result<(), TootError> {
    if id.is_empty() {
        return Err(TootError::Input("record with an empty identifier".into()));
    }
    if id == "." || id == ".." || id.contains('/') || id.contains('\\') || id.contains('\0') {
        return Err(TootError::Input(format!(
            "record identifier {id:?} is not usable as a directory name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fasta_file(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("in.fasta");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn iterates_records_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = fasta_file(&tmp, ">A first\nMKV\nLLA\n>B\nGG\n");
        let source = FastaSource::new(&path);

        let records: Vec<_> = source.records().unwrap().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "A");
        assert_eq!(records[0].seq(), b"MKVLLA");
        assert_eq!(records[1].id(), "B");
    }

    #[test]
    fn source_is_restartable() {
        let tmp = TempDir::new().unwrap();
        let path = fasta_file(&tmp, ">A\nM\n>B\nK\n");
        let source = FastaSource::new(&path);
        assert_eq!(source.scan().unwrap(), 2);
        assert_eq!(source.records().unwrap().count(), 2);
    }

    #[test]
    fn scan_rejects_duplicates() {
        let tmp = TempDir::new().unwrap();
        let path = fasta_file(&tmp, ">A\nM\n>A\nK\n");
        let err = FastaSource::new(&path).scan().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn scan_rejects_path_like_ids() {
        let tmp = TempDir::new().unwrap();
        let path = fasta_file(&tmp, ">sp/../x\nM\n");
        assert!(FastaSource::new(&path).scan().is_err());
    }

    #[test]
    fn validate_id_accepts_uniprot_headers() {
        assert!(validate_id("sp|P12345|ABC_HUMAN").is_ok());
        assert!(validate_id("..").is_err());
        assert!(validate_id("").is_err());
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let tmp = TempDir::new().unwrap();
        let result = FastaSource::new(tmp.path().join("nope.fasta")).records();
        assert!(matches!(result, Err(TootError::Input(_))));
    }

    #[test]
    fn single_record_file_round_trips() {
        let tmp = TempDir::new().unwrap();
        let record = SequenceRecord::new("Q1", Some("desc"), b"MKVL");
        let out = tmp.path().join("Q1.fasta");
        record.write_fasta(&out).unwrap();

        let back: Vec<_> = FastaSource::new(&out).records().unwrap().map(Result::unwrap).collect();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].id(), "Q1");
        assert_eq!(back[0].seq(), b"MKVL");
    }
}
