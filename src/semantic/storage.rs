//! Binary storage for the word index.
//!
//! File format: words.idx
//!
//! Header (51 bytes):
//! - magic: [u8; 4] (b"LXIX")
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated, insertion order):
//! - word_len: u16 (little-endian)
//! - word: [u8; word_len] (UTF-8)
//! - embedding: [f32; dimensions] (little-endian)
//!
//! Trailer:
//! - body_checksum: u32 (CRC32 of all entry bytes)

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::eid::Eid;
use crate::semantic::index::{IndexEntry, IndexError, SimilarityIndex};

const MAGIC: [u8; 4] = *b"LXIX";

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: magic(4) + version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 51;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexStorageError {
    #[error("index file not found: {0}")]
    Missing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: index was built with a different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid index contents: {0}")]
    Index(#[from] IndexError),
}

/// Metadata stored in the index header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u8,
    pub model_id: [u8; 32],
    pub dimensions: u16,
    pub entry_count: u64,
}

impl IndexHeader {
    /// Short hex prefix of the model id, for display.
    pub fn model_id_short(&self) -> String {
        self.model_id[..6].iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Storage manager for the word index artifact.
///
/// Reading needs no encoder; callers that want to query the index
/// verify the model with `load_for`.
pub struct IndexStorage {
    path: PathBuf,
}

impl IndexStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and verify only the header.
    pub fn read_header(&self) -> Result<IndexHeader, IndexStorageError> {
        let mut reader = self.open()?;
        Self::read_header_from(&mut reader)
    }

    /// Load the whole index, verifying header and body checksums.
    pub fn load(&self) -> Result<(IndexHeader, SimilarityIndex), IndexStorageError> {
        let mut reader = self.open()?;
        let header = Self::read_header_from(&mut reader)?;
        let index = Self::read_body(&mut reader, &header)?;
        Ok((header, index))
    }

    /// Load the index and check it was built by the expected model.
    ///
    /// Header and body come from the same open file, so a concurrent
    /// publish cannot swap the body under a validated header.
    ///
    /// # Arguments
    /// * `expected_model_id` - SHA256 hash of the expected model name
    /// * `expected_dimensions` - Expected embedding dimensions
    pub fn load_for(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<SimilarityIndex, IndexStorageError> {
        let mut reader = self.open()?;
        Self::read_validated(&mut reader, expected_model_id, expected_dimensions)
    }

    fn read_validated<R: Read>(
        reader: &mut R,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<SimilarityIndex, IndexStorageError> {
        let header = Self::read_header_from(reader)?;
        Self::validate_header(&header, expected_model_id, expected_dimensions)?;
        Self::read_body(reader, &header)
    }

    fn read_body<R: Read>(
        reader: &mut R,
        header: &IndexHeader,
    ) -> Result<SimilarityIndex, IndexStorageError> {
        let dimensions = header.dimensions as usize;
        let mut hasher = crc32fast::Hasher::new();
        let mut entries = Vec::with_capacity(header.entry_count.min(1 << 20) as usize);

        for _ in 0..header.entry_count {
            entries.push(Self::read_entry(reader, dimensions, &mut hasher)?);
        }

        let mut trailer = [0u8; 4];
        read_exact_or_truncated(reader, &mut trailer)?;
        if u32::from_le_bytes(trailer) != hasher.finalize() {
            return Err(IndexStorageError::ChecksumMismatch);
        }

        let mut rest = [0u8; 1];
        if reader.read(&mut rest)? != 0 {
            return Err(IndexStorageError::InvalidFormat(
                "trailing bytes after index body".to_string(),
            ));
        }

        Ok(SimilarityIndex::from_entries(dimensions, entries)?)
    }

    /// Save the index to storage.
    ///
    /// Uses atomic write: temp file -> fsync -> rename. The previously
    /// published file stays untouched if anything fails.
    pub fn save(&self, index: &SimilarityIndex, model_id: &[u8; 32]) -> Result<(), IndexStorageError> {
        if index.dimensions() > u16::MAX as usize {
            return Err(IndexStorageError::InvalidFormat(format!(
                "{} dimensions do not fit the header",
                index.dimensions()
            )));
        }

        let temp_path = self.temp_path();
        log::debug!("writing index to {}", temp_path.display());

        let result = self.write_to_file(&temp_path, index, model_id);

        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        if let Err(err) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err.into());
        }

        Ok(())
    }

    /// Unique sibling of the artifact, so concurrent builds never share a temp file.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!("{}-{name}.tmp", Eid::new()))
    }

    fn open(&self) -> Result<BufReader<File>, IndexStorageError> {
        match File::open(&self.path) {
            Ok(file) => Ok(BufReader::new(file)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(IndexStorageError::Missing(self.path.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write_to_file(
        &self,
        path: &Path,
        index: &SimilarityIndex,
        model_id: &[u8; 32],
    ) -> Result<(), IndexStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = IndexHeader {
            version: FORMAT_VERSION,
            model_id: *model_id,
            dimensions: index.dimensions() as u16,
            entry_count: index.len() as u64,
        };
        Self::write_header(&mut writer, &header)?;

        let mut hasher = crc32fast::Hasher::new();
        for entry in index.iter() {
            Self::write_entry(&mut writer, entry, &mut hasher)?;
        }
        writer.write_all(&hasher.finalize().to_le_bytes())?;

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        file.sync_all()?;

        Ok(())
    }

    fn read_header_from<R: Read>(reader: &mut R) -> Result<IndexHeader, IndexStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        read_exact_or_truncated(reader, &mut header_bytes)?;

        if header_bytes[0..4] != MAGIC {
            return Err(IndexStorageError::InvalidFormat(
                "not a word index file".to_string(),
            ));
        }

        let version = header_bytes[4];
        if version != FORMAT_VERSION {
            return Err(IndexStorageError::VersionMismatch(version, FORMAT_VERSION));
        }

        let stored_checksum = u32::from_le_bytes([
            header_bytes[47],
            header_bytes[48],
            header_bytes[49],
            header_bytes[50],
        ]);
        if stored_checksum != crc32fast::hash(&header_bytes[0..47]) {
            return Err(IndexStorageError::ChecksumMismatch);
        }

        let mut model_id = [0u8; 32];
        model_id.copy_from_slice(&header_bytes[5..37]);

        let dimensions = u16::from_le_bytes([header_bytes[37], header_bytes[38]]);

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header_bytes[39..47]);
        let entry_count = u64::from_le_bytes(count_bytes);

        Ok(IndexHeader {
            version,
            model_id,
            dimensions,
            entry_count,
        })
    }

    fn validate_header(
        header: &IndexHeader,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<(), IndexStorageError> {
        if header.model_id != *expected_model_id {
            return Err(IndexStorageError::ModelMismatch);
        }

        if header.dimensions as usize != expected_dimensions {
            return Err(IndexStorageError::DimensionMismatch {
                expected: expected_dimensions,
                got: header.dimensions as usize,
            });
        }

        Ok(())
    }

    fn write_header<W: Write>(writer: &mut W, header: &IndexHeader) -> Result<(), IndexStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];

        header_bytes[0..4].copy_from_slice(&MAGIC);
        header_bytes[4] = header.version;
        header_bytes[5..37].copy_from_slice(&header.model_id);
        header_bytes[37..39].copy_from_slice(&header.dimensions.to_le_bytes());
        header_bytes[39..47].copy_from_slice(&header.entry_count.to_le_bytes());

        let checksum = crc32fast::hash(&header_bytes[0..47]);
        header_bytes[47..51].copy_from_slice(&checksum.to_le_bytes());

        writer.write_all(&header_bytes)?;
        Ok(())
    }

    fn read_entry<R: Read>(
        reader: &mut R,
        dimensions: usize,
        hasher: &mut crc32fast::Hasher,
    ) -> Result<IndexEntry, IndexStorageError> {
        let mut len_bytes = [0u8; 2];
        read_exact_or_truncated(reader, &mut len_bytes)?;
        hasher.update(&len_bytes);

        let mut word_bytes = vec![0u8; u16::from_le_bytes(len_bytes) as usize];
        read_exact_or_truncated(reader, &mut word_bytes)?;
        hasher.update(&word_bytes);

        let word = String::from_utf8(word_bytes)
            .map_err(|_| IndexStorageError::InvalidFormat("word is not valid UTF-8".to_string()))?;

        let mut embedding = Vec::with_capacity(dimensions);
        for _ in 0..dimensions {
            let mut float_bytes = [0u8; 4];
            read_exact_or_truncated(reader, &mut float_bytes)?;
            hasher.update(&float_bytes);
            embedding.push(f32::from_le_bytes(float_bytes));
        }

        Ok(IndexEntry { word, embedding })
    }

    fn write_entry<W: Write>(
        writer: &mut W,
        entry: &IndexEntry,
        hasher: &mut crc32fast::Hasher,
    ) -> Result<(), IndexStorageError> {
        let word = entry.word.as_bytes();
        let len = u16::try_from(word.len()).map_err(|_| {
            IndexStorageError::InvalidFormat(format!("word too long: {} bytes", word.len()))
        })?;

        let len_bytes = len.to_le_bytes();
        writer.write_all(&len_bytes)?;
        hasher.update(&len_bytes);
        writer.write_all(word)?;
        hasher.update(word);

        for &value in &entry.embedding {
            let bytes = value.to_le_bytes();
            writer.write_all(&bytes)?;
            hasher.update(&bytes);
        }

        Ok(())
    }
}

fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), IndexStorageError> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            IndexStorageError::InvalidFormat("index file is truncated".to_string())
        }
        _ => err.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};

    fn test_model_id() -> [u8; 32] {
        let mut id = [0u8; 32];
        id[0] = 0xAB;
        id[31] = 0xCD;
        id
    }

    fn sample_index() -> SimilarityIndex {
        SimilarityIndex::from_entries(
            3,
            vec![
                IndexEntry {
                    word: "cat".to_string(),
                    embedding: vec![1.0, 0.0, 0.0],
                },
                IndexEntry {
                    word: "café".to_string(),
                    embedding: vec![0.0, 1.0, 0.0],
                },
                IndexEntry {
                    word: "dog".to_string(),
                    embedding: vec![0.0, 0.5, 0.5],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load_preserves_order_and_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("words.idx"));

        storage.save(&sample_index(), &test_model_id()).unwrap();
        assert!(storage.exists());

        let (header, loaded) = storage.load().unwrap();
        assert_eq!(header.entry_count, 3);
        assert_eq!(header.dimensions, 3);
        assert_eq!(header.model_id, test_model_id());

        let original: Vec<_> = sample_index().iter().cloned().collect();
        let reloaded: Vec<_> = loaded.iter().cloned().collect();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn test_save_and_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("words.idx"));

        let index = SimilarityIndex::from_entries(384, vec![]).unwrap();
        storage.save(&index, &test_model_id()).unwrap();

        let loaded = storage.load_for(&test_model_id(), 384).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimensions(), 384);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("absent.idx"));

        assert!(matches!(storage.load(), Err(IndexStorageError::Missing(_))));
        assert!(matches!(storage.read_header(), Err(IndexStorageError::Missing(_))));
    }

    #[test]
    fn test_model_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("words.idx"));
        storage.save(&sample_index(), &test_model_id()).unwrap();

        let mut wrong_model_id = [0u8; 32];
        wrong_model_id[0] = 0xFF;

        let result = storage.load_for(&wrong_model_id, 3);
        assert!(matches!(result, Err(IndexStorageError::ModelMismatch)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("words.idx"));
        storage.save(&sample_index(), &test_model_id()).unwrap();

        let result = storage.load_for(&test_model_id(), 384);
        assert!(matches!(
            result,
            Err(IndexStorageError::DimensionMismatch { expected: 384, got: 3 })
        ));
    }

    #[test]
    fn test_header_checksum_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.idx");
        let storage = IndexStorage::new(path.clone());
        storage.save(&sample_index(), &test_model_id()).unwrap();

        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(10)).unwrap();
        file.write_all(&[0xFF]).unwrap();

        assert!(matches!(storage.load(), Err(IndexStorageError::ChecksumMismatch)));
    }

    #[test]
    fn test_body_checksum_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.idx");
        let storage = IndexStorage::new(path.clone());
        storage.save(&sample_index(), &test_model_id()).unwrap();

        // first byte of the first word
        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(HEADER_SIZE as u64 + 2)).unwrap();
        file.write_all(b"b").unwrap();

        assert!(matches!(storage.load(), Err(IndexStorageError::ChecksumMismatch)));
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.idx");
        let storage = IndexStorage::new(path.clone());
        storage.save(&sample_index(), &test_model_id()).unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 6).unwrap();

        assert!(matches!(storage.load(), Err(IndexStorageError::InvalidFormat(_))));
    }

    #[test]
    fn test_garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.idx");
        std::fs::write(&path, vec![0x42u8; 128]).unwrap();

        let storage = IndexStorage::new(path);
        assert!(matches!(storage.load(), Err(IndexStorageError::InvalidFormat(_))));
    }

    #[test]
    fn test_failed_save_keeps_previous_file_and_cleans_up() {
        let path = PathBuf::from("/nonexistent/directory/words.idx");
        let storage = IndexStorage::new(path.clone());

        let result = storage.save(&sample_index(), &test_model_id());

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_replaces_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("words.idx"));

        storage.save(&sample_index(), &test_model_id()).unwrap();
        let smaller = SimilarityIndex::from_entries(
            3,
            vec![IndexEntry {
                word: "owl".to_string(),
                embedding: vec![0.0, 0.0, 1.0],
            }],
        )
        .unwrap();
        storage.save(&smaller, &test_model_id()).unwrap();

        let (header, loaded) = storage.load().unwrap();
        assert_eq!(header.entry_count, 1);
        assert_eq!(loaded.iter().next().map(|e| e.word.as_str()), Some("owl"));

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1, "no temp files left behind");
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let storage = IndexStorage::new(PathBuf::from("/srv/lexis/words.idx"));

        let a = storage.temp_path();
        let b = storage.temp_path();

        assert_ne!(a, b);
        assert_eq!(a.parent(), storage.path().parent());
        assert!(a.to_string_lossy().ends_with("-words.idx.tmp"));
    }

    #[test]
    fn test_model_is_checked_against_the_bytes_actually_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = IndexStorage::new(dir.path().join("words.idx"));
        storage.save(&sample_index(), &test_model_id()).unwrap();
        let bytes = std::fs::read(storage.path()).unwrap();

        // same dimensions, different model: rejected from one pass over the bytes
        let mut other_model = test_model_id();
        other_model[0] = 0x01;
        let result = IndexStorage::read_validated(&mut bytes.as_slice(), &other_model, 3);
        assert!(matches!(result, Err(IndexStorageError::ModelMismatch)));

        let index = IndexStorage::read_validated(&mut bytes.as_slice(), &test_model_id(), 3).unwrap();
        assert_eq!(index.len(), 3);
    }
}
