//! Block records and the ordered block set built from input files

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FlashError, FlashResult};
use crate::registry::BlockRegistry;

/// One input binary paired with the block it targets.
///
/// The Nth identifier on the command line binds to the Nth file; this type
/// makes that pairing explicit so the rest of the crate never sees two
/// parallel lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInput {
    pub path: PathBuf,
    pub identifier: String,
}

impl BlockInput {
    pub fn new(path: impl Into<PathBuf>, identifier: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            identifier: identifier.into(),
        }
    }

    /// Zip files and identifiers index by index.
    ///
    /// Fails when the counts differ or when nothing was supplied.
    pub fn pair(files: Vec<PathBuf>, identifiers: Vec<String>) -> FlashResult<Vec<BlockInput>> {
        if files.len() != identifiers.len() {
            return Err(FlashError::PairingCountMismatch {
                blocks: identifiers.len(),
                files: files.len(),
            });
        }
        if files.is_empty() {
            return Err(FlashError::NoInputFiles);
        }

        Ok(files
            .into_iter()
            .zip(identifiers)
            .map(|(path, identifier)| BlockInput { path, identifier })
            .collect())
    }
}

/// A binary payload bound to a registered block number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub source_path: PathBuf,
    pub block_number: u8,
    pub binary_data: Vec<u8>,
}

/// Ordered collection of block records, keyed by source path.
///
/// Iteration order is the order the inputs were given in. Source paths are
/// unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    records: Vec<BlockRecord>,
}

impl BlockSet {
    /// Resolve identifiers, reject duplicates, then read every file.
    ///
    /// All identifier and path checks run before the first read, so a bad
    /// identifier or repeated path never touches the file system.
    pub fn build(registry: &BlockRegistry, inputs: Vec<BlockInput>) -> FlashResult<Self> {
        if inputs.is_empty() {
            return Err(FlashError::NoInputFiles);
        }

        let mut seen = HashSet::with_capacity(inputs.len());
        let mut resolved = Vec::with_capacity(inputs.len());
        for input in inputs {
            let block_number = registry.resolve(&input.identifier)?;
            if !seen.insert(input.path.clone()) {
                return Err(FlashError::DuplicateSourcePath(input.path));
            }
            resolved.push((input.path, block_number));
        }

        let mut records = Vec::with_capacity(resolved.len());
        for (source_path, block_number) in resolved {
            let binary_data =
                std::fs::read(&source_path).map_err(|source| FlashError::InputFileUnreadable {
                    path: source_path.clone(),
                    source,
                })?;
            debug!(
                path = %source_path.display(),
                block = block_number,
                size = binary_data.len(),
                "Loaded block"
            );
            records.push(BlockRecord {
                source_path,
                block_number,
                binary_data,
            });
        }

        Ok(Self { records })
    }

    /// Assemble a set from records produced elsewhere (e.g. by a collaborator)
    pub fn from_records(records: Vec<BlockRecord>) -> FlashResult<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.source_path.as_path()) {
                return Err(FlashError::DuplicateSourcePath(record.source_path.clone()));
            }
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BlockRecord> {
        self.records.iter()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&BlockRecord> {
        let path = path.as_ref();
        self.records.iter().find(|r| r.source_path == path)
    }

    /// Total payload size in bytes
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.binary_data.len() as u64).sum()
    }

    /// Produce a new set with every payload replaced by `f`.
    ///
    /// `self` is left untouched, so callers still hold the original payloads
    /// if the transform fails part way.
    pub fn map_payloads<E, F>(&self, mut f: F) -> Result<BlockSet, E>
    where
        F: FnMut(&BlockRecord) -> Result<Vec<u8>, E>,
    {
        let records = self
            .records
            .iter()
            .map(|record| {
                Ok(BlockRecord {
                    source_path: record.source_path.clone(),
                    block_number: record.block_number,
                    binary_data: f(record)?,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(BlockSet { records })
    }
}

impl<'a> IntoIterator for &'a BlockSet {
    type Item = &'a BlockRecord;
    type IntoIter = std::slice::Iter<'a, BlockRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, n: u8, data: &[u8]) -> BlockRecord {
        BlockRecord {
            source_path: PathBuf::from(path),
            block_number: n,
            binary_data: data.to_vec(),
        }
    }

    #[test]
    fn test_pair_counts() {
        let err = BlockInput::pair(vec!["a.bin".into()], vec![]).unwrap_err();
        assert!(matches!(
            err,
            FlashError::PairingCountMismatch { blocks: 0, files: 1 }
        ));

        let err = BlockInput::pair(vec![], vec![]).unwrap_err();
        assert!(matches!(err, FlashError::NoInputFiles));

        let pairs = BlockInput::pair(
            vec!["a.bin".into(), "b.bin".into()],
            vec!["CAL".into(), "2".into()],
        )
        .unwrap();
        assert_eq!(pairs[0], BlockInput::new("a.bin", "CAL"));
        assert_eq!(pairs[1], BlockInput::new("b.bin", "2"));
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let err = BlockSet::from_records(vec![record("a.bin", 1, b"x"), record("a.bin", 2, b"y")])
            .unwrap_err();
        assert!(matches!(err, FlashError::DuplicateSourcePath(p) if p == Path::new("a.bin")));
    }

    #[test]
    fn test_map_payloads_keeps_original() {
        let set =
            BlockSet::from_records(vec![record("a.bin", 1, b"abc"), record("b.bin", 5, b"")]).unwrap();
        let upper = set
            .map_payloads::<(), _>(|r| Ok(r.binary_data.to_ascii_uppercase()))
            .unwrap();

        assert_eq!(set.get("a.bin").unwrap().binary_data, b"abc");
        assert_eq!(upper.get("a.bin").unwrap().binary_data, b"ABC");
        assert_eq!(upper.get("b.bin").unwrap().block_number, 5);
        assert_eq!(upper.len(), 2);
        assert_eq!(set.total_bytes(), 3);
    }

    #[test]
    fn test_map_payloads_error_stops() {
        let set = BlockSet::from_records(vec![record("a.bin", 1, b"a"), record("b.bin", 2, b"b")])
            .unwrap();
        let mut calls = 0;
        let result: Result<BlockSet, &str> = set.map_payloads(|_| {
            calls += 1;
            Err("boom")
        });
        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(calls, 1);
    }
}
