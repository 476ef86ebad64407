//! Block identifier registry
//!
//! A closed, read-only table mapping block names to block numbers, plus the
//! byte range in each block where the software version string lives.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::{FlashError, FlashResult};

/// One row of the static block table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub name: &'static str,
    pub number: u8,
    /// Byte range of the embedded software version string
    pub version_range: Range<usize>,
}

const fn descriptor(name: &'static str, number: u8, start: usize, end: usize) -> BlockDescriptor {
    BlockDescriptor {
        name,
        number,
        version_range: start..end,
    }
}

/// Simos18 flash layout
pub const SIMOS18_BLOCKS: [BlockDescriptor; 6] = [
    descriptor("CBOOT", 1, 0x437, 0x43F),
    descriptor("ASW1", 2, 0x627, 0x62F),
    descriptor("ASW2", 3, 0x203, 0x20B),
    descriptor("ASW3", 4, 0x203, 0x20B),
    descriptor("CAL", 5, 0x23, 0x2B),
    descriptor("CBOOT_temp", 6, 0x437, 0x43F),
];

/// Bidirectional name/number lookup over a fixed set of blocks.
///
/// Built once at startup and passed by reference; never mutated.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<BlockDescriptor>,
    by_name: HashMap<&'static str, usize>,
    by_number: HashMap<u8, usize>,
}

impl BlockRegistry {
    /// Build a registry, rejecting tables where a name or number repeats or
    /// a version range is inverted
    pub fn from_table(table: &[BlockDescriptor]) -> FlashResult<Self> {
        let mut by_name = HashMap::with_capacity(table.len());
        let mut by_number = HashMap::with_capacity(table.len());

        for (idx, block) in table.iter().enumerate() {
            if block.version_range.start > block.version_range.end {
                return Err(FlashError::RegistryConflict(format!(
                    "block '{}' has inverted version range {:#x}..{:#x}",
                    block.name, block.version_range.start, block.version_range.end
                )));
            }
            if by_name.insert(block.name, idx).is_some() {
                return Err(FlashError::RegistryConflict(format!(
                    "block name '{}' registered twice",
                    block.name
                )));
            }
            if by_number.insert(block.number, idx).is_some() {
                return Err(FlashError::RegistryConflict(format!(
                    "block number {} registered twice",
                    block.number
                )));
            }
        }

        Ok(Self {
            blocks: table.to_vec(),
            by_name,
            by_number,
        })
    }

    /// Registry for the Simos18 block layout
    pub fn simos18() -> FlashResult<Self> {
        Self::from_table(&SIMOS18_BLOCKS)
    }

    /// Resolve a block name or a numeric block code to the block number.
    ///
    /// A registered number in canonical decimal form ("5", not "05", "+5"
    /// or " 5") wins; anything else is looked up as a name.
    pub fn resolve(&self, identifier: &str) -> FlashResult<u8> {
        if let Ok(number) = identifier.parse::<u8>() {
            if self.by_number.contains_key(&number) && number.to_string() == identifier {
                return Ok(number);
            }
        }

        self.by_name
            .get(identifier)
            .map(|&idx| self.blocks[idx].number)
            .ok_or_else(|| FlashError::UnknownBlockIdentifier(identifier.to_string()))
    }

    /// Name of a registered block number
    pub fn name_of(&self, number: u8) -> FlashResult<&'static str> {
        self.descriptor(number).map(|d| d.name)
    }

    /// Version string byte range of a registered block number
    pub fn version_offset_of(&self, number: u8) -> FlashResult<Range<usize>> {
        self.descriptor(number).map(|d| d.version_range.clone())
    }

    fn descriptor(&self, number: u8) -> FlashResult<&BlockDescriptor> {
        self.by_number
            .get(&number)
            .map(|&idx| &self.blocks[idx])
            .ok_or_else(|| FlashError::UnknownBlockIdentifier(number.to_string()))
    }

    /// Every accepted identifier: each name followed by its number
    pub fn identifiers(&self) -> Vec<String> {
        self.blocks
            .iter()
            .flat_map(|b| [b.name.to_string(), b.number.to_string()])
            .collect()
    }

    /// Registered blocks in table order
    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name_and_number() {
        let registry = BlockRegistry::simos18().unwrap();
        assert_eq!(registry.resolve("CAL").unwrap(), 5);
        assert_eq!(registry.resolve("5").unwrap(), 5);
        assert_eq!(registry.resolve("CBOOT_temp").unwrap(), 6);
    }

    #[test]
    fn test_unknown_identifiers() {
        let registry = BlockRegistry::simos18().unwrap();
        for bad in ["cal", "7", "0", "", "ECU", "-1", " 5", "+5", "05", "CAL "] {
            assert!(
                matches!(
                    registry.resolve(bad),
                    Err(FlashError::UnknownBlockIdentifier(ref s)) if s == bad
                ),
                "{bad:?} should not resolve"
            );
        }
        assert!(registry.name_of(9).is_err());
        assert!(registry.version_offset_of(0).is_err());
    }

    #[test]
    fn test_bijection() {
        let registry = BlockRegistry::simos18().unwrap();
        for block in registry.blocks() {
            let n = registry.resolve(block.name).unwrap();
            assert_eq!(n, block.number);
            assert_eq!(registry.name_of(n).unwrap(), block.name);
            assert_eq!(
                registry.resolve(&block.number.to_string()).unwrap(),
                block.number
            );
        }
    }

    #[test]
    fn test_version_offsets() {
        let registry = BlockRegistry::simos18().unwrap();
        assert_eq!(registry.version_offset_of(5).unwrap(), 0x23..0x2B);
        assert_eq!(registry.version_offset_of(1).unwrap(), 0x437..0x43F);
    }

    #[test]
    fn test_conflicting_tables_rejected() {
        let dup_number = [descriptor("A", 1, 0, 1), descriptor("B", 1, 0, 1)];
        assert!(matches!(
            BlockRegistry::from_table(&dup_number),
            Err(FlashError::RegistryConflict(_))
        ));

        let dup_name = [descriptor("A", 1, 0, 1), descriptor("A", 2, 0, 1)];
        assert!(matches!(
            BlockRegistry::from_table(&dup_name),
            Err(FlashError::RegistryConflict(_))
        ));
    }

    #[test]
    fn test_inverted_version_range_rejected() {
        let inverted = [descriptor("A", 1, 5, 2)];
        assert!(matches!(
            BlockRegistry::from_table(&inverted),
            Err(FlashError::RegistryConflict(msg)) if msg.contains("inverted")
        ));

        let empty = [descriptor("A", 1, 4, 4)];
        assert!(BlockRegistry::from_table(&empty).is_ok());
    }

    #[test]
    fn test_identifiers_for_help() {
        let registry = BlockRegistry::simos18().unwrap();
        let ids = registry.identifiers();
        assert_eq!(ids.len(), 12);
        assert_eq!(&ids[..2], ["CBOOT", "1"]);
    }
}
