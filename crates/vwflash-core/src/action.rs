//! Actions and per-invocation options

use serde::{Deserialize, Serialize};

/// The single pipeline selected for an invocation.
///
/// Chosen once per run and never changed; the dispatcher matches on it
/// exhaustively so exactly one pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Validate checksums, report only
    Checksum,
    /// Recompute and patch checksums
    ChecksumFix,
    /// Validate the ECM3 checksum scheme, report only
    ChecksumEcm3,
    /// Recompute and patch the ECM3 checksum scheme
    ChecksumFixEcm3,
    /// Compress blocks
    Lzss,
    /// Encrypt blocks
    Encrypt,
    /// Checksum, compress and encrypt blocks ready for transfer
    Prepare,
    /// Prepare and transfer raw binaries to the ECU
    FlashBin,
    /// Transfer already-prepared blocks to the ECU
    FlashPrepared,
}

impl Action {
    /// Every action, in the order they are presented to users
    pub const ALL: [Action; 9] = [
        Action::Checksum,
        Action::ChecksumFix,
        Action::ChecksumEcm3,
        Action::ChecksumFixEcm3,
        Action::Lzss,
        Action::Encrypt,
        Action::Prepare,
        Action::FlashBin,
        Action::FlashPrepared,
    ];

    /// Command-line name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Checksum => "checksum",
            Action::ChecksumFix => "checksum_fix",
            Action::ChecksumEcm3 => "checksum_ecm3",
            Action::ChecksumFixEcm3 => "checksum_fix_ecm3",
            Action::Lzss => "lzss",
            Action::Encrypt => "encrypt",
            Action::Prepare => "prepare",
            Action::FlashBin => "flash_bin",
            Action::FlashPrepared => "flash_prepared",
        }
    }

    /// Whether this action talks to the ECU and therefore needs a progress sink
    pub fn is_transfer(&self) -> bool {
        matches!(self, Action::FlashBin | Action::FlashPrepared)
    }

    /// Whether this action produces a new block set that can be written out
    pub fn produces_blocks(&self) -> bool {
        matches!(
            self,
            Action::ChecksumFix
                | Action::ChecksumFixEcm3
                | Action::Lzss
                | Action::Encrypt
                | Action::Prepare
        )
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checksum" | "checksum-inspect" => Ok(Action::Checksum),
            "checksum_fix" | "checksum-repair" => Ok(Action::ChecksumFix),
            "checksum_ecm3" | "checksum-inspect-variant" => Ok(Action::ChecksumEcm3),
            "checksum_fix_ecm3" | "checksum-repair-variant" => Ok(Action::ChecksumFixEcm3),
            "lzss" | "compress" => Ok(Action::Lzss),
            "encrypt" => Ok(Action::Encrypt),
            "prepare" => Ok(Action::Prepare),
            "flash_bin" | "transfer-raw" => Ok(Action::FlashBin),
            "flash_prepared" | "transfer-prepared" => Ok(Action::FlashPrepared),
            _ => Err(format!("Unknown action: '{}'", s)),
        }
    }
}

/// ECU family, narrows which checksum layout a collaborator applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcuFamily {
    #[default]
    Simos18,
    Simos12,
}

impl std::fmt::Display for EcuFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EcuFamily::Simos18 => f.write_str("simos18"),
            EcuFamily::Simos12 => f.write_str("simos12"),
        }
    }
}

/// Checksum scheme selected by the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumScheme {
    /// Per-block checksum
    Standard,
    /// ECM3 calibration checksum
    Ecm3,
}

/// Options fixed for the whole invocation
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub family: EcuFamily,
}

impl DispatchOptions {
    pub fn new(family: EcuFamily) -> Self {
        Self { family }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert_eq!("compress".parse::<Action>().unwrap(), Action::Lzss);
        assert_eq!(
            "checksum-repair-variant".parse::<Action>().unwrap(),
            Action::ChecksumFixEcm3
        );
        assert!("flash".parse::<Action>().is_err());
    }

    #[test]
    fn test_action_classes() {
        let transfers: Vec<_> = Action::ALL.iter().filter(|a| a.is_transfer()).collect();
        assert_eq!(transfers, [&Action::FlashBin, &Action::FlashPrepared]);

        assert!(!Action::Checksum.produces_blocks());
        assert!(!Action::ChecksumEcm3.produces_blocks());
        assert!(Action::ChecksumFix.produces_blocks());
        assert!(!Action::FlashBin.produces_blocks());
    }
}
