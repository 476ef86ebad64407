//! Device-free toolchain for bench use
//!
//! Stands in for the real checksum, compression and flash collaborators so
//! the whole orchestration path can run without an ECU attached.
//!
//! # Block layout
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  Payload (len - 4 bytes)     │  offset 0
//! ├──────────────────────────────┤
//! │  CRC-32, big-endian (4)      │  offset len-4
//! └──────────────────────────────┘
//! ```
//!
//! The standard scheme uses CRC-32/ISO-HDLC, the ECM3 scheme CRC-32/BZIP2.
//! Compression is LZ4 block format with the uncompressed size prepended.
//! Encryption is AES-128-CBC with PKCS#7 padding under a [`CipherKey`];
//! preparing a block runs checksum repair, compression and encryption in
//! that order.

use std::fmt;

use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use crc::{Crc, CRC_32_BZIP2, CRC_32_ISO_HDLC};
use tracing::{debug, info};

use crate::action::{ChecksumScheme, EcuFamily};
use crate::block::{BlockRecord, BlockSet};
use crate::error::{ToolchainError, ToolchainResult};
use crate::progress::ProgressRelay;
use crate::toolchain::{BlockToolchain, ChecksumEntry, ChecksumReport, TransferOutcome};

const CRC_STANDARD: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
const CRC_ECM3: Crc<u32> = Crc::<u32>::new(&CRC_32_BZIP2);

type BlockEncryptor = cbc::Encryptor<aes::Aes128>;

/// Length of the AES key and of the CBC initialisation vector
pub const KEY_LEN: usize = 16;

/// Size of the checksum trailer
pub const CHECKSUM_LEN: usize = 4;

/// Default number of bytes per simulated TransferData request
pub const DEFAULT_CHUNK_SIZE: usize = 0xFFD;

/// Share of the progress bar spent before and after the data transfer
const SETUP_PERCENT: f64 = 5.0;
const TRANSFER_PERCENT: f64 = 90.0;

/// AES-128 key and CBC initialisation vector used by the block encryptor
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey {
    key: [u8; KEY_LEN],
    iv: [u8; KEY_LEN],
}

impl CipherKey {
    /// Bench key used when none is configured. Not a production key.
    pub const BENCH: CipherKey = CipherKey::new(*b"vw-flash-loopbak", *b"vw-flash-benchiv");

    pub const fn new(key: [u8; KEY_LEN], iv: [u8; KEY_LEN]) -> Self {
        Self { key, iv }
    }

    /// Parse a key and IV given as hex strings of 16 bytes each
    pub fn from_hex(key: &str, iv: &str) -> ToolchainResult<Self> {
        Ok(Self::new(decode_key("key", key)?, decode_key("IV", iv)?))
    }

    /// Encrypt one payload
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        BlockEncryptor::new(&self.key.into(), &self.iv.into()).encrypt_padded_vec_mut::<Pkcs7>(data)
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherKey")
            .field("key", &"<redacted>")
            .field("iv", &hex::encode_upper(self.iv))
            .finish()
    }
}

fn decode_key(what: &str, text: &str) -> ToolchainResult<[u8; KEY_LEN]> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| ToolchainError::Encryption(format!("{} is not valid hex: {}", what, e)))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        ToolchainError::Encryption(format!(
            "{} must be {} bytes, got {}",
            what,
            KEY_LEN,
            bytes.len()
        ))
    })
}

/// Loopback implementation of [`BlockToolchain`]
#[derive(Debug, Clone)]
pub struct LoopbackToolchain {
    family: EcuFamily,
    chunk_size: usize,
    cipher: CipherKey,
}

impl Default for LoopbackToolchain {
    fn default() -> Self {
        Self::new(EcuFamily::default())
    }
}

impl LoopbackToolchain {
    pub fn new(family: EcuFamily) -> Self {
        Self {
            family,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cipher: CipherKey::BENCH,
        }
    }

    /// Encrypt with `cipher` instead of the bench key
    pub fn with_cipher(mut self, cipher: CipherKey) -> Self {
        self.cipher = cipher;
        self
    }

    /// Override the simulated transfer chunk size (minimum 1)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Compute the checksum over everything but the trailer
    pub fn compute_checksum(data: &[u8], scheme: ChecksumScheme) -> ToolchainResult<u32> {
        let body = Self::body(data)?;
        Ok(match scheme {
            ChecksumScheme::Standard => CRC_STANDARD.checksum(body),
            ChecksumScheme::Ecm3 => CRC_ECM3.checksum(body),
        })
    }

    /// Checksum currently stored in the trailer
    pub fn stored_checksum(data: &[u8]) -> ToolchainResult<u32> {
        Self::body(data)?;
        let mut trailer = [0u8; CHECKSUM_LEN];
        trailer.copy_from_slice(&data[data.len() - CHECKSUM_LEN..]);
        Ok(u32::from_be_bytes(trailer))
    }

    fn body(data: &[u8]) -> ToolchainResult<&[u8]> {
        data.len()
            .checked_sub(CHECKSUM_LEN)
            .map(|end| &data[..end])
            .ok_or_else(|| ToolchainError::Checksum {
                block: 0,
                message: format!("block of {} bytes has no checksum trailer", data.len()),
            })
    }

    fn with_block<T>(record: &BlockRecord, result: ToolchainResult<T>) -> ToolchainResult<T> {
        result.map_err(|e| match e {
            ToolchainError::Checksum { message, .. } => ToolchainError::Checksum {
                block: record.block_number,
                message,
            },
            other => other,
        })
    }

    fn repair(&self, blocks: &BlockSet, scheme: ChecksumScheme) -> ToolchainResult<BlockSet> {
        blocks.map_payloads(|record| {
            let computed =
                Self::with_block(record, Self::compute_checksum(&record.binary_data, scheme))?;
            let mut data = record.binary_data.clone();
            let end = data.len();
            data[end - CHECKSUM_LEN..].copy_from_slice(&computed.to_be_bytes());
            debug!(block = record.block_number, checksum = %format!("{:08X}", computed), "Patched checksum");
            Ok(data)
        })
    }

    fn transfer(
        &self,
        blocks: &BlockSet,
        progress: &mut ProgressRelay<'_>,
    ) -> ToolchainResult<TransferOutcome> {
        let total = blocks.total_bytes();
        let fraction = |sent: u64| {
            if total == 0 {
                1.0
            } else {
                sent as f64 / total as f64
            }
        };

        progress.report("SETUP", "Entering programming session", 0.0);
        progress.report("SETUP", "Security access granted", SETUP_PERCENT);

        let mut sent: u64 = 0;
        for record in blocks {
            let n = record.block_number;
            let pct = SETUP_PERCENT + TRANSFER_PERCENT * fraction(sent);
            progress.report("ERASING", &format!("Erasing block {}", n), pct);

            for chunk in record.binary_data.chunks(self.chunk_size) {
                sent += chunk.len() as u64;
                let pct = SETUP_PERCENT + TRANSFER_PERCENT * fraction(sent);
                progress.report(
                    "TRANSFERRING",
                    &format!("Block {}: {} bytes sent", n, chunk.len()),
                    pct,
                );
            }

            let pct = SETUP_PERCENT + TRANSFER_PERCENT * fraction(sent);
            progress.report("CHECKSUMMING", &format!("Verifying block {}", n), pct);
            info!(block = n, bytes = record.binary_data.len(), "Block transferred");
        }

        progress.report("RESET", "Resetting ECU", SETUP_PERCENT + TRANSFER_PERCENT);
        progress.report("COMPLETE", "Flash complete", 100.0);

        Ok(TransferOutcome {
            blocks_transferred: blocks.len(),
            bytes_transferred: sent,
        })
    }
}

impl BlockToolchain for LoopbackToolchain {
    fn checksum(
        &self,
        blocks: &BlockSet,
        scheme: ChecksumScheme,
        family: EcuFamily,
    ) -> ToolchainResult<ChecksumReport> {
        let entries = blocks
            .iter()
            .map(|record| {
                let data = &record.binary_data;
                let stored = Self::with_block(record, Self::stored_checksum(data))?;
                let computed = Self::with_block(record, Self::compute_checksum(data, scheme))?;
                Ok(ChecksumEntry {
                    source_path: record.source_path.clone(),
                    block_number: record.block_number,
                    stored: hex::encode_upper(stored.to_be_bytes()),
                    computed: hex::encode_upper(computed.to_be_bytes()),
                    valid: stored == computed,
                })
            })
            .collect::<ToolchainResult<Vec<_>>>()?;

        Ok(ChecksumReport {
            family,
            scheme,
            entries,
        })
    }

    fn checksum_fix(
        &self,
        blocks: &BlockSet,
        scheme: ChecksumScheme,
        family: EcuFamily,
    ) -> ToolchainResult<BlockSet> {
        debug!(%family, ?scheme, "Repairing checksums");
        self.repair(blocks, scheme)
    }

    fn compress(&self, blocks: &BlockSet) -> ToolchainResult<BlockSet> {
        blocks.map_payloads(|record| {
            let compressed = lz4_flex::compress_prepend_size(&record.binary_data);
            debug!(
                block = record.block_number,
                from = record.binary_data.len(),
                to = compressed.len(),
                "Compressed block"
            );
            Ok(compressed)
        })
    }

    fn encrypt(&self, blocks: &BlockSet) -> ToolchainResult<BlockSet> {
        blocks.map_payloads(|record| {
            let encrypted = self.cipher.encrypt(&record.binary_data);
            debug!(
                block = record.block_number,
                from = record.binary_data.len(),
                to = encrypted.len(),
                "Encrypted block"
            );
            Ok(encrypted)
        })
    }

    fn prepare(&self, blocks: &BlockSet) -> ToolchainResult<BlockSet> {
        let checksummed = self.repair(blocks, ChecksumScheme::Standard)?;
        let compressed = self.compress(&checksummed)?;
        self.encrypt(&compressed)
    }

    fn flash_raw(
        &self,
        blocks: &BlockSet,
        progress: &mut ProgressRelay<'_>,
    ) -> ToolchainResult<TransferOutcome> {
        info!(family = %self.family, "Preparing raw blocks for transfer");
        let prepared = self.prepare(blocks)?;
        self.transfer(&prepared, progress)
    }

    fn flash_prepared(
        &self,
        blocks: &BlockSet,
        progress: &mut ProgressRelay<'_>,
    ) -> ToolchainResult<TransferOutcome> {
        self.transfer(blocks, progress)
    }
}
