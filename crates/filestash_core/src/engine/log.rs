//! Append-only record log.
//!
//! Every committed read-write transaction is written as its put frames
//! followed by one commit frame:
//!
//! ```text
//! | magic (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! ## Replay policy
//!
//! - A frame cut short at the end of the log is a crash mid-append. It is
//!   dropped and the log truncated to the last whole frame.
//! - A frame whose length runs past the end while whole, checksummed frames
//!   still follow it is a damaged length field, not a torn tail. That is
//!   corruption, and nothing is truncated.
//! - Bad magic, an unknown type, a newer version or a CRC mismatch is
//!   corruption and fails the open.
//! - Puts without a following commit frame are discarded.

use crate::engine::codec::{put_short_str, ByteReader};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::Key;
use filestash_storage::StorageBackend;
use tracing::warn;

/// Magic bytes opening every frame.
pub const LOG_MAGIC: [u8; 4] = *b"FSLG";

/// Current frame format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
const HEADER_SIZE: usize = 11;
const CRC_SIZE: usize = 4;

const FRAME_PUT: u8 = 1;
const FRAME_COMMIT: u8 = 2;

/// One entry of the record log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogFrame {
    /// A value stored under `key` in `store` by transaction `txid`.
    Put {
        txid: u64,
        store: String,
        key: Key,
        value: Vec<u8>,
    },
    /// Makes every earlier put of `txid` visible.
    Commit { txid: u64 },
}

impl LogFrame {
    fn frame_type(&self) -> u8 {
        match self {
            Self::Put { .. } => FRAME_PUT,
            Self::Commit { .. } => FRAME_COMMIT,
        }
    }

    fn encode_payload(&self) -> EngineResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Put {
                txid,
                store,
                key,
                value,
            } => {
                let len = u32::try_from(value.len()).map_err(|_| EngineError::QuotaExceeded {
                    size: value.len(),
                    limit: u32::MAX as usize,
                })?;
                buf.extend_from_slice(&txid.to_le_bytes());
                put_short_str(&mut buf, store)?;
                buf.extend_from_slice(&key.to_le_bytes());
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(value);
            }
            Self::Commit { txid } => {
                buf.extend_from_slice(&txid.to_le_bytes());
            }
        }
        Ok(buf)
    }

    fn decode_payload(frame_type: u8, payload: &[u8]) -> EngineResult<Self> {
        let mut r = ByteReader::new(payload, "log frame");
        let frame = match frame_type {
            FRAME_PUT => {
                let txid = r.u64()?;
                let store = r.short_str()?;
                let key = r.u64()?;
                let len = r.u32()? as usize;
                let value = r.take(len)?.to_vec();
                Self::Put {
                    txid,
                    store,
                    key,
                    value,
                }
            }
            FRAME_COMMIT => Self::Commit { txid: r.u64()? },
            other => {
                return Err(EngineError::corrupted(format!(
                    "unknown log frame type {other}"
                )))
            }
        };
        if !r.is_empty() {
            return Err(EngineError::corrupted("trailing bytes in log frame"));
        }
        Ok(frame)
    }

    /// Encodes the frame with its envelope and checksum.
    pub(crate) fn encode(&self) -> EngineResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| EngineError::InvalidArgument("log frame too large".into()))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        data.push(self.frame_type());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);
        let crc = crc32fast::hash(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }
}

/// Outcome of parsing a log image.
#[derive(Debug, Default)]
pub(crate) struct Replay {
    /// Whole frames in log order.
    pub frames: Vec<LogFrame>,
    /// Length of the log covered by whole frames.
    pub valid_len: u64,
}

/// Parses a complete log image.
///
/// Stops at a torn tail; `valid_len` then points at the start of the torn
/// frame. Only the last frame can be torn.
pub(crate) fn parse(data: &[u8]) -> EngineResult<Replay> {
    let mut replay = Replay::default();
    let mut pos = 0usize;

    while pos < data.len() {
        let rest = &data[pos..];
        if rest.len() < HEADER_SIZE {
            break;
        }
        if rest[0..4] != LOG_MAGIC {
            return Err(EngineError::corrupted(format!(
                "invalid log magic at offset {pos}"
            )));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version > LOG_VERSION {
            return Err(EngineError::corrupted(format!(
                "unsupported log version {version} at offset {pos}"
            )));
        }
        let frame_type = rest[6];
        let len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let total = match HEADER_SIZE
            .checked_add(len)
            .and_then(|n| n.checked_add(CRC_SIZE))
        {
            Some(total) if total <= rest.len() => total,
            _ => {
                if intact_run_after(data, pos + 1) {
                    return Err(EngineError::corrupted(format!(
                        "log frame at offset {pos} declares {len} bytes past the end of a log with later frames"
                    )));
                }
                break;
            }
        };

        let body_end = HEADER_SIZE + len;
        let stored = u32::from_le_bytes([
            rest[body_end],
            rest[body_end + 1],
            rest[body_end + 2],
            rest[body_end + 3],
        ]);
        let computed = crc32fast::hash(&rest[..body_end]);
        if stored != computed {
            return Err(EngineError::corrupted(format!(
                "log checksum mismatch at offset {pos}: expected {stored:08x}, got {computed:08x}"
            )));
        }

        replay
            .frames
            .push(LogFrame::decode_payload(frame_type, &rest[HEADER_SIZE..body_end])?);
        pos += total;
        replay.valid_len = pos as u64;
    }

    Ok(replay)
}

/// Size of the whole, checksummed frame starting at `at`, if there is one.
fn whole_frame_at(data: &[u8], at: usize) -> Option<usize> {
    let rest = data.get(at..)?;
    if rest.len() < HEADER_SIZE || rest[0..4] != LOG_MAGIC {
        return None;
    }
    let len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
    let body_end = HEADER_SIZE.checked_add(len)?;
    let total = body_end.checked_add(CRC_SIZE)?;
    if total > rest.len() {
        return None;
    }
    let stored = u32::from_le_bytes([
        rest[body_end],
        rest[body_end + 1],
        rest[body_end + 2],
        rest[body_end + 3],
    ]);
    (stored == crc32fast::hash(&rest[..body_end])).then_some(total)
}

/// Whether some offset at or after `from` starts a chain of whole frames
/// ending exactly at the end of `data`.
fn intact_run_after(data: &[u8], from: usize) -> bool {
    (from..data.len())
        .filter(|&at| data[at..].starts_with(&LOG_MAGIC))
        .any(|mut at| {
            while at < data.len() {
                match whole_frame_at(data, at) {
                    Some(total) => at += total,
                    None => return false,
                }
            }
            true
        })
}

/// The record log of one database.
pub(crate) struct RecordLog {
    backend: Box<dyn StorageBackend>,
    sync_on_commit: bool,
}

impl RecordLog {
    pub(crate) fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend,
            sync_on_commit,
        }
    }

    /// Reads every whole frame, cutting off a torn tail.
    pub(crate) fn replay(&mut self) -> EngineResult<Vec<LogFrame>> {
        let size = self.backend.size()?;
        if size == 0 {
            return Ok(Vec::new());
        }
        let len = usize::try_from(size)
            .map_err(|_| EngineError::corrupted("record log larger than address space"))?;
        let data = self.backend.read_at(0, len)?;
        let replay = parse(&data)?;

        if replay.valid_len < size {
            warn!(
                valid_len = replay.valid_len,
                size, "dropping torn frame at end of record log"
            );
            self.backend.truncate(replay.valid_len)?;
        }
        Ok(replay.frames)
    }

    /// Appends `frames` as one unit.
    ///
    /// On failure the log is cut back to where it was, so a half-written
    /// transaction never reaches replay.
    pub(crate) fn append_all(&mut self, frames: &[LogFrame]) -> EngineResult<()> {
        let mut data = Vec::new();
        for frame in frames {
            data.extend_from_slice(&frame.encode()?);
        }

        let start = self.backend.size()?;
        let written = self.backend.append(&data).and_then(|_| {
            if self.sync_on_commit {
                self.backend.sync()
            } else {
                self.backend.flush()
            }
        });

        if let Err(err) = written {
            if let Err(cut) = self.backend.truncate(start) {
                warn!(error = %cut, "could not roll back partial log append");
            }
            return Err(err.into());
        }
        Ok(())
    }
}
