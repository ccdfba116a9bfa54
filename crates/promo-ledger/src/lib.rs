//! Append-only promotion ledger. One JSON line per fired promotion.
//!
//! Each record carries a sequence number and a hash chain (`hash_prev` links
//! to the previous record's `hash_self`), so tampering with any line is
//! detectable by [`verify_chain`]. Event ids are derived deterministically
//! from chain state — no RNG.

use anyhow::{Context, Result};
use chrono::Utc;
use promo_schemas::{Badge, BuildResult, PromotionRecord};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Namespace for UUIDv5 event-id derivation.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x9f2c_41d6_8a03_4e5b_b1c7_6d90_25aa_77e4);

pub struct PromotionLedger {
    path: PathBuf,
    last_hash: Option<String>,
    seq: u64,
}

impl PromotionLedger {
    /// Open a ledger file, creating parent directories. If the file already
    /// has records, the sequence counter and chain tip are restored from it
    /// so appends continue the existing chain.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {:?}", parent))?;
        }

        let mut ledger = Self {
            path,
            last_hash: None,
            seq: 0,
        };

        if ledger.path.exists() {
            let existing = read_all(&ledger.path)?;
            if let Some(last) = existing.last() {
                ledger.seq = last.seq + 1;
                ledger.last_hash = last.hash_self.clone();
            }
        }

        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next sequence number (equals the number of records appended so far).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    /// Append one promotion record and advance the chain.
    pub fn append(
        &mut self,
        process: &str,
        target_build: u32,
        result: BuildResult,
        badges: Vec<Badge>,
    ) -> Result<PromotionRecord> {
        let event_id = derive_event_id(self.last_hash.as_deref(), self.seq, process, target_build);

        let mut record = PromotionRecord {
            event_id,
            seq: self.seq,
            process: process.to_string(),
            target_build,
            result,
            badges,
            ts_utc: Utc::now(),
            hash_prev: self.last_hash.clone(),
            hash_self: None,
        };

        let self_hash = compute_record_hash(&record)?;
        record.hash_self = Some(self_hash.clone());

        let line = canonical_json_line(&record)?;
        append_line(&self.path, &line)?;

        self.last_hash = Some(self_hash);
        self.seq += 1;

        Ok(record)
    }
}

/// Event-id derivation contract: UUIDv5 over (chain tip, seq, process,
/// target build). Replaying the same appends yields the same ids.
fn derive_event_id(last_hash: Option<&str>, seq: u64, process: &str, target_build: u32) -> Uuid {
    let seed = format!(
        "{}|{}|{}|{}",
        last_hash.unwrap_or("genesis"),
        seq,
        process,
        target_build
    );
    Uuid::new_v5(&EVENT_ID_NAMESPACE, seed.as_bytes())
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open ledger {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write ledger line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
/// One record == one JSON line.
fn canonical_json_line(record: &PromotionRecord) -> Result<String> {
    let raw = serde_json::to_value(record).context("serialize promotion record failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Hash is computed over the canonical JSON of the record WITHOUT hash_self
/// (to avoid self-reference).
pub fn compute_record_hash(record: &PromotionRecord) -> Result<String> {
    let mut clone = record.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerdict {
    /// The entire chain is valid.
    Valid { records: usize },
    /// The chain is broken at the given 1-based line.
    Broken { line: usize, reason: String },
}

impl ChainVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChainVerdict::Valid { .. })
    }
}

/// Verify the hash chain of a ledger file.
pub fn verify_chain(path: impl AsRef<Path>) -> Result<ChainVerdict> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read ledger {:?}", path.as_ref()))?;
    verify_chain_str(&content)
}

/// Same as [`verify_chain`] but over in-memory JSONL content.
pub fn verify_chain_str(content: &str) -> Result<ChainVerdict> {
    let mut prev_hash: Option<String> = None;
    let mut records = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: PromotionRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parse promotion record at line {}", i + 1))?;

        records += 1;

        if record.hash_prev != prev_hash {
            return Ok(ChainVerdict::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, record.hash_prev
                ),
            });
        }

        if let Some(ref claimed) = record.hash_self {
            let recomputed = compute_record_hash(&record)?;
            if *claimed != recomputed {
                return Ok(ChainVerdict::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {}, recomputed {}",
                        claimed, recomputed
                    ),
                });
            }
        }

        prev_hash = record.hash_self.clone();
    }

    Ok(ChainVerdict::Valid { records })
}

/// All records of a ledger file, oldest-first (file order).
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<PromotionRecord>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read ledger {:?}", path.as_ref()))?;
    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: PromotionRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parse promotion record at line {}", i + 1))?;
        out.push(record);
    }
    Ok(out)
}

/// The most recent records, newest-first — the shape history windows want.
/// A missing file is an empty history, not an error.
pub fn read_newest_first(
    path: impl AsRef<Path>,
    process: Option<&str>,
    limit: usize,
) -> Result<Vec<PromotionRecord>> {
    if !path.as_ref().exists() {
        return Ok(Vec::new());
    }
    let mut records = read_all(path)?;
    if let Some(name) = process {
        records.retain(|r| r.process == name);
    }
    records.reverse();
    records.truncate(limit);
    Ok(records)
}
