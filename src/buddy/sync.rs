//! Progress snapshot codec for QR-code transfer between devices.
//!
//! Wire format: the 4-byte tag [`MAGIC_TAG`] followed by standard base64 of the
//! percent-encoded (`encodeURIComponent` rules) JSON of a [`SyncData`] record.
//!
//! The checksum is a 32-bit `hash * 31 + code_unit` rolling hash over the
//! record serialized with an empty `checksum` field. It only detects transport
//! damage such as a misread QR module or a truncated copy/paste; it does not
//! authenticate the sender. A payload is accepted whole or not at all.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::buddy::errors::{BuddyError, PayloadDefect};
use crate::buddy::stage::stage_for;
use crate::buddy::types::{BuddyStage, UserProgress, UserRecord};
use crate::logutil::{escape_log, payload_preview};

pub const MAGIC_TAG: &str = "MEB1";
pub const SYNC_VERSION: &str = "1.0";
/// Comfortably inside what a version-25 QR code holds in byte mode.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 4096;

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Progress,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyncUser {
    pub name: String,
    pub buddy_name: String,
}

/// The exported projection of [`UserProgress`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyncProgress {
    pub level: u32,
    pub magic_power: u32,
    pub buddy_stage: BuddyStage,
    pub total_reading_time: u32,
    pub total_stories_read: u32,
    pub streak_days: u32,
    pub completed_nodes: Vec<String>,
}

impl From<&UserProgress> for SyncProgress {
    fn from(progress: &UserProgress) -> Self {
        Self {
            level: progress.level,
            magic_power: progress.magic_power,
            buddy_stage: progress.buddy_stage,
            total_reading_time: progress.total_reading_time,
            total_stories_read: progress.total_stories_read,
            streak_days: progress.streak_days,
            // BTreeSet iteration keeps this ordering stable across exports.
            completed_nodes: progress.completed_nodes.iter().cloned().collect(),
        }
    }
}

/// Immutable snapshot carried by a sync payload. Field order is the canonical
/// serialization order used for the checksum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyncData {
    pub version: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: SyncKind,
    pub user: SyncUser,
    pub progress: SyncProgress,
    pub checksum: String,
}

impl SyncData {
    /// Build an unsigned snapshot (empty checksum).
    pub fn snapshot(user: &UserRecord, progress: &UserProgress, at: DateTime<Utc>) -> Self {
        Self {
            version: SYNC_VERSION.to_string(),
            timestamp: at.timestamp_millis(),
            kind: SyncKind::Progress,
            user: SyncUser {
                name: user.name.clone(),
                buddy_name: user.buddy_name.clone(),
            },
            progress: SyncProgress::from(progress),
            checksum: String::new(),
        }
    }

    pub fn exported_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Overwrite the synced fields of `local` with this snapshot (last writer wins).
    /// Cards, achievements, and the last read date stay local; the buddy stage is
    /// re-derived from the imported magic power.
    pub fn apply_to(&self, local: &UserProgress) -> UserProgress {
        let mut next = local.clone();
        next.level = self.progress.level.max(1);
        next.magic_power = self.progress.magic_power;
        next.buddy_stage = stage_for(self.progress.magic_power);
        next.total_reading_time = self.progress.total_reading_time;
        next.total_stories_read = self.progress.total_stories_read;
        next.streak_days = self.progress.streak_days;
        next.completed_nodes = self.progress.completed_nodes.iter().cloned().collect();
        next.touch();
        next
    }
}

/// 32-bit signed `hash * 31 + c` over UTF-16 code units, rendered as the
/// lowercase hex of its absolute value.
pub fn rolling_hash(text: &str) -> String {
    let mut hash: i32 = 0;
    for unit in text.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    format!("{:x}", hash.unsigned_abs())
}

/// Checksum of a snapshot, computed with its `checksum` field blanked.
pub fn checksum(data: &SyncData) -> Result<String, BuddyError> {
    let mut unsigned = data.clone();
    unsigned.checksum.clear();
    let canonical = serde_json::to_string(&unsigned)?;
    Ok(rolling_hash(&canonical))
}

/// Encode a user's progress as a sync payload.
pub fn export(
    user: &UserRecord,
    progress: &UserProgress,
    at: DateTime<Utc>,
) -> Result<String, BuddyError> {
    let mut data = SyncData::snapshot(user, progress, at);
    data.checksum = checksum(&data)?;
    encode(&data)
}

/// Serialize an already-signed snapshot to the wire format.
pub fn encode(data: &SyncData) -> Result<String, BuddyError> {
    let json = serde_json::to_string(data)?;
    let escaped = utf8_percent_encode(&json, URI_COMPONENT).to_string();
    Ok(format!("{}{}", MAGIC_TAG, STANDARD.encode(escaped.as_bytes())))
}

/// Decode and verify a payload using the default size limit.
pub fn import(payload: &str) -> Result<SyncData, BuddyError> {
    import_with_limit(payload, DEFAULT_MAX_PAYLOAD_LEN)
}

/// Decode and verify a payload. Every failure is `CorruptPayload`; nothing from
/// a rejected payload is returned.
pub fn import_with_limit(payload: &str, max_len: usize) -> Result<SyncData, BuddyError> {
    let reject = |defect: PayloadDefect| {
        warn!(
            "sync payload rejected ({}): {}",
            defect.as_str(),
            payload_preview(payload)
        );
        BuddyError::CorruptPayload(defect)
    };

    let trimmed = payload.trim();
    let Some(body) = trimmed.strip_prefix(MAGIC_TAG) else {
        return Err(reject(PayloadDefect::MissingTag));
    };
    if trimmed.len() > max_len {
        return Err(reject(PayloadDefect::Malformed));
    }

    let bytes = STANDARD
        .decode(body)
        .map_err(|_| reject(PayloadDefect::Encoding))?;
    let escaped = String::from_utf8(bytes).map_err(|_| reject(PayloadDefect::Encoding))?;
    let json = percent_decode_str(&escaped)
        .decode_utf8()
        .map_err(|_| reject(PayloadDefect::Encoding))?
        .into_owned();
    // Percent-decoding is lenient (case of hex digits, stray '%'); only the
    // exact encoding we produce is accepted.
    if utf8_percent_encode(&json, URI_COMPONENT).to_string() != escaped {
        return Err(reject(PayloadDefect::Encoding));
    }

    let data: SyncData = serde_json::from_str(&json).map_err(|_| reject(PayloadDefect::Malformed))?;
    if data.version != SYNC_VERSION {
        return Err(reject(PayloadDefect::UnsupportedVersion));
    }
    let expected = checksum(&data)?;
    if expected != data.checksum {
        return Err(reject(PayloadDefect::ChecksumMismatch));
    }

    debug!(
        "sync payload accepted: user={} level={} magic_power={}",
        escape_log(&data.user.name),
        data.progress.level,
        data.progress.magic_power
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (UserRecord, UserProgress) {
        let user = UserRecord::new("Mia", "Sparky");
        let mut progress = UserProgress::new(&user.id);
        progress.magic_power = 30;
        (user, progress)
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 30, 0).unwrap()
    }

    #[test]
    fn rolling_hash_matches_known_values() {
        assert_eq!(rolling_hash(""), "0");
        assert_eq!(rolling_hash("a"), "61");
        // 97*31 + 98 = 3105
        assert_eq!(rolling_hash("ab"), "c21");
        // Well-known Java String.hashCode("hello") = 99162322
        assert_eq!(rolling_hash("hello"), format!("{:x}", 99162322));
    }

    #[test]
    fn rolling_hash_reports_absolute_value() {
        // Java "polygenelubricants".hashCode() == i32::MIN
        assert_eq!(rolling_hash("polygenelubricants"), "80000000");
    }

    #[test]
    fn export_starts_with_tag_and_is_ascii() {
        let (user, progress) = fixture();
        let payload = export(&user, &progress, at()).unwrap();
        assert!(payload.starts_with(MAGIC_TAG));
        assert!(payload.is_ascii());
    }

    #[test]
    fn export_then_import_preserves_progress() {
        let (user, progress) = fixture();
        let payload = export(&user, &progress, at()).unwrap();
        let data = import(&payload).unwrap();
        assert_eq!(data.progress, SyncProgress::from(&progress));
        assert_eq!(data.progress.magic_power, 30);
        assert_eq!(data.user.buddy_name, "Sparky");
        assert_eq!(data.exported_at(), Some(at()));
        assert_eq!(data.kind, SyncKind::Progress);
    }

    #[test]
    fn wire_json_uses_camel_case_and_type_field() {
        let (user, progress) = fixture();
        let data = SyncData::snapshot(&user, &progress, at());
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"type\":\"progress\""));
        assert!(json.contains("\"magicPower\":30"));
        assert!(json.contains("\"buddyStage\":0"));
        assert!(json.contains("\"buddyName\":\"Sparky\""));
        assert!(json.ends_with("\"checksum\":\"\"}"));
    }

    #[test]
    fn missing_tag_is_rejected() {
        let err = import("GARBAGE").unwrap_err();
        assert!(matches!(
            err,
            BuddyError::CorruptPayload(PayloadDefect::MissingTag)
        ));
    }

    #[test]
    fn non_ascii_names_survive() {
        let user = UserRecord::new("Zoë 小明", "Bübü");
        let progress = UserProgress::new(&user.id);
        let data = import(&export(&user, &progress, at()).unwrap()).unwrap();
        assert_eq!(data.user.name, "Zoë 小明");
        assert_eq!(data.user.buddy_name, "Bübü");
    }

    #[test]
    fn lowercase_escape_is_rejected() {
        let (user, progress) = fixture();
        let mut data = SyncData::snapshot(&user, &progress, at());
        data.checksum = checksum(&data).unwrap();
        let json = serde_json::to_string(&data).unwrap();
        let escaped = utf8_percent_encode(&json, URI_COMPONENT)
            .to_string()
            .replace("%7B", "%7b");
        let payload = format!("{}{}", MAGIC_TAG, STANDARD.encode(escaped.as_bytes()));
        let err = import(&payload).unwrap_err();
        assert!(matches!(err, BuddyError::CorruptPayload(PayloadDefect::Encoding)));
    }

    #[test]
    fn tampered_checksum_is_rejected() {
        let (user, progress) = fixture();
        let mut data = SyncData::snapshot(&user, &progress, at());
        data.checksum = checksum(&data).unwrap();
        data.progress.magic_power = 9999;
        let payload = encode(&data).unwrap();
        let err = import(&payload).unwrap_err();
        assert!(matches!(
            err,
            BuddyError::CorruptPayload(PayloadDefect::ChecksumMismatch)
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let (user, progress) = fixture();
        let mut data = SyncData::snapshot(&user, &progress, at());
        data.version = "9.9".to_string();
        data.checksum = checksum(&data).unwrap();
        let err = import(&encode(&data).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            BuddyError::CorruptPayload(PayloadDefect::UnsupportedVersion)
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let (user, progress) = fixture();
        let payload = export(&user, &progress, at()).unwrap();
        let err = import_with_limit(&payload, 16).unwrap_err();
        assert!(matches!(err, BuddyError::CorruptPayload(PayloadDefect::Malformed)));
    }

    #[test]
    fn apply_overwrites_synced_fields_only() {
        let (user, progress) = fixture();
        let mut remote = progress.clone();
        remote.magic_power = 160;
        remote.completed_nodes.insert("node_l1_1".to_string());
        let data = import(&export(&user, &remote, at()).unwrap()).unwrap();

        let mut local = UserProgress::new(&user.id);
        local.cards.insert("card_local".to_string());
        let merged = data.apply_to(&local);
        assert_eq!(merged.magic_power, 160);
        assert_eq!(merged.buddy_stage, BuddyStage::Sprout);
        assert!(merged.has_completed("node_l1_1"));
        assert!(merged.cards.contains("card_local"));
    }
}
