/// Integration tests for the QR sync payload codec.
/// Round trips, tag rejection, and single-character corruption detection.
use chrono::{TimeZone, Utc};
use magic_buddy::buddy::sync::{self, import_with_limit};
use magic_buddy::buddy::{
    BuddyError, BuddyStage, PayloadDefect, UserProgress, UserRecord, MAGIC_TAG,
};

fn fixture() -> (UserRecord, UserProgress) {
    let user = UserRecord::new("Mia", "Sparky");
    let mut progress = UserProgress::new(&user.id);
    progress.level = 1;
    progress.magic_power = 30;
    (user, progress)
}

fn payload() -> String {
    let (user, progress) = fixture();
    let at = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
    sync::export(&user, &progress, at).unwrap()
}

#[test]
fn test_round_trip_keeps_magic_power() {
    let data = sync::import(&payload()).unwrap();
    assert_eq!(data.progress.level, 1);
    assert_eq!(data.progress.magic_power, 30);
    assert_eq!(data.progress.buddy_stage, BuddyStage::Egg);
    assert_eq!(data.progress.total_reading_time, 0);
    assert_eq!(data.progress.total_stories_read, 0);
    assert_eq!(data.progress.streak_days, 0);
    assert!(data.progress.completed_nodes.is_empty());
    assert_eq!(data.user.name, "Mia");
    assert_eq!(data.user.buddy_name, "Sparky");
}

#[test]
fn test_round_trip_with_completed_nodes() {
    let (user, mut progress) = fixture();
    progress.completed_nodes.insert("node_l1_1".to_string());
    progress.completed_nodes.insert("node_l1_2".to_string());
    progress.total_reading_time = 42;
    let encoded = sync::export(&user, &progress, Utc::now()).unwrap();
    let data = sync::import(&encoded).unwrap();
    assert_eq!(data.progress.completed_nodes, vec!["node_l1_1", "node_l1_2"]);
    assert_eq!(data.progress.total_reading_time, 42);
}

#[test]
fn test_garbage_rejected_as_missing_tag() {
    let err = sync::import("GARBAGE").unwrap_err();
    assert!(matches!(
        err,
        BuddyError::CorruptPayload(PayloadDefect::MissingTag)
    ));
    assert_eq!(err.to_string(), "cannot read this code");
}

#[test]
fn test_every_single_character_flip_is_rejected() {
    let original = payload();
    let alphabet: Vec<char> = ('A'..='Z')
        .chain('a'..='z')
        .chain('0'..='9')
        .chain(['+', '/', '='])
        .collect();

    let mut attempts = 0usize;
    let mut accepted = Vec::new();
    for pos in MAGIC_TAG.len()..original.len() {
        let current = original.as_bytes()[pos] as char;
        for &replacement in &alphabet {
            if replacement == current {
                continue;
            }
            let mut mutated = original.clone();
            mutated.replace_range(pos..pos + 1, &replacement.to_string());
            attempts += 1;
            match sync::import(&mutated) {
                Err(BuddyError::CorruptPayload(_)) => {}
                Err(other) => panic!("unexpected error at {}: {}", pos, other),
                Ok(_) => accepted.push((pos, replacement)),
            }
        }
    }

    assert!(attempts > 1000);
    assert!(
        accepted.is_empty(),
        "{} of {} mutations were accepted: {:?}",
        accepted.len(),
        attempts,
        &accepted[..accepted.len().min(5)]
    );
}

#[test]
fn test_truncation_is_rejected() {
    let original = payload();
    for cut in [1usize, 4, 10, original.len() / 2] {
        let truncated = &original[..original.len() - cut];
        assert!(
            matches!(sync::import(truncated), Err(BuddyError::CorruptPayload(_))),
            "truncating {} chars was accepted",
            cut
        );
    }
}

#[test]
fn test_oversized_payload_rejected() {
    let original = payload();
    let err = import_with_limit(&original, original.len() - 1).unwrap_err();
    assert!(matches!(
        err,
        BuddyError::CorruptPayload(PayloadDefect::Malformed)
    ));
    assert!(import_with_limit(&original, original.len()).is_ok());
}
