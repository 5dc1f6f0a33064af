/// Reading bookkeeping: time, story counts, daily streaks, and buddy mood.
///
/// Like the unlock evaluator, these helpers take the caller's progress by
/// reference and return the next state.
use chrono::NaiveDate;

use crate::buddy::types::{BuddyMood, UserProgress};

/// Record one finished reading session on `today`.
///
/// The streak counts consecutive calendar days with at least one session:
/// reading again on the same day keeps it, the following day extends it, and any
/// longer gap restarts it at one.
pub fn record_reading(progress: &UserProgress, minutes: u32, today: NaiveDate) -> UserProgress {
    let mut next = progress.clone();
    next.total_reading_time = next.total_reading_time.saturating_add(minutes);
    next.total_stories_read = next.total_stories_read.saturating_add(1);

    next.streak_days = match progress.last_read_on {
        Some(last) if last == today => progress.streak_days.max(1),
        Some(last) if last.succ_opt() == Some(today) => progress.streak_days.saturating_add(1),
        _ => 1,
    };
    // A clock that moved backwards must not rewind the last read date.
    next.last_read_on = match progress.last_read_on {
        Some(last) if last > today => Some(last),
        _ => Some(today),
    };
    if next.buddy_mood == BuddyMood::Sleepy {
        next.buddy_mood = BuddyMood::Happy;
    }
    next.touch();
    next
}

/// Streak as it stands on `today`: zero once a full day has been missed.
pub fn current_streak(progress: &UserProgress, today: NaiveDate) -> u32 {
    match progress.last_read_on {
        Some(last) if last == today || last.succ_opt() == Some(today) => progress.streak_days,
        _ => 0,
    }
}

/// Put the buddy to sleep when the reading streak has lapsed.
pub fn refresh_mood(progress: &UserProgress, today: NaiveDate) -> UserProgress {
    let mut next = progress.clone();
    if progress.last_read_on.is_some() && current_streak(progress, today) == 0 {
        next.buddy_mood = BuddyMood::Sleepy;
        next.streak_days = 0;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn first_session_starts_streak() {
        let p = record_reading(&UserProgress::new("u"), 7, day(1));
        assert_eq!(p.total_reading_time, 7);
        assert_eq!(p.total_stories_read, 1);
        assert_eq!(p.streak_days, 1);
        assert_eq!(p.last_read_on, Some(day(1)));
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let p = record_reading(&UserProgress::new("u"), 5, day(1));
        let p = record_reading(&p, 5, day(1));
        assert_eq!(p.streak_days, 1);
        let p = record_reading(&p, 5, day(2));
        let p = record_reading(&p, 5, day(3));
        assert_eq!(p.streak_days, 3);
        assert_eq!(p.total_stories_read, 4);
    }

    #[test]
    fn gap_resets_streak() {
        let p = record_reading(&UserProgress::new("u"), 5, day(1));
        let p = record_reading(&p, 5, day(2));
        let p = record_reading(&p, 5, day(5));
        assert_eq!(p.streak_days, 1);
    }

    #[test]
    fn lapsed_streak_makes_buddy_sleepy() {
        let p = record_reading(&UserProgress::new("u"), 5, day(1));
        assert_eq!(current_streak(&p, day(2)), 1);
        let p = refresh_mood(&p, day(4));
        assert_eq!(p.buddy_mood, BuddyMood::Sleepy);
        assert_eq!(p.streak_days, 0);
        let p = record_reading(&p, 5, day(4));
        assert_eq!(p.buddy_mood, BuddyMood::Happy);
    }

    #[test]
    fn fresh_user_is_not_sleepy() {
        let p = refresh_mood(&UserProgress::new("u"), day(9));
        assert_eq!(p.buddy_mood, BuddyMood::Happy);
    }
}
