use crate::model::*;

use super::{Engine, EngineError};

/// Score for a user with no qualifying recent history — maximal claim.
pub const NO_HISTORY_SCORE: i64 = 1000;

const LOOKBACK_DAYS: Ms = 28;
const RECENT_DAYS: Ms = 7;

/// Rank a user's claim from the dates of their past confirmed capacity-limited
/// bookings. Higher = stronger claim. Produces three disjoint bands:
///
/// - no qualifying history → exactly 1000;
/// - absent for the last 7 days → 500..=1000, growing with the absence;
/// - played within the last 7 days → 0..=100, shrinking with frequency.
///
/// A long-absent player therefore always outranks a frequent recent one; ties
/// within a band fall back to claim order at the call site.
pub fn score_history(history_dates: &[Ms], as_of: Ms) -> i64 {
    let window_start = as_of - LOOKBACK_DAYS * DAY_MS;
    let qualifying: Vec<Ms> = history_dates
        .iter()
        .copied()
        .filter(|&d| d >= window_start && d < as_of)
        .collect();

    if qualifying.is_empty() {
        return NO_HISTORY_SCORE;
    }

    let recent_cutoff = as_of - RECENT_DAYS * DAY_MS;
    let played_recently = qualifying.iter().any(|&d| d >= recent_cutoff);

    if played_recently {
        let count = (qualifying.len() as i64).min(20);
        (100 - 5 * count).max(0)
    } else {
        // qualifying is non-empty, max exists
        let last = qualifying.iter().copied().max().unwrap();
        let days_since = (as_of - last) / DAY_MS;
        500 + (days_since * 10).min(500)
    }
}

impl Engine {
    /// Fetch the user's confirmed history and score it as of `as_of`
    /// (normally the court's date). Only capacity-limited courts whose date
    /// falls inside the look-back window count as history.
    pub async fn priority_score(&self, user_id: &str, as_of: Ms) -> Result<i64, EngineError> {
        let confirmed = self
            .store
            .query(BookingFilter::user(user_id).state(AdmissionState::Confirmed))
            .await?;

        let mut dates = Vec::with_capacity(confirmed.len());
        for booking in &confirmed {
            if let Some(court) = self.catalog.court(booking.court_id).await?
                && court.is_capacity_limited() {
                    dates.push(court.date);
                }
        }

        Ok(score_history(&dates, as_of))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AS_OF: Ms = 100 * DAY_MS;

    #[test]
    fn no_history_scores_maximal() {
        assert_eq!(score_history(&[], AS_OF), 1000);
    }

    #[test]
    fn history_outside_window_is_ignored() {
        // 29 days back and the as-of instant itself both fall outside.
        let dates = [AS_OF - 29 * DAY_MS, AS_OF];
        assert_eq!(score_history(&dates, AS_OF), 1000);
    }

    #[test]
    fn absentee_bonus_grows_with_gap() {
        let ten_days = score_history(&[AS_OF - 10 * DAY_MS], AS_OF);
        let twenty_days = score_history(&[AS_OF - 20 * DAY_MS], AS_OF);
        assert_eq!(ten_days, 600);
        assert_eq!(twenty_days, 700);
        assert!(twenty_days > ten_days);
    }

    #[test]
    fn absentee_bonus_caps_at_1000() {
        // 28 days back is the oldest qualifying date: 500 + 280, no cap hit.
        assert_eq!(score_history(&[AS_OF - 28 * DAY_MS], AS_OF), 780);
        // The cap would bind past 50 days, which cannot qualify; the min()
        // still guards the band boundary.
        assert!(score_history(&[AS_OF - 28 * DAY_MS], AS_OF) <= 1000);
    }

    #[test]
    fn recent_play_drops_to_low_band() {
        let once = score_history(&[AS_OF - 2 * DAY_MS], AS_OF);
        assert_eq!(once, 95);

        let four_times: Vec<Ms> = (1..=4).map(|i| AS_OF - i * DAY_MS).collect();
        assert_eq!(score_history(&four_times, AS_OF), 80);
    }

    #[test]
    fn frequent_play_floors_at_zero() {
        // 25 bookings in the window, capped at 20 → 100 - 100 = 0.
        let dates: Vec<Ms> = (0..25).map(|i| AS_OF - DAY_MS - i * 1000).collect();
        assert_eq!(score_history(&dates, AS_OF), 0);
    }

    #[test]
    fn one_recent_booking_pins_user_to_low_band() {
        // Old absence does not help once any booking is inside 7 days.
        let dates = [AS_OF - 20 * DAY_MS, AS_OF - DAY_MS];
        assert_eq!(score_history(&dates, AS_OF), 90);
    }

    #[test]
    fn bands_are_disjoint() {
        let frequent: Vec<Ms> = (1..=4).map(|i| AS_OF - i * DAY_MS).collect();
        let absent = [AS_OF - 14 * DAY_MS];
        let fresh: [Ms; 0] = [];

        let lo = score_history(&frequent, AS_OF);
        let mid = score_history(&absent, AS_OF);
        let hi = score_history(&fresh, AS_OF);
        assert!(lo <= 100);
        assert!((500..1000).contains(&mid));
        assert_eq!(hi, 1000);
    }
}
