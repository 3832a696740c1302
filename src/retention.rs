use chrono::{DateTime, Duration, Months, Utc};

use crate::config::RetentionWindow;

/// Returns the instant before which stored records are considered expired.
///
/// Weeks are a fixed seven days; months and years use calendar arithmetic,
/// clamping to the last valid day of the target month.
pub fn cutoff(now: DateTime<Utc>, window: RetentionWindow) -> DateTime<Utc> {
    let cutoff = match window {
        RetentionWindow::Week => now.checked_sub_signed(Duration::days(7)),
        RetentionWindow::Month => now.checked_sub_months(Months::new(1)),
        RetentionWindow::Year => now.checked_sub_months(Months::new(12)),
    };
    cutoff.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn is_expired(retrieved_at: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
    retrieved_at < cutoff
}
