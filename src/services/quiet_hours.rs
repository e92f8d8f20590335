use chrono::{NaiveDateTime, TimeZone, Utc};

use crate::db::models::UserPreferences;

/// Whether `instant` (UTC) falls inside the owner's quiet-hours window.
///
/// The window is expressed as two times-of-day in the owner's timezone and
/// may wrap midnight (start > end). Quiet hours are advisory: callers defer
/// delivery to a later poll, they never discard a reminder.
///
/// Owners without a configured window are never quiet. An unknown timezone
/// identifier also evaluates as not-quiet (with a warning) so a bad
/// preference row cannot wedge delivery.
pub fn is_quiet(instant: NaiveDateTime, prefs: &UserPreferences) -> bool {
    let Some(window) = prefs.quiet_hours() else {
        return false;
    };

    let Some(tz) = prefs.tz() else {
        tracing::warn!(
            "Unknown timezone '{}' for owner {}; treating as not quiet",
            prefs.timezone,
            prefs.owner_id
        );
        return false;
    };

    let local = Utc.from_utc_datetime(&instant).with_timezone(&tz).time();

    if window.start <= window.end {
        window.start <= local && local <= window.end
    } else {
        // Window spans midnight, e.g. 22:00-06:00.
        local >= window.start || local <= window.end
    }
}
