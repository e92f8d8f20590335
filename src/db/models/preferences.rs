use chrono::{NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::models::reminder::ChannelKind;
use crate::error::{AppError, AppResult};

/// Per-owner reminder configuration. Read-only to the engine; mutated only
/// through the preferences surface.
///
/// `enabled_channels` and `lead_times_minutes` persist as JSON arrays in TEXT
/// columns; the typed accessors below parse them on demand.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserPreferences {
    pub owner_id: String,

    /// JSON array of channel names, e.g. `["push","in_app"]`
    pub enabled_channels: String,

    /// JSON array of positive minute offsets, e.g. `[15,60,1440]`
    pub lead_times_minutes: String,

    /// Quiet-hours window start, 'HH:MM' in the owner's timezone.
    pub quiet_hours_start: Option<String>,

    /// Quiet-hours window end, 'HH:MM'. May be earlier than the start, in
    /// which case the window wraps midnight.
    pub quiet_hours_end: Option<String>,

    /// IANA timezone identifier, e.g. 'Europe/Istanbul'.
    pub timezone: String,

    /// Delivery target for the email channel.
    pub email_address: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A parsed quiet-hours window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl UserPreferences {
    pub fn channels(&self) -> Vec<ChannelKind> {
        let names: Vec<String> = serde_json::from_str(&self.enabled_channels).unwrap_or_default();
        names.iter().filter_map(|n| ChannelKind::parse(n)).collect()
    }

    pub fn lead_times(&self) -> Vec<i64> {
        serde_json::from_str(&self.lead_times_minutes).unwrap_or_default()
    }

    /// Parsed quiet-hours window, or `None` when not configured (or when a
    /// legacy row holds an unparseable time, which disables suppression
    /// rather than wedging delivery).
    pub fn quiet_hours(&self) -> Option<QuietHours> {
        let start = parse_time_of_day(self.quiet_hours_start.as_deref()?)?;
        let end = parse_time_of_day(self.quiet_hours_end.as_deref()?)?;
        Some(QuietHours { start, end })
    }

    pub fn tz(&self) -> Option<chrono_tz::Tz> {
        self.timezone.parse().ok()
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            enabled_channels: r#"["in_app"]"#.to_string(),
            lead_times_minutes: "[15,60]".to_string(),
            quiet_hours_start: None,
            quiet_hours_end: None,
            timezone: "UTC".to_string(),
            email_address: None,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }
}

fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Partial update applied over the stored preferences.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePreferences {
    pub enabled_channels: Option<Vec<ChannelKind>>,
    pub lead_times_minutes: Option<Vec<i64>>,
    /// `Some(None)` clears the window.
    #[serde(default, with = "serde_with_double_option")]
    pub quiet_hours: Option<Option<QuietHoursUpdate>>,
    pub timezone: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHoursUpdate {
    pub start: String,
    pub end: String,
}

impl UpdatePreferences {
    /// Reject invalid configurations before they are persisted: lead times
    /// must be positive and unique, quiet-hours times well-formed 'HH:MM',
    /// and the timezone a known IANA identifier.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(ref leads) = self.lead_times_minutes {
            let mut seen = std::collections::HashSet::new();
            for lead in leads {
                if *lead <= 0 {
                    return Err(AppError::Validation(format!(
                        "Lead time must be positive, got {}",
                        lead
                    )));
                }
                if !seen.insert(*lead) {
                    return Err(AppError::Validation(format!(
                        "Duplicate lead time: {}",
                        lead
                    )));
                }
            }
        }

        if let Some(Some(ref window)) = self.quiet_hours {
            for (label, value) in [("start", &window.start), ("end", &window.end)] {
                if parse_time_of_day(value).is_none() {
                    return Err(AppError::Validation(format!(
                        "Quiet hours {} must be 'HH:MM', got '{}'",
                        label, value
                    )));
                }
            }
        }

        if let Some(ref tz) = self.timezone {
            if tz.parse::<chrono_tz::Tz>().is_err() {
                return Err(AppError::Validation(format!(
                    "Unknown timezone identifier: '{}'",
                    tz
                )));
            }
        }

        Ok(())
    }
}

// Serde helper for the `Option<Option<T>>` quiet-hours field: absent keeps
// the stored window, `null` clears it, an object replaces it.
mod serde_with_double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Ok(Some(Option::<T>::deserialize(deserializer)?))
    }
}
