use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Platform-reported push permission state for an owner.
///
/// Transitions happen only via an explicit request/report from the consumer,
/// never from the poller. Re-requesting after a denial is allowed; the engine
/// just reflects whatever state is reported back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }

    pub fn parse(s: &str) -> Option<PermissionState> {
        match s {
            "default" => Some(PermissionState::Default),
            "granted" => Some(PermissionState::Granted),
            "denied" => Some(PermissionState::Denied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PushPermission {
    pub owner_id: String,

    /// Permission state ('default', 'granted', 'denied')
    pub state: String,

    pub updated_at: NaiveDateTime,
}

impl PushPermission {
    pub fn permission_state(&self) -> PermissionState {
        PermissionState::parse(&self.state).unwrap_or(PermissionState::Default)
    }
}
