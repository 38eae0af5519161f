use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Baby name used when neither the request nor the family provides one.
pub const DEFAULT_BABY_NAME: &str = "Bebé";

/// Kind of logged event. `Esfinteres` covers the toilet-training log
/// (pee, poop, dry); the rest are the legacy baby-care types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Feeding,
    Sleep,
    Diaper,
    Milestone,
    Esfinteres,
}

impl ActivityType {
    pub const ALL: [ActivityType; 5] = [
        ActivityType::Feeding,
        ActivityType::Sleep,
        ActivityType::Diaper,
        ActivityType::Milestone,
        ActivityType::Esfinteres,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Feeding => "feeding",
            ActivityType::Sleep => "sleep",
            ActivityType::Diaper => "diaper",
            ActivityType::Milestone => "milestone",
            ActivityType::Esfinteres => "esfinteres",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity type '{0}'")]
pub struct UnknownActivityType(pub String);

impl FromStr for ActivityType {
    type Err = UnknownActivityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| UnknownActivityType(s.to_string()))
    }
}

/// A logged event as read back from the store.
///
/// `id` is synthetic (`activity-{scanIndex}-{timestamp}`): it reflects the
/// row's position at read time and changes after any insert or delete before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub owner_email: String,
    pub baby_name: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub details: Value,
}

/// Fields for a new activity row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub owner_email: String,
    pub baby_name: String,
    pub activity_type: ActivityType,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

/// Listing filters. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Result of a listing: the matching activities, newest first, and the
/// number of activities logged in the current calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPage {
    pub activities: Vec<Activity>,
    pub monthly_count: usize,
}

/// Change to an existing activity located by `(owner_email, original_timestamp)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityUpdate {
    pub owner_email: String,
    pub original_timestamp: DateTime<Utc>,
    pub timestamp: Option<DateTime<Utc>>,
    pub baby_name: Option<String>,
    pub activity_type: Option<ActivityType>,
    pub details: Option<Value>,
}

/// Timestamp text as written to the store, e.g. `2025-03-01T10:15:00.000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// First instant of the UTC calendar month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_type_parses_every_variant() {
        for kind in ActivityType::ALL {
            assert_eq!(kind.as_str().parse::<ActivityType>().unwrap(), kind);
        }
        assert!("bath".parse::<ActivityType>().is_err());
    }

    #[test]
    fn timestamps_use_millisecond_zulu_format() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2025-03-01T10:15:00.000Z");
        assert_eq!(parse_timestamp("2025-03-01T10:15:00.000Z"), Some(ts));
        assert_eq!(parse_timestamp("2025-03-01T07:15:00-03:00"), Some(ts));
        assert_eq!(parse_timestamp("timestamp"), None);
    }

    #[test]
    fn month_start_truncates_to_first_day() {
        let now = Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap();
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn activity_serializes_type_field() {
        let activity = Activity {
            id: "activity-1-2025-03-01T10:15:00.000Z".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap(),
            owner_email: "ana@example.com".into(),
            baby_name: "Lola".into(),
            activity_type: ActivityType::Esfinteres,
            details: serde_json::json!({ "result": "pipi", "place": "pelela" }),
        };
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["type"], "esfinteres");
        assert_eq!(json["ownerEmail"], "ana@example.com");
        assert_eq!(json["details"]["result"], "pipi");
    }
}
