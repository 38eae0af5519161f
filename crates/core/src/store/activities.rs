use chrono::{DateTime, Utc};
use esfinteres_sheets::Row;
use serde_json::Value;

use super::{activity_cols, backend, cell, RecordStore, ACTIVITIES};
use crate::error::StoreError;
use crate::model::{
    format_timestamp, month_start, normalize_email, parse_timestamp, same_email, Activity,
    ActivityPage, ActivityQuery, ActivityType, ActivityUpdate, NewActivity,
};

/// An activity together with where it was found.
#[derive(Debug, Clone)]
pub(crate) struct ScannedActivity {
    /// 1-based sheet row.
    pub row: u32,
    pub activity: Activity,
}

fn encode_row(
    timestamp: &DateTime<Utc>,
    owner_email: &str,
    baby_name: &str,
    activity_type: ActivityType,
    details: &Value,
) -> Result<Row, StoreError> {
    Ok(vec![
        format_timestamp(timestamp),
        owner_email.to_string(),
        baby_name.to_string(),
        activity_type.to_string(),
        serde_json::to_string(details)?,
    ])
}

fn decode_details(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    // Rows written by hand may hold plain text; keep it rather than drop the row.
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_activity(index: usize, row: &Row) -> Option<Activity> {
    let raw_timestamp = cell(row, activity_cols::TIMESTAMP).trim();
    let timestamp = parse_timestamp(raw_timestamp)?;
    let owner_email = cell(row, activity_cols::OWNER).trim();
    if owner_email.is_empty() {
        return None;
    }
    let activity_type = match cell(row, activity_cols::TYPE).parse::<ActivityType>() {
        Ok(kind) => kind,
        Err(err) => {
            tracing::debug!(row = index + 1, error = %err, "skipping activity row");
            return None;
        }
    };

    Some(Activity {
        id: format!("activity-{index}-{raw_timestamp}"),
        timestamp,
        owner_email: owner_email.to_string(),
        baby_name: cell(row, activity_cols::BABY_NAME).to_string(),
        activity_type,
        details: decode_details(cell(row, activity_cols::DETAILS)),
    })
}

impl RecordStore {
    /// Append one activity row. Quota checks happen before this call and are
    /// not atomic with it.
    pub async fn save_activity(&self, activity: &NewActivity) -> Result<(), StoreError> {
        let row = encode_row(
            &activity.timestamp,
            &normalize_email(&activity.owner_email),
            &activity.baby_name,
            activity.activity_type,
            &activity.details,
        )?;

        self.sheets
            .append(&ACTIVITIES.all(), vec![row])
            .await
            .map_err(backend("save activity"))?;

        tracing::info!(
            owner = %activity.owner_email,
            activity_type = %activity.activity_type,
            "activity saved"
        );
        Ok(())
    }

    /// Every parseable activity row, in sheet order.
    pub(crate) async fn scan_activities(&self) -> Result<Vec<ScannedActivity>, StoreError> {
        let rows = self
            .sheets
            .read(&ACTIVITIES.all())
            .await
            .map_err(backend("scan activities"))?;

        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                parse_activity(index, row).map(|activity| ScannedActivity {
                    row: index as u32 + 1,
                    activity,
                })
            })
            .collect())
    }

    /// Activities of one owner, newest first, with the owner's count for the current month.
    pub async fn get_activities(
        &self,
        owner_email: &str,
        query: &ActivityQuery,
        now: DateTime<Utc>,
    ) -> Result<ActivityPage, StoreError> {
        self.get_activities_for_owners(&[owner_email.to_string()], query, now)
            .await
    }

    /// Activities of any of `owners` in a single scan.
    ///
    /// `monthly_count` covers every matching activity in
    /// `[first of the current month, now]`, before date bounds and `limit` apply.
    pub async fn get_activities_for_owners(
        &self,
        owners: &[String],
        query: &ActivityQuery,
        now: DateTime<Utc>,
    ) -> Result<ActivityPage, StoreError> {
        let scanned = self.scan_activities().await?;
        let since = month_start(now);

        let mut monthly_count = 0;
        let mut activities: Vec<Activity> = Vec::new();
        for ScannedActivity { activity, .. } in scanned {
            if !owners.iter().any(|o| same_email(o, &activity.owner_email)) {
                continue;
            }
            if activity.timestamp >= since && activity.timestamp <= now {
                monthly_count += 1;
            }
            if query.start_date.is_some_and(|start| activity.timestamp < start) {
                continue;
            }
            if query.end_date.is_some_and(|end| activity.timestamp > end) {
                continue;
            }
            activities.push(activity);
        }

        activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = query.limit {
            activities.truncate(limit);
        }

        tracing::debug!(
            owners = owners.len(),
            returned = activities.len(),
            monthly_count,
            "activities listed"
        );
        Ok(ActivityPage {
            activities,
            monthly_count,
        })
    }

    /// First row matching `(owner, timestamp)`. Later rows with the same key are shadowed.
    async fn locate_activity(
        &self,
        owner_email: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<ScannedActivity, StoreError> {
        let mut matches = self.scan_activities().await?.into_iter().filter(|s| {
            same_email(&s.activity.owner_email, owner_email) && s.activity.timestamp == *timestamp
        });

        let first = matches.next().ok_or_else(|| StoreError::ActivityNotFound {
            owner: owner_email.to_string(),
            timestamp: format_timestamp(timestamp),
        })?;
        let shadowed = matches.count();
        if shadowed > 0 {
            tracing::warn!(
                owner = owner_email,
                timestamp = %format_timestamp(timestamp),
                shadowed,
                "several activities share this timestamp; using the first"
            );
        }
        Ok(first)
    }

    /// Rewrite the full row of the activity at `(owner, original_timestamp)`.
    pub async fn update_activity(&self, update: &ActivityUpdate) -> Result<Activity, StoreError> {
        let ScannedActivity { row, activity } = self
            .locate_activity(&update.owner_email, &update.original_timestamp)
            .await?;

        let updated = Activity {
            id: activity.id,
            timestamp: update.timestamp.unwrap_or(activity.timestamp),
            owner_email: activity.owner_email,
            baby_name: update.baby_name.clone().unwrap_or(activity.baby_name),
            activity_type: update.activity_type.unwrap_or(activity.activity_type),
            details: update.details.clone().unwrap_or(activity.details),
        };

        let values = encode_row(
            &updated.timestamp,
            &updated.owner_email,
            &updated.baby_name,
            updated.activity_type,
            &updated.details,
        )?;
        self.sheets
            .update(&ACTIVITIES.row(row), vec![values])
            .await
            .map_err(backend("update activity"))?;

        tracing::info!(owner = %updated.owner_email, row, "activity updated");
        Ok(updated)
    }

    /// Delete the activity at `(owner, timestamp)`. Rows below it move up by one.
    pub async fn delete_activity(
        &self,
        owner_email: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let ScannedActivity { row, .. } = self.locate_activity(owner_email, timestamp).await?;

        self.sheets
            .delete_rows(ACTIVITIES.sheet, row, 1)
            .await
            .map_err(backend("delete activity"))?;

        tracing::info!(owner = owner_email, row, "activity deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::test_support::{at, memory_store};

    fn new_activity(owner: &str, timestamp: DateTime<Utc>, details: Value) -> NewActivity {
        NewActivity {
            owner_email: owner.to_string(),
            baby_name: "Lola".to_string(),
            activity_type: ActivityType::Esfinteres,
            details,
            timestamp,
        }
    }

    #[tokio::test]
    async fn details_round_trip_through_the_sheet() {
        let (store, _) = memory_store();
        let details = json!({
            "result": "caca",
            "place": "inodoro",
            "asked": true,
            "notes": "después de almorzar, \"sin\" ayuda",
            "tries": [1, 2, 3],
        });
        let ts = at(2025, 3, 10, 9);
        store
            .save_activity(&new_activity("ana@example.com", ts, details.clone()))
            .await
            .unwrap();

        let page = store
            .get_activities("ana@example.com", &ActivityQuery::default(), at(2025, 3, 20, 0))
            .await
            .unwrap();
        assert_eq!(page.activities.len(), 1);
        assert_eq!(page.activities[0].details, details);
        assert_eq!(page.activities[0].timestamp, ts);
        assert_eq!(page.activities[0].id, "activity-0-2025-03-10T09:00:00.000Z");
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_counts_month() {
        let (store, _) = memory_store();
        let now = at(2025, 3, 20, 12);
        for ts in [
            at(2025, 2, 27, 8),
            at(2025, 3, 1, 0),
            at(2025, 3, 15, 8),
            at(2025, 3, 19, 8),
            at(2025, 3, 25, 8), // after "now"
        ] {
            store
                .save_activity(&new_activity("ana@example.com", ts, json!({})))
                .await
                .unwrap();
        }
        store
            .save_activity(&new_activity("beto@example.com", at(2025, 3, 18, 8), json!({})))
            .await
            .unwrap();

        let page = store
            .get_activities("ana@example.com", &ActivityQuery::default(), now)
            .await
            .unwrap();
        assert_eq!(page.activities.len(), 5);
        assert_eq!(page.monthly_count, 3);
        assert_eq!(page.activities[0].timestamp, at(2025, 3, 25, 8));
        assert!(page
            .activities
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));

        let bounded = store
            .get_activities(
                "ana@example.com",
                &ActivityQuery {
                    limit: Some(1),
                    start_date: Some(at(2025, 3, 1, 0)),
                    end_date: Some(at(2025, 3, 19, 8)),
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(bounded.activities.len(), 1);
        assert_eq!(bounded.activities[0].timestamp, at(2025, 3, 19, 8));
        assert_eq!(bounded.monthly_count, 3);
    }

    #[tokio::test]
    async fn update_rewrites_matching_row() {
        let (store, _) = memory_store();
        let ts = at(2025, 3, 10, 9);
        store
            .save_activity(&new_activity("ana@example.com", ts, json!({ "result": "pipi" })))
            .await
            .unwrap();

        let updated = store
            .update_activity(&ActivityUpdate {
                owner_email: "ana@example.com".into(),
                original_timestamp: ts,
                timestamp: Some(at(2025, 3, 10, 10)),
                baby_name: None,
                activity_type: None,
                details: Some(json!({ "result": "seco" })),
            })
            .await
            .unwrap();
        assert_eq!(updated.baby_name, "Lola");

        let page = store
            .get_activities("ana@example.com", &ActivityQuery::default(), at(2025, 3, 20, 0))
            .await
            .unwrap();
        assert_eq!(page.activities.len(), 1);
        assert_eq!(page.activities[0].timestamp, at(2025, 3, 10, 10));
        assert_eq!(page.activities[0].details, json!({ "result": "seco" }));
    }

    #[tokio::test]
    async fn update_requires_owner_match() {
        let (store, _) = memory_store();
        let ts = at(2025, 3, 10, 9);
        store
            .save_activity(&new_activity("ana@example.com", ts, json!({})))
            .await
            .unwrap();

        let err = store
            .update_activity(&ActivityUpdate {
                owner_email: "beto@example.com".into(),
                original_timestamp: ts,
                timestamp: None,
                baby_name: Some("Otro".into()),
                activity_type: None,
                details: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ActivityNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_shifts_synthetic_ids() {
        let (store, book) = memory_store();
        let first = at(2025, 3, 10, 9);
        let second = at(2025, 3, 11, 9);
        for ts in [first, second] {
            store
                .save_activity(&new_activity("ana@example.com", ts, json!({})))
                .await
                .unwrap();
        }

        store.delete_activity("ana@example.com", &first).await.unwrap();

        assert_eq!(book.dump("Activities").await.unwrap().len(), 1);
        let page = store
            .get_activities("ana@example.com", &ActivityQuery::default(), at(2025, 3, 20, 0))
            .await
            .unwrap();
        assert_eq!(page.activities.len(), 1);
        assert_eq!(page.activities[0].id, "activity-0-2025-03-11T09:00:00.000Z");

        let err = store.delete_activity("ana@example.com", &first).await.unwrap_err();
        assert_eq!(err.code(), "not-found");
    }

    #[tokio::test]
    async fn colliding_timestamps_resolve_to_first_row() {
        let (store, book) = memory_store();
        let ts = at(2025, 3, 10, 9);
        store
            .save_activity(&new_activity("ana@example.com", ts, json!({ "n": 1 })))
            .await
            .unwrap();
        store
            .save_activity(&new_activity("ana@example.com", ts, json!({ "n": 2 })))
            .await
            .unwrap();

        store.delete_activity("ana@example.com", &ts).await.unwrap();

        let rows = book.dump("Activities").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][activity_cols::DETAILS as usize], r#"{"n":2}"#);
    }

    #[test]
    fn unparseable_rows_are_skipped() {
        let header: Row = ["timestamp", "ownerEmail", "babyName", "activityType", "details"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(parse_activity(0, &header).is_none());

        let legacy: Row = ["2025-03-01T10:00:00.000Z", "ana@example.com", "Lola", "bath", "{}"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(parse_activity(1, &legacy).is_none());

        let plain: Row = ["2025-03-01T10:00:00.000Z", "ana@example.com", "Lola", "diaper", "mojado"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let activity = parse_activity(2, &plain).unwrap();
        assert_eq!(activity.details, Value::String("mojado".into()));
    }
}
