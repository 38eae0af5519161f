use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use esfinteres_core::model::{
    format_timestamp, parse_timestamp, Activity, ActivityQuery, ActivityType, ActivityUpdate,
    NewActivity,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ApiError, ApiResult};
use crate::session::CurrentViewer;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/activities",
        get(list_activities)
            .post(create_activity)
            .put(update_activity)
            .delete(delete_activity),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    limit: Option<usize>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    activities: Vec<Activity>,
    monthly_count: usize,
    is_premium: bool,
    /// Absent for premium accounts.
    monthly_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateActivity {
    #[serde(rename = "type")]
    activity_type: String,
    #[serde(default)]
    details: Value,
    baby_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateActivity {
    original_timestamp: String,
    timestamp: Option<String>,
    baby_name: Option<String>,
    #[serde(rename = "type")]
    activity_type: Option<String>,
    details: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    timestamp: Option<String>,
}

/// Accepts RFC 3339 instants or bare `YYYY-MM-DD` dates. A bare date means
/// the start of that UTC day, or its last millisecond when `end_of_day` is set.
fn parse_instant(field: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Some(ts) = parse_timestamp(raw) {
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{field} '{raw}' is not a valid date")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    time.map(|t| date.and_time(t).and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} '{raw}' is not a valid date")))
}

fn parse_type(raw: &str) -> Result<ActivityType, ApiError> {
    raw.parse::<ActivityType>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Details are stored as a JSON object; `null` means empty.
fn object_details(details: Value) -> Result<Value, ApiError> {
    match details {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(details),
        _ => Err(ApiError::BadRequest("details must be a JSON object".into())),
    }
}

/// The viewer's activities, or their whole family's when they belong to one,
/// limited to what their tier may see.
async fn list_activities(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ListResponse>> {
    let now = Utc::now();
    let query = ActivityQuery {
        limit: params.limit,
        start_date: params
            .start_date
            .as_deref()
            .map(|raw| parse_instant("startDate", raw, false))
            .transpose()?,
        end_date: params
            .end_date
            .as_deref()
            .map(|raw| parse_instant("endDate", raw, true))
            .transpose()?,
    };
    let query = state.gate().scope_query(&viewer, query, now);

    let page = state
        .family()
        .shared_activities(&viewer.email, &query, now)
        .await?;

    Ok(Json(ListResponse {
        activities: page.activities,
        monthly_count: page.monthly_count,
        is_premium: viewer.is_premium(),
        monthly_limit: viewer.limits().monthly_quota,
    }))
}

async fn create_activity(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Json(body): Json<CreateActivity>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let activity_type = parse_type(&body.activity_type)?;
    let details = object_details(body.details)?;
    // Server time only. The quota counts [month start, now].
    let timestamp = Utc::now();

    let monthly_count = state.gate().check_write_quota(&viewer, timestamp).await?;

    let baby_name = match body.baby_name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => state.family().baby_name_for(&viewer.email).await?,
    };

    state
        .store()
        .save_activity(&NewActivity {
            owner_email: viewer.email.clone(),
            baby_name,
            activity_type,
            details,
            timestamp,
        })
        .await?;

    let mut body = json!({
        "success": true,
        "timestamp": format_timestamp(&timestamp),
    });
    if viewer.limits().monthly_quota.is_some() {
        body["monthlyCount"] = json!(monthly_count + 1);
    }
    Ok((StatusCode::CREATED, Json(body)))
}

async fn update_activity(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Json(body): Json<UpdateActivity>,
) -> ApiResult<Json<Activity>> {
    let original_timestamp =
        parse_instant("originalTimestamp", &body.original_timestamp, false)?;
    let timestamp = body
        .timestamp
        .as_deref()
        .map(|raw| parse_instant("timestamp", raw, false))
        .transpose()?;
    if let Some(new) = timestamp {
        state
            .gate()
            .check_retime(&viewer, original_timestamp, new, Utc::now())?;
    }

    let update = ActivityUpdate {
        owner_email: viewer.email.clone(),
        original_timestamp,
        timestamp,
        baby_name: body.baby_name,
        activity_type: body.activity_type.as_deref().map(parse_type).transpose()?,
        details: body.details.map(object_details).transpose()?,
    };

    let activity = state.store().update_activity(&update).await?;
    Ok(Json(activity))
}

async fn delete_activity(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<Value>> {
    let raw = params
        .timestamp
        .ok_or_else(|| ApiError::BadRequest("timestamp is required".into()))?;
    let timestamp = parse_instant("timestamp", &raw, false)?;

    state
        .store()
        .delete_activity(&viewer.email, &timestamp)
        .await?;
    Ok(Json(json!({ "success": true })))
}
