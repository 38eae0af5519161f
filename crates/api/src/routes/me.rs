use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use esfinteres_core::model::{ActivityQuery, User, UserUpdate};
use esfinteres_core::TierLimits;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::session::CurrentViewer;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(profile).patch(update_profile))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    user: User,
    limits: TierLimits,
    monthly_count: usize,
}

/// Editable profile fields. The premium flag is not one of them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ProfileUpdate {
    name: Option<String>,
    image: Option<String>,
    country: Option<String>,
}

async fn profile(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
) -> ApiResult<Json<ProfileResponse>> {
    let store = state.store();
    let record = store
        .get_user_by_email(&viewer.email)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no account for {}", viewer.email)))?;
    let page = store
        .get_activities(&viewer.email, &ActivityQuery::default(), Utc::now())
        .await?;

    Ok(Json(ProfileResponse {
        user: record.user,
        limits: viewer.limits(),
        monthly_count: page.monthly_count,
    }))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Json(body): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let update = UserUpdate {
        name: body.name,
        image: body.image,
        country: body.country,
        is_premium: None,
    };
    if update.is_empty() {
        return Err(ApiError::BadRequest("nothing to update".into()));
    }

    let user = state.store().update_user(&viewer.email, &update).await?;
    Ok(Json(user))
}
