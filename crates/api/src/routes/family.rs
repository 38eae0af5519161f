use axum::{extract::State, routing::get, Json, Router};
use esfinteres_core::model::FamilyInfo;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::session::CurrentViewer;
use crate::state::AppState;

/// Family sharing routes. Premium only.
pub fn routes() -> Router<AppState> {
    Router::new().route("/family", get(family_info).post(family_action))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FamilyAction {
    action: String,
    baby_name: Option<String>,
    invited_email: Option<String>,
}

async fn family_info(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
) -> ApiResult<Json<FamilyInfo>> {
    state.gate().require_family(&viewer)?;
    let info = state.family().family_info(&viewer.email).await?;
    Ok(Json(info))
}

async fn family_action(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
    Json(body): Json<FamilyAction>,
) -> ApiResult<Json<Value>> {
    state.gate().require_family(&viewer)?;
    let family = state.family();

    let info = match body.action.as_str() {
        "updateBabyName" => {
            let name = body
                .baby_name
                .ok_or_else(|| ApiError::BadRequest("babyName is required".into()))?;
            family.update_baby_name(&viewer.email, &name).await?
        }
        "inviteUser" => {
            let invitee = body
                .invited_email
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("invitedEmail is required".into()))?;
            family.invite(&viewer.email, &invitee).await?
        }
        other => {
            return Err(ApiError::BadRequest(format!("unknown action '{other}'")));
        }
    };

    Ok(Json(json!({ "success": true, "family": info })))
}
