use axum::{extract::State, routing::post, Json, Router};
use esfinteres_core::model::{User, UserUpdate};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::session::AdminGuard;
use crate::state::AppState;

/// Operator routes, guarded by `ADMIN_TOKEN`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/users/premium", post(set_premium))
}

#[derive(Debug, Deserialize)]
struct SetPremium {
    email: String,
    #[serde(default = "default_premium")]
    premium: bool,
}

fn default_premium() -> bool {
    true
}

/// Stands in for the payment provider's confirmation hook.
async fn set_premium(
    State(state): State<AppState>,
    _admin: AdminGuard,
    Json(body): Json<SetPremium>,
) -> ApiResult<Json<User>> {
    let store = state.store();
    let user = if body.premium {
        store.upgrade_to_premium(&body.email).await?
    } else {
        let update = UserUpdate {
            is_premium: Some(false),
            ..Default::default()
        };
        store.update_user(&body.email, &update).await?
    };

    tracing::info!(email = %user.email, premium = user.is_premium, "premium flag changed");
    Ok(Json(user))
}
