use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use esfinteres_core::model::{normalize_email, NewUser, User, DEFAULT_COUNTRY, DEFAULT_USER_NAME};
use esfinteres_core::StoreError;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header the identity provider uses to prove it is the caller.
pub const SIGNIN_SECRET_HEADER: &str = "x-signin-secret";

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/signin", post(sign_in))
}

/// Profile forwarded by the identity provider after a successful sign-in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest {
    email: String,
    name: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    token: String,
    user: User,
}

/// Record the user on first sign-in and hand back a session token.
///
/// The caller must present the callback secret. Without one configured,
/// sign-in is only open on the in-memory development store.
///
/// A store failure does not block the sign-in: the session is issued as free
/// and the gate re-reads the flag on later requests.
async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SignInRequest>,
) -> ApiResult<Json<SignInResponse>> {
    let config = state.config();
    match config.signin_callback_secret.as_deref() {
        Some(expected) => {
            let presented = headers
                .get(SIGNIN_SECRET_HEADER)
                .and_then(|v| v.to_str().ok());
            if presented != Some(expected) {
                return Err(ApiError::Unauthorized);
            }
        }
        None if config.is_dev_store() => {}
        None => {
            tracing::warn!(store = config.store.name(), "sign-in refused, no callback secret configured");
            return Err(ApiError::Forbidden("sign-in is not configured".into()));
        }
    }

    let email = normalize_email(&body.email);
    if !email.contains('@') {
        return Err(ApiError::BadRequest(format!("'{}' is not an email address", body.email)));
    }
    let new_user = NewUser {
        email,
        name: body
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
        image: body.image,
        is_premium: false,
    };

    let user = match upsert_user(&state, &new_user).await {
        Ok(user) => user,
        Err(err) => {
            tracing::error!(email = %new_user.email, error = %err, "failed to record sign-in");
            User {
                email: new_user.email.clone(),
                name: new_user.name.clone(),
                image: new_user.image.clone(),
                is_premium: false,
                country: DEFAULT_COUNTRY.to_string(),
                created_at: None,
            }
        }
    };

    let token = state
        .sessions()
        .issue(&user.email, &user.name, user.is_premium)?;
    tracing::info!(email = %user.email, premium = user.is_premium, "signed in");
    Ok(Json(SignInResponse { token, user }))
}

/// Existing row when there is one, otherwise a freshly appended row.
async fn upsert_user(state: &AppState, new_user: &NewUser) -> Result<User, StoreError> {
    let store = state.store();
    match store.get_user_by_email(&new_user.email).await? {
        Some(record) => Ok(record.user),
        None => store.save_user(new_user).await,
    }
}
