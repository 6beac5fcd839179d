use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys, TokenError, TokenKind},
        password::{hash_password, verify_password, PasswordError},
        services::{is_valid_email, issue_tokens, normalize_email},
    },
    error::{store_error, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let hash = hash_password(&payload.password).map_err(|e| {
        warn!(error = %e, "password rejected");
        e.rejection()
    })?;

    let user = state
        .users
        .create(&payload.email, &hash, payload.profile_picture_url.as_deref())
        .await
        .map_err(|e| {
            warn!(email = %payload.email, error = %e, "register failed");
            store_error(e)
        })?;

    let keys = JwtKeys::from_ref(&state);
    let user_id = user.id;
    let response = issue_tokens(&keys, user).map_err(TokenError::rejection)?;

    info!(%user_id, email = %payload.email, "user registered");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match state.users.find_by_email(&payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(store_error(e));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(PasswordError::rejection)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let user_id = user.id;
    let response = issue_tokens(&keys, user).map_err(TokenError::rejection)?;

    info!(%user_id, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            e.rejection()
        })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(store_error)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let response = issue_tokens(&keys, user).map_err(TokenError::rejection)?;
    Ok(Json(response))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| {
            error!(%user_id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;

    Ok(Json(PublicUser::from(user)))
}
