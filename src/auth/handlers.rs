use axum::{
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, LogoutRequest, PublicUser, RefreshRequest, RegisterRequest,
        },
        repo_types::User,
        services::{
            claims_from_headers, hash_password, is_valid_email, is_valid_username, remaining_ttl,
            verify_password, AuthUser, JwtKeys, TokenKind,
        },
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).delete(delete_me))
}

fn public(user: User) -> PublicUser {
    PublicUser {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
    }
}

fn token_pair(
    state: &AppState,
    user_id: uuid::Uuid,
) -> Result<(String, String), (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user_id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let refresh_token = keys.sign_refresh(user_id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok((access_token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err((StatusCode::BAD_REQUEST, "Invalid username".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    // Ensure email and username are not taken
    if let Ok(Some(_)) = User::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }
    if let Ok(Some(_)) = User::find_by_username(&state.db, &payload.username).await {
        warn!(username = %payload.username, "username already taken");
        return Err((StatusCode::CONFLICT, "Username already taken".into()));
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let user = match User::create(
        &state.db,
        &payload.username,
        &payload.email,
        &payload.first_name,
        &payload.last_name,
        &hash,
    )
    .await
    {
        Ok(u) => u,
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let (access_token, refresh_token) = token_pair(&state, user.id)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = match verify_password(&payload.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let (access_token, refresh_token) = token_pair(&state, user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    match state.blacklist.is_revoked(claims.jti).await {
        Ok(false) => {}
        Ok(true) => {
            warn!(jti = %claims.jti, "revoked refresh token presented");
            return Err((StatusCode::UNAUTHORIZED, "Token has been revoked".into()));
        }
        Err(e) => {
            error!(error = %e, "blacklist lookup failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Token check failed".into()));
        }
    }

    let (access_token, refresh_token) = token_pair(&state, claims.sub)?;

    let user = match User::find_by_id(&state.db, claims.sub).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err((StatusCode::UNAUTHORIZED, "User not found".into())),
        Err(e) => {
            error!(error = %e, "find_by_id failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public(user),
    }))
}

/// Revokes the presented access token (and the refresh token, when supplied)
/// for the remainder of its lifetime.
#[instrument(skip(state, headers, payload))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<Json<LogoutRequest>>,
) -> Result<StatusCode, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = claims_from_headers(&headers, &keys)?;

    if claims.kind != TokenKind::Access {
        return Err((StatusCode::UNAUTHORIZED, "Access token required".into()));
    }

    let ttl = remaining_ttl(&claims);
    if ttl > 0 {
        if let Err(e) = state.blacklist.revoke(claims.jti, ttl).await {
            error!(error = %e, "revoke access token failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Logout failed".into()));
        }
    }

    if let Some(Json(LogoutRequest {
        refresh_token: Some(token),
    })) = payload
    {
        // Best effort: a malformed refresh token does not fail the logout.
        if let Ok(refresh_claims) = keys.verify_refresh(&token) {
            let ttl = remaining_ttl(&refresh_claims);
            if ttl > 0 {
                if let Err(e) = state.blacklist.revoke(refresh_claims.jti, ttl).await {
                    error!(error = %e, "revoke refresh token failed");
                    return Err((StatusCode::INTERNAL_SERVER_ERROR, "Logout failed".into()));
                }
            }
        }
    }

    info!(user_id = %claims.sub, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = match User::find_by_id(&state.db, user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(user_id = %user_id, "user not found");
            return Err((StatusCode::UNAUTHORIZED, "User not found".into()));
        }
        Err(e) => {
            error!(error = %e, user_id = %user_id, "find_by_id failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    Ok(Json(public(user)))
}

/// Deletes the account; owned calculations are removed by the FK cascade.
#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, (StatusCode, String)> {
    match User::delete(&state.db, user_id).await {
        Ok(true) => {
            info!(user_id = %user_id, "account deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err((StatusCode::UNAUTHORIZED, "User not found".into())),
        Err(e) => {
            error!(error = %e, user_id = %user_id, "delete user failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[cfg(test)]
mod me_tests {
    use super::*;

    #[test]
    fn test_me_response_serialization() {
        let response = PublicUser {
            id: uuid::Uuid::new_v4(),
            username: "tester".to_string(),
            email: "test@example.com".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("tester"));
        assert!(json.contains("id"));
    }
}
