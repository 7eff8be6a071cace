use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{auth::services::AuthUser, state::AppState};

use super::dto::{CalculationCreate, CalculationResponse, CalculationUpdate, Pagination};
use super::model::{CalcError, Calculation};
use super::repo;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/calculations", get(browse_calculations))
        .route("/calculations/:id", get(read_calculation))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/calculations", post(add_calculation))
        .route(
            "/calculations/:id",
            patch(edit_calculation).delete(delete_calculation),
        )
}

fn respond(e: CalcError) -> (StatusCode, String) {
    if let CalcError::Db(ref db_err) = e {
        error!(error = %db_err, "calculation query failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into());
    }
    (e.status(), e.to_string())
}

#[instrument(skip(state))]
pub async fn browse_calculations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<CalculationResponse>>, (StatusCode, String)> {
    let calcs = repo::list_by_user(&state.db, user_id, p.limit, p.offset)
        .await
        .map_err(respond)?;
    Ok(Json(calcs.into_iter().map(CalculationResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn read_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CalculationResponse>, (StatusCode, String)> {
    let calc = repo::get(&state.db, id, user_id).await.map_err(respond)?;
    Ok(Json(calc.into()))
}

#[instrument(skip(state, payload))]
pub async fn add_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CalculationCreate>,
) -> Result<(StatusCode, HeaderMap, Json<CalculationResponse>), (StatusCode, String)> {
    let calc = Calculation::create(&payload.kind, payload.inputs, user_id).map_err(respond)?;
    repo::insert(&state.db, &calc).await.map_err(respond)?;

    info!(user_id = %user_id, id = %calc.id, kind = calc.kind.as_str(), "calculation created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/calculations/{}", calc.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(calc.into())))
}

#[instrument(skip(state, payload))]
pub async fn edit_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CalculationUpdate>,
) -> Result<Json<CalculationResponse>, (StatusCode, String)> {
    let calc = repo::update(
        &state.db,
        id,
        user_id,
        payload.kind.as_deref(),
        payload.inputs,
    )
    .await
    .map_err(respond)?;

    info!(user_id = %user_id, id = %calc.id, kind = calc.kind.as_str(), "calculation updated");
    Ok(Json(calc.into()))
}

#[instrument(skip(state))]
pub async fn delete_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    repo::delete(&state.db, id, user_id).await.map_err(respond)?;
    info!(user_id = %user_id, id = %id, "calculation deleted");
    Ok(StatusCode::NO_CONTENT)
}
