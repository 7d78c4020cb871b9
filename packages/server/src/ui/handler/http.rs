//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::HouseId,
    infrastructure::dto::http::{
        HealthDto, HouseDetailDto, HouseSummaryDto, LoginRequest, StatusDto,
    },
    ui::state::AppState,
    usecase::LoginError,
};

/// Log in or register; responds with the raw bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    match state
        .login_usecase
        .execute(request.username, request.password)
        .await
    {
        Ok(token) => (StatusCode::OK, token).into_response(),
        Err(LoginError::InvalidCredentials) => {
            (StatusCode::UNAUTHORIZED, Json(StatusDto::error())).into_response()
        }
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(StatusDto::error())).into_response()
        }
    }
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthDto>, StatusCode> {
    match state.server.stats().await {
        Ok(stats) => Ok(Json(HealthDto::from(stats))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Get list of active houses
pub async fn get_houses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HouseSummaryDto>>, StatusCode> {
    let houses = state.server.houses().await.map_err(|e| {
        tracing::error!("Failed to list houses: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut summaries = Vec::with_capacity(houses.len());
    for house in houses {
        match house.snapshot().await {
            Ok(snapshot) => summaries.push(HouseSummaryDto::from(&snapshot)),
            Err(e) => tracing::warn!("Skipping house in listing: {}", e),
        }
    }
    Ok(Json(summaries))
}

/// Get house detail by ID
pub async fn get_house_detail(
    State(state): State<Arc<AppState>>,
    Path(house_id): Path<String>,
) -> Result<Json<HouseDetailDto>, StatusCode> {
    let id = HouseId::parse(&house_id).map_err(|_| StatusCode::NOT_FOUND)?;
    let house = match state.server.find_house_by_id(id).await {
        Ok(Some(house)) => house,
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to look up house: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    match house.snapshot().await {
        Ok(snapshot) => Ok(Json(HouseDetailDto::from(snapshot))),
        Err(e) => {
            tracing::error!("Failed to read house: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
