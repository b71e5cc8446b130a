//! AI Config HTTP Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{CreateAiConfig, DeleteAiConfig, ListAiConfigs, UpdateAiConfig};
use crate::infrastructure::http::dto::{
    AiConfigResponse, ApiResponse, CreateAiConfigRequest, Empty, UpdateAiConfigRequest,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::middleware::CurrentUser;
use crate::infrastructure::http::state::AppState;

pub async fn list_ai_configs(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ApiResponse<Vec<AiConfigResponse>>>, ApiError> {
    let configs = state
        .list_ai_configs_handler
        .handle(ListAiConfigs { user_id })
        .await?;
    Ok(Json(ApiResponse::success(
        configs.into_iter().map(Into::into).collect(),
    )))
}

pub async fn create_ai_config(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreateAiConfigRequest>,
) -> Result<Json<ApiResponse<AiConfigResponse>>, ApiError> {
    let config = state
        .create_ai_config_handler
        .handle(CreateAiConfig {
            user_id,
            provider: req.provider,
            model: req.model,
            api_key: req.api_key,
            base_url: req.base_url,
            parameters: req.parameters,
            is_default: req.is_default,
        })
        .await?;
    Ok(Json(ApiResponse::success(config.into())))
}

pub async fn update_ai_config(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(config_id): Path<Uuid>,
    Json(req): Json<UpdateAiConfigRequest>,
) -> Result<Json<ApiResponse<AiConfigResponse>>, ApiError> {
    let config = state
        .update_ai_config_handler
        .handle(UpdateAiConfig {
            user_id,
            config_id,
            provider: req.provider,
            model: req.model,
            api_key: req.api_key,
            base_url: req.base_url,
            parameters: req.parameters,
            is_default: req.is_default,
        })
        .await?;
    Ok(Json(ApiResponse::success(config.into())))
}

pub async fn delete_ai_config(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(config_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_ai_config_handler
        .handle(DeleteAiConfig { user_id, config_id })
        .await?;
    Ok(Json(ApiResponse::ok()))
}
