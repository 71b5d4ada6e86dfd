//! Administrative CRUD for routing configuration. The forwarding core only
//! reads `provider_groups` and `provider_configs`; these endpoints are how the
//! settings UI populates them.

use crate::shared::models::{
    NewProviderConfig, NewProviderGroup, ProviderConfig, ProviderConfigChanges, ProviderGroup,
    ProviderGroupChanges,
};
use crate::shared::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use diesel::prelude::*;
use log::error;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/routing/groups", get(list_groups))
        .route("/api/routing/groups", post(create_group))
        .route("/api/routing/groups/:id", put(update_group))
        .route("/api/routing/groups/:id", delete(delete_group))
        .route("/api/routing/providers", get(list_configs))
        .route("/api/routing/providers", post(create_config))
        .route("/api/routing/providers/:id", put(update_config))
        .route("/api/routing/providers/:id", delete(delete_config))
}

fn db_error(context: &str, e: impl std::fmt::Display) -> (StatusCode, Json<serde_json::Value>) {
    error!("{}: {}", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": context })),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupListQuery {
    pub panel_id: Uuid,
}

async fn list_groups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GroupListQuery>,
) -> impl IntoResponse {
    use crate::shared::schema::provider_groups::dsl::*;
    let mut conn = match state.conn.get() {
        Ok(conn) => conn,
        Err(e) => return db_error("Failed to acquire connection", e),
    };
    match provider_groups
        .filter(panel_id.eq(query.panel_id))
        .order(created_at.asc())
        .load::<ProviderGroup>(&mut conn)
    {
        Ok(groups) => (StatusCode::OK, Json(json!({ "groups": groups }))),
        Err(e) => db_error("Failed to list provider groups", e),
    }
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(new_group): Json<NewProviderGroup>,
) -> impl IntoResponse {
    use crate::shared::schema::provider_groups::dsl::*;
    let mut conn = match state.conn.get() {
        Ok(conn) => conn,
        Err(e) => return db_error("Failed to acquire connection", e),
    };
    match diesel::insert_into(provider_groups)
        .values(&new_group)
        .get_result::<ProviderGroup>(&mut conn)
    {
        Ok(group) => (StatusCode::CREATED, Json(json!({ "group": group }))),
        Err(e) => db_error("Failed to create provider group", e),
    }
}

async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(changes): Json<ProviderGroupChanges>,
) -> impl IntoResponse {
    use crate::shared::schema::provider_groups::dsl::*;
    if changes.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "no fields to update" })),
        );
    }
    let mut conn = match state.conn.get() {
        Ok(conn) => conn,
        Err(e) => return db_error("Failed to acquire connection", e),
    };
    match diesel::update(provider_groups.filter(id.eq(group_id)))
        .set(&changes)
        .get_result::<ProviderGroup>(&mut conn)
    {
        Ok(group) => (StatusCode::OK, Json(json!({ "group": group }))),
        Err(diesel::result::Error::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "provider group not found" })),
        ),
        Err(e) => db_error("Failed to update provider group", e),
    }
}

async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
) -> impl IntoResponse {
    use crate::shared::schema::provider_groups::dsl::*;
    let mut conn = match state.conn.get() {
        Ok(conn) => conn,
        Err(e) => return db_error("Failed to acquire connection", e),
    };
    match diesel::delete(provider_groups.filter(id.eq(group_id))).execute(&mut conn) {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "provider group not found" })),
        ),
        Ok(_) => (StatusCode::OK, Json(json!({ "deleted": group_id }))),
        Err(e) => db_error("Failed to delete provider group", e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigListQuery {
    pub user_id: Uuid,
}

async fn list_configs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConfigListQuery>,
) -> impl IntoResponse {
    use crate::shared::schema::provider_configs::dsl::*;
    let mut conn = match state.conn.get() {
        Ok(conn) => conn,
        Err(e) => return db_error("Failed to acquire connection", e),
    };
    match provider_configs
        .filter(user_id.eq(query.user_id))
        .order(created_at.asc())
        .load::<ProviderConfig>(&mut conn)
    {
        Ok(configs) => (StatusCode::OK, Json(json!({ "providers": configs }))),
        Err(e) => db_error("Failed to list provider configs", e),
    }
}

async fn create_config(
    State(state): State<Arc<AppState>>,
    Json(new_config): Json<NewProviderConfig>,
) -> impl IntoResponse {
    use crate::shared::schema::provider_configs::dsl::*;
    let mut conn = match state.conn.get() {
        Ok(conn) => conn,
        Err(e) => return db_error("Failed to acquire connection", e),
    };
    match diesel::insert_into(provider_configs)
        .values(&new_config)
        .get_result::<ProviderConfig>(&mut conn)
    {
        Ok(config) => (StatusCode::CREATED, Json(json!({ "provider": config }))),
        Err(e) => db_error("Failed to create provider config", e),
    }
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Path(config_id): Path<Uuid>,
    Json(changes): Json<ProviderConfigChanges>,
) -> impl IntoResponse {
    use crate::shared::schema::provider_configs::dsl::*;
    if changes.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "no fields to update" })),
        );
    }
    let mut conn = match state.conn.get() {
        Ok(conn) => conn,
        Err(e) => return db_error("Failed to acquire connection", e),
    };
    match diesel::update(provider_configs.filter(id.eq(config_id)))
        .set(&changes)
        .get_result::<ProviderConfig>(&mut conn)
    {
        Ok(config) => (StatusCode::OK, Json(json!({ "provider": config }))),
        Err(diesel::result::Error::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "provider config not found" })),
        ),
        Err(e) => db_error("Failed to update provider config", e),
    }
}

async fn delete_config(
    State(state): State<Arc<AppState>>,
    Path(config_id): Path<Uuid>,
) -> impl IntoResponse {
    use crate::shared::schema::provider_configs::dsl::*;
    let mut conn = match state.conn.get() {
        Ok(conn) => conn,
        Err(e) => return db_error("Failed to acquire connection", e),
    };
    match diesel::delete(provider_configs.filter(id.eq(config_id))).execute(&mut conn) {
        Ok(0) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "provider config not found" })),
        ),
        Ok(_) => (StatusCode::OK, Json(json!({ "deleted": config_id }))),
        Err(e) => db_error("Failed to delete provider config", e),
    }
}
