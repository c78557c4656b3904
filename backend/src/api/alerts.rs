use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::api::response::ApiResponse;
use crate::api::{AppState, Event};
use crate::auth::{AuthUser, Permission};
use crate::error::{AppError, AppResult};
use crate::models::{AlertRule, AlertRuleRequest};

fn rule_not_found(id: &str) -> AppError {
    AppError::not_found(&format!("Alert rule {} not found", id))
}

/// List alert rules
#[utoipa::path(
    get,
    path = "/api/alert-rules",
    tag = "alerts",
    responses(
        (status = 200, description = "Alert rules", body = Vec<AlertRule>)
    )
)]
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<AlertRule>>> {
    auth.require(Permission::View)?;
    let rules = state.db.list_alert_rules().await?;
    Ok(Json(rules))
}

/// Create an alert rule
#[utoipa::path(
    post,
    path = "/api/alert-rules",
    tag = "alerts",
    request_body = AlertRuleRequest,
    responses(
        (status = 200, description = "Rule created", body = AlertRule),
        (status = 400, description = "Invalid rule")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<AlertRuleRequest>,
) -> AppResult<Json<AlertRule>> {
    auth.require(Permission::Edit)?;
    req.validate().map_err(|e| AppError::bad_request(&e))?;

    let rule = req.into_rule(None);
    state.db.create_alert_rule(&rule).await?;

    info!(rule_id = %rule.id, name = %rule.name, "Created alert rule");
    let _ = state.event_tx.send(Event::AlertRulesChanged);
    Ok(Json(rule))
}

/// Replace an alert rule
#[utoipa::path(
    put,
    path = "/api/alert-rules/{id}",
    tag = "alerts",
    params(("id" = String, Path, description = "Rule ID")),
    request_body = AlertRuleRequest,
    responses(
        (status = 200, description = "Rule updated", body = AlertRule),
        (status = 400, description = "Invalid rule"),
        (status = 404, description = "Rule not found")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<AlertRuleRequest>,
) -> AppResult<Json<AlertRule>> {
    auth.require(Permission::Edit)?;
    req.validate().map_err(|e| AppError::bad_request(&e))?;

    let rule = req.into_rule(Some(id.clone()));
    if !state.db.update_alert_rule(&rule).await? {
        return Err(rule_not_found(&id));
    }

    let _ = state.event_tx.send(Event::AlertRulesChanged);
    Ok(Json(rule))
}

/// Flip a rule between enabled and disabled
#[utoipa::path(
    post,
    path = "/api/alert-rules/{id}/toggle",
    tag = "alerts",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Rule toggled", body = AlertRule),
        (status = 404, description = "Rule not found")
    )
)]
pub async fn toggle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<AlertRule>> {
    auth.require(Permission::Edit)?;

    let rule = state
        .db
        .toggle_alert_rule(&id)
        .await?
        .ok_or_else(|| rule_not_found(&id))?;

    info!(rule_id = %rule.id, enabled = rule.enabled, "Toggled alert rule");
    let _ = state.event_tx.send(Event::AlertRulesChanged);
    Ok(Json(rule))
}

/// Delete an alert rule
#[utoipa::path(
    delete,
    path = "/api/alert-rules/{id}",
    tag = "alerts",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Rule deleted"),
        (status = 403, description = "Delete permission required"),
        (status = 404, description = "Rule not found")
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    auth.require(Permission::Delete)?;

    if !state.db.delete_alert_rule(&id).await? {
        return Err(rule_not_found(&id));
    }

    let _ = state.event_tx.send(Event::AlertRulesChanged);
    Ok(ApiResponse::ok())
}
