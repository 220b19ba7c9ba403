use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use super::error::ApiError;
use super::extractors::Caller;
use super::requests::{ClassifyRequest, CreateTicketRequest, ListTicketsParams, UpdateTicketRequest};
use super::AppState;
use crate::models::{ClassificationResult, Ticket, TicketStats};

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<ListTicketsParams>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let filter = params.into_filter()?;
    let tickets = state.db()?.list_tickets(&filter)?;
    Ok(Json(tickets))
}

/// The classifier's category and priority are advisory; only its
/// acknowledgement text is stored with the ticket.
pub async fn create_ticket(
    State(state): State<AppState>,
    payload: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let Json(body) = payload?;
    let mut new_ticket = body.validate()?;

    let suggestion = state.classifier().classify(&new_ticket.description).await;
    new_ticket.ai_response = Some(suggestion.ai_response);

    let ticket = state.db()?.create_ticket(&new_ticket)?;
    info!(
        id = ticket.id,
        category = %ticket.category,
        priority = %ticket.priority,
        "Created ticket"
    );
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn retrieve_ticket(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let id = ticket_id(path)?;
    let ticket = state.db()?.get_ticket(id)?.ok_or_else(|| not_found(id))?;
    Ok(Json(ticket))
}

/// Privilege is checked before the id or the body is looked at.
pub async fn update_ticket(
    State(state): State<AppState>,
    caller: Caller,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateTicketRequest>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    caller.require_privileged()?;
    let id = ticket_id(path)?;
    let Json(body) = payload?;
    let update = body.validate()?;

    let ticket = state
        .db()?
        .update_ticket(id, &update)?
        .ok_or_else(|| not_found(id))?;

    info!(id, status = %ticket.status, "Updated ticket");
    Ok(Json(ticket))
}

pub async fn ticket_stats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<TicketStats>, ApiError> {
    caller.require_privileged()?;
    let stats = state.db()?.ticket_stats()?;
    Ok(Json(stats))
}

pub async fn classify_ticket(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let Json(body) = payload?;
    let description = body.validate()?;
    Ok(Json(state.classifier().classify(&description).await))
}

// A non-numeric id names no ticket.
fn ticket_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("Ticket not found".to_string()))
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Ticket #{} not found", id))
}
