// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::Actor;
use shared_models::error::AppError;

use crate::models::{
    AppointmentSearchQuery, CancelAppointmentRequest, CompleteAppointmentRequest,
    CreateAppointmentRequest, FilterQuery, ScheduleAppointmentRequest, StatusFilter,
    UpdateNotesRequest,
};
use crate::services::booking::AppointmentBookingService;

/// Shared state for the appointment routes.
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: AppointmentBookingService,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>, booking: AppointmentBookingService) -> Self {
        Self { config, booking }
    }
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentListParams {
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AppointmentListParams {
    fn split(self) -> (AppointmentSearchQuery, FilterQuery) {
        let scope = AppointmentSearchQuery {
            from_date: self.from_date,
            to_date: self.to_date,
            limit: self.limit,
            offset: self.offset,
            ..AppointmentSearchQuery::default()
        };
        let filter = FilterQuery::new(self.search.unwrap_or_default(), self.status.unwrap_or_default());
        (scope, filter)
    }
}

// ==============================================================================
// INTAKE AND QUERIES
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    Json(mut request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    request.patient_id.get_or_insert(actor.actor_id);

    let appointment = state.booking.book_appointment(actor, request).await?;
    let view = state.booking.projector().project(&appointment, actor.role);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": view,
            "message": "Appointment requested successfully"
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    Query(params): Query<AppointmentListParams>,
) -> Result<Json<Value>, AppError> {
    let (scope, filter) = params.split();
    let appointments = state.booking.list_appointments(actor, scope, &filter).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_stats(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let stats = state.booking.get_stats(actor).await?;
    Ok(Json(json!(stats)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let view = state.booking.view_appointment(actor, appointment_id).await?;
    Ok(Json(json!(view)))
}

// ==============================================================================
// LIFECYCLE COMMANDS
// ==============================================================================

fn transition_response(
    state: &AppointmentState,
    actor: Actor,
    appointment: &crate::models::Appointment,
    message: &str,
) -> Json<Value> {
    Json(json!({
        "success": true,
        "appointment": state.booking.projector().project(appointment, actor.role),
        "message": message
    }))
}

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .schedule_appointment(
            actor,
            appointment_id,
            request.expected_version,
            request.scheduled_date.as_deref(),
            request.scheduled_time.as_deref(),
            request.doctor_display_name,
        )
        .await?;

    Ok(transition_response(&state, actor, &appointment, "Appointment scheduled"))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .reschedule_appointment(
            actor,
            appointment_id,
            request.expected_version,
            request.scheduled_date.as_deref(),
            request.scheduled_time.as_deref(),
        )
        .await?;

    Ok(transition_response(&state, actor, &appointment, "Appointment rescheduled"))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .complete_appointment(actor, appointment_id, request.expected_version, request.doctor_notes)
        .await?;

    Ok(transition_response(&state, actor, &appointment, "Appointment completed"))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .cancel_appointment(actor, appointment_id, request.expected_version, request.reason)
        .await?;

    Ok(transition_response(&state, actor, &appointment, "Appointment cancelled"))
}

#[axum::debug_handler]
pub async fn update_notes(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .update_notes(actor, appointment_id, request.expected_version, &request.notes)
        .await?;

    Ok(transition_response(&state, actor, &appointment, "Notes updated"))
}
