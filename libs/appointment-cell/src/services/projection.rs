// libs/appointment-cell/src/services/projection.rs
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use shared_models::auth::Role;

use crate::models::{Appointment, AppointmentStatus, AppointmentType, PatientDemographics};
use crate::services::filter::StatusVocabulary;
use crate::services::lifecycle::{AppointmentAction, AppointmentLifecycleService};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientAppointmentView {
    pub id: Uuid,
    pub status: AppointmentStatus,
    pub display_status: String,
    pub doctor_id: Option<Uuid>,
    pub doctor_name: Option<String>,
    pub appointment_type: Option<AppointmentType>,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    /// Only while the appointment is scheduled.
    pub meeting_reference: Option<String>,
    pub notes: Option<String>,
    pub available_actions: Vec<AppointmentAction>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorAppointmentView {
    pub id: Uuid,
    pub status: AppointmentStatus,
    pub display_status: String,
    pub patient_id: Uuid,
    pub patient_name: Option<String>,
    pub demographics: Option<PatientDemographics>,
    pub appointment_type: Option<AppointmentType>,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub meeting_reference: Option<String>,
    pub notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub available_actions: Vec<AppointmentAction>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AppointmentView {
    Patient(PatientAppointmentView),
    Doctor(DoctorAppointmentView),
}

impl AppointmentView {
    pub fn id(&self) -> Uuid {
        match self {
            AppointmentView::Patient(view) => view.id,
            AppointmentView::Doctor(view) => view.id,
        }
    }

    pub fn available_actions(&self) -> &[AppointmentAction] {
        match self {
            AppointmentView::Patient(view) => &view.available_actions,
            AppointmentView::Doctor(view) => &view.available_actions,
        }
    }
}

/// Shapes an appointment for the party looking at it.
pub struct RoleViewProjector {
    lifecycle: AppointmentLifecycleService,
    vocabulary: StatusVocabulary,
}

impl Default for RoleViewProjector {
    fn default() -> Self {
        Self::new(StatusVocabulary::default())
    }
}

impl RoleViewProjector {
    pub fn new(vocabulary: StatusVocabulary) -> Self {
        Self {
            lifecycle: AppointmentLifecycleService::new(),
            vocabulary,
        }
    }

    pub fn project(&self, appointment: &Appointment, role: Role) -> AppointmentView {
        let available_actions = self.lifecycle.available_actions(appointment.status, role);
        let display_status = self
            .vocabulary
            .label(role, appointment.status)
            .map(str::to_string)
            .unwrap_or_else(|| appointment.status.to_string());

        match role {
            Role::Patient => AppointmentView::Patient(PatientAppointmentView {
                id: appointment.id,
                status: appointment.status,
                display_status,
                doctor_id: appointment.doctor_id,
                doctor_name: appointment.doctor_display_name.clone(),
                appointment_type: appointment.appointment_type,
                requested_date: appointment.requested_date,
                requested_time: appointment.requested_time,
                scheduled_date: appointment.scheduled_date,
                scheduled_time: appointment.scheduled_time,
                meeting_reference: if appointment.status == AppointmentStatus::Scheduled {
                    appointment.meeting_reference.clone()
                } else {
                    None
                },
                notes: appointment.notes.clone(),
                available_actions,
                version: appointment.version,
            }),
            Role::Doctor => AppointmentView::Doctor(DoctorAppointmentView {
                id: appointment.id,
                status: appointment.status,
                display_status,
                patient_id: appointment.patient_id,
                patient_name: appointment.patient_display_name.clone(),
                demographics: appointment.patient_demographics.clone(),
                appointment_type: appointment.appointment_type,
                requested_date: appointment.requested_date,
                requested_time: appointment.requested_time,
                scheduled_date: appointment.scheduled_date,
                scheduled_time: appointment.scheduled_time,
                meeting_reference: appointment.meeting_reference.clone(),
                notes: appointment.notes.clone(),
                doctor_notes: appointment.doctor_notes.clone(),
                cancellation_reason: appointment.cancellation_reason.clone(),
                available_actions,
                version: appointment.version,
            }),
        }
    }

    pub fn project_all(&self, appointments: &[Appointment], role: Role) -> Vec<AppointmentView> {
        appointments
            .iter()
            .map(|appointment| self.project(appointment, role))
            .collect()
    }
}
