// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::Role;

// ==============================================================================
// CORE APPOINTMENT MODEL
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub status: AppointmentStatus,
    pub meeting_reference: Option<String>,
    pub appointment_type: Option<AppointmentType>,
    pub patient_display_name: Option<String>,
    pub doctor_display_name: Option<String>,
    pub patient_demographics: Option<PatientDemographics>,
    pub notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Role>,
    /// Who cancelled or declined, when known.
    #[serde(default)]
    pub cancelled_by_actor: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Appointment {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_unassigned(&self) -> bool {
        self.doctor_id.is_none()
    }

    /// Whether `actor_id` is one of the two parties, for the given role.
    pub fn involves(&self, actor_id: Uuid, role: Role) -> bool {
        match role {
            Role::Patient => self.patient_id == actor_id,
            Role::Doctor => self.doctor_id == Some(actor_id),
        }
    }

    /// Display name of the other party, seen from `role`.
    pub fn counterpart_name(&self, role: Role) -> Option<&str> {
        match role {
            Role::Patient => self.doctor_display_name.as_deref(),
            Role::Doctor => self.patient_display_name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDemographics {
    pub age: Option<u32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AppointmentType {
    #[serde(alias = "initial_consultation", alias = "initial", alias = "new_patient")]
    InitialConsultation,

    #[serde(alias = "follow_up", alias = "followup")]
    FollowUp,

    #[serde(alias = "emergency", alias = "urgent")]
    Emergency,

    #[serde(alias = "prescription", alias = "prescription_renewal")]
    Prescription,

    #[serde(alias = "specialty_consultation", alias = "specialist")]
    SpecialtyConsultation,

    #[serde(alias = "general_consultation", alias = "general", alias = "consultation")]
    GeneralConsultation,

    #[serde(alias = "mental_health", alias = "psychology", alias = "psychiatry")]
    MentalHealth,

    #[serde(alias = "womens_health", alias = "gynecology")]
    WomensHealth,
}

impl AppointmentType {
    /// Human-readable label, also matched by free-text search.
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentType::InitialConsultation => "Initial consultation",
            AppointmentType::FollowUp => "Follow up",
            AppointmentType::Emergency => "Emergency",
            AppointmentType::Prescription => "Prescription",
            AppointmentType::SpecialtyConsultation => "Specialty consultation",
            AppointmentType::GeneralConsultation => "General consultation",
            AppointmentType::MentalHealth => "Mental health",
            AppointmentType::WomensHealth => "Women's health",
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::InitialConsultation => write!(f, "InitialConsultation"),
            AppointmentType::FollowUp => write!(f, "FollowUp"),
            AppointmentType::Emergency => write!(f, "Emergency"),
            AppointmentType::Prescription => write!(f, "Prescription"),
            AppointmentType::SpecialtyConsultation => write!(f, "SpecialtyConsultation"),
            AppointmentType::GeneralConsultation => write!(f, "GeneralConsultation"),
            AppointmentType::MentalHealth => write!(f, "MentalHealth"),
            AppointmentType::WomensHealth => write!(f, "WomensHealth"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Intake form as submitted by the patient. Date and time stay textual until
/// validation so malformed input surfaces as a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub requested_date: Option<String>,
    pub requested_time: Option<String>,
    pub appointment_type: Option<AppointmentType>,
    pub notes: Option<String>,
    pub patient_display_name: Option<String>,
    pub doctor_display_name: Option<String>,
    pub patient_demographics: Option<PatientDemographics>,
}

/// A create request after validation; what the store persists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub appointment_type: Option<AppointmentType>,
    pub notes: Option<String>,
    pub patient_display_name: Option<String>,
    pub doctor_display_name: Option<String>,
    pub patient_demographics: Option<PatientDemographics>,
}

/// Mutable fields only. `None` leaves the stored value untouched; for
/// `notes`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_by_actor: Option<Uuid>,
}

impl AppointmentPatch {
    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(doctor_id) = self.doctor_id {
            appointment.doctor_id = Some(doctor_id);
        }
        if let Some(name) = &self.doctor_display_name {
            appointment.doctor_display_name = Some(name.clone());
        }
        if let Some(date) = self.scheduled_date {
            appointment.scheduled_date = Some(date);
        }
        if let Some(time) = self.scheduled_time {
            appointment.scheduled_time = Some(time);
        }
        if let Some(reference) = &self.meeting_reference {
            appointment.meeting_reference = Some(reference.clone());
        }
        if let Some(notes) = &self.notes {
            appointment.notes = notes.clone();
        }
        if let Some(doctor_notes) = &self.doctor_notes {
            appointment.doctor_notes = Some(doctor_notes.clone());
        }
        if let Some(reason) = &self.cancellation_reason {
            appointment.cancellation_reason = Some(reason.clone());
        }
        if let Some(role) = self.cancelled_by {
            appointment.cancelled_by = Some(role);
        }
        if let Some(actor_id) = self.cancelled_by_actor {
            appointment.cancelled_by_actor = Some(actor_id);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAppointmentRequest {
    pub expected_version: u64,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub doctor_display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub expected_version: u64,
    pub doctor_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub expected_version: u64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNotesRequest {
    pub expected_version: u64,
    pub notes: String,
}

/// A lifecycle command, independent of who issues it.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionCommand {
    Schedule {
        date: NaiveDate,
        time: NaiveTime,
        doctor_name: Option<String>,
    },
    Reschedule { date: NaiveDate, time: NaiveTime },
    Complete { doctor_notes: Option<String> },
    Cancel { reason: Option<String> },
}

impl TransitionCommand {
    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            TransitionCommand::Schedule { .. } | TransitionCommand::Reschedule { .. } => {
                AppointmentStatus::Scheduled
            }
            TransitionCommand::Complete { .. } => AppointmentStatus::Completed,
            TransitionCommand::Cancel { .. } => AppointmentStatus::Cancelled,
        }
    }

    pub fn slot(&self) -> Option<(NaiveDate, NaiveTime)> {
        match self {
            TransitionCommand::Schedule { date, time, .. }
            | TransitionCommand::Reschedule { date, time } => Some((*date, *time)),
            _ => None,
        }
    }
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

/// Store-level selection; applied before presentation filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    /// With `doctor_id`, also match requests no doctor has claimed yet.
    #[serde(default)]
    pub include_unassigned: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AppointmentSearchQuery {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.doctor_id.map_or(true, |id| {
                appointment.doctor_id == Some(id)
                    || (self.include_unassigned && appointment.doctor_id.is_none())
            })
            && self.status.map_or(true, |status| appointment.status == status)
            && self.from_date.map_or(true, |from| appointment.requested_date >= from)
            && self.to_date.map_or(true, |to| appointment.requested_date <= to)
    }
}

/// `All`, or one literal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AppointmentStatus),
}

impl StatusFilter {
    pub fn admits(&self, status: AppointmentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

impl Serialize for StatusFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatusFilter::All => serializer.serialize_str("All"),
            StatusFilter::Only(status) => serializer.serialize_str(&status.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: StatusFilter,
}

impl FilterQuery {
    pub fn new(search: impl Into<String>, status: StatusFilter) -> Self {
        Self { search: search.into(), status }
    }
}

// ==============================================================================
// STATISTICS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentStats {
    pub total_appointments: usize,
    pub pending_appointments: usize,
    pub scheduled_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
}

impl AppointmentStats {
    pub fn from_appointments<'a>(appointments: impl IntoIterator<Item = &'a Appointment>) -> Self {
        appointments.into_iter().fold(Self::default(), |mut stats, appointment| {
            stats.total_appointments += 1;
            match appointment.status {
                AppointmentStatus::Pending => stats.pending_appointments += 1,
                AppointmentStatus::Scheduled => stats.scheduled_appointments += 1,
                AppointmentStatus::Completed => stats.completed_appointments += 1,
                AppointmentStatus::Cancelled => stats.cancelled_appointments += 1,
            }
            stats
        })
    }
}

// ==============================================================================
// VALIDATION RULES
// ==============================================================================

#[derive(Debug, Clone)]
pub struct AppointmentValidationRules {
    pub max_notes_length: usize,
    pub max_generation_attempts: u32,
}

impl Default for AppointmentValidationRules {
    fn default() -> Self {
        Self {
            max_notes_length: 2000,
            max_generation_attempts: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parses_sentinel_and_literals() {
        assert_eq!("All".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(
            "Scheduled".parse::<StatusFilter>(),
            Ok(StatusFilter::Only(AppointmentStatus::Scheduled))
        );
        assert!("confirmed".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn appointment_type_accepts_legacy_aliases() {
        let parsed: AppointmentType = serde_json::from_str("\"follow_up\"").unwrap();
        assert_eq!(parsed, AppointmentType::FollowUp);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"FollowUp\"");
    }

    #[test]
    fn terminal_statuses() {
        let terminal: Vec<_> = AppointmentStatus::ALL
            .iter()
            .filter(|status| status.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&AppointmentStatus::Completed, &AppointmentStatus::Cancelled]);
    }
}
