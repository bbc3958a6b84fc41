use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentPatch, AppointmentSearchQuery, AppointmentStatus, NewAppointment,
};
use crate::services::clock::{Clock, SystemClock};

/// Persistence contract for appointments. There is no delete: terminal
/// records are kept read-only.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Persists a validated request as `Pending`, version 1.
    async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError>;

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError>;

    /// Conditional write. Applies `patch` only when the stored version equals
    /// `expected_version`, bumping version and `updated_at`. A meeting
    /// reference already held by another scheduled record fails with
    /// [`AppointmentError::MeetingReferenceTaken`] and writes nothing.
    async fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        patch: AppointmentPatch,
    ) -> Result<Appointment, AppointmentError>;

    /// Snapshot ordered by requested date, then creation time.
    async fn list(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError>;
}

/// Checks shared by every backend before a patch is written.
pub(crate) fn check_writable(
    current: &Appointment,
    expected_version: u64,
    patch: &AppointmentPatch,
) -> Result<(), AppointmentError> {
    if current.version != expected_version {
        return Err(AppointmentError::Conflict {
            expected: expected_version,
            actual: current.version,
        });
    }

    if current.is_terminal() {
        return Err(AppointmentError::InvalidTransition {
            from: current.status,
            to: patch.status.unwrap_or(current.status),
        });
    }

    Ok(())
}

pub(crate) fn paginate(
    appointments: Vec<Appointment>,
    query: &AppointmentSearchQuery,
) -> Vec<Appointment> {
    let offset = query.offset.unwrap_or(0);
    let iter = appointments.into_iter().skip(offset);
    match query.limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

struct StoredAppointment {
    sequence: u64,
    appointment: Appointment,
}

#[derive(Default)]
struct StoreState {
    records: HashMap<Uuid, StoredAppointment>,
    next_sequence: u64,
}

/// Process-local store. One write lock covers the version compare, the
/// meeting-reference uniqueness check and the write itself.
pub struct InMemoryAppointmentStore {
    state: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryAppointmentStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryAppointmentStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            requested_date: new.requested_date,
            requested_time: new.requested_time,
            scheduled_date: None,
            scheduled_time: None,
            status: AppointmentStatus::Pending,
            meeting_reference: None,
            appointment_type: new.appointment_type,
            patient_display_name: new.patient_display_name,
            doctor_display_name: new.doctor_display_name,
            patient_demographics: new.patient_demographics,
            notes: new.notes,
            doctor_notes: None,
            cancellation_reason: None,
            cancelled_by: None,
            cancelled_by_actor: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        let mut state = self.state.write().await;
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.records.insert(
            appointment.id,
            StoredAppointment {
                sequence,
                appointment: appointment.clone(),
            },
        );

        info!("Created appointment {} for patient {}", appointment.id, appointment.patient_id);
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.state
            .read()
            .await
            .records
            .get(&id)
            .map(|stored| stored.appointment.clone())
            .ok_or(AppointmentError::NotFound(id))
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        patch: AppointmentPatch,
    ) -> Result<Appointment, AppointmentError> {
        let mut state = self.state.write().await;

        let current = state
            .records
            .get(&id)
            .map(|stored| &stored.appointment)
            .ok_or(AppointmentError::NotFound(id))?;

        if let Err(err) = check_writable(current, expected_version, &patch) {
            debug!("Rejected write to appointment {}: {}", id, err);
            return Err(err);
        }

        let mut next = current.clone();
        patch.apply_to(&mut next);

        if next.status == AppointmentStatus::Scheduled {
            if let Some(reference) = patch.meeting_reference.as_deref() {
                let taken = state.records.values().any(|other| {
                    other.appointment.id != id
                        && other.appointment.status == AppointmentStatus::Scheduled
                        && other.appointment.meeting_reference.as_deref() == Some(reference)
                });
                if taken {
                    warn!("Meeting reference collision while updating appointment {}", id);
                    return Err(AppointmentError::MeetingReferenceTaken);
                }
            }
        }

        next.version = expected_version + 1;
        next.updated_at = self.clock.now().max(next.updated_at);

        if let Some(stored) = state.records.get_mut(&id) {
            stored.appointment = next.clone();
        }

        debug!("Appointment {} now at version {} ({})", id, next.version, next.status);
        Ok(next)
    }

    async fn list(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let mut selected: Vec<(u64, Appointment)> = {
            let state = self.state.read().await;
            state
                .records
                .values()
                .filter(|stored| query.matches(&stored.appointment))
                .map(|stored| (stored.sequence, stored.appointment.clone()))
                .collect()
        };

        selected.sort_by(|(seq_a, a), (seq_b, b)| {
            a.requested_date
                .cmp(&b.requested_date)
                .then(a.created_at.cmp(&b.created_at))
                .then(seq_a.cmp(seq_b))
        });

        Ok(paginate(selected.into_iter().map(|(_, a)| a).collect(), query))
    }
}
