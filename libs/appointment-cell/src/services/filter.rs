// libs/appointment-cell/src/services/filter.rs
use std::collections::HashMap;

use tracing::debug;

use shared_models::auth::Role;

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentStatus, FilterQuery, StatusFilter};

/// Per-role status vocabulary: which statuses a role may filter by, and the
/// label that role sees for each. Order is display order.
#[derive(Debug, Clone)]
pub struct StatusVocabulary {
    entries: HashMap<Role, Vec<(AppointmentStatus, String)>>,
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self::new()
            .with_role(
                Role::Patient,
                [
                    (AppointmentStatus::Pending, "Requested"),
                    (AppointmentStatus::Scheduled, "Confirmed"),
                    (AppointmentStatus::Completed, "Completed"),
                    (AppointmentStatus::Cancelled, "Cancelled"),
                ],
            )
            .with_role(
                Role::Doctor,
                [
                    (AppointmentStatus::Pending, "Pending"),
                    (AppointmentStatus::Scheduled, "Scheduled"),
                    (AppointmentStatus::Completed, "Completed"),
                    (AppointmentStatus::Cancelled, "Cancelled"),
                ],
            )
    }
}

impl StatusVocabulary {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_role<L: Into<String>>(
        mut self,
        role: Role,
        statuses: impl IntoIterator<Item = (AppointmentStatus, L)>,
    ) -> Self {
        self.entries.insert(
            role,
            statuses.into_iter().map(|(status, label)| (status, label.into())).collect(),
        );
        self
    }

    pub fn allows(&self, role: Role, status: AppointmentStatus) -> bool {
        self.label(role, status).is_some()
    }

    pub fn label(&self, role: Role, status: AppointmentStatus) -> Option<&str> {
        self.entries
            .get(&role)?
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map(|(_, label)| label.as_str())
    }
}

/// Search and status filtering over appointment snapshots.
pub struct AppointmentFilterService {
    vocabulary: StatusVocabulary,
}

impl Default for AppointmentFilterService {
    fn default() -> Self {
        Self::new(StatusVocabulary::default())
    }
}

impl AppointmentFilterService {
    pub fn new(vocabulary: StatusVocabulary) -> Self {
        Self { vocabulary }
    }

    /// Keeps appointments matching both the search text and the status
    /// filter, in their original order.
    pub fn filter(
        &self,
        appointments: Vec<Appointment>,
        role: Role,
        query: &FilterQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if let StatusFilter::Only(status) = query.status {
            if !self.vocabulary.allows(role, status) {
                return Err(AppointmentError::Validation(format!(
                    "status '{}' is not available to a {}",
                    status, role
                )));
            }
        }

        let needle = query.search.trim().to_lowercase();
        let before = appointments.len();

        let kept: Vec<Appointment> = appointments
            .into_iter()
            .filter(|appointment| query.status.admits(appointment.status))
            .filter(|appointment| needle.is_empty() || matches_search(appointment, role, &needle))
            .collect();

        debug!("Filter kept {} of {} appointments for {}", kept.len(), before, role);
        Ok(kept)
    }
}

/// `needle` must already be lowercased.
fn matches_search(appointment: &Appointment, role: Role, needle: &str) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);

    appointment.counterpart_name(role).map_or(false, contains)
        || appointment.appointment_type.map_or(false, |kind| {
            contains(&kind.to_string()) || contains(kind.label())
        })
        || appointment.notes.as_deref().map_or(false, contains)
}
