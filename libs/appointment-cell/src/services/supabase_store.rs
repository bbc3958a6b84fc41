// libs/appointment-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentPatch, AppointmentSearchQuery, AppointmentStatus, NewAppointment,
};
use crate::services::clock::{Clock, SystemClock};
use crate::services::store::{check_writable, AppointmentStore};

const TABLE_PATH: &str = "/rest/v1/appointments";
const RETURN_REPRESENTATION: &str = "return=representation";

/// PostgREST-backed store. Conditional writes are expressed as row filters
/// (`id`, `version`, non-terminal `status`) on a single PATCH; the
/// `appointments_active_meeting_reference` unique index turns reference
/// collisions into HTTP 409.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    clock: Arc<dyn Clock>,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), Arc::new(SystemClock))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, clock: Arc<dyn Clock>) -> Self {
        Self { supabase, clock }
    }

    fn first_row(rows: Vec<Appointment>, id: Uuid) -> Result<Appointment, AppointmentError> {
        rows.into_iter().next().ok_or(AppointmentError::NotFound(id))
    }

    fn list_path(query: &AppointmentSearchQuery) -> String {
        let mut params = vec!["select=*".to_string()];

        if let Some(patient_id) = query.patient_id {
            params.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = query.doctor_id {
            if query.include_unassigned {
                params.push(format!("or=(doctor_id.eq.{},doctor_id.is.null)", doctor_id));
            } else {
                params.push(format!("doctor_id=eq.{}", doctor_id));
            }
        }
        if let Some(status) = query.status {
            params.push(format!("status=eq.{}", status));
        }
        if let Some(from) = query.from_date {
            params.push(format!("requested_date=gte.{}", from));
        }
        if let Some(to) = query.to_date {
            params.push(format!("requested_date=lte.{}", to));
        }

        params.push("order=requested_date.asc,created_at.asc,id.asc".to_string());

        if let Some(limit) = query.limit {
            params.push(format!("limit={}", limit));
        }
        if let Some(offset) = query.offset {
            params.push(format!("offset={}", offset));
        }

        format!("{}?{}", TABLE_PATH, params.join("&"))
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create(&self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        let now = self.clock.now();
        let id = Uuid::new_v4();

        let body = json!({
            "id": id,
            "patient_id": new.patient_id,
            "doctor_id": new.doctor_id,
            "requested_date": new.requested_date,
            "requested_time": new.requested_time,
            "status": AppointmentStatus::Pending,
            "appointment_type": new.appointment_type,
            "patient_display_name": new.patient_display_name,
            "doctor_display_name": new.doctor_display_name,
            "patient_demographics": new.patient_demographics,
            "notes": new.notes,
            "created_at": now,
            "updated_at": now,
            "version": 1
        });

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_prefer(Method::POST, TABLE_PATH, None, Some(body), Some(RETURN_REPRESENTATION))
            .await?;

        let appointment = Self::first_row(rows, id)?;
        info!("Created appointment {} for patient {}", appointment.id, appointment.patient_id);
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}&select=*", TABLE_PATH, id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Self::first_row(rows, id)
    }

    async fn update(
        &self,
        id: Uuid,
        expected_version: u64,
        patch: AppointmentPatch,
    ) -> Result<Appointment, AppointmentError> {
        let mut body = serde_json::to_value(&patch)
            .map_err(|e| AppointmentError::Storage(format!("could not encode patch: {}", e)))?;
        if let Value::Object(fields) = &mut body {
            fields.insert("version".to_string(), json!(expected_version + 1));
            fields.insert("updated_at".to_string(), json!(self.clock.now()));
        }

        let path = format!(
            "{}?id=eq.{}&version=eq.{}&status=in.(pending,scheduled)",
            TABLE_PATH, id, expected_version
        );

        let result: Result<Vec<Appointment>, DatabaseError> = self
            .supabase
            .request_with_prefer(Method::PATCH, &path, None, Some(body), Some(RETURN_REPRESENTATION))
            .await;

        let rows = match result {
            Ok(rows) => rows,
            Err(DatabaseError::Conflict(message)) => {
                warn!("Meeting reference rejected by unique index for {}: {}", id, message);
                return Err(AppointmentError::MeetingReferenceTaken);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(updated) = rows.into_iter().next() {
            debug!("Appointment {} now at version {}", id, updated.version);
            return Ok(updated);
        }

        // Nothing matched: work out whether the row is gone, moved on, or terminal.
        let current = self.get(id).await?;
        check_writable(&current, expected_version, &patch)?;
        Err(AppointmentError::Conflict {
            expected: expected_version,
            actual: current.version,
        })
    }

    async fn list(&self, query: &AppointmentSearchQuery) -> Result<Vec<Appointment>, AppointmentError> {
        let path = Self::list_path(query);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn doctor_listing_includes_unclaimed_rows() {
        let doctor_id = Uuid::nil();
        let path = SupabaseAppointmentStore::list_path(&AppointmentSearchQuery {
            doctor_id: Some(doctor_id),
            include_unassigned: true,
            from_date: NaiveDate::from_ymd_opt(2025, 5, 1),
            limit: Some(10),
            ..Default::default()
        });

        assert!(path.starts_with("/rest/v1/appointments?select=*"));
        assert!(path.contains(&format!("or=(doctor_id.eq.{},doctor_id.is.null)", doctor_id)));
        assert!(path.contains("requested_date=gte.2025-05-01"));
        assert!(path.contains("order=requested_date.asc,created_at.asc,id.asc"));
        assert!(path.ends_with("limit=10"));
    }
}
