// libs/appointment-cell/src/services/meeting.rs
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::AppointmentError;

/// 128 bits from the OS CSPRNG per reference.
const TOKEN_BYTES: usize = 16;

/// Issues meeting references for scheduled appointments.
///
/// Not idempotent: every call yields a fresh reference. Callers that need the
/// current reference read it from the stored appointment.
pub trait MeetingLinkGenerator: Send + Sync {
    fn generate(&self, appointment_id: Uuid) -> Result<String, AppointmentError>;
}

pub struct SecureMeetingLinkGenerator {
    base_url: String,
}

impl SecureMeetingLinkGenerator {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.meeting_base_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl MeetingLinkGenerator for SecureMeetingLinkGenerator {
    fn generate(&self, appointment_id: Uuid) -> Result<String, AppointmentError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            AppointmentError::Storage(format!("random source unavailable: {}", e))
        })?;

        let token = URL_SAFE_NO_PAD.encode(bytes);
        debug!("Issued meeting reference for appointment {}", appointment_id);

        Ok(format!("{}/room/{}", self.base_url, token))
    }
}
