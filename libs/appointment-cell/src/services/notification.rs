use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::models::AppointmentStatus;

/// Trigger point for status-change notifications. Delivery is someone
/// else's concern; errors here never undo a committed transition.
#[async_trait]
pub trait AppointmentNotifier: Send + Sync {
    async fn status_changed(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<(), String>;
}

/// Default notifier: emits a structured event and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl AppointmentNotifier for TracingNotifier {
    async fn status_changed(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<(), String> {
        info!(%appointment_id, status = %new_status, "appointment status notification");
        Ok(())
    }
}

pub(crate) fn should_notify(status: AppointmentStatus) -> bool {
    matches!(status, AppointmentStatus::Scheduled | AppointmentStatus::Cancelled)
}
