// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Actor, Role};

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentPatch, AppointmentSearchQuery, AppointmentStats, AppointmentStatus,
    AppointmentValidationRules, CreateAppointmentRequest, FilterQuery, TransitionCommand,
};
use crate::services::clock::{Clock, SystemClock};
use crate::services::filter::{AppointmentFilterService, StatusVocabulary};
use crate::services::lifecycle::{AppointmentLifecycleService, MeetingEffect, TransitionRule};
use crate::services::meeting::{MeetingLinkGenerator, SecureMeetingLinkGenerator};
use crate::services::notification::{should_notify, AppointmentNotifier, TracingNotifier};
use crate::services::projection::{AppointmentView, RoleViewProjector};
use crate::services::store::{paginate, AppointmentStore};
use crate::services::validation::{parse_future_slot, validate_notes};

/// Entry point for every appointment command and query. Collaborators are
/// injected so each can be swapped independently.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    meeting_links: Arc<dyn MeetingLinkGenerator>,
    notifier: Arc<dyn AppointmentNotifier>,
    clock: Arc<dyn Clock>,
    lifecycle_service: AppointmentLifecycleService,
    filter_service: AppointmentFilterService,
    projector: RoleViewProjector,
    validation_rules: AppointmentValidationRules,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig, store: Arc<dyn AppointmentStore>) -> Self {
        let validation_rules = AppointmentValidationRules {
            max_generation_attempts: config.meeting_generation_attempts.max(1),
            ..AppointmentValidationRules::default()
        };

        Self {
            store,
            meeting_links: Arc::new(SecureMeetingLinkGenerator::new(config)),
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
            lifecycle_service: AppointmentLifecycleService::new(),
            filter_service: AppointmentFilterService::default(),
            projector: RoleViewProjector::default(),
            validation_rules,
        }
    }

    pub fn with_meeting_links(mut self, meeting_links: Arc<dyn MeetingLinkGenerator>) -> Self {
        self.meeting_links = meeting_links;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AppointmentNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: StatusVocabulary) -> Self {
        self.filter_service = AppointmentFilterService::new(vocabulary.clone());
        self.projector = RoleViewProjector::new(vocabulary);
        self
    }

    pub fn with_validation_rules(mut self, rules: AppointmentValidationRules) -> Self {
        self.validation_rules = rules;
        self
    }

    pub fn projector(&self) -> &RoleViewProjector {
        &self.projector
    }

    // ==========================================================================
    // INTAKE
    // ==========================================================================

    /// Patient submits a new request. It starts `Pending` at version 1.
    #[instrument(skip(self, request), fields(actor = %actor.actor_id))]
    pub async fn book_appointment(
        &self,
        actor: Actor,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if actor.role != Role::Patient {
            return Err(AppointmentError::Forbidden(
                "only patients can request appointments".to_string(),
            ));
        }

        let new = request.validate(self.clock.now_naive(), &self.validation_rules)?;
        if new.patient_id != actor.actor_id {
            return Err(AppointmentError::Forbidden(
                "patients can only request appointments for themselves".to_string(),
            ));
        }

        let appointment = self.store.create(new).await?;
        info!(
            "Appointment {} requested for {} {}",
            appointment.id, appointment.requested_date, appointment.requested_time
        );
        Ok(appointment)
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get_appointment(&self, actor: Actor, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.load_for(&actor, id).await
    }

    /// Loads a record and refuses callers who are not a party to it, before
    /// anything about its state is revealed.
    async fn load_for(&self, actor: &Actor, id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.store.get(id).await?;
        authorize(actor, &appointment)?;
        Ok(appointment)
    }

    pub async fn view_appointment(&self, actor: Actor, id: Uuid) -> Result<AppointmentView, AppointmentError> {
        let appointment = self.get_appointment(actor, id).await?;
        Ok(self.projector.project(&appointment, actor.role))
    }

    /// Appointments visible to `actor`, narrowed by `scope` (dates, limit,
    /// offset) and then by the search/status `filter`, projected for the role.
    pub async fn list_appointments(
        &self,
        actor: Actor,
        scope: AppointmentSearchQuery,
        filter: &FilterQuery,
    ) -> Result<Vec<AppointmentView>, AppointmentError> {
        let visible = self.visible_appointments(actor, &scope).await?;
        let filtered = self.filter_service.filter(visible, actor.role, filter)?;
        let page = paginate(filtered, &scope);

        debug!("Listing {} appointments for {} {}", page.len(), actor.role, actor.actor_id);
        Ok(self.projector.project_all(&page, actor.role))
    }

    pub async fn get_stats(&self, actor: Actor) -> Result<AppointmentStats, AppointmentError> {
        let appointments = self
            .visible_appointments(actor, &AppointmentSearchQuery::default())
            .await?;
        Ok(AppointmentStats::from_appointments(&appointments))
    }

    async fn visible_appointments(
        &self,
        actor: Actor,
        scope: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let query = match actor.role {
            Role::Patient => AppointmentSearchQuery {
                patient_id: Some(actor.actor_id),
                doctor_id: None,
                include_unassigned: false,
                ..scope.clone()
            },
            Role::Doctor => AppointmentSearchQuery {
                patient_id: None,
                doctor_id: Some(actor.actor_id),
                include_unassigned: true,
                ..scope.clone()
            },
        };

        let query = AppointmentSearchQuery {
            limit: None,
            offset: None,
            ..query
        };

        let appointments = self.store.list(&query).await?;
        Ok(appointments
            .into_iter()
            .filter(|appointment| can_view(&actor, appointment))
            .collect())
    }

    // ==========================================================================
    // LIFECYCLE COMMANDS
    // ==========================================================================

    pub async fn schedule_appointment(
        &self,
        actor: Actor,
        id: Uuid,
        expected_version: u64,
        scheduled_date: Option<&str>,
        scheduled_time: Option<&str>,
        doctor_name: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load_for(&actor, id).await?;
        let (date, time) = self.parse_slot(scheduled_date, scheduled_time)?;
        self.apply(actor, current, expected_version, TransitionCommand::Schedule { date, time, doctor_name })
            .await
    }

    pub async fn reschedule_appointment(
        &self,
        actor: Actor,
        id: Uuid,
        expected_version: u64,
        scheduled_date: Option<&str>,
        scheduled_time: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load_for(&actor, id).await?;
        let (date, time) = self.parse_slot(scheduled_date, scheduled_time)?;
        self.apply(actor, current, expected_version, TransitionCommand::Reschedule { date, time })
            .await
    }

    fn parse_slot(
        &self,
        scheduled_date: Option<&str>,
        scheduled_time: Option<&str>,
    ) -> Result<(NaiveDate, NaiveTime), AppointmentError> {
        parse_future_slot(
            "scheduled_date",
            scheduled_date,
            "scheduled_time",
            scheduled_time,
            self.clock.now_naive(),
        )
    }

    pub async fn complete_appointment(
        &self,
        actor: Actor,
        id: Uuid,
        expected_version: u64,
        doctor_notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(actor, id, expected_version, TransitionCommand::Complete { doctor_notes })
            .await
    }

    pub async fn cancel_appointment(
        &self,
        actor: Actor,
        id: Uuid,
        expected_version: u64,
        reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        self.transition(actor, id, expected_version, TransitionCommand::Cancel { reason })
            .await
    }

    /// Patient edits their own notes while the request is still pending.
    pub async fn update_notes(
        &self,
        actor: Actor,
        id: Uuid,
        expected_version: u64,
        notes: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load_for(&actor, id).await?;
        if actor.role != Role::Patient {
            return Err(AppointmentError::Forbidden(
                "only the requesting patient can edit notes".to_string(),
            ));
        }
        ensure_version(&current, expected_version)?;

        if current.status != AppointmentStatus::Pending {
            return Err(AppointmentError::Validation(format!(
                "notes can only be edited while pending, appointment is {}",
                current.status
            )));
        }

        let patch = AppointmentPatch {
            notes: Some(validate_notes(Some(notes), &self.validation_rules)?),
            ..AppointmentPatch::default()
        };
        self.store.update(id, expected_version, patch).await
    }

    /// Validates and applies one lifecycle edge as a single conditional
    /// write. Status, slot and meeting reference land together or not at all.
    #[instrument(skip(self, command), fields(actor = %actor.actor_id, role = %actor.role))]
    pub async fn transition(
        &self,
        actor: Actor,
        id: Uuid,
        expected_version: u64,
        command: TransitionCommand,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load_for(&actor, id).await?;
        self.apply(actor, current, expected_version, command).await
    }

    async fn apply(
        &self,
        actor: Actor,
        current: Appointment,
        expected_version: u64,
        command: TransitionCommand,
    ) -> Result<Appointment, AppointmentError> {
        ensure_version(&current, expected_version)?;

        let rule = *self.lifecycle_service.validate_status_transition(
            current.status,
            command.target_status(),
            actor.role,
        )?;

        let patch = self.build_patch(&actor, &current, &rule, command)?;

        let updated = match rule.meeting_effect {
            MeetingEffect::Issue => self.commit_with_new_reference(&current, patch).await?,
            MeetingEffect::Keep => self.store.update(current.id, expected_version, patch).await?,
        };

        info!(
            "Appointment {} moved {} -> {} (version {})",
            current.id, current.status, updated.status, updated.version
        );

        if should_notify(updated.status) {
            self.notify(updated.id, updated.status);
        }

        Ok(updated)
    }

    /// Runs the notifier on its own task; the committed transition never
    /// waits on it.
    fn notify(&self, appointment_id: Uuid, status: AppointmentStatus) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.status_changed(appointment_id, status).await {
                warn!("Notification for appointment {} failed: {}", appointment_id, e);
            }
        });
    }

    fn build_patch(
        &self,
        actor: &Actor,
        current: &Appointment,
        rule: &TransitionRule,
        command: TransitionCommand,
    ) -> Result<AppointmentPatch, AppointmentError> {
        let mut patch = AppointmentPatch {
            status: Some(rule.to),
            ..AppointmentPatch::default()
        };

        if rule.requires_slot {
            let (date, time) = command.slot().ok_or_else(|| {
                AppointmentError::Validation("scheduled_date and scheduled_time are required".to_string())
            })?;
            if date.and_time(time) < self.clock.now_naive() {
                return Err(AppointmentError::Validation(format!("{} {} is in the past", date, time)));
            }
            patch.scheduled_date = Some(date);
            patch.scheduled_time = Some(time);
        }

        if current.is_unassigned() && actor.role == Role::Doctor && rule.to == AppointmentStatus::Scheduled {
            patch.doctor_id = Some(actor.actor_id);
        }

        match command {
            TransitionCommand::Schedule { doctor_name, .. } => {
                if current.doctor_display_name.is_none() {
                    patch.doctor_display_name = doctor_name.filter(|name| !name.trim().is_empty());
                }
            }
            TransitionCommand::Complete { doctor_notes } => {
                patch.doctor_notes = validate_notes(doctor_notes.as_deref(), &self.validation_rules)?;
            }
            TransitionCommand::Cancel { reason } => {
                patch.cancellation_reason = reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty());
                patch.cancelled_by = Some(actor.role);
                patch.cancelled_by_actor = Some(actor.actor_id);
            }
            TransitionCommand::Reschedule { .. } => {}
        }

        Ok(patch)
    }

    /// Tries fresh references until one is accepted by the store's
    /// uniqueness check or the attempt budget runs out.
    async fn commit_with_new_reference(
        &self,
        current: &Appointment,
        mut patch: AppointmentPatch,
    ) -> Result<Appointment, AppointmentError> {
        let attempts = self.validation_rules.max_generation_attempts.max(1);

        for attempt in 1..=attempts {
            let reference = match self.meeting_links.generate(current.id) {
                Ok(reference) => reference,
                Err(e) => {
                    warn!("Meeting link generation failed for {}: {}", current.id, e);
                    return Err(AppointmentError::Generation { attempts: attempt });
                }
            };

            if reference.trim().is_empty() || current.meeting_reference.as_deref() == Some(reference.as_str()) {
                warn!("Discarding unusable meeting reference (attempt {}/{})", attempt, attempts);
                continue;
            }

            patch.meeting_reference = Some(reference);
            match self.store.update(current.id, current.version, patch.clone()).await {
                Ok(updated) => return Ok(updated),
                Err(AppointmentError::MeetingReferenceTaken) => {
                    warn!(
                        "Meeting reference collision for {} (attempt {}/{})",
                        current.id, attempt, attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppointmentError::Generation { attempts })
    }
}

fn ensure_version(current: &Appointment, expected_version: u64) -> Result<(), AppointmentError> {
    if current.version != expected_version {
        debug!(
            "Stale version for {}: expected {}, stored {}",
            current.id, expected_version, current.version
        );
        return Err(AppointmentError::Conflict {
            expected: expected_version,
            actual: current.version,
        });
    }
    Ok(())
}

/// Patients see their own appointments; doctors see theirs plus unclaimed
/// pending requests.
fn can_view(actor: &Actor, appointment: &Appointment) -> bool {
    appointment.involves(actor.actor_id, actor.role)
        || (actor.role == Role::Doctor
            && appointment.is_unassigned()
            && appointment.status == AppointmentStatus::Pending)
}

fn authorize(actor: &Actor, current: &Appointment) -> Result<(), AppointmentError> {
    if can_view(actor, current) {
        return Ok(());
    }
    Err(AppointmentError::Forbidden(format!(
        "{} {} is not a party to appointment {}",
        actor.role, actor.actor_id, current.id
    )))
}
