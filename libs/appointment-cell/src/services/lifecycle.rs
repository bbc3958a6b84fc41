// libs/appointment-cell/src/services/lifecycle.rs
use serde::Serialize;
use tracing::{debug, warn};

use shared_models::auth::Role;

use crate::error::AppointmentError;
use crate::models::AppointmentStatus;

/// What happens to the meeting reference when an edge is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingEffect {
    Keep,
    /// Issue a new reference; any previous one is discarded.
    Issue,
}

/// Named action exposed to callers and views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    Schedule,
    Reschedule,
    Complete,
    Cancel,
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    pub action: AppointmentAction,
    pub actors: &'static [Role],
    pub requires_slot: bool,
    pub meeting_effect: MeetingEffect,
}

impl TransitionRule {
    pub fn permits(&self, role: Role) -> bool {
        self.actors.contains(&role)
    }
}

/// The complete lifecycle. Anything not listed is an invalid transition.
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: AppointmentStatus::Pending,
        to: AppointmentStatus::Scheduled,
        action: AppointmentAction::Schedule,
        actors: &[Role::Doctor],
        requires_slot: true,
        meeting_effect: MeetingEffect::Issue,
    },
    TransitionRule {
        from: AppointmentStatus::Pending,
        to: AppointmentStatus::Cancelled,
        action: AppointmentAction::Cancel,
        actors: &[Role::Patient, Role::Doctor],
        requires_slot: false,
        meeting_effect: MeetingEffect::Keep,
    },
    TransitionRule {
        from: AppointmentStatus::Scheduled,
        to: AppointmentStatus::Scheduled,
        action: AppointmentAction::Reschedule,
        actors: &[Role::Doctor],
        requires_slot: true,
        meeting_effect: MeetingEffect::Issue,
    },
    TransitionRule {
        from: AppointmentStatus::Scheduled,
        to: AppointmentStatus::Completed,
        action: AppointmentAction::Complete,
        actors: &[Role::Doctor],
        requires_slot: false,
        meeting_effect: MeetingEffect::Keep,
    },
    TransitionRule {
        from: AppointmentStatus::Scheduled,
        to: AppointmentStatus::Cancelled,
        action: AppointmentAction::Cancel,
        actors: &[Role::Patient, Role::Doctor],
        requires_slot: false,
        meeting_effect: MeetingEffect::Keep,
    },
];

pub struct AppointmentLifecycleService {
    rules: &'static [TransitionRule],
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self { rules: TRANSITIONS }
    }

    pub fn rule(&self, from: AppointmentStatus, to: AppointmentStatus) -> Option<&TransitionRule> {
        self.rules.iter().find(|rule| rule.from == from && rule.to == to)
    }

    /// Validate that `role` may move an appointment from `from` to `to`.
    pub fn validate_status_transition(
        &self,
        from: AppointmentStatus,
        to: AppointmentStatus,
        role: Role,
    ) -> Result<&TransitionRule, AppointmentError> {
        debug!("Validating status transition from {} to {} by {}", from, to, role);

        let rule = self.rule(from, to).ok_or_else(|| {
            warn!("Invalid status transition attempted: {} -> {}", from, to);
            AppointmentError::InvalidTransition { from, to }
        })?;

        if !rule.permits(role) {
            warn!("{} attempted {} -> {} which is reserved to {:?}", role, from, to, rule.actors);
            return Err(AppointmentError::Forbidden(format!(
                "a {} cannot move an appointment from {} to {}",
                role, from, to
            )));
        }

        Ok(rule)
    }

    /// All statuses reachable from `from`, regardless of actor.
    pub fn get_valid_transitions(&self, from: AppointmentStatus) -> Vec<AppointmentStatus> {
        self.rules
            .iter()
            .filter(|rule| rule.from == from)
            .map(|rule| rule.to)
            .collect()
    }

    /// Actions `role` can take from `from`, in table order.
    pub fn available_actions(&self, from: AppointmentStatus, role: Role) -> Vec<AppointmentAction> {
        let mut actions = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.from == from && rule.permits(role)) {
            if !actions.contains(&rule.action) {
                actions.push(rule.action);
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn every_unlisted_pair_is_invalid() {
        let lifecycle = AppointmentLifecycleService::new();
        let mut legal = 0;

        for from in AppointmentStatus::ALL {
            for to in AppointmentStatus::ALL {
                match lifecycle.rule(from, to) {
                    Some(_) => legal += 1,
                    None => assert_matches!(
                        lifecycle.validate_status_transition(from, to, Role::Doctor),
                        Err(AppointmentError::InvalidTransition { .. })
                    ),
                }
            }
        }

        assert_eq!(legal, 5);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle.get_valid_transitions(AppointmentStatus::Completed).is_empty());
        assert!(lifecycle.get_valid_transitions(AppointmentStatus::Cancelled).is_empty());
    }

    #[test]
    fn patients_may_only_cancel() {
        let lifecycle = AppointmentLifecycleService::new();

        assert_eq!(
            lifecycle.available_actions(AppointmentStatus::Pending, Role::Patient),
            vec![AppointmentAction::Cancel]
        );
        assert_eq!(
            lifecycle.available_actions(AppointmentStatus::Scheduled, Role::Doctor),
            vec![
                AppointmentAction::Reschedule,
                AppointmentAction::Complete,
                AppointmentAction::Cancel
            ]
        );
        assert_matches!(
            lifecycle.validate_status_transition(
                AppointmentStatus::Pending,
                AppointmentStatus::Scheduled,
                Role::Patient
            ),
            Err(AppointmentError::Forbidden(_))
        );
    }

    #[test]
    fn slot_edges_issue_new_references() {
        for rule in TRANSITIONS {
            assert_eq!(rule.requires_slot, rule.to == AppointmentStatus::Scheduled);
            assert_eq!(rule.meeting_effect == MeetingEffect::Issue, rule.requires_slot);
        }
    }
}
