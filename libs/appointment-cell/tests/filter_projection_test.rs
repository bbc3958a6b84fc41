use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::error::AppointmentError;
use appointment_cell::models::{
    Appointment, AppointmentStatus, AppointmentType, FilterQuery, PatientDemographics, StatusFilter,
};
use appointment_cell::services::{
    AppointmentAction, AppointmentFilterService, AppointmentView, RoleViewProjector, StatusVocabulary,
};
use shared_models::auth::Role;

fn appointment(
    status: AppointmentStatus,
    doctor_name: &str,
    patient_name: &str,
    kind: Option<AppointmentType>,
    notes: Option<&str>,
) -> Appointment {
    let created = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id: Some(Uuid::new_v4()),
        requested_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
        requested_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        scheduled_date: None,
        scheduled_time: None,
        status,
        meeting_reference: (status != AppointmentStatus::Pending)
            .then(|| "https://amae-clinic.video/room/abc".to_string()),
        appointment_type: kind,
        patient_display_name: Some(patient_name.to_string()),
        doctor_display_name: Some(doctor_name.to_string()),
        patient_demographics: Some(PatientDemographics {
            age: Some(34),
            gender: Some("female".to_string()),
        }),
        notes: notes.map(str::to_string),
        doctor_notes: Some("Follow up in two weeks".to_string()),
        cancellation_reason: None,
        cancelled_by: None,
        cancelled_by_actor: None,
        created_at: created,
        updated_at: created,
        version: 1,
    }
}

fn sample() -> Vec<Appointment> {
    vec![
        appointment(
            AppointmentStatus::Pending,
            "Dr. Amara Okafor",
            "Lena Fischer",
            Some(AppointmentType::GeneralConsultation),
            Some("Persistent cough"),
        ),
        appointment(
            AppointmentStatus::Scheduled,
            "Dr. Jonas Weber",
            "Mina Haddad",
            Some(AppointmentType::MentalHealth),
            None,
        ),
        appointment(
            AppointmentStatus::Completed,
            "Dr. Amara Okafor",
            "Tomás Ruiz",
            Some(AppointmentType::FollowUp),
            Some("Blood pressure check"),
        ),
        appointment(AppointmentStatus::Cancelled, "Dr. Lee", "Lena Park", None, None),
    ]
}

fn ids(appointments: &[Appointment]) -> Vec<Uuid> {
    appointments.iter().map(|a| a.id).collect()
}

#[test]
fn empty_query_is_identity() {
    let filter = AppointmentFilterService::default();
    let input = sample();

    for role in [Role::Patient, Role::Doctor] {
        let output = filter.filter(input.clone(), role, &FilterQuery::default()).unwrap();
        assert_eq!(output, input);
    }
}

#[test]
fn search_matches_the_counterpart_name_for_each_role() {
    let filter = AppointmentFilterService::default();
    let input = sample();

    let patient_view = filter
        .filter(input.clone(), Role::Patient, &FilterQuery::new("okafor", StatusFilter::All))
        .unwrap();
    assert_eq!(ids(&patient_view), vec![input[0].id, input[2].id]);

    // Doctors search patient names; "okafor" is a doctor name so nothing matches.
    let doctor_view = filter
        .filter(input.clone(), Role::Doctor, &FilterQuery::new("okafor", StatusFilter::All))
        .unwrap();
    assert!(doctor_view.is_empty());

    let doctor_view = filter
        .filter(input.clone(), Role::Doctor, &FilterQuery::new("LENA", StatusFilter::All))
        .unwrap();
    assert_eq!(ids(&doctor_view), vec![input[0].id, input[3].id]);
}

#[test]
fn search_covers_type_and_notes() {
    let filter = AppointmentFilterService::default();
    let input = sample();

    let by_type = filter
        .filter(input.clone(), Role::Patient, &FilterQuery::new("mental", StatusFilter::All))
        .unwrap();
    assert_eq!(ids(&by_type), vec![input[1].id]);

    let by_notes = filter
        .filter(input.clone(), Role::Doctor, &FilterQuery::new("blood pressure", StatusFilter::All))
        .unwrap();
    assert_eq!(ids(&by_notes), vec![input[2].id]);
}

#[test]
fn status_and_search_combine_and_are_idempotent() {
    let filter = AppointmentFilterService::default();
    let input = sample();
    let query = FilterQuery::new("dr.", StatusFilter::Only(AppointmentStatus::Completed));

    let once = filter.filter(input.clone(), Role::Patient, &query).unwrap();
    assert_eq!(ids(&once), vec![input[2].id]);

    let twice = filter.filter(once.clone(), Role::Patient, &query).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn statuses_outside_the_role_vocabulary_are_rejected() {
    let vocabulary = StatusVocabulary::default().with_role(
        Role::Patient,
        [
            (AppointmentStatus::Pending, "Requested"),
            (AppointmentStatus::Scheduled, "Confirmed"),
        ],
    );
    let filter = AppointmentFilterService::new(vocabulary);

    let result = filter.filter(
        sample(),
        Role::Patient,
        &FilterQuery::new("", StatusFilter::Only(AppointmentStatus::Cancelled)),
    );
    assert_matches!(result, Err(AppointmentError::Validation(_)));

    assert!(filter
        .filter(
            sample(),
            Role::Doctor,
            &FilterQuery::new("", StatusFilter::Only(AppointmentStatus::Cancelled)),
        )
        .is_ok());
}

#[test]
fn patient_view_hides_clinical_fields() {
    let projector = RoleViewProjector::default();
    let scheduled = &sample()[1];

    let view = projector.project(scheduled, Role::Patient);
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(json["display_status"], "Confirmed");
    assert_eq!(json["doctor_name"], "Dr. Jonas Weber");
    assert_eq!(json["meeting_reference"], "https://amae-clinic.video/room/abc");
    assert!(json.get("doctor_notes").is_none());
    assert!(json.get("demographics").is_none());
    assert!(json.get("patient_name").is_none());
    assert_eq!(view.available_actions(), &[AppointmentAction::Cancel]);
}

#[test]
fn patient_view_drops_reference_outside_scheduled() {
    let projector = RoleViewProjector::default();
    let completed = &sample()[2];

    assert_matches!(
        projector.project(completed, Role::Patient),
        AppointmentView::Patient(view) if view.meeting_reference.is_none() && view.available_actions.is_empty()
    );
}

#[test]
fn doctor_view_carries_patient_context() {
    let projector = RoleViewProjector::default();
    let pending = &sample()[0];

    let view = projector.project(pending, Role::Doctor);
    assert_eq!(view.id(), pending.id);

    assert_matches!(view, AppointmentView::Doctor(view) => {
        assert_eq!(view.display_status, "Pending");
        assert_eq!(view.patient_name.as_deref(), Some("Lena Fischer"));
        assert_eq!(view.demographics.and_then(|d| d.age), Some(34));
        assert_eq!(view.doctor_notes.as_deref(), Some("Follow up in two weeks"));
        assert_eq!(
            view.available_actions,
            vec![AppointmentAction::Schedule, AppointmentAction::Cancel]
        );
    });
}

#[test]
fn projecting_many_preserves_order() {
    let projector = RoleViewProjector::default();
    let input = sample();

    let views = projector.project_all(&input, Role::Doctor);
    assert_eq!(views.iter().map(AppointmentView::id).collect::<Vec<_>>(), ids(&input));
}
