use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::AppointmentError;
use crate::models::{AppointmentValidationRules, CreateAppointmentRequest, NewAppointment};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

pub fn parse_date(field: &str, raw: Option<&str>) -> Result<NaiveDate, AppointmentError> {
    let raw = required(field, raw)?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        AppointmentError::Validation(format!("{} must be a date in YYYY-MM-DD format, got '{}'", field, raw))
    })
}

pub fn parse_time(field: &str, raw: Option<&str>) -> Result<NaiveTime, AppointmentError> {
    let raw = required(field, raw)?;
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            AppointmentError::Validation(format!("{} must be a time in HH:MM format, got '{}'", field, raw))
        })
}

/// Parses a date/time pair and rejects slots earlier than `now`.
pub fn parse_future_slot(
    date_field: &str,
    date: Option<&str>,
    time_field: &str,
    time: Option<&str>,
    now: NaiveDateTime,
) -> Result<(NaiveDate, NaiveTime), AppointmentError> {
    let date = parse_date(date_field, date)?;
    let time = parse_time(time_field, time)?;

    if date.and_time(time) < now {
        return Err(AppointmentError::Validation(format!(
            "{} {} is in the past",
            date, time.format("%H:%M")
        )));
    }

    Ok((date, time))
}

fn required<'a>(field: &str, raw: Option<&'a str>) -> Result<&'a str, AppointmentError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppointmentError::Validation(format!("{} is required", field))),
    }
}

pub fn validate_notes(
    notes: Option<&str>,
    rules: &AppointmentValidationRules,
) -> Result<Option<String>, AppointmentError> {
    match notes.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > rules.max_notes_length => Err(AppointmentError::Validation(
            format!("notes must be at most {} characters", rules.max_notes_length),
        )),
        Some(text) => Ok(Some(text.to_string())),
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CreateAppointmentRequest {
    /// Turns raw intake into a [`NewAppointment`]; the only way one is built.
    pub fn validate(
        &self,
        now: NaiveDateTime,
        rules: &AppointmentValidationRules,
    ) -> Result<NewAppointment, AppointmentError> {
        let patient_id = self
            .patient_id
            .ok_or_else(|| AppointmentError::Validation("patient_id is required".to_string()))?;

        let (requested_date, requested_time) = parse_future_slot(
            "requested_date",
            self.requested_date.as_deref(),
            "requested_time",
            self.requested_time.as_deref(),
            now,
        )?;

        Ok(NewAppointment {
            patient_id,
            doctor_id: self.doctor_id,
            requested_date,
            requested_time,
            appointment_type: self.appointment_type,
            notes: validate_notes(self.notes.as_deref(), rules)?,
            patient_display_name: non_blank(self.patient_display_name.as_ref()),
            doctor_display_name: non_blank(self.doctor_display_name.as_ref()),
            patient_demographics: self.patient_demographics.clone(),
        })
    }
}
