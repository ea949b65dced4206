//! Pure field validators. No I/O; every failure names the offending field.

use crate::error::WorkflowError;
use crate::request::StayDate;
use chrono::{Local, NaiveDate};

pub const DEFAULT_COUNTRY_CODE: &str = "+90";
pub const MIN_PHONE_DIGITS: usize = 10;
pub const MIN_DEADLINE_MINUTES: i64 = 15;
/// Seven days.
pub const MAX_DEADLINE_MINUTES: i64 = 10_080;
pub const DEFAULT_DEADLINE_MINUTES: i64 = 60;

pub fn contact_name(raw: &str) -> Result<String, WorkflowError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < 2 {
        return Err(WorkflowError::invalid(
            "contactName",
            "must be at least 2 characters",
        ));
    }
    Ok(trimmed.to_string())
}

/// Strips everything but digits from the local part, requires at least ten
/// digits, and composes the stored phone with the country code.
pub fn phone(local: &str, country_code: Option<&str>) -> Result<String, WorkflowError> {
    let digits: String = local.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(WorkflowError::invalid(
            "contactPhoneLocal",
            format!("must contain at least {MIN_PHONE_DIGITS} digits"),
        ));
    }
    let code = country_code.unwrap_or(DEFAULT_COUNTRY_CODE);
    Ok(format!("{code}{digits}"))
}

pub fn city(raw: &str) -> Result<String, WorkflowError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::invalid("city", "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub fn stay_date(field: &'static str, raw: &str) -> Result<StayDate, WorkflowError> {
    let trimmed = raw.trim();
    if trimmed.len() != 10 {
        return Err(WorkflowError::invalid(
            field,
            "must be formatted as YYYY-MM-DD",
        ));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(StayDate::new)
        .map_err(|_| WorkflowError::invalid(field, "must be formatted as YYYY-MM-DD"))
}

/// A stay date that is additionally required to be today or later in the
/// server's local calendar.
pub fn future_stay_date(field: &'static str, raw: &str) -> Result<StayDate, WorkflowError> {
    let date = stay_date(field, raw)?;
    if date.as_naive() < Local::now().date_naive() {
        return Err(WorkflowError::invalid(
            field,
            "must be today or a future date",
        ));
    }
    Ok(date)
}

pub fn date_order(check_in: &StayDate, check_out: &StayDate) -> Result<(), WorkflowError> {
    if check_out < check_in {
        return Err(WorkflowError::invalid(
            "checkOut",
            "must not precede checkIn",
        ));
    }
    Ok(())
}

pub fn adults(count: Option<u32>) -> Result<u32, WorkflowError> {
    match count {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(WorkflowError::invalid("adults", "must be at least 1")),
    }
}

pub fn rooms(count: u32) -> Result<u32, WorkflowError> {
    if count < 1 {
        return Err(WorkflowError::invalid("roomsCount", "must be at least 1"));
    }
    Ok(count)
}

/// Out-of-range deadlines are coerced into [15 minutes, 7 days] rather
/// than rejected. Absent means one hour.
pub fn clamp_deadline(minutes: Option<i64>) -> u32 {
    minutes
        .unwrap_or(DEFAULT_DEADLINE_MINUTES)
        .clamp(MIN_DEADLINE_MINUTES, MAX_DEADLINE_MINUTES) as u32
}
