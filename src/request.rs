//! Request records and the anonymous-lead draft builder.
//!
//! A `Request` is a unit of accommodation demand awaiting price quotes. It is
//! created either by an authenticated guest (owner set immediately) or as an
//! anonymous public lead carrying only the digest of a claim secret. All
//! client-supplied fields pass through [`LeadDraft::validate`] before any
//! write happens.

use crate::error::WorkflowError;
use crate::validate;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    #[n(0)]
    Hotel,
    #[n(1)]
    Group,
    #[n(2)]
    Package,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    #[n(0)]
    Open,
    #[n(1)]
    Expired,
    #[n(2)]
    Accepted,
    #[n(3)]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: TimeZone> Eq for TimeStamp<T> {}

impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Calendar stay date, persisted as a `YYYY-MM-DD` string.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct StayDate(NaiveDate);

impl StayDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Self {
        Self(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for StayDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl<C> minicbor::Encode<C> for StayDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.to_string())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for StayDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let raw = d.str()?;

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(StayDate)
            .map_err(|_| minicbor::decode::Error::message("stay date is not YYYY-MM-DD"))
    }
}

/// Persisted request record. Explicit required vs optional fields; the
/// decode boundary lives in the store, not scattered through workflows.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Request {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub kind: RequestKind,
    #[n(2)]
    pub is_public_lead: bool,
    /// Hex SHA-256 of the claim secret. Present only while unclaimed.
    #[n(3)]
    pub claim_hash: Option<String>,
    #[n(4)]
    pub claimed_at: Option<TimeStamp<Utc>>,
    /// Owner reference. `None` until the lead is claimed.
    #[n(5)]
    pub guest_id: Option<String>,
    #[n(6)]
    pub guest_display_name: Option<String>,
    #[n(7)]
    pub contact_name: String,
    #[n(8)]
    pub contact_phone: String,
    #[n(9)]
    pub city: String,
    #[n(10)]
    pub district: Option<String>,
    #[n(11)]
    pub check_in: StayDate,
    #[n(12)]
    pub check_out: StayDate,
    #[n(13)]
    pub same_day_stay: bool,
    #[n(14)]
    pub adults: u32,
    #[n(15)]
    pub children_count: u32,
    #[n(16)]
    pub rooms_count: u32,
    #[n(17)]
    pub note: Option<String>,
    #[n(18)]
    pub response_deadline_minutes: u32,
    #[n(19)]
    pub status: RequestStatus,
    #[n(20)]
    pub created_at: TimeStamp<Utc>,
    #[n(21)]
    pub restarted_at: Option<TimeStamp<Utc>>,
}

impl Request {
    pub fn anonymous(id: String, fields: LeadFields, claim_hash: String) -> Self {
        Self::build(id, fields, None, None, Some(claim_hash), true)
    }

    pub fn owned(
        id: String,
        fields: LeadFields,
        guest_id: String,
        guest_display_name: Option<String>,
    ) -> Self {
        Self::build(id, fields, Some(guest_id), guest_display_name, None, false)
    }

    fn build(
        id: String,
        fields: LeadFields,
        guest_id: Option<String>,
        guest_display_name: Option<String>,
        claim_hash: Option<String>,
        is_public_lead: bool,
    ) -> Self {
        let same_day_stay = fields.check_in == fields.check_out;
        Self {
            id,
            kind: fields.kind,
            is_public_lead,
            claim_hash,
            claimed_at: None,
            guest_id,
            guest_display_name,
            contact_name: fields.contact_name,
            contact_phone: fields.contact_phone,
            city: fields.city,
            district: fields.district,
            check_in: fields.check_in,
            check_out: fields.check_out,
            same_day_stay,
            adults: fields.adults,
            children_count: fields.children_count,
            rooms_count: fields.rooms_count,
            note: fields.note,
            response_deadline_minutes: fields.response_deadline_minutes,
            status: RequestStatus::Open,
            created_at: TimeStamp::new(),
            restarted_at: None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == RequestKind::Group
    }
}

/// The validated output of a [`LeadDraft`].
#[derive(Debug, Clone)]
pub struct LeadFields {
    pub kind: RequestKind,
    pub contact_name: String,
    pub contact_phone: String,
    pub city: String,
    pub district: Option<String>,
    pub check_in: StayDate,
    pub check_out: StayDate,
    pub adults: u32,
    pub children_count: u32,
    pub rooms_count: u32,
    pub note: Option<String>,
    pub response_deadline_minutes: u32,
}

/// Client-facing draft of a lead. All fields are loose strings and optionals;
/// `validate` is the single fail-fast boundary that turns them into typed
/// [`LeadFields`], naming the offending field on the first failure.
#[derive(Debug, Default)]
pub struct LeadDraft {
    kind: Option<RequestKind>,
    contact_name: Option<String>,
    phone_local: Option<String>,
    phone_country_code: Option<String>,
    city: Option<String>,
    district: Option<String>,
    check_in: Option<String>,
    check_out: Option<String>,
    adults: Option<u32>,
    children_count: Option<u32>,
    rooms_count: Option<u32>,
    note: Option<String>,
    response_deadline_minutes: Option<i64>,
}

impl LeadDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_kind(mut self, kind: RequestKind) -> Self {
        self.kind = Some(kind);
        self
    }
    pub fn set_contact_name(mut self, name: &str) -> Self {
        self.contact_name = Some(name.to_string());
        self
    }
    pub fn set_phone_local(mut self, phone: &str) -> Self {
        self.phone_local = Some(phone.to_string());
        self
    }
    pub fn set_phone_country_code(mut self, code: &str) -> Self {
        self.phone_country_code = Some(code.to_string());
        self
    }
    pub fn set_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }
    pub fn set_district(mut self, district: &str) -> Self {
        self.district = Some(district.to_string());
        self
    }
    pub fn set_check_in(mut self, date: &str) -> Self {
        self.check_in = Some(date.to_string());
        self
    }
    pub fn set_check_out(mut self, date: &str) -> Self {
        self.check_out = Some(date.to_string());
        self
    }
    pub fn set_adults(mut self, adults: u32) -> Self {
        self.adults = Some(adults);
        self
    }
    pub fn set_children_count(mut self, children: u32) -> Self {
        self.children_count = Some(children);
        self
    }
    pub fn set_rooms_count(mut self, rooms: u32) -> Self {
        self.rooms_count = Some(rooms);
        self
    }
    pub fn set_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }
    pub fn set_response_deadline_minutes(mut self, minutes: i64) -> Self {
        self.response_deadline_minutes = Some(minutes);
        self
    }

    /// Checks every field and composes the derived ones. Nothing is written
    /// anywhere before this succeeds.
    pub fn validate(self) -> Result<LeadFields, WorkflowError> {
        let contact_name = validate::contact_name(self.contact_name.as_deref().unwrap_or(""))?;
        let contact_phone = validate::phone(
            self.phone_local.as_deref().unwrap_or(""),
            self.phone_country_code.as_deref(),
        )?;
        let city = validate::city(self.city.as_deref().unwrap_or(""))?;
        let check_in = validate::stay_date("checkIn", self.check_in.as_deref().unwrap_or(""))?;
        let check_out = validate::stay_date("checkOut", self.check_out.as_deref().unwrap_or(""))?;
        validate::date_order(&check_in, &check_out)?;
        let adults = validate::adults(self.adults)?;
        let rooms_count = validate::rooms(self.rooms_count.unwrap_or(1))?;
        let response_deadline_minutes = validate::clamp_deadline(self.response_deadline_minutes);

        Ok(LeadFields {
            kind: self.kind.unwrap_or(RequestKind::Hotel),
            contact_name,
            contact_phone,
            city,
            district: self.district,
            check_in,
            check_out,
            adults,
            children_count: self.children_count.unwrap_or(0),
            rooms_count,
            note: self.note,
            response_deadline_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn stay_date_encoding() {
        let original = StayDate::from_ymd(2025, 6, 1);

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: StayDate = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
        assert_eq!(decode.to_string(), "2025-06-01");
    }

    #[test]
    fn same_day_stay_is_derived() {
        let fields = LeadDraft::new()
            .set_contact_name("Ayşe Yılmaz")
            .set_phone_local("5321234567")
            .set_city("Trabzon")
            .set_check_in("2025-06-01")
            .set_check_out("2025-06-01")
            .set_adults(2)
            .validate()
            .unwrap();

        let request = Request::anonymous("req_test".into(), fields, "digest".into());
        assert!(request.same_day_stay);
    }
}
