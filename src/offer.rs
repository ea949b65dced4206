//! Offer records and their append-only audit trail.
//!
//! Offers are never deleted, only status-transitioned; every price point and
//! lifecycle event leaves one [`AuditEntry`] behind so that human-initiated
//! and automatic transitions stay distinguishable after the fact.

use crate::request::TimeStamp;
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    #[n(0)]
    TRY,
    #[n(1)]
    USD,
    #[n(2)]
    EUR,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferStatus {
    #[n(0)]
    Sent,
    #[n(1)]
    Updated,
    #[n(2)]
    Withdrawn,
    #[n(3)]
    Accepted,
    #[n(4)]
    Rejected,
    #[n(5)]
    Cancelled,
}

/// Who performed an action on an offer.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    #[n(0)]
    Guest,
    #[n(1)]
    Hotel,
    #[n(2)]
    System,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    #[n(0)]
    Price,
    #[n(1)]
    Info,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct AuditEntry {
    #[n(0)]
    pub actor: Actor,
    #[n(1)]
    pub kind: AuditKind,
    /// Price at the time of the event, in minor units. Historical reference,
    /// never reinterpreted.
    #[n(2)]
    pub price: u64,
    #[n(3)]
    pub currency: Currency,
    #[n(4)]
    pub note: Option<String>,
    #[n(5)]
    pub at: TimeStamp<Utc>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Offer {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub request_id: String,
    #[n(2)]
    pub hotel_id: String,
    /// Quoted price in minor units.
    #[n(3)]
    pub price: u64,
    #[n(4)]
    pub currency: Currency,
    #[n(5)]
    pub status: OfferStatus,
    #[n(6)]
    pub guest_counter_price: Option<u64>,
    #[n(7)]
    pub guest_counter_at: Option<TimeStamp<Utc>>,
    #[n(8)]
    pub cancelled_by: Option<Actor>,
    #[n(9)]
    pub cancelled_at: Option<TimeStamp<Utc>>,
    #[n(10)]
    pub created_at: TimeStamp<Utc>,
    #[n(11)]
    pub updated_at: TimeStamp<Utc>,
    #[n(12)]
    pub trail: Vec<AuditEntry>,
}

impl Offer {
    /// A freshly submitted quote, with its opening price recorded in the
    /// trail.
    pub fn submitted(
        id: String,
        request_id: String,
        hotel_id: String,
        price: u64,
        currency: Currency,
        note: Option<String>,
    ) -> Self {
        let now = TimeStamp::new();
        let opening = AuditEntry {
            actor: Actor::Hotel,
            kind: AuditKind::Price,
            price,
            currency,
            note,
            at: now.clone(),
        };
        Self {
            id,
            request_id,
            hotel_id,
            price,
            currency,
            status: OfferStatus::Sent,
            guest_counter_price: None,
            guest_counter_at: None,
            cancelled_by: None,
            cancelled_at: None,
            created_at: now.clone(),
            updated_at: now,
            trail: vec![opening],
        }
    }

    pub fn push_entry(&mut self, entry: AuditEntry) {
        self.trail.push(entry);
    }

    /// An offer can still change hands only while sent or re-priced.
    pub fn is_negotiable(&self) -> bool {
        matches!(self.status, OfferStatus::Sent | OfferStatus::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_encoding() {
        let original = Offer::submitted(
            "offer_test".into(),
            "req_test".into(),
            "hotel_test".into(),
            1_000,
            Currency::TRY,
            Some("breakfast included".into()),
        );

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: Offer = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
        assert_eq!(decode.trail.len(), 1);
        assert_eq!(decode.trail[0].actor, Actor::Hotel);
    }

    #[test]
    fn negotiable_states() {
        let mut offer = Offer::submitted(
            "offer_test".into(),
            "req_test".into(),
            "hotel_test".into(),
            500,
            Currency::EUR,
            None,
        );
        assert!(offer.is_negotiable());

        offer.status = OfferStatus::Updated;
        assert!(offer.is_negotiable());

        offer.status = OfferStatus::Cancelled;
        assert!(!offer.is_negotiable());
    }
}
