//! Service layer API for lead, claim and offer workflow operations.
//!
//! Every operation validates its inputs before touching the store, then runs
//! its mutation as one sled transaction. The store handle is injected at
//! construction; callers pass their verified [`Identity`] per call, or `None`
//! when anonymous.

use std::sync::Arc;

use crate::error::WorkflowError;
use crate::offer::{Actor, AuditEntry, AuditKind, Currency, Offer, OfferStatus};
use crate::request::{LeadDraft, Request, RequestStatus, TimeStamp};
use crate::store::{self, LeadStore, keys, tx};
use crate::{token, utils, validate};

/// How long the anonymous client should keep a claim secret around. A hint
/// only; redemption itself is not age-checked server-side.
pub const CLAIM_EXPIRES_HOURS: u32 = 24;

const RESTART_NOTE: &str = "request restarted by its owner; pending offer cancelled";

/// A verified caller, as supplied by the external authentication layer.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
        }
    }
    pub fn with_display_name(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: Some(name.into()),
        }
    }
}

/// Result of creating an anonymous lead. The secret appears here exactly
/// once; it is never retrievable again.
#[derive(Debug)]
pub struct AnonymousLead {
    pub request_id: String,
    pub claim_secret: String,
    pub expires_hours: u32,
}

pub struct LeadService {
    store: LeadStore,
}

impl LeadService {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            store: LeadStore::new(instance),
        }
    }

    fn new_record_id(hrp: &str) -> Result<String, WorkflowError> {
        utils::new_uuid_to_bech32(hrp).map_err(|e| WorkflowError::Internal(e.to_string()))
    }

    fn require_auth<'a>(identity: Option<&'a Identity>) -> Result<&'a Identity, WorkflowError> {
        identity.ok_or(WorkflowError::Unauthenticated)
    }

    /// Create a request on behalf of an authenticated guest. Ownership is
    /// set immediately; no claim secret is involved.
    pub fn create_request(
        &self,
        identity: Option<&Identity>,
        draft: LeadDraft,
    ) -> Result<Request, WorkflowError> {
        let caller = Self::require_auth(identity)?;
        let fields = draft.validate()?;

        let id = Self::new_record_id(utils::REQUEST_HRP)?;
        let request = Request::owned(
            id,
            fields,
            caller.user_id.clone(),
            caller.display_name.clone(),
        );

        self.store.transaction(|tree| {
            tx::put_request(tree, &request)?;
            tree.insert(
                keys::owner(&caller.user_id, &request.id),
                request.id.as_bytes(),
            )?;
            Ok(())
        })?;

        tracing::info!(request_id = %request.id, guest = %caller.user_id, "request created");
        Ok(request)
    }

    /// Create an anonymous public lead. All validation happens before any
    /// write; on success the record is persisted with no owner and only the
    /// digest of the freshly generated secret.
    pub fn create_anonymous_lead(&self, draft: LeadDraft) -> Result<AnonymousLead, WorkflowError> {
        let fields = draft.validate()?;

        let secret = token::generate_secret();
        let digest = token::digest(&secret);
        let id = Self::new_record_id(utils::REQUEST_HRP)?;
        let request = Request::anonymous(id, fields, digest.clone());

        self.store.transaction(|tree| {
            tx::put_request(tree, &request)?;
            tree.insert(keys::claim(&digest), request.id.as_bytes())?;
            Ok(())
        })?;

        tracing::info!(request_id = %request.id, city = %request.city, "anonymous lead created");
        Ok(AnonymousLead {
            request_id: request.id,
            claim_secret: secret,
            expires_hours: CLAIM_EXPIRES_HOURS,
        })
    }

    /// Redeem a claim secret, attaching the caller as owner of the matching
    /// lead. Single-use: the digest index entry and the stored hash are
    /// cleared in the same transaction, so a replay fails with `NotFound`
    /// (or `FailedPrecondition` if it races the first claim).
    pub fn claim_lead(
        &self,
        identity: Option<&Identity>,
        claim_secret: &str,
    ) -> Result<String, WorkflowError> {
        let caller = Self::require_auth(identity)?;
        if claim_secret.is_empty() {
            return Err(WorkflowError::invalid("claimSecret", "must not be empty"));
        }
        let digest = token::digest(claim_secret);

        let request_id = self.store.transaction(|tree| {
            let request_id = match tree.get(keys::claim(&digest))? {
                Some(raw) => String::from_utf8(raw.to_vec())
                    .map_err(|e| store::abort(WorkflowError::Codec(e.to_string())))?,
                None => {
                    return Err(store::abort(WorkflowError::NotFound(
                        "no lead matches the supplied claim secret".into(),
                    )));
                }
            };

            let mut request = tx::request(tree, &request_id)?.ok_or_else(|| {
                store::abort(WorkflowError::Internal(
                    "claim index points at a missing request".into(),
                ))
            })?;

            if request.guest_id.is_some() {
                return Err(store::abort(WorkflowError::FailedPrecondition(
                    "lead has already been claimed".into(),
                )));
            }

            request.guest_id = Some(caller.user_id.clone());
            request.guest_display_name = caller.display_name.clone();
            request.claim_hash = None;
            request.claimed_at = Some(TimeStamp::new());

            tx::put_request(tree, &request)?;
            tree.remove(keys::claim(&digest))?;
            tree.insert(
                keys::owner(&caller.user_id, &request.id),
                request.id.as_bytes(),
            )?;
            Ok(request.id)
        })?;

        tracing::info!(request_id = %request_id, guest = %caller.user_id, "lead claimed");
        Ok(request_id)
    }

    /// Reopen a request for bidding and cancel every non-accepted offer it
    /// has, in one transaction. The creation timestamp is refreshed so
    /// recency-based sorts treat the request as new; the fact that a restart
    /// occurred is kept in `restarted_at`.
    pub fn restart_request(
        &self,
        identity: Option<&Identity>,
        request_id: &str,
        new_check_in: Option<&str>,
        new_check_out: Option<&str>,
    ) -> Result<String, WorkflowError> {
        let caller = Self::require_auth(identity)?;
        if request_id.trim().is_empty() {
            return Err(WorkflowError::invalid("requestId", "must not be empty"));
        }
        let new_in = new_check_in
            .map(|raw| validate::future_stay_date("checkIn", raw))
            .transpose()?;
        let new_out = new_check_out
            .map(|raw| validate::stay_date("checkOut", raw))
            .transpose()?;
        if let (Some(check_in), Some(check_out)) = (&new_in, &new_out) {
            validate::date_order(check_in, check_out)?;
        }

        let cancelled = self.store.transaction(|tree| {
            let mut request = tx::request(tree, request_id)?.ok_or_else(|| {
                store::abort(WorkflowError::NotFound(format!(
                    "request {request_id} does not exist"
                )))
            })?;

            if request.guest_id.as_deref() != Some(caller.user_id.as_str()) {
                return Err(store::abort(WorkflowError::PermissionDenied));
            }

            let now = TimeStamp::new();
            request.status = RequestStatus::Open;
            request.created_at = now.clone();
            request.restarted_at = Some(now.clone());
            if let Some(check_in) = new_in {
                request.check_in = check_in;
            }
            if let Some(check_out) = new_out {
                request.check_out = check_out;
            }
            request.same_day_stay = request.check_in == request.check_out;
            tx::put_request(tree, &request)?;

            let mut cancelled = 0usize;
            for offer_id in tx::offer_ids(tree, request_id)? {
                let Some(mut offer) = tx::offer(tree, &offer_id)? else {
                    continue;
                };
                // Accepted offers are the one status the cascade never touches.
                if offer.status == OfferStatus::Accepted {
                    continue;
                }
                let already_cancelled = offer.status == OfferStatus::Cancelled;
                offer.status = OfferStatus::Cancelled;
                offer.cancelled_by = Some(Actor::System);
                offer.cancelled_at = Some(now.clone());
                offer.guest_counter_price = None;
                offer.guest_counter_at = None;
                offer.updated_at = now.clone();
                if !already_cancelled {
                    let entry = AuditEntry {
                        actor: Actor::System,
                        kind: AuditKind::Info,
                        price: offer.price,
                        currency: offer.currency,
                        note: Some(RESTART_NOTE.to_string()),
                        at: now.clone(),
                    };
                    offer.push_entry(entry);
                    cancelled += 1;
                }
                tx::put_offer(tree, &offer)?;
            }
            Ok(cancelled)
        })?;

        tracing::info!(request_id = %request_id, cancelled, "request restarted");
        Ok(request_id.to_string())
    }

    /// Submit a price quote against an open request.
    pub fn submit_offer(
        &self,
        identity: Option<&Identity>,
        request_id: &str,
        price: u64,
        currency: Currency,
        note: Option<&str>,
    ) -> Result<Offer, WorkflowError> {
        let hotel = Self::require_auth(identity)?;
        if request_id.trim().is_empty() {
            return Err(WorkflowError::invalid("requestId", "must not be empty"));
        }
        if price == 0 {
            return Err(WorkflowError::invalid("price", "must be greater than zero"));
        }

        let id = Self::new_record_id(utils::OFFER_HRP)?;
        let offer = self.store.transaction(|tree| {
            let request = tx::request(tree, request_id)?.ok_or_else(|| {
                store::abort(WorkflowError::NotFound(format!(
                    "request {request_id} does not exist"
                )))
            })?;
            if request.status != RequestStatus::Open {
                return Err(store::abort(WorkflowError::FailedPrecondition(
                    "request is not open for offers".into(),
                )));
            }

            let offer = Offer::submitted(
                id.clone(),
                request_id.to_string(),
                hotel.user_id.clone(),
                price,
                currency,
                note.map(str::to_string),
            );
            tx::put_offer(tree, &offer)?;

            let mut ids = tx::offer_ids(tree, request_id)?;
            if !ids.contains(&offer.id) {
                ids.push(offer.id.clone());
            }
            tx::put_offer_ids(tree, request_id, &ids)?;
            Ok(offer)
        })?;

        tracing::debug!(offer_id = %offer.id, request_id = %request_id, price, "offer submitted");
        Ok(offer)
    }

    /// Re-price an offer. Only the submitting hotel, and only while the
    /// offer is still negotiable.
    pub fn update_offer_price(
        &self,
        identity: Option<&Identity>,
        offer_id: &str,
        price: u64,
        note: Option<&str>,
    ) -> Result<Offer, WorkflowError> {
        let hotel = Self::require_auth(identity)?;
        if price == 0 {
            return Err(WorkflowError::invalid("price", "must be greater than zero"));
        }

        let offer = self.store.transaction(|tree| {
            let mut offer = Self::fetch_offer(tree, offer_id)?;
            if offer.hotel_id != hotel.user_id {
                return Err(store::abort(WorkflowError::PermissionDenied));
            }
            if !offer.is_negotiable() {
                return Err(store::abort(WorkflowError::FailedPrecondition(
                    "offer can no longer be re-priced".into(),
                )));
            }

            let now = TimeStamp::new();
            offer.price = price;
            offer.status = OfferStatus::Updated;
            offer.updated_at = now.clone();
            let entry = AuditEntry {
                actor: Actor::Hotel,
                kind: AuditKind::Price,
                price,
                currency: offer.currency,
                note: note.map(str::to_string),
                at: now,
            };
            offer.push_entry(entry);
            tx::put_offer(tree, &offer)?;
            Ok(offer)
        })?;

        tracing::debug!(offer_id = %offer.id, price, "offer re-priced");
        Ok(offer)
    }

    /// Withdraw an offer. Hotel-initiated, as opposed to the system
    /// cancellation performed by a restart.
    pub fn withdraw_offer(
        &self,
        identity: Option<&Identity>,
        offer_id: &str,
    ) -> Result<Offer, WorkflowError> {
        let hotel = Self::require_auth(identity)?;

        let offer = self.store.transaction(|tree| {
            let mut offer = Self::fetch_offer(tree, offer_id)?;
            if offer.hotel_id != hotel.user_id {
                return Err(store::abort(WorkflowError::PermissionDenied));
            }
            if !offer.is_negotiable() {
                return Err(store::abort(WorkflowError::FailedPrecondition(
                    "offer can no longer be withdrawn".into(),
                )));
            }

            let now = TimeStamp::new();
            offer.status = OfferStatus::Withdrawn;
            offer.cancelled_by = Some(Actor::Hotel);
            offer.cancelled_at = Some(now.clone());
            offer.updated_at = now.clone();
            let entry = AuditEntry {
                actor: Actor::Hotel,
                kind: AuditKind::Info,
                price: offer.price,
                currency: offer.currency,
                note: Some("offer withdrawn by the hotel".into()),
                at: now,
            };
            offer.push_entry(entry);
            tx::put_offer(tree, &offer)?;
            Ok(offer)
        })?;

        tracing::debug!(offer_id = %offer.id, "offer withdrawn");
        Ok(offer)
    }

    /// Record a guest counter-price on a negotiable offer. Only the owner of
    /// the parent request may counter.
    pub fn counter_offer(
        &self,
        identity: Option<&Identity>,
        offer_id: &str,
        price: u64,
    ) -> Result<Offer, WorkflowError> {
        let caller = Self::require_auth(identity)?;
        if price == 0 {
            return Err(WorkflowError::invalid("price", "must be greater than zero"));
        }

        let offer = self.store.transaction(|tree| {
            let mut offer = Self::fetch_offer(tree, offer_id)?;
            Self::verify_request_owner(tree, &offer.request_id, caller)?;
            if !offer.is_negotiable() {
                return Err(store::abort(WorkflowError::FailedPrecondition(
                    "offer is not open to a counter price".into(),
                )));
            }

            let now = TimeStamp::new();
            offer.guest_counter_price = Some(price);
            offer.guest_counter_at = Some(now.clone());
            offer.updated_at = now.clone();
            let entry = AuditEntry {
                actor: Actor::Guest,
                kind: AuditKind::Price,
                price,
                currency: offer.currency,
                note: Some("guest proposed a counter price".into()),
                at: now,
            };
            offer.push_entry(entry);
            tx::put_offer(tree, &offer)?;
            Ok(offer)
        })?;

        tracing::debug!(offer_id = %offer.id, price, "counter price recorded");
        Ok(offer)
    }

    /// Accept an offer. The offer becomes immutable to every later workflow
    /// (including restarts) and the request leaves the open state, both in
    /// the same transaction.
    pub fn accept_offer(
        &self,
        identity: Option<&Identity>,
        offer_id: &str,
    ) -> Result<Offer, WorkflowError> {
        let caller = Self::require_auth(identity)?;

        let offer = self.store.transaction(|tree| {
            let mut offer = Self::fetch_offer(tree, offer_id)?;
            let mut request = Self::verify_request_owner(tree, &offer.request_id, caller)?;
            if !offer.is_negotiable() {
                return Err(store::abort(WorkflowError::FailedPrecondition(
                    "offer can no longer be accepted".into(),
                )));
            }
            if request.status != RequestStatus::Open {
                return Err(store::abort(WorkflowError::FailedPrecondition(
                    "request is no longer open".into(),
                )));
            }

            let now = TimeStamp::new();
            offer.status = OfferStatus::Accepted;
            offer.updated_at = now.clone();
            let entry = AuditEntry {
                actor: Actor::Guest,
                kind: AuditKind::Info,
                price: offer.price,
                currency: offer.currency,
                note: Some("offer accepted by the guest".into()),
                at: now,
            };
            offer.push_entry(entry);
            tx::put_offer(tree, &offer)?;

            request.status = RequestStatus::Accepted;
            tx::put_request(tree, &request)?;
            Ok(offer)
        })?;

        tracing::info!(offer_id = %offer.id, request_id = %offer.request_id, "offer accepted");
        Ok(offer)
    }

    pub fn request(&self, request_id: &str) -> Result<Request, WorkflowError> {
        self.store.request(request_id)?.ok_or_else(|| {
            WorkflowError::NotFound(format!("request {request_id} does not exist"))
        })
    }

    pub fn offers(&self, request_id: &str) -> Result<Vec<Offer>, WorkflowError> {
        self.store.offers(request_id)
    }

    pub fn requests_for_owner(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<Request>, WorkflowError> {
        let caller = Self::require_auth(identity)?;
        self.store.requests_for_owner(&caller.user_id)
    }

    fn fetch_offer(
        tree: &sled::transaction::TransactionalTree,
        offer_id: &str,
    ) -> Result<Offer, sled::transaction::ConflictableTransactionError<WorkflowError>> {
        tx::offer(tree, offer_id)?.ok_or_else(|| {
            store::abort(WorkflowError::NotFound(format!(
                "offer {offer_id} does not exist"
            )))
        })
    }

    fn verify_request_owner(
        tree: &sled::transaction::TransactionalTree,
        request_id: &str,
        caller: &Identity,
    ) -> Result<Request, sled::transaction::ConflictableTransactionError<WorkflowError>> {
        let request = tx::request(tree, request_id)?.ok_or_else(|| {
            store::abort(WorkflowError::NotFound(format!(
                "request {request_id} does not exist"
            )))
        })?;
        if request.guest_id.as_deref() != Some(caller.user_id.as_str()) {
            return Err(store::abort(WorkflowError::PermissionDenied));
        }
        Ok(request)
    }
}
