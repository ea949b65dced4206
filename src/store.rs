//! Typed access to the sled-backed lead store.
//!
//! Every record lives in the default tree under a namespaced key, encoded as
//! CBOR. Encoding and decoding happen here and nowhere else. Two secondary
//! indexes back the workflows: `claim/{digest}` maps a claim-hash to at most
//! one request id (the single-match invariant for anonymous leads), and
//! `owner/{user}/{request}` lists the requests an owner holds. A third,
//! `reqoffers/{request}`, holds the offer-id list of a request so the restart
//! cascade can enumerate offers inside a transaction and observe a consistent
//! set.

use std::sync::Arc;

use sled::Db;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};

use crate::error::WorkflowError;
use crate::offer::Offer;
use crate::request::Request;

/// Key builders. Plain string namespaces; ids never contain `/`.
pub mod keys {
    pub fn request(id: &str) -> Vec<u8> {
        format!("req/{id}").into_bytes()
    }
    pub fn offer(id: &str) -> Vec<u8> {
        format!("offer/{id}").into_bytes()
    }
    pub fn claim(digest: &str) -> Vec<u8> {
        format!("claim/{digest}").into_bytes()
    }
    pub fn request_offers(request_id: &str) -> Vec<u8> {
        format!("reqoffers/{request_id}").into_bytes()
    }
    pub fn owner(user_id: &str, request_id: &str) -> Vec<u8> {
        format!("owner/{user_id}/{request_id}").into_bytes()
    }
    pub fn owner_prefix(user_id: &str) -> Vec<u8> {
        format!("owner/{user_id}/").into_bytes()
    }
}

pub(crate) fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, WorkflowError> {
    minicbor::to_vec(value).map_err(|e| WorkflowError::Codec(e.to_string()))
}

pub(crate) fn decode<'b, T: minicbor::Decode<'b, ()>>(raw: &'b [u8]) -> Result<T, WorkflowError> {
    minicbor::decode(raw).map_err(|e| WorkflowError::Codec(e.to_string()))
}

/// Wrap an application error for use inside a transaction closure.
pub fn abort(err: WorkflowError) -> ConflictableTransactionError<WorkflowError> {
    ConflictableTransactionError::Abort(err)
}

pub struct LeadStore {
    instance: Arc<Db>,
}

impl LeadStore {
    pub fn new(instance: Arc<Db>) -> Self {
        Self { instance }
    }

    /// Run `body` as one serializable sled transaction. All reads in the
    /// closure observe a consistent snapshot and all writes commit together;
    /// on a write conflict sled re-runs the closure, so it must be free of
    /// external side effects. An [`abort`] surfaces the wrapped
    /// [`WorkflowError`] unchanged and rolls every write back.
    pub fn transaction<T>(
        &self,
        body: impl Fn(&TransactionalTree) -> ConflictableTransactionResult<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        self.instance.transaction(body).map_err(|e| match e {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => WorkflowError::Storage(err),
        })
    }

    pub fn request(&self, id: &str) -> Result<Option<Request>, WorkflowError> {
        match self.instance.get(keys::request(id))? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn offer(&self, id: &str) -> Result<Option<Offer>, WorkflowError> {
        match self.instance.get(keys::offer(id))? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn request_id_by_claim_hash(&self, digest: &str) -> Result<Option<String>, WorkflowError> {
        match self.instance.get(keys::claim(digest))? {
            Some(raw) => String::from_utf8(raw.to_vec())
                .map(Some)
                .map_err(|e| WorkflowError::Codec(e.to_string())),
            None => Ok(None),
        }
    }

    /// All offers of a request, in submission order.
    pub fn offers(&self, request_id: &str) -> Result<Vec<Offer>, WorkflowError> {
        let ids: Vec<String> = match self.instance.get(keys::request_offers(request_id))? {
            Some(raw) => decode(&raw)?,
            None => return Ok(vec![]),
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(offer) = self.offer(id)? {
                out.push(offer);
            }
        }
        Ok(out)
    }

    /// Requests held by an owner, most recently created first. A restarted
    /// request has its creation timestamp refreshed, so it sorts as new.
    pub fn requests_for_owner(&self, user_id: &str) -> Result<Vec<Request>, WorkflowError> {
        let mut out = Vec::new();
        for item in self.instance.scan_prefix(keys::owner_prefix(user_id)) {
            let (_, value) = item?;
            let request_id = String::from_utf8(value.to_vec())
                .map_err(|e| WorkflowError::Codec(e.to_string()))?;
            if let Some(request) = self.request(&request_id)? {
                out.push(request);
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

/// Typed helpers for use inside a transaction closure.
pub mod tx {
    use super::*;

    pub fn request(
        tree: &TransactionalTree,
        id: &str,
    ) -> ConflictableTransactionResult<Option<Request>, WorkflowError> {
        match tree.get(keys::request(id))? {
            Some(raw) => decode(&raw).map(Some).map_err(abort),
            None => Ok(None),
        }
    }

    pub fn put_request(
        tree: &TransactionalTree,
        request: &Request,
    ) -> ConflictableTransactionResult<(), WorkflowError> {
        let raw = encode(request).map_err(abort)?;
        tree.insert(keys::request(&request.id), raw)?;
        Ok(())
    }

    pub fn offer(
        tree: &TransactionalTree,
        id: &str,
    ) -> ConflictableTransactionResult<Option<Offer>, WorkflowError> {
        match tree.get(keys::offer(id))? {
            Some(raw) => decode(&raw).map(Some).map_err(abort),
            None => Ok(None),
        }
    }

    pub fn put_offer(
        tree: &TransactionalTree,
        offer: &Offer,
    ) -> ConflictableTransactionResult<(), WorkflowError> {
        let raw = encode(offer).map_err(abort)?;
        tree.insert(keys::offer(&offer.id), raw)?;
        Ok(())
    }

    pub fn offer_ids(
        tree: &TransactionalTree,
        request_id: &str,
    ) -> ConflictableTransactionResult<Vec<String>, WorkflowError> {
        match tree.get(keys::request_offers(request_id))? {
            Some(raw) => decode(&raw).map_err(abort),
            None => Ok(vec![]),
        }
    }

    pub fn put_offer_ids(
        tree: &TransactionalTree,
        request_id: &str,
        ids: &Vec<String>,
    ) -> ConflictableTransactionResult<(), WorkflowError> {
        let raw = encode(ids).map_err(abort)?;
        tree.insert(keys::request_offers(request_id), raw)?;
        Ok(())
    }
}
