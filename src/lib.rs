//! Request-for-quote accommodation marketplace core: anonymous leads with
//! single-use claim secrets, hotel offers with an append-only audit trail,
//! and the transactional restart workflow that reopens a request while
//! cancelling its pending offers.

pub mod error;
pub mod offer;
pub mod request;
pub mod service;
pub mod store;
pub mod token;
pub mod utils;
pub mod validate;
