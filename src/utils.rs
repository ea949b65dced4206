//! Identifier helpers.

use bech32::Bech32m;
use uuid7::uuid7;

pub const REQUEST_HRP: &str = "req";
pub const OFFER_HRP: &str = "offer";
pub const USER_HRP: &str = "user";
pub const HOTEL_HRP: &str = "hotel";

// construct a unique record id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}
