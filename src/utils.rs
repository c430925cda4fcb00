//! Utility functions for identifiers

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Human readable prefixes for each record kind.
pub mod hrp {
    pub const USER: &str = "user_";
    pub const REPORT: &str = "report_";
    pub const MESSAGE: &str = "msg_";
    pub const FILE: &str = "file_";
}

/// Fresh id for a record kind. The prefixes above are known-valid, so a
/// failure here only comes from the encoder itself.
pub(crate) fn new_id(hrp: &str) -> crate::error::Result<String> {
    new_uuid_to_bech32(hrp).map_err(|e| crate::error::Error::Dependency(e.to_string()))
}
