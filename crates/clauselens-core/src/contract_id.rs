//! Stable contract identifiers.
//!
//! An uploaded contract without a caller-supplied id is keyed by a digest of its
//! body, so identical text always maps to the same memory log.

const PREFIX: &str = "uploaded_";
const HEX_LEN: usize = 12;

/// Derive `uploaded_<12 hex chars>` from the blake3 digest of the raw text.
pub fn stable_contract_id(contract_text: &str) -> String {
    let hash = blake3::hash(contract_text.as_bytes());
    let hex = hash.to_hex();
    format!("{PREFIX}{}", &hex.as_str()[..HEX_LEN])
}
