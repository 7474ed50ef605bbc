use super::Address;

/// Validates the textual format of an EVM address and parses it.
///
/// The address must be `0x` followed by exactly 40 hexadecimal digits. Mixed
/// case is accepted and the EIP-55 checksum is not enforced.
pub fn validate(address: &str) -> Result<Address, InvalidAddress> {
    let invalid = || InvalidAddress(address.to_owned());
    let digits = address.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid EVM address {0:?}")]
pub struct InvalidAddress(pub String);
