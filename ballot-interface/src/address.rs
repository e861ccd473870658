//! Client-side validation of user supplied addresses.
//!
//! This is a syntactic guard only: it rejects input that could never be an address before a
//! transaction is built, it does not say anything about what the contract will accept.
use ethers_core::utils::to_checksum;
use thiserror::Error;

use crate::Address;

const ADDRESS_PREFIX: &str = "0x";
const ADDRESS_HEX_LEN: usize = 40;

/// Reasons a string is not a well-formed address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The input does not start with `0x`.
    #[error("address must start with 0x")]
    MissingPrefix,
    /// The input contains characters that are not hexadecimal digits.
    #[error("address contains non-hexadecimal characters")]
    InvalidCharacter,
    /// The input does not have exactly 40 hexadecimal digits.
    #[error("address must have 40 hexadecimal digits, found {0}")]
    InvalidLength(usize),
    /// The input mixes upper and lower case but does not match its EIP-55 checksum.
    #[error("address checksum does not match")]
    InvalidChecksum,
}

/// Parses a `0x`-prefixed, 40 digit hexadecimal address.
///
/// All-lowercase and all-uppercase digits are accepted as is. Mixed case is treated as an
/// EIP-55 checksum and must match exactly.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let digits = input
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or(AddressError::MissingPrefix)?;

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressError::InvalidCharacter);
    }
    if digits.len() != ADDRESS_HEX_LEN {
        return Err(AddressError::InvalidLength(digits.len()));
    }

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidCharacter)?;
    let address = Address::from(bytes);

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None) != input {
        return Err(AddressError::InvalidChecksum);
    }

    Ok(address)
}

/// Formats an address with its EIP-55 checksum.
pub fn checksummed(address: &Address) -> String {
    to_checksum(address, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksummed_addresses_are_accepted() {
        for input in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
        ] {
            let address = parse_address(input).unwrap();
            assert_eq!(input, checksummed(&address));
        }
    }

    #[test]
    fn test_single_case_skips_checksum() {
        let lower = parse_address("0x52908400098527886e0f7030069857d2e4169ee7").unwrap();
        let upper = parse_address("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        assert_eq!(lower, upper);
        assert!(parse_address("0xde709f2102306220921060314715629080e2fb77").is_ok());
    }

    #[test]
    fn test_wrong_checksum_is_rejected() {
        assert_eq!(
            Err(AddressError::InvalidChecksum),
            parse_address("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
        );
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(
            Err(AddressError::MissingPrefix),
            parse_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
        );
        assert_eq!(Err(AddressError::InvalidLength(3)), parse_address("0xabc"));
        assert_eq!(
            Err(AddressError::InvalidCharacter),
            parse_address("0xzzzzb6053F3E94C9b9A09f33669435E7Ef1BeAed")
        );
        assert_eq!(Err(AddressError::MissingPrefix), parse_address(""));
    }
}
