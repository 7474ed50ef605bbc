mod address;

pub use {
    self::address::{InvalidAddress, validate},
    alloy::primitives::{Address, U256},
};

/// The address used in an asset list to denote the native FLOW token held by
/// the COA. Native transfers are plain value transfers without calldata.
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// Number of decimals of the native token on Flow EVM (attoFLOW).
pub const NATIVE_DECIMALS: u8 = 18;

