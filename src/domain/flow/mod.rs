//! Flow blockchain types used to submit and track the Cadence transaction
//! that drives the COA.

use {
    crate::util,
    std::fmt::{self, Debug, Display, Formatter},
};

mod network;

pub use self::network::{Network, UnsupportedNetwork};

/// An 8-byte Flow account address.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address(pub [u8; 8]);

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("Address")
            .field(&util::fmt::Hex(&self.0))
            .finish()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&util::fmt::Hex(&self.0), f)
    }
}

impl std::str::FromStr for Address {
    type Err = InvalidAddress;

    /// Parses a hex Flow address, with or without `0x` prefix. Short
    /// addresses are left-padded with zeros.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 16 {
            return Err(InvalidAddress(s.to_owned()));
        }
        let padded = format!("{digits:0>16}");
        let mut bytes = [0; 8];
        hex::decode_to_slice(padded, &mut bytes).map_err(|_| InvalidAddress(s.to_owned()))?;
        Ok(Self(bytes))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid Flow address {0:?}")]
pub struct InvalidAddress(pub String);

/// A key on a Flow account, identified by the account address and the key
/// index.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AccountKey {
    pub address: Address,
    pub key_index: u32,
}

impl Display for AccountKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.address, self.key_index)
    }
}

/// A Flow transaction ID.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct TransactionId(pub [u8; 32]);

impl Debug for TransactionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("TransactionId")
            .field(&format_args!("{self}"))
            .finish()
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        // Flow APIs expect transaction IDs without `0x` prefix.
        f.write_str(&hex::encode(self.0))
    }
}

impl std::str::FromStr for TransactionId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; 32];
        hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// The status of a Flow transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub enum Status {
    Unknown,
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
}

impl Status {
    /// Whether no further status transitions can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Sealed | Status::Expired)
    }
}

/// The result of a Flow transaction as reported by the access node.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionResult {
    pub status: Status,
    /// Non-zero if the Cadence transaction as a whole failed.
    pub status_code: u32,
    pub error_message: Option<String>,
    pub events: Vec<Event>,
}

impl TransactionResult {
    /// Whether the transaction was sealed without a Cadence error.
    pub fn is_successful(&self) -> bool {
        self.status == Status::Sealed && self.status_code == 0
    }
}

/// An event emitted by a Flow transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Fully qualified event type, e.g. `A.e467b9dd11fa00df.EVM.TransactionExecuted`.
    pub kind: String,
    /// Set for EVM execution events only.
    pub execution: Option<Execution>,
}

impl Event {
    pub const EVM_TRANSACTION_EXECUTED: &'static str = "EVM.TransactionExecuted";

    /// Returns the execution data if this is an `EVM.TransactionExecuted`
    /// event.
    pub fn evm_execution(&self) -> Option<&Execution> {
        if self.kind.ends_with(Self::EVM_TRANSACTION_EXECUTED) {
            self.execution.as_ref()
        } else {
            None
        }
    }
}

/// The outcome of a single EVM call executed by the COA.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Execution {
    /// Zero when the EVM call succeeded.
    pub error_code: u64,
    pub error_message: Option<String>,
    pub gas_consumed: Option<u64>,
}
