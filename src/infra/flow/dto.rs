//! DTOs for the Flow Access REST API. Full documentation for the API can be
//! found [here](https://developers.flow.com/http-api).

use {
    crate::{domain::flow, util::serialize},
    serde::{Deserialize, Serialize},
    serde_with::{DisplayFromStr, serde_as},
};

#[derive(Debug, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct BlockHeader {
    #[serde_as(as = "serialize::Hex")]
    pub id: Vec<u8>,
    #[serde_as(as = "DisplayFromStr")]
    pub height: u64,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub keys: Vec<AccountKey>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct AccountKey {
    #[serde_as(as = "DisplayFromStr")]
    pub index: u32,
    #[serde_as(as = "DisplayFromStr")]
    pub sequence_number: u64,
    #[serde(default)]
    pub revoked: bool,
}

/// A signed transaction as submitted to `POST /v1/transactions`.
#[serde_as]
#[derive(Debug, Serialize)]
pub struct Transaction {
    #[serde_as(as = "serialize::Base64")]
    pub script: Vec<u8>,
    #[serde_as(as = "Vec<serialize::Base64>")]
    pub arguments: Vec<Vec<u8>>,
    #[serde_as(as = "serialize::Hex")]
    pub reference_block_id: Vec<u8>,
    #[serde_as(as = "DisplayFromStr")]
    pub gas_limit: u64,
    #[serde_as(as = "Address")]
    pub payer: flow::Address,
    pub proposal_key: ProposalKey,
    #[serde_as(as = "Vec<Address>")]
    pub authorizers: Vec<flow::Address>,
    pub payload_signatures: Vec<Signature>,
    pub envelope_signatures: Vec<Signature>,
}

#[serde_as]
#[derive(Debug, Serialize)]
pub struct ProposalKey {
    #[serde_as(as = "Address")]
    pub address: flow::Address,
    #[serde_as(as = "DisplayFromStr")]
    pub key_index: u32,
    #[serde_as(as = "DisplayFromStr")]
    pub sequence_number: u64,
}

#[serde_as]
#[derive(Debug, Serialize)]
pub struct Signature {
    #[serde_as(as = "Address")]
    pub address: flow::Address,
    #[serde_as(as = "DisplayFromStr")]
    pub key_index: u32,
    #[serde_as(as = "serialize::Base64")]
    pub signature: Vec<u8>,
}

impl From<&flow::AccountKey> for Signature {
    fn from(key: &flow::AccountKey) -> Self {
        Self {
            address: key.address,
            key_index: key.key_index,
            signature: Vec::new(),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct SubmittedTransaction {
    #[serde_as(as = "DisplayFromStr")]
    pub id: flow::TransactionId,
}

#[derive(Debug, Deserialize)]
pub struct TransactionResult {
    pub status: Status,
    #[serde(default)]
    pub status_code: u32,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub enum Status {
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
    #[serde(other)]
    Unknown,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    /// JSON-Cadence encoded event value.
    #[serde_as(as = "serialize::Base64")]
    pub payload: Vec<u8>,
}

/// Error body returned by the access node for non-success responses.
#[derive(Debug, Deserialize)]
pub struct Error {
    pub code: u16,
    pub message: String,
}

impl TransactionResult {
    pub fn into_domain(self) -> Result<flow::TransactionResult, MalformedEvent> {
        Ok(flow::TransactionResult {
            status: match self.status {
                Status::Unknown => flow::Status::Unknown,
                Status::Pending => flow::Status::Pending,
                Status::Finalized => flow::Status::Finalized,
                Status::Executed => flow::Status::Executed,
                Status::Sealed => flow::Status::Sealed,
                Status::Expired => flow::Status::Expired,
            },
            status_code: self.status_code,
            error_message: Some(self.error_message).filter(|message| !message.is_empty()),
            events: self
                .events
                .into_iter()
                .map(Event::into_domain)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl Event {
    /// Converts the event, decoding the execution outcome of
    /// `EVM.TransactionExecuted` events. The payloads of other events are
    /// not needed and dropped.
    pub fn into_domain(self) -> Result<flow::Event, MalformedEvent> {
        let execution = if self.kind.ends_with(flow::Event::EVM_TRANSACTION_EXECUTED) {
            let event = serde_json::from_slice::<cadence::Event>(&self.payload)
                .map_err(|err| MalformedEvent(self.kind.clone(), err.to_string()))?;
            Some(
                event
                    .execution()
                    .map_err(|field| MalformedEvent(self.kind.clone(), field))?,
            )
        } else {
            None
        };
        Ok(flow::Event {
            kind: self.kind,
            execution,
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed {0} event: {1}")]
pub struct MalformedEvent(String, String);

/// Serializes Flow addresses the way the REST API expects them: hex
/// without `0x` prefix.
struct Address;

impl serde_with::SerializeAs<flow::Address> for Address {
    fn serialize_as<S: serde::Serializer>(
        value: &flow::Address,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value.0))
    }
}

/// JSON-Cadence encoded event values.
mod cadence {
    use {crate::domain::flow, serde::Deserialize, serde_json::Value};

    #[derive(Debug, Deserialize)]
    pub struct Event {
        value: Composite,
    }

    #[derive(Debug, Deserialize)]
    struct Composite {
        fields: Vec<Field>,
    }

    #[derive(Debug, Deserialize)]
    struct Field {
        name: String,
        value: Typed,
    }

    #[derive(Debug, Deserialize)]
    struct Typed {
        #[serde(default)]
        value: Value,
    }

    impl Event {
        fn field(&self, name: &str) -> Option<&Value> {
            self.value
                .fields
                .iter()
                .find(|field| field.name == name)
                .map(|field| &field.value.value)
        }

        /// Extracts the outcome of an `EVM.TransactionExecuted` event. Fails
        /// with the name of a missing or malformed field.
        pub fn execution(&self) -> Result<flow::Execution, String> {
            let error_code = self
                .field("errorCode")
                .and_then(integer)
                .ok_or_else(|| "errorCode".to_owned())?;
            let error_message = self
                .field("errorMessage")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_owned);
            let gas_consumed = self.field("gasConsumed").and_then(integer);
            Ok(flow::Execution {
                error_code,
                error_message,
                gas_consumed,
            })
        }
    }

    /// JSON-Cadence encodes integers as strings, but numbers are accepted as
    /// well.
    fn integer(value: &Value) -> Option<u64> {
        match value {
            Value::Number(number) => number.as_u64(),
            Value::String(string) => string.parse().ok(),
            _ => None,
        }
    }
}
