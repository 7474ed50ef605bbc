//! Canonical RLP encoding of Flow transactions and the messages signed by
//! its authorizations.

use {
    crate::domain::flow,
    alloy::rlp::{Encodable, Header},
};

/// Prefix of every signed transaction message: `"FLOW-V0.0-transaction"`
/// right-padded with zeros to 32 bytes.
pub const TRANSACTION_DOMAIN_TAG: [u8; 32] = domain_tag(b"FLOW-V0.0-transaction");

const fn domain_tag(tag: &[u8]) -> [u8; 32] {
    let mut padded = [0; 32];
    let mut i = 0;
    while i < tag.len() {
        padded[i] = tag[i];
        i += 1;
    }
    padded
}

/// The proposal key of a transaction, including the sequence number it is
/// expected to have when the transaction executes.
#[derive(Clone, Copy, Debug)]
pub struct ProposalKey {
    pub key: flow::AccountKey,
    pub sequence_number: u64,
}

/// The part of a transaction covered by the payload signatures.
#[derive(Clone, Debug)]
pub struct Payload {
    pub script: Vec<u8>,
    pub arguments: Vec<Vec<u8>>,
    pub reference_block: [u8; 32],
    pub gas_limit: u64,
    pub proposal_key: ProposalKey,
    pub payer: flow::Address,
    pub authorizers: Vec<flow::Address>,
}

/// A signature attached to a transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    /// Position of the signing account in [`Payload::signers`].
    pub signer_index: usize,
    pub key: flow::AccountKey,
    pub signature: Vec<u8>,
}

impl Payload {
    /// The distinct accounts involved in the transaction: the proposer, the
    /// payer and the authorizers, in that order. Signatures reference
    /// accounts by their position in this list.
    pub fn signers(&self) -> Vec<flow::Address> {
        let mut signers = Vec::with_capacity(self.authorizers.len() + 2);
        let all = [self.proposal_key.key.address, self.payer]
            .into_iter()
            .chain(self.authorizers.iter().copied());
        for address in all {
            if !signers.contains(&address) {
                signers.push(address);
            }
        }
        signers
    }

    /// Index of `address` in [`Payload::signers`].
    pub fn signer_index(&self, address: flow::Address) -> Option<usize> {
        self.signers().iter().position(|signer| *signer == address)
    }

    pub fn rlp(&self) -> Vec<u8> {
        list(|out| {
            self.script.as_slice().encode(out);
            list(|out| {
                for argument in &self.arguments {
                    argument.as_slice().encode(out);
                }
            })
            .encode_raw(out);
            self.reference_block.encode(out);
            self.gas_limit.encode(out);
            self.proposal_key.key.address.0.encode(out);
            u64::from(self.proposal_key.key.key_index).encode(out);
            self.proposal_key.sequence_number.encode(out);
            self.payer.0.encode(out);
            list(|out| {
                for authorizer in &self.authorizers {
                    authorizer.0.encode(out);
                }
            })
            .encode_raw(out);
        })
        .0
    }

    /// The message signed by every authorization except the payer's.
    pub fn message(&self) -> Vec<u8> {
        tagged(&self.rlp())
    }

    /// The RLP encoding of the payload together with its signatures.
    /// Signatures are encoded in the given order.
    pub fn envelope_rlp(&self, payload_signatures: &[Signature]) -> Vec<u8> {
        list(|out| {
            Raw(self.rlp()).encode_raw(out);
            list(|out| {
                for signature in payload_signatures {
                    list(|out| {
                        (signature.signer_index as u64).encode(out);
                        u64::from(signature.key.key_index).encode(out);
                        signature.signature.as_slice().encode(out);
                    })
                    .encode_raw(out);
                }
            })
            .encode_raw(out);
        })
        .0
    }

    /// The message signed by the payer.
    pub fn envelope_message(&self, payload_signatures: &[Signature]) -> Vec<u8> {
        tagged(&self.envelope_rlp(payload_signatures))
    }
}

/// Orders signatures the way Flow expects them: by signer index, then by
/// key index.
pub fn sort(signatures: &mut [Signature]) {
    signatures.sort_by_key(|signature| (signature.signer_index, signature.key.key_index));
}

fn tagged(rlp: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(TRANSACTION_DOMAIN_TAG.len() + rlp.len());
    message.extend_from_slice(&TRANSACTION_DOMAIN_TAG);
    message.extend_from_slice(rlp);
    message
}

/// Already RLP encoded bytes.
struct Raw(Vec<u8>);

impl Raw {
    fn encode_raw(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

/// Encodes the items written by `items` as an RLP list.
fn list(items: impl FnOnce(&mut Vec<u8>)) -> Raw {
    let mut payload = Vec::new();
    items(&mut payload);
    let mut out = Vec::with_capacity(payload.len() + 9);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut out);
    out.extend_from_slice(&payload);
    Raw(out)
}
