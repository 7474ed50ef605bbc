//! Encoding of asset transfers into EVM calls executed by the COA.
//!
//! The resulting [`CallBatch`] is three index-aligned arrays (targets,
//! values and calldata) with exactly one entry per migrated asset, in batch
//! order (see [`asset::Assets::iter`]). Every asset is validated before the
//! first entry is encoded, so a single invalid asset fails the whole batch.

use {
    crate::{
        domain::{
            asset::{self, Assets},
            eth::{self, Address, U256},
        },
        util::conv,
    },
    alloy::{sol, sol_types::SolCall},
};

sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }

    interface IERC721 {
        function safeTransferFrom(address from, address to, uint256 tokenId) external;
    }

    interface IERC1155 {
        function safeTransferFrom(
            address from,
            address to,
            uint256 id,
            uint256 value,
            bytes data
        ) external;
    }
}

/// Parallel arrays describing the EVM calls of one migration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CallBatch {
    pub addresses: Vec<Address>,
    pub values: Vec<U256>,
    pub datas: Vec<Vec<u8>>,
}

impl CallBatch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            addresses: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            datas: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, address: Address, value: U256, data: Vec<u8>) {
        self.addresses.push(address);
        self.values.push(value);
        self.datas.push(data);
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Iterates over `(target, value, calldata)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &U256, &[u8])> {
        self.addresses
            .iter()
            .zip(&self.values)
            .zip(&self.datas)
            .map(|((address, value), data)| (address, value, data.as_slice()))
    }
}

/// ABI-encodes `transfer(receiver, amount)`. The amount is in token base
/// units and must be positive.
pub fn encode_erc20_transfer(receiver: Address, amount: U256) -> Result<Vec<u8>, Error> {
    if amount.is_zero() {
        return Err(Error::InvalidAmount(amount.to_string()));
    }
    Ok(IERC20::transferCall {
        to: receiver,
        amount,
    }
    .abi_encode())
}

/// ABI-encodes `safeTransferFrom(sender, receiver, id)` of an ERC721 token.
pub fn encode_erc721_transfer(sender: Address, receiver: Address, id: U256) -> Vec<u8> {
    IERC721::safeTransferFromCall {
        from: sender,
        to: receiver,
        tokenId: id,
    }
    .abi_encode()
}

/// ABI-encodes `safeTransferFrom(sender, receiver, id, amount, "")` of an
/// ERC1155 token. The amount must be positive.
pub fn encode_erc1155_transfer(
    sender: Address,
    receiver: Address,
    id: U256,
    amount: U256,
) -> Result<Vec<u8>, Error> {
    if amount.is_zero() {
        return Err(Error::InvalidAmount(amount.to_string()));
    }
    Ok(IERC1155::safeTransferFromCall {
        from: sender,
        to: receiver,
        id,
        value: amount,
        data: Default::default(),
    }
    .abi_encode())
}

/// Decodes a hex string with optional `0x` prefix. `"0x"` decodes to an
/// empty byte array.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(hex.strip_prefix("0x").unwrap_or(hex))
}

/// Builds the call batch moving `assets` from the COA (`sender`) to
/// `receiver`.
pub fn build_batch(
    assets: &Assets,
    sender: Address,
    receiver: Address,
) -> Result<CallBatch, Error> {
    let transfers = assets
        .iter()
        .map(Transfer::validate)
        .collect::<Result<Vec<_>, _>>()?;

    let mut batch = CallBatch::with_capacity(transfers.len());
    for transfer in transfers {
        match transfer {
            Transfer::Native { amount } => batch.push(receiver, amount, Vec::new()),
            Transfer::Erc20 { token, amount } => {
                batch.push(token, U256::ZERO, encode_erc20_transfer(receiver, amount)?)
            }
            Transfer::Erc721 { token, id } => batch.push(
                token,
                U256::ZERO,
                encode_erc721_transfer(sender, receiver, id),
            ),
            Transfer::Erc1155 { token, id, amount } => batch.push(
                token,
                U256::ZERO,
                encode_erc1155_transfer(sender, receiver, id, amount)?,
            ),
        }
    }
    Ok(batch)
}

/// A validated asset transfer with parsed addresses and amounts.
enum Transfer {
    Native {
        amount: U256,
    },
    Erc20 {
        token: Address,
        amount: U256,
    },
    Erc721 {
        token: Address,
        id: U256,
    },
    Erc1155 {
        token: Address,
        id: U256,
        amount: U256,
    },
}

impl Transfer {
    fn validate(asset: asset::Asset) -> Result<Self, Error> {
        let token = eth::validate(asset.address())?;
        Ok(match asset {
            asset::Asset::Erc20(erc20) if token == eth::NATIVE_TOKEN => Self::Native {
                amount: parse_amount(&erc20.amount, eth::NATIVE_DECIMALS)?,
            },
            asset::Asset::Erc20(erc20) => Self::Erc20 {
                token,
                amount: parse_amount(
                    &erc20.amount,
                    erc20.decimals.unwrap_or(eth::NATIVE_DECIMALS),
                )?,
            },
            asset::Asset::Erc721(erc721) => Self::Erc721 {
                token,
                id: parse_id(&erc721.id)?,
            },
            asset::Asset::Erc1155(erc1155) => Self::Erc1155 {
                token,
                id: parse_id(&erc1155.id)?,
                amount: parse_amount(&erc1155.amount, 0)?,
            },
        })
    }
}

/// Scales a positive decimal amount to base units.
fn parse_amount(amount: &str, decimals: u8) -> Result<U256, Error> {
    let invalid = || Error::InvalidAmount(amount.to_owned());
    let decimal = amount.trim().parse().map_err(|_| invalid())?;
    let units = conv::decimal_to_units(&decimal, decimals).ok_or_else(invalid)?;
    if units.is_zero() {
        return Err(invalid());
    }
    Ok(units)
}

/// Token ids are non-empty decimal integers.
fn parse_id(id: &str) -> Result<U256, Error> {
    let invalid = || Error::InvalidId(id.to_owned());
    let digits = id.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidAddress(#[from] eth::InvalidAddress),
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    #[error("invalid token id {0:?}")]
    InvalidId(String),
}
