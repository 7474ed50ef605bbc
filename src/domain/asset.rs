//! The assets a caller asks to migrate out of the COA. Addresses and amounts
//! are kept as received so that validation happens in one place, right before
//! encoding.

use serde::{Deserialize, Serialize};

/// The full list of assets to migrate in one batch.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Assets {
    #[serde(default)]
    pub erc20: Vec<Erc20>,
    #[serde(default)]
    pub erc721: Vec<Erc721>,
    #[serde(default)]
    pub erc1155: Vec<Erc1155>,
}

/// A fungible token amount. The zero address denotes native FLOW.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Erc20 {
    pub address: String,
    /// Human readable decimal amount, e.g. `"0.05"`.
    pub amount: String,
    /// Token decimals used to scale `amount`. Defaults to 18.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Erc721 {
    pub address: String,
    pub id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Erc1155 {
    pub address: String,
    pub id: String,
    /// Integral number of units.
    pub amount: String,
}

/// A reference to a single asset of an [`Assets`] list.
#[derive(Clone, Copy, Debug)]
pub enum Asset<'a> {
    Erc20(&'a Erc20),
    Erc721(&'a Erc721),
    Erc1155(&'a Erc1155),
}

impl Assets {
    /// Total number of assets across all standards.
    pub fn len(&self) -> usize {
        self.erc20.len() + self.erc721.len() + self.erc1155.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all assets in batch order: ERC20 entries first, then
    /// ERC721, then ERC1155, each in input order.
    pub fn iter(&self) -> impl Iterator<Item = Asset<'_>> {
        self.erc20
            .iter()
            .map(Asset::Erc20)
            .chain(self.erc721.iter().map(Asset::Erc721))
            .chain(self.erc1155.iter().map(Asset::Erc1155))
    }
}

impl Asset<'_> {
    pub fn address(&self) -> &str {
        match self {
            Asset::Erc20(asset) => &asset.address,
            Asset::Erc721(asset) => &asset.address,
            Asset::Erc1155(asset) => &asset.address,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Asset::Erc20(_) => None,
            Asset::Erc721(asset) => Some(&asset.id),
            Asset::Erc1155(asset) => Some(&asset.id),
        }
    }

    pub fn amount(&self) -> Option<&str> {
        match self {
            Asset::Erc20(asset) => Some(&asset.amount),
            Asset::Erc721(_) => None,
            Asset::Erc1155(asset) => Some(&asset.amount),
        }
    }

    pub fn standard(&self) -> Standard {
        match self {
            Asset::Erc20(_) => Standard::Erc20,
            Asset::Erc721(_) => Standard::Erc721,
            Asset::Erc1155(_) => Standard::Erc1155,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Standard {
    Erc20,
    Erc721,
    Erc1155,
}

impl Standard {
    pub fn as_str(self) -> &'static str {
        match self {
            Standard::Erc20 => "erc20",
            Standard::Erc721 => "erc721",
            Standard::Erc1155 => "erc1155",
        }
    }
}
