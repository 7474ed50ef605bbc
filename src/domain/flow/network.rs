use super::Address;

/// A supported Flow network.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Returns the network name as used by the payer status service.
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    /// Returns the address of the account hosting the `EVM` system contract.
    pub fn evm_contract(self) -> Address {
        match self {
            Network::Mainnet => Address([0xe4, 0x67, 0xb9, 0xdd, 0x11, 0xfa, 0x00, 0xdf]),
            Network::Testnet => Address([0x8c, 0x53, 0x03, 0xea, 0xa2, 0x62, 0x02, 0xd6]),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = UnsupportedNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            _ => Err(UnsupportedNetwork),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported network")]
pub struct UnsupportedNetwork;
