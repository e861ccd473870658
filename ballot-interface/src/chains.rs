//! Networks the client is allowed to connect to.

/// A network the voting contract may be deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedChain {
    /// EIP-155 chain id.
    pub id: u64,
    /// Human readable network name.
    pub name: &'static str,
}

/// Ethereum mainnet.
pub const MAINNET: SupportedChain = SupportedChain {
    id: 1,
    name: "Ethereum",
};

/// Sepolia testnet.
pub const SEPOLIA: SupportedChain = SupportedChain {
    id: 11_155_111,
    name: "Sepolia",
};

/// BNB Smart Chain testnet.
pub const BSC_TESTNET: SupportedChain = SupportedChain {
    id: 97,
    name: "BNB Smart Chain Testnet",
};

/// Local development node (anvil, hardhat).
pub const LOCALHOST: SupportedChain = SupportedChain {
    id: 31_337,
    name: "Localhost",
};

/// All networks the client accepts.
pub const SUPPORTED_CHAINS: [SupportedChain; 4] = [MAINNET, SEPOLIA, BSC_TESTNET, LOCALHOST];

/// Looks up a supported network by chain id.
pub fn supported_chain(chain_id: u64) -> Option<SupportedChain> {
    SUPPORTED_CHAINS
        .iter()
        .copied()
        .find(|chain| chain.id == chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(Some(SEPOLIA), supported_chain(11_155_111));
        assert_eq!(Some(BSC_TESTNET), supported_chain(97));
        assert_eq!(None, supported_chain(5));
    }
}
