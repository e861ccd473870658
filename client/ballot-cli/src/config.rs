use std::path::Path;

use anyhow::Context;
use ballot_evm_adapter::{EvmConfig, LocalWallet};
use ballot_interface::Address;
use ballot_sync::config::from_toml_path;
use ballot_sync::SyncConfig;
use serde::Deserialize;

/// Environment variable holding the hex encoded signing key.
pub const PRIVATE_KEY_VAR: &str = "BALLOT_PRIVATE_KEY";

/// Configuration of the `ballot` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Node and contract.
    pub chain: EvmConfig,
    /// Synchronizer settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl ClientConfig {
    /// Loads the configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        from_toml_path(path)
            .with_context(|| format!("Failed to read client configuration from {path:?}"))
    }

    /// Replaces the configured endpoint and contract with the ones given on the command line
    /// or in the environment.
    pub fn apply_overrides(&mut self, rpc_url: Option<String>, contract_address: Option<Address>) {
        if let Some(rpc_url) = rpc_url {
            self.chain.rpc_url = rpc_url;
        }
        if let Some(contract_address) = contract_address {
            self.chain.contract_address = contract_address;
        }
    }
}

/// Reads the signing key from [`PRIVATE_KEY_VAR`].
pub fn signing_key() -> anyhow::Result<LocalWallet> {
    let key = std::env::var(PRIVATE_KEY_VAR)
        .with_context(|| format!("{PRIVATE_KEY_VAR} must be set to sign transactions"))?;
    parse_signing_key(&key)
}

fn parse_signing_key(key: &str) -> anyhow::Result<LocalWallet> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    key.parse::<LocalWallet>()
        .with_context(|| format!("{PRIVATE_KEY_VAR} is not a valid private key"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ballot_interface::address::parse_address;
    use ethers_signers::Signer;
    use tempfile::NamedTempFile;

    use super::*;

    fn create_config_from(content: &str) -> NamedTempFile {
        let mut config_file = NamedTempFile::new().unwrap();
        config_file.write_all(content.as_bytes()).unwrap();
        config_file
    }

    #[test]
    fn test_correct_config() {
        let config = r#"
            [chain]
            rpc_url = "http://localhost:8545"
            chain_id = 11155111
            contract_address = "0x98E97B7852e5F439f9119756B9803b0EA480b53F"
            legacy_transactions = true

            [sync]
            block_poll_interval_ms = 2000
        "#;

        let config_file = create_config_from(config);
        let config = ClientConfig::load(config_file.path()).unwrap();

        let expected = ClientConfig {
            chain: EvmConfig {
                rpc_url: "http://localhost:8545".to_string(),
                chain_id: 11_155_111,
                contract_address: parse_address("0x98e97b7852e5f439f9119756b9803b0ea480b53f")
                    .unwrap(),
                receipt_poll_interval_ms: 1000,
                legacy_transactions: true,
            },
            sync: SyncConfig {
                block_poll_interval_ms: 2000,
                soft_warning_after_failures: 3,
            },
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn test_sync_section_is_optional() {
        let config = r#"
            [chain]
            rpc_url = "http://localhost:8545"
            chain_id = 31337
            contract_address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        "#;

        let config_file = create_config_from(config);
        let config = ClientConfig::load(config_file.path()).unwrap();
        assert_eq!(SyncConfig::default(), config.sync);
    }

    #[test]
    fn test_missing_chain_section() {
        let config_file = create_config_from("[sync]\nblock_poll_interval_ms = 1\n");
        let err = ClientConfig::load(config_file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read client configuration"));
    }

    #[test]
    fn test_overrides() {
        let config_file = create_config_from(
            r#"
            [chain]
            rpc_url = "http://localhost:8545"
            chain_id = 31337
            contract_address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        "#,
        );
        let mut config = ClientConfig::load(config_file.path()).unwrap();

        config.apply_overrides(None, None);
        assert_eq!("http://localhost:8545", config.chain.rpc_url);

        let contract = Address::repeat_byte(9);
        config.apply_overrides(Some("https://rpc.sepolia.org".to_string()), Some(contract));
        assert_eq!("https://rpc.sepolia.org", config.chain.rpc_url);
        assert_eq!(contract, config.chain.contract_address);
    }

    #[test]
    fn test_parse_signing_key() {
        // First default account of local development nodes.
        let key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let wallet = parse_signing_key(key).unwrap();
        assert_eq!(
            parse_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap(),
            wallet.address()
        );
        assert!(parse_signing_key("not a key").is_err());
    }
}
