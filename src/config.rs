// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
use std::path::{Path, PathBuf};

use ethers::types::{Address, H256};
use serde::Deserialize;

use crate::error::Error;

const fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("./last_block.txt")
}

const fn default_max_window() -> u64 {
    2_000
}

const fn default_tx_timeout_ms() -> u64 {
    60_000
}

/// BridgeRelayerConfig is the configuration for the bridge relayer.
///
/// Keys are recognized verbatim in the config file and, upper-cased with a
/// `LOCKBRIDGE_` prefix, in the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeRelayerConfig {
    /// Http(s) endpoint of the source chain, the one emitting lock events.
    pub source_rpc_url: url::Url,
    /// Http(s) endpoint of the destination chain, the one accepting releases.
    pub destination_rpc_url: url::Url,
    /// Address of the bridge contract emitting `TokensLocked` on the source
    /// chain.
    pub source_bridge_address: Address,
    /// Address of the bridge contract accepting `releaseTokens` on the
    /// destination chain.
    pub destination_bridge_address: Address,
    /// The private key of the release authority on the destination chain.
    /// The format is dynamic:
    ///
    /// 1. if it starts with '0x' then this would be a raw (32 bytes) hex
    ///    encoded private key.
    ///    Example: 0x8917174396171783496173419137618235192359106130478137647163400318
    ///
    /// 2. if it starts with '$' then it would be considered as an Enviroment
    ///    variable of a hex-encoded private key.
    ///    Example: $LOCKBRIDGE_PRIVATE_KEY
    pub signer_secret_key: PrivateKey,
    /// Sleep between scanner ticks once the relayer is caught up with the
    /// source chain head, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Filesystem path of the block checkpoint file.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
    /// The maximum number of blocks to scan in one log query.
    #[serde(default = "default_max_window")]
    pub max_window: u64,
    /// Upper bound on awaiting one release receipt, in milliseconds.
    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,
}

/// A 32-byte secret scalar, deserialized from a hex literal or an
/// environment variable indirection.
#[derive(Clone)]
pub struct PrivateKey(H256);

impl std::ops::Deref for PrivateKey {
    type Target = H256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PrivateKey").finish()
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PrivateKeyVistor;
        impl<'de> serde::de::Visitor<'de> for PrivateKeyVistor {
            type Value = H256;

            fn expecting(
                &self,
                formatter: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                formatter.write_str(
                    "hex string or an env var containing a hex string in it",
                )
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if let Some(hex_value) = value.strip_prefix("0x") {
                    parse_secret_hex(hex_value).map_err(|e| {
                        serde::de::Error::custom(format!(
                            "{} but got {}",
                            e, value,
                        ))
                    })
                } else if let Some(var) = value.strip_prefix('$') {
                    tracing::trace!("Reading {} from env", var);
                    let val = std::env::var(var).map_err(|e| {
                        serde::de::Error::custom(format!(
                            "error while loading this env {}: {}",
                            var, e,
                        ))
                    })?;
                    let hex_value =
                        val.strip_prefix("0x").unwrap_or(val.as_str());
                    parse_secret_hex(hex_value).map_err(|e| {
                        serde::de::Error::custom(format!(
                            "{} in the {} env var",
                            e, var,
                        ))
                    })
                } else {
                    Err(serde::de::Error::custom(
                        "expected a 0x-prefixed hex key or a $VAR env reference",
                    ))
                }
            }
        }

        let secret = deserializer.deserialize_str(PrivateKeyVistor)?;
        Ok(Self(secret))
    }
}

fn parse_secret_hex(value: &str) -> Result<H256, &'static str> {
    let bytes = hex::decode(value)
        .map_err(|_| "expected a 64 chars hex string")?;
    if bytes.len() != 32 {
        return Err("expected a 32 bytes (64 chars hex) private key");
    }
    Ok(H256::from_slice(&bytes))
}

/// Loads the configuration from the given file, overlaying any
/// `LOCKBRIDGE_*` environment variables on top of it.
pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<BridgeRelayerConfig> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let format = match ext {
        "toml" => config::FileFormat::Toml,
        "json" => config::FileFormat::Json,
        _ => {
            return Err(Error::Generic(
                "unknown config file format, expected .toml or .json",
            ))
        }
    };
    let mut cfg = config::Config::new();
    cfg.merge(config::File::from(path.to_path_buf()).format(format))?;
    cfg.merge(config::Environment::with_prefix("LOCKBRIDGE"))?;
    let config: Result<
        BridgeRelayerConfig,
        serde_path_to_error::Error<config::ConfigError>,
    > = serde_path_to_error::deserialize(cfg);
    match config {
        Ok(c) => postloading_process(c),
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

// The postloading_process exists to validate configuration and standardize
// the format of the configuration
fn postloading_process(
    config: BridgeRelayerConfig,
) -> crate::Result<BridgeRelayerConfig> {
    tracing::trace!("Checking configration sanity ...");
    if config.max_window == 0 {
        return Err(Error::Generic("max_window must be at least 1 block"));
    }
    if config.poll_interval_ms == 0 {
        return Err(Error::Generic("poll_interval_ms must be non-zero"));
    }
    if config.source_rpc_url == config.destination_rpc_url {
        tracing::warn!(
            "source and destination point at the same endpoint ({}); \
             a one-way bridge usually spans two chains",
            config.source_rpc_url,
        );
    }
    if config.source_bridge_address == Address::zero()
        || config.destination_bridge_address == Address::zero()
    {
        return Err(Error::Generic("bridge addresses must not be zero"));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn write_config(contents: &str, ext: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut f =
            std::fs::File::create(dir.path().join(format!("config.{}", ext)))
                .unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        dir
    }

    fn minimal_toml(key: &str) -> String {
        format!(
            r#"
            source_rpc_url = "http://localhost:8545"
            destination_rpc_url = "http://localhost:8546"
            source_bridge_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            destination_bridge_address = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
            signer_secret_key = "{}"
            "#,
            key
        )
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = write_config(&minimal_toml(TEST_KEY), "toml");
        let config = load(dir.path().join("config.toml")).unwrap();
        assert_eq!(config.poll_interval_ms, 5_000);
        assert_eq!(config.max_window, 2_000);
        assert_eq!(config.tx_timeout_ms, 60_000);
        assert_eq!(config.checkpoint_path, PathBuf::from("./last_block.txt"));
        assert_eq!(
            config.signer_secret_key.as_bytes(),
            hex::decode(&TEST_KEY[2..]).unwrap().as_slice(),
        );
    }

    #[test]
    fn loads_json_config() {
        let dir = write_config(
            &format!(
                r#"{{
                    "source_rpc_url": "http://localhost:8545",
                    "destination_rpc_url": "http://localhost:8546",
                    "source_bridge_address": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
                    "destination_bridge_address": "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
                    "signer_secret_key": "{}",
                    "poll_interval_ms": 1000
                }}"#,
                TEST_KEY
            ),
            "json",
        );
        let config = load(dir.path().join("config.json")).unwrap();
        assert_eq!(config.poll_interval_ms, 1_000);
    }

    #[test]
    fn reads_secret_key_from_env() {
        std::env::set_var("RELAYER_TEST_SECRET", TEST_KEY);
        let dir = write_config(&minimal_toml("$RELAYER_TEST_SECRET"), "toml");
        let config = load(dir.path().join("config.toml")).unwrap();
        assert_eq!(
            config.signer_secret_key.as_bytes(),
            hex::decode(&TEST_KEY[2..]).unwrap().as_slice(),
        );
    }

    #[test]
    fn rejects_malformed_secret_key() {
        let dir = write_config(&minimal_toml("0xdeadbeef"), "toml");
        assert!(load(dir.path().join("config.toml")).is_err());
    }

    #[test]
    fn rejects_zero_scan_window() {
        let contents =
            format!("{}\nmax_window = 0\n", minimal_toml(TEST_KEY));
        let dir = write_config(&contents, "toml");
        assert!(load(dir.path().join("config.toml")).is_err());
    }

    #[test]
    fn rejects_unknown_file_format() {
        let dir = write_config(&minimal_toml(TEST_KEY), "yaml");
        assert!(load(dir.path().join("config.yaml")).is_err());
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let dir = write_config(&minimal_toml(TEST_KEY), "toml");
        let config = load(dir.path().join("config.toml")).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("ac0974be"));
    }
}
