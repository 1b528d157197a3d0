/*
 * SPDX-FileCopyrightText: Copyright (c) 2021-2024 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */
use std::ops::RangeInclusive;
use std::path::Path;

use ipam_network::blocks::{DEFAULT_IPV4_BLOCK_PREFIX_LEN, DEFAULT_IPV6_BLOCK_PREFIX_LEN};
use ipam_network::{BlockSelection, BlockSizeError, BlockSizes, IpVersion, SequentialBlocks};
use ipam_store::{IpPool, StaticPoolCatalog};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::affinity::{CoordinatorSettings, DEFAULT_MAX_RELEASE_RETRIES};

const IPV4_BLOCK_PREFIX_LENS: RangeInclusive<u8> = 20..=32;
const IPV6_BLOCK_PREFIX_LENS: RangeInclusive<u8> = 116..=128;

/// Per-claim IPAM policy, copied into every block the claim creates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpamConfig {
    #[serde(default)]
    pub strict_affinity: bool,
}

/// IPAM configuration as read from a TOML file.
///
/// ```toml
/// strict_affinity = false
/// max_release_retries = 100
/// block_selection = "sequential"
/// ipv4_block_prefix_len = 26
/// ipv6_block_prefix_len = 122
///
/// [[pools]]
/// cidr = "10.0.0.0/16"
///
/// [[pools]]
/// cidr = "fd00::/48"
/// disabled = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Whether hosts may only allocate from blocks they have affinity to.
    #[serde(default)]
    pub strict_affinity: bool,
    /// Bound on the compare-and-swap loop when releasing a block.
    #[serde(default = "Defaults::max_release_retries")]
    pub max_release_retries: u32,
    /// Order in which a pool's blocks are tried when claiming.
    #[serde(default)]
    pub block_selection: BlockSelection,
    #[serde(default = "Defaults::ipv4_block_prefix_len")]
    pub ipv4_block_prefix_len: u8,
    #[serde(default = "Defaults::ipv6_block_prefix_len")]
    pub ipv6_block_prefix_len: u8,
    #[serde(default)]
    pub pools: Vec<IpPool>,
}

pub struct Defaults;

impl Defaults {
    pub fn max_release_retries() -> u32 {
        DEFAULT_MAX_RELEASE_RETRIES
    }
    pub fn ipv4_block_prefix_len() -> u8 {
        DEFAULT_IPV4_BLOCK_PREFIX_LEN
    }
    pub fn ipv6_block_prefix_len() -> u8 {
        DEFAULT_IPV6_BLOCK_PREFIX_LEN
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file: {path}: {error}")]
    CouldNotRead { path: String, error: std::io::Error },
    #[error("Invalid TOML in config file: {path}: {error}")]
    InvalidToml {
        path: String,
        error: toml::de::Error,
    },
    #[error("Block prefix length /{prefix_len} is out of range for {version}")]
    InvalidBlockSize { version: IpVersion, prefix_len: u8 },
    #[error("max_release_retries must be at least 1")]
    InvalidRetryBound,
    #[error("Invalid pool {pool}: {error}")]
    InvalidPool { pool: IpNet, error: BlockSizeError },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_affinity: false,
            max_release_retries: Defaults::max_release_retries(),
            block_selection: BlockSelection::default(),
            ipv4_block_prefix_len: Defaults::ipv4_block_prefix_len(),
            ipv6_block_prefix_len: Defaults::ipv6_block_prefix_len(),
            pools: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = std::fs::read_to_string(path).map_err(|error| ConfigError::CouldNotRead {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        let config = toml::from_str::<Self>(&cfg).map_err(|error| ConfigError::InvalidToml {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks block sizes against the supported ranges and that every pool
    /// holds at least one block.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (version, prefix_len, allowed) in [
            (IpVersion::V4, self.ipv4_block_prefix_len, IPV4_BLOCK_PREFIX_LENS),
            (IpVersion::V6, self.ipv6_block_prefix_len, IPV6_BLOCK_PREFIX_LENS),
        ] {
            if !allowed.contains(&prefix_len) {
                return Err(ConfigError::InvalidBlockSize {
                    version,
                    prefix_len,
                });
            }
        }

        if self.max_release_retries == 0 {
            return Err(ConfigError::InvalidRetryBound);
        }

        let sizes = self.block_sizes();
        for pool in &self.pools {
            SequentialBlocks::new(&pool.cidr, sizes.prefix_len(pool.ip_version())).map_err(
                |error| ConfigError::InvalidPool {
                    pool: pool.cidr,
                    error,
                },
            )?;
        }
        Ok(())
    }

    pub fn block_sizes(&self) -> BlockSizes {
        BlockSizes {
            ipv4_prefix_len: self.ipv4_block_prefix_len,
            ipv6_prefix_len: self.ipv6_block_prefix_len,
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            block_sizes: self.block_sizes(),
            max_release_retries: self.max_release_retries,
            block_selection: self.block_selection,
        }
    }

    pub fn ipam_config(&self) -> IpamConfig {
        IpamConfig {
            strict_affinity: self.strict_affinity,
        }
    }

    /// A catalog of the configured pools, host bits cleared.
    pub fn pool_catalog(&self) -> StaticPoolCatalog {
        StaticPoolCatalog::new(
            self.pools
                .iter()
                .map(|pool| IpPool {
                    cidr: pool.cidr.trunc(),
                    disabled: pool.disabled,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.block_sizes(), BlockSizes::default());
        assert_eq!(config.coordinator_settings(), CoordinatorSettings::default());
        assert!(!config.ipam_config().strict_affinity);
        config.validate().unwrap();
    }

    #[test]
    fn test_load() {
        let file = write_config(
            r#"
strict_affinity = true
max_release_retries = 5
block_selection = "random"
ipv4_block_prefix_len = 28

[[pools]]
cidr = "10.0.0.0/16"

[[pools]]
cidr = "fd00::/120"
disabled = true
"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert!(config.ipam_config().strict_affinity);
        assert_eq!(
            config.coordinator_settings(),
            CoordinatorSettings {
                block_sizes: BlockSizes {
                    ipv4_prefix_len: 28,
                    ipv6_prefix_len: 122,
                },
                max_release_retries: 5,
                block_selection: BlockSelection::Random,
            }
        );
        assert_eq!(
            config.pools,
            vec![
                IpPool::new("10.0.0.0/16".parse().unwrap()),
                IpPool::disabled("fd00::/120".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/ipam.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::CouldNotRead { .. }));

        let file = write_config("max_release_retries = \"lots\"");
        assert!(matches!(
            Config::load(file.path()).unwrap_err(),
            ConfigError::InvalidToml { .. }
        ));

        let file = write_config("ipv6_block_prefix_len = 64");
        assert!(matches!(
            Config::load(file.path()).unwrap_err(),
            ConfigError::InvalidBlockSize {
                version: IpVersion::V6,
                prefix_len: 64
            }
        ));

        let file = write_config("max_release_retries = 0");
        assert!(matches!(
            Config::load(file.path()).unwrap_err(),
            ConfigError::InvalidRetryBound
        ));

        let file = write_config("[[pools]]\ncidr = \"10.0.0.0/28\"\n");
        assert!(matches!(
            Config::load(file.path()).unwrap_err(),
            ConfigError::InvalidPool {
                error: BlockSizeError::PoolTooSmall { .. },
                ..
            }
        ));
    }
}
