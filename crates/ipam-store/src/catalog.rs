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
use async_trait::async_trait;
use ipam_network::{IdentifyIpVersion, IpNet, IpVersion};
use mockall::automock;
use serde::{Deserialize, Serialize};

/// A configured address pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPool {
    pub cidr: IpNet,
    #[serde(default)]
    pub disabled: bool,
}

impl IpPool {
    pub fn new(cidr: IpNet) -> Self {
        Self {
            cidr: cidr.trunc(),
            disabled: false,
        }
    }

    pub fn disabled(cidr: IpNet) -> Self {
        Self {
            disabled: true,
            ..Self::new(cidr)
        }
    }

    pub fn ip_version(&self) -> IpVersion {
        self.cidr.ip_version()
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    /// Enabled and of the requested version.
    pub fn is_eligible(&self, version: IpVersion) -> bool {
        self.is_enabled() && self.ip_version() == version
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("pool catalog unavailable: {0}")]
    Unavailable(String),
}

/// Source of the configured address pools.
#[automock]
#[async_trait]
pub trait PoolCatalog: Send + Sync {
    /// All configured pools, enabled or not, in configuration order.
    async fn list_pools(&self) -> Result<Vec<IpPool>, CatalogError>;
}

/// A catalog serving a fixed list of pools, typically read from config.
#[derive(Debug, Clone, Default)]
pub struct StaticPoolCatalog {
    pools: Vec<IpPool>,
}

impl StaticPoolCatalog {
    pub fn new(pools: Vec<IpPool>) -> Self {
        Self { pools }
    }
}

#[async_trait]
impl PoolCatalog for StaticPoolCatalog {
    async fn list_pools(&self) -> Result<Vec<IpPool>, CatalogError> {
        Ok(self.pools.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_eligibility() {
        let v4 = IpPool::new("10.0.0.0/24".parse().unwrap());
        assert!(v4.is_eligible(IpVersion::V4));
        assert!(!v4.is_eligible(IpVersion::V6));

        let off = IpPool::disabled("10.1.0.0/24".parse().unwrap());
        assert!(!off.is_enabled());
        assert!(!off.is_eligible(IpVersion::V4));
    }

    #[test]
    fn test_new_pool_clears_host_bits() {
        let pool = IpPool::new("10.0.0.9/24".parse().unwrap());
        assert_eq!(pool.cidr, "10.0.0.0/24".parse::<IpNet>().unwrap());
    }

    #[tokio::test]
    async fn test_static_catalog_keeps_order() {
        let pools = vec![
            IpPool::new("10.1.0.0/16".parse().unwrap()),
            IpPool::disabled("10.0.0.0/16".parse().unwrap()),
        ];
        let catalog = StaticPoolCatalog::new(pools.clone());
        assert_eq!(catalog.list_pools().await.unwrap(), pools);
    }
}
