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

use std::net::IpAddr;

use ipam_network::IdentifyIpVersion;
use ipnet::IpNet;

use crate::affinity::AffinityCoordinator;

impl AffinityCoordinator {
    /// Whether `ip` falls inside an enabled pool of its own IP version.
    ///
    /// A catalog that can't be read matches nothing.
    pub async fn within_configured_pools(&self, ip: IpAddr) -> bool {
        let pools = match self.pool_catalog().list_pools().await {
            Ok(pools) => pools,
            Err(err) => {
                tracing::warn!(%ip, error = %err, "Unable to read configured pools");
                return false;
            }
        };

        let version = ip.ip_version();
        pools
            .iter()
            .any(|pool| pool.is_eligible(version) && pool.cidr.contains(&ip))
    }

    /// Whether `cidr` is exactly one of the enabled pools.
    pub async fn is_configured_pool(&self, cidr: &IpNet) -> bool {
        match self.pool_catalog().list_pools().await {
            Ok(pools) => pools
                .iter()
                .any(|pool| pool.is_enabled() && pool.cidr == *cidr),
            Err(err) => {
                tracing::warn!(%cidr, error = %err, "Unable to read configured pools");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ipam_store::{CatalogError, IpPool, MemoryBlockStore, MockPoolCatalog, StaticPoolCatalog};

    use super::*;
    use crate::affinity::CoordinatorSettings;

    fn coordinator(catalog: impl ipam_store::PoolCatalog + 'static) -> AffinityCoordinator {
        AffinityCoordinator::new(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(catalog),
            CoordinatorSettings::default(),
        )
    }

    fn static_pools() -> StaticPoolCatalog {
        StaticPoolCatalog::new(vec![
            IpPool::new("10.0.0.0/16".parse().unwrap()),
            IpPool::disabled("192.168.0.0/24".parse().unwrap()),
            IpPool::new("fd00::/48".parse().unwrap()),
        ])
    }

    #[tokio::test]
    async fn test_within_configured_pools() {
        let coordinator = coordinator(static_pools());

        assert!(coordinator.within_configured_pools("10.0.3.7".parse().unwrap()).await);
        assert!(coordinator.within_configured_pools("fd00::1".parse().unwrap()).await);
        assert!(!coordinator.within_configured_pools("10.1.0.1".parse().unwrap()).await);
        assert!(!coordinator.within_configured_pools("192.168.0.5".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn test_is_configured_pool() {
        let coordinator = coordinator(static_pools());

        assert!(coordinator.is_configured_pool(&"10.0.0.0/16".parse().unwrap()).await);
        assert!(!coordinator.is_configured_pool(&"10.0.0.0/24".parse().unwrap()).await);
        assert!(!coordinator.is_configured_pool(&"192.168.0.0/24".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn test_unreadable_catalog_matches_nothing() {
        let mut catalog = MockPoolCatalog::new();
        catalog
            .expect_list_pools()
            .times(2)
            .returning(|| Err(CatalogError::Unavailable("down".to_string())));
        let coordinator = coordinator(catalog);

        assert!(!coordinator.within_configured_pools("10.0.0.1".parse().unwrap()).await);
        assert!(!coordinator.is_configured_pool(&"10.0.0.0/16".parse().unwrap()).await);
    }
}
