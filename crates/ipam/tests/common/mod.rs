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

// Each test binary uses a different subset of these.
#![allow(dead_code)]

use std::sync::Arc;

use ipam::{AffinityCoordinator, CoordinatorSettings};
use ipam_store::{BlockStore, IpPool, MemoryBlockStore, PoolCatalog, StaticPoolCatalog};
use ipnet::IpNet;

#[ctor::ctor]
fn setup() {
    setup_logging();
}

pub fn setup_logging() {
    use tracing::metadata::LevelFilter;
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt::TestWriter;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::util::SubscriberInitExt;

    if let Err(e) = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::Layer::default()
                .compact()
                .with_writer(TestWriter::new),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
    {
        panic!("Failed to initialize trace logging for ipam tests: {e}");
    }
}

pub fn net(s: &str) -> IpNet {
    s.parse().unwrap()
}

/// A coordinator over a fresh in-memory store, with the given pools enabled.
pub fn memory_coordinator(pools: &[&str]) -> (AffinityCoordinator, Arc<MemoryBlockStore>) {
    memory_coordinator_with(pools, CoordinatorSettings::default())
}

pub fn memory_coordinator_with(
    pools: &[&str],
    settings: CoordinatorSettings,
) -> (AffinityCoordinator, Arc<MemoryBlockStore>) {
    let store = Arc::new(MemoryBlockStore::new());
    let coordinator = AffinityCoordinator::new(store.clone(), static_pools(pools), settings);
    (coordinator, store)
}

pub fn static_pools(pools: &[&str]) -> Arc<dyn PoolCatalog> {
    Arc::new(StaticPoolCatalog::new(
        pools.iter().map(|pool| IpPool::new(net(pool))).collect(),
    ))
}

/// A coordinator over `store`, usually a mock.
pub fn coordinator_over(
    store: impl BlockStore + 'static,
    pools: &[&str],
    settings: CoordinatorSettings,
) -> AffinityCoordinator {
    AffinityCoordinator::new(Arc::new(store), static_pools(pools), settings)
}
