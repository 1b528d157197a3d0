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

//! Claiming and releasing block affinity.
//!
//! There is no lock manager. Exclusive ownership of a block rests on two
//! properties of the [`BlockStore`]: creating a block fails if the CIDR is
//! already taken, and updating a block fails if it changed since it was read.
//! Every get-then-create and get-then-update below has to cope with the record
//! changing in between.

use std::sync::Arc;

use ipam_network::ip::prefix::contains_subnet;
use ipam_network::{BlockSelection, BlockSizes, CandidateBlocks, IdentifyIpVersion, IpVersion};
use ipam_store::{
    AffinityListOptions, AllocationBlock, BlockAffinity, BlockStore, PoolCatalog, StoreError,
    StoreErrorKind,
};
use ipnet::IpNet;

use crate::config::IpamConfig;
use crate::error::IpamError;

/// Release attempts made before giving up on compare-and-swap conflicts.
pub const DEFAULT_MAX_RELEASE_RETRIES: u32 = 100;

/// Knobs injected into the coordinator at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub block_sizes: BlockSizes,
    /// Attempts made by [`AffinityCoordinator::release_block_affinity`]
    /// before giving up on compare-and-swap conflicts.
    pub max_release_retries: u32,
    pub block_selection: BlockSelection,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            block_sizes: BlockSizes::default(),
            max_release_retries: DEFAULT_MAX_RELEASE_RETRIES,
            block_selection: BlockSelection::Sequential,
        }
    }
}

/// What releasing did to the block record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseDisposition {
    /// The block was empty and its record is gone.
    Deleted,
    /// The block still has leases; it stays, unaffiliated.
    AffinityCleared,
}

/// Result of a successful release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedBlock {
    pub cidr: IpNet,
    pub disposition: ReleaseDisposition,
    /// Set if the block was released but the host's affinity record could
    /// not be removed. The block record is authoritative, so the release
    /// still counts as done; the stale record only affects listings.
    pub cleanup_error: Option<StoreError>,
}

/// Hands out blocks to hosts and takes them back.
///
/// The coordinator holds no state of its own beyond its collaborators, so one
/// instance can be shared across tasks, and any number of instances on any
/// number of hosts can work against the same store.
#[derive(Clone)]
pub struct AffinityCoordinator {
    store: Arc<dyn BlockStore>,
    pools: Arc<dyn PoolCatalog>,
    settings: CoordinatorSettings,
}

impl std::fmt::Debug for AffinityCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffinityCoordinator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AffinityCoordinator {
    pub fn new(
        store: Arc<dyn BlockStore>,
        pools: Arc<dyn PoolCatalog>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            store,
            pools,
            settings,
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub(crate) fn pool_catalog(&self) -> &dyn PoolCatalog {
        self.pools.as_ref()
    }

    /// Returns the CIDRs of the blocks `host` has affinity records for,
    /// limited to `version` and, if given, to blocks inside `pool`.
    pub async fn get_affine_blocks(
        &self,
        host: &str,
        version: IpVersion,
        pool: Option<&IpNet>,
    ) -> Result<Vec<IpNet>, IpamError> {
        let options = AffinityListOptions::for_host(host, version);
        let affinities = match self.store.list_affinities(&options).await {
            Ok(affinities) => affinities,
            // Nothing was ever stored for this host.
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => {
                tracing::error!(host, error = %err, "Error getting affine blocks");
                return Err(err.into());
            }
        };

        Ok(affinities
            .into_iter()
            .map(|affinity| affinity.cidr)
            .filter(|cidr| pool.is_none_or(|pool| contains_subnet(pool, cidr)))
            .collect())
    }

    /// Finds a block nobody owns yet and claims it for `host`.
    ///
    /// Pools are searched in catalog order (or only `pool`, if given). The
    /// first candidate with no block record is claimed via
    /// [`Self::claim_block_affinity`] and its outcome returned as is; a lost
    /// race is not retried here, since retrying would change which block the
    /// caller gets.
    pub async fn claim_new_affine_block(
        &self,
        host: &str,
        version: IpVersion,
        pool: Option<&IpNet>,
        config: &IpamConfig,
    ) -> Result<IpNet, IpamError> {
        let pools = self.candidate_pools(version, pool).await?;
        let requested = pool.is_some();

        tracing::info!(host, %version, "Claiming a new affine block");
        for pool in &pools {
            let candidates = match CandidateBlocks::new(
                pool,
                &self.settings.block_sizes,
                self.settings.block_selection,
            ) {
                Ok(candidates) => candidates,
                // A catalog pool that can't hold a block has no candidates.
                Err(err) if !requested => {
                    tracing::warn!(%pool, error = %err, "Skipping pool without usable blocks");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            for cidr in candidates {
                tracing::debug!(%cidr, "Getting block");
                match self.store.get_block(&cidr).await {
                    Ok(_) => continue,
                    Err(err) if err.is_not_found() => {
                        tracing::debug!(%cidr, %pool, "Found free block");
                        self.claim_block_affinity(&cidr, host, config).await?;
                        return Ok(cidr);
                    }
                    Err(err) => {
                        tracing::error!(%cidr, error = %err, "Error getting block");
                        return Err(err.into());
                    }
                }
            }
        }

        Err(IpamError::NoFreeBlocks(version))
    }

    // The pools a claim may search: just `requested` if given (it has to be
    // an enabled pool of the right version), otherwise every enabled pool of
    // `version`.
    async fn candidate_pools(
        &self,
        version: IpVersion,
        requested: Option<&IpNet>,
    ) -> Result<Vec<IpNet>, IpamError> {
        let configured = self.pools.list_pools().await.inspect_err(|err| {
            tracing::error!(error = %err, "Error reading configured pools");
        })?;

        let pools: Vec<IpNet> = match requested {
            Some(pool) => {
                if !configured
                    .iter()
                    .any(|configured| configured.is_enabled() && configured.cidr == *pool)
                {
                    return Err(IpamError::PoolNotConfigured(*pool));
                }
                let pool = (*pool).require_ip_version_or_else(version, |pool| {
                    IpamError::PoolVersionMismatch { pool, version }
                })?;
                vec![pool]
            }
            None => configured
                .into_iter()
                .filter(|pool| pool.is_eligible(version))
                .map(|pool| pool.cidr)
                .collect(),
        };

        if pools.is_empty() {
            return Err(IpamError::NoConfiguredPools(version));
        }
        Ok(pools)
    }

    /// Claims `cidr` for `host` by creating its block record.
    ///
    /// Claiming a block this host already owns succeeds without changing
    /// anything. If another host owns it, the affinity record created here is
    /// removed again and `AffinityClaimedByOther` returned.
    pub async fn claim_block_affinity(
        &self,
        cidr: &IpNet,
        host: &str,
        config: &IpamConfig,
    ) -> Result<(), IpamError> {
        tracing::info!(host, %cidr, "Host claiming block affinity");

        // The affinity record goes in first. Whether it lands doesn't decide
        // anything; the block create below does.
        let affinity = BlockAffinity::new(host, *cidr);
        match self.store.create_affinity(&affinity).await {
            Ok(_) => {}
            Err(err) if err.kind() == StoreErrorKind::AlreadyExists => {
                tracing::debug!(host, %cidr, "Affinity record already present");
            }
            Err(err) => {
                tracing::warn!(host, %cidr, error = %err, "Error recording block affinity");
            }
        }

        let mut block = AllocationBlock::new(*cidr);
        block.affinity = Some(host.to_string());
        block.strict_affinity = config.strict_affinity;

        let err = match self.store.create_block(block).await {
            Ok(_) => return Ok(()),
            Err(err) if err.kind() == StoreErrorKind::AlreadyExists => err,
            Err(err) => return Err(err.into()),
        };

        // Someone created the block between our check and our create.
        tracing::warn!(host, %cidr, error = %err, "Problem claiming block affinity");
        let existing = self.store.get_block(cidr).await.inspect_err(|err| {
            tracing::error!(%cidr, error = %err, "Error reading block");
        })?;

        if existing.has_affinity_to(host) {
            // Another process on this host got there first.
            tracing::debug!(host, %cidr, "Block already claimed by us");
            return Ok(());
        }

        match self.store.delete_affinity(&affinity).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => {
                tracing::error!(host, %cidr, error = %err, "Error cleaning up block affinity");
                return Err(err.into());
            }
        }
        Err(IpamError::AffinityClaimedByOther(Box::new(
            existing.into_inner(),
        )))
    }

    /// Gives up `host`'s affinity to the block `cidr`.
    ///
    /// An empty block is deleted outright; a block with leases keeps its
    /// record with the affinity cleared. Compare-and-swap conflicts are
    /// retried up to `max_release_retries` times.
    pub async fn release_block_affinity(
        &self,
        host: &str,
        cidr: &IpNet,
    ) -> Result<ReleasedBlock, IpamError> {
        let retries = self.settings.max_release_retries;
        for attempt in 1..=retries {
            let mut block = self.store.get_block(cidr).await.inspect_err(|err| {
                tracing::error!(%cidr, error = %err, "Error getting block");
            })?;

            if block.is_affine_to_other(host) {
                tracing::error!(
                    host,
                    %cidr,
                    owner = block.affinity.as_deref().unwrap_or_default(),
                    "Mismatched affinity"
                );
                return Err(IpamError::AffinityClaimedByOther(Box::new(
                    block.into_inner(),
                )));
            }

            let disposition = if block.is_empty() {
                match self.store.delete_block(cidr).await {
                    Ok(()) => {}
                    Err(err) if err.is_not_found() => {
                        tracing::debug!(%cidr, "Block already deleted");
                    }
                    Err(err) => {
                        tracing::error!(%cidr, error = %err, "Error deleting block");
                        return Err(err.into());
                    }
                }
                ReleaseDisposition::Deleted
            } else {
                // Without affinity the host stops assigning from this block
                // unless it is allowed to use non-affine blocks.
                block.affinity = None;
                match self.store.update_block(block).await {
                    Ok(_) => {}
                    Err(err) if err.kind() == StoreErrorKind::UpdateConflict => {
                        tracing::debug!(%cidr, attempt, "Block changed while releasing, retrying");
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                }
                ReleaseDisposition::AffinityCleared
            };

            let cleanup_error = match self
                .store
                .delete_affinity(&BlockAffinity::new(host, *cidr))
                .await
            {
                Ok(()) => None,
                Err(err) if err.is_not_found() => None,
                Err(err) => {
                    tracing::warn!(host, %cidr, error = %err, "Error deleting block affinity");
                    Some(err)
                }
            };

            tracing::info!(host, %cidr, ?disposition, "Released block affinity");
            return Ok(ReleasedBlock {
                cidr: *cidr,
                disposition,
                cleanup_error,
            });
        }

        Err(IpamError::MaxRetriesExceeded {
            cidr: *cidr,
            retries,
        })
    }
}
