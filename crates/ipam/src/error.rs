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
use ipam_network::{BlockSizeError, IpVersion};
use ipam_store::{AllocationBlock, CatalogError, StoreError};
use ipnet::IpNet;

/// The error classes callers decide on: retry elsewhere, or give up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IpamErrorKind {
    InvalidPool,
    NoConfiguredPools,
    NoFreeBlocks,
    AffinityClaimedByOther,
    MaxRetriesExceeded,
    Store,
}

#[derive(thiserror::Error, Debug)]
pub enum IpamError {
    #[error("The given pool ({0}) does not exist")]
    PoolNotConfigured(IpNet),

    #[error("The given pool ({pool}) does not match IP version {version}")]
    PoolVersionMismatch { pool: IpNet, version: IpVersion },

    #[error("Pool cannot be split into blocks: {0}")]
    BlockSize(#[from] BlockSizeError),

    #[error("No configured {0} pools")]
    NoConfiguredPools(IpVersion),

    #[error("No free {0} blocks")]
    NoFreeBlocks(IpVersion),

    /// Carries the block as found in the store, affinity and all.
    #[error("Block {} is claimed by host {}", .0.cidr, .0.affinity.as_deref().unwrap_or("<none>"))]
    AffinityClaimedByOther(Box<AllocationBlock>),

    #[error("Max retries hit releasing block {cidr} after {retries} attempts")]
    MaxRetriesExceeded { cidr: IpNet, retries: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl IpamError {
    pub fn kind(&self) -> IpamErrorKind {
        match self {
            IpamError::PoolNotConfigured(_)
            | IpamError::PoolVersionMismatch { .. }
            | IpamError::BlockSize(_) => IpamErrorKind::InvalidPool,
            IpamError::NoConfiguredPools(_) => IpamErrorKind::NoConfiguredPools,
            IpamError::NoFreeBlocks(_) => IpamErrorKind::NoFreeBlocks,
            IpamError::AffinityClaimedByOther(_) => IpamErrorKind::AffinityClaimedByOther,
            IpamError::MaxRetriesExceeded { .. } => IpamErrorKind::MaxRetriesExceeded,
            IpamError::Store(_) | IpamError::Catalog(_) => IpamErrorKind::Store,
        }
    }

    /// The conflicting block, for `AffinityClaimedByOther`.
    pub fn conflicting_block(&self) -> Option<&AllocationBlock> {
        match self {
            IpamError::AffinityClaimedByOther(block) => Some(block.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_claimed_message() {
        let mut block = AllocationBlock::new("10.0.0.0/26".parse().unwrap());
        block.affinity = Some("node-2".to_string());
        let err = IpamError::AffinityClaimedByOther(Box::new(block));
        assert_eq!(err.to_string(), "Block 10.0.0.0/26 is claimed by host node-2");
        assert_eq!(err.kind(), IpamErrorKind::AffinityClaimedByOther);
        assert_eq!(
            err.conflicting_block().and_then(|b| b.affinity.as_deref()),
            Some("node-2")
        );
    }

    #[test]
    fn test_store_errors_pass_through() {
        let err = IpamError::from(StoreError::Backend("etcd is down".to_string()));
        assert_eq!(err.to_string(), "backend error: etcd is down");
        assert_eq!(err.kind(), IpamErrorKind::Store);
        assert!(err.conflicting_block().is_none());
    }
}
