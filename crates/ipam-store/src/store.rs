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
use ipnet::IpNet;
use mockall::automock;

use crate::error::StoreResult;
use crate::model::{AffinityListOptions, AllocationBlock, BlockAffinity};
use crate::version::Versioned;

/// The versioned store holding blocks and block affinity records.
///
/// Implementations must make `create_*` an atomic create-if-absent and
/// `update_block` an atomic compare-and-swap on the revision carried by the
/// `Versioned` passed in. Failures are reported with the matching
/// [`crate::StoreErrorKind`] so callers can tell an expected race from a real
/// failure.
#[automock]
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Fails with `NotFound` if no block exists for `cidr`.
    async fn get_block(&self, cidr: &IpNet) -> StoreResult<Versioned<AllocationBlock>>;

    /// Fails with `AlreadyExists` if a block exists for the same CIDR.
    async fn create_block(&self, block: AllocationBlock)
    -> StoreResult<Versioned<AllocationBlock>>;

    /// Fails with `UpdateConflict` if the block changed since `block` was
    /// read, or `NotFound` if it was deleted.
    async fn update_block(
        &self,
        block: Versioned<AllocationBlock>,
    ) -> StoreResult<Versioned<AllocationBlock>>;

    /// Fails with `NotFound` if no block exists for `cidr`.
    async fn delete_block(&self, cidr: &IpNet) -> StoreResult<()>;

    /// Fails with `AlreadyExists` if the record is present.
    async fn create_affinity(
        &self,
        affinity: &BlockAffinity,
    ) -> StoreResult<Versioned<BlockAffinity>>;

    /// Fails with `NotFound` if the record is absent.
    async fn delete_affinity(&self, affinity: &BlockAffinity) -> StoreResult<()>;

    /// Returns an empty list when nothing matches.
    async fn list_affinities(
        &self,
        options: &AffinityListOptions,
    ) -> StoreResult<Vec<Versioned<BlockAffinity>>>;
}
