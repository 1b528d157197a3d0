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

//! Candidate block enumeration.
//!
//! A pool is partitioned into fixed-size blocks whose prefix length depends on
//! the IP version. The claim path walks these candidates looking for a block
//! that doesn't exist in the store yet. Two orders are available:
//!
//!   - [`SequentialBlocks`] walks from the lowest address upward. Every caller
//!     scanning the same pool sees the same order, which gives "lowest free
//!     block wins" semantics.
//!   - [`RandomBlocks`] visits every block exactly once in a uniformly random
//!     order, which spreads concurrent claims from many hosts across the pool.

use std::collections::HashMap;
use std::iter::FusedIterator;

use ipnet::IpNet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ip::address_family::{IdentifyIpVersion, IpVersion};
use crate::ip::prefix::{network_details, subnet_at};

/// Default block prefix length for IPv4 pools (64 addresses per block).
pub const DEFAULT_IPV4_BLOCK_PREFIX_LEN: u8 = 26;
/// Default block prefix length for IPv6 pools (64 addresses per block).
pub const DEFAULT_IPV6_BLOCK_PREFIX_LEN: u8 = 122;

/// The block prefix length used for each IP version.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockSizes {
    pub ipv4_prefix_len: u8,
    pub ipv6_prefix_len: u8,
}

impl Default for BlockSizes {
    fn default() -> Self {
        Self {
            ipv4_prefix_len: DEFAULT_IPV4_BLOCK_PREFIX_LEN,
            ipv6_prefix_len: DEFAULT_IPV6_BLOCK_PREFIX_LEN,
        }
    }
}

impl BlockSizes {
    pub fn prefix_len(&self, version: IpVersion) -> u8 {
        match version {
            IpVersion::V4 => self.ipv4_prefix_len,
            IpVersion::V6 => self.ipv6_prefix_len,
        }
    }
}

/// Which enumerator the claim path uses to search a pool.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockSelection {
    #[default]
    Sequential,
    Random,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockSizeError {
    #[error("block prefix length /{prefix_len} is not valid for {version}")]
    InvalidPrefixLength { version: IpVersion, prefix_len: u8 },

    #[error("pool {pool} is smaller than a /{prefix_len} block")]
    PoolTooSmall { pool: IpNet, prefix_len: u8 },

    #[error("pool {pool} holds too many /{prefix_len} blocks to enumerate")]
    TooManyBlocks { pool: IpNet, prefix_len: u8 },
}

// BlockLayout holds the geometry both enumerators work from. Once built, any
// index below `count` maps to a block fully contained in the pool.
#[derive(Clone, Copy, Debug)]
struct BlockLayout {
    version: IpVersion,
    // First and last address of the pool.
    base: u128,
    last: u128,
    prefix_len: u8,
    // Number of address bits inside a block; a block spans 2^host_bits addresses.
    host_bits: u32,
    count: u128,
}

impl BlockLayout {
    fn new(pool: &IpNet, prefix_len: u8) -> Result<Self, BlockSizeError> {
        let version = pool.ip_version();
        if prefix_len == 0 || prefix_len > version.address_bits() {
            return Err(BlockSizeError::InvalidPrefixLength {
                version,
                prefix_len,
            });
        }
        if prefix_len < pool.prefix_len() {
            return Err(BlockSizeError::PoolTooSmall {
                pool: *pool,
                prefix_len,
            });
        }

        let count = 1u128
            .checked_shl(u32::from(prefix_len - pool.prefix_len()))
            .ok_or(BlockSizeError::TooManyBlocks {
                pool: *pool,
                prefix_len,
            })?;
        let details = network_details(pool);

        Ok(Self {
            version,
            base: details.base,
            last: details.last,
            prefix_len,
            host_bits: u32::from(version.address_bits() - prefix_len),
            count,
        })
    }

    fn block_at(&self, first_addr: u128) -> IpNet {
        subnet_at(self.version, first_addr, self.prefix_len)
    }

    fn block(&self, index: u128) -> IpNet {
        self.block_at(self.base + (index << self.host_bits))
    }
}

fn remaining_hint(remaining: u128) -> (usize, Option<usize>) {
    match usize::try_from(remaining) {
        Ok(n) => (n, Some(n)),
        Err(_) => (usize::MAX, None),
    }
}

/// Blocks of a pool from the lowest address upward.
#[derive(Clone, Debug)]
pub struct SequentialBlocks {
    layout: BlockLayout,
    next_addr: Option<u128>,
}

impl SequentialBlocks {
    pub fn new(pool: &IpNet, block_prefix_len: u8) -> Result<Self, BlockSizeError> {
        let layout = BlockLayout::new(pool, block_prefix_len)?;
        Ok(Self {
            layout,
            next_addr: Some(layout.base),
        })
    }

    /// Total number of blocks in the pool.
    pub fn block_count(&self) -> u128 {
        self.layout.count
    }
}

impl Iterator for SequentialBlocks {
    type Item = IpNet;

    fn next(&mut self) -> Option<IpNet> {
        let current = self.next_addr?;
        // Stop as soon as the next candidate falls outside the pool. The
        // checked_add covers pools ending at the top of the address space.
        self.next_addr = current
            .checked_add(1u128 << self.layout.host_bits)
            .filter(|next| *next <= self.layout.last);
        Some(self.layout.block_at(current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next_addr {
            Some(next) => remaining_hint(((self.layout.last - next) >> self.layout.host_bits) + 1),
            None => (0, Some(0)),
        }
    }
}

impl FusedIterator for SequentialBlocks {}

/// Every block of a pool exactly once, in uniformly random order.
///
/// The permutation is drawn lazily with a sparse Fisher-Yates shuffle: only
/// the positions disturbed by earlier draws are remembered, so enumerating a
/// few candidates of a huge IPv6 pool doesn't materialize all of its indexes.
#[derive(Clone, Debug)]
pub struct RandomBlocks<R = StdRng> {
    layout: BlockLayout,
    drawn: u128,
    displaced: HashMap<u128, u128>,
    rng: R,
}

impl RandomBlocks<StdRng> {
    pub fn new(pool: &IpNet, block_prefix_len: u8) -> Result<Self, BlockSizeError> {
        Self::with_rng(pool, block_prefix_len, StdRng::from_rng(&mut rand::rng()))
    }
}

impl<R: Rng> RandomBlocks<R> {
    pub fn with_rng(pool: &IpNet, block_prefix_len: u8, rng: R) -> Result<Self, BlockSizeError> {
        Ok(Self {
            layout: BlockLayout::new(pool, block_prefix_len)?,
            drawn: 0,
            displaced: HashMap::new(),
            rng,
        })
    }

    /// Total number of blocks in the pool.
    pub fn block_count(&self) -> u128 {
        self.layout.count
    }
}

impl<R: Rng> Iterator for RandomBlocks<R> {
    type Item = IpNet;

    fn next(&mut self) -> Option<IpNet> {
        if self.drawn == self.layout.count {
            return None;
        }

        // Swap position `i` with a random position `j` in [i, count) of the
        // virtual index array. Positions not present in `displaced` still
        // hold their own index.
        let i = self.drawn;
        let j = self.rng.random_range(i..self.layout.count);
        let at_i = self.displaced.remove(&i).unwrap_or(i);
        let index = if j == i {
            at_i
        } else {
            self.displaced.insert(j, at_i).unwrap_or(j)
        };
        self.drawn += 1;

        Some(self.layout.block(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        remaining_hint(self.layout.count - self.drawn)
    }
}

impl<R: Rng> FusedIterator for RandomBlocks<R> {}

/// The candidate blocks of one pool, in the order picked by [`BlockSelection`].
#[derive(Clone, Debug)]
pub enum CandidateBlocks {
    Sequential(SequentialBlocks),
    Random(RandomBlocks),
}

impl CandidateBlocks {
    pub fn new(
        pool: &IpNet,
        sizes: &BlockSizes,
        selection: BlockSelection,
    ) -> Result<Self, BlockSizeError> {
        let prefix_len = sizes.prefix_len(pool.ip_version());
        Ok(match selection {
            BlockSelection::Sequential => {
                CandidateBlocks::Sequential(SequentialBlocks::new(pool, prefix_len)?)
            }
            BlockSelection::Random => CandidateBlocks::Random(RandomBlocks::new(pool, prefix_len)?),
        })
    }
}

impl Iterator for CandidateBlocks {
    type Item = IpNet;

    fn next(&mut self) -> Option<IpNet> {
        match self {
            CandidateBlocks::Sequential(blocks) => blocks.next(),
            CandidateBlocks::Random(blocks) => blocks.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            CandidateBlocks::Sequential(blocks) => blocks.size_hint(),
            CandidateBlocks::Random(blocks) => blocks.size_hint(),
        }
    }
}
