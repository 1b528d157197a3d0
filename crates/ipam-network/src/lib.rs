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

//! Address arithmetic used by the IPAM block allocator.
//!
//! [`blocks`] produces the candidate block CIDRs of a pool, [`ip`] holds the
//! IP version type shared by pools, blocks and affinities, and [`names`]
//! converts addresses and networks to and from storage-safe names.

pub mod blocks;
pub mod ip;
pub mod names;

pub use blocks::{
    BlockSelection, BlockSizeError, BlockSizes, CandidateBlocks, RandomBlocks, SequentialBlocks,
};
pub use ip::address_family::{IdentifyIpVersion, IpVersion};
pub use ipnet::IpNet;
