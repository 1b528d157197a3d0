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

//! IPAM block affinity.
//!
//! Hosts allocate addresses out of fixed-size blocks carved from configured
//! pools. The [`AffinityCoordinator`] hands out blocks to hosts and takes
//! them back, coordinating concurrent hosts purely through the atomic create
//! and compare-and-swap update of the [`ipam_store::BlockStore`].

pub mod affinity;
pub mod config;
pub mod error;
pub mod pools;

pub use affinity::{AffinityCoordinator, CoordinatorSettings, ReleaseDisposition, ReleasedBlock};
pub use config::{Config, ConfigError, IpamConfig};
pub use error::{IpamError, IpamErrorKind};
