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

//! Storage-side collaborators of the IPAM block allocator.
//!
//! [`BlockStore`] is the versioned store holding allocation blocks and block
//! affinity records. It offers atomic create-if-absent and compare-and-swap
//! updates, and that is all the allocator relies on for mutual exclusion.
//! [`MemoryBlockStore`] implements it in process.
//!
//! [`PoolCatalog`] lists the configured address pools.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod model;
pub mod store;
pub mod version;

pub use catalog::{CatalogError, IpPool, MockPoolCatalog, PoolCatalog, StaticPoolCatalog};
pub use error::{StoreError, StoreErrorKind, StoreResult};
pub use memory::MemoryBlockStore;
pub use model::{AffinityListOptions, AllocationBlock, BlockAffinity};
pub use store::{BlockStore, MockBlockStore};
pub use version::{Revision, Versioned};
