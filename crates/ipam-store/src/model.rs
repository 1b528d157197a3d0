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
use std::collections::BTreeSet;
use std::net::IpAddr;

use ipam_network::names::net_to_name;
use ipam_network::{IdentifyIpVersion, IpNet, IpVersion};
use serde::{Deserialize, Serialize};

const ROOT: &str = "/ipam/v2";

/// A fixed-size sub-range of a pool, the unit of host affinity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationBlock {
    pub cidr: IpNet,
    /// Host the block is affine to, if any.
    #[serde(default)]
    pub affinity: Option<String>,
    /// Copied from the IPAM config when the block is created.
    #[serde(default)]
    pub strict_affinity: bool,
    /// Addresses currently leased out of the block.
    #[serde(default)]
    pub allocated: BTreeSet<IpAddr>,
}

impl AllocationBlock {
    /// An unaffiliated block with nothing allocated.
    pub fn new(cidr: IpNet) -> Self {
        Self {
            cidr: cidr.trunc(),
            affinity: None,
            strict_affinity: false,
            allocated: BTreeSet::new(),
        }
    }

    /// Storage path of the block record for `cidr`.
    pub fn path_for(cidr: &IpNet) -> String {
        format!(
            "{ROOT}/assignment/{}/block/{}",
            cidr.ip_version().path_segment(),
            net_to_name(cidr)
        )
    }

    pub fn path(&self) -> String {
        Self::path_for(&self.cidr)
    }

    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty()
    }

    pub fn has_affinity_to(&self, host: &str) -> bool {
        self.affinity.as_deref() == Some(host)
    }

    /// True if the block is affine to some host other than `host`.
    pub fn is_affine_to_other(&self, host: &str) -> bool {
        self.affinity.as_deref().is_some_and(|owner| owner != host)
    }

    /// Records `ip` as leased. Returns false if it's outside the block or
    /// already leased.
    pub fn mark_allocated(&mut self, ip: IpAddr) -> bool {
        self.cidr.contains(&ip) && self.allocated.insert(ip)
    }
}

/// Index record saying that `host` has (or is attempting to get) affinity to
/// the block `cidr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockAffinity {
    pub host: String,
    pub cidr: IpNet,
}

impl BlockAffinity {
    pub fn new(host: impl Into<String>, cidr: IpNet) -> Self {
        Self {
            host: host.into(),
            cidr: cidr.trunc(),
        }
    }

    /// Path prefix shared by all affinity records of `host`.
    pub fn host_prefix(host: &str) -> String {
        format!("{ROOT}/host/{host}/")
    }

    pub fn path(&self) -> String {
        format!(
            "{}{}/block/{}",
            Self::host_prefix(&self.host),
            self.ip_version().path_segment(),
            net_to_name(&self.cidr)
        )
    }

    pub fn ip_version(&self) -> IpVersion {
        self.cidr.ip_version()
    }
}

/// Filter for listing affinity records. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffinityListOptions {
    pub host: Option<String>,
    pub ip_version: Option<IpVersion>,
}

impl AffinityListOptions {
    pub fn for_host(host: impl Into<String>, ip_version: IpVersion) -> Self {
        Self {
            host: Some(host.into()),
            ip_version: Some(ip_version),
        }
    }

    pub fn matches(&self, affinity: &BlockAffinity) -> bool {
        self.host.as_deref().is_none_or(|host| host == affinity.host)
            && self
                .ip_version
                .is_none_or(|version| version == affinity.ip_version())
    }
}
