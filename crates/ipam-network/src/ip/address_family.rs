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
use std::fmt::Display;
use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// The IP version of a pool, block or affinity. Pools of different versions
/// are never mixed during a claim.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// The version number, 4 or 6.
    pub fn number(self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    /// Width of an address of this version in bits.
    pub fn address_bits(self) -> u8 {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }

    /// Directory component used in storage paths, `ipv4` or `ipv6`.
    pub fn path_segment(self) -> &'static str {
        match self {
            IpVersion::V4 => "ipv4",
            IpVersion::V6 => "ipv6",
        }
    }
}

impl Display for IpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IPv{}", self.number())
    }
}

pub trait IdentifyIpVersion {
    /// Return the IP version of this value.
    fn ip_version(&self) -> IpVersion;

    /// Check whether this value is of the given `version`.
    fn is_ip_version(&self, version: IpVersion) -> bool {
        version == self.ip_version()
    }

    fn require_ip_version_or_else<F, E>(self, version: IpVersion, err: F) -> Result<Self, E>
    where
        Self: Sized,
        F: FnOnce(Self) -> E,
    {
        match self.is_ip_version(version) {
            true => Ok(self),
            false => Err(err(self)),
        }
    }
}

impl IdentifyIpVersion for IpAddr {
    fn ip_version(&self) -> IpVersion {
        match self {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }
}

impl IdentifyIpVersion for IpNet {
    fn ip_version(&self) -> IpVersion {
        match self {
            IpNet::V4(_) => IpVersion::V4,
            IpNet::V6(_) => IpVersion::V6,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_require_ip_version_or_else() {
        let addr = IpAddr::from_str("127.0.0.1").unwrap();

        assert_eq!(
            addr.require_ip_version_or_else(IpVersion::V4, |_| {}),
            Ok(addr),
        );

        assert_eq!(
            addr.require_ip_version_or_else(IpVersion::V6, |_| 42),
            Err(42)
        )
    }

    #[test]
    fn test_version_of_networks() {
        let v4: IpNet = "10.0.0.0/24".parse().unwrap();
        let v6: IpNet = "fd00::/64".parse().unwrap();
        assert_eq!(v4.ip_version(), IpVersion::V4);
        assert_eq!(v6.ip_version(), IpVersion::V6);
        assert_eq!(IpVersion::V6.number(), 6);
        assert_eq!(IpVersion::V4.to_string(), "IPv4");
    }
}
