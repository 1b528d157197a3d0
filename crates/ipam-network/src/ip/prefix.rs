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
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use super::address_family::{IdentifyIpVersion, IpVersion};

/// The integer bounds of a network. Keeping these as u128 regardless of
/// the version makes it easy to step through a network by a fixed number of
/// addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NetworkDetails {
    /// First (network) address.
    pub base: u128,
    /// Last (broadcast) address.
    pub last: u128,
}

pub fn network_details(net: &IpNet) -> NetworkDetails {
    let net = net.trunc();
    NetworkDetails {
        base: addr_bits(net.network()),
        last: addr_bits(net.broadcast()),
    }
}

pub fn addr_bits(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(addr) => addr.to_bits() as u128,
        IpAddr::V6(addr) => addr.to_bits(),
    }
}

/// Builds the network of length `prefix_len` whose first address is `bits`.
///
/// `prefix_len` must be valid for `version`, and `bits` must be aligned to it.
pub fn subnet_at(version: IpVersion, bits: u128, prefix_len: u8) -> IpNet {
    match version {
        IpVersion::V4 => IpNet::V4(Ipv4Net::new_assert(
            Ipv4Addr::from_bits(bits as u32),
            prefix_len,
        )),
        IpVersion::V6 => IpNet::V6(Ipv6Net::new_assert(Ipv6Addr::from_bits(bits), prefix_len)),
    }
}

/// Whether `inner` lies entirely within `outer`.
pub fn contains_subnet(outer: &IpNet, inner: &IpNet) -> bool {
    outer.ip_version() == inner.ip_version() && outer.contains(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_details() {
        let net: IpNet = "10.1.1.0/24".parse().unwrap();
        let details = network_details(&net);
        assert_eq!(details.base, u32::from(Ipv4Addr::new(10, 1, 1, 0)) as u128);
        assert_eq!(details.last, u32::from(Ipv4Addr::new(10, 1, 1, 255)) as u128);

        // Host bits are ignored.
        let sloppy: IpNet = "10.1.1.17/24".parse().unwrap();
        assert_eq!(network_details(&sloppy), details);
    }

    #[test]
    fn test_subnet_at() {
        let base = u32::from(Ipv4Addr::new(10, 0, 0, 64)) as u128;
        assert_eq!(
            subnet_at(IpVersion::V4, base, 26),
            "10.0.0.64/26".parse::<IpNet>().unwrap()
        );
        let base = u128::from("fd00::40".parse::<Ipv6Addr>().unwrap());
        assert_eq!(
            subnet_at(IpVersion::V6, base, 122),
            "fd00::40/122".parse::<IpNet>().unwrap()
        );
    }

    #[test]
    fn test_contains_subnet() {
        let pool: IpNet = "10.0.0.0/24".parse().unwrap();
        assert!(contains_subnet(&pool, &"10.0.0.192/26".parse().unwrap()));
        assert!(!contains_subnet(&pool, &"10.0.1.0/26".parse().unwrap()));
        assert!(!contains_subnet(&pool, &"10.0.0.0/23".parse().unwrap()));
        assert!(!contains_subnet(&pool, &"fd00::/122".parse().unwrap()));
    }
}
