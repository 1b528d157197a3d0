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

//! Conversions between addresses/networks and names that are safe to use as
//! storage keys: dots, colons and the prefix slash all become dashes.

use std::net::IpAddr;

use ipnet::IpNet;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("invalid resource name {0}: does not follow the IP name format")]
    InvalidIpName(String),

    #[error("invalid resource name {0}: does not follow the IP network name format")]
    InvalidNetName(String),
}

/// `10.0.0.1` becomes `10-0-0-1`, `fd00::1` becomes `fd00--1`.
pub fn ip_to_name(ip: &IpAddr) -> String {
    let name = ip.to_string().replace(['.', ':'], "-");
    tracing::trace!(%ip, name = %name, "Converting IP to resource name");
    name
}

pub fn name_to_ip(name: &str) -> Result<IpAddr, NameError> {
    name_to_ip_string(name)
        .parse()
        .map_err(|_| NameError::InvalidIpName(name.to_string()))
}

/// `10.0.0.0/26` becomes `10-0-0-0-26`, `fd00::/122` becomes `fd00---122`.
pub fn net_to_name(net: &IpNet) -> String {
    let name = net.to_string().replace(['.', ':', '/'], "-");
    tracing::trace!(%net, name = %name, "Converting IP network to resource name");
    name
}

/// Reverses [`net_to_name`]. The last dash separates the prefix length. Host
/// bits in the address are cleared.
pub fn name_to_net(name: &str) -> Result<IpNet, NameError> {
    let invalid = || NameError::InvalidNetName(name.to_string());
    let (addr, prefix_len) = name.rsplit_once('-').ok_or_else(invalid)?;
    let cidr = format!("{}/{}", name_to_ip_string(addr), prefix_len);
    let net: IpNet = cidr.parse().map_err(|_| invalid())?;
    Ok(net.trunc())
}

// The name doesn't say which version it encodes. It's IPv6 if it contains a
// "--" (a compressed run of zeros) or more dashes than an IPv4 address has.
// The result isn't validated here.
fn name_to_ip_string(name: &str) -> String {
    if name.contains("--") || name.matches('-').count() > 3 {
        name.replace('-', ":")
    } else {
        name.replace('-', ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_names() {
        let cases = [
            ("10.0.0.1", "10-0-0-1"),
            ("fd00::1", "fd00--1"),
            ("2001:db8:1:2:3:4:5:6", "2001-db8-1-2-3-4-5-6"),
            ("::", "--"),
        ];
        for (ip, name) in cases {
            let ip: IpAddr = ip.parse().unwrap();
            assert_eq!(ip_to_name(&ip), name);
            assert_eq!(name_to_ip(name).unwrap(), ip);
        }
    }

    #[test]
    fn test_net_names() {
        let cases = [
            ("10.0.0.0/26", "10-0-0-0-26"),
            ("fd00::/122", "fd00---122"),
            ("2001:db8::40/122", "2001-db8--40-122"),
        ];
        for (net, name) in cases {
            let net: IpNet = net.parse().unwrap();
            assert_eq!(net_to_name(&net), name);
            assert_eq!(name_to_net(name).unwrap(), net);
        }
    }

    #[test]
    fn test_name_to_net_clears_host_bits() {
        assert_eq!(
            name_to_net("10-0-0-17-26").unwrap(),
            "10.0.0.0/26".parse::<IpNet>().unwrap()
        );
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(
            name_to_ip("not-an-ip"),
            Err(NameError::InvalidIpName("not-an-ip".to_string()))
        );
        assert!(name_to_net("10000").is_err());
        assert!(name_to_net("10-0-0-0-40").is_err());
        assert!(name_to_net("10-0-0-0-").is_err());
    }
}
