use crate::error::AddressError;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;

/// An interface address in CIDR syntax (e.g. `10.0.0.1/24` or `fd00::1/64`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAddress {
    pub address: IpAddr,
    pub network_prefix: Option<u8>,
}

impl PortAddress {
    fn max_prefix(address: IpAddr) -> u8 {
        match address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    }
}

impl Display for PortAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.network_prefix {
            Some(prefix) => write!(f, "{}/{}", self.address, prefix),
            None => write!(f, "{}", self.address),
        }
    }
}

impl FromStr for PortAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        let mut parts = s.split('/');
        let address: IpAddr = parts
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|_| AddressError::NotAnAddress)?;

        // A missing network prefix is left to `ip addr add`, which treats it as a host address
        let network_prefix = match parts.next() {
            Some(prefix) => {
                let prefix: u8 = prefix.parse().map_err(|_| AddressError::InvalidPrefix)?;
                let max = Self::max_prefix(address);
                if prefix > max {
                    return Err(AddressError::PrefixTooLarge(max));
                }
                Some(prefix)
            }
            None => None,
        };

        if parts.next().is_some() {
            return Err(AddressError::TrailingCharacters);
        }

        Ok(Self {
            address,
            network_prefix,
        })
    }
}

#[test]
fn test_port_address() {
    let cases = [
        ("10.0.0.1/24", "10.0.0.1", Some(24)),
        ("192.168.1.254", "192.168.1.254", None),
        ("10.0.0.0/0", "10.0.0.0", Some(0)),
        ("fd00::1/64", "fd00::1", Some(64)),
        ("::1", "::1", None),
    ];

    for (input, address, prefix) in cases {
        let parsed = PortAddress::from_str(input).unwrap();
        assert_eq!(parsed.address.to_string(), address);
        assert_eq!(parsed.network_prefix, prefix);
        assert_eq!(parsed.to_string(), input);
    }
}

#[test]
fn test_invalid_port_address() {
    let cases = [
        ("", AddressError::Empty),
        ("eth0", AddressError::NotAnAddress),
        ("10.0.0.256/24", AddressError::NotAnAddress),
        ("10.0.0.1/abc", AddressError::InvalidPrefix),
        ("10.0.0.1/33", AddressError::PrefixTooLarge(32)),
        ("fd00::1/129", AddressError::PrefixTooLarge(128)),
        ("10.0.0.1/24/8", AddressError::TrailingCharacters),
    ];

    for (input, expected) in cases {
        assert_eq!(PortAddress::from_str(input).unwrap_err(), expected, "{input}");
    }
}
