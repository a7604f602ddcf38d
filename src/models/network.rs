//! IPv4 CIDR block and address arithmetic.
//!
//! Provides [`Network`], a canonical (host bits zeroed) IPv4 block, along with
//! the mask helpers used for containment, overlap and subnet enumeration.

use crate::error::{Error, Result};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Maximum length for an IPv4 prefix (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use subnet_allocator::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask(len: u8) -> Result<u32> {
    if len > MAX_LENGTH {
        Err(Error::InvalidNetwork(format!("prefix length /{len} is too long")))
    } else {
        let right_len = MAX_LENGTH - len;
        let all_bits = u32::MAX as u64;

        let mask = (all_bits >> right_len) << right_len;

        Ok(mask as u32)
    }
}

/// Get the network address for a given IP and prefix length.
pub fn cut_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr> {
    let mask = get_cidr_mask(len)?;
    Ok(Ipv4Addr::from(u32::from(addr) & mask))
}

/// Number of addresses in a block of the given prefix length.
pub fn block_size(len: u8) -> u64 {
    1u64 << (MAX_LENGTH - len.min(MAX_LENGTH))
}

/// Smallest prefix length for which `ip` is a valid network address.
pub fn lo_mask(ip: Ipv4Addr) -> u8 {
    let trailing_zeros = u32::from(ip).trailing_zeros() as u8;
    MAX_LENGTH - trailing_zeros
}

/// A canonical IPv4 CIDR block.
///
/// The base address always has its host bits zeroed, so two blocks compare
/// equal exactly when they cover the same addresses. Ordering is by base
/// address first, then prefix length.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub struct Network {
    addr: Ipv4Addr,
    prefix_len: u8,
}

impl Network {
    /// Build a block from a base address and prefix length.
    ///
    /// Fails when the prefix is longer than 32 or host bits are set.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Network> {
        let base = cut_addr(addr, prefix_len)?;
        if base != addr {
            return Err(Error::InvalidNetwork(format!(
                "{addr}/{prefix_len} has host bits set (network address is {base})"
            )));
        }
        Ok(Network { addr, prefix_len })
    }

    /// Parse a CIDR string such as `"10.0.0.0/24"`.
    pub fn parse(addr_cidr: &str) -> Result<Network> {
        let addr_cidr = addr_cidr.trim();
        let (addr, len) = addr_cidr
            .split_once('/')
            .ok_or_else(|| Error::InvalidNetwork(format!("missing prefix length in '{addr_cidr}'")))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| Error::InvalidNetwork(format!("invalid IPv4 address '{addr}'")))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| Error::InvalidNetwork(format!("invalid prefix length '{len}'")))?;
        Network::new(addr, prefix_len)
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Get the lowest (network) address in the block.
    pub fn lo(&self) -> Ipv4Addr {
        self.addr
    }

    /// Get the highest (broadcast) address in the block.
    pub fn hi(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.hi_bits())
    }

    /// Total number of addresses, including network and broadcast.
    pub fn size(&self) -> u64 {
        block_size(self.prefix_len)
    }

    fn lo_bits(&self) -> u32 {
        u32::from(self.addr)
    }

    fn hi_bits(&self) -> u32 {
        (self.lo_bits() as u64 + self.size() - 1) as u32
    }

    /// True if `other` lies entirely within this block (or equals it).
    pub fn contains(&self, other: &Network) -> bool {
        self.lo_bits() <= other.lo_bits() && other.hi_bits() <= self.hi_bits()
    }

    /// True if the two blocks share at least one address.
    pub fn overlaps(&self, other: &Network) -> bool {
        self.lo_bits() <= other.hi_bits() && other.lo_bits() <= self.hi_bits()
    }

    /// Enumerate every block of `new_prefix` inside this one, lowest address first.
    pub fn subnets(&self, new_prefix: u8) -> Result<Subnets> {
        if new_prefix > MAX_LENGTH || new_prefix < self.prefix_len {
            return Err(Error::InvalidNetwork(format!(
                "cannot split {self} into /{new_prefix} blocks"
            )));
        }
        Ok(Subnets {
            next: self.lo_bits() as u64,
            end: self.lo_bits() as u64 + self.size(),
            prefix_len: new_prefix,
        })
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Network> {
        Network::parse(s)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl Serialize for Network {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Network, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Network::parse(&s).map_err(de::Error::custom)
    }
}

/// Ascending iterator over the equal-sized blocks of a parent network.
///
/// Counters are kept in u64 so the block ending at 255.255.255.255 does not
/// overflow.
#[derive(Debug, Clone)]
pub struct Subnets {
    next: u64,
    end: u64,
    prefix_len: u8,
}

impl Subnets {
    /// Skip forward so the next yielded block starts after `ip`.
    ///
    /// Never moves backwards.
    pub fn skip_past(&mut self, ip: Ipv4Addr) {
        let step = block_size(self.prefix_len);
        let after = u32::from(ip) as u64 + 1;
        let aligned = after.div_ceil(step) * step;
        if aligned > self.next {
            self.next = aligned;
        }
    }
}

impl Iterator for Subnets {
    type Item = Network;

    fn next(&mut self) -> Option<Network> {
        if self.next >= self.end {
            return None;
        }
        let network = Network {
            addr: Ipv4Addr::from(self.next as u32),
            prefix_len: self.prefix_len,
        };
        self.next += block_size(self.prefix_len);
        Some(network)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end.saturating_sub(self.next) / block_size(self.prefix_len)) as usize;
        (remaining, Some(remaining))
    }
}
