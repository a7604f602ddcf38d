//! Host count to prefix length.

use crate::error::{Error, Result};
use crate::models::MAX_LENGTH;

/// Addresses lost per block to the network and broadcast address.
pub const RESERVED_ADDRESSES: u64 = 2;

/// Smallest prefix length whose block holds `num_hosts` usable addresses.
///
/// Two addresses per block are reserved, so the block needs
/// `num_hosts + 2` addresses rounded up to a power of two.
///
/// # Examples
/// ```
/// use subnet_allocator::required_prefix_len;
/// assert_eq!(required_prefix_len(50).unwrap(), 26);
/// assert_eq!(required_prefix_len(62).unwrap(), 26);
/// assert_eq!(required_prefix_len(63).unwrap(), 25);
/// ```
pub fn required_prefix_len(num_hosts: u64) -> Result<u8> {
    if num_hosts == 0 {
        return Err(Error::InvalidRequest(
            "host count must be at least 1".to_string(),
        ));
    }
    let required = num_hosts.checked_add(RESERVED_ADDRESSES).ok_or_else(|| {
        Error::InvalidRequest(format!("host count {num_hosts} is too large"))
    })?;
    // ceil(log2(required)) for required >= 2
    let bits_needed = u64::BITS - (required - 1).leading_zeros();
    if bits_needed > MAX_LENGTH as u32 {
        return Err(Error::InvalidRequest(format!(
            "{num_hosts} hosts do not fit in any IPv4 block"
        )));
    }
    Ok(MAX_LENGTH - bits_needed as u8)
}

/// Usable host addresses in a block of the given prefix length.
pub fn usable_hosts(prefix_len: u8) -> u64 {
    crate::models::block_size(prefix_len).saturating_sub(RESERVED_ADDRESSES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_prefix_len_table() {
        assert_eq!(required_prefix_len(1).unwrap(), 30);
        assert_eq!(required_prefix_len(2).unwrap(), 30);
        assert_eq!(required_prefix_len(3).unwrap(), 29);
        assert_eq!(required_prefix_len(6).unwrap(), 29);
        assert_eq!(required_prefix_len(14).unwrap(), 28);
        assert_eq!(required_prefix_len(50).unwrap(), 26);
        assert_eq!(required_prefix_len(100).unwrap(), 25);
        assert_eq!(required_prefix_len(254).unwrap(), 24);
        assert_eq!(required_prefix_len(255).unwrap(), 23);
        assert_eq!(required_prefix_len(65534).unwrap(), 16);
    }

    #[test]
    fn test_whole_address_space() {
        assert_eq!(required_prefix_len((1u64 << 32) - 2).unwrap(), 0);
        let err = required_prefix_len((1u64 << 32) - 1).unwrap_err();
        assert_eq!(err.kind(), "InvalidRequest");
        assert!(required_prefix_len(u64::MAX).is_err());
    }

    #[test]
    fn test_zero_hosts_rejected() {
        assert_eq!(required_prefix_len(0).unwrap_err().kind(), "InvalidRequest");
    }

    #[test]
    fn test_minimal_fit() {
        // 2^(32-p) - 2 >= n and 2^(32-(p+1)) - 2 < n
        let samples = (1..=2000u64)
            .chain([4094, 4095, 1 << 20, (1 << 24) - 2, (1 << 24) - 1, 3_000_000_000]);
        for n in samples {
            let p = required_prefix_len(n).unwrap();
            assert!(usable_hosts(p) >= n, "/{p} too small for {n} hosts");
            if p < MAX_LENGTH {
                assert!(usable_hosts(p + 1) < n, "/{} also fits {n} hosts", p + 1);
            }
        }
    }

    #[test]
    fn test_usable_hosts() {
        assert_eq!(usable_hosts(24), 254);
        assert_eq!(usable_hosts(30), 2);
        assert_eq!(usable_hosts(32), 0);
    }
}
