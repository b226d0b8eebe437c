//! Leverage common functionality across the consensus primitives.

use bytes::BufMut;
use shardbft_codec::varint;

mod time;
pub use time::SystemTimeExt;

/// Converts bytes to a hexadecimal string.
pub fn hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes.iter() {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Converts a hexadecimal string to bytes.
pub fn from_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Converts a hexadecimal string to bytes, stripping whitespace and/or a `0x` prefix.
pub fn from_hex_formatted(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.replace(['\t', '\n', '\r', ' '], "");
    let res = hex.strip_prefix("0x").unwrap_or(&hex);
    from_hex(res)
}

/// Returns whether `votes` strictly exceeds two-thirds of `n` (using integer division).
///
/// A committee of 4 requires 3 votes, a committee of 3 requires 3 votes, and a committee
/// of 1 requires 1 vote.
pub fn exceeds_two_thirds(votes: usize, n: usize) -> bool {
    votes > 2 * n / 3
}

/// Concatenate a namespace and a message, prepended by a varint encoding of the namespace length.
///
/// This produces a unique byte sequence (i.e. no collisions) for each `(namespace, msg)` pair.
pub fn union_unique(namespace: &[u8], msg: &[u8]) -> Vec<u8> {
    let len = u32::try_from(namespace.len()).expect("namespace too long");
    let mut result = Vec::with_capacity(varint::size(len) + namespace.len() + msg.len());
    varint::write(len, &mut result);
    result.put_slice(namespace);
    result.put_slice(msg);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        // Test case 0: empty bytes
        let b = &[];
        let h = hex(b);
        assert_eq!(h, "");
        assert_eq!(from_hex(&h).unwrap(), b.to_vec());

        // Test case 1: multiple bytes
        let b = &[0x01, 0x02, 0xab];
        let h = hex(b);
        assert_eq!(h, "0102ab");
        assert_eq!(from_hex(&h).unwrap(), b.to_vec());

        // Test case 2: odd number of characters
        assert!(from_hex("0102030").is_none());

        // Test case 3: invalid hexadecimal character
        assert!(from_hex("01g3").is_none());

        // Test case 4: multi-byte character
        assert!(from_hex("é1").is_none());
    }

    #[test]
    fn test_from_hex_formatted() {
        let b = vec![0x01, 0x02, 0x03];
        assert_eq!(from_hex_formatted("0x010203").unwrap(), b);
        assert_eq!(from_hex_formatted("  01 02\n03\t").unwrap(), b);
        assert!(from_hex_formatted("0x0").is_none());
    }

    #[test]
    fn test_exceeds_two_thirds() {
        // Committee of 4: 2*4/3 = 2
        assert!(!exceeds_two_thirds(2, 4));
        assert!(exceeds_two_thirds(3, 4));

        // Committee of 3: 2*3/3 = 2
        assert!(!exceeds_two_thirds(2, 3));
        assert!(exceeds_two_thirds(3, 3));

        // Committee of 1
        assert!(!exceeds_two_thirds(0, 1));
        assert!(exceeds_two_thirds(1, 1));

        // Committee of 22: 2*22/3 = 14
        assert!(!exceeds_two_thirds(14, 22));
        assert!(exceeds_two_thirds(15, 22));
    }

    #[test]
    fn test_union_unique() {
        let namespace = b"namespace";
        let msg = b"message";

        let mut expected = vec![0b0000_1001];
        expected.extend_from_slice(namespace);
        expected.extend_from_slice(msg);

        let result = union_unique(namespace, msg);
        assert_eq!(result, expected);
        assert_eq!(result.len(), result.capacity());
    }

    #[test]
    fn test_union_unique_zero_length() {
        let result = union_unique(b"", b"message");
        let mut expected = vec![0];
        expected.extend_from_slice(b"message");
        assert_eq!(result, expected);
    }

    #[test]
    fn test_union_unique_long_length() {
        // Use a namespace of over length 127.
        let namespace = &b"n".repeat(256);
        let msg = b"message";

        let mut expected = vec![0b1000_0000, 0b0000_0010];
        expected.extend_from_slice(namespace);
        expected.extend_from_slice(msg);

        let result = union_unique(namespace, msg);
        assert_eq!(result, expected);
        assert_eq!(result.len(), result.capacity());
    }
}
