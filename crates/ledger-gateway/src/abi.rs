//! Minimal ABI codec for the note and echo contracts
//!
//! The contract surface is small and fixed, so calldata is built and
//! decoded by hand against precomputed selectors instead of pulling in a
//! full ABI library. All words are 32 bytes, big-endian.

use crate::error::GatewayError;

/// ERC-721 `ownerOf(uint256)`
pub const SEL_OWNER_OF: &str = "0x6352211e";
/// ERC-721 `tokenURI(uint256)`
pub const SEL_TOKEN_URI: &str = "0xc87b56dd";
/// `getTotalTips(uint256)`
pub const SEL_TOTAL_TIPS: &str = "0x2f745c59";
/// `getMintFee(address)`
pub const SEL_MINT_FEE: &str = "0xd96a094a";
/// `getFreeMintRemaining(address)`
pub const SEL_FREE_MINT_REMAINING: &str = "0x9b1f9e74";
/// `getEchoFee()`
pub const SEL_ECHO_FEE: &str = "0x8b7afe2e";
/// `getEchoes(string)` -> `uint256[]` echo token ids
pub const SEL_GET_ECHOES: &str = "0x41c0e1b5";

/// topic0 of `NoteMinted(uint256 indexed tokenId, address indexed broadcaster, string noteId, uint64 expiresAt)`
pub const TOPIC_NOTE_MINTED: &str =
    "0x8f5e4c1d6a2b3f70914ac55e2b8cf3d1a07e9d64b20f1c83755ea6d0c49b1e27";

/// Strip an optional `0x` prefix.
fn strip0x(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Parse a hex quantity (`0x`-prefixed or bare) to u64.
pub fn parse_hex_u64(s: &str) -> u64 {
    u64::from_str_radix(strip0x(s), 16).unwrap_or(0)
}

/// Format a u64 as a `0x`-prefixed hex quantity.
pub fn to_hex_u64(v: u64) -> String {
    format!("0x{:x}", v)
}

/// Decode a hex string into bytes.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, GatewayError> {
    let s = strip0x(s);
    if s.len() % 2 != 0 {
        return Err(GatewayError::Decode(format!("odd hex length {}", s.len())));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| GatewayError::Decode(format!("bad hex at {}", i)))
        })
        .collect()
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Encode a u64 as a single right-aligned 32-byte word.
pub fn encode_word_u64(v: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&v.to_be_bytes());
    word
}

/// Encode an address string as a single right-aligned 32-byte word.
pub fn encode_word_address(addr: &str) -> Result<[u8; 32], GatewayError> {
    let bytes = hex_to_bytes(addr)?;
    if bytes.len() != 20 {
        return Err(GatewayError::Decode(format!(
            "address must be 20 bytes, got {}",
            bytes.len()
        )));
    }
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

/// Build calldata for a call taking a single uint256 argument.
pub fn call_uint(selector: &str, v: u64) -> Result<String, GatewayError> {
    let mut data = hex_to_bytes(selector)?;
    data.extend_from_slice(&encode_word_u64(v));
    Ok(bytes_to_hex(&data))
}

/// Build calldata for a call taking a single address argument.
pub fn call_address(selector: &str, addr: &str) -> Result<String, GatewayError> {
    let mut data = hex_to_bytes(selector)?;
    data.extend_from_slice(&encode_word_address(addr)?);
    Ok(bytes_to_hex(&data))
}

/// Build calldata for a call taking no arguments.
pub fn call_plain(selector: &str) -> Result<String, GatewayError> {
    Ok(bytes_to_hex(&hex_to_bytes(selector)?))
}

/// Build calldata for a call taking a single string argument.
pub fn call_string(selector: &str, s: &str) -> Result<String, GatewayError> {
    let mut data = hex_to_bytes(selector)?;
    // head: offset to the string tail
    data.extend_from_slice(&encode_word_u64(0x20));
    // tail: length word then padded bytes
    let bytes = s.as_bytes();
    data.extend_from_slice(&encode_word_u64(bytes.len() as u64));
    data.extend_from_slice(bytes);
    let pad = (32 - bytes.len() % 32) % 32;
    data.extend_from_slice(&vec![0u8; pad]);
    Ok(bytes_to_hex(&data))
}

fn word_at(data: &[u8], index: usize) -> Result<&[u8], GatewayError> {
    index
        .checked_mul(32)
        .filter(|start| data.len() >= 32 && *start <= data.len() - 32)
        .map(|start| &data[start..start + 32])
        .ok_or_else(|| GatewayError::Decode(format!("missing word {}", index)))
}

/// Decode word `index` of `data` as u64 (ignoring high bytes).
pub fn decode_u64(data: &[u8], index: usize) -> Result<u64, GatewayError> {
    let word = word_at(data, index)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf))
}

/// Decode word `index` of `data` as u128 (ignoring high bytes).
pub fn decode_u128(data: &[u8], index: usize) -> Result<u128, GatewayError> {
    let word = word_at(data, index)?;
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(buf))
}

/// Decode word `index` of `data` as a checksummed-free lowercase address.
pub fn decode_address(data: &[u8], index: usize) -> Result<String, GatewayError> {
    let word = word_at(data, index)?;
    Ok(bytes_to_hex(&word[12..]))
}

/// Decode an ABI-encoded dynamic string whose head word sits at `index`.
pub fn decode_string(data: &[u8], index: usize) -> Result<String, GatewayError> {
    let offset = decode_u64(data, index)? as usize;
    if offset % 32 != 0 || data.len() < 32 || offset > data.len() - 32 {
        return Err(GatewayError::Decode(format!("bad string offset {}", offset)));
    }
    let len = decode_u64(data, offset / 32)? as usize;
    let start = offset + 32;
    let end = start
        .checked_add(len)
        .ok_or_else(|| GatewayError::Decode(format!("bad string length {}", len)))?;
    let bytes = data
        .get(start..end)
        .ok_or_else(|| GatewayError::Decode("string tail out of bounds".to_string()))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| GatewayError::Decode("string is not utf-8".to_string()))
}

/// Decode an ABI-encoded `uint256[]` return value.
pub fn decode_u64_array(data: &[u8]) -> Result<Vec<u64>, GatewayError> {
    if data.is_empty() {
        return Ok(vec![]);
    }
    let offset = decode_u64(data, 0)? as usize;
    let len = decode_u64(data, offset / 32)? as usize;
    // length word is untrusted; the elements must actually fit in the payload
    if len > data.len() / 32 {
        return Err(GatewayError::Decode(format!("bad array length {}", len)));
    }
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        out.push(decode_u64(data, offset / 32 + 1 + i)?);
    }
    Ok(out)
}

/// Decode a single indexed topic (32-byte hex string) as u64.
pub fn topic_u64(topic: &str) -> Result<u64, GatewayError> {
    let bytes = hex_to_bytes(topic)?;
    decode_u64(&bytes, 0)
}

/// Decode a single indexed topic as an address.
pub fn topic_address(topic: &str) -> Result<String, GatewayError> {
    let bytes = hex_to_bytes(topic)?;
    decode_address(&bytes, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_basic() {
        assert_eq!(parse_hex_u64("0x1"), 1);
        assert_eq!(parse_hex_u64("0xff"), 255);
        assert_eq!(parse_hex_u64("1234"), 0x1234);
        assert_eq!(to_hex_u64(255), "0xff");
    }

    #[test]
    fn uint_call_layout() {
        let data = call_uint(SEL_OWNER_OF, 7).unwrap();
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with(SEL_OWNER_OF));
        assert!(data.ends_with("07"));
    }

    #[test]
    fn string_call_round_trip() {
        let data = call_string(SEL_GET_ECHOES, "note-abc123").unwrap();
        let bytes = hex_to_bytes(&data).unwrap();
        // skip the 4-byte selector, then decode the argument back
        let arg = decode_string(&bytes[4..], 0).unwrap();
        assert_eq!(arg, "note-abc123");
    }

    #[test]
    fn string_call_pads_to_word() {
        let data = hex_to_bytes(&call_string(SEL_GET_ECHOES, "x").unwrap()).unwrap();
        assert_eq!((data.len() - 4) % 32, 0);
    }

    #[test]
    fn decode_words() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_word_u64(42));
        data.extend_from_slice(
            &encode_word_address("0x00000000000000000000000000000000000000ab").unwrap(),
        );
        assert_eq!(decode_u64(&data, 0).unwrap(), 42);
        assert_eq!(decode_u128(&data, 0).unwrap(), 42);
        assert_eq!(
            decode_address(&data, 1).unwrap(),
            "0x00000000000000000000000000000000000000ab"
        );
    }

    #[test]
    fn decode_array() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_word_u64(0x20)); // offset
        data.extend_from_slice(&encode_word_u64(3)); // length
        data.extend_from_slice(&encode_word_u64(10));
        data.extend_from_slice(&encode_word_u64(20));
        data.extend_from_slice(&encode_word_u64(30));
        assert_eq!(decode_u64_array(&data).unwrap(), vec![10, 20, 30]);
        assert_eq!(decode_u64_array(&[]).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn decode_string_rejects_bad_offset() {
        let data = encode_word_u64(31).to_vec();
        assert!(decode_string(&data, 0).is_err());
        let data = [0xff; 32].to_vec();
        assert!(decode_string(&data, 0).is_err());
    }

    #[test]
    fn decode_string_rejects_huge_length() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_word_u64(0x20)); // offset
        data.extend_from_slice(&[0xff; 32]); // length word
        assert!(matches!(
            decode_string(&data, 0),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn decode_array_rejects_huge_length() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_word_u64(0x20)); // offset
        data.extend_from_slice(&[0xff; 32]); // length word
        assert!(matches!(
            decode_u64_array(&data),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn decode_array_rejects_truncated_tail() {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_word_u64(0x20)); // offset
        data.extend_from_slice(&encode_word_u64(3)); // length, but only one element follows
        data.extend_from_slice(&encode_word_u64(10));
        assert!(decode_u64_array(&data).is_err());
    }
}
