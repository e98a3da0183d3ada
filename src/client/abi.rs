//! Minimal ABI encoding for the handful of contract reads we make

use crate::error::{FetchError, Result};

/// `getUserCollections(address)`
pub const GET_USER_COLLECTIONS: [u8; 4] = [0x9a, 0xa5, 0xad, 0x8c];
/// `name()`
pub const NAME: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];
/// `contractURI()`
pub const CONTRACT_URI: [u8; 4] = [0xe8, 0xa3, 0xd4, 0x85];

const WORD: usize = 32;

/// Calldata for a zero-argument call
pub fn encode_call(selector: [u8; 4]) -> String {
    format!("0x{}", hex::encode(selector))
}

/// Calldata for a call taking one `address`
pub fn encode_address_call(selector: [u8; 4], address: &str) -> Result<String> {
    let raw = parse_address(address)?;
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&raw);
    Ok(format!("0x{}", hex::encode(data)))
}

/// Parse a 20-byte hex address
pub fn parse_address(address: &str) -> Result<[u8; 20]> {
    let stripped = address.trim().trim_start_matches("0x");
    let bytes = hex::decode(stripped)
        .map_err(|e| FetchError::InvalidResponse(format!("bad address {}: {}", address, e)))?;
    bytes
        .try_into()
        .map_err(|_| FetchError::InvalidResponse(format!("bad address length: {}", address)).into())
}

/// Decode `0x`-prefixed return data into bytes
pub fn decode_hex(data: &str) -> Result<Vec<u8>> {
    let stripped = data.trim().trim_start_matches("0x");
    hex::decode(stripped).map_err(|e| FetchError::InvalidResponse(e.to_string()).into())
}

/// Decode a single dynamic `string` return value
pub fn decode_string(data: &[u8]) -> Result<String> {
    let offset = read_usize(data, 0)?;
    let len = read_usize(data, offset)?;
    let start = checked_add(offset, WORD)?;
    let bytes = data
        .get(start..checked_add(start, len)?)
        .ok_or_else(|| FetchError::InvalidResponse("string out of bounds".to_string()))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| FetchError::InvalidResponse(format!("string is not UTF-8: {}", e)).into())
}

/// Decode a single dynamic `address[]` return value, as lowercase `0x` hex
pub fn decode_address_array(data: &[u8]) -> Result<Vec<String>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let offset = read_usize(data, 0)?;
    let len = read_usize(data, offset)?;

    let base = checked_add(offset, WORD)?;
    let end = len
        .checked_mul(WORD)
        .and_then(|size| base.checked_add(size))
        .ok_or_else(|| FetchError::InvalidResponse("array length overflows".to_string()))?;
    if end > data.len() {
        return Err(FetchError::InvalidResponse("address out of bounds".to_string()).into());
    }

    (0..len)
        .map(|i| {
            let at = base + i * WORD;
            let word = data
                .get(at..at + WORD)
                .ok_or_else(|| FetchError::InvalidResponse("address out of bounds".to_string()))?;
            Ok(format!("0x{}", hex::encode(&word[12..])))
        })
        .collect()
}

fn checked_add(a: usize, b: usize) -> Result<usize> {
    a.checked_add(b)
        .ok_or_else(|| FetchError::InvalidResponse("offset overflows".to_string()).into())
}

fn read_usize(data: &[u8], at: usize) -> Result<usize> {
    let word = data
        .get(at..checked_add(at, WORD)?)
        .ok_or_else(|| FetchError::InvalidResponse(format!("missing word at {}", at)))?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(FetchError::InvalidResponse("length exceeds u64".to_string()).into());
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(buf))
        .map_err(|_| FetchError::InvalidResponse("length exceeds usize".to_string()).into())
}
