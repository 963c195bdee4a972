//! Byte-level utilities shared by the registration and signature parsers:
//! URL-safe base64, a fixed-length cursor pop, SHA-256, the DER/TLV length
//! parser used to slice the attestation certificate out of a registration
//! blob, and the Yubico attestation-certificate repair table.

use crate::u2f::error::Error;
use ring::digest::{digest, SHA256};

/// Encodes `data` as unpadded URL-safe base64.
pub fn websafe_encode(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes `data` (a string or ASCII byte slice) from URL-safe base64,
/// accepting both padded and unpadded input. Rejects any character outside
/// `[-_A-Za-z0-9=]`.
pub fn websafe_decode(data: &str) -> Result<Vec<u8>, Error> {
    let mut bytes = data.as_bytes().to_vec();
    if let Some(pos) = bytes
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'='))
    {
        return Err(Error::BadBase64(base64::DecodeError::InvalidByte(
            pos, bytes[pos],
        )));
    }
    let pad = (4 - bytes.len() % 4) % 4;
    bytes.extend(std::iter::repeat(b'=').take(pad));
    Ok(base64::decode_config(&bytes, base64::URL_SAFE)?)
}

/// Returns the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(digest(&SHA256, data).as_ref());
    out
}

/// Pops the first `len` bytes off `cursor`, returning them and advancing the
/// cursor. Fails if fewer than `len` bytes remain.
pub fn pop_bytes(cursor: &mut Vec<u8>, len: usize) -> Result<Vec<u8>, &'static str> {
    if cursor.len() < len {
        return Err("truncated message");
    }
    Ok(cursor.drain(..len).collect())
}

/// Pops a single byte off `cursor`.
pub fn pop_byte(cursor: &mut Vec<u8>) -> Result<u8, &'static str> {
    if cursor.is_empty() {
        return Err("truncated message");
    }
    Ok(cursor.remove(0))
}

/// Interprets `data[0]` as an ASN.1 DER tag and `data[1..]` as its length,
/// returning the total number of bytes (tag + length + content) the element
/// occupies.
pub fn parse_tlv_encoded_length(data: &[u8]) -> Result<usize, &'static str> {
    if data.len() < 2 {
        return Err("truncated DER length prefix");
    }
    let length = (data[1] & 0x7f) as usize;
    if data[1] & 0x80 == 0 {
        Ok(2 + length)
    } else {
        let bytes = data.get(2..2 + length).ok_or("truncated DER length bytes")?;
        let mut true_length: usize = 0;
        for byte in bytes {
            true_length = (true_length << 8) | (*byte as usize);
        }
        Ok(2 + length + true_length)
    }
}

/// SHA-256 digests of early Yubico attestation certificates whose ASN.1 BIT
/// STRING "unused bits" byte is non-zero where it must be zero. Content-
/// addressed, byte-exact denylist.
#[rustfmt::skip]
const INVALID_YUBICO_CERT_SHASUMS: [[u8; 32]; 6] = [
    [0x34, 0x9b, 0xca, 0x10, 0x31, 0xf8, 0xc8, 0x2c, 0x4c, 0xec, 0xa3, 0x8b, 0x9c, 0xeb, 0xf1, 0xa6,
     0x9d, 0xf9, 0xfb, 0x3b, 0x94, 0xee, 0xd9, 0x9e, 0xb3, 0xfb, 0x9a, 0xa3, 0x82, 0x2d, 0x26, 0xe8],
    [0xdd, 0x57, 0x45, 0x27, 0xdf, 0x60, 0x8e, 0x47, 0xae, 0x45, 0xfb, 0xba, 0x75, 0xa2, 0xaf, 0xdd,
     0x5c, 0x20, 0xfd, 0x94, 0xa0, 0x24, 0x19, 0x38, 0x18, 0x13, 0xcd, 0x55, 0xa2, 0xa3, 0x39, 0x8f],
    [0x1d, 0x87, 0x64, 0xf0, 0xf7, 0xcd, 0x13, 0x52, 0xdf, 0x61, 0x50, 0x04, 0x5c, 0x8f, 0x63, 0x8e,
     0x51, 0x72, 0x70, 0xe8, 0xb5, 0xdd, 0xa1, 0xc6, 0x3a, 0xde, 0x9c, 0x22, 0x80, 0x24, 0x0c, 0xae],
    [0xd0, 0xed, 0xc9, 0xa9, 0x1a, 0x16, 0x77, 0x43, 0x5a, 0x95, 0x33, 0x90, 0x86, 0x5d, 0x20, 0x8c,
     0x55, 0xb3, 0x18, 0x3c, 0x67, 0x59, 0xc9, 0xb5, 0xa7, 0xff, 0x49, 0x4c, 0x32, 0x25, 0x58, 0xeb],
    [0x60, 0x73, 0xc4, 0x36, 0xdc, 0xd0, 0x64, 0xa4, 0x81, 0x27, 0xdd, 0xbf, 0x60, 0x32, 0xac, 0x1a,
     0x66, 0xfd, 0x59, 0xa0, 0xc2, 0x44, 0x34, 0xf0, 0x70, 0xd4, 0xe5, 0x64, 0xc1, 0x24, 0xc8, 0x97],
    [0xca, 0x99, 0x31, 0x21, 0x84, 0x6c, 0x46, 0x4d, 0x66, 0x60, 0x96, 0xd3, 0x5f, 0x13, 0xbf, 0x44,
     0xc1, 0xb0, 0x5a, 0xf2, 0x05, 0xf9, 0xb4, 0xa1, 0xe0, 0x0c, 0xf6, 0xcc, 0x10, 0xc5, 0xe5, 0x11],
];

/// Patches the ASN.1 "unused bits" byte of a known-bad Yubico attestation
/// certificate in place; the identity function for every other certificate.
pub fn fix_invalid_yubico_cert(der: Vec<u8>) -> Vec<u8> {
    if der.len() < 257 {
        return der;
    }
    if INVALID_YUBICO_CERT_SHASUMS.contains(&sha256(&der)) {
        let mut der = der;
        let offset = der.len() - 257;
        der[offset] = 0x00;
        der
    } else {
        der
    }
}
