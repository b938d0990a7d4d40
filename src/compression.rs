//! Compression support for register logs
//!
//! VGM files are commonly distributed gzip-wrapped (`.vgz`). The
//! `decompress_if_needed()` function detects the gzip magic and inflates the
//! data with `flate2`; anything else passes through untouched, borrowed.
//!
//! Decompression is bounded by [`MAX_DECOMPRESSED_SIZE`].

use crate::{Opl3Error, Result};
use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::io::Read;

/// gzip member magic (RFC 1952)
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Maximum decompressed size: 64MB
///
/// Uncompressed VGM logs rarely exceed a few megabytes.
pub const MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

/// Check for the gzip magic
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Inflate gzip data if present, otherwise borrow the input unchanged
///
/// # Examples
/// ```
/// use opl3_replayer::compression::decompress_if_needed;
///
/// let data = b"Vgm \x00\x00\x00\x00";
/// let out = decompress_if_needed(data).unwrap();
/// assert_eq!(&out[..], &data[..]);
/// ```
pub fn decompress_if_needed(data: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !is_gzip(data) {
        return Ok(Cow::Borrowed(data));
    }

    let mut decompressed = Vec::new();
    // One byte past the limit tells an exact-size file from an oversized one
    let mut limited_reader = GzDecoder::new(data).take(MAX_DECOMPRESSED_SIZE as u64 + 1);
    limited_reader
        .read_to_end(&mut decompressed)
        .map_err(|e| Opl3Error::DecompressionError(format!("gzip decompression failed: {}", e)))?;

    if decompressed.len() > MAX_DECOMPRESSED_SIZE {
        return Err(Opl3Error::DecompressionError(format!(
            "decompressed data exceeds the {} byte limit",
            MAX_DECOMPRESSED_SIZE
        )));
    }

    log::debug!(
        "gzip: {} bytes inflated to {}",
        data.len(),
        decompressed.len()
    );
    Ok(Cow::Owned(decompressed))
}
