//! Frame checksum
//!
//! Standard CRC-32 (IEEE 802.3, reflected, init and xorout 0xFFFFFFFF) over
//! every byte that precedes the CRC slot: header, optional return code and
//! payload. The result is written big-endian.

use tracing::trace;

/// Calculate the CRC of a frame prefix
///
/// # Examples
///
/// ```
/// use tuyalink_core::checksum;
///
/// assert_eq!(checksum::calculate(b"123456789"), 0xCBF4_3926);
/// ```
pub fn calculate(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    let crc = hasher.finalize();

    trace!(
        len = data.len(),
        crc = format!("0x{:08X}", crc),
        "Calculated checksum"
    );

    crc
}

/// Verify checksum
pub fn verify(data: &[u8], expected: u32) -> bool {
    calculate(data) == expected
}
