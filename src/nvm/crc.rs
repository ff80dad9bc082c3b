//! CRC-32/IEEE as used by the retained clipboard trailer.
//!
//! Reflected polynomial `0xEDB88320`, initial value and final xor
//! `0xFFFFFFFF`. The table is built at compile time.

const POLY: u32 = 0xEDB8_8320;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Computes the CRC-32/IEEE checksum of `data`.
pub fn crc32_ieee(data: &[u8]) -> u32 {
    !crc32_ieee_update(!0, data)
}

/// Feeds `data` into a running (non-finalized) CRC register.
///
/// Start from `!0` and invert the result to finalize, or use [`crc32_ieee`].
pub fn crc32_ieee_update(mut crc: u32, data: &[u8]) -> u32 {
    for &byte in data {
        crc = TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc
}
