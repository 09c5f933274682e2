//! Payload masking (RFC 6455 §5.3).
//!
//! Masking XORs every payload byte with `key[i % 4]`. Applying it twice with
//! the same key gives back the input, so masking and unmasking are one
//! function.

/// A 4-byte masking key as it appears on the wire.
pub type MaskingKey = [u8; 4];

/// XORs `payload` in place with `key`.
#[inline]
pub fn apply_mask(payload: &mut [u8], key: MaskingKey) {
    apply_mask_offset(payload, key, 0);
}

/// XORs `payload` in place with `key`, starting at key position `offset`.
///
/// Used when a masked payload is processed in pieces: `offset` is the number
/// of payload bytes already handled.
pub fn apply_mask_offset(payload: &mut [u8], key: MaskingKey, offset: usize) {
    let mut rotated = [0u8; 4];
    for (i, slot) in rotated.iter_mut().enumerate() {
        *slot = key[(offset + i) & 3];
    }
    let word = u32::from_ne_bytes(rotated);
    let mut chunks = payload.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let masked = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ word;
        chunk.copy_from_slice(&masked.to_ne_bytes());
    }
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= rotated[i];
    }
}

/// Returns a masked copy of `payload`.
pub fn mask(payload: &[u8], key: MaskingKey) -> Vec<u8> {
    let mut out = payload.to_vec();
    apply_mask(&mut out, key);
    out
}

/// Returns an unmasked copy of `payload`. Same operation as [`mask`].
pub fn unmask(payload: &[u8], key: MaskingKey) -> Vec<u8> {
    mask(payload, key)
}

/// Draws a fresh masking key from the thread-local CSPRNG.
pub fn random_mask_key() -> MaskingKey {
    rand::random()
}
