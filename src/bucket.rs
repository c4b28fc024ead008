//! Consistent percentage bucketing.
//!
//! A user's bucket for a flag is a pure function of the user identity and the
//! flag key, so changing rollout weights only moves thresholds and never
//! reshuffles users.

/// MurmurHash3, x86 32-bit variant.
#[must_use]
pub fn murmur3_x86_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, byte) in tail.iter().enumerate() {
            k |= u32::from(*byte) << (8 * i);
        }
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
    }

    #[allow(clippy::cast_possible_truncation)]
    let len = data.len() as u32;
    h ^= len;
    fmix32(h)
}

fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Bucket in `1..=100` for `user_id` under `flag_key`.
///
/// The hash is read as a signed 32-bit integer; its remainder by 100 keeps
/// the sign, so the absolute value is taken before shifting into range.
#[must_use]
pub fn bucket(user_id: &str, flag_key: &str) -> u32 {
    let mut key = String::with_capacity(user_id.len() + flag_key.len());
    key.push_str(user_id);
    key.push_str(flag_key);
    #[allow(clippy::cast_possible_wrap)]
    let hash = murmur3_x86_32(key.as_bytes(), 0) as i32;
    (hash % 100).unsigned_abs() + 1
}
