//! Id generation for new entries.
//!
//! Ids have the form `{unix_millis}-{suffix}` where the suffix is nine
//! random base36 characters. They are approximately time-ordered: two ids
//! generated in the same millisecond are ordered only by their suffix, and
//! clock adjustments can reorder ids across milliseconds.

use rand::seq::SliceRandom;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of random base36 characters in a generated id (~46 bits).
pub const SUFFIX_LEN: usize = 9;

/// Generate a new unique id.
pub fn generate_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .filter_map(|_| BASE36.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect();
    format!("{}-{}", millis, suffix)
}
