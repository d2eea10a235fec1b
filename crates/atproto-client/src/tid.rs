//! Timestamp-based record key (TID) generation
//!
//! A TID packs a microsecond timestamp shifted left 10 bits with a 10-bit
//! clock ID, encoded as 13 characters of the sortable base-32 alphabet.
//! The clock ID starts at a per-process pseudo-random value and increments
//! (wrapping) on every call, and the last issued value is tracked so keys
//! are strictly increasing even when the wrap or a clock step backwards
//! would otherwise reorder them.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const TID_ALPHABET: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";
const TID_LEN: usize = 13;
const CLOCK_ID_MASK: u16 = 0x3ff;

struct TidState {
    clock_id: u16,
    last: u128,
}

/// Generator for lexicographically sortable record keys
pub struct TidGenerator {
    state: Mutex<TidState>,
}

impl TidGenerator {
    pub fn new() -> Self {
        // Seed the clock ID from clock entropy; it only needs to differ
        // between processes writing to the same repository.
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u16)
            .unwrap_or(0)
            & CLOCK_ID_MASK;
        Self {
            state: Mutex::new(TidState {
                clock_id: seed,
                last: 0,
            }),
        }
    }

    /// Mint the next record key
    pub fn next(&self) -> String {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        let mut state = self.state.lock().expect("TID clock state poisoned");
        let mut value = ((micros as u128) << 10) | (state.clock_id as u128);
        state.clock_id = (state.clock_id + 1) & CLOCK_ID_MASK;
        if value <= state.last {
            value = state.last + 1;
        }
        state.last = value;

        encode_base32(value)
    }
}

impl Default for TidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_base32(mut value: u128) -> String {
    let mut buf = [0u8; TID_LEN];
    for slot in buf.iter_mut().rev() {
        *slot = TID_ALPHABET[(value & 31) as usize];
        value >>= 5;
    }
    buf.iter().map(|&b| b as char).collect()
}
