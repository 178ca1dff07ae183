//! Snowflake ID Generator
//!
//! Time-sortable 64-bit IDs for messages, servers, channels and DM rooms.
//!
//! ```text
//! 63                         22          17          12          0
//! +---------------------------+-----------+-----------+-----------+
//! |         timestamp         |  machine  |   node    |  sequence |
//! +---------------------------+-----------+-----------+-----------+
//! ```

use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Custom epoch (2024-01-01T00:00:00.000Z)
pub const HUDDLE_EPOCH: u64 = 1_704_067_200_000;

const SEQUENCE_MASK: u64 = 0xFFF;

#[derive(Debug, Default)]
struct Clock {
    last_timestamp: u64,
    sequence: u64,
}

/// Snowflake ID generator
#[derive(Debug)]
pub struct SnowflakeGenerator {
    machine_id: u64,
    node_id: u64,
    clock: Mutex<Clock>,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u64, node_id: u64) -> Self {
        Self {
            machine_id: machine_id & 0x1F, // 5 bits
            node_id: node_id & 0x1F,       // 5 bits
            clock: Mutex::new(Clock::default()),
        }
    }

    /// Generate a new snowflake ID.
    ///
    /// IDs are strictly increasing per generator, even when the wall
    /// clock stalls or the 4096-per-millisecond sequence overflows.
    pub fn generate(&self) -> i64 {
        let mut clock = self.clock.lock();
        let mut timestamp = current_timestamp().max(clock.last_timestamp);

        if timestamp == clock.last_timestamp {
            clock.sequence = (clock.sequence + 1) & SEQUENCE_MASK;
            if clock.sequence == 0 {
                // Sequence exhausted for this millisecond, borrow the next one
                timestamp += 1;
            }
        } else {
            clock.sequence = 0;
        }
        clock.last_timestamp = timestamp;

        let id = ((timestamp - HUDDLE_EPOCH) << 22)
            | (self.machine_id << 17)
            | (self.node_id << 12)
            | clock.sequence;

        id as i64
    }
}

/// Current time in milliseconds, never earlier than the epoch.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(HUDDLE_EPOCH)
        .max(HUDDLE_EPOCH)
}

/// Extract timestamp from snowflake ID
pub fn extract_timestamp(snowflake: i64) -> u64 {
    ((snowflake as u64) >> 22) + HUDDLE_EPOCH
}
