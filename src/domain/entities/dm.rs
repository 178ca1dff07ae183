//! Direct-message rooms.
//!
//! A DM room wraps a hidden virtual server holding exactly one text
//! channel, keyed by the unordered pair of its two participants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Canonical (sorted) pair of distinct user ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DmPair {
    low: i64,
    high: i64,
}

impl DmPair {
    /// Canonicalize two user ids. Returns `None` when both are the same user.
    pub fn new(a: i64, b: i64) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }

    pub fn contains(&self, user_id: i64) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other(&self, user_id: i64) -> Option<i64> {
        if user_id == self.low {
            Some(self.high)
        } else if user_id == self.high {
            Some(self.low)
        } else {
            None
        }
    }

    pub fn members(&self) -> [i64; 2] {
        [self.low, self.high]
    }
}

/// A durable DM virtual room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmRoom {
    /// ID of the backing virtual server
    pub id: i64,
    /// ID of the room's single text channel
    pub channel_id: i64,
    pub pair: DmPair,
    pub created_at: DateTime<Utc>,
}

/// Repository trait for DM virtual rooms.
#[async_trait]
pub trait DmRepository: Send + Sync {
    async fn find_by_pair(&self, pair: DmPair) -> Result<Option<DmRoom>, AppError>;

    /// Atomically return the room for `pair`, creating it from `candidate`
    /// when none exists. The boolean is true when `candidate` was stored.
    async fn create_if_absent(&self, candidate: DmRoom) -> Result<(DmRoom, bool), AppError>;

    /// The DM room whose channel is `channel_id`, if that channel is a DM channel.
    async fn find_by_channel(&self, channel_id: i64) -> Result<Option<DmRoom>, AppError>;

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<DmRoom>, AppError>;
}
