//! Test fixtures shared by the Boversal crates
//!
//! - `TestDatabase` (feature `postgres`): Postgres 18 container with the
//!   workspace migrations applied, plus user seeding
//! - `TestRedis` (feature `redis`): Redis 8 container with stream inspection
//! - `TestDataBuilder`: seeded owners, titles and attendee lists
//!
//! Container tests need Docker and are marked `#[ignore]`:
//! `cargo test -- --ignored`.
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestDatabase};
//!
//! #[tokio::test]
//! #[ignore]
//! async fn reminders_for_owner() {
//!     let db = TestDatabase::new().await;
//!     let data = TestDataBuilder::from_test_name("reminders_for_owner");
//!     db.create_test_user(data.user_id(), &data.email("owner")).await;
//! }
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Seeded test data, so two runs of one test see the same ids and addresses
/// while different tests never collide on the `users.email` unique index.
#[derive(Debug, Clone, Copy)]
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the test's name.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let a = TestDataBuilder::from_test_name("test_expiry");
    /// let b = TestDataBuilder::from_test_name("test_expiry");
    /// assert_eq!(a.user_id(), b.user_id());
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Owner id; never nil.
    pub fn user_id(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        bytes[8..].copy_from_slice(&(!self.seed).to_le_bytes());
        Uuid::from_bytes(bytes)
    }

    pub fn email(&self, local: &str) -> String {
        format!("{}-{}@example.com", local, self.seed)
    }

    /// `count` distinct attendee addresses, in a stable order.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let attendees = TestDataBuilder::new(7).attendees(2);
    /// assert_eq!(attendees, vec!["attendee0-7@example.com", "attendee1-7@example.com"]);
    /// ```
    pub fn attendees(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| self.email(&format!("attendee{}", i)))
            .collect()
    }

    /// A title that fits the 255 character column.
    pub fn title(&self, what: &str) -> String {
        format!("{} #{}", what, self.seed % 10_000)
    }
}
