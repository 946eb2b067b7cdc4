/// Shots are addressed by a small integer id assigned at creation.
pub type ShotId = u32;

/// Project-wide generation seed.
pub type Seed = u64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
