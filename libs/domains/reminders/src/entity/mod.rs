//! Sea-ORM entities for the tables the poller reads.

pub mod reminder;
pub mod user;
