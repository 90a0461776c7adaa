//! Redis connector

mod connector;

pub use connector::{connect, connect_with_retry};

pub use redis::aio::ConnectionManager;
