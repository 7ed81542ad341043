//! Durable state: accounts, the follow graph and message history.

pub mod messages;
pub mod social;
pub mod users;
