//! Wire types exchanged with clients.

pub mod health;
pub mod race;
pub mod sse;
pub mod teams;
pub mod transact;
pub mod ws;
