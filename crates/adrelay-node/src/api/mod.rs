//! HTTP API handlers.

pub mod campaigns;
pub mod capabilities;
pub mod chat;
pub mod error;
pub mod health;

#[cfg(test)]
pub(crate) mod testing;
