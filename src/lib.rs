//! # Sirius, an in-memory ranked leaderboard service
//!
//! Clients open a TCP connection, exchange length-prefixed binary frames, and issue
//! Get/GetByRank/GetRange/Update/Delete operations against one or more named ranks: bounded,
//! score-ordered collections of entries keyed by a 64-bit id. A rank may be a periodically
//! reseeded snapshot of another rank, and may refuse updates during configured quiet windows.
//!
//! State is purely in-memory; nothing here persists across a restart.

pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod logging;
pub mod message;
pub mod server;

pub use config::Config;
pub use error::{Result, SiriusError};
pub use server::App;
