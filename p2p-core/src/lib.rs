//! p2p-core: Shared infrastructure for the P2P CIS payment frontend.
pub mod error;
pub mod middleware;
pub mod observability;
pub mod utils;
