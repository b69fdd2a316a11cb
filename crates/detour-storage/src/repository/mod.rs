//! Database repositories for each table.

pub mod config;
pub mod force_list;
pub mod markers;
pub mod state;

pub use config::ConfigRepo;
pub use force_list::{normalize, ForceListRepo};
pub use markers::MarkerRepo;
pub use state::StateRepo;
