//! HTTP clients for the engine's collaborator ports: inventory lookups,
//! consultation scheduling, and the Google Sheets intake sink.

pub mod inventory;
pub mod scheduling;
pub mod sheets;

pub use inventory::HttpInventoryClient;
pub use scheduling::HttpSchedulingClient;
pub use sheets::SheetsIntakeSink;
