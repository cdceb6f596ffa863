//! Design-model property extraction and chat session backend
//!
//! Pipeline: fetch a model's metadata from the derivative service, normalize
//! measurement units, project element properties into a per-model SQLite
//! store, and run chat sessions whose reasoning engine answers analytic
//! questions by querying that store.

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod remote;
pub mod schema;
pub mod session;
pub mod store;
pub mod units;

pub use config::Config;
pub use pipeline::AppContext;
pub use store::PropertyStore;
