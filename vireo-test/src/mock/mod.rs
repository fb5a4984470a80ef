//! Scripted and fault-injecting collaborators

pub mod history;
pub mod runner;
pub mod store;

pub use history::ScriptedHistory;
pub use runner::ScriptedRunner;
pub use store::{FaultyStore, StoreOperation};
