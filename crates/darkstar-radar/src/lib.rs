//! Darkstar radar: consumes simulation updates, keeps a trackfile per
//! contact and collects contacts into tactical groups on demand.

mod db;
mod grouping;
mod queries;
mod scope;

pub use db::ContactDatabase;
pub use scope::{FadedCallback, RemovedCallback, Scope, ScopeSettings};
