//! API implementation submodules.
//!
//! Each submodule contains `impl LoraScoutApi` blocks that extend the public
//! API with domain-specific methods. The struct definition remains in
//! `lib.rs`.

mod builder;
mod catalog;
mod downloads;
mod library;
mod matching;
mod scan;
mod settings;
pub(crate) mod state;

pub use builder::LoraScoutApiBuilder;
pub use catalog::BestMatch;
