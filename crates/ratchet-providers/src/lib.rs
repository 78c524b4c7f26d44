//! ---
//! ratchet_section: "02-script-sources"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Script providers and shared exports."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
//! Script providers enumerate candidate scripts without running them.
//!
//! Every provider takes its [`ScriptOptions`](ratchet_core::ScriptOptions)
//! and an optional name predicate at construction. Script bodies stay
//! deferred until the engine materialises them.
#![warn(missing_docs)]

pub mod code;
pub mod composite;
pub mod embedded;
pub mod filesystem;

pub use code::{CodeScript, CodeScriptFactory, CodeScriptProvider};
pub use composite::CompositeScriptProvider;
pub use embedded::StaticScriptProvider;
pub use filesystem::FileSystemScriptProvider;
