//! Safety policies used by sandboxed tools.
//!
//! These are design contracts: implementations may extend but not weaken
//! them. Keep additions here rather than loosening an existing pattern.

pub mod net;
pub mod paths;
pub mod shell;

pub use net::validate_url;
pub use paths::is_restricted_path;
pub use shell::{compile_deny_patterns, guard_command};
