//! Agent registry and the runtime adapters that speak to registered agents.

mod http;
mod local;
mod registry;

pub use http::HttpAdapter;
pub use local::LocalAdapter;
pub use registry::{AgentRegistry, ListFilter};
