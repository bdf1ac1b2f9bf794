//! Built-in tool catalogue and the registry that dispatches calls into it.

mod registry;
pub mod tools;

pub use registry::ToolRegistry;

/// Wire every built-in tool into a fresh registry. Called once at startup.
pub fn register_builtin_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    tools::io::register(&mut registry);
    tools::web::register(&mut registry);
    tools::math::register(&mut registry);
    tools::text::register(&mut registry);
    tools::system::register(&mut registry);
    tools::data::register(&mut registry);
    tools::security::register(&mut registry);
    tools::encoding::register(&mut registry);
    tools::docs::register(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtin_tools_are_registered() {
        let registry = register_builtin_tools();
        let ids = registry.list();
        assert!(ids.contains(&"io.read_file".to_string()));
        assert!(ids.contains(&"web.search".to_string()));
        assert!(ids.contains(&"math.eval".to_string()));
        assert!(ids.contains(&"text.diff".to_string()));
        assert!(ids.contains(&"system.clock".to_string()));
        assert!(ids.contains(&"data.schema".to_string()));
        assert!(ids.contains(&"security.base64".to_string()));
        assert!(ids.contains(&"encoding.url".to_string()));
        assert!(ids.contains(&"docs.markdown".to_string()));
        assert_eq!(ids.len(), 23);
    }
}
