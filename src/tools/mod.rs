//! Tool and resource registries.
//!
//! Registries are filled once at startup and are read-only afterwards.
//! Listing preserves registration order; names and URIs are unique keys.

pub mod student_data;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::backend::BackendClient;
use crate::error::ArgumentError;

/// Boxed future returned by tool handlers and resource producers.
pub type HandlerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Binds raw arguments and runs a tool.
pub type ToolHandler =
    for<'a> fn(&'a ToolContext, Value) -> HandlerFuture<'a, Result<Value, ArgumentError>>;

/// Produces a resource's text content.
pub type ResourceProducer = for<'a> fn(&'a ToolContext) -> HandlerFuture<'a, String>;

/// Everything handlers need at call time.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Backend API client.
    pub backend: BackendClient,
    /// User exposed through the `user://` resources.
    pub resource_user_id: i64,
}

/// A registered tool.
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
    /// Handler invoked by `tools/call`.
    pub handler: ToolHandler,
}

/// A registered resource.
pub struct ResourceDescriptor {
    /// Unique resource URI.
    pub uri: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Producer invoked by `resources/read`.
    pub producer: ResourceProducer,
}

/// Ordered tool registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. Returns `false` (and keeps the existing entry) if
    /// the name is already taken.
    pub fn register(&mut self, tool: ToolDescriptor) -> bool {
        if self.get(tool.name).is_some() {
            tracing::warn!(tool = tool.name, "Duplicate tool registration ignored");
            return false;
        }
        self.tools.push(tool);
        true
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Iterates tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Ordered resource registry.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: Vec<ResourceDescriptor>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource. Returns `false` (and keeps the existing entry)
    /// if the URI is already taken.
    pub fn register(&mut self, resource: ResourceDescriptor) -> bool {
        if self.get(resource.uri).is_some() {
            tracing::warn!(uri = resource.uri, "Duplicate resource registration ignored");
            return false;
        }
        self.resources.push(resource);
        true
    }

    /// Looks up a resource by URI.
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|resource| resource.uri == uri)
    }

    /// Iterates resources in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.iter()
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// The tools this server exposes.
#[must_use]
pub fn default_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(student_data::tool_descriptor());
    registry
}

/// The resources this server exposes.
#[must_use]
pub fn default_resources() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    for resource in student_data::resource_descriptors() {
        registry.register(resource);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tools_has_student_data_only() {
        let tools = default_tools();
        assert_eq!(tools.len(), 1);
        assert!(tools.get(student_data::TOOL_NAME).is_some());
        assert!(tools.get("missing").is_none());
    }

    #[test]
    fn duplicate_tool_is_rejected() {
        let mut tools = default_tools();
        assert!(!tools.register(student_data::tool_descriptor()));
        assert_eq!(tools.len(), 1);
    }

    #[test]
    fn resources_keep_registration_order() {
        let resources = default_resources();
        let uris: Vec<_> = resources.iter().map(|r| r.uri).collect();
        assert_eq!(
            uris,
            [
                student_data::PROFILE_RESOURCE_URI,
                student_data::COMPLETE_DATA_RESOURCE_URI
            ]
        );
    }
}
