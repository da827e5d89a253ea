use crate::error::{AdapterError, Result};
use evolution_http_tools::descriptor::ToolDescriptor;
use std::collections::HashMap;

/// Immutable name → descriptor table, built once at startup.
///
/// Listing order is the order tools were registered in.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// # Errors
    ///
    /// Returns a config error if two tools share a name.
    pub fn new(tools: Vec<ToolDescriptor>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(tools.len());
        for (idx, tool) in tools.iter().enumerate() {
            if by_name.insert(tool.name.clone(), idx).is_some() {
                return Err(AdapterError::Config(format!(
                    "Duplicate tool name '{}'",
                    tool.name
                )));
            }
        }
        Ok(Self { tools, by_name })
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    #[must_use]
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
