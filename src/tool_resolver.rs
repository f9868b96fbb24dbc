//! # Tool Path Resolver
//!
//! This module finds the external encoder in different environments:
//! - Explicit path from configuration
//! - Bundled tools directory (`TOOLS_DIR`)
//! - System PATH

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tool path resolver for bundled and system binaries
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a resolver honouring the `TOOLS_DIR` environment variable
    pub fn new() -> Self {
        let tools_dir = env::var_os("TOOLS_DIR")
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir());
        Self { tools_dir }
    }

    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(tools_dir.into()),
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = self.get_bundled_tool_path(tools_dir, tool_name);
            if bundled_path.exists() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
            debug!("Bundled path does not exist: {:?}", bundled_path);
        }

        if let Some(system_path) = self.find_in_system_path(tool_name) {
            debug!("Using system tool: {} -> {:?}", tool_name, system_path);
            return Some(system_path);
        }

        warn!("Tool not found: {}", tool_name);
        None
    }

    /// Resolve a tool, falling back to the bare command name so the launch
    /// error is reported by the caller
    pub fn command_for(&self, tool_name: &str) -> PathBuf {
        self.resolve_tool(tool_name)
            .unwrap_or_else(|| PathBuf::from(format!("{}{}", tool_name, env::consts::EXE_SUFFIX)))
    }

    /// Get the expected path for a bundled tool
    fn get_bundled_tool_path(&self, tools_dir: &Path, tool_name: &str) -> PathBuf {
        let platform = if cfg!(target_os = "macos") {
            "darwin"
        } else {
            env::consts::OS
        };
        let file_name = format!("{}{}", tool_name, env::consts::EXE_SUFFIX);

        // tools/{platform}/{tool}
        let direct_path = tools_dir.join(platform).join(&file_name);
        if direct_path.exists() {
            return direct_path;
        }

        // tools/{platform}/{tool}/{tool}
        let subfolder_path = tools_dir.join(platform).join(tool_name).join(&file_name);
        if subfolder_path.exists() {
            return subfolder_path;
        }

        direct_path
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, tool_name: &str) -> Option<PathBuf> {
        let tool_with_ext = format!("{}{}", tool_name, env::consts::EXE_SUFFIX);
        env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }

    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
