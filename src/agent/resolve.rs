//! Agent id/alias resolution.
//!
//! A request reaches an agent identified by an id and an alias id. Each is
//! resolved independently, first present source wins:
//!
//! 1. an explicit target supplied by the caller,
//! 2. the request's `agent_config` override (the placeholder
//!    [`OVERRIDE_SENTINEL`] and empty strings count as absent),
//! 3. process configuration,
//! 4. the optional agent config file.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AgentError, AgentMode};
use crate::config::AgentsConfig;

/// Placeholder clients send when they do not mean to override anything.
pub const OVERRIDE_SENTINEL: &str = "optional-override";

/// A concrete agent to invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentTarget {
    pub agent_id: String,
    #[serde(rename = "agent_alias_id")]
    pub alias_id: String,
}

impl AgentTarget {
    pub fn new(agent_id: impl Into<String>, alias_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            alias_id: alias_id.into(),
        }
    }
}

/// Per-request override carried in the chat body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AgentOverride {
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default, alias = "alias_id")]
    pub agent_alias_id: Option<String>,
}

/// Id and alias as known to one configuration source; either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PartialTarget {
    agent_id: Option<String>,
    alias_id: Option<String>,
}

impl PartialTarget {
    fn new(agent_id: Option<&str>, alias_id: Option<&str>) -> Self {
        Self {
            agent_id: meaningful(agent_id),
            alias_id: meaningful(alias_id),
        }
    }
}

fn meaningful(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != OVERRIDE_SENTINEL)
        .map(str::to_string)
}

/// Resolves which agent a request targets.
#[derive(Debug, Clone, Default)]
pub struct AgentResolver {
    configured: HashMap<AgentMode, PartialTarget>,
    from_file: HashMap<AgentMode, PartialTarget>,
}

impl AgentResolver {
    /// Build from configuration, reading the agent config file if one exists.
    pub fn from_config(agents: &AgentsConfig) -> Self {
        let configured = HashMap::from([
            (
                AgentMode::QuickSight,
                PartialTarget::new(
                    agents.quicksight_agent_id.as_deref(),
                    agents.quicksight_agent_alias_id.as_deref(),
                ),
            ),
            (
                AgentMode::Supervisor,
                PartialTarget::new(
                    agents.supervisor_agent_id.as_deref(),
                    agents.supervisor_agent_alias_id.as_deref(),
                ),
            ),
        ]);

        let from_file = agents
            .config_file
            .as_deref()
            .map(|path| load_agent_file(Path::new(path)))
            .unwrap_or_default();

        Self { configured, from_file }
    }

    /// Resolve the target for `mode`.
    pub fn resolve(
        &self,
        mode: AgentMode,
        explicit: Option<&AgentTarget>,
        request_override: Option<&AgentOverride>,
    ) -> Result<AgentTarget, AgentError> {
        if let Some(target) = explicit {
            return Ok(target.clone());
        }

        let from_request = request_override
            .map(|o| PartialTarget::new(o.agent_id.as_deref(), o.agent_alias_id.as_deref()))
            .unwrap_or_default();
        let sources = [
            Some(&from_request),
            self.configured.get(&mode),
            self.from_file.get(&mode),
        ];

        let agent_id = sources.iter().flatten().find_map(|s| s.agent_id.clone());
        let alias_id = sources.iter().flatten().find_map(|s| s.alias_id.clone());

        match (agent_id, alias_id) {
            (Some(agent_id), Some(alias_id)) => Ok(AgentTarget { agent_id, alias_id }),
            _ => Err(AgentError::NotConfigured(format!(
                "{} ID 또는 Alias ID가 설정되지 않았습니다.",
                mode.display_name()
            ))),
        }
    }

    /// The target used when a request carries no override.
    pub fn default_target(&self, mode: AgentMode) -> Option<AgentTarget> {
        self.resolve(mode, None, None).ok()
    }

    pub fn is_configured(&self, mode: AgentMode) -> bool {
        self.default_target(mode).is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent config file
// ─────────────────────────────────────────────────────────────────────────────

/// Accepted layouts of the agent config file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgentFile {
    /// `{agent_id, agent_alias_id}`: the QuickSight agent.
    Single(FileAgent),
    /// Agents grouped by id, each with its aliases.
    Grouped(Vec<FileAgentGroup>),
}

#[derive(Debug, Deserialize)]
struct FileAgent {
    agent_id: String,
    agent_alias_id: String,
}

#[derive(Debug, Deserialize)]
struct FileAgentGroup {
    agent_id: String,
    #[serde(default)]
    agent_name: String,
    #[serde(default)]
    aliases: Vec<FileAlias>,
}

#[derive(Debug, Deserialize)]
struct FileAlias {
    agent_alias_id: String,
}

fn load_agent_file(path: &Path) -> HashMap<AgentMode, PartialTarget> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No agent config file");
            return HashMap::new();
        }
    };

    match serde_json::from_str::<AgentFile>(&contents) {
        Ok(file) => {
            let targets = targets_from_file(file);
            debug!(path = %path.display(), agents = targets.len(), "Loaded agent config file");
            targets
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed agent config file");
            HashMap::new()
        }
    }
}

fn targets_from_file(file: AgentFile) -> HashMap<AgentMode, PartialTarget> {
    match file {
        AgentFile::Single(agent) => HashMap::from([(
            AgentMode::QuickSight,
            PartialTarget::new(Some(agent.agent_id.as_str()), Some(agent.agent_alias_id.as_str())),
        )]),
        AgentFile::Grouped(groups) => AgentMode::ALL
            .into_iter()
            .filter_map(|mode| {
                let group = groups
                    .iter()
                    .find(|g| g.agent_name.to_lowercase().contains(mode.name_hint()))?;
                let alias = group.aliases.first().map(|a| a.agent_alias_id.as_str());
                Some((mode, PartialTarget::new(Some(group.agent_id.as_str()), alias)))
            })
            .collect(),
    }
}
