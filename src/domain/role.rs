use crate::domain::error::IqmsError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Permission level inside a subsection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Creator,
    Verifier,
    Approver,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Creator, Level::Verifier, Level::Approver];

    pub fn number(&self) -> u8 {
        match self {
            Level::Creator => 1,
            Level::Verifier => 2,
            Level::Approver => 3,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Creator => "creator",
            Level::Verifier => "verifier",
            Level::Approver => "approver",
        };
        f.write_str(name)
    }
}

/// Functional module a role operates in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Pay,
    Posting,
    Records,
}

impl Module {
    /// Suffix appended to role keys, also sent as `MODULE_CAT`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Module::Pay => "A",
            Module::Posting => "B",
            Module::Records => "C",
        }
    }
}

// 子科室 -> 角色代码前缀
static SUBSECTION_PREFIXES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("pay-accounts", "U"),
        ("pay-audit", "V"),
        ("postings", "P"),
        ("postings-overseas", "Q"),
        ("records", "R"),
        ("records-archive", "S"),
    ])
});

/// Prefix of a known subsection, or `None` if the subsection is not mapped.
pub fn subsection_prefix(subsection: &str) -> Option<&'static str> {
    SUBSECTION_PREFIXES
        .get(subsection.trim().to_ascii_lowercase().as_str())
        .copied()
}

/// The operating context of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRole {
    pub subsection: String,
    pub module: Module,
    pub level: Level,
    #[serde(default)]
    pub cells: Vec<String>,
}

/// Filters derived from a role for one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFilter {
    pub dept_code: String,
    pub module_cat: String,
    pub cells: Vec<String>,
}

impl RoleFilter {
    /// Cell allocation filter as sent to the batch endpoints.
    pub fn cell_filter(&self) -> String {
        self.cells.join(",")
    }
}

/// Builds the "pending with" code of a role at a level, e.g. `U1A`.
pub fn role_key(role: &ActiveRole, level: Level) -> Result<String, IqmsError> {
    let prefix = subsection_prefix(&role.subsection).ok_or_else(|| {
        IqmsError::InvalidRole(format!("unknown subsection '{}'", role.subsection))
    })?;
    Ok(format!("{}{}{}", prefix, level.number(), role.module.suffix()))
}

impl ActiveRole {
    pub fn key(&self, level: Level) -> Result<String, IqmsError> {
        role_key(self, level)
    }

    /// Keys of every level of this role, in level order.
    pub fn all_keys(&self) -> Result<Vec<String>, IqmsError> {
        Level::ALL.iter().map(|level| role_key(self, *level)).collect()
    }

    pub fn filter(&self, level: Level) -> Result<RoleFilter, IqmsError> {
        Ok(RoleFilter {
            dept_code: role_key(self, level)?,
            module_cat: self.module.suffix().to_string(),
            cells: self
                .cells
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        })
    }
}

impl fmt::Display for ActiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:?}/{}", self.subsection, self.module, self.level)
    }
}
