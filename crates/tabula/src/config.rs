use crate::Result;

use anyhow::Context as _;
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tabula_core::{
    driver::{Capability, Dialect},
    schema::PhysicalOptions,
};

/// Engine settings.
///
/// Every field has a default, so a partial JSON document is a valid
/// configuration:
///
/// ```
/// # use tabula::EngineConfig;
/// let config = EngineConfig::from_json(r#"{"id_chunk_size": 10, "audit": true}"#).unwrap();
/// assert_eq!(config.id_chunk_size, 10);
/// assert_eq!(config.state_columns, 1);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dialect used to resolve per-dialect descriptor text. Replaced by the
    /// driver's dialect when the engine is built.
    pub dialect: Dialect,

    /// Ids reserved per round trip to the sequence table.
    pub id_chunk_size: i64,

    /// Bitmask columns per state. Each column holds 64 principals.
    pub state_columns: usize,

    /// Scale used to format doubles that declare none.
    pub max_decimal_scale: u32,

    /// Maintain audit tables and triggers.
    pub audit: bool,

    /// Driver error translations, tried in order.
    pub messages: HashMap<Dialect, Vec<MessageRule>>,

    /// Directory of module descriptors, `*.table.json` and `*.view.json`.
    pub module_dir: Option<PathBuf>,

    /// Directory of local overrides layered onto the module descriptors.
    pub local_dir: Option<PathBuf>,
}

/// Rewrites a driver error whose text matches `pattern`. `message` may
/// refer to capture groups as `$1`, `$name`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageRule {
    pub pattern: String,
    pub message: String,
}

impl MessageRule {
    pub fn new(pattern: impl Into<String>, message: impl Into<String>) -> MessageRule {
        MessageRule {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            dialect: Dialect::Sqlite,
            id_chunk_size: 50,
            state_columns: 1,
            max_decimal_scale: 7,
            audit: false,
            messages: default_messages(),
            module_dir: None,
            local_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<EngineConfig> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<EngineConfig> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config; path={}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("invalid engine config; path={}", path.display()))?;
        Ok(config)
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn id_chunk_size(mut self, size: i64) -> Self {
        self.id_chunk_size = size;
        self
    }

    pub fn state_columns(mut self, columns: usize) -> Self {
        self.state_columns = columns;
        self
    }

    pub fn audit(mut self, audit: bool) -> Self {
        self.audit = audit;
        self
    }

    pub fn message(mut self, dialect: Dialect, rule: MessageRule) -> Self {
        self.messages.entry(dialect).or_default().push(rule);
        self
    }

    pub fn module_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.module_dir = Some(dir.into());
        self
    }

    pub fn local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    pub fn physical_options(&self) -> PhysicalOptions {
        PhysicalOptions {
            dialect: self.dialect,
            state_columns: self.state_columns.max(1),
            audit: self.audit,
        }
    }

    pub fn capability(&self) -> &'static Capability {
        Capability::for_dialect(self.dialect)
    }

    /// Translation rules for the configured dialect.
    pub fn message_rules(&self) -> &[MessageRule] {
        self.messages
            .get(&self.dialect)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn default_messages() -> HashMap<Dialect, Vec<MessageRule>> {
    let mut messages = HashMap::new();
    messages.insert(
        Dialect::Sqlite,
        vec![
            MessageRule::new(
                r"UNIQUE constraint failed: (\w+)\.(\w+)",
                "Duplicate value: $1.$2 must be unique",
            ),
            MessageRule::new(
                r"NOT NULL constraint failed: (\w+)\.(\w+)",
                "Value required: $1.$2",
            ),
            MessageRule::new(
                r"FOREIGN KEY constraint failed",
                "Row is referenced by other data or refers to a missing row",
            ),
        ],
    );
    messages.insert(
        Dialect::Postgresql,
        vec![
            MessageRule::new(
                r#"duplicate key value violates unique constraint "(\w+)""#,
                "Duplicate value ($1)",
            ),
            MessageRule::new(
                r#"violates foreign key constraint "(\w+)""#,
                "Row is referenced by other data or refers to a missing row ($1)",
            ),
        ],
    );
    messages.insert(
        Dialect::Mysql,
        vec![MessageRule::new(
            r"Duplicate entry '(.*)' for key",
            "Duplicate value: $1",
        )],
    );
    messages.insert(
        Dialect::Mssql,
        vec![MessageRule::new(
            r"Cannot insert duplicate key",
            "Duplicate value",
        )],
    );
    messages
}
