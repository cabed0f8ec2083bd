use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use slog::{warn, Logger};

/// Placement mode, keyed in JSON the way spec's wire format spells it
/// (`"in-memory"` / `"forked"`). `Other` retains any string that isn't one
/// of the two recognized modes, so a bad `mode` in a config file reaches
/// `ActorSystem::create_actor`'s dispatch (and `ErrUnknownMode`) instead of
/// failing JSON deserialization and silently falling back to an empty
/// config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    InMemory,
    Forked,
    Other(String),
}

impl Default for Mode {
    fn default() -> Self {
        Mode::InMemory
    }
}

impl Mode {
    fn as_str(&self) -> &str {
        match self {
            Mode::InMemory => "in-memory",
            Mode::Forked => "forked",
            Mode::Other(raw) => raw.as_str(),
        }
    }
}

impl Serialize for Mode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Err(D::Error::custom("placement mode must not be empty"));
        }
        Ok(match raw.as_str() {
            "in-memory" => Mode::InMemory,
            "forked" => Mode::Forked,
            _ => Mode::Other(raw),
        })
    }
}

/// Per-actor placement override. `mode` and `cluster_size` are the
/// recognized keys; anything else in a config entry is carried through to
/// the behavior as free-form data.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Placement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(rename = "clusterSize", default, skip_serializing_if = "Option::is_none")]
    pub cluster_size: Option<usize>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Placement {
    pub fn mode(&self) -> Mode {
        self.mode.clone().unwrap_or_default()
    }

    pub fn cluster_size(&self) -> usize {
        self.cluster_size.unwrap_or(1).max(1)
    }

    /// Layers `override_` on top of `self`: default `{mode: "in-memory"}` is
    /// overlaid by a config-file entry, which is overlaid by the caller's
    /// per-call options. Each layer only replaces fields the layer above
    /// actually set.
    pub fn overlay(mut self, override_: &Placement) -> Placement {
        if override_.mode.is_some() {
            self.mode = override_.mode.clone();
        }
        if override_.cluster_size.is_some() {
            self.cluster_size = override_.cluster_size;
        }
        for (k, v) in &override_.extra {
            self.extra.insert(k.clone(), v.clone());
        }
        self
    }
}

/// Where placement configuration comes from for a given `ActorSystem`.
pub enum ConfigSource {
    /// Already-parsed data, used directly.
    Data(serde_json::Value),
    /// A path to a JSON file.
    Path(PathBuf),
}

/// The decapitalized-actor-name -> `Placement` table loaded once at system
/// bootstrap. Lookups never fail; a missing or malformed source degrades to
/// the next fallback and ultimately to an empty table, with a warning
/// logged along the way instead of a fatal error.
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    entries: HashMap<String, Placement>,
}

impl Configuration {
    pub fn empty() -> Self {
        Configuration {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, decapitalized_name: &str) -> Option<&Placement> {
        self.entries.get(decapitalized_name)
    }

    /// The snapshot forwarded to a freshly forked worker in a `create-actor`
    /// frame, so the worker's own `ActorSystem` can keep resolving
    /// placement for its own descendants.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(&self.entries).unwrap_or(serde_json::Value::Null)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let entries: HashMap<String, Placement> = serde_json::from_value(value)?;
        Ok(Configuration { entries })
    }

    pub async fn load(source: Option<ConfigSource>, app_root: &Path, log: &Logger) -> Self {
        match source {
            Some(ConfigSource::Data(value)) => match Configuration::from_value(value) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(log, "inline actor configuration was malformed, starting with no overrides"; "error" => e.to_string());
                    Configuration::empty()
                }
            },
            Some(ConfigSource::Path(path)) => match Configuration::load_path(&path, log).await {
                Some(cfg) => cfg,
                None => Configuration::load_default(app_root, log).await,
            },
            None => Configuration::load_default(app_root, log).await,
        }
    }

    async fn load_default(app_root: &Path, log: &Logger) -> Self {
        let default_path = app_root.join("actors.json");
        Configuration::load_path(&default_path, log)
            .await
            .unwrap_or_else(Configuration::empty)
    }

    async fn load_path(path: &Path, log: &Logger) -> Option<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(log, "could not read actor configuration, falling back"; "path" => %path.display(), "error" => e.to_string());
                return None;
            }
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => match Configuration::from_value(value) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    warn!(log, "actor configuration was malformed JSON, falling back"; "path" => %path.display(), "error" => e.to_string());
                    None
                }
            },
            Err(e) => {
                warn!(log, "actor configuration was malformed JSON, falling back"; "path" => %path.display(), "error" => e.to_string());
                None
            }
        }
    }
}
