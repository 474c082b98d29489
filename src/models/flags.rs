use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The kind of option registration the script made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Store,
    StoreTrue,
    StoreFalse,
    Help,
    Version,
    #[serde(other)]
    Other,
}

/// One intercepted option registration, as reported across the seam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionObservation {
    pub option_strings: Vec<String>,
    pub action: ActionKind,
    #[serde(default)]
    pub help: Option<String>,
    /// `None` is the registration's "unset" sentinel.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub choices: Option<Vec<Value>>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagSpec {
    #[serde(skip)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(
        rename = "arg-switch",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub switch_polarity: Option<bool>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Flags discovered for one script, keyed by flag name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, FlagSpec>",
    into = "BTreeMap<String, FlagSpec>"
)]
pub struct FlagManifest {
    flags: BTreeMap<String, FlagSpec>,
}

pub struct FlagRecordBuilder;

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Store => "store",
            ActionKind::StoreTrue => "store_true",
            ActionKind::StoreFalse => "store_false",
            ActionKind::Help => "help",
            ActionKind::Version => "version",
            ActionKind::Other => "other",
        }
    }

    pub fn switch_polarity(&self) -> Option<bool> {
        match self {
            ActionKind::StoreTrue => Some(true),
            ActionKind::StoreFalse => Some(false),
            _ => None,
        }
    }
}

impl OptionObservation {
    pub fn new(option_strings: Vec<String>, action: ActionKind) -> Self {
        Self {
            option_strings,
            action,
            help: None,
            default: None,
            choices: None,
            required: false,
        }
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_choices(mut self, choices: Vec<Value>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The long form (`--name`) of the option, without its dashes.
    pub fn long_name(&self) -> Option<&str> {
        self.option_strings
            .iter()
            .filter_map(|opt| opt.strip_prefix("--"))
            .find(|name| !name.is_empty())
    }
}

impl FlagSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl FlagRecordBuilder {
    /// Converts one registration into a flag, or `None` when the registration
    /// doesn't declare a flag worth recording.
    pub fn build(observation: &OptionObservation) -> Option<FlagSpec> {
        let name = match observation.long_name() {
            Some(name) => name,
            None => {
                tracing::debug!(
                    options = ?observation.option_strings,
                    "skipping option - no long form"
                );
                return None;
            }
        };

        if matches!(observation.action, ActionKind::Help | ActionKind::Version) {
            tracing::debug!(flag = name, action = observation.action.as_str(), "skipping option - not a flag");
            return None;
        }

        let switch_polarity = observation.action.switch_polarity();
        let mut spec = FlagSpec::new(name);

        spec.description = observation
            .help
            .as_ref()
            .filter(|help| !help.trim().is_empty())
            .cloned();

        // A switch's implied "off" value carries no information
        spec.default = match (&observation.default, switch_polarity) {
            (Some(Value::Bool(value)), Some(polarity)) if *value != polarity => None,
            (default, _) => default.clone(),
        };

        spec.choices = observation
            .choices
            .as_ref()
            .map(|choices| ordered_set(choices))
            .filter(|choices| !choices.is_empty());

        spec.required = observation.required;
        spec.switch_polarity = switch_polarity;

        Some(spec)
    }
}

fn ordered_set(values: &[Value]) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(value) {
            unique.push(value.clone());
        }
    }
    unique
}

impl FlagManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a flag, replacing any earlier flag with the same name.
    pub fn insert(&mut self, spec: FlagSpec) -> Option<FlagSpec> {
        let replaced = self.flags.insert(spec.name.clone(), spec);
        if let Some(ref old) = replaced {
            tracing::debug!(flag = %old.name, "flag registered again - keeping latest");
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<&FlagSpec> {
        self.flags.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.values()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<BTreeMap<String, FlagSpec>> for FlagManifest {
    fn from(mut flags: BTreeMap<String, FlagSpec>) -> Self {
        for (name, spec) in flags.iter_mut() {
            spec.name = name.clone();
        }
        Self { flags }
    }
}

impl From<FlagManifest> for BTreeMap<String, FlagSpec> {
    fn from(manifest: FlagManifest) -> Self {
        manifest.flags
    }
}
