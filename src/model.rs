use serde::{Deserialize, Deserializer, Serialize};

use crate::form::SecretForm;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl Secret {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    Saas,
    #[default]
    Oss,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub app_mode: AppMode,
}

impl AppConfig {
    pub fn from_mode_str(mode: &str) -> Self {
        let app_mode = if mode == "saas" {
            AppMode::Saas
        } else {
            AppMode::Oss
        };
        Self { app_mode }
    }
}

/// Which part of the secrets screen owns the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    List,
    AddSecretForm(SecretForm),
    EditSecretForm { selected: String, form: SecretForm },
}

impl ViewMode {
    pub fn is_list(&self) -> bool {
        matches!(self, ViewMode::List)
    }
}

/// Delete confirmation state. The modal is visible whenever this is not `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PendingDelete {
    #[default]
    None,
    Confirming(String),
    InFlight(String),
}

impl PendingDelete {
    pub fn target(&self) -> Option<&str> {
        match self {
            PendingDelete::None => None,
            PendingDelete::Confirming(name) | PendingDelete::InFlight(name) => Some(name),
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, PendingDelete::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit,
}

/// One piece of the secrets screen, in draw order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    SkeletonRows(usize),
    ConnectGitButton,
    NoSecretsMessage,
    AddSecretButton { disabled: bool },
    SecretsTable,
    SecretForm(FormMode),
    ConfirmationModal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScreen {
    Secrets,
    Microagents,
}

#[derive(Debug)]
pub enum AppEvent {
    ConfigLoaded(AppConfig),
    ProvidersLoaded(Vec<String>),
    SecretsLoaded(Vec<Secret>),
    SecretsFetchFailed(String),
    DeleteSettled {
        name: String,
        result: Result<(), String>,
    },
    SecretSaved(String),
    SecretSaveFailed(String),
    Message(String),
}
