#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum I18nKey {
    ReadyToAddMicroagent,
    CanLearnAboutRepositories,
    ConnectGitProvider,
    NoSecretsFound,
    AddNewSecret,
    ConfirmDeleteKey,
    Name,
    Description,
    Actions,
    Value,
    EditSecret,
    SecretsTitle,
    MicroagentsTitle,
    NameRequired,
    NameNoWhitespace,
    NameReserved,
    SecretAlreadyExists,
    ValueRequired,
    FormHelp,
    ConfirmHelp,
}

/// English display string for a key.
pub fn t(key: I18nKey) -> &'static str {
    match key {
        I18nKey::ReadyToAddMicroagent => "Ready to add a microagent?",
        I18nKey::CanLearnAboutRepositories => {
            "The agent can learn about your repositories and follow your instructions. \
             Select a repository to add a microagent."
        }
        I18nKey::ConnectGitProvider => "Connect a Git provider to manage secrets",
        I18nKey::NoSecretsFound => "No secrets found",
        I18nKey::AddNewSecret => "Add a new secret",
        I18nKey::ConfirmDeleteKey => "Are you sure you want to delete this secret?",
        I18nKey::Name => "Name",
        I18nKey::Description => "Description",
        I18nKey::Actions => "Actions",
        I18nKey::Value => "Value",
        I18nKey::EditSecret => "Edit secret",
        I18nKey::SecretsTitle => "Secrets",
        I18nKey::MicroagentsTitle => "Microagents",
        I18nKey::NameRequired => "Name is required",
        I18nKey::NameNoWhitespace => "Name cannot contain whitespace",
        I18nKey::NameReserved => "Name cannot be '.' or '..'",
        I18nKey::SecretAlreadyExists => "A secret with this name already exists",
        I18nKey::ValueRequired => "Value is required",
        I18nKey::FormHelp => "Tab: Switch field | Enter: Save | Esc: Cancel",
        I18nKey::ConfirmHelp => "(y) Confirm / (n) Cancel",
    }
}
