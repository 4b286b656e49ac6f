use crossterm::event::KeyCode;

use crate::i18n::{I18nKey, t};
use crate::model::{FormMode, Secret};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Value,
    Description,
}

/// Request produced by a valid form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRequest {
    Create {
        name: String,
        value: String,
        description: String,
    },
    Update {
        original: String,
        name: String,
        description: String,
    },
}

/// What the screen should do after the form consumed a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Editing,
    Cancel,
    Submit(SaveRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretForm {
    pub mode: FormMode,
    pub original: Option<String>,
    pub name: String,
    pub value: String,
    pub description: String,
    pub focus: FormField,
    pub error: Option<String>,
    pub submitting: bool,
}

impl SecretForm {
    pub fn add() -> Self {
        Self {
            mode: FormMode::Add,
            original: None,
            name: String::new(),
            value: String::new(),
            description: String::new(),
            focus: FormField::Name,
            error: None,
            submitting: false,
        }
    }

    /// Edit form pre-filled from the cached secret, if any.
    pub fn edit(selected: &str, cached: Option<&Secret>) -> Self {
        Self {
            mode: FormMode::Edit,
            original: Some(selected.to_string()),
            name: selected.to_string(),
            value: String::new(),
            description: cached.map(|s| s.description.clone()).unwrap_or_default(),
            focus: FormField::Name,
            error: None,
            submitting: false,
        }
    }

    pub fn fields(&self) -> &'static [FormField] {
        match self.mode {
            FormMode::Add => &[FormField::Name, FormField::Value, FormField::Description],
            FormMode::Edit => &[FormField::Name, FormField::Description],
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (idx + 1) % fields.len()
        } else {
            (idx + fields.len() - 1) % fields.len()
        };
        self.focus = fields[next];
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Name => &mut self.name,
            FormField::Value => &mut self.value,
            FormField::Description => &mut self.description,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode, existing: &[Secret]) -> FormOutcome {
        if self.submitting {
            // only cancel is honoured while a save is in flight
            return if code == KeyCode::Esc {
                FormOutcome::Cancel
            } else {
                FormOutcome::Editing
            };
        }
        match code {
            KeyCode::Esc => return FormOutcome::Cancel,
            KeyCode::Tab | KeyCode::Down => self.cycle_focus(true),
            KeyCode::BackTab | KeyCode::Up => self.cycle_focus(false),
            KeyCode::Backspace => {
                self.focused_mut().pop();
            }
            KeyCode::Char(c) => self.focused_mut().push(c),
            KeyCode::Enter => match self.validate(existing) {
                Ok(req) => {
                    self.error = None;
                    self.submitting = true;
                    return FormOutcome::Submit(req);
                }
                Err(msg) => self.error = Some(msg.to_string()),
            },
            _ => {}
        }
        FormOutcome::Editing
    }

    pub fn validate(&self, existing: &[Secret]) -> Result<SaveRequest, &'static str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(t(I18nKey::NameRequired));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(t(I18nKey::NameNoWhitespace));
        }
        if name == "." || name == ".." {
            return Err(t(I18nKey::NameReserved));
        }
        let original = self.original.as_deref();
        if existing
            .iter()
            .any(|s| s.name == name && Some(s.name.as_str()) != original)
        {
            return Err(t(I18nKey::SecretAlreadyExists));
        }
        let description = self.description.trim().to_string();
        match (self.mode, original) {
            (FormMode::Edit, Some(original)) => Ok(SaveRequest::Update {
                original: original.to_string(),
                name: name.to_string(),
                description,
            }),
            _ => {
                if self.value.is_empty() {
                    return Err(t(I18nKey::ValueRequired));
                }
                Ok(SaveRequest::Create {
                    name: name.to_string(),
                    value: self.value.clone(),
                    description,
                })
            }
        }
    }

    pub fn save_failed(&mut self, error: String) {
        self.submitting = false;
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(form: &mut SecretForm, s: &str) {
        for c in s.chars() {
            form.handle_key(KeyCode::Char(c), &[]);
        }
    }

    #[test]
    fn test_add_form_requires_name_and_value() {
        let mut form = SecretForm::add();
        assert_eq!(form.handle_key(KeyCode::Enter, &[]), FormOutcome::Editing);
        assert_eq!(form.error.as_deref(), Some(t(I18nKey::NameRequired)));

        type_str(&mut form, "API_KEY");
        form.handle_key(KeyCode::Enter, &[]);
        assert_eq!(form.error.as_deref(), Some(t(I18nKey::ValueRequired)));

        form.handle_key(KeyCode::Tab, &[]);
        assert_eq!(form.focus, FormField::Value);
        type_str(&mut form, "s3cr3t");
        form.handle_key(KeyCode::Tab, &[]);
        type_str(&mut form, "my key");

        let outcome = form.handle_key(KeyCode::Enter, &[]);
        assert_eq!(
            outcome,
            FormOutcome::Submit(SaveRequest::Create {
                name: "API_KEY".into(),
                value: "s3cr3t".into(),
                description: "my key".into(),
            })
        );
        assert!(form.submitting);
        assert!(form.error.is_none());
    }

    #[test]
    fn test_name_rules() {
        let existing = vec![Secret::new("TAKEN", "")];
        let mut form = SecretForm::add();
        form.name = "has space".into();
        form.value = "v".into();
        assert_eq!(form.validate(&existing), Err(t(I18nKey::NameNoWhitespace)));
        form.name = "TAKEN".into();
        assert_eq!(form.validate(&existing), Err(t(I18nKey::SecretAlreadyExists)));
        for reserved in [".", ".."] {
            form.name = reserved.into();
            assert_eq!(form.validate(&existing), Err(t(I18nKey::NameReserved)));
        }
    }

    #[test]
    fn test_edit_form_keeps_own_name_and_skips_value() {
        let existing = vec![Secret::new("A", "first"), Secret::new("B", "")];
        let mut form = SecretForm::edit("A", existing.first());
        assert_eq!(form.description, "first");
        assert_eq!(form.fields(), &[FormField::Name, FormField::Description]);
        form.handle_key(KeyCode::Tab, &existing);
        assert_eq!(form.focus, FormField::Description);
        form.handle_key(KeyCode::Tab, &existing);
        assert_eq!(form.focus, FormField::Name);

        assert_eq!(
            form.validate(&existing),
            Ok(SaveRequest::Update {
                original: "A".into(),
                name: "A".into(),
                description: "first".into(),
            })
        );
        form.name = "B".into();
        assert_eq!(form.validate(&existing), Err(t(I18nKey::SecretAlreadyExists)));
    }

    #[test]
    fn test_failed_save_reopens_form() {
        let mut form = SecretForm::add();
        form.name = "X".into();
        form.value = "v".into();
        assert!(matches!(form.handle_key(KeyCode::Enter, &[]), FormOutcome::Submit(_)));
        // typing is ignored while submitting
        form.handle_key(KeyCode::Char('z'), &[]);
        assert_eq!(form.name, "X");
        form.save_failed("server returned 409".into());
        assert!(!form.submitting);
        assert_eq!(form.error.as_deref(), Some("server returned 409"));
        assert_eq!(form.handle_key(KeyCode::Esc, &[]), FormOutcome::Cancel);
    }
}
