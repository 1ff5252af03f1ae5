//! Declarative field validation for the task and account forms.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use super::Task;

const REQUIRED: &str = "This field is required.";
const NON_FIELD: &str = "__all__";

/// Schemes a task link may use.
const LINK_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

/// Field-level error messages keyed by field name, plus form-wide messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD, message);
    }

    pub fn for_field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        self.for_field(NON_FIELD)
    }

    /// Every `(field, message)` pair; form-wide messages use the field `__all__`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().flat_map(|(field, messages)| {
            messages.iter().map(move |m| (field.as_str(), m.as_str()))
        })
    }

    /// Merge errors produced by a `Validate` derive, keeping field names.
    pub fn extend_from(&mut self, errors: &ValidationErrors) {
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                self.add(&field, message);
            }
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::default();
        out.extend_from(&errors);
        out
    }
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Trim a submitted value; blank input counts as absent.
fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Checkbox semantics: absent, empty or `false` are unchecked, anything
/// else is checked.
fn checkbox(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value.eq_ignore_ascii_case("false"))
}

fn validate_link_scheme(link: &str) -> Result<(), ValidationError> {
    let scheme = link.split_once("://").map(|(s, _)| s.to_ascii_lowercase());
    match scheme {
        Some(s) if LINK_SCHEMES.contains(&s.as_str()) => Ok(()),
        _ => Err(error("url", "Enter a valid URL.")),
    }
}

/// The create/update form. The owner is deliberately absent: whatever a
/// client submits for it is never read.
#[derive(Debug, Clone, Default, Validate)]
pub struct TaskForm {
    #[validate(
        required(message = "This field is required."),
        length(max = 200, message = "Ensure this value has at most 200 characters.")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    pub complete: bool,
    #[validate(
        length(max = 200, message = "Ensure this value has at most 200 characters."),
        url(message = "Enter a valid URL."),
        custom(function = "validate_link_scheme")
    )]
    pub link: Option<String>,
    /// `image-clear` checkbox of the update form.
    pub clear_image: bool,
}

impl TaskForm {
    /// Prefill the update form from a stored task.
    pub fn from_task(task: &Task) -> Self {
        TaskForm {
            title: task.title.clone(),
            description: task.description.clone(),
            complete: task.complete,
            link: task.link.clone(),
            clear_image: false,
        }
    }

    /// Apply one submitted text field. Unknown fields are ignored.
    pub fn set_field(&mut self, name: &str, value: &str) {
        match name {
            "title" => self.title = clean(value),
            "description" => self.description = clean(value),
            "complete" => self.complete = checkbox(value),
            "image-clear" => self.clear_image = checkbox(value),
            "link" => {
                // A bare host gets the http scheme, as browsers would assume.
                self.link = clean(value).map(|link| {
                    if link.contains("://") {
                        link
                    } else {
                        format!("http://{link}")
                    }
                })
            }
            _ => {}
        }
    }

    pub fn title_value(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn description_value(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn link_value(&self) -> &str {
        self.link.as_deref().unwrap_or("")
    }

    /// Run the schema and the cross-field image rule.
    pub fn check(&self, has_upload: bool) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::default(),
            Err(e) => FormErrors::from(e),
        };
        if has_upload && self.clear_image {
            errors.add(
                "image",
                "Please either submit a file or check the clear checkbox, not both.",
            );
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(error("required", REQUIRED));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if username.chars().all(allowed) {
        Ok(())
    } else {
        Err(error(
            "invalid_username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ))
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(error("required", REQUIRED));
    }
    if password.chars().count() < 8 {
        return Err(error(
            "password_too_short",
            "This password is too short. It must contain at least 8 characters.",
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(error(
            "password_entirely_numeric",
            "This password is entirely numeric.",
        ));
    }
    Ok(())
}

/// Account creation form. Username uniqueness needs the store and is
/// checked by `accounts::check_registration`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegistrationForm {
    #[serde(default)]
    #[validate(
        length(max = 150, message = "Ensure this value has at most 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(custom(function = "validate_password"))]
    pub password1: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "This field is required."),
        must_match(other = "password1", message = "The two password fields didn't match.")
    )]
    pub password2: String,
}

impl RegistrationForm {
    pub fn check(&mut self) -> Result<(), FormErrors> {
        self.username = self.username.trim().to_string();
        self.validate().map_err(FormErrors::from)
    }
}

impl LoginForm {
    pub fn check(&self) -> Result<(), FormErrors> {
        self.validate().map_err(FormErrors::from)
    }
}

impl FormErrors {
    /// Single form-wide error, used for failed logins.
    pub fn non_field_only(message: impl Into<String>) -> Self {
        let mut errors = FormErrors::default();
        errors.add_non_field(message);
        errors
    }
}
