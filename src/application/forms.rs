//! Submitted HTML forms and their validation.
//!
//! Form structs mirror the raw `application/x-www-form-urlencoded` payload so
//! an invalid submission can be echoed back into the form untouched. Every
//! field defaults to empty; a missing field is a validation error, not a
//! rejected request.

use serde::Deserialize;
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};
use validator::ValidateEmail;

use crate::domain::entities::{CategoryId, LocationId};

pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_NAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 8;

const DATETIME_LOCAL: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const DATETIME_LOCAL_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    entries: Vec<(&'static str, String)>,
}

impl FormErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| *name == field)
    }

    /// Messages for one field joined into a single line.
    pub fn message(&self, field: &str) -> String {
        self.entries
            .iter()
            .filter(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .entries
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for FormErrors {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub category: String,
    pub location: String,
    pub is_published: Option<String>,
}

/// A post submission that passed field validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub category_id: CategoryId,
    pub location_id: Option<LocationId>,
}

impl PostForm {
    pub fn published_checked(&self) -> bool {
        self.is_published.is_some()
    }

    pub fn validate(&self) -> Result<PostDraft, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", "This field is required.");
        } else if title.chars().count() > MAX_TITLE_LEN {
            errors.add("title", "Title must be at most 256 characters.");
        }

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", "This field is required.");
        }

        let pub_date = match parse_datetime_local(&self.pub_date) {
            Some(value) => value,
            None => {
                errors.add("pub_date", "Enter a valid date and time.");
                OffsetDateTime::UNIX_EPOCH
            }
        };

        let category_id = match self.category.trim().parse::<CategoryId>() {
            Ok(id) => id,
            Err(_) => {
                errors.add("category", "Select a category.");
                0
            }
        };

        let location = self.location.trim();
        let location_id = if location.is_empty() {
            None
        } else {
            match location.parse::<LocationId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("location", "Select a valid location.");
                    None
                }
            }
        };

        errors.into_result(PostDraft {
            title: title.to_string(),
            text: text.to_string(),
            pub_date,
            is_published: self.published_checked(),
            category_id,
            location_id,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(FormErrors::single("text", "This field is required."));
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDraft {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<ProfileDraft, FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();
        validate_username(username, &mut errors);
        let first_name = self.first_name.trim();
        if first_name.chars().count() > MAX_NAME_LEN {
            errors.add("first_name", "First name must be at most 150 characters.");
        }
        let last_name = self.last_name.trim();
        if last_name.chars().count() > MAX_NAME_LEN {
            errors.add("last_name", "Last name must be at most 150 characters.");
        }
        let email = self.email.trim();
        validate_email(email, &mut errors);

        errors.into_result(ProfileDraft {
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<RegistrationDraft, FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();
        validate_username(username, &mut errors);
        let email = self.email.trim();
        validate_email(email, &mut errors);

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", "Password must contain at least 8 characters.");
        } else if self.password.chars().all(|ch| ch.is_ascii_digit()) {
            errors.add("password", "Password cannot be entirely numeric.");
        }
        if self.password != self.password_confirmation {
            errors.add("password_confirmation", "The two password fields didn't match.");
        }

        errors.into_result(RegistrationDraft {
            username: username.to_string(),
            email: email.to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

/// Parse an HTML `datetime-local` value. The value carries no offset and is
/// taken as UTC.
pub fn parse_datetime_local(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    PrimitiveDateTime::parse(raw, DATETIME_LOCAL)
        .or_else(|_| PrimitiveDateTime::parse(raw, DATETIME_LOCAL_SECONDS))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Render a timestamp back into a `datetime-local` input value.
pub fn format_datetime_local(value: OffsetDateTime) -> String {
    let utc = value.to_offset(time::UtcOffset::UTC);
    utc.format(DATETIME_LOCAL).unwrap_or_default()
}

fn validate_username(username: &str, errors: &mut FormErrors) {
    if username.is_empty() {
        errors.add("username", "This field is required.");
        return;
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        errors.add("username", "Username must be at most 150 characters.");
    }
    let valid = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        errors.add(
            "username",
            "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

fn validate_email(email: &str, errors: &mut FormErrors) {
    if !email.is_empty() && !email.validate_email() {
        errors.add("email", "Enter a valid email address.");
    }
}
