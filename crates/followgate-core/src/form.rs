//! Application form state and submit-time validation.
//!
//! Plain field-to-state mapping. The only field written from outside user
//! input is `instagram_followed`, set by the verification controller.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub const FOLLOW_REQUIRED: &str = "Following our Instagram is mandatory for selection - this ensures you receive important announcements and updates";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    FirstName,
    LastName,
    Mobile,
    Email,
    College,
    PassingYear,
    Skills,
    InstagramFollowed,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Mobile => "mobile",
            Field::Email => "email",
            Field::College => "college",
            Field::PassingYear => "passing_year",
            Field::Skills => "skills",
            Field::InstagramFollowed => "instagram_followed",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    /// `skills` and `instagram_followed` are not plain text fields.
    #[error("field '{0}' cannot be set directly")]
    NotEditable(Field),
    #[error("{} field(s) need attention", .0.len())]
    Invalid(BTreeMap<Field, String>),
}

impl FromStr for Field {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "first_name" | "firstName" => Field::FirstName,
            "last_name" | "lastName" => Field::LastName,
            "mobile" => Field::Mobile,
            "email" => Field::Email,
            "college" => Field::College,
            "passing_year" | "passingYear" => Field::PassingYear,
            "skills" => Field::Skills,
            "instagram_followed" | "instagramFollowed" => Field::InstagramFollowed,
            other => return Err(FormError::UnknownField(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplicationForm {
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    pub email: String,
    pub college: String,
    pub passing_year: String,
    pub skills: Vec<String>,
    instagram_followed: bool,
    #[serde(skip)]
    errors: BTreeMap<Field, String>,
    #[serde(skip)]
    submitted: bool,
}

impl ApplicationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn followed(&self) -> bool {
        self.instagram_followed
    }

    pub fn submitted(&self) -> bool {
        self.submitted
    }

    pub fn errors(&self) -> &BTreeMap<Field, String> {
        &self.errors
    }

    /// Set a text field. Editing a field clears its pending error.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> Result<(), FormError> {
        let value = value.into();
        match field {
            Field::FirstName => self.first_name = value,
            Field::LastName => self.last_name = value,
            Field::Mobile => self.mobile = value,
            Field::Email => self.email = value,
            Field::College => self.college = value,
            Field::PassingYear => self.passing_year = value,
            Field::Skills | Field::InstagramFollowed => return Err(FormError::NotEditable(field)),
        }
        self.errors.remove(&field);
        Ok(())
    }

    /// Check or uncheck a skill. Returns whether it is now selected.
    pub fn toggle_skill(&mut self, skill: &str) -> bool {
        self.errors.remove(&Field::Skills);
        if let Some(pos) = self.skills.iter().position(|s| s == skill) {
            self.skills.remove(pos);
            false
        } else {
            self.skills.push(skill.to_string());
            true
        }
    }

    /// Record a completed social verification.
    pub fn mark_followed(&mut self) {
        self.instagram_followed = true;
        self.errors.remove(&Field::InstagramFollowed);
    }

    pub fn validate(&self) -> BTreeMap<Field, String> {
        fn missing(value: &str) -> bool {
            value.trim().is_empty()
        }

        let mut errors = BTreeMap::new();
        if missing(&self.first_name) {
            errors.insert(Field::FirstName, "First name is required".into());
        }
        if missing(&self.last_name) {
            errors.insert(Field::LastName, "Last name is required".into());
        }
        if missing(&self.mobile) {
            errors.insert(Field::Mobile, "Mobile number is required".into());
        } else if !MOBILE_RE.is_match(&self.mobile) {
            errors.insert(Field::Mobile, "Enter valid 10-digit mobile number".into());
        }
        if missing(&self.email) {
            errors.insert(Field::Email, "Email is required".into());
        } else if !EMAIL_RE.is_match(&self.email) {
            errors.insert(Field::Email, "Enter valid email address".into());
        }
        if missing(&self.college) {
            errors.insert(Field::College, "College name is required".into());
        }
        if missing(&self.passing_year) {
            errors.insert(Field::PassingYear, "Passing year is required".into());
        }
        if self.skills.is_empty() {
            errors.insert(Field::Skills, "Select at least one technical skill".into());
        }
        if !self.instagram_followed {
            errors.insert(Field::InstagramFollowed, FOLLOW_REQUIRED.into());
        }
        errors
    }

    /// Validate and, if clean, latch the form as submitted.
    pub fn submit(&mut self) -> Result<(), FormError> {
        let errors = self.validate();
        self.errors = errors.clone();
        if !errors.is_empty() {
            return Err(FormError::Invalid(errors));
        }
        self.submitted = true;
        Ok(())
    }
}
