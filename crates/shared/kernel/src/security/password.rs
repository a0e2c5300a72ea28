use quill_domain::config::{DatabaseConfig, PasswordValidatorConfig, Settings};
use std::fmt;

const MIN_SIMILAR_PART: usize = 3;

/// Small built-in list; the check is case-insensitive.
const COMMON_PASSWORDS: &[&str] = &[
    "123456", "1234567", "12345678", "123456789", "1234567890", "password", "password1",
    "password123", "qwerty", "qwerty123", "qwertyuiop", "abc123", "111111", "000000", "letmein",
    "welcome", "monkey", "dragon", "iloveyou", "admin", "admin123", "login", "princess", "sunshine",
    "football", "baseball", "master", "shadow", "superman", "trustno1", "passw0rd", "starwars",
];

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordViolation {
    TooSimilar { attribute: String },
    TooShort { min_length: usize },
    TooCommon,
    EntirelyNumeric,
}

impl fmt::Display for PasswordViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSimilar { attribute } => {
                write!(f, "The password is too similar to the {attribute}.")
            }
            Self::TooShort { min_length } => write!(
                f,
                "This password is too short. It must contain at least {min_length} characters."
            ),
            Self::TooCommon => f.write_str("This password is too common."),
            Self::EntirelyNumeric => f.write_str("This password is entirely numeric."),
        }
    }
}

/// The configured validator chain, run in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordPolicy {
    validators: Vec<PasswordValidatorConfig>,
}

impl PasswordPolicy {
    #[must_use]
    pub fn from_config(validators: &[PasswordValidatorConfig]) -> Self {
        Self { validators: validators.to_vec() }
    }

    /// The chain configured in `password_validators`.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_config(&settings.password_validators)
    }

    /// Rules the configured database password breaks; empty when no credentials are set.
    #[must_use]
    pub fn check_database_credentials(&self, database: &DatabaseConfig) -> Vec<PasswordViolation> {
        database.credentials.as_ref().map_or_else(Vec::new, |credentials| {
            self.validate(credentials.password.expose(), &[("username", credentials.username.as_str())])
        })
    }

    /// Returns every violation; an empty list means the password is acceptable.
    ///
    /// `attributes` are `(name, value)` pairs of the account (username, email, ...).
    #[must_use]
    pub fn validate(&self, password: &str, attributes: &[(&str, &str)]) -> Vec<PasswordViolation> {
        self.validators
            .iter()
            .filter_map(|validator| match validator {
                PasswordValidatorConfig::UserAttributeSimilarity => {
                    similar_attribute(password, attributes)
                        .map(|attribute| PasswordViolation::TooSimilar { attribute: attribute.to_owned() })
                }
                PasswordValidatorConfig::MinimumLength { min_length } => (password.chars().count()
                    < *min_length)
                    .then_some(PasswordViolation::TooShort { min_length: *min_length }),
                PasswordValidatorConfig::CommonPassword => {
                    is_common(password).then_some(PasswordViolation::TooCommon)
                }
                PasswordValidatorConfig::Numeric => (!password.is_empty()
                    && password.chars().all(|c| c.is_ascii_digit()))
                .then_some(PasswordViolation::EntirelyNumeric),
            })
            .collect()
    }
}

fn is_common(password: &str) -> bool {
    let lowered = password.trim().to_lowercase();
    COMMON_PASSWORDS.contains(&lowered.as_str())
}

/// Name of the first attribute that shares a meaningful part with the password.
fn similar_attribute<'a>(password: &str, attributes: &[(&'a str, &str)]) -> Option<&'a str> {
    let password = password.to_lowercase();
    if password.is_empty() {
        return None;
    }

    attributes.iter().find_map(|(name, value)| {
        let value = value.to_lowercase();
        let similar = std::iter::once(value.as_str())
            .chain(value.split(|c: char| !c.is_alphanumeric()))
            .filter(|part| part.chars().count() >= MIN_SIMILAR_PART)
            .any(|part| password.contains(part) || part.contains(password.as_str()));
        similar.then_some(*name)
    })
}
