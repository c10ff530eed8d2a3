use crate::domain::field::{is_phone, parse_date, parse_time};

/// A syntactic rule applied to a single text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Must contain something other than whitespace.
    Required,
    /// Must contain at least this many characters, ignoring surrounding
    /// whitespace.
    MinLength(usize),
    /// Must be a `YYYY-MM-DD` calendar date.
    Date,
    /// Must be a 24 hour `HH:mm` time.
    Time,
    /// Must be a contact number.
    Phone,
}

impl Primitive {
    /// Whether the value satisfies the rule.
    #[must_use]
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Required => !value.trim().is_empty(),
            Self::MinLength(min) => value.trim().chars().count() >= min,
            Self::Date => parse_date(value).is_some(),
            Self::Time => parse_time(value).is_some(),
            Self::Phone => is_phone(value),
        }
    }

    /// The message shown when the rule fails.
    #[must_use]
    pub fn message(self) -> String {
        match self {
            Self::Required => "This field is required".to_string(),
            Self::MinLength(min) => format!("Must be at least {min} characters"),
            Self::Date => "Enter a date as YYYY-MM-DD".to_string(),
            Self::Time => "Enter a time as HH:mm".to_string(),
            Self::Phone => "Enter a valid contact number".to_string(),
        }
    }

    /// Checks the value, returning the failure message.
    ///
    /// # Errors
    ///
    /// Returns the rule's message if the value does not satisfy it.
    pub fn check(self, value: &str) -> Result<(), String> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(self.message())
        }
    }
}
