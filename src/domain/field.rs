use std::{fmt, str::FromStr, sync::LazyLock};

use borsh::BorshSerialize;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Date format used by every date field (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time format used by every time field (`HH:mm`, 24 hour).
pub const TIME_FORMAT: &str = "%H:%M";

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("this should never fail"));

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("this should never fail"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{10,15}$").expect("this should never fail"));

/// Parses a `YYYY-MM-DD` date.
///
/// Returns `None` if the text does not have the expected shape or does not
/// name a real calendar date.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if !DATE_PATTERN.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Parses a 24 hour `HH:mm` time.
#[must_use]
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    if !TIME_PATTERN.is_match(value) {
        return None;
    }
    NaiveTime::parse_from_str(value, TIME_FORMAT).ok()
}

/// Whether the value looks like a contact number.
///
/// An optional leading `+` followed by 10 to 15 digits.
#[must_use]
pub fn is_phone(value: &str) -> bool {
    PHONE_PATTERN.is_match(value)
}

/// A period of time given as separate date and time fields.
///
/// A range is only meaningful when its end instant is strictly after its
/// start instant; this is checked by validation, not on construction, so a
/// range being edited may temporarily be out of order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateTimeRange {
    /// Start date (`YYYY-MM-DD`).
    pub from_date: String,
    /// Start time (`HH:mm`).
    pub from_time: String,
    /// End date (`YYYY-MM-DD`).
    pub to_date: String,
    /// End time (`HH:mm`).
    pub to_time: String,
}

impl DateTimeRange {
    /// Construct a range from its four textual components.
    #[must_use]
    pub fn new(
        from_date: impl Into<String>,
        from_time: impl Into<String>,
        to_date: impl Into<String>,
        to_time: impl Into<String>,
    ) -> Self {
        Self {
            from_date: from_date.into(),
            from_time: from_time.into(),
            to_date: to_date.into(),
            to_time: to_time.into(),
        }
    }

    /// A range starting at `start` and lasting the given number of hours.
    #[must_use]
    pub fn starting_at(start: NaiveDateTime, hours: i64) -> Self {
        let end = start + chrono::Duration::hours(hours);
        Self {
            from_date: start.format(DATE_FORMAT).to_string(),
            from_time: start.format(TIME_FORMAT).to_string(),
            to_date: end.format(DATE_FORMAT).to_string(),
            to_time: end.format(TIME_FORMAT).to_string(),
        }
    }

    /// The combined start instant, if both components parse.
    #[must_use]
    pub fn start(&self) -> Option<NaiveDateTime> {
        Some(parse_date(&self.from_date)?.and_time(parse_time(&self.from_time)?))
    }

    /// The combined end instant, if both components parse.
    #[must_use]
    pub fn end(&self) -> Option<NaiveDateTime> {
        Some(parse_date(&self.to_date)?.and_time(parse_time(&self.to_time)?))
    }

    /// Whether the end instant is strictly after the start instant.
    ///
    /// Unparseable ranges are never ordered.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        matches!((self.start(), self.end()), (Some(start), Some(end)) if end > start)
    }
}

/// The closed set of roles the permit templates know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize)]
pub enum KnownRole {
    /// The person asking for the work to be carried out.
    Requester,
    /// The person approving the permit.
    Approver,
    /// The safety officer overseeing isolation and earthing.
    SafetyOfficer,
    /// The holder of the permit, in charge of the work party.
    PermitHolder,
    /// The supervisor issuing re-energization instructions.
    Supervisor,
    /// The operator performing switching.
    Operator,
}

impl KnownRole {
    /// Every known role, in display order.
    pub const ALL: [Self; 6] = [
        Self::Requester,
        Self::Approver,
        Self::SafetyOfficer,
        Self::PermitHolder,
        Self::Supervisor,
        Self::Operator,
    ];

    /// The display name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requester => "Requester",
            Self::Approver => "Approver",
            Self::SafetyOfficer => "Safety Officer",
            Self::PermitHolder => "Permit Holder",
            Self::Supervisor => "Supervisor",
            Self::Operator => "Operator",
        }
    }
}

impl fmt::Display for KnownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownRole {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(&normalised))
            .ok_or_else(|| UnknownRoleError(s.to_string()))
    }
}

/// Error returned when a string does not name a [`KnownRole`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRoleError(String);

/// The role a signer attests in.
///
/// Templates assign known roles, but signers may record any free text role.
/// Serialized as its display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// One of the roles the templates know about.
    Known(KnownRole),
    /// A free text role.
    Other(String),
}

impl Role {
    /// The display string of the role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(role) => role.as_str(),
            Self::Other(text) => text,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<KnownRole> for Role {
    fn from(role: KnownRole) -> Self {
        Self::Known(role)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        value
            .parse()
            .map_or_else(|_| Self::Other(value), Self::Known)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Known(role) => role.as_str().to_string(),
            Role::Other(text) => text,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authorizing party's attestation of a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignatureData {
    /// Full name of the signer.
    pub name: String,
    /// The role the signer attests in.
    pub role: Role,
    /// Contact number of the signer.
    pub contact_no: String,
    /// Date of signing (`YYYY-MM-DD`).
    pub date: String,
    /// Time of signing (`HH:mm`).
    pub time: String,
    /// Opaque reference to a captured signature image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_image: Option<String>,
}

impl SignatureData {
    /// An unsigned block for the given role, dated `at`.
    #[must_use]
    pub fn blank(role: impl Into<Role>, at: NaiveDateTime) -> Self {
        Self {
            name: String::new(),
            role: role.into(),
            contact_no: String::new(),
            date: at.format(DATE_FORMAT).to_string(),
            time: at.format(TIME_FORMAT).to_string(),
            signature_image: None,
        }
    }
}
