//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered person. At least one of `email` / `mobile` is present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub name: String,
    pub is_email_verified: bool,
    pub is_mobile_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub name: String,
    pub is_email_verified: bool,
    pub is_mobile_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub is_email_verified: Option<bool>,
    pub is_mobile_verified: Option<bool>,
}

/// The contact a user logs in or is invited with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Identity {
    Email(String),
    /// Ten-digit national number, without `+91`, spaces or dashes.
    Mobile(String),
}

impl Identity {
    pub fn email(email: &str) -> Self {
        Self::Email(email.trim().to_string())
    }

    pub fn mobile(mobile: &str) -> Self {
        Self::Mobile(normalize_mobile(mobile))
    }

    /// Build an identity from optional request fields. Email wins when
    /// both are given; blank values count as absent.
    pub fn from_parts(email: Option<&str>, mobile: Option<&str>) -> Option<Self> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.filter(|s| !s.trim().is_empty())
        }
        match (present(email), present(mobile)) {
            (Some(email), _) => Some(Self::email(email)),
            (None, Some(mobile)) => Some(Self::mobile(mobile)),
            (None, None) => None,
        }
    }

    /// The exact key under which one-time codes are stored.
    pub fn key(&self) -> &str {
        match self {
            Self::Email(v) | Self::Mobile(v) => v,
        }
    }

    /// Default display name for a user first seen through this identity.
    pub fn default_name(&self) -> String {
        match self {
            Self::Email(email) => email
                .split_once('@')
                .map(|(local, _)| local.to_string())
                .unwrap_or_else(|| email.clone()),
            Self::Mobile(_) => "User".to_string(),
        }
    }
}

/// Strip a leading `+91` country code, spaces and dashes.
pub fn normalize_mobile(raw: &str) -> String {
    raw.trim()
        .replace("+91", "")
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}
