use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Role labels consumed by the route guards. Every signed-in user carries
/// exactly one of these in their token metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Administrator,
    Physiotherapist,
    Secretary,
    Patient,
    Partner,
}

impl UserRole {
    /// Staff roles manage other people's records.
    pub fn is_staff(&self) -> bool {
        matches!(
            self,
            UserRole::Administrator | UserRole::Physiotherapist | UserRole::Secretary
        )
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Administrator => write!(f, "administrator"),
            UserRole::Physiotherapist => write!(f, "physiotherapist"),
            UserRole::Secretary => write!(f, "secretary"),
            UserRole::Patient => write!(f, "patient"),
            UserRole::Partner => write!(f, "partner"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "administrator" => Ok(UserRole::Administrator),
            "physiotherapist" => Ok(UserRole::Physiotherapist),
            "secretary" => Ok(UserRole::Secretary),
            "patient" => Ok(UserRole::Patient),
            "partner" => Ok(UserRole::Partner),
            other => Err(format!("Unknown role label: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Administrator)
    }

    /// Whether this user may act on records owned by `owner_id`.
    /// Staff may; everyone else only on their own.
    pub fn can_access_records_of(&self, owner_id: &str) -> bool {
        self.id == owner_id || self.role.map(|r| r.is_staff()).unwrap_or(false)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}
