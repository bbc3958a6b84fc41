use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
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

impl JwtClaims {
    /// Application role, preferring the metadata claims over the database role
    /// (`authenticated`) that Supabase puts in `role`.
    pub fn application_role(&self) -> Option<String> {
        let from_metadata = |value: &Option<serde_json::Value>| {
            value
                .as_ref()
                .and_then(|meta| meta.get("role"))
                .and_then(|role| role.as_str())
                .map(str::to_string)
        };

        from_metadata(&self.user_metadata)
            .or_else(|| from_metadata(&self.app_metadata))
            .or_else(|| self.role.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// The two parties that can act on an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(format!("Unsupported role: {}", other)),
        }
    }
}

/// Identity of the current caller, as supplied by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(actor_id: Uuid, role: Role) -> Self {
        Self { actor_id, role }
    }

    pub fn patient(actor_id: Uuid) -> Self {
        Self::new(actor_id, Role::Patient)
    }

    pub fn doctor(actor_id: Uuid) -> Self {
        Self::new(actor_id, Role::Doctor)
    }
}

impl TryFrom<&User> for Actor {
    type Error = String;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let actor_id = Uuid::parse_str(&user.id)
            .map_err(|_| format!("User id {} is not a valid UUID", user.id))?;
        let role = user
            .role
            .as_deref()
            .ok_or_else(|| "User has no role".to_string())?
            .parse()?;

        Ok(Actor { actor_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(role: Option<&str>, user_metadata: Option<serde_json::Value>) -> JwtClaims {
        JwtClaims {
            sub: Uuid::new_v4().to_string(),
            exp: None,
            email: None,
            role: role.map(str::to_string),
            app_metadata: None,
            user_metadata,
            aud: None,
            iat: None,
        }
    }

    #[test]
    fn metadata_role_wins_over_database_role() {
        let c = claims(Some("authenticated"), Some(json!({ "role": "doctor" })));
        assert_eq!(c.application_role().as_deref(), Some("doctor"));

        let c = claims(Some("patient"), None);
        assert_eq!(c.application_role().as_deref(), Some("patient"));
    }

    #[test]
    fn actor_from_user_requires_known_role() {
        let id = Uuid::new_v4();
        let user = User {
            id: id.to_string(),
            email: None,
            role: Some("Doctor".to_string()),
            metadata: None,
            created_at: None,
        };
        assert_eq!(Actor::try_from(&user), Ok(Actor::doctor(id)));

        let admin = User { role: Some("admin".to_string()), ..user };
        assert!(Actor::try_from(&admin).is_err());
    }
}
