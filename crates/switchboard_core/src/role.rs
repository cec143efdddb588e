//! Role types for conversation participants.

use serde::{Deserialize, Serialize};

/// Role of a chat message sender.
///
/// The string form doubles as the lookup key into a model's role-prefix
/// mapping. Roles outside the OpenAI set (`developer`, custom agent names)
/// are kept verbatim as [`Role::Other`] and reach templates unchanged.
///
/// # Examples
///
/// ```
/// use switchboard_core::Role;
///
/// assert_eq!(Role::from("assistant"), Role::Assistant);
/// assert_eq!(Role::from("developer").as_str(), "developer");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
    Tool,
    /// Any other role name
    Other(String),
}

impl Role {
    /// Role key used when an assistant message carries a function call.
    pub const ASSISTANT_FUNCTION_CALL: &'static str = "assistant_function_call";

    /// Lowercase name of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
            Role::Tool => "tool",
            Role::Other(name) => name,
        }
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        match name {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "function" => Role::Function,
            "tool" => Role::Tool,
            other => Role::Other(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Role::from(name.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_role_survives_round_trip() {
        let role: Role = serde_json::from_str(r#""developer""#).unwrap();
        assert_eq!(role, Role::Other("developer".to_string()));
        assert_eq!(serde_json::to_string(&role).unwrap(), r#""developer""#);
    }

    #[test]
    fn test_known_roles_parse_to_variants() {
        let role: Role = serde_json::from_str(r#""tool""#).unwrap();
        assert_eq!(role, Role::Tool);
        assert_eq!(role.to_string(), "tool");
    }
}
