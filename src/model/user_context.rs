use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "Admin";

/// Authenticated principal taken from the request headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub roles: Vec<String>,
}

impl UserContext {
    /// Create a new UserContext with just a user ID and no roles
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            user_email: None,
            user_name: None,
            roles: Vec::new(),
        }
    }

    /// Create a UserContext with full user information
    pub fn with_details(
        user_id: String,
        email: Option<String>,
        name: Option<String>,
        roles: Vec<String>,
    ) -> Self {
        Self {
            user_id,
            user_email: email,
            user_name: name,
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_is_case_insensitive() {
        let ctx = UserContext::with_details(
            "u1".to_string(),
            None,
            None,
            vec!["editor".to_string(), "admin".to_string()],
        );
        assert!(ctx.is_admin());
        assert!(!UserContext::new("u2".to_string()).is_admin());
    }
}
