use serde::{Deserialize, Serialize};

/// Owner reference carried on tasks. Roles are informational only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    username: String,
    role: String,
}

impl User {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn assignment_records_only_the_username() {
        let user = User::new("sam", "admin");
        let mut task = Task::new("Review", "", None, "Work", None);
        task.assign_to(&user);

        assert_eq!(task.assigned_user.as_deref(), Some("sam"));
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""assignedUser":"sam""#));
        assert!(!json.contains("admin"));
    }
}
