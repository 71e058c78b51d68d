use serde::{Deserialize, Serialize};
use std::fmt;

/// User name / password pair presented to a server.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCredential {
    pub user_name: String,
    pub password: String,
    #[serde(default)]
    pub domain: Option<String>,
}

impl NetworkCredential {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            domain: None,
        }
    }

    /// The conventional anonymous FTP login.
    pub fn anonymous() -> Self {
        Self::new("anonymous", "anonymous@")
    }

    /// Login name as sent on the wire (`DOMAIN\user` when a domain is set).
    pub fn login_name(&self) -> String {
        match &self.domain {
            Some(domain) if !domain.is_empty() => format!("{}\\{}", domain, self.user_name),
            _ => self.user_name.clone(),
        }
    }
}

impl Default for NetworkCredential {
    fn default() -> Self {
        Self::anonymous()
    }
}

// Keep passwords out of logs.
impl fmt::Debug for NetworkCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredential")
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .field("domain", &self.domain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_name_with_domain() {
        let mut cred = NetworkCredential::new("bob", "pw");
        assert_eq!(cred.login_name(), "bob");
        cred.domain = Some("CORP".into());
        assert_eq!(cred.login_name(), "CORP\\bob");
    }

    #[test]
    fn test_debug_redacts_password() {
        let cred = NetworkCredential::new("bob", "hunter2");
        let dbg = format!("{:?}", cred);
        assert!(!dbg.contains("hunter2"));
    }
}
