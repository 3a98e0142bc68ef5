//! Service principal credentials from the environment.

/// Client secret credential for a service principal.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecretCredential {
    pub tenant_id: String,
    pub client_id: String,
    client_secret: String,
}

impl ClientSecretCredential {
    /// All three parts must be present and non-empty.
    pub fn from_parts(
        tenant_id: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Option<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Some(Self {
            tenant_id: non_empty(tenant_id)?,
            client_id: non_empty(client_id)?,
            client_secret: non_empty(client_secret)?,
        })
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_requires_all_parts() {
        assert!(ClientSecretCredential::from_parts(some("t"), some("c"), some("s")).is_some());
        assert!(ClientSecretCredential::from_parts(None, some("c"), some("s")).is_none());
        assert!(ClientSecretCredential::from_parts(some("t"), some(" "), some("s")).is_none());
        assert!(ClientSecretCredential::from_parts(some("t"), some("c"), None).is_none());
    }

    #[test]
    fn test_debug_hides_secret() {
        let credential =
            ClientSecretCredential::from_parts(some("t"), some("c"), some("hunter2")).unwrap();
        let printed = format!("{credential:?}");
        assert!(!printed.contains("hunter2"));
        assert_eq!(credential.client_secret(), "hunter2");
    }
}
