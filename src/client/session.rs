use once_cell::sync::OnceCell;

/// Per-client connection state.
///
/// The worker-affinity token is written at most once, by the first submit
/// response that carries one, and is read-only from then on.
#[derive(Debug)]
pub struct Session {
    base_url: String,
    api_key: String,
    affinity: OnceCell<String>,
}

impl Session {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            affinity: OnceCell::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn affinity(&self) -> Option<&str> {
        self.affinity.get().map(String::as_str)
    }

    /// Stores `token` unless one is already held. Returns whether it was stored.
    pub fn remember_affinity(&self, token: impl Into<String>) -> bool {
        self.affinity.set(token.into()).is_ok()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
