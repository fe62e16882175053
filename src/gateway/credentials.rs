use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

/// Async capability that obtains a fresh bearer token.
///
/// Returning `None` means the refresh failed and the caller should see the
/// original authorization failure.
pub type RefreshFn = Arc<dyn Fn() -> BoxFuture<'static, Option<String>> + Send + Sync>;

/// Wrap an async closure as a [`RefreshFn`].
pub fn refresh_fn<F, Fut>(f: F) -> RefreshFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<String>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as BoxFuture<'static, Option<String>>)
}

/// Shared, replaceable bearer token.
///
/// Clones share the same cell; the host application and the gateway each
/// hold one.
#[derive(Clone, Default)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    /// Replace the token, returning the previous one.
    pub fn replace(&self, token: Option<String>) -> Option<String> {
        std::mem::replace(&mut *self.token.write(), token)
    }

    /// Store `token` only while the current token is still `expected`.
    ///
    /// Returns whether the token was stored.
    pub fn replace_if(&self, expected: &str, token: &str) -> bool {
        let mut current = self.token.write();
        if current.as_deref() != Some(expected) {
            return false;
        }
        *current = Some(token.to_string());
        true
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }

    pub fn is_present(&self) -> bool {
        self.token.read().is_some()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("token", &self.token.read().as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_token() {
        let store = CredentialStore::new();
        let other = store.clone();
        assert!(!store.is_present());

        other.set("abc");
        assert_eq!(store.get().as_deref(), Some("abc"));

        assert_eq!(store.replace(Some("def".into())).as_deref(), Some("abc"));
        assert_eq!(other.get().as_deref(), Some("def"));

        store.clear();
        assert!(!other.is_present());
    }

    #[test]
    fn test_replace_if_only_swaps_expected_token() {
        let store = CredentialStore::with_token("alice");

        assert!(!store.replace_if("bob", "bob-refreshed"));
        assert_eq!(store.get().as_deref(), Some("alice"));

        assert!(store.replace_if("alice", "alice-refreshed"));
        assert_eq!(store.get().as_deref(), Some("alice-refreshed"));

        store.clear();
        assert!(!store.replace_if("alice-refreshed", "again"));
        assert!(!store.is_present());
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = CredentialStore::with_token("secret-token");
        let debug = format!("{:?}", store);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("redacted"));
    }

    #[tokio::test]
    async fn test_refresh_fn_wraps_closure() {
        let refresh = refresh_fn(|| async { Some("fresh".to_string()) });
        assert_eq!(refresh().await.as_deref(), Some("fresh"));
    }
}
