//! In-memory token cache
//!
//! Holds the single authoritative [`TokenSet`]. The cache lives inside the
//! relay's shared-state lock; the refresh orchestration around it (single
//! flight, persistence, Unauthorized fan-out) is in [`crate::state`].

use radiolink_spotify_client::TokenGrant;

use crate::websocket::messages::TokenSet;

/// The single authoritative token set, or nothing when unauthenticated
#[derive(Debug, Default)]
pub struct TokenCache {
    current: Option<TokenSet>,
}

impl TokenCache {
    /// The held token set, if any
    pub fn current(&self) -> Option<&TokenSet> {
        self.current.as_ref()
    }

    /// Unconditionally replace the held set
    pub fn replace(&mut self, set: TokenSet) {
        self.current = Some(set);
    }

    /// Whether a refresh is needed at the given instant
    ///
    /// An empty cache counts as expired.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match &self.current {
            Some(set) => set.is_expired_at(now_ms),
            None => true,
        }
    }

    /// The refresh token of the held set, if any
    pub fn refresh_token(&self) -> Option<String> {
        self.current.as_ref().and_then(|s| s.refresh_token.clone())
    }

    /// Fold a refresh grant into the held set
    ///
    /// Fields the grant omits are preserved, so a non-rotating provider
    /// keeps the stored refresh token alive. Stamps `obtained_at` and clears
    /// any error marker. Returns the merged set.
    pub fn apply_grant(&mut self, grant: &TokenGrant, now_ms: i64) -> TokenSet {
        let mut set = self.current.take().unwrap_or_default();

        set.access_token = grant.access_token.clone();
        set.expires_in = grant.expires_in;
        if let Some(refresh_token) = &grant.refresh_token {
            set.refresh_token = Some(refresh_token.clone());
        }
        if let Some(token_type) = &grant.token_type {
            set.token_type = Some(token_type.clone());
        }
        if let Some(scope) = &grant.scope {
            set.scope = Some(scope.clone());
        }
        set.obtained_at = now_ms;
        set.error = None;

        self.current = Some(set.clone());
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_set(obtained_at: i64) -> TokenSet {
        TokenSet {
            access_token: "at-old".into(),
            refresh_token: Some("rt-1".into()),
            expires_in: 3600,
            obtained_at,
            ..Default::default()
        }
    }

    fn grant(refresh_token: Option<&str>) -> TokenGrant {
        serde_json::from_value(serde_json::json!({
            "access_token": "at-new",
            "token_type": "Bearer",
            "expires_in": 7200,
            "refresh_token": refresh_token,
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_cache_is_expired() {
        let cache = TokenCache::default();
        assert!(cache.is_expired_at(0));
        assert!(cache.current().is_none());
        assert!(cache.refresh_token().is_none());
    }

    #[test]
    fn test_expiry_follows_held_set() {
        let mut cache = TokenCache::default();
        cache.replace(fresh_set(1_000_000));

        assert!(!cache.is_expired_at(4_299_999));
        assert!(cache.is_expired_at(4_300_000));
    }

    #[test]
    fn test_apply_grant_preserves_refresh_token() {
        let mut cache = TokenCache::default();
        cache.replace(fresh_set(1_000_000));

        let merged = cache.apply_grant(&grant(None), 9_000_000);
        assert_eq!(merged.access_token, "at-new");
        assert_eq!(merged.expires_in, 7200);
        assert_eq!(merged.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(merged.obtained_at, 9_000_000);
        assert_eq!(cache.current(), Some(&merged));
    }

    #[test]
    fn test_apply_grant_adopts_rotated_refresh_token() {
        let mut cache = TokenCache::default();
        cache.replace(fresh_set(1_000_000));

        let merged = cache.apply_grant(&grant(Some("rt-rotated")), 9_000_000);
        assert_eq!(merged.refresh_token.as_deref(), Some("rt-rotated"));
    }

    #[test]
    fn test_apply_grant_clears_error_marker() {
        let mut cache = TokenCache::default();
        let mut set = fresh_set(1_000_000);
        set.error = Some("access_denied".into());
        cache.replace(set);

        let merged = cache.apply_grant(&grant(None), 9_000_000);
        assert!(!merged.has_error());
    }

    #[test]
    fn test_replace_is_unconditional() {
        let mut cache = TokenCache::default();
        cache.replace(fresh_set(1_000_000));
        cache.replace(TokenSet {
            access_token: "at-2".into(),
            ..Default::default()
        });

        assert_eq!(cache.current().unwrap().access_token, "at-2");
        assert!(cache.refresh_token().is_none());
    }
}
