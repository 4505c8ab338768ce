//! Signed one-click research link tokens
//!
//! A link carries an HMAC-SHA256 token over `{subject}:{topic}` so the
//! intake endpoint can accept requests without a login step. Tokens do not
//! expire and are not consumed on use; clicking the same link twice files
//! two independent requests.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies one-click research link tokens.
#[derive(Clone)]
pub struct LinkSigner {
    secret: String,
    public_base_url: String,
}

impl LinkSigner {
    pub fn new(secret: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Build a signer from configuration, failing when no secret is set.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = config.link_secret.clone().ok_or_else(|| AppError::Configuration {
            message: "auth.link_secret must be set".to_string(),
        })?;
        Ok(Self::new(secret, config.public_base_url.clone()))
    }

    /// Compute the hex-encoded token for a subject and topic.
    ///
    /// The signed message is `{subject}:{topic}`, which existing links in
    /// the wild already carry, so the format cannot change without cutting
    /// every outstanding link off.
    pub fn sign(&self, subject: &str, topic: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(format!("{subject}:{topic}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check a presented token against the expected signature.
    ///
    /// Comparison happens in constant time via [`Mac::verify_slice`]. Any
    /// malformed token is simply invalid, never an error.
    pub fn verify(&self, subject: &str, topic: &str, token: &str) -> bool {
        let Ok(presented) = hex::decode(token) else {
            return false;
        };
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(format!("{subject}:{topic}").as_bytes());
        mac.verify_slice(&presented).is_ok()
    }

    /// Mint a complete one-click research link for embedding in outbound mail.
    pub fn research_link(&self, subject: &str, topic: &str) -> Result<Url> {
        let token = self.sign(subject, topic);
        let mut url = Url::parse(&self.public_base_url).map_err(|err| AppError::Configuration {
            message: format!("invalid public_base_url: {err}"),
        })?;
        url.set_path("/research");
        url.query_pairs_mut()
            .append_pair("q", topic)
            .append_pair("uid", subject)
            .append_pair("tk", &token);
        Ok(url)
    }
}

impl std::fmt::Debug for LinkSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the secret in logs
        f.debug_struct("LinkSigner")
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> LinkSigner {
        LinkSigner::new("test-secret", "http://localhost:8080")
    }

    #[test]
    fn test_sign_is_deterministic() {
        let s = signer();
        let a = s.sign("alice@example.com", "supply chain forecasting");
        let b = s.sign("alice@example.com", "supply chain forecasting");
        assert_eq!(a, b);
        // 32-byte digest, hex encoded
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_accepts_signed_token() {
        let s = signer();
        let token = s.sign("alice@example.com", "rust async runtimes");
        assert!(s.verify("alice@example.com", "rust async runtimes", &token));
    }

    #[test]
    fn test_verify_rejects_tampered_topic() {
        let s = signer();
        let token = s.sign("alice@example.com", "rust async runtimes");
        assert!(!s.verify("alice@example.com", "insider trading", &token));
    }

    #[test]
    fn test_verify_rejects_other_subject() {
        let s = signer();
        let token = s.sign("alice@example.com", "rust async runtimes");
        assert!(!s.verify("mallory@example.com", "rust async runtimes", &token));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let s = signer();
        let other = LinkSigner::new("other-secret", "http://localhost:8080");
        let token = other.sign("alice@example.com", "rust async runtimes");
        assert!(!s.verify("alice@example.com", "rust async runtimes", &token));
    }

    #[test]
    fn test_verify_rejects_any_flipped_character() {
        let s = signer();
        let token = s.sign("alice@example.com", "rust async runtimes");
        for i in 0..token.len() {
            let mut tampered: Vec<u8> = token.bytes().collect();
            tampered[i] = if tampered[i] == b'0' { b'1' } else { b'0' };
            let tampered = String::from_utf8(tampered).unwrap();
            assert!(
                !s.verify("alice@example.com", "rust async runtimes", &tampered),
                "tampered token accepted at position {i}"
            );
        }
    }

    #[test]
    fn test_verify_rejects_malformed_token() {
        let s = signer();
        assert!(!s.verify("alice@example.com", "rust async runtimes", "not-hex!"));
        assert!(!s.verify("alice@example.com", "rust async runtimes", ""));
        // Valid hex but wrong length
        assert!(!s.verify("alice@example.com", "rust async runtimes", "deadbeef"));
    }

    #[test]
    fn test_research_link_parameters() {
        let s = signer();
        let url = s.research_link("alice@example.com", "supply chain forecasting").unwrap();
        assert_eq!(url.path(), "/research");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["q"], "supply chain forecasting");
        assert_eq!(pairs["uid"], "alice@example.com");
        assert!(s.verify(&pairs["uid"], &pairs["q"], &pairs["tk"]));
    }

    #[test]
    fn test_from_config_requires_secret() {
        let config = AuthConfig {
            link_secret: None,
            public_base_url: "http://localhost:8080".to_string(),
        };
        assert!(LinkSigner::from_config(&config).is_err());
    }
}
