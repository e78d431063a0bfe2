//! Key-pair authentication
//!
//! Signs the short-lived JWTs the SQL API expects with
//! `X-Snowflake-Authorization-Token-Type: KEYPAIR_JWT`.

use std::path::Path;
use std::time::{Duration as StdDuration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jwt_simple::prelude::*;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Token lifetime granted by the issuer
const TOKEN_LIFETIME_MINUTES: u64 = 59;

/// Re-sign after this long so a token never expires mid-request
const TOKEN_REFRESH_AFTER: StdDuration = StdDuration::from_secs(50 * 60);

/// JWT issuer for one account/user pair
pub struct KeyPairAuth {
    key_pair: RS256KeyPair,
    qualified_user: String,
    fingerprint: String,
    cached: Option<(String, Instant)>,
}

impl KeyPairAuth {
    /// Load the private key and derive the public key fingerprint
    pub fn new(
        account: &str,
        user: &str,
        private_key_path: &Path,
        passphrase: Option<&str>,
    ) -> Result<Self> {
        let key_pair = load_private_key(private_key_path, passphrase)?;
        Self::from_key_pair(account, user, key_pair)
    }

    pub fn from_key_pair(account: &str, user: &str, key_pair: RS256KeyPair) -> Result<Self> {
        let public_der = key_pair
            .public_key()
            .to_der()
            .map_err(|e| Error::PrivateKey(e.to_string()))?;
        let fingerprint = format!("SHA256:{}", STANDARD.encode(Sha256::digest(&public_der)));

        Ok(Self {
            key_pair,
            qualified_user: format!("{}.{}", account_locator(account), user.to_uppercase()),
            fingerprint,
            cached: None,
        })
    }

    /// Public key fingerprint, `SHA256:<base64>`
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Current token, re-signed when the cached one is stale
    pub fn token(&mut self) -> Result<String> {
        if let Some((token, issued)) = &self.cached {
            if issued.elapsed() < TOKEN_REFRESH_AFTER {
                return Ok(token.clone());
            }
        }

        let claims = Claims::create(Duration::from_mins(TOKEN_LIFETIME_MINUTES))
            .with_issuer(format!("{}.{}", self.qualified_user, self.fingerprint))
            .with_subject(&self.qualified_user);
        let token = self
            .key_pair
            .sign(claims)
            .map_err(|e| Error::PrivateKey(e.to_string()))?;

        tracing::debug!("Signed new JWT for {}", self.qualified_user);
        self.cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

/// Account name as it appears in JWT claims
///
/// Uppercased, with any region or cloud suffix after the first `.` removed.
pub fn account_locator(account: &str) -> String {
    account
        .split('.')
        .next()
        .unwrap_or(account)
        .to_uppercase()
}

/// Read a PEM private key, decrypting it when a passphrase is given
pub fn load_private_key(path: &Path, passphrase: Option<&str>) -> Result<RS256KeyPair> {
    let pem = std::fs::read_to_string(path)
        .map_err(|e| Error::PrivateKey(format!("{}: {}", path.display(), e)))?;

    let Some(passphrase) = passphrase else {
        return RS256KeyPair::from_pem(&pem).map_err(|e| Error::PrivateKey(e.to_string()));
    };

    let (label, der) = pkcs8::der::pem::decode_vec(pem.as_bytes())
        .map_err(|e| Error::PrivateKey(format!("{}: {}", path.display(), e)))?;

    if label != "ENCRYPTED PRIVATE KEY" {
        tracing::warn!("Passphrase given but {} is not encrypted", path.display());
        return RS256KeyPair::from_der(&der).map_err(|e| Error::PrivateKey(e.to_string()));
    }

    let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(der.as_slice())
        .map_err(|e| Error::PrivateKey(e.to_string()))?;
    let decrypted = encrypted
        .decrypt(passphrase)
        .map_err(|e| Error::PrivateKey(format!("cannot decrypt {}: {}", path.display(), e)))?;

    RS256KeyPair::from_der(decrypted.as_bytes()).map_err(|e| Error::PrivateKey(e.to_string()))
}
