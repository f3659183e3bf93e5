//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Token signing and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Path to the PEM-encoded RSA private key used to sign tokens.
    #[serde(default = "default_private_key_path")]
    pub private_key_path: String,
    /// Path to the PEM-encoded RSA public key used to verify tokens.
    #[serde(default = "default_public_key_path")]
    pub public_key_path: String,
    /// `iss` claim written into and required from every token.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// `aud` claim written into and required from every token.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: u64,
    /// Refresh token TTL in hours.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_hours: u64,
    /// Clock skew tolerance applied to `exp` in seconds.
    ///
    /// Off by default: a token whose `exp` has passed is rejected.
    #[serde(default)]
    pub leeway_seconds: u64,
    /// Password hashing and policy settings.
    #[serde(default)]
    pub password: PasswordConfig,
}

/// Argon2id cost parameters and password policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Number of passes.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Degree of parallelism. `0` means one lane per available core.
    #[serde(default)]
    pub parallelism: u32,
    /// Minimum password length for new passwords.
    #[serde(default = "default_password_min")]
    pub min_length: usize,
}

impl PasswordConfig {
    /// Returns the configured parallelism, resolving `0` to the core count.
    pub fn effective_parallelism(&self) -> u32 {
        if self.parallelism > 0 {
            return self.parallelism;
        }
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            private_key_path: default_private_key_path(),
            public_key_path: default_public_key_path(),
            issuer: default_issuer(),
            audience: default_audience(),
            access_token_ttl_minutes: default_access_ttl(),
            refresh_token_ttl_hours: default_refresh_ttl(),
            leeway_seconds: 0,
            password: PasswordConfig::default(),
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: 0,
            min_length: default_password_min(),
        }
    }
}

fn default_private_key_path() -> String {
    "keys/private.pem".to_string()
}

fn default_public_key_path() -> String {
    "keys/public.pem".to_string()
}

fn default_issuer() -> String {
    "quill".to_string()
}

fn default_audience() -> String {
    "quill-web".to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    168
}

fn default_memory_kib() -> u32 {
    65536
}

fn default_iterations() -> u32 {
    3
}

fn default_password_min() -> usize {
    10
}
