//! Plane configuration

use ekey_core::SigningAlgorithm;

/// Default clock tolerance applied to `exp` and proof `iat` checks, seconds
pub const DEFAULT_CLOCK_TOLERANCE_SECONDS: i64 = 5;

/// Default and maximum token lifetime, seconds
pub const DEFAULT_MAX_TTL_SECONDS: u32 = 60;

/// Default upper bound on `cap.limit`
pub const DEFAULT_MAX_LIMIT: u32 = 10;

/// Default bound on live usage records
pub const DEFAULT_USAGE_STORE_CAPACITY: usize = 10_000;

/// Configuration shared by the issuer and verifier
#[derive(Debug, Clone)]
pub struct PlaneConfig {
    /// Issuer identity URL stamped into `iss` and required on verify
    pub issuer_url: String,

    /// Audience URL stamped into `aud` and required on verify
    pub audience: String,

    /// Issuer signing algorithm
    pub signing_alg: SigningAlgorithm,

    /// Accepted skew for `exp` and proof `iat`, seconds
    ///
    /// Larger tolerances widen the replay window by the same amount.
    pub clock_tolerance_seconds: i64,

    /// Maximum `ttl` accepted at issuance, seconds
    pub max_ttl_seconds: u32,

    /// Maximum `cap.limit` accepted at issuance
    pub max_limit: u32,

    /// Bound on live usage records in the in-memory store
    pub usage_store_capacity: usize,
}

impl PlaneConfig {
    /// Configuration with default tolerances and bounds for the given
    /// identity pair
    pub fn new(issuer_url: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            audience: audience.into(),
            signing_alg: SigningAlgorithm::Es256,
            clock_tolerance_seconds: DEFAULT_CLOCK_TOLERANCE_SECONDS,
            max_ttl_seconds: DEFAULT_MAX_TTL_SECONDS,
            max_limit: DEFAULT_MAX_LIMIT,
            usage_store_capacity: DEFAULT_USAGE_STORE_CAPACITY,
        }
    }

    /// Override the signing algorithm
    pub fn with_signing_alg(mut self, alg: SigningAlgorithm) -> Self {
        self.signing_alg = alg;
        self
    }

    /// Override the clock tolerance
    pub fn with_clock_tolerance(mut self, seconds: i64) -> Self {
        self.clock_tolerance_seconds = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlaneConfig::new("https://issuer.example.com", "https://api.example.com");

        assert_eq!(config.signing_alg, SigningAlgorithm::Es256);
        assert_eq!(config.clock_tolerance_seconds, 5);
        assert_eq!(config.max_ttl_seconds, 60);
        assert_eq!(config.max_limit, 10);
        assert_eq!(config.usage_store_capacity, 10_000);
    }
}
