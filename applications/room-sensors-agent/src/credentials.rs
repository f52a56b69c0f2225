use crate::error::AgentError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Signing algorithm of the device key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyAlgorithm {
    #[default]
    Rs256,
    Es256,
}

impl KeyAlgorithm {
    fn jwt_algorithm(self) -> Algorithm {
        match self {
            KeyAlgorithm::Rs256 => Algorithm::RS256,
            KeyAlgorithm::Es256 => Algorithm::ES256,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Short-lived signed token presented as the MQTT password.
#[derive(Clone)]
pub struct Credential {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// True once `now` is within `margin` of expiry.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin <= now
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub struct CredentialProvider {
    audience: String,
    algorithm: KeyAlgorithm,
    key: EncodingKey,
    ttl: Duration,
}

impl CredentialProvider {
    pub fn new(
        audience: impl Into<String>,
        algorithm: KeyAlgorithm,
        key: EncodingKey,
        ttl: Duration,
    ) -> Result<Self, AgentError> {
        if ttl <= Duration::zero() {
            return Err(AgentError::Config("credential lifetime must be positive".into()));
        }
        Ok(Self {
            audience: audience.into(),
            algorithm,
            key,
            ttl,
        })
    }

    /// Load the device key from a PEM file. Called once at startup.
    pub fn from_pem_file(
        audience: impl Into<String>,
        path: impl AsRef<Path>,
        algorithm: KeyAlgorithm,
        ttl: Duration,
    ) -> Result<Self, AgentError> {
        let key = load_private_key(path, algorithm)?;
        Self::new(audience, algorithm, key, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn mint(&self) -> Result<Credential, AgentError> {
        self.mint_at(Utc::now())
    }

    pub fn mint_at(&self, now: DateTime<Utc>) -> Result<Credential, AgentError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let header = Header::new(self.algorithm.jwt_algorithm());
        let token = encode(&header, &claims, &self.key)?;
        Ok(Credential {
            token,
            issued_at: now,
            expires_at,
        })
    }
}

pub fn load_private_key(
    path: impl AsRef<Path>,
    algorithm: KeyAlgorithm,
) -> Result<EncodingKey, AgentError> {
    let pem = std::fs::read(path.as_ref())?;
    parse_private_key(&pem, algorithm)
}

pub fn parse_private_key(pem: &[u8], algorithm: KeyAlgorithm) -> Result<EncodingKey, AgentError> {
    let key = match algorithm {
        KeyAlgorithm::Rs256 => EncodingKey::from_rsa_pem(pem)?,
        KeyAlgorithm::Es256 => EncodingKey::from_ec_pem(pem)?,
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const RSA_PRIVATE: &[u8] = include_bytes!("../tests/fixtures/rsa_private.pem");
    const RSA_PUBLIC: &[u8] = include_bytes!("../tests/fixtures/rsa_public.pem");
    const EC_PRIVATE: &[u8] = include_bytes!("../tests/fixtures/ec_private.pem");
    const EC_PUBLIC: &[u8] = include_bytes!("../tests/fixtures/ec_public.pem");

    fn provider(algorithm: KeyAlgorithm, pem: &[u8]) -> CredentialProvider {
        let key = parse_private_key(pem, algorithm).unwrap();
        CredentialProvider::new("iot-home", algorithm, key, Duration::minutes(20)).unwrap()
    }

    fn decode_claims(token: &str, key: &DecodingKey, alg: Algorithm) -> Claims {
        let mut validation = Validation::new(alg);
        validation.set_audience(&["iot-home"]);
        // Fixed timestamps in the past; only the signature and audience matter here.
        validation.validate_exp = false;
        decode::<Claims>(token, key, &validation).unwrap().claims
    }

    #[test]
    fn test_rs256_token_verifies() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let credential = provider(KeyAlgorithm::Rs256, RSA_PRIVATE).mint_at(now).unwrap();

        let key = DecodingKey::from_rsa_pem(RSA_PUBLIC).unwrap();
        let claims = decode_claims(&credential.token, &key, Algorithm::RS256);
        assert_eq!(claims.aud, "iot-home");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 20 * 60);
        assert!(credential.expires_at > credential.issued_at);
    }

    #[test]
    fn test_es256_token_verifies() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let credential = provider(KeyAlgorithm::Es256, EC_PRIVATE).mint_at(now).unwrap();

        let key = DecodingKey::from_ec_pem(EC_PUBLIC).unwrap();
        let claims = decode_claims(&credential.token, &key, Algorithm::ES256);
        assert_eq!(claims.exp - claims.iat, 20 * 60);
    }

    #[test]
    fn test_fresh_token_per_mint() {
        let p = provider(KeyAlgorithm::Rs256, RSA_PRIVATE);
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let first = p.mint_at(t0).unwrap();
        let second = p.mint_at(t0 + Duration::minutes(19)).unwrap();
        assert_ne!(first.token, second.token);
        assert!(second.expires_at > first.expires_at);
    }

    #[test]
    fn test_expires_within() {
        let p = provider(KeyAlgorithm::Rs256, RSA_PRIVATE);
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let credential = p.mint_at(t0).unwrap();
        let margin = Duration::seconds(60);
        assert!(!credential.expires_within(t0 + Duration::minutes(18), margin));
        assert!(credential.expires_within(t0 + Duration::minutes(19), margin));
        assert!(credential.expires_within(t0 + Duration::minutes(25), margin));
    }

    #[test]
    fn test_malformed_key_is_rejected() {
        let err = parse_private_key(b"not a pem file", KeyAlgorithm::Rs256).err().unwrap();
        assert!(matches!(err, AgentError::Credential(_)));
    }

    #[test]
    fn test_missing_key_file() {
        let err = load_private_key("/nonexistent/rsa_private.pem", KeyAlgorithm::Rs256)
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Key(_)));
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        let key = parse_private_key(RSA_PRIVATE, KeyAlgorithm::Rs256).unwrap();
        assert!(CredentialProvider::new("iot-home", KeyAlgorithm::Rs256, key, Duration::zero()).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = provider(KeyAlgorithm::Rs256, RSA_PRIVATE).mint().unwrap();
        let printed = format!("{:?}", credential);
        assert!(!printed.contains(&credential.token));
        assert!(printed.contains("<redacted>"));
    }
}
