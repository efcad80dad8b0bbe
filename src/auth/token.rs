use std::time::Duration;

use jsonwebtoken::{decode, encode, get_current_timestamp, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthUser};

/// JWT payload identifying an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    pub exp: u64,
    pub iat: u64,
}

impl Claims {
    /// Seconds until expiry, zero once expired.
    pub fn remaining(&self) -> u64 {
        self.exp.saturating_sub(get_current_timestamp())
    }
}

/// Signs and verifies HS256 tokens with a shared secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn sign(&self, user: &AuthUser, ttl: Duration) -> Result<String, AuthError> {
        let now = get_current_timestamp();
        let claims = Claims {
            id: user.id.clone(),
            username: user.username.clone(),
            roles: user.roles.clone(),
            exp: now + ttl.as_secs(),
            iat: now,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }

    /// Checks the signature only; expired tokens still decode.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenService")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AuthUser {
        AuthUser {
            id: "1".to_string(),
            username: "admin".to_string(),
            roles: Some(vec!["admin".to_string()]),
        }
    }

    #[test]
    fn signed_token_verifies() {
        let tokens = TokenService::new("secret");
        let token = tokens.sign(&admin(), Duration::from_secs(3600)).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.roles, Some(vec!["admin".to_string()]));
        assert!(claims.remaining() > 3500);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenService::new("a").sign(&admin(), Duration::from_secs(60)).unwrap();
        assert!(TokenService::new("b").verify(&token).is_err());
    }

    #[test]
    fn expired_token_decodes_but_does_not_verify() {
        let tokens = TokenService::new("secret");
        let token = tokens.sign(&admin(), Duration::ZERO).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert!(tokens.verify(&token).is_err());
        assert_eq!(tokens.decode(&token).unwrap().id, "1");
    }
}
