//! HS256 access tokens carrying the user profile.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{db::models::UserProfile, errors::ApiError};

const LEEWAY_SECS: u64 = 60;

/// Access token claims. `sub` is the JSON-serialized user profile.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Issues and validates access tokens. Managed as Rocket state.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expire_minutes: i64,
}

impl JwtService {
    pub fn new(secret: &str, expire_minutes: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expire_minutes,
        }
    }

    pub fn issue(&self, profile: &UserProfile) -> Result<String, ApiError> {
        let sub = serde_json::to_string(profile)
            .map_err(|e| ApiError::Authentication(format!("Invalid user profile: {e}")))?;
        let claims = Claims {
            sub,
            exp: (Utc::now() + Duration::minutes(self.expire_minutes)).timestamp(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify the signature and expiry, and return the embedded profile
    pub fn verify(&self, token: &str) -> Result<UserProfile, ApiError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        serde_json::from_str(&data.claims.sub)
            .map_err(|_| ApiError::Authentication("Invalid token subject".to_owned()))
    }
}
