use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};

use crate::config::JwtConfig;
use crate::error::AppError;

use super::Claims;

pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(config: &JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::default();

        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = config.audience {
            validation.set_audience(&[audience]);
        }

        Self {
            decoding_key,
            validation,
        }
    }

    /// Validate a bearer token, distinguishing an expired token from any
    /// other kind of invalid token in the error message.
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AppError::Auth("token expired".to_string()),
                    _ => AppError::Auth("invalid token".to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn create_test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            issuer: None,
            audience: None,
        }
    }

    fn create_test_token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims_expiring_in(seconds: i64) -> Claims {
        Claims {
            sub: "user-123".to_string(),
            exp: chrono::Utc::now().timestamp() + seconds,
            iat: chrono::Utc::now().timestamp(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_valid_token() {
        let config = create_test_config();
        let validator = JwtValidator::new(&config);

        let token = create_test_token(&claims_expiring_in(3600), &config.secret);
        let result = validator.validate(&token);

        assert!(result.is_ok());
        assert_eq!(result.unwrap().sub, "user-123");
    }

    #[test]
    fn test_invalid_token() {
        let config = create_test_config();
        let validator = JwtValidator::new(&config);

        let err = validator.validate("invalid-token").unwrap_err();
        match err {
            AppError::Auth(msg) => assert_eq!(msg, "invalid token"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_expired_token() {
        let config = create_test_config();
        let validator = JwtValidator::new(&config);

        let token = create_test_token(&claims_expiring_in(-3600), &config.secret);
        let err = validator.validate(&token).unwrap_err();
        match err {
            AppError::Auth(msg) => assert_eq!(msg, "token expired"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let config = create_test_config();
        let validator = JwtValidator::new(&config);

        let token = create_test_token(&claims_expiring_in(3600), "a-different-secret");
        let err = validator.validate(&token).unwrap_err();
        match err {
            AppError::Auth(msg) => assert_eq!(msg, "invalid token"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
