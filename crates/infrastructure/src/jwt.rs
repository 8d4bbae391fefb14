//! JWT 认证
//!
//! HS256 签发与校验。声明集沿用 `{id, email, exp}`，校验通过后
//! 解码出连接要绑定的用户身份。

use async_trait::async_trait;
use chrono::{Duration, Utc};
use config::JwtConfig;
use domain::{UserId, UserIdentity};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use application::{ApplicationError, TokenVerifier};

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// JWT 令牌服务，同时承担签发与校验
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_hours: i64,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_ref()),
            decoding_key: DecodingKey::from_secret(config.secret.as_ref()),
            expiration_hours: config.expiration_hours,
        }
    }

    /// 为用户签发访问令牌
    pub fn issue_token(&self, identity: &UserIdentity) -> Result<String, JwtError> {
        let exp = Utc::now() + Duration::hours(self.expiration_hours);
        let claims = Claims {
            id: identity.id.into(),
            email: identity.email.clone(),
            exp: exp.timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }
}

#[async_trait]
impl TokenVerifier for JwtAuth {
    async fn verify(&self, token: &str) -> Result<UserIdentity, ApplicationError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|err| ApplicationError::authentication(format!("invalid token: {err}")))?;
        Ok(UserIdentity::new(
            UserId::new(data.claims.id),
            data.claims.email,
        ))
    }
}
