//! 连接握手认证
//!
//! 从握手元数据提取 Bearer 凭证并交给令牌校验协作方。

use async_trait::async_trait;
use domain::UserIdentity;

use crate::error::ApplicationError;

/// 令牌校验协作方契约。具体实现见 infrastructure 的 JWT 校验器。
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserIdentity, ApplicationError>;
}

/// 连接握手携带的元数据。
///
/// 凭证优先取 `Authorization: Bearer <token>` 头；浏览器客户端无法
/// 设置 WebSocket 头时退回 `?token=` 查询参数。
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub authorization: Option<String>,
    pub token_param: Option<String>,
}

impl Handshake {
    pub fn with_authorization(value: impl Into<String>) -> Self {
        Self {
            authorization: Some(value.into()),
            token_param: None,
        }
    }

    pub fn with_token_param(value: impl Into<String>) -> Self {
        Self {
            authorization: None,
            token_param: Some(value.into()),
        }
    }

    /// 提取 Bearer 令牌。缺失、前缀错误或空令牌都是认证错误。
    pub fn bearer_token(&self) -> Result<&str, ApplicationError> {
        if let Some(header) = self.authorization.as_deref() {
            let token = header
                .strip_prefix("Bearer ")
                .ok_or_else(|| ApplicationError::authentication("invalid authorization header"))?;
            if token.is_empty() {
                return Err(ApplicationError::authentication("empty bearer token"));
            }
            return Ok(token);
        }
        match self.token_param.as_deref() {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ApplicationError::authentication(
                "no authorization header found",
            )),
        }
    }
}
