use domain::{DomainError, RepositoryError};
use thiserror::Error;

/// 协调核心的错误类型
///
/// 对应四类对外错误：认证失败、校验失败、资源不存在、存储失败。
/// 校验与资源错误都由 [`DomainError`] 承载。
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("authentication failed: {reason}")]
    Authentication { reason: String },
}

impl ApplicationError {
    pub fn authentication(reason: impl Into<String>) -> Self {
        ApplicationError::Authentication {
            reason: reason.into(),
        }
    }

    /// 认证失败是唯一会导致连接被关闭的错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApplicationError::Authentication { .. })
    }

    /// 回报给客户端的描述。存储失败不暴露内部细节。
    pub fn client_message(&self) -> String {
        match self {
            ApplicationError::Authentication { .. } => "Authentication error".to_owned(),
            ApplicationError::Domain(err) => err.to_string(),
            ApplicationError::Repository(_) => "internal storage error".to_owned(),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}
