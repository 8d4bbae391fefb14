//! 领域模型错误定义
//!
//! 核心的错误分类：认证失败、请求校验失败、资源不存在、存储失败。
//! 只有认证失败会导致连接被关闭，其余错误通过统一的 exception
//! 信封回报给发起方。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 请求参数校验失败
    #[error("validation failed: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 引用的资源不存在
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }
}

/// 存储协作方错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// 记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一性冲突
    #[error("record already exists")]
    Conflict,

    /// 底层存储失败
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
