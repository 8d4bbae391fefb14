use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 已验证凭证解码出的用户身份。
///
/// 只在连接存续期间存在，核心不负责持久化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: String,
}

impl UserIdentity {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}
