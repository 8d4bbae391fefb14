//! 房间实体
//!
//! 房间分为两类：`direct`（私聊，恒为 2 名参与者）和 `group`。
//! 参与者集合在构造时去重，直接房间的 2 人不变量由构造函数保证。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{RoomId, UserId};

/// 房间类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Direct,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: Option<String>,
    pub kind: RoomKind,
    pub participants: BTreeSet<UserId>,
    pub created_by: UserId,
    pub updated_by: UserId,
}

impl Room {
    /// 创建私聊房间。参与者恒为创建者与对方两人。
    pub fn direct(
        id: RoomId,
        name: Option<String>,
        creator: UserId,
        other: UserId,
    ) -> Result<Self, DomainError> {
        if creator == other {
            return Err(DomainError::invalid_argument(
                "participants",
                "direct room requires a participant other than the creator",
            ));
        }
        let name = Self::validate_name(name)?;
        let participants = BTreeSet::from([creator, other]);
        Ok(Self {
            id,
            name,
            kind: RoomKind::Direct,
            participants,
            created_by: creator,
            updated_by: creator,
        })
    }

    /// 创建群聊房间。参与者为创建者与列出的用户的并集（去重）。
    pub fn group(
        id: RoomId,
        name: Option<String>,
        creator: UserId,
        participants: impl IntoIterator<Item = UserId>,
    ) -> Result<Self, DomainError> {
        let name = Self::validate_name(name)?;
        let mut set: BTreeSet<UserId> = participants.into_iter().collect();
        set.insert(creator);
        Ok(Self {
            id,
            name,
            kind: RoomKind::Group,
            participants: set,
            created_by: creator,
            updated_by: creator,
        })
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    fn validate_name(name: Option<String>) -> Result<Option<String>, DomainError> {
        match name {
            None => Ok(None),
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_argument(
                        "name",
                        "cannot be empty when present",
                    ));
                }
                Ok(Some(trimmed.to_owned()))
            }
        }
    }
}
