use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Пользователь бота. Создаётся по команде /start и никогда не удаляется,
/// включение/выключение напоминаний меняет только статус.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    /// Пользователь активен и получает напоминания.
    Active,
    /// Напоминания для пользователя выключены.
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            other => Err(format!("unknown user status: {other}")),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ID: {}, Name: {}, Status: {}]",
            self.id,
            self.name,
            self.status.as_str()
        )
    }
}
