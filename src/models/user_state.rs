use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Позиция пользователя в диалоге. Ровно одна строка на пользователя,
/// каждый переход полностью перезаписывает предыдущее состояние.
#[derive(Debug, Clone, PartialEq)]
pub struct UserState {
    pub user_id: i64,
    pub name: StateName,
    pub modified_at: DateTime<Utc>,
    pub context: Option<StateContext>,
}

/// Закрытый набор состояний диалога.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateName {
    /// Пользователь зарегистрирован, диалог в исходной точке.
    Start,
    Help,
    /// Ожидаем текст напоминания.
    CreateReminder,
    /// Ожидаем дату/время, текст напоминания лежит в контексте.
    EnterRemindAt,
    MyReminders,
    EnableReminders,
    DisableReminders,
    /// Ожидаем номер напоминания для удаления.
    RemoveReminder,
    /// Зарезервировано: редактирование не реализовано.
    EditReminder,
}

/// Черновик, который переносится между шагами диалога.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_text: Option<String>,
}

impl UserState {
    pub fn new(user_id: i64, name: StateName) -> Self {
        Self {
            user_id,
            name,
            modified_at: Utc::now(),
            context: None,
        }
    }

    pub fn with_reminder_text(mut self, text: impl Into<String>) -> Self {
        self.context
            .get_or_insert_with(StateContext::default)
            .reminder_text = Some(text.into());
        self
    }

    pub fn reminder_text(&self) -> Option<&str> {
        self.context.as_ref()?.reminder_text.as_deref()
    }
}

impl StateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateName::Start => "start",
            StateName::Help => "help",
            StateName::CreateReminder => "create_reminder",
            StateName::EnterRemindAt => "enter_remind_at",
            StateName::MyReminders => "my_reminders",
            StateName::EnableReminders => "enable_reminders",
            StateName::DisableReminders => "disable_reminders",
            StateName::RemoveReminder => "remove_reminder",
            StateName::EditReminder => "edit_reminder",
        }
    }
}

impl FromStr for StateName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(StateName::Start),
            "help" => Ok(StateName::Help),
            "create_reminder" => Ok(StateName::CreateReminder),
            "enter_remind_at" => Ok(StateName::EnterRemindAt),
            "my_reminders" => Ok(StateName::MyReminders),
            "enable_reminders" => Ok(StateName::EnableReminders),
            "disable_reminders" => Ok(StateName::DisableReminders),
            "remove_reminder" => Ok(StateName::RemoveReminder),
            "edit_reminder" => Ok(StateName::EditReminder),
            other => Err(format!("unknown state name: {other}")),
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[UserID: {}, Name: {}]", self.user_id, self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_text_lives_in_context() {
        let state = UserState::new(7, StateName::EnterRemindAt).with_reminder_text("полить цветы");
        assert_eq!(state.reminder_text(), Some("полить цветы"));
        assert_eq!(state.context.as_ref().unwrap().reminder_id, None);
    }

    #[test]
    fn context_serializes_without_empty_fields() {
        let ctx = StateContext {
            reminder_id: None,
            reminder_text: Some("текст".to_string()),
        };
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"reminder_text":"текст"}"#);
    }

    #[test]
    fn state_name_round_trips() {
        for name in [
            StateName::Start,
            StateName::Help,
            StateName::CreateReminder,
            StateName::EnterRemindAt,
            StateName::MyReminders,
            StateName::EnableReminders,
            StateName::DisableReminders,
            StateName::RemoveReminder,
            StateName::EditReminder,
        ] {
            assert_eq!(name.as_str().parse::<StateName>(), Ok(name));
        }
    }
}
