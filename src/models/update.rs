use std::fmt;

/// Входящее текстовое сообщение, уже очищенное от телеграмных деталей.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub text: String,
}

/// Нажатие инлайн-кнопки.
#[derive(Debug, Clone)]
pub struct CallbackClick {
    pub chat_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub data: String,
}

impl fmt::Display for IncomingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ChatID: {}, UserID: {}, UserName: {}, Text: {}]",
            self.chat_id, self.user_id, self.user_name, self.text
        )
    }
}

impl fmt::Display for CallbackClick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ChatID: {}, UserID: {}, UserName: {}, Data: {}]",
            self.chat_id, self.user_id, self.user_name, self.data
        )
    }
}

pub const BTN_PREFIX_REMIND_AT_TIME: &str = "remind_at/time/";
pub const BTN_PREFIX_REMIND_AT_DURATION: &str = "remind_at/duration/";
pub const BTN_PREFIX_REMINDER_DONE: &str = "reminder_done/";
pub const BTN_PREFIX_DELAY_REMINDER: &str = "delay_reminder/";
pub const BTN_REMOVE_REMINDER: &str = "remove_reminder";
pub const BTN_EDIT_REMINDER: &str = "edit_reminder";

/// Payload кнопки, разобранный один раз на границе. Дальше бизнес-логика
/// работает только с этим перечислением, без разбора строк.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Конкретное время срабатывания, например "11:30".
    RemindAtTime(String),
    /// Смещение от текущего момента, например "30m".
    RemindAtDuration(String),
    /// Пользователь подтвердил напоминание.
    ReminderDone(i64),
    /// Отложить напоминание на указанную длительность.
    DelayReminder { reminder_id: i64, delay: String },
    RemoveReminder,
    EditReminder,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(time) = data.strip_prefix(BTN_PREFIX_REMIND_AT_TIME) {
            return Some(CallbackAction::RemindAtTime(time.to_string()));
        }

        if let Some(duration) = data.strip_prefix(BTN_PREFIX_REMIND_AT_DURATION) {
            return Some(CallbackAction::RemindAtDuration(duration.to_string()));
        }

        if let Some(id) = data.strip_prefix(BTN_PREFIX_REMINDER_DONE) {
            return id.parse().ok().map(CallbackAction::ReminderDone);
        }

        if let Some(rest) = data.strip_prefix(BTN_PREFIX_DELAY_REMINDER) {
            let (id, delay) = rest.split_once('/')?;
            return Some(CallbackAction::DelayReminder {
                reminder_id: id.parse().ok()?,
                delay: delay.to_string(),
            });
        }

        match data {
            BTN_REMOVE_REMINDER => Some(CallbackAction::RemoveReminder),
            BTN_EDIT_REMINDER => Some(CallbackAction::EditReminder),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_remind_at_buttons() {
        assert_eq!(
            CallbackAction::parse("remind_at/time/11:30"),
            Some(CallbackAction::RemindAtTime("11:30".to_string()))
        );
        assert_eq!(
            CallbackAction::parse("remind_at/duration/730h"),
            Some(CallbackAction::RemindAtDuration("730h".to_string()))
        );
    }

    #[test]
    fn parses_reminder_action_buttons() {
        assert_eq!(
            CallbackAction::parse("reminder_done/17"),
            Some(CallbackAction::ReminderDone(17))
        );
        assert_eq!(
            CallbackAction::parse("delay_reminder/17/30m"),
            Some(CallbackAction::DelayReminder {
                reminder_id: 17,
                delay: "30m".to_string()
            })
        );
        assert_eq!(
            CallbackAction::parse("remove_reminder"),
            Some(CallbackAction::RemoveReminder)
        );
        assert_eq!(
            CallbackAction::parse("edit_reminder"),
            Some(CallbackAction::EditReminder)
        );
    }

    #[test]
    fn rejects_unknown_and_malformed_payloads() {
        assert_eq!(CallbackAction::parse("reminder_done/abc"), None);
        assert_eq!(CallbackAction::parse("delay_reminder/17"), None);
        assert_eq!(CallbackAction::parse("something_else"), None);
        assert_eq!(CallbackAction::parse(""), None);
    }
}
