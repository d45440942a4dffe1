pub mod reminder;
pub mod update;
pub mod user;
pub mod user_state;

pub use reminder::{Reminder, ReminderStatus, DEFAULT_ATTEMPTS_LEFT};
pub use update::{CallbackAction, CallbackClick, IncomingMessage};
pub use user::{User, UserStatus};
pub use user_state::{StateContext, StateName, UserState};

use chrono::{DateTime, FixedOffset, Utc};

/// Все даты храним в UTC, показываем пользователю в фиксированной таймзоне.
/// TODO: спрашивать таймзону у пользователя при регистрации.
pub fn display_tz() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).expect("UTC+3 is a valid offset")
}

/// Время в таймзоне отображения.
pub fn display_time(t: DateTime<Utc>) -> DateTime<FixedOffset> {
    t.with_timezone(&display_tz())
}

/// Формат даты/времени напоминания в сообщениях и при вводе.
pub const LAYOUT_REMIND_AT: &str = "%Y-%m-%d %H:%M";

/// Экранирование динамического текста для MarkdownV2.
pub fn escape_markdown_v2(text: &str) -> String {
    const SPECIALS: [char; 18] = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];

    let mut out = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if SPECIALS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markdown_specials() {
        assert_eq!(escape_markdown_v2("a.b!c"), "a\\.b\\!c");
        assert_eq!(
            escape_markdown_v2("2024-01-01 04:01"),
            "2024\\-01\\-01 04:01"
        );
        assert_eq!(escape_markdown_v2("обычный текст"), "обычный текст");
    }
}
