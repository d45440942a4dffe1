use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};

use crate::models::{display_time, escape_markdown_v2};

/// Сколько попыток доставки даётся напоминанию, пока пользователь
/// не нажмёт "Готово".
pub const DEFAULT_ATTEMPTS_LEFT: i16 = 10;

/// Одноразовое напоминание с текстом, временем срабатывания и счётчиком
/// оставшихся попыток доставки. `remind_at` хранится в UTC с точностью
/// до минуты.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub remind_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub attempts_left: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderStatus {
    /// Будет отправлено в remind_at.
    Pending,
    /// Пользователь отметил напоминание выполненным.
    Done,
    /// Все попытки получить "Готово" от пользователя исчерпаны. Терминальный статус.
    AttemptsExhausted,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Done => "done",
            ReminderStatus::AttemptsExhausted => "attempts_exhausted",
        }
    }
}

impl FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "done" => Ok(ReminderStatus::Done),
            "attempts_exhausted" => Ok(ReminderStatus::AttemptsExhausted),
            other => Err(format!("unknown reminder status: {other}")),
        }
    }
}

impl Reminder {
    /// Строка списка напоминаний: текст, время в таймзоне отображения
    /// ("Сегодня 11:30" либо "7 июн. 11:30") и номер для удаления.
    pub fn format_list_entry(&self, now: DateTime<Utc>) -> String {
        let remind_at = display_time(self.remind_at);
        let now = display_time(now);
        let time_only = remind_at.format("%H:%M");

        let when = if (now.year(), now.month(), now.day())
            == (remind_at.year(), remind_at.month(), remind_at.day())
        {
            format!("⏰ Сегодня {time_only}")
        } else {
            format!(
                "⏰ {} {} {}",
                remind_at.day(),
                escape_markdown_v2(russian_month(remind_at.month())),
                time_only
            )
        };

        format!(
            "✅ *{}*\n{}\n№ {}",
            escape_markdown_v2(&self.text),
            when,
            self.id
        )
    }

    /// Текст push-уведомления о сработавшем напоминании.
    pub fn format_notification(&self) -> String {
        format!(
            "‼️*НАПОМИНАНИЕ*‼️\n\n*{}*\n\nСегодня {} ⏰\n\nЧтобы отложить напоминание, используйте кнопки 🔄 ниже\\.",
            escape_markdown_v2(&self.text.to_uppercase()),
            display_time(self.remind_at).format("%H:%M"),
        )
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ID: {}, UserID: {}, ChatID: {}, Status: {}, RemindAt: {}, AttemptsLeft: {}]",
            self.id,
            self.user_id,
            self.chat_id,
            self.status.as_str(),
            self.remind_at,
            self.attempts_left
        )
    }
}

fn russian_month(month: u32) -> &'static str {
    match month {
        1 => "янв.",
        2 => "фев.",
        3 => "мар.",
        4 => "апр.",
        5 => "мая",
        6 => "июн.",
        7 => "июл.",
        8 => "авг.",
        9 => "сент.",
        10 => "окт.",
        11 => "нояб.",
        12 => "дек.",
        _ => "",
    }
}
