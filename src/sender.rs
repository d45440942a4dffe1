use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use crate::error::BotError;
use crate::models::update::{
    BTN_EDIT_REMINDER, BTN_PREFIX_DELAY_REMINDER, BTN_PREFIX_REMINDER_DONE,
    BTN_PREFIX_REMIND_AT_DURATION, BTN_PREFIX_REMIND_AT_TIME, BTN_REMOVE_REMINDER,
};

/// Фиксированные наборы инлайн-кнопок, которые бот прикладывает к ответам.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Быстрый выбор времени напоминания при создании.
    RemindAtOptions,
    /// "Готово" и варианты отложить для конкретного напоминания.
    ReminderActions { reminder_id: i64 },
    /// Кнопки под списком напоминаний.
    ReminderListActions,
}

/// Ответ бота: текст и, опционально, один из фиксированных наборов кнопок.
#[derive(Debug, Clone)]
pub struct BotResponse {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl BotResponse {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Исходящий канал бота. За трейтом прячется Telegram, в тестах — буфер в памяти.
#[async_trait]
pub trait ResponseSender: Send + Sync {
    async fn send(&self, response: BotResponse) -> Result<(), BotError>;
}

/// Отправка через Telegram Bot API: сначала MarkdownV2, при неудаче — plain text.
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ResponseSender for TelegramSender {
    async fn send(&self, response: BotResponse) -> Result<(), BotError> {
        log::debug!("bot response - chat {}: {:?}", response.chat_id, response.text);

        let chat_id = ChatId(response.chat_id);
        let markup = response.keyboard.map(make_keyboard);

        let mut request = self
            .bot
            .send_message(chat_id, &response.text)
            .parse_mode(ParseMode::MarkdownV2);
        if let Some(markup) = markup.clone() {
            request = request.reply_markup(markup);
        }

        if let Err(err) = request.await {
            log::warn!("failed to send markdown message to chat {chat_id}: {err}");

            // однократный фолбэк в plain text
            let mut plain = self.bot.send_message(chat_id, &response.text);
            if let Some(markup) = markup {
                plain = plain.reply_markup(markup);
            }
            plain.await?;
        }

        Ok(())
    }
}

fn make_keyboard(keyboard: Keyboard) -> InlineKeyboardMarkup {
    match keyboard {
        Keyboard::RemindAtOptions => make_remind_at_keyboard(),
        Keyboard::ReminderActions { reminder_id } => make_reminder_actions_keyboard(reminder_id),
        Keyboard::ReminderListActions => InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::callback("📝 Редактировать", BTN_EDIT_REMINDER),
            InlineKeyboardButton::callback("❌ Удалить", BTN_REMOVE_REMINDER),
        ]]),
    }
}

fn make_remind_at_keyboard() -> InlineKeyboardMarkup {
    let time_row = ["11:30", "14:30", "19:30", "20:30"]
        .into_iter()
        .map(|t| InlineKeyboardButton::callback(t, format!("{BTN_PREFIX_REMIND_AT_TIME}{t}")))
        .collect::<Vec<_>>();

    let duration_row = [
        ("30 мин", "30m"),
        ("80 мин", "80m"),
        ("1 день", "24h"),
        ("1 месяц", "730h"),
    ]
    .into_iter()
    .map(|(label, d)| {
        InlineKeyboardButton::callback(label, format!("{BTN_PREFIX_REMIND_AT_DURATION}{d}"))
    })
    .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(vec![time_row, duration_row])
}

fn make_reminder_actions_keyboard(reminder_id: i64) -> InlineKeyboardMarkup {
    let delay_button = |label: &str, delay: &str| {
        InlineKeyboardButton::callback(
            format!("🔄 {label}"),
            format!("{BTN_PREFIX_DELAY_REMINDER}{reminder_id}/{delay}"),
        )
    };

    InlineKeyboardMarkup::new(vec![
        vec![
            delay_button("30 мин.", "30m"),
            delay_button("80 мин.", "80m"),
            delay_button("3 час.", "3h"),
        ],
        vec![
            delay_button("1 ден.", "24h"),
            delay_button("1 нед.", "168h"),
            delay_button("1 мес.", "730h"),
        ],
        vec![InlineKeyboardButton::callback(
            "✅ Готово",
            format!("{BTN_PREFIX_REMINDER_DONE}{reminder_id}"),
        )],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_actions_payloads_are_parseable() {
        use crate::models::CallbackAction;

        let markup = make_keyboard(Keyboard::ReminderActions { reminder_id: 5 });
        for row in &markup.inline_keyboard {
            for button in row {
                if let teloxide::types::InlineKeyboardButtonKind::CallbackData(data) = &button.kind
                {
                    assert!(
                        CallbackAction::parse(data).is_some(),
                        "unparseable payload: {data}"
                    );
                }
            }
        }
    }
}
