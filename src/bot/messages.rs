use chrono::{DateTime, Utc};

use crate::error::BotError;
use crate::models::{
    display_time, escape_markdown_v2, IncomingMessage, StateName, UserState, LAYOUT_REMIND_AT,
};
use crate::sender::{BotResponse, Keyboard};
use crate::timeparse;

use super::ReminderBot;

impl ReminderBot {
    /// Свободный текст в состоянии CreateReminder — это текст будущего
    /// напоминания. Кладём его в контекст и спрашиваем дату.
    pub(super) async fn on_reminder_text(&self, msg: &IncomingMessage) -> Result<(), BotError> {
        let state = UserState::new(msg.user_id, StateName::EnterRemindAt)
            .with_reminder_text(msg.text.trim());
        self.set_state(state).await?;

        self.send(self.remind_at_prompt(msg.chat_id)).await
    }

    /// Свободный текст в состоянии EnterRemindAt — это дата/время. Ошибка
    /// разбора не фатальна: переспрашиваем, черновик остаётся в контексте.
    pub(super) async fn on_remind_at_text(&self, msg: &IncomingMessage) -> Result<(), BotError> {
        match timeparse::resolve(&msg.text, self.now()) {
            Ok(remind_at) => {
                self.create_reminder_from_state(msg.user_id, msg.chat_id, remind_at)
                    .await
            }
            Err(BotError::Parse(_)) => {
                let mut retry = self.remind_at_prompt(msg.chat_id);
                retry.text = format!(
                    "Не смог разобрать дату 🤔\n\n{}",
                    retry.text
                );
                self.send(retry).await
            }
            Err(err) => Err(err),
        }
    }

    /// Номер напоминания для удаления. Ненайденное или нечисловое значение —
    /// мягкий ответ; состояние в любом случае возвращается в Start.
    pub(super) async fn on_remove_reminder_text(
        &self,
        msg: &IncomingMessage,
    ) -> Result<(), BotError> {
        let text = match msg.text.trim().parse::<i64>() {
            Ok(reminder_id) => match self.reminders.remove(reminder_id).await {
                Ok(()) => format!("Напоминание {reminder_id} удалено ❌"),
                Err(BotError::ReminderNotFound(_)) => {
                    format!("Напоминание {reminder_id} не найдено 🤔")
                }
                Err(err) => return Err(err),
            },
            Err(_) => format!(
                "{} не похоже на номер напоминания 🤔",
                escape_markdown_v2(&msg.text)
            ),
        };

        self.set_state(UserState::new(msg.user_id, StateName::Start))
            .await?;
        self.send(BotResponse::new(msg.chat_id, text)).await
    }

    /// Завершение транзакции создания: текст берётся из контекста состояния
    /// EnterRemindAt, после записи напоминания диалог возвращается в Start.
    pub(super) async fn create_reminder_from_state(
        &self,
        user_id: i64,
        chat_id: i64,
        remind_at: DateTime<Utc>,
    ) -> Result<(), BotError> {
        let state = self.store.get_user_state(user_id).await?;

        if state.name != StateName::EnterRemindAt {
            return Err(BotError::InvalidState {
                expected: StateName::EnterRemindAt.as_str(),
                actual: state.name.as_str().to_string(),
            });
        }

        let text = state
            .reminder_text()
            .ok_or(BotError::InvalidState {
                expected: "enter_remind_at with reminder text",
                actual: "empty context".to_string(),
            })?
            .to_string();

        self.reminders
            .create(user_id, chat_id, &text, remind_at)
            .await?;

        self.set_state(UserState::new(user_id, StateName::Start))
            .await?;

        self.send(BotResponse::new(
            chat_id,
            format!(
                "*{}* я напомню тебе о *{}*\\!",
                escape_markdown_v2(&display_time(remind_at).format(LAYOUT_REMIND_AT).to_string()),
                escape_markdown_v2(&text)
            ),
        ))
        .await
    }

    fn remind_at_prompt(&self, chat_id: i64) -> BotResponse {
        let now = display_time(self.now()).format(LAYOUT_REMIND_AT).to_string();

        let text = format!(
            "*Когда напомнить*❓\n\nТекущая дата и время: {} ⌚\n\nВведите дату и время в формате *YYYY\\-MM\\-DD HH:mm* ⏰\n\nНапример, 2024\\-06\\-07 11:30 значит, что я пришлю напоминание 7 июня 2024 года в 11:30\\.\n\nИли выберите опцию ниже:",
            escape_markdown_v2(&now)
        );

        BotResponse::new(chat_id, text).with_keyboard(Keyboard::RemindAtOptions)
    }
}
