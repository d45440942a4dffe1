use crate::error::BotError;
use crate::models::{
    display_time, escape_markdown_v2, CallbackClick, StateName, UserState, LAYOUT_REMIND_AT,
};
use crate::sender::BotResponse;
use crate::timeparse;

use super::ReminderBot;

impl ReminderBot {
    /// Кнопка с готовым временем или смещением при создании напоминания.
    /// Payload фиксированный, но разбор всё равно идёт через общий резолвер.
    pub(super) async fn on_remind_at_button(
        &self,
        callback: &CallbackClick,
        payload: &str,
    ) -> Result<(), BotError> {
        let remind_at = timeparse::resolve(payload, self.now())?;
        self.create_reminder_from_state(callback.user_id, callback.chat_id, remind_at)
            .await
    }

    /// "Готово" под уведомлением: действует по id и не зависит от текущего
    /// состояния диалога, после чего диалог возвращается в Start.
    pub(super) async fn on_done_button(
        &self,
        callback: &CallbackClick,
        reminder_id: i64,
    ) -> Result<(), BotError> {
        self.reminders.mark_done(reminder_id).await?;

        self.set_state(UserState::new(callback.user_id, StateName::Start))
            .await?;

        self.send(BotResponse::new(
            callback.chat_id,
            "Я пометил напоминание как выполненное\\!",
        ))
        .await
    }

    pub(super) async fn on_delay_button(
        &self,
        callback: &CallbackClick,
        reminder_id: i64,
        delay: &str,
    ) -> Result<(), BotError> {
        let remind_at = timeparse::resolve(delay, self.now())?;

        let text = match self.reminders.delay(reminder_id, remind_at).await {
            Ok(()) => format!(
                "Я отложил напоминание\\. Напомню позже, *{}*\\!",
                escape_markdown_v2(&display_time(remind_at).format(LAYOUT_REMIND_AT).to_string())
            ),
            Err(BotError::ReminderNotFound(_)) => {
                format!("Напоминание {reminder_id} не найдено 🤔")
            }
            Err(err) => return Err(err),
        };

        self.set_state(UserState::new(callback.user_id, StateName::Start))
            .await?;
        self.send(BotResponse::new(callback.chat_id, text)).await
    }

    pub(super) async fn on_remove_button(&self, callback: &CallbackClick) -> Result<(), BotError> {
        self.set_state(UserState::new(callback.user_id, StateName::RemoveReminder))
            .await?;

        self.send(BotResponse::new(
            callback.chat_id,
            "Напишите номер напоминания для удаления\\.",
        ))
        .await
    }

    /// Редактирование зарезервировано: заходим в состояние, но любое
    /// дальнейшее действие в нём явно сигнализирует "не поддерживается".
    pub(super) async fn on_edit_button(&self, callback: &CallbackClick) -> Result<(), BotError> {
        self.set_state(UserState::new(callback.user_id, StateName::EditReminder))
            .await?;

        self.send(BotResponse::new(
            callback.chat_id,
            "Напишите номер напоминания для редактирования\\.",
        ))
        .await
    }
}
