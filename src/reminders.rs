use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::database::Storage;
use crate::error::BotError;
use crate::models::{Reminder, ReminderStatus, DEFAULT_ATTEMPTS_LEFT};

/// Жизненный цикл напоминаний поверх хранилища. Тонкие проксирующие
/// операции без собственных блокировок: конфликтующие записи сериализует
/// само хранилище.
#[derive(Clone)]
pub struct ReminderManager {
    store: Arc<dyn Storage>,
}

impl ReminderManager {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Создаёт напоминание: всегда pending с полным запасом попыток.
    pub async fn create(
        &self,
        user_id: i64,
        chat_id: i64,
        text: impl Into<String>,
        remind_at: DateTime<Utc>,
    ) -> Result<i64, BotError> {
        let now = Utc::now();
        let reminder = Reminder {
            id: 0,
            chat_id,
            user_id,
            text: text.into(),
            created_at: now,
            modified_at: now,
            remind_at,
            status: ReminderStatus::Pending,
            attempts_left: DEFAULT_ATTEMPTS_LEFT,
        };

        self.store.save_reminder(&reminder).await
    }

    /// Помечает напоминание выполненным. Повторное нажатие "Готово" по уже
    /// удалённому напоминанию — не повод для ошибки.
    pub async fn mark_done(&self, id: i64) -> Result<(), BotError> {
        match self
            .store
            .set_reminder_status(id, ReminderStatus::Done)
            .await
        {
            Ok(()) => Ok(()),
            Err(BotError::ReminderNotFound(_)) => {
                log::warn!("mark_done: reminder {} is already gone", id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Откладывает напоминание: новый remind_at, полный запас попыток,
    /// статус снова pending. Отсутствие напоминания — типизированная ошибка.
    pub async fn delay(&self, id: i64, remind_at: DateTime<Utc>) -> Result<(), BotError> {
        self.store.delay_reminder(id, remind_at).await
    }

    pub async fn remove(&self, id: i64) -> Result<(), BotError> {
        self.store.remove_reminder(id).await
    }

    /// Pending-напоминания пары (пользователь, чат) по возрастанию remind_at.
    pub async fn list(&self, user_id: i64, chat_id: i64) -> Result<Vec<Reminder>, BotError> {
        self.store.get_my_reminders(user_id, chat_id).await
    }
}
