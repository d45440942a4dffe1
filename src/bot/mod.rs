mod callbacks;
mod commands;
mod messages;


use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::database::Storage;
use crate::error::BotError;
use crate::models::{CallbackAction, CallbackClick, IncomingMessage, StateName, UserState};
use crate::reminders::ReminderManager;
use crate::sender::{BotResponse, ResponseSender};
use crate::Command;

/// Машина состояний диалога. Читает персистентное состояние пользователя,
/// решает, что значит входящее сообщение или нажатие кнопки в этом
/// состоянии, и отвечает через [`ResponseSender`].
///
/// Инвариант: новое состояние записывается в хранилище до отправки ответа,
/// поэтому при сбое записи пользователь просто не получает ответа, а не
/// получает ответ, противоречащий состоянию.
#[derive(Clone)]
pub struct ReminderBot {
    store: Arc<dyn Storage>,
    reminders: ReminderManager,
    sender: Arc<dyn ResponseSender>,
    clock: fn() -> DateTime<Utc>,
}

impl ReminderBot {
    pub fn new(store: Arc<dyn Storage>, sender: Arc<dyn ResponseSender>) -> Self {
        Self {
            reminders: ReminderManager::new(store.clone()),
            store,
            sender,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Слэш-команды сбрасывают диалог в состояние команды независимо от
    /// того, где пользователь находился до этого.
    pub async fn on_command(&self, msg: &IncomingMessage, cmd: Command) -> Result<(), BotError> {
        match cmd {
            Command::Start => self.on_start_command(msg).await,
            Command::Help => self.on_help_command(msg).await,
            Command::CreateReminder => self.on_create_reminder_command(msg).await,
            Command::MyReminders => self.on_my_reminders_command(msg).await,
            Command::EnableReminders => self.on_enable_reminders_command(msg).await,
            Command::DisableReminders => self.on_disable_reminders_command(msg).await,
        }
    }

    /// Свободный текст трактуется в контексте текущего состояния диалога.
    pub async fn on_text(&self, msg: &IncomingMessage) -> Result<(), BotError> {
        // неизвестная слэш-команда не должна попасть в диалог как данные
        if msg.text.starts_with('/') {
            return self.send_unsupported(msg.chat_id).await;
        }

        let state = match self.store.get_user_state(msg.user_id).await {
            Ok(state) => state,
            Err(BotError::StateNotFound(_)) => return self.send_unsupported(msg.chat_id).await,
            Err(err) => return Err(err),
        };

        match state.name {
            StateName::CreateReminder => self.on_reminder_text(msg).await,
            StateName::EnterRemindAt => self.on_remind_at_text(msg).await,
            StateName::RemoveReminder => self.on_remove_reminder_text(msg).await,
            StateName::EditReminder => Err(BotError::Unsupported("edit_reminder")),
            _ => self.send_unsupported(msg.chat_id).await,
        }
    }

    pub async fn on_callback(&self, callback: &CallbackClick) -> Result<(), BotError> {
        match CallbackAction::parse(&callback.data) {
            Some(CallbackAction::RemindAtTime(payload))
            | Some(CallbackAction::RemindAtDuration(payload)) => {
                self.on_remind_at_button(callback, &payload).await
            }
            Some(CallbackAction::ReminderDone(reminder_id)) => {
                self.on_done_button(callback, reminder_id).await
            }
            Some(CallbackAction::DelayReminder { reminder_id, delay }) => {
                self.on_delay_button(callback, reminder_id, &delay).await
            }
            Some(CallbackAction::RemoveReminder) => self.on_remove_button(callback).await,
            Some(CallbackAction::EditReminder) => self.on_edit_button(callback).await,
            None => self.send_unsupported(callback.chat_id).await,
        }
    }

    async fn set_state(&self, state: UserState) -> Result<(), BotError> {
        self.store.save_user_state(&state).await
    }

    async fn send(&self, response: BotResponse) -> Result<(), BotError> {
        self.sender.send(response).await
    }

    async fn send_unsupported(&self, chat_id: i64) -> Result<(), BotError> {
        self.send(BotResponse::new(
            chat_id,
            "Я не понимаю, о чём речь\\! Пожалуйста, воспользуйтесь командой /help\\.",
        ))
        .await
    }
}
