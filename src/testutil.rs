//! Моки хранилища и исходящего канала для модульных тестов.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::Storage;
use crate::error::BotError;
use crate::models::{
    Reminder, ReminderStatus, User, UserState, UserStatus, DEFAULT_ATTEMPTS_LEFT,
};
use crate::sender::{BotResponse, ResponseSender};

/// Хранилище в памяти с семантикой, повторяющей SQL-реализацию.
#[derive(Default)]
pub struct MemoryStorage {
    pub users: Mutex<HashMap<i64, User>>,
    pub states: Mutex<HashMap<i64, UserState>>,
    pub reminders: Mutex<Vec<Reminder>>,
    next_id: AtomicI64,
    /// id напоминаний, для которых update_reminder должен падать.
    pub fail_update_ids: Mutex<HashSet<i64>>,
    /// Имитация отказа записи состояния диалога.
    pub fail_state_saves: AtomicBool,
}

impl MemoryStorage {
    pub fn reminder_by_id(&self, id: i64) -> Option<Reminder> {
        self.reminders
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn state_of(&self, user_id: i64) -> Option<UserState> {
        self.states.lock().unwrap().get(&user_id).cloned()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_user(&self, user: &User) -> Result<(), BotError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.id) {
            return Err(BotError::UserAlreadyExists(user.id));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<(), BotError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(BotError::UserNotFound(id))?;
        user.status = status;
        user.modified_at = Utc::now();
        Ok(())
    }

    async fn get_user_state(&self, user_id: i64) -> Result<UserState, BotError> {
        self.states
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(BotError::StateNotFound(user_id))
    }

    async fn save_user_state(&self, state: &UserState) -> Result<(), BotError> {
        if self.fail_state_saves.load(Ordering::SeqCst) {
            return Err(BotError::Storage(sqlx::Error::PoolTimedOut));
        }
        self.states
            .lock()
            .unwrap()
            .insert(state.user_id, state.clone());
        Ok(())
    }

    async fn save_reminder(&self, reminder: &Reminder) -> Result<i64, BotError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut stored = reminder.clone();
        stored.id = id;
        self.reminders.lock().unwrap().push(stored);
        Ok(id)
    }

    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), BotError> {
        if self.fail_update_ids.lock().unwrap().contains(&reminder.id) {
            return Err(BotError::Storage(sqlx::Error::PoolTimedOut));
        }

        let mut reminders = self.reminders.lock().unwrap();
        let stored = reminders
            .iter_mut()
            .find(|r| r.id == reminder.id)
            .ok_or(BotError::ReminderNotFound(reminder.id))?;
        stored.status = reminder.status;
        stored.attempts_left = reminder.attempts_left;
        stored.remind_at = reminder.remind_at;
        stored.modified_at = Utc::now();
        Ok(())
    }

    async fn set_reminder_status(&self, id: i64, status: ReminderStatus) -> Result<(), BotError> {
        let mut reminders = self.reminders.lock().unwrap();
        let stored = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(BotError::ReminderNotFound(id))?;
        stored.status = status;
        stored.modified_at = Utc::now();
        Ok(())
    }

    async fn delay_reminder(&self, id: i64, remind_at: DateTime<Utc>) -> Result<(), BotError> {
        let mut reminders = self.reminders.lock().unwrap();
        let stored = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(BotError::ReminderNotFound(id))?;
        stored.remind_at = remind_at;
        stored.attempts_left = DEFAULT_ATTEMPTS_LEFT;
        stored.status = ReminderStatus::Pending;
        stored.modified_at = Utc::now();
        Ok(())
    }

    async fn remove_reminder(&self, id: i64) -> Result<(), BotError> {
        let mut reminders = self.reminders.lock().unwrap();
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        if reminders.len() == before {
            return Err(BotError::ReminderNotFound(id));
        }
        Ok(())
    }

    async fn get_my_reminders(&self, user_id: i64, chat_id: i64) -> Result<Vec<Reminder>, BotError> {
        let mut result: Vec<Reminder> = self
            .reminders
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.user_id == user_id
                    && r.chat_id == chat_id
                    && r.status == ReminderStatus::Pending
            })
            .cloned()
            .collect();
        result.sort_by_key(|r| r.remind_at);
        Ok(result)
    }

    async fn get_pending_reminders(&self, limit: i64) -> Result<Vec<Reminder>, BotError> {
        let now = Utc::now();
        let users = self.users.lock().unwrap().clone();

        let mut result: Vec<Reminder> = self
            .reminders
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.status == ReminderStatus::Pending
                    && r.remind_at < now
                    && r.attempts_left > 0
                    && users
                        .get(&r.user_id)
                        .map(|u| u.status == UserStatus::Active)
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        result.sort_by_key(|r| r.remind_at);
        result.truncate(limit as usize);
        Ok(result)
    }
}

/// Исходящий канал, складывающий ответы в буфер.
#[derive(Default)]
pub struct MemorySender {
    pub sent: Mutex<Vec<BotResponse>>,
    pub fail: AtomicBool,
}

impl MemorySender {
    pub fn last(&self) -> Option<BotResponse> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ResponseSender for MemorySender {
    async fn send(&self, response: BotResponse) -> Result<(), BotError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BotError::Transport("mock delivery failure".to_string()));
        }
        self.sent.lock().unwrap().push(response);
        Ok(())
    }
}

/// Активный пользователь для тестовых сценариев.
pub fn active_user(id: i64) -> User {
    let now = Utc::now();
    User {
        id,
        name: format!("user{id}"),
        status: UserStatus::Active,
        created_at: now,
        modified_at: now,
    }
}

/// Pending-напоминание с заданным временем срабатывания.
pub fn pending_reminder(user_id: i64, chat_id: i64, remind_at: DateTime<Utc>) -> Reminder {
    let now = Utc::now();
    Reminder {
        id: 0,
        chat_id,
        user_id,
        text: "тестовое напоминание".to_string(),
        created_at: now,
        modified_at: now,
        remind_at,
        status: ReminderStatus::Pending,
        attempts_left: DEFAULT_ATTEMPTS_LEFT,
    }
}
