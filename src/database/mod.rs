use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::error::BotError;
use crate::models::{
    Reminder, ReminderStatus, StateContext, StateName, User, UserState, UserStatus,
    DEFAULT_ATTEMPTS_LEFT,
};

/// Персистентность бота. Хранилище — единственный источник правды:
/// бот и планировщик ничего не кэшируют между вызовами.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_user(&self, user: &User) -> Result<(), BotError>;
    async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<(), BotError>;

    async fn get_user_state(&self, user_id: i64) -> Result<UserState, BotError>;
    /// Полная перезапись состояния диалога пользователя (upsert, без слияния).
    async fn save_user_state(&self, state: &UserState) -> Result<(), BotError>;

    async fn save_reminder(&self, reminder: &Reminder) -> Result<i64, BotError>;
    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), BotError>;
    async fn set_reminder_status(&self, id: i64, status: ReminderStatus) -> Result<(), BotError>;
    /// Переносит remind_at, сбрасывает счётчик попыток и возвращает статус
    /// в pending независимо от текущего статуса.
    async fn delay_reminder(&self, id: i64, remind_at: DateTime<Utc>) -> Result<(), BotError>;
    async fn remove_reminder(&self, id: i64) -> Result<(), BotError>;
    async fn get_my_reminders(&self, user_id: i64, chat_id: i64) -> Result<Vec<Reminder>, BotError>;
    /// Напоминания, готовые к доставке: pending, remind_at в прошлом,
    /// попытки не исчерпаны, пользователь активен.
    async fn get_pending_reminders(&self, limit: i64) -> Result<Vec<Reminder>, BotError>;
}

#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, BotError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), BotError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                modified_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_states (
                user_id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                context JSONB,
                modified_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reminders (
                id BIGSERIAL PRIMARY KEY,
                chat_id BIGINT NOT NULL,
                user_id BIGINT NOT NULL,
                text TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                modified_at TIMESTAMPTZ NOT NULL,
                remind_at TIMESTAMPTZ NOT NULL,
                status TEXT NOT NULL,
                attempts_left SMALLINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders (status, remind_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Storage for Database {
    async fn save_user(&self, user: &User) -> Result<(), BotError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, status, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .bind(user.modified_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                log::info!("saved new user {}", user);
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => Err(BotError::UserAlreadyExists(user.id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<(), BotError> {
        let result = sqlx::query("UPDATE users SET status = $1, modified_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BotError::UserNotFound(id));
        }

        log::info!("set user {} status to {}", id, status.as_str());
        Ok(())
    }

    async fn get_user_state(&self, user_id: i64) -> Result<UserState, BotError> {
        let row = sqlx::query(
            "SELECT user_id, name, context, modified_at FROM user_states WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => map_user_state(&row),
            None => Err(BotError::StateNotFound(user_id)),
        }
    }

    async fn save_user_state(&self, state: &UserState) -> Result<(), BotError> {
        let context = state
            .context
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO user_states (user_id, name, context, modified_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                name = EXCLUDED.name,
                context = EXCLUDED.context,
                modified_at = EXCLUDED.modified_at
            "#,
        )
        .bind(state.user_id)
        .bind(state.name.as_str())
        .bind(context)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        log::debug!("saved user state {}", state);
        Ok(())
    }

    async fn save_reminder(&self, reminder: &Reminder) -> Result<i64, BotError> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO reminders (chat_id, user_id, text, created_at, modified_at,
                                   remind_at, status, attempts_left)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(reminder.chat_id)
        .bind(reminder.user_id)
        .bind(&reminder.text)
        .bind(now)
        .bind(now)
        .bind(reminder.remind_at)
        .bind(reminder.status.as_str())
        .bind(reminder.attempts_left)
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.get("id");
        log::info!("saved reminder {} with id {}", reminder, id);
        Ok(id)
    }

    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), BotError> {
        let result = sqlx::query(
            r#"
            UPDATE reminders
            SET status = $1, attempts_left = $2, remind_at = $3, modified_at = $4
            WHERE id = $5
            "#,
        )
        .bind(reminder.status.as_str())
        .bind(reminder.attempts_left)
        .bind(reminder.remind_at)
        .bind(Utc::now())
        .bind(reminder.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BotError::ReminderNotFound(reminder.id));
        }

        log::info!("updated reminder {}", reminder);
        Ok(())
    }

    async fn set_reminder_status(&self, id: i64, status: ReminderStatus) -> Result<(), BotError> {
        let result =
            sqlx::query("UPDATE reminders SET status = $1, modified_at = $2 WHERE id = $3")
                .bind(status.as_str())
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(BotError::ReminderNotFound(id));
        }

        log::info!("set reminder {} status to {}", id, status.as_str());
        Ok(())
    }

    async fn delay_reminder(&self, id: i64, remind_at: DateTime<Utc>) -> Result<(), BotError> {
        let result = sqlx::query(
            r#"
            UPDATE reminders
            SET remind_at = $1, attempts_left = $2, status = $3, modified_at = $4
            WHERE id = $5
            "#,
        )
        .bind(remind_at)
        .bind(DEFAULT_ATTEMPTS_LEFT)
        .bind(ReminderStatus::Pending.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BotError::ReminderNotFound(id));
        }

        log::info!(
            "delayed reminder [ID: {}, RemindAt: {}, AttemptsLeft: {}]",
            id,
            remind_at,
            DEFAULT_ATTEMPTS_LEFT
        );
        Ok(())
    }

    async fn remove_reminder(&self, id: i64) -> Result<(), BotError> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BotError::ReminderNotFound(id));
        }

        log::info!("removed reminder {}", id);
        Ok(())
    }

    async fn get_my_reminders(&self, user_id: i64, chat_id: i64) -> Result<Vec<Reminder>, BotError> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_id, user_id, text, created_at, modified_at,
                   remind_at, status, attempts_left
            FROM reminders
            WHERE user_id = $1 AND chat_id = $2 AND status = 'pending'
            ORDER BY remind_at
            "#,
        )
        .bind(user_id)
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        log::debug!("got {} reminders for user {}", rows.len(), user_id);
        rows.iter().map(map_reminder).collect()
    }

    async fn get_pending_reminders(&self, limit: i64) -> Result<Vec<Reminder>, BotError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.chat_id, r.user_id, r.text, r.created_at, r.modified_at,
                   r.remind_at, r.status, r.attempts_left
            FROM reminders r
            JOIN users u ON r.user_id = u.id
            WHERE r.status = 'pending'
              AND r.remind_at < $1
              AND r.attempts_left > 0
              AND u.status = 'active'
            ORDER BY r.remind_at
            LIMIT $2
            "#,
        )
        .bind(Utc::now())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        log::debug!("got {} pending reminders", rows.len());
        rows.iter().map(map_reminder).collect()
    }
}

fn map_reminder(row: &PgRow) -> Result<Reminder, BotError> {
    let status: String = row.get("status");
    let status = status
        .parse::<ReminderStatus>()
        .map_err(|e| BotError::Storage(sqlx::Error::Decode(e.into())))?;

    Ok(Reminder {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        user_id: row.get("user_id"),
        text: row.get("text"),
        created_at: row.get("created_at"),
        modified_at: row.get("modified_at"),
        remind_at: row.get("remind_at"),
        status,
        attempts_left: row.get("attempts_left"),
    })
}

fn map_user_state(row: &PgRow) -> Result<UserState, BotError> {
    let name: String = row.get("name");
    let name = name
        .parse::<StateName>()
        .map_err(|e| BotError::Storage(sqlx::Error::Decode(e.into())))?;

    let context: Option<serde_json::Value> = row.get("context");
    let context: Option<StateContext> = context.map(serde_json::from_value).transpose()?;

    Ok(UserState {
        user_id: row.get("user_id"),
        name,
        modified_at: row.get("modified_at"),
        context,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
