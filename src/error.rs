use thiserror::Error;

/// Общая ошибка бота. Локально восстановимые варианты (`Parse`, `UserAlreadyExists`,
/// `ReminderNotFound`) обрабатываются на месте дружелюбным сообщением пользователю,
/// остальные поднимаются наверх и логируются.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("пользователь {0} уже зарегистрирован")]
    UserAlreadyExists(i64),

    #[error("пользователь {0} не найден")]
    UserNotFound(i64),

    #[error("напоминание {0} не найдено")]
    ReminderNotFound(i64),

    #[error("состояние диалога пользователя {0} не найдено")]
    StateNotFound(i64),

    #[error("не удалось распознать дату/время: {0:?}")]
    Parse(String),

    #[error("недопустимое состояние диалога: ожидалось {expected}, найдено {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    #[error("действие не поддерживается: {0}")]
    Unsupported(&'static str),

    #[error("ошибка хранилища: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("ошибка сериализации контекста: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ошибка доставки сообщения: {0}")]
    Transport(String),
}

impl From<teloxide::RequestError> for BotError {
    fn from(err: teloxide::RequestError) -> Self {
        BotError::Transport(err.to_string())
    }
}
