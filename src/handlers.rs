//! Тонкие обработчики teloxide: разворачивают телеграмный Update в доменные
//! структуры и передают их машине состояний. Ошибки логируются здесь же,
//! чтобы диспетчер продолжал обрабатывать следующие апдейты.

use std::error::Error;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::User as TelegramUser;

use crate::bot::ReminderBot;
use crate::models::{CallbackClick, IncomingMessage};
use crate::Command;

/// Зависший апдейт не должен блокировать остальных пользователей.
const HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

pub async fn command_handler(
    msg: Message,
    cmd: Command,
    app: ReminderBot,
) -> HandlerResult {
    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    log::info!("command update: {incoming}");
    match tokio::time::timeout(HANDLER_TIMEOUT, app.on_command(&incoming, cmd)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::error!("command failed for {incoming}: {err}"),
        Err(_) => log::error!("command timed out for {incoming}"),
    }

    Ok(())
}

pub async fn message_handler(msg: Message, app: ReminderBot) -> HandlerResult {
    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    log::info!("message update: {incoming}");
    match tokio::time::timeout(HANDLER_TIMEOUT, app.on_text(&incoming)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::error!("message failed for {incoming}: {err}"),
        Err(_) => log::error!("message timed out for {incoming}"),
    }

    Ok(())
}

pub async fn callback_handler(bot: Bot, q: CallbackQuery, app: ReminderBot) -> HandlerResult {
    // убираем "часики" на кнопке независимо от исхода
    if let Err(err) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("failed to answer callback query {}: {err}", q.id);
    }

    let (Some(data), Some(message)) = (q.data, q.message) else {
        return Ok(());
    };

    let click = CallbackClick {
        chat_id: message.chat().id.0,
        user_id: q.from.id.0 as i64,
        user_name: display_name(&q.from),
        data,
    };

    log::info!("callback update: {click}");
    match tokio::time::timeout(HANDLER_TIMEOUT, app.on_callback(&click)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::error!("callback failed for {click}: {err}"),
        Err(_) => log::error!("callback timed out for {click}"),
    }

    Ok(())
}

fn to_incoming(msg: &Message) -> Option<IncomingMessage> {
    let from = msg.from.as_ref()?;
    let text = msg.text()?;

    Some(IncomingMessage {
        chat_id: msg.chat.id.0,
        user_id: from.id.0 as i64,
        user_name: display_name(from),
        text: text.to_string(),
    })
}

fn display_name(user: &TelegramUser) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}
