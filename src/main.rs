use std::env;
use std::sync::Arc;
use std::time::Duration;

use teloxide::{prelude::*, utils::command::BotCommands};
use tokio::sync::watch;

mod bot;
mod database;
mod error;
mod handlers;
mod models;
mod notifier;
mod reminders;
mod sender;
#[cfg(test)]
mod testutil;
mod timeparse;

use crate::bot::ReminderBot;
use crate::database::{Database, Storage};
use crate::handlers::{callback_handler, command_handler, message_handler};
use crate::notifier::Notifier;
use crate::sender::{ResponseSender, TelegramSender};

#[derive(BotCommands, Clone, Copy, Debug)]
#[command(rename_rule = "snake_case", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "справка")]
    Help,
    #[command(description = "создать напоминание")]
    CreateReminder,
    #[command(description = "мои напоминания")]
    MyReminders,
    #[command(description = "включить напоминания")]
    EnableReminders,
    #[command(description = "выключить напоминания")]
    DisableReminders,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Загружаем .env и инициализируем логирование
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting reminder bot...");

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = Database::new(&database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let notifier_interval = env::var("NOTIFIER_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    let tg = Bot::from_env();
    tg.set_my_commands(Command::bot_commands()).await?;

    let store: Arc<dyn Storage> = Arc::new(db);
    let tg_sender: Arc<dyn ResponseSender> = Arc::new(TelegramSender::new(tg.clone()));
    let app = ReminderBot::new(store.clone(), tg_sender.clone());

    // Фоновая доставка напоминаний
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let notifier = Notifier::new(store, tg_sender, Duration::from_secs(notifier_interval));
    let notifier_task = tokio::spawn(notifier.run(shutdown_rx));

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(tg, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // диспетчер остановлен; даём планировщику дожить текущий тик
    let _ = shutdown_tx.send(true);
    let _ = notifier_task.await;
    log::info!("Reminder bot stopped");

    Ok(())
}
