use crate::error::BotError;
use crate::models::{
    escape_markdown_v2, IncomingMessage, StateName, User, UserState, UserStatus,
};
use crate::sender::{BotResponse, Keyboard};

use super::ReminderBot;

impl ReminderBot {
    pub(super) async fn on_start_command(&self, msg: &IncomingMessage) -> Result<(), BotError> {
        let now = self.now();
        let user = User {
            id: msg.user_id,
            name: msg.user_name.clone(),
            status: UserStatus::Active,
            created_at: now,
            modified_at: now,
        };

        let already_registered = match self.store.save_user(&user).await {
            Ok(()) => false,
            Err(BotError::UserAlreadyExists(_)) => true,
            Err(err) => return Err(err),
        };

        self.set_state(UserState::new(msg.user_id, StateName::Start))
            .await?;

        let name = escape_markdown_v2(&user.name);
        let text = if already_registered {
            format!("@{name}, ранее мы уже начали общение, предлагаю продолжить 👋")
        } else {
            format!(
                "*Привет,* @{name} 👋\n\nТеперь вы можете со мной работать\\.\nДля справки 💁 используйте команду /help\\."
            )
        };

        self.send(BotResponse::new(msg.chat_id, text)).await
    }

    pub(super) async fn on_help_command(&self, msg: &IncomingMessage) -> Result<(), BotError> {
        self.set_state(UserState::new(msg.user_id, StateName::Help))
            .await?;

        let help = "*Список доступных команд*\n\
            • /help — справка 💁\n\
            • /start — начать работу с ботом ▶️\n\
            • /create\\_reminder — создать напоминание 📝\n\
            • /enable\\_reminders — включить напоминания 🔔\n\
            • /disable\\_reminders — выключить напоминания 🔕\n\
            • /my\\_reminders — мои напоминания 🗒";

        self.send(BotResponse::new(msg.chat_id, help)).await
    }

    pub(super) async fn on_create_reminder_command(
        &self,
        msg: &IncomingMessage,
    ) -> Result<(), BotError> {
        self.set_state(UserState::new(msg.user_id, StateName::CreateReminder))
            .await?;

        self.send(BotResponse::new(msg.chat_id, "О чём напомнить❓"))
            .await
    }

    pub(super) async fn on_my_reminders_command(
        &self,
        msg: &IncomingMessage,
    ) -> Result<(), BotError> {
        let reminders = self.reminders.list(msg.user_id, msg.chat_id).await?;

        self.set_state(UserState::new(msg.user_id, StateName::MyReminders))
            .await?;

        if reminders.is_empty() {
            return self
                .send(BotResponse::new(
                    msg.chat_id,
                    "*У вас нет напоминаний* 😞\n\nЧтобы добавить напоминание, используйте команду /create\\_reminder\\.",
                ))
                .await;
        }

        let now = self.now();
        let mut text = String::from("*СПИСОК НАПОМИНАНИЙ*\n\n");
        for reminder in &reminders {
            text.push_str(&reminder.format_list_entry(now));
            text.push_str("\n\n");
        }

        self.send(
            BotResponse::new(msg.chat_id, text).with_keyboard(Keyboard::ReminderListActions),
        )
        .await
    }

    pub(super) async fn on_enable_reminders_command(
        &self,
        msg: &IncomingMessage,
    ) -> Result<(), BotError> {
        self.toggle_reminders(msg, UserStatus::Active).await
    }

    pub(super) async fn on_disable_reminders_command(
        &self,
        msg: &IncomingMessage,
    ) -> Result<(), BotError> {
        self.toggle_reminders(msg, UserStatus::Inactive).await
    }

    async fn toggle_reminders(
        &self,
        msg: &IncomingMessage,
        status: UserStatus,
    ) -> Result<(), BotError> {
        match self.store.set_user_status(msg.user_id, status).await {
            Ok(()) => {}
            Err(BotError::UserNotFound(_)) => {
                return self
                    .send(BotResponse::new(
                        msg.chat_id,
                        "Мы ещё не знакомы 🤔 Начните с команды /start\\.",
                    ))
                    .await;
            }
            Err(err) => return Err(err),
        }

        let (state, text) = match status {
            UserStatus::Active => (
                StateName::EnableReminders,
                "*Уведомления включены* 🔔\n\nДля отключения уведомлений используйте команду /disable\\_reminders\\.",
            ),
            UserStatus::Inactive => (
                StateName::DisableReminders,
                "*Уведомления отключены* 🔕\n\nДля включения уведомлений воспользуйтесь командой /enable\\_reminders\\.",
            ),
        };

        self.set_state(UserState::new(msg.user_id, state)).await?;
        self.send(BotResponse::new(msg.chat_id, text)).await
    }
}
