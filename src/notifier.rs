//! Фоновая доставка напоминаний.
//!
//! Каждый тик забирает из хранилища просроченные pending-напоминания,
//! отправляет уведомление с кнопками и переносит срабатывание вперёд на
//! льготный интервал, списывая одну попытку. Нажатие "Готово" до следующего
//! срабатывания останавливает повторы; исчерпание попыток переводит
//! напоминание в attempts_exhausted.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::database::Storage;
use crate::models::ReminderStatus;
use crate::sender::{BotResponse, Keyboard, ResponseSender};

/// Пауза перед повторной попыткой: время на то, чтобы нажать "Готово".
pub const GRACE_PERIOD_MINUTES: i64 = 15;

/// Максимум напоминаний за один тик.
const BATCH_LIMIT: i64 = 100;

pub struct Notifier {
    store: Arc<dyn Storage>,
    sender: Arc<dyn ResponseSender>,
    interval: Duration,
    clock: fn() -> DateTime<Utc>,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn Storage>,
        sender: Arc<dyn ResponseSender>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            sender,
            interval,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Крутится до сигнала остановки. Начатый тик дорабатывает до конца:
    /// select проверяет сигнал только между тиками.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::info!("notifier started, tick interval {:?}", self.interval);

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    log::info!("notifier stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Один проход. Ошибки отдельных напоминаний логируются и не
    /// прерывают остальную пачку.
    pub(crate) async fn tick(&self) {
        let due = match self.store.get_pending_reminders(BATCH_LIMIT).await {
            Ok(due) => due,
            Err(err) => {
                log::error!("failed to fetch due reminders: {err}");
                return;
            }
        };

        if due.is_empty() {
            return;
        }
        log::debug!("processing {} due reminders", due.len());

        for mut reminder in due {
            let response = BotResponse::new(reminder.chat_id, reminder.format_notification())
                .with_keyboard(Keyboard::ReminderActions {
                    reminder_id: reminder.id,
                });

            match self.sender.send(response).await {
                Ok(()) => log::info!(
                    "sent reminder {} to user {} in chat {}",
                    reminder.id,
                    reminder.user_id,
                    reminder.chat_id
                ),
                // попытка списывается и при неудачной доставке,
                // иначе мёртвый чат будет опрашиваться вечно
                Err(err) => log::error!("failed to send reminder {}: {err}", reminder.id),
            }

            reminder.remind_at = (self.clock)() + chrono::Duration::minutes(GRACE_PERIOD_MINUTES);
            reminder.attempts_left -= 1;
            if reminder.attempts_left <= 0 {
                reminder.attempts_left = 0;
                reminder.status = ReminderStatus::AttemptsExhausted;
                log::warn!("reminder {} ran out of attempts", reminder.id);
            }

            if let Err(err) = self.store.update_reminder(&reminder).await {
                log::error!("failed to update reminder {}: {err}", reminder.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::TimeZone;

    use crate::database::Storage;
    use crate::models::UserStatus;
    use crate::testutil::{active_user, pending_reminder, MemorySender, MemoryStorage};

    use super::*;

    const CHAT_ID: i64 = 100;
    const USER_ID: i64 = 1;

    fn fixture() -> (Arc<MemoryStorage>, Arc<MemorySender>, Notifier) {
        let store = Arc::new(MemoryStorage::default());
        let sender = Arc::new(MemorySender::default());
        let notifier = Notifier::new(store.clone(), sender.clone(), Duration::from_secs(60))
            .with_clock(|| Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        (store, sender, notifier)
    }

    async fn seed_due_reminder(store: &MemoryStorage, attempts_left: i16) -> i64 {
        store.save_user(&active_user(USER_ID)).await.unwrap();
        let mut r = pending_reminder(
            USER_ID,
            CHAT_ID,
            Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap(),
        );
        r.attempts_left = attempts_left;
        store.save_reminder(&r).await.unwrap()
    }

    #[tokio::test]
    async fn tick_delivers_and_reschedules_with_grace_period() {
        let (store, sender, notifier) = fixture();
        let id = seed_due_reminder(&store, 3).await;

        notifier.tick().await;

        let last = sender.last().unwrap();
        assert_eq!(last.chat_id, CHAT_ID);
        assert!(last.text.contains("НАПОМИНАНИЕ"));
        assert_eq!(last.keyboard, Some(Keyboard::ReminderActions { reminder_id: id }));

        let updated = store.reminder_by_id(id).unwrap();
        assert_eq!(
            updated.remind_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 15, 0).unwrap()
        );
        assert_eq!(updated.attempts_left, 2);
        assert_eq!(updated.status, ReminderStatus::Pending);
    }

    #[tokio::test]
    async fn last_attempt_exhausts_reminder() {
        let (store, sender, notifier) = fixture();
        let id = seed_due_reminder(&store, 1).await;

        notifier.tick().await;

        assert_eq!(sender.count(), 1);
        let updated = store.reminder_by_id(id).unwrap();
        assert_eq!(updated.attempts_left, 0);
        assert_eq!(updated.status, ReminderStatus::AttemptsExhausted);
    }

    #[tokio::test]
    async fn delivery_failure_still_consumes_attempt() {
        let (store, sender, notifier) = fixture();
        let id = seed_due_reminder(&store, 3).await;
        sender.fail.store(true, Ordering::SeqCst);

        notifier.tick().await;

        let updated = store.reminder_by_id(id).unwrap();
        assert_eq!(updated.attempts_left, 2);
        assert_eq!(
            updated.remind_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 15, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn update_failure_does_not_stop_the_batch() {
        let (store, sender, notifier) = fixture();
        let first = seed_due_reminder(&store, 3).await;

        let mut second = pending_reminder(
            USER_ID,
            CHAT_ID,
            Utc.with_ymd_and_hms(2024, 1, 1, 11, 30, 0).unwrap(),
        );
        second.attempts_left = 3;
        let second = store.save_reminder(&second).await.unwrap();

        store.fail_update_ids.lock().unwrap().insert(first);

        notifier.tick().await;

        // обе доставки состоялись, учёт попыток сломался только у первого
        assert_eq!(sender.count(), 2);
        assert_eq!(store.reminder_by_id(first).unwrap().attempts_left, 3);
        assert_eq!(store.reminder_by_id(second).unwrap().attempts_left, 2);
    }

    #[tokio::test]
    async fn disabled_user_gets_no_notifications() {
        let (store, sender, notifier) = fixture();
        seed_due_reminder(&store, 3).await;
        store
            .set_user_status(USER_ID, UserStatus::Inactive)
            .await
            .unwrap();

        notifier.tick().await;

        assert_eq!(sender.count(), 0);
    }

    #[tokio::test]
    async fn future_reminder_is_left_alone() {
        let (store, sender, notifier) = fixture();
        store.save_user(&active_user(USER_ID)).await.unwrap();
        let r = pending_reminder(
            USER_ID,
            CHAT_ID,
            Utc::now() + chrono::Duration::hours(1),
        );
        let id = store.save_reminder(&r).await.unwrap();

        notifier.tick().await;

        assert_eq!(sender.count(), 0);
        assert_eq!(
            store.reminder_by_id(id).unwrap().attempts_left,
            crate::models::DEFAULT_ATTEMPTS_LEFT
        );
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let (_store, _sender, notifier) = fixture();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(notifier.run(rx));
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("notifier did not stop")
            .unwrap();
    }
}
