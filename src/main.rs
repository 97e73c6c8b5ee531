use std::sync::Arc;

use anyhow::Context;

use studybuddy::delivery::{MailApiNotifier, Notifier, TelegramNotifier};
use studybuddy::scheduling::ReminderScheduler;
use studybuddy::settings::{NotifierChannel, NotifierSettings, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = Settings::load().context("failed to load settings")?;
    let config = settings.scheduler.to_config()?;
    let notifier = build_notifier(&settings.notifier)?;

    let scheduler = Arc::new(ReminderScheduler::new(config, notifier));
    scheduler.start();
    log::info!("Reminder scheduler is running; waiting for shutdown signal");

    tokio::signal::ctrl_c().await?;

    let unfired = scheduler.stop().await;
    if unfired.is_empty() {
        log::info!("Shut down with no pending reminders");
    } else {
        log::warn!("Shut down with {} reminders that never fired", unfired.len());
    }

    Ok(())
}

fn build_notifier(settings: &NotifierSettings) -> anyhow::Result<Arc<dyn Notifier>> {
    match settings.channel {
        NotifierChannel::Mail => {
            let mail = settings
                .mail
                .as_ref()
                .context("notifier.mail settings are required for the mail channel")?;
            Ok(Arc::new(MailApiNotifier::new(mail)?))
        }
        NotifierChannel::Telegram => {
            let telegram = settings
                .telegram
                .as_ref()
                .context("notifier.telegram settings are required for the telegram channel")?;
            Ok(Arc::new(TelegramNotifier::new(telegram.token.clone())))
        }
    }
}
