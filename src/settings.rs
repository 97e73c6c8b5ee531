use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::scheduling::{PastDuePolicy, SchedulerConfig};

#[derive(Deserialize, Debug)]
pub struct TelegramSettings {
    pub token: String,
}

#[derive(Deserialize, Debug)]
pub struct MailSettings {
    pub endpoint: String,
    pub api_key: String,
    pub from: String,
    #[serde(default = "default_mail_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierChannel {
    Mail,
    Telegram,
}

#[derive(Deserialize, Debug)]
pub struct NotifierSettings {
    pub channel: NotifierChannel,
    pub mail: Option<MailSettings>,
    pub telegram: Option<TelegramSettings>,
}

#[derive(Deserialize, Debug)]
pub struct SchedulerSettings {
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: i64,
    /// IANA timezone name the stored event wall times are interpreted in.
    #[serde(default = "default_event_timezone")]
    pub event_timezone: String,
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    #[serde(default)]
    pub past_due: PastDuePolicy,
}

impl SchedulerSettings {
    pub fn to_config(&self) -> anyhow::Result<SchedulerConfig> {
        let event_timezone = self
            .event_timezone
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid scheduler.event_timezone: {err}"))?;

        Ok(SchedulerConfig {
            lead: chrono::TimeDelta::minutes(self.lead_minutes),
            event_timezone,
            past_due: self.past_due,
            delivery_timeout: std::time::Duration::from_secs(self.delivery_timeout_secs),
        })
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            lead_minutes: default_lead_minutes(),
            event_timezone: default_event_timezone(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            past_due: PastDuePolicy::default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Settings {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    pub notifier: NotifierSettings,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_lead_minutes() -> i64 {
    15
}

fn default_event_timezone() -> String {
    "Africa/Johannesburg".to_owned()
}

fn default_delivery_timeout_secs() -> u64 {
    15
}

fn default_mail_timeout_secs() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_settings_fill_in_defaults() {
        let settings: SchedulerSettings = serde_json::from_str("{}").unwrap();

        assert_eq!(settings.lead_minutes, 15);
        assert_eq!(settings.past_due, PastDuePolicy::FireImmediately);

        let config = settings.to_config().unwrap();
        assert_eq!(config.event_timezone, chrono_tz::Africa::Johannesburg);
        assert_eq!(config.lead, chrono::TimeDelta::minutes(15));
    }

    #[test]
    fn past_due_policy_parses_from_snake_case() {
        let settings: SchedulerSettings =
            serde_json::from_str(r#"{"past_due": "drop"}"#).unwrap();
        assert_eq!(settings.past_due, PastDuePolicy::Drop);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let settings = SchedulerSettings {
            event_timezone: "Mars/Olympus_Mons".to_owned(),
            ..SchedulerSettings::default()
        };

        assert!(settings.to_config().is_err());
    }
}
