//! Discord webhook notification manager
//!
//! Sends notifications to Discord via webhooks for backup events.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

use crate::config::{NotificationConfig, NotifyEvent};

/// Notification manager for sending Discord webhooks
pub struct NotificationManager {
    config: NotificationConfig,
    cache_path: PathBuf,
}

/// Discord embed color codes (decimal)
#[derive(Debug, Clone, Copy)]
pub enum NotificationColor {
    /// Red - for failures
    Failure = 15158332, // #E74C3C
    /// Orange - for warnings
    Warning = 15105570, // #E67E22
    /// Green - for success
    Success = 3066993, // #2ECC71
}

impl NotificationColor {
    fn as_decimal(&self) -> u32 {
        *self as u32
    }
}

/// Notification payload to send
#[derive(Debug, Clone)]
pub struct Notification {
    pub event_type: NotifyEvent,
    pub database: String,
    pub message: String,
    pub error: Option<String>,
    pub duration_secs: Option<u64>,
}

/// Discord webhook payload
#[derive(Debug, Serialize)]
struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordField>,
}

#[derive(Debug, Serialize)]
struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

/// Rate limit cache entry
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// Unix timestamp of last notification
    last_sent: u64,
}

/// Rate limit cache
#[derive(Debug, Serialize, Deserialize, Default)]
struct NotificationCache {
    /// Map of cache key to entry
    entries: HashMap<String, CacheEntry>,
}

impl NotificationManager {
    /// Create a new notification manager
    pub fn new(config: NotificationConfig) -> Self {
        let cache_path = config.cache_file.clone();
        Self { config, cache_path }
    }

    /// Check if notifications are enabled for an event type
    pub fn is_enabled(&self, event: &NotifyEvent) -> bool {
        if self.config.webhook_url.is_empty() {
            return false;
        }
        self.config.notify_on.contains(event)
    }

    /// Send a notification if enabled and not rate-limited
    pub fn send(&self, notification: Notification) -> Result<()> {
        if !self.is_enabled(&notification.event_type) {
            debug!(
                "Notification type {:?} not enabled, skipping",
                notification.event_type
            );
            return Ok(());
        }

        let cache_key = format!("{}:{:?}", notification.database, notification.event_type);

        if self.is_rate_limited(&cache_key)? {
            debug!("Notification rate-limited for key: {}", cache_key);
            return Ok(());
        }

        let payload = self.build_payload(&notification);
        self.send_webhook(&payload)?;

        self.update_cache(&cache_key)?;

        info!(
            "Sent {:?} notification for database '{}'",
            notification.event_type, notification.database
        );

        Ok(())
    }

    /// Send a failure notification
    pub fn send_failure(
        &self,
        database: &str,
        error: &str,
        duration_secs: Option<u64>,
    ) -> Result<()> {
        self.send(Notification {
            event_type: NotifyEvent::Failure,
            database: database.to_string(),
            message: format!("Backup failed for database '{}'", database),
            error: Some(error.to_string()),
            duration_secs,
        })
    }

    /// Send a warning notification
    pub fn send_warning(&self, database: &str, message: &str) -> Result<()> {
        self.send(Notification {
            event_type: NotifyEvent::Warning,
            database: database.to_string(),
            message: message.to_string(),
            error: None,
            duration_secs: None,
        })
    }

    /// Send a success notification
    pub fn send_success(&self, database: &str, duration_secs: u64) -> Result<()> {
        self.send(Notification {
            event_type: NotifyEvent::Success,
            database: database.to_string(),
            message: format!("Backup completed successfully for database '{}'", database),
            error: None,
            duration_secs: Some(duration_secs),
        })
    }

    /// Build Discord webhook payload
    fn build_payload(&self, notification: &Notification) -> DiscordPayload {
        let (color, emoji) = match notification.event_type {
            NotifyEvent::Failure => (NotificationColor::Failure, "\u{274C}"), // Red X
            NotifyEvent::Warning => (NotificationColor::Warning, "\u{26A0}\u{FE0F}"), // Warning
            NotifyEvent::Success => (NotificationColor::Success, "\u{2705}"), // Green check
        };

        let title = format!("{} Pgbackup Manager: {:?}", emoji, notification.event_type);

        let mut fields = vec![DiscordField {
            name: "Database".to_string(),
            value: notification.database.clone(),
            inline: true,
        }];

        if let Some(duration) = notification.duration_secs {
            fields.push(DiscordField {
                name: "Duration".to_string(),
                value: format_duration(duration),
                inline: true,
            });
        }

        if let Some(ref error) = notification.error {
            // Truncate error message if too long
            let error_display = if error.len() > 500 {
                format!("{}...", &error[..497])
            } else {
                error.clone()
            };
            fields.push(DiscordField {
                name: "Error".to_string(),
                value: format!("```\n{}\n```", error_display),
                inline: false,
            });
        }

        let embed = DiscordEmbed {
            title,
            description: Some(notification.message.clone()),
            color: color.as_decimal(),
            fields,
        };

        DiscordPayload {
            username: Some("Pgbackup Manager".to_string()),
            embeds: vec![embed],
        }
    }

    /// Send webhook to Discord
    fn send_webhook(&self, payload: &DiscordPayload) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .post(&self.config.webhook_url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .context("Failed to send Discord webhook")?;

        let status = response.status();
        if status.is_success() || status.as_u16() == 204 {
            debug!("Discord webhook sent successfully");
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            error!("Discord webhook failed with status {}: {}", status, body);
            anyhow::bail!("Discord webhook failed with status {}: {}", status, body)
        }
    }

    /// Check if a notification is rate-limited
    fn is_rate_limited(&self, cache_key: &str) -> Result<bool> {
        let cache = self.load_cache()?;

        if let Some(entry) = cache.entries.get(cache_key) {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();

            let rate_limit_secs = self.config.rate_limit_minutes * 60;

            if now.saturating_sub(entry.last_sent) < rate_limit_secs {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Update the rate limit cache
    fn update_cache(&self, cache_key: &str) -> Result<()> {
        let mut cache = self.load_cache()?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        cache
            .entries
            .insert(cache_key.to_string(), CacheEntry { last_sent: now });

        // Clean up old entries (older than 24 hours)
        let cutoff = now.saturating_sub(86400);
        cache.entries.retain(|_, v| v.last_sent > cutoff);

        self.save_cache(&cache)?;
        Ok(())
    }

    /// Load the notification cache from disk
    fn load_cache(&self) -> Result<NotificationCache> {
        if !self.cache_path.exists() {
            return Ok(NotificationCache::default());
        }

        let content =
            fs::read_to_string(&self.cache_path).context("Failed to read notification cache")?;

        serde_json::from_str(&content).context("Failed to parse notification cache")
    }

    /// Save the notification cache to disk
    fn save_cache(&self, cache: &NotificationCache) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.cache_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content =
            serde_json::to_string_pretty(cache).context("Failed to serialize notification cache")?;

        fs::write(&self.cache_path, content).context("Failed to write notification cache")?;

        Ok(())
    }
}

/// Format duration in human-readable form
fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        let secs = seconds % 60;
        if secs == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, secs)
        }
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(45), "45s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(120), "2m");
        assert_eq!(format_duration(125), "2m 5s");
    }

    #[test]
    fn test_format_duration_hours() {
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(3720), "1h 2m");
        assert_eq!(format_duration(7320), "2h 2m");
    }

    #[test]
    fn test_disabled_without_webhook_url() {
        let manager = NotificationManager::new(NotificationConfig::default());
        assert!(!manager.is_enabled(&NotifyEvent::Failure));
    }

    #[test]
    fn test_event_filter() {
        let config = NotificationConfig {
            webhook_url: "https://discord.example/webhook".to_string(),
            notify_on: vec![NotifyEvent::Failure],
            ..Default::default()
        };
        let manager = NotificationManager::new(config);
        assert!(manager.is_enabled(&NotifyEvent::Failure));
        assert!(!manager.is_enabled(&NotifyEvent::Success));
    }

    #[test]
    fn test_disabled_event_is_a_noop_send() {
        // No webhook configured: send returns Ok without any HTTP traffic.
        let manager = NotificationManager::new(NotificationConfig::default());
        let result = manager.send_failure("app", "boom", Some(12));
        assert!(result.is_ok());
    }
}
