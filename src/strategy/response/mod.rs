// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod message_count;
mod timer;

pub use message_count::MessageCountResponseWaitStrategy;
pub use timer::TimerBasedResponseWaitStrategy;

use crate::config::consts::{
    DEFAULT_RESPONSE_WAIT_STRATEGY, WAIT_STRATEGY_NAME_SETTING, WAIT_STRATEGY_SETTINGS_PREFIX,
};
use crate::config::ComponentSettings;
use crate::errors::ConfigurationError;
use crate::traits::DelayedResponseWaitStrategy;

/// Build and initialize the response wait strategy named by a component's
/// `waitStrategy.name` setting, defaulting to `messageCount`.
pub fn wait_strategy_for_settings(
    component_id: &str,
    settings: &ComponentSettings,
) -> Result<Box<dyn DelayedResponseWaitStrategy>, ConfigurationError> {
    let name = settings
        .get_str(WAIT_STRATEGY_NAME_SETTING)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_RESPONSE_WAIT_STRATEGY);

    let mut strategy: Box<dyn DelayedResponseWaitStrategy> =
        if name.eq_ignore_ascii_case(MessageCountResponseWaitStrategy::NAME) {
            Box::new(MessageCountResponseWaitStrategy::new())
        } else if name.eq_ignore_ascii_case(TimerBasedResponseWaitStrategy::NAME) {
            Box::new(TimerBasedResponseWaitStrategy::new())
        } else {
            return Err(ConfigurationError::UnknownWaitStrategy(name.to_string()));
        };

    strategy
        .initialize(&settings.with_prefix(WAIT_STRATEGY_SETTINGS_PREFIX))
        .map_err(|e| match e {
            ConfigurationError::InvalidSetting { setting, reason, .. } => {
                ConfigurationError::InvalidSetting {
                    component_id: component_id.to_string(),
                    setting: format!("{}{}", WAIT_STRATEGY_SETTINGS_PREFIX, setting),
                    reason,
                }
            }
            other => other,
        })?;
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::delayed_response_channel;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_default_is_message_count() {
        let strategy = wait_strategy_for_settings("agg", &ComponentSettings::new()).unwrap();
        assert_eq!(strategy.name(), "messageCount");
    }

    #[test]
    fn test_timer_selected_by_name() {
        let mut settings = ComponentSettings::new();
        settings.insert("waitStrategy.name", "TIMER");
        settings.insert("waitStrategy.cfg.waitTime", 250);
        let strategy = wait_strategy_for_settings("agg", &settings).unwrap();
        assert_eq!(strategy.name(), "timer");
    }

    #[test]
    fn test_unknown_strategy_is_configuration_error() {
        let mut settings = ComponentSettings::new();
        settings.insert("waitStrategy.name", "whenever");
        let result = wait_strategy_for_settings("agg", &settings);
        assert!(matches!(result, Err(ConfigurationError::UnknownWaitStrategy(name)) if name == "whenever"));
    }

    #[test]
    fn test_invalid_option_names_component() {
        let mut settings = ComponentSettings::new();
        settings.insert("waitStrategy.cfg.maxMessages", "many");
        match wait_strategy_for_settings("agg", &settings) {
            Err(ConfigurationError::InvalidSetting { component_id, setting, .. }) => {
                assert_eq!(component_id, "agg");
                assert_eq!(setting, "waitStrategy.cfg.maxMessages");
            }
            other => panic!("unexpected outcome: {:?}", other.map(|s| s.name())),
        }
    }

    #[test]
    fn test_message_count_reads_max_messages() {
        let mut settings = ComponentSettings::new();
        settings.insert("maxMessages", 7);
        let mut strategy = MessageCountResponseWaitStrategy::new();
        strategy.initialize(&settings).unwrap();
        assert_eq!(strategy.max_messages(), 7);
    }

    #[tokio::test]
    async fn test_message_count_requests_flush_at_threshold() {
        let shutdown = CancellationToken::new();
        let (notifier, collector) = delayed_response_channel(shutdown.clone());
        let mut strategy = MessageCountResponseWaitStrategy::with_max_messages(3);
        strategy.set_delayed_response_collector(collector);
        let task = tokio::spawn(async move { strategy.run().await });

        notifier.on_message();
        notifier.on_message();
        let early = tokio::time::timeout(Duration::from_millis(50), notifier.flush_requested()).await;
        assert!(early.is_err(), "flushed before threshold");

        notifier.on_message();
        tokio::time::timeout(Duration::from_secs(1), notifier.flush_requested())
            .await
            .expect("no flush at threshold");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_timer_skips_empty_windows() {
        let shutdown = CancellationToken::new();
        let (notifier, collector) = delayed_response_channel(shutdown.clone());
        let mut strategy = TimerBasedResponseWaitStrategy::with_wait_time(Duration::from_millis(20));
        strategy.set_delayed_response_collector(collector);
        let task = tokio::spawn(async move { strategy.run().await });

        let idle = tokio::time::timeout(Duration::from_millis(80), notifier.flush_requested()).await;
        assert!(idle.is_err(), "flushed an empty window");

        notifier.on_message();
        tokio::time::timeout(Duration::from_secs(1), notifier.flush_requested())
            .await
            .expect("no flush after wait time");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_without_collector_returns() {
        let mut strategy = MessageCountResponseWaitStrategy::new();
        tokio::time::timeout(Duration::from_millis(100), strategy.run())
            .await
            .unwrap();
    }
}
