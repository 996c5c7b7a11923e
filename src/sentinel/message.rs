//! Alert rendering for the chat sink (Telegram legacy Markdown).

use crate::sentinel::config::SentinelConfig;
use crate::sentinel::types::Alert;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

const DATE_FORMAT: &str = "%d-%m-%Y %H:%M";
const MISSING_TIME: &str = "none available";
const MISSING_TEXT: &str = "unknown";

/// Display settings for rendered alerts.
#[derive(Debug, Clone)]
pub struct MessageFormat {
    pub timezone: Tz,
    pub mint_link_base: String,
    pub creator_link_base: String,
}

impl MessageFormat {
    pub fn from_config(config: &SentinelConfig) -> anyhow::Result<Self> {
        Ok(Self {
            timezone: config.timezone()?,
            mint_link_base: config.mint_link_base.clone(),
            creator_link_base: config.creator_link_base.clone(),
        })
    }

    fn format_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.timezone).format(DATE_FORMAT).to_string()
    }
}

impl Default for MessageFormat {
    fn default() -> Self {
        let config = SentinelConfig::default();
        Self {
            timezone: chrono_tz::Europe::Warsaw,
            mint_link_base: config.mint_link_base,
            creator_link_base: config.creator_link_base,
        }
    }
}

impl Alert {
    pub fn render(&self, format: &MessageFormat) -> String {
        let oldest_tx = self
            .oldest_tx_at
            .map(|at| format.format_time(at))
            .unwrap_or_else(|| MISSING_TIME.to_string());

        let mut oldest_line = format!("*Oldest tx:* {}", oldest_tx);
        let tag = self.classification.tag();
        if !tag.is_empty() {
            oldest_line.push(' ');
            oldest_line.push_str(tag);
        }

        [
            "*new token!*".to_string(),
            String::new(),
            format!("*Name:* {}", escape_or_unknown(&self.name)),
            format!("*Symbol:* {}", escape_or_unknown(&self.symbol)),
            format!("*CA:* [{}]({}{})", self.mint, format.mint_link_base, self.mint),
            format!("*Dev:* [{}]({}{})", self.creator, format.creator_link_base, self.creator),
            format!("*Created:* {}", format.format_time(self.created_at)),
            oldest_line,
            format!("*Dev deployed:* {}", self.dev_deployed),
            format!("*Dev initial buy:* {:.2}%", self.initial_buy_percentage),
        ]
        .join("\n")
    }
}

/// Escape legacy Markdown control characters in free-form feed text.
fn escape_or_unknown(text: &str) -> String {
    if text.trim().is_empty() {
        return MISSING_TEXT.to_string();
    }
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::types::Classification;
    use chrono::TimeZone;

    fn alert() -> Alert {
        Alert {
            name: "Moon Cat".to_string(),
            symbol: "MCAT".to_string(),
            mint: "Abc".to_string(),
            creator: "Dev1".to_string(),
            // 12:00 UTC in January is 13:00 in Warsaw
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            oldest_tx_at: Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()),
            classification: Classification::Recent,
            dev_deployed: 1,
            initial_buy_percentage: 2.0,
        }
    }

    #[test]
    fn test_render_all_fields() {
        let text = alert().render(&MessageFormat::default());

        assert!(text.starts_with("*new token!*\n\n"));
        assert!(text.contains("*Name:* Moon Cat"));
        assert!(text.contains("*Symbol:* MCAT"));
        assert!(text.contains("*CA:* [Abc](https://neo.bullx.io/terminal?chainId=1399811149&address=Abc)"));
        assert!(text.contains("*Dev:* [Dev1](https://solscan.io/account/Dev1)"));
        assert!(text.contains("*Created:* 15-01-2024 13:00"));
        assert!(text.contains("*Oldest tx:* 15-01-2024 11:00 🟩"));
        assert!(text.contains("*Dev deployed:* 1"));
        assert!(text.ends_with("*Dev initial buy:* 2.00%"));
    }

    #[test]
    fn test_render_without_history() {
        let mut alert = alert();
        alert.oldest_tx_at = None;
        alert.classification = Classification::Unknown;

        let text = alert.render(&MessageFormat::default());
        assert!(text.contains("*Oldest tx:* none available\n"));
    }

    #[test]
    fn test_render_escapes_markdown_in_names() {
        let mut alert = alert();
        alert.name = "pump_it *now*".to_string();
        alert.symbol = String::new();

        let text = alert.render(&MessageFormat::default());
        assert!(text.contains("*Name:* pump\\_it \\*now\\*"));
        assert!(text.contains("*Symbol:* unknown"));
    }

    #[test]
    fn test_render_uses_configured_timezone() {
        let format = MessageFormat {
            timezone: chrono_tz::UTC,
            ..MessageFormat::default()
        };
        let text = alert().render(&format);
        assert!(text.contains("*Created:* 15-01-2024 12:00"));
    }

    #[test]
    fn test_percentage_two_decimals() {
        let mut alert = alert();
        alert.initial_buy_percentage = 3.14159;
        assert!(alert.render(&MessageFormat::default()).contains("3.14%"));
    }
}
