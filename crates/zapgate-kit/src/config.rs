//! Configuration for the paywall engines.
//!
//! Every engine receives its slice of [`ZapGateConfig`] at construction;
//! nothing reads the environment except the binary that builds the config.

use std::time::Duration as StdDuration;

use bon::Builder;
use chrono::Duration;
use url::Url;
use zapgate_core::types::Sats;

/// Connection settings for the LNbits-compatible payment processor.
#[derive(Builder, Debug, Clone)]
pub struct ProcessorConfig {
    /// Base URL of the processor API.
    pub base_url: Url,
    /// Invoice read key, sent as `X-Api-Key` on every call.
    #[builder(into)]
    pub api_key: String,
    /// Per-call timeout. A timed-out call is a failure, never "not yet paid".
    #[builder(default = StdDuration::from_secs(10))]
    pub timeout: StdDuration,
}

/// The two fixed price tiers.
#[derive(Builder, Debug, Clone, Copy)]
pub struct PricingConfig {
    #[builder(default = Sats(1))]
    pub article_amount: Sats,
    #[builder(default = Sats(10))]
    pub premium_amount: Sats,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig::builder().build()
    }
}

/// Session credential settings.
#[derive(Builder, Debug, Clone)]
pub struct SessionConfig {
    /// HMAC secret for signing session tokens.
    #[builder(into)]
    pub secret: String,
    #[builder(default = Duration::hours(1))]
    pub ttl: Duration,
}

/// Everything the engines need, gathered in one place.
#[derive(Builder, Debug, Clone)]
pub struct ZapGateConfig {
    pub processor: ProcessorConfig,
    /// Public base URL of this service; LNURL challenge callbacks embed it.
    pub public_url: Url,
    pub session: SessionConfig,
    #[builder(default)]
    pub pricing: PricingConfig,
    /// Pending challenges and polling withdraw correlations older than this
    /// are swept.
    #[builder(default = Duration::minutes(5))]
    pub challenge_ttl: Duration,
    /// No-questions-asked refund window after a premium purchase.
    #[builder(default = Duration::hours(24))]
    pub refund_window: Duration,
    /// Length of a purchased premium window.
    #[builder(default = Duration::days(30))]
    pub premium_period: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_tiers() {
        let config = ZapGateConfig::builder()
            .processor(
                ProcessorConfig::builder()
                    .base_url(Url::parse("https://demo.lnbits.com").unwrap())
                    .api_key("key")
                    .build(),
            )
            .public_url(Url::parse("https://pay.example.com").unwrap())
            .session(SessionConfig::builder().secret("secret").build())
            .build();

        assert_eq!(config.pricing.article_amount, Sats(1));
        assert_eq!(config.pricing.premium_amount, Sats(10));
        assert_eq!(config.refund_window, Duration::hours(24));
        assert_eq!(config.premium_period, Duration::days(30));
        assert_eq!(config.challenge_ttl, Duration::minutes(5));
        assert_eq!(config.session.ttl, Duration::hours(1));
    }
}
