//! Checkout configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{CheckoutError, CheckoutResult};
use crate::types::CheckoutFlow;

/// Routes one checkout flow moves through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlowRoutes {
    /// Where the customer starts over after a hard failure.
    pub form: String,
    /// Path the processor redirects back to, and the target of the in-app handoff.
    pub return_path: String,
    /// Terminal success page.
    pub thank_you: String,
}

impl FlowRoutes {
    pub fn new(
        form: impl Into<String>,
        return_path: impl Into<String>,
        thank_you: impl Into<String>,
    ) -> Self {
        Self {
            form: form.into(),
            return_path: return_path.into(),
            thank_you: thank_you.into(),
        }
    }
}

/// Checkout configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Backend API root, without trailing slash.
    pub backend_url: String,
    /// Site origin prepended to return paths; empty leaves them relative.
    pub origin: String,
    /// Stripe publishable key (`pk_...`).
    pub publishable_key: String,
    /// Lower-case ISO currency code.
    pub currency: String,
    /// Payment method types offered for one-time gifts.
    pub payment_method_types: Vec<String>,
    /// `payment_type` sent with one-time intents.
    pub one_time_payment_type: String,
    /// Membership renewal fee in whole currency units.
    pub renewal_fee: u64,
    /// Delay between status polls.
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// Cap on status requests per landing.
    pub max_poll_attempts: u32,
    /// Delay before navigating after a polled success.
    #[serde(with = "millis")]
    pub poll_success_delay: Duration,
    /// Delay before navigating after a reconciled redirect success.
    #[serde(with = "millis")]
    pub redirect_success_delay: Duration,
    /// Where a signed-out user is sent when an action needs authentication.
    pub sign_in: String,
    pub one_time_gift: FlowRoutes,
    pub monthly_support: FlowRoutes,
    pub membership_renewal: FlowRoutes,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000/api".to_string(),
            origin: String::new(),
            publishable_key: String::new(),
            currency: "chf".to_string(),
            payment_method_types: vec!["card".into(), "twint".into(), "paypal".into()],
            one_time_payment_type: "one_time_donation".to_string(),
            renewal_fee: 50,
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 15,
            poll_success_delay: Duration::from_secs(1),
            redirect_success_delay: Duration::from_secs(2),
            sign_in: "/signin".to_string(),
            one_time_gift: FlowRoutes::new("/one-time-gift", "/payment-result", "/thank-you"),
            monthly_support: FlowRoutes::new("/monthly-support", "/monthly-support", "/thank-you"),
            membership_renewal: FlowRoutes::new(
                "/membership-renewal",
                "/cotisation-payment-result",
                "/thank-you-cotisation",
            ),
        }
    }
}

impl CheckoutConfig {
    /// Load from a JSON object; missing keys keep their defaults.
    ///
    /// `backend_url` and `origin` lose any trailing `/`, as with the builders.
    pub fn from_json(json: &str) -> CheckoutResult<Self> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| CheckoutError::Config(e.to_string()))?;
        config.backend_url = config.backend_url.trim_end_matches('/').to_string();
        config.origin = config.origin.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CheckoutResult<()> {
        if self.backend_url.trim().is_empty() {
            return Err(CheckoutError::Config("backend_url must not be empty".into()));
        }
        if self.max_poll_attempts == 0 {
            return Err(CheckoutError::Config("max_poll_attempts must be at least 1".into()));
        }
        if self.renewal_fee == 0 {
            return Err(CheckoutError::Config("renewal_fee must be positive".into()));
        }
        Ok(())
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_sign_in(mut self, route: impl Into<String>) -> Self {
        self.sign_in = route.into();
        self
    }

    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = key.into();
        self
    }

    pub fn with_poll_schedule(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub fn with_renewal_fee(mut self, fee: u64) -> Self {
        self.renewal_fee = fee;
        self
    }

    pub fn routes(&self, flow: CheckoutFlow) -> &FlowRoutes {
        match flow {
            CheckoutFlow::OneTimeGift => &self.one_time_gift,
            CheckoutFlow::MonthlySupport => &self.monthly_support,
            CheckoutFlow::MembershipRenewal => &self.membership_renewal,
        }
    }

    /// Absolute URL for a backend endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.backend_url, path.trim_start_matches('/'))
    }

    /// `return_url` handed to the processor for a flow.
    pub fn return_url(&self, flow: CheckoutFlow) -> String {
        format!("{}{}", self.origin, self.routes(flow).return_path)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
