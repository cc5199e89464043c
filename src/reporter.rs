//! Surfacing of failed checkout actions.
//!
//! Intent creation and subscription actions run outside a payment form, so
//! their failures are announced through the [`Notifier`]. Validation errors
//! are not; they belong next to the input that caused them. An
//! [`CheckoutError::AuthenticationRequired`] additionally sends the user to
//! the sign-in route.

use std::rc::Rc;

use tracing::warn;

use crate::config::CheckoutConfig;
use crate::error::CheckoutError;
use crate::ports::{CheckoutPorts, Navigator, Notifier};
use crate::types::CheckoutEvent;

pub const ERROR_TITLE: &str = "Error";

#[derive(Clone)]
pub struct FailureReporter {
    notifier: Rc<dyn Notifier>,
    navigator: Rc<dyn Navigator>,
    config: Rc<CheckoutConfig>,
}

impl FailureReporter {
    pub fn new(
        notifier: Rc<dyn Notifier>,
        navigator: Rc<dyn Navigator>,
        config: Rc<CheckoutConfig>,
    ) -> Self {
        Self {
            notifier,
            navigator,
            config,
        }
    }

    pub fn from_ports(ports: &CheckoutPorts) -> Self {
        Self::new(
            Rc::clone(&ports.notifier),
            Rc::clone(&ports.navigator),
            Rc::clone(&ports.config),
        )
    }

    /// Announce `err` and hand it back for propagation. Recoverable input
    /// errors are left to the form that produced them.
    pub fn report(&self, err: CheckoutError) -> CheckoutError {
        if err.is_recoverable() {
            return err;
        }
        warn!(error = %err, "checkout action failed");
        self.notifier.emit(CheckoutEvent::Error {
            title: ERROR_TITLE.to_string(),
            message: err.user_message(),
        });
        if matches!(err, CheckoutError::AuthenticationRequired(_)) {
            self.navigator.navigate(&self.config.sign_in);
        }
        err
    }
}
