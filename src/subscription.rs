//! Recurring donations, membership renewals and subscription cancellation.
//!
//! Every failure is announced through [`FailureReporter`] before it is
//! returned, so a signed-out member is also sent to the sign-in route.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{info, warn};

use crate::api::IntentRequestClient;
use crate::error::{CheckoutError, CheckoutResult};
use crate::ports::{CheckoutPorts, Notifier};
use crate::reporter::FailureReporter;
use crate::types::{
    CheckoutEvent, CheckoutFlow, Donation, DonorProfile, Intent, IntentKind, Member,
    PaymentRecordId, PreparedCheckout, SubscriptionRef,
};

pub const CANCELLED_MESSAGE: &str =
    "Your subscription has been cancelled. It will remain active until the end of the current billing period.";

const CANCEL_FAILED_MESSAGE: &str = "Failed to cancel subscription. Please try again.";

/// Outcome of a successful cancellation. Neither variant ends the
/// subscription immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation {
    /// The subscription stays active until the current period ends.
    ScheduledAtPeriodEnd(PaymentRecordId),
    /// The record was cancelled before this call.
    AlreadyCancelled(PaymentRecordId),
}

impl Cancellation {
    pub fn payment(self) -> PaymentRecordId {
        match self {
            Self::ScheduledAtPeriodEnd(id) | Self::AlreadyCancelled(id) => id,
        }
    }
}

/// Owns the subscription side of the checkout and remembers which payment
/// records it cancelled during this session.
pub struct SubscriptionManager {
    client: IntentRequestClient,
    notifier: Rc<dyn Notifier>,
    reporter: FailureReporter,
    cancelled: RefCell<HashSet<PaymentRecordId>>,
}

impl SubscriptionManager {
    pub fn new(
        client: IntentRequestClient,
        notifier: Rc<dyn Notifier>,
        reporter: FailureReporter,
    ) -> Self {
        Self {
            client,
            notifier,
            reporter,
            cancelled: RefCell::new(HashSet::new()),
        }
    }

    pub fn from_ports(ports: &CheckoutPorts) -> Self {
        Self::new(
            ports.client(),
            Rc::clone(&ports.notifier),
            FailureReporter::from_ports(ports),
        )
    }

    /// Request the SetupIntent for a monthly donation. Confirm it with setup
    /// semantics; no money moves until the first off-session charge.
    pub async fn create_recurring(&self, donation: &Donation) -> CheckoutResult<PreparedCheckout> {
        self.recurring(donation)
            .await
            .map_err(|err| self.reporter.report(err))
    }

    /// Request a renewal PaymentIntent for the signed-in member at the fixed fee.
    pub async fn create_renewal(&self, member: &Member, address: &str) -> CheckoutResult<PreparedCheckout> {
        self.renewal(member, address)
            .await
            .map_err(|err| self.reporter.report(err))
    }

    /// Resolve `subscription` to its payment record and cancel it at period end.
    ///
    /// The cancel endpoint is never called unless the lookup found a record.
    pub async fn cancel(&self, subscription: &SubscriptionRef) -> CheckoutResult<Cancellation> {
        self.resolve_and_cancel(subscription)
            .await
            .map_err(|err| self.reporter.report(err))
    }

    async fn recurring(&self, donation: &Donation) -> CheckoutResult<PreparedCheckout> {
        let secret = self.client.create_monthly_subscription(donation).await?;
        let intent = Intent::from_client_secret(
            IntentKind::SubscriptionSetup,
            secret,
            donation.amount,
            self.client.config().currency.clone(),
        )?;
        info!(intent_id = %intent.id, amount = donation.amount, "recurring donation prepared");
        Ok(PreparedCheckout {
            flow: CheckoutFlow::MonthlySupport,
            intent,
            donor: donation.donor.clone(),
        })
    }

    async fn renewal(&self, member: &Member, address: &str) -> CheckoutResult<PreparedCheckout> {
        if address.trim().is_empty() {
            return Err(CheckoutError::Validation("Address is required".to_string()));
        }
        let secret = self.client.create_renewal_intent(address.trim()).await?;
        let config = self.client.config();
        let intent = Intent::from_client_secret(
            IntentKind::OneTime,
            secret,
            config.renewal_fee,
            config.currency.clone(),
        )?;
        info!(intent_id = %intent.id, "membership renewal prepared");
        Ok(PreparedCheckout {
            flow: CheckoutFlow::MembershipRenewal,
            intent,
            donor: DonorProfile::new(member.full_name(), member.email.clone(), address.trim()),
        })
    }

    async fn resolve_and_cancel(&self, subscription: &SubscriptionRef) -> CheckoutResult<Cancellation> {
        let records = self.client.find_payment_records(subscription).await?;
        let Some(record) = records.first() else {
            warn!(subscription = %subscription, "no payment record for subscription");
            return Err(CheckoutError::SubscriptionNotFound(subscription.to_string()));
        };
        let payment = record.id;

        if self.cancelled.borrow().contains(&payment) {
            info!(payment = %payment, "subscription already cancelled in this session");
            return Ok(self.succeed(Cancellation::AlreadyCancelled(payment)));
        }

        let response = self.client.cancel_subscription(payment).await?;
        let cancellation = if response.status == "success" {
            Cancellation::ScheduledAtPeriodEnd(payment)
        } else if response.error.as_deref().is_some_and(is_already_cancelled) {
            Cancellation::AlreadyCancelled(payment)
        } else {
            let message = response
                .error
                .unwrap_or_else(|| CANCEL_FAILED_MESSAGE.to_string());
            warn!(payment = %payment, error = %message, "subscription cancellation rejected");
            return Err(CheckoutError::Backend(message));
        };

        self.cancelled.borrow_mut().insert(payment);
        info!(payment = %payment, subscription = %subscription, "subscription cancelled at period end");
        Ok(self.succeed(cancellation))
    }

    fn succeed(&self, cancellation: Cancellation) -> Cancellation {
        self.notifier.emit(CheckoutEvent::SubscriptionCancelled {
            message: CANCELLED_MESSAGE.to_string(),
        });
        cancellation
    }
}

fn is_already_cancelled(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already") && (message.contains("cancel") || message.contains("inactive"))
}
