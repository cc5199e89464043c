//! Return-page orchestration.
//!
//! A landing page finalizes a checkout after the customer comes back from
//! confirmation. Each flow has exactly one reconciliation path, and
//! [`ReturnLanding::enter`] runs it at most once per page load.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::poller::{StatusPoller, TerminalStatus};
use crate::ports::{CheckoutPorts, Location, Navigator, Notifier, Timer};
use crate::redirect::{Reconciliation, RedirectReconciler, ReturnParams};
use crate::types::{CheckoutEvent, CheckoutFlow};

pub const MISSING_REFERENCE_MESSAGE: &str = "No payment intent found in URL.";
pub const NOT_SUCCESSFUL_MESSAGE: &str = "Payment was not successful. Please try again.";

/// How a landing page learns the final status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStrategy {
    /// One `retrievePaymentIntent` call with the secret from the URL, then
    /// backend polling while Stripe still reports `processing`.
    ProcessorRetrieval,
    /// Bounded polling of the backend status endpoint.
    BackendPolling,
}

impl ReconcileStrategy {
    /// Gifts are settled by the backend, subscriptions and renewals by Stripe.js.
    pub fn for_flow(flow: CheckoutFlow) -> Self {
        match flow {
            CheckoutFlow::OneTimeGift => Self::BackendPolling,
            CheckoutFlow::MonthlySupport | CheckoutFlow::MembershipRenewal => {
                Self::ProcessorRetrieval
            }
        }
    }
}

/// Lifecycle of one landing page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingState {
    /// `enter` has not run yet.
    Ready,
    Reconciling,
    /// Reconciliation finished, successfully or not.
    Settled,
}

/// Successful ends of a landing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandingOutcome {
    /// The page was opened directly; there was nothing to reconcile.
    Direct,
    /// The parameters were handled earlier in this page session.
    AlreadyHandled,
    /// [`ReturnLanding::enter`] was called again after it already ran.
    AlreadyEntered,
    /// Payment succeeded and the customer was sent to `destination`.
    Succeeded { destination: String },
}

/// The return page of one checkout flow.
///
/// Binds the flow to its [`ReconcileStrategy`] and turns the result into the
/// terminal event and navigation the customer sees.
pub struct ReturnLanding {
    flow: CheckoutFlow,
    strategy: ReconcileStrategy,
    reconciler: RedirectReconciler,
    poller: StatusPoller,
    location: Rc<dyn Location>,
    navigator: Rc<dyn Navigator>,
    notifier: Rc<dyn Notifier>,
    timer: Rc<dyn Timer>,
    config: Rc<CheckoutConfig>,
    state: Cell<LandingState>,
}

impl ReturnLanding {
    /// Landing for `flow` using its default strategy.
    pub fn new(flow: CheckoutFlow, ports: &CheckoutPorts) -> Self {
        Self::with_strategy(flow, ReconcileStrategy::for_flow(flow), ports)
    }

    /// Landing for `flow` with an explicit strategy.
    pub fn with_strategy(flow: CheckoutFlow, strategy: ReconcileStrategy, ports: &CheckoutPorts) -> Self {
        Self {
            flow,
            strategy,
            reconciler: RedirectReconciler::from_ports(flow, ports),
            poller: StatusPoller::new(ports.client(), Rc::clone(&ports.timer)),
            location: Rc::clone(&ports.location),
            navigator: Rc::clone(&ports.navigator),
            notifier: Rc::clone(&ports.notifier),
            timer: Rc::clone(&ports.timer),
            config: Rc::clone(&ports.config),
            state: Cell::new(LandingState::Ready),
        }
    }

    pub fn state(&self) -> LandingState {
        self.state.get()
    }

    pub fn strategy(&self) -> ReconcileStrategy {
        self.strategy
    }

    /// On-enter action of the landing. Runs its reconciliation path once; any
    /// later call returns [`LandingOutcome::AlreadyEntered`] without side effects.
    pub async fn enter(&self) -> CheckoutResult<LandingOutcome> {
        if self.state.get() != LandingState::Ready {
            debug!(flow = %self.flow, "landing already entered");
            return Ok(LandingOutcome::AlreadyEntered);
        }
        self.state.set(LandingState::Reconciling);
        debug!(flow = %self.flow, strategy = ?self.strategy, "entering landing");

        let result = match self.strategy {
            ReconcileStrategy::ProcessorRetrieval => {
                self.reconciler.reconcile().await.map(|r| match r {
                    Reconciliation::NotApplicable => LandingOutcome::Direct,
                    Reconciliation::AlreadyProcessed => LandingOutcome::AlreadyHandled,
                    Reconciliation::Succeeded { destination } => {
                        LandingOutcome::Succeeded { destination }
                    }
                })
            }
            ReconcileStrategy::BackendPolling => self.poll().await,
        };

        self.state.set(LandingState::Settled);
        result
    }

    async fn poll(&self) -> CheckoutResult<LandingOutcome> {
        let routes = self.config.routes(self.flow);
        let params = ReturnParams::parse(&self.location.search());
        let Some(intent_id) = params.payment_intent else {
            warn!(flow = %self.flow, "landing reached without payment reference");
            self.notifier.emit(CheckoutEvent::Failed {
                flow: self.flow,
                message: MISSING_REFERENCE_MESSAGE.to_string(),
                retry_route: routes.form.clone(),
            });
            return Err(CheckoutError::MissingReference(MISSING_REFERENCE_MESSAGE.to_string()));
        };

        match self.poller.poll(&intent_id).await {
            Ok(TerminalStatus::Succeeded) => {
                let destination = routes.thank_you.clone();
                self.notifier.emit(CheckoutEvent::Succeeded {
                    flow: self.flow,
                    destination: destination.clone(),
                });
                self.timer.sleep(self.config.poll_success_delay).await;
                info!(flow = %self.flow, intent_id = %intent_id, "polled payment succeeded");
                self.navigator.navigate(&destination);
                Ok(LandingOutcome::Succeeded { destination })
            }
            Ok(status) => {
                warn!(flow = %self.flow, intent_id = %intent_id, status = ?status, "polled payment did not succeed");
                self.notifier.emit(CheckoutEvent::Failed {
                    flow: self.flow,
                    message: NOT_SUCCESSFUL_MESSAGE.to_string(),
                    retry_route: routes.form.clone(),
                });
                Err(CheckoutError::PaymentFailed(NOT_SUCCESSFUL_MESSAGE.to_string()))
            }
            Err(err) if err.is_soft_failure() => {
                self.notifier.emit(CheckoutEvent::StillProcessing {
                    flow: self.flow,
                    message: err.user_message(),
                });
                Err(err)
            }
            Err(err) => {
                self.notifier.emit(CheckoutEvent::Error {
                    title: "Error".to_string(),
                    message: err.user_message(),
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_flow_has_one_strategy() {
        assert_eq!(
            ReconcileStrategy::for_flow(CheckoutFlow::OneTimeGift),
            ReconcileStrategy::BackendPolling
        );
        assert_eq!(
            ReconcileStrategy::for_flow(CheckoutFlow::MembershipRenewal),
            ReconcileStrategy::ProcessorRetrieval
        );
        assert_eq!(
            ReconcileStrategy::for_flow(CheckoutFlow::MonthlySupport),
            ReconcileStrategy::ProcessorRetrieval
        );
    }
}
