//! Payment confirmation state machine.
//!
//! [`ConfirmationController::confirm`] validates the payment element, confirms
//! the intent with `redirect: "if_required"` and reports one of two things:
//! a synchronous outcome (handed off in-app through the same completion URL a
//! redirect would produce) or a browser navigation to the processor.
//!
//! Confirmation is single-flight per controller. While one confirmation is
//! outstanding, any further call, for the same intent or another, is rejected
//! with the outstanding id before it reaches the processor. The slot is freed
//! when the outstanding call settles, so a new intent is never blocked by a
//! stale entry.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult, PAYMENT_FAILED_MESSAGE};
use crate::ports::{
    CheckoutPorts, ConfirmPaymentRequest, ConfirmSetupRequest, Confirmation, Navigator, Notifier,
    Processor,
};
use crate::redirect::completion_url;
use crate::types::{
    CheckoutEvent, CheckoutFlow, DonorProfile, Intent, IntentId, IntentStatus, PreparedCheckout,
};

/// Phase of one confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
    AwaitingRedirect,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::AwaitingRedirect)
    }
}

/// Inputs of the transition function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Succeed,
    Fail,
    Redirect,
    /// Leave `Failed` so the customer can resubmit.
    Retry,
}

impl Phase {
    /// `idle → submitting → {succeeded | failed | awaiting-redirect}`, plus
    /// `failed → idle` for a resubmission.
    pub fn transition(self, input: Transition) -> Option<Phase> {
        match (self, input) {
            (Self::Idle, Transition::Submit) => Some(Self::Submitting),
            (Self::Submitting, Transition::Succeed) => Some(Self::Succeeded),
            (Self::Submitting, Transition::Fail) => Some(Self::Failed),
            (Self::Submitting, Transition::Redirect) => Some(Self::AwaitingRedirect),
            (Self::Failed, Transition::Retry) => Some(Self::Idle),
            _ => None,
        }
    }
}

/// State of the confirmation for the current intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationState {
    pub phase: Phase,
    pub intent_id: Option<IntentId>,
    pub last_error: Option<CheckoutError>,
}

impl Default for ConfirmationState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            intent_id: None,
            last_error: None,
        }
    }
}

impl ConfirmationState {
    fn apply(&mut self, input: Transition) -> CheckoutResult<()> {
        let id = self
            .intent_id
            .as_ref()
            .map(IntentId::to_string)
            .unwrap_or_default();
        let next = self
            .phase
            .transition(input)
            .ok_or(CheckoutError::ConfirmationClosed(id))?;
        self.phase = next;
        Ok(())
    }

    /// Prepare for a submission of `intent`: reset for a new intent, leave
    /// `Failed` for a resubmission, then move to `Submitting`.
    fn begin(&mut self, intent: &IntentId) -> CheckoutResult<()> {
        if self.intent_id.as_ref() != Some(intent) {
            *self = Self {
                intent_id: Some(intent.clone()),
                ..Self::default()
            };
        }
        if self.phase == Phase::Failed {
            self.apply(Transition::Retry)?;
        }
        self.last_error = None;
        self.apply(Transition::Submit)
    }
}

/// What a confirm call led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Terminal success, handed off in-app to `Completion::destination`.
    Succeeded(Completion),
    /// The browser is being navigated to the processor.
    AwaitingRedirect,
    /// Concluded without a final status; the landing page reconciles it.
    Reconciling(Completion),
}

/// The in-app handoff after a synchronous confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub flow: CheckoutFlow,
    pub intent_id: IntentId,
    pub destination: String,
}

/// Occupies the controller's single confirmation slot until dropped.
struct InFlight {
    slot: Rc<RefCell<Option<IntentId>>>,
}

impl InFlight {
    fn acquire(slot: &Rc<RefCell<Option<IntentId>>>, id: &IntentId) -> CheckoutResult<Self> {
        let mut current = slot.borrow_mut();
        if let Some(outstanding) = current.as_ref() {
            return Err(CheckoutError::ConfirmationInFlight(outstanding.to_string()));
        }
        *current = Some(id.clone());
        Ok(Self {
            slot: Rc::clone(slot),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.slot.borrow_mut().take();
    }
}

/// Drives `submit` then `confirmPayment` or `confirmSetup` for one checkout
/// form and reports the result through [`Outcome`].
pub struct ConfirmationController {
    processor: Rc<dyn Processor>,
    navigator: Rc<dyn Navigator>,
    notifier: Rc<dyn Notifier>,
    config: Rc<CheckoutConfig>,
    state: RefCell<ConfirmationState>,
    in_flight: Rc<RefCell<Option<IntentId>>>,
}

impl ConfirmationController {
    pub fn new(
        processor: Rc<dyn Processor>,
        navigator: Rc<dyn Navigator>,
        notifier: Rc<dyn Notifier>,
        config: Rc<CheckoutConfig>,
    ) -> Self {
        Self {
            processor,
            navigator,
            notifier,
            config,
            state: RefCell::new(ConfirmationState::default()),
            in_flight: Rc::new(RefCell::new(None)),
        }
    }

    pub fn from_ports(ports: &CheckoutPorts) -> Self {
        Self::new(
            Rc::clone(&ports.processor),
            Rc::clone(&ports.navigator),
            Rc::clone(&ports.notifier),
            Rc::clone(&ports.config),
        )
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ConfirmationState {
        self.state.borrow().clone()
    }

    /// True while a confirmation for `intent` is outstanding.
    pub fn is_in_flight(&self, intent: &IntentId) -> bool {
        self.in_flight.borrow().as_ref() == Some(intent)
    }

    /// Confirm a prepared checkout, picking setup semantics from the intent kind.
    pub async fn confirm_prepared(&self, checkout: &PreparedCheckout) -> CheckoutResult<Outcome> {
        self.confirm(
            checkout.flow,
            &checkout.intent,
            &checkout.donor,
            checkout.intent.kind.is_setup(),
        )
        .await
    }

    /// Confirm `intent` for `flow`.
    ///
    /// Card and validation errors come back as recoverable errors and leave
    /// the state in `Failed`, from which the same intent may be resubmitted.
    pub async fn confirm(
        &self,
        flow: CheckoutFlow,
        intent: &Intent,
        donor: &DonorProfile,
        is_setup: bool,
    ) -> CheckoutResult<Outcome> {
        let _guard = InFlight::acquire(&self.in_flight, &intent.id).inspect_err(|_| {
            debug!(intent_id = %intent.id, "a confirmation is already outstanding, ignoring submit");
        })?;
        self.state.borrow_mut().begin(&intent.id)?;
        info!(intent_id = %intent.id, flow = %flow, is_setup, "confirming intent");

        if let Err(failure) = self.processor.submit().await {
            debug!(intent_id = %intent.id, "payment element rejected input");
            return Err(self.fail(failure.into()));
        }

        let return_url = self.config.return_url(flow);
        let confirmed = if is_setup {
            self.processor
                .confirm_setup(ConfirmSetupRequest {
                    client_secret: intent.client_secret.clone(),
                    return_url: format!("{}{}", self.config.origin, self.config.routes(flow).thank_you),
                })
                .await
        } else {
            self.processor
                .confirm_payment(ConfirmPaymentRequest {
                    client_secret: intent.client_secret.clone(),
                    return_url,
                    billing_details: donor.billing_details(),
                })
                .await
        };

        match confirmed {
            Err(failure) => Err(self.fail(failure.into())),
            Ok(Confirmation::Redirected) => {
                self.state.borrow_mut().apply(Transition::Redirect)?;
                info!(intent_id = %intent.id, "payment method requires redirect");
                Ok(Outcome::AwaitingRedirect)
            }
            Ok(Confirmation::SetupConfirmed) => {
                self.state.borrow_mut().apply(Transition::Succeed)?;
                let destination = self.config.routes(flow).thank_you.clone();
                info!(intent_id = %intent.id, "setup intent confirmed");
                self.notifier.emit(CheckoutEvent::Succeeded {
                    flow,
                    destination: destination.clone(),
                });
                self.navigator.navigate(&destination);
                Ok(Outcome::Succeeded(Completion {
                    flow,
                    intent_id: intent.id.clone(),
                    destination,
                }))
            }
            Ok(Confirmation::Concluded(snapshot)) => {
                let secret = snapshot
                    .client_secret
                    .clone()
                    .unwrap_or_else(|| intent.client_secret.clone());
                let return_path = &self.config.routes(flow).return_path;
                match &snapshot.status {
                    IntentStatus::Succeeded => {
                        self.state.borrow_mut().apply(Transition::Succeed)?;
                        let destination =
                            completion_url(return_path, &snapshot.id, &secret, "succeeded");
                        info!(intent_id = %snapshot.id, "payment confirmed synchronously");
                        self.notifier.emit(CheckoutEvent::Confirmed {
                            flow,
                            intent_id: snapshot.id.clone(),
                            completion_url: destination.clone(),
                        });
                        self.navigator.navigate(&destination);
                        Ok(Outcome::Succeeded(Completion {
                            flow,
                            intent_id: snapshot.id,
                            destination,
                        }))
                    }
                    IntentStatus::Processing | IntentStatus::Pending | IntentStatus::RequiresAction => {
                        self.state.borrow_mut().apply(Transition::Redirect)?;
                        let destination = completion_url(
                            return_path,
                            &snapshot.id,
                            &secret,
                            snapshot.status.as_str(),
                        );
                        info!(intent_id = %snapshot.id, status = %snapshot.status, "handing off to reconciliation");
                        self.navigator.navigate(&destination);
                        Ok(Outcome::Reconciling(Completion {
                            flow,
                            intent_id: snapshot.id,
                            destination,
                        }))
                    }
                    status => {
                        warn!(intent_id = %snapshot.id, status = %status, "payment concluded without success");
                        Err(self.fail(CheckoutError::PaymentFailed(PAYMENT_FAILED_MESSAGE.to_string())))
                    }
                }
            }
        }
    }

    /// Record a failure. Unexpected errors are logged and notified; card and
    /// validation errors stay inline with the form.
    fn fail(&self, err: CheckoutError) -> CheckoutError {
        {
            let mut state = self.state.borrow_mut();
            // Submitting → Failed always exists; nothing else reaches here.
            let _ = state.apply(Transition::Fail);
            state.last_error = Some(err.clone());
        }
        if !err.is_recoverable() {
            error!(error = %err, "payment confirmation failed");
            self.notifier.emit(CheckoutEvent::Error {
                title: "Payment Error".to_string(),
                message: err.user_message(),
            });
        }
        err
    }
}
