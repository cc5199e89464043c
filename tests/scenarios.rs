//! Whole checkouts, from intent creation to the terminal page.

mod common;

use common::*;
use futures::executor::block_on;
use yew_stripe_flow::ports::Confirmation;
use yew_stripe_flow::{
    CheckoutError, CheckoutEvent, CheckoutFlow, ConfirmationController, Donation, DonorForm,
    LandingOutcome, Member, Outcome, ReturnLanding, SubscriptionManager,
};

#[test]
fn test_card_renewal_lands_on_thank_you_without_polling() {
    let h = Harness::signed_in();
    let ports = h.ports();
    h.transport.push(200, r#"{"clientSecret": "pi_C_secret_c"}"#);
    let member = Member {
        name: "Ada".into(),
        surname: "Lovelace".into(),
        email: "ada@example.org".into(),
    };

    let checkout = block_on(
        SubscriptionManager::from_ports(&ports).create_renewal(&member, "Rue du Lac 1"),
    )
    .unwrap();
    assert_eq!(checkout.intent.amount, 50);
    assert_eq!(checkout.intent.currency, "chf");

    h.processor.push_confirm(Ok(Confirmation::Concluded(snapshot("pi_C", "succeeded"))));
    let outcome = block_on(ConfirmationController::from_ports(&ports).confirm_prepared(&checkout)).unwrap();
    let Outcome::Succeeded(completion) = outcome else {
        panic!("expected synchronous success");
    };
    assert!(completion.destination.starts_with("/cotisation-payment-result?payment_intent=pi_C"));

    // The app follows the in-app handoff to the renewal landing page.
    h.location.set(&completion.destination);
    h.processor.push_retrieve(Ok(snapshot("pi_C", "succeeded")));
    let landed = block_on(ReturnLanding::new(CheckoutFlow::MembershipRenewal, &ports).enter()).unwrap();

    assert_eq!(
        landed,
        LandingOutcome::Succeeded {
            destination: "/thank-you-cotisation".into()
        }
    );
    assert_eq!(h.navigator.visits().last().map(String::as_str), Some("/thank-you-cotisation"));
    assert_eq!(h.transport.requests_to("payment-status"), 0);
    assert_eq!(h.transport.requests(), 1);
    assert_eq!(h.processor.retrieve_calls.get(), 1);
    assert_eq!(
        h.processor.payment_requests.borrow()[0].billing_details.name,
        "Ada Lovelace"
    );
}

#[test]
fn test_redirected_gift_is_settled_by_polling() {
    let h = Harness::new();
    let ports = h.ports();
    let form = DonorForm {
        amount: 19.5,
        email: "ada@example.org".into(),
        name: "Ada Lovelace".into(),
        address: "Rue du Lac 1".into(),
        consent: true,
    };
    let donation: Donation = form.validate().unwrap();
    h.transport.push(200, r#"{"clientSecret": "pi_G_secret_g"}"#);

    let checkout = block_on(ports.prepare_gift(&donation)).unwrap();
    assert_eq!(checkout.intent.amount, 20);

    h.processor.push_confirm(Ok(Confirmation::Redirected));
    let outcome = block_on(ConfirmationController::from_ports(&ports).confirm_prepared(&checkout)).unwrap();
    assert_eq!(outcome, Outcome::AwaitingRedirect);
    assert!(h.navigator.visits().is_empty());

    // The processor sends the browser back to the return URL.
    h.location.set(
        "/payment-result?payment_intent=pi_G&payment_intent_client_secret=pi_G_secret_g&redirect_status=succeeded",
    );
    h.transport.push(200, r#"{"status": "processing"}"#);
    h.transport.push(200, r#"{"status": "succeeded"}"#);
    let landed = block_on(ReturnLanding::new(CheckoutFlow::OneTimeGift, &ports).enter()).unwrap();

    assert!(matches!(landed, LandingOutcome::Succeeded { .. }));
    assert_eq!(h.transport.requests_to("payment-status"), 2);
    assert_eq!(h.processor.retrieve_calls.get(), 0);
    assert_eq!(h.navigator.visits(), vec!["/thank-you".to_string()]);
}

#[test]
fn test_invalid_form_makes_no_requests() {
    let h = Harness::new();
    let form = DonorForm {
        amount: 10.0,
        email: "ada@example.org".into(),
        name: "Ada".into(),
        address: String::new(),
        consent: false,
    };

    let err = form.validate().unwrap_err();

    assert!(err.is_recoverable());
    assert_eq!(h.transport.requests(), 0);
    assert_eq!(h.processor.confirm_calls(), 0);
}

#[test]
fn test_failed_gift_intent_is_announced() {
    let h = Harness::new();
    let ports = h.ports();
    h.transport.push(500, r#"{"message": "Stripe is unavailable"}"#);
    let donation = DonorForm {
        amount: 10.0,
        email: "ada@example.org".into(),
        name: "Ada Lovelace".into(),
        address: "Rue du Lac 1".into(),
        consent: true,
    }
    .validate()
    .unwrap();

    let err = block_on(ports.prepare_gift(&donation)).unwrap_err();

    assert_eq!(err, CheckoutError::IntentCreationFailed("Stripe is unavailable".into()));
    assert_eq!(
        h.notifier.events(),
        vec![CheckoutEvent::Error {
            title: "Error".into(),
            message: "Stripe is unavailable".into(),
        }]
    );
    assert_eq!(h.processor.confirm_calls(), 0);
}
