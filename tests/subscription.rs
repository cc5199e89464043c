mod common;

use common::*;
use futures::executor::block_on;
use yew_stripe_flow::ports::Method;
use yew_stripe_flow::reporter::ERROR_TITLE;
use yew_stripe_flow::subscription::CANCELLED_MESSAGE;
use yew_stripe_flow::{
    Cancellation, CheckoutError, CheckoutEvent, CheckoutFlow, Donation, IntentId, IntentKind,
    Member, PaymentRecordId, SubscriptionManager, SubscriptionRef,
};

fn manager(h: &Harness) -> SubscriptionManager {
    SubscriptionManager::from_ports(&h.ports())
}

fn error_event(message: &str) -> CheckoutEvent {
    CheckoutEvent::Error {
        title: ERROR_TITLE.into(),
        message: message.into(),
    }
}

fn member() -> Member {
    Member {
        name: "Ada".into(),
        surname: "Lovelace".into(),
        email: "ada@example.org".into(),
    }
}

#[test]
fn test_unknown_subscription_never_reaches_cancel_endpoint() {
    let h = Harness::signed_in();
    h.transport.push(200, "[]");

    let err = block_on(manager(&h).cancel(&SubscriptionRef::new("sub_X"))).unwrap_err();

    assert_eq!(err, CheckoutError::SubscriptionNotFound("sub_X".into()));
    assert_eq!(h.transport.requests(), 1);
    assert_eq!(h.transport.requests_to("cancel_subscription"), 0);
    assert_eq!(
        h.notifier.events(),
        vec![error_event("No payment record found for this subscription")]
    );
    assert!(h.navigator.visits().is_empty());
}

#[test]
fn test_cancel_resolves_payment_record_first() {
    let h = Harness::signed_in();
    h.transport.push(200, r#"[{"id": 42, "amount": 10, "status": "active"}]"#);
    h.transport.push(200, r#"{"status": "success"}"#);

    let result = block_on(manager(&h).cancel(&SubscriptionRef::new("sub_1Abc"))).unwrap();

    assert_eq!(result, Cancellation::ScheduledAtPeriodEnd(PaymentRecordId::new(42)));
    let seen = h.transport.seen.borrow();
    assert_eq!(seen[0].method, Method::Get);
    assert_eq!(
        seen[0].url,
        "http://localhost:8000/api/payments/?subscription_id=sub_1Abc"
    );
    assert_eq!(seen[1].method, Method::Post);
    assert_eq!(seen[1].url, "http://localhost:8000/api/cancel_subscription/42/");
    assert_eq!(seen[1].bearer.as_deref(), Some("tok"));
    assert_eq!(
        h.notifier.events(),
        vec![CheckoutEvent::SubscriptionCancelled {
            message: CANCELLED_MESSAGE.into()
        }]
    );
}

#[test]
fn test_second_cancel_in_session_is_local() {
    let h = Harness::signed_in();
    h.transport.push(200, r#"[{"id": 42}]"#);
    h.transport.push(200, r#"{"status": "success"}"#);
    h.transport.push(200, r#"[{"id": 42}]"#);
    let manager = manager(&h);
    let subscription = SubscriptionRef::new("sub_1Abc");

    block_on(manager.cancel(&subscription)).unwrap();
    let again = block_on(manager.cancel(&subscription)).unwrap();

    assert_eq!(again, Cancellation::AlreadyCancelled(PaymentRecordId::new(42)));
    assert_eq!(h.transport.requests_to("cancel_subscription"), 1);
    assert_eq!(h.transport.requests_to("payments/"), 2);
}

#[test]
fn test_backend_already_cancelled_counts_as_success() {
    let h = Harness::signed_in();
    h.transport.push(200, r#"[{"id": 5}]"#);
    h.transport.push(400, r#"{"error": "Subscription is already cancelled"}"#);

    let result = block_on(manager(&h).cancel(&SubscriptionRef::new("sub_2"))).unwrap();

    assert_eq!(result, Cancellation::AlreadyCancelled(PaymentRecordId::new(5)));
    assert!(matches!(
        h.notifier.last(),
        Some(CheckoutEvent::SubscriptionCancelled { .. })
    ));
}

#[test]
fn test_other_cancel_errors_surface() {
    let h = Harness::signed_in();
    h.transport.push(200, r#"[{"id": 5}]"#);
    h.transport.push(400, r#"{"error": "No such subscription on processor"}"#);

    let err = block_on(manager(&h).cancel(&SubscriptionRef::new("sub_2"))).unwrap_err();

    assert_eq!(err, CheckoutError::Backend("No such subscription on processor".into()));
    assert_eq!(
        h.notifier.events(),
        vec![error_event("No such subscription on processor")]
    );
}

#[test]
fn test_cancel_requires_sign_in() {
    let h = Harness::new();

    let err = block_on(manager(&h).cancel(&SubscriptionRef::new("sub_2"))).unwrap_err();

    assert!(matches!(err, CheckoutError::AuthenticationRequired(_)));
    assert_eq!(h.transport.requests(), 0);
    assert_eq!(
        h.notifier.events(),
        vec![error_event("You must be logged in to perform this action")]
    );
    assert_eq!(h.navigator.visits(), vec!["/signin".to_string()]);
}

#[test]
fn test_expired_session_during_renewal_goes_to_sign_in() {
    let h = Harness::signed_in();
    h.transport.push(401, r#"{"detail": "Token expired"}"#);

    let err = block_on(manager(&h).create_renewal(&member(), "Rue du Lac 1")).unwrap_err();

    assert_eq!(err, CheckoutError::AuthenticationRequired("Token expired".into()));
    assert_eq!(h.notifier.events(), vec![error_event("Token expired")]);
    assert_eq!(h.navigator.visits(), vec!["/signin".to_string()]);
}

#[test]
fn test_rejected_recurring_setup_is_announced() {
    let h = Harness::new();
    h.transport.push(400, r#"{"error": "Amount too small"}"#);
    let donation = Donation {
        donor: donor(),
        amount: 1,
    };

    let err = block_on(manager(&h).create_recurring(&donation)).unwrap_err();

    assert_eq!(err, CheckoutError::IntentCreationFailed("Amount too small".into()));
    assert_eq!(h.notifier.events(), vec![error_event("Amount too small")]);
    assert!(h.navigator.visits().is_empty());
}

#[test]
fn test_recurring_donation_prepares_setup_intent() {
    let h = Harness::new();
    h.transport.push(200, r#"{"clientSecret": "seti_1_secret_x"}"#);
    let donation = Donation {
        donor: donor(),
        amount: 25,
    };

    let prepared = block_on(manager(&h).create_recurring(&donation)).unwrap();

    assert_eq!(prepared.flow, CheckoutFlow::MonthlySupport);
    assert_eq!(prepared.intent.kind, IntentKind::SubscriptionSetup);
    assert_eq!(prepared.intent.id, IntentId::new("seti_1"));
    assert!(prepared.intent.kind.is_setup());
    let seen = h.transport.seen.borrow();
    assert!(seen[0].url.ends_with("create_monthly_subscription/"));
    assert_eq!(seen[0].body.as_ref().unwrap()["amount"], 25);
}

#[test]
fn test_renewal_uses_fixed_fee_and_member_name() {
    let h = Harness::signed_in();
    h.transport.push(200, r#"{"clientSecret": "pi_R_secret_x"}"#);

    let prepared = block_on(manager(&h).create_renewal(&member(), " Rue du Lac 1 ")).unwrap();

    assert_eq!(prepared.flow, CheckoutFlow::MembershipRenewal);
    assert_eq!(prepared.intent.kind, IntentKind::OneTime);
    assert_eq!(prepared.intent.amount, 50);
    assert_eq!(prepared.donor.name, "Ada Lovelace");
    assert_eq!(prepared.donor.address, "Rue du Lac 1");
    let seen = h.transport.seen.borrow();
    assert_eq!(seen[0].bearer.as_deref(), Some("tok"));
    assert_eq!(seen[0].body.as_ref().unwrap()["address"], "Rue du Lac 1");
}

#[test]
fn test_renewal_without_address_is_rejected_locally() {
    let h = Harness::signed_in();

    let err = block_on(manager(&h).create_renewal(&member(), "  ")).unwrap_err();

    assert!(matches!(err, CheckoutError::Validation(_)));
    assert_eq!(h.transport.requests(), 0);
    assert!(h.notifier.events().is_empty());
}
