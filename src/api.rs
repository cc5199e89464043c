//! Backend client: intent creation, payment records and status lookups.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::ports::{ApiRequest, ApiResponse, HttpTransport, TokenProvider};
use crate::types::{
    CheckoutFlow, ClientSecret, Donation, Intent, IntentId, IntentKind, IntentStatus,
    PaymentRecordId, PreparedCheckout, SubscriptionRef,
};

pub const CREATE_PAYMENT_INTENT: &str = "create_payment_intent/";
pub const CREATE_MONTHLY_SUBSCRIPTION: &str = "create_monthly_subscription/";
pub const MEMBERSHIP_RENEWAL_INTENT: &str = "membership_renewal_intent/";
pub const PAYMENTS: &str = "payments/";
pub const CANCEL_SUBSCRIPTION: &str = "cancel_subscription/";
pub const PAYMENT_STATUS: &str = "payment-status/";

#[derive(Deserialize)]
struct SecretResponse {
    #[serde(rename = "clientSecret", alias = "client_secret", default)]
    client_secret: Option<ClientSecret>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: IntentStatus,
}

/// A backend payment record, as returned by the payments listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentRecordId,
}

/// Body of the cancel endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CancelResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Backend client for everything the checkout flows need.
#[derive(Clone)]
pub struct IntentRequestClient {
    transport: Rc<dyn HttpTransport>,
    tokens: Rc<dyn TokenProvider>,
    config: Rc<CheckoutConfig>,
}

impl IntentRequestClient {
    pub fn new(
        transport: Rc<dyn HttpTransport>,
        tokens: Rc<dyn TokenProvider>,
        config: Rc<CheckoutConfig>,
    ) -> Self {
        Self {
            transport,
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Create a one-time PaymentIntent for a donation.
    pub async fn create_payment_intent(&self, donation: &Donation) -> CheckoutResult<PreparedCheckout> {
        let body = json!({
            "amount": donation.amount,
            "currency": self.config.currency,
            "email": donation.donor.email,
            "name": donation.donor.name,
            "address": donation.donor.address,
            "payment_type": self.config.one_time_payment_type,
            "payment_method_types": self.config.payment_method_types,
        });
        let secret = self.post_for_secret(CREATE_PAYMENT_INTENT, body, None).await?;
        let intent = Intent::from_client_secret(
            IntentKind::OneTime,
            secret,
            donation.amount,
            self.config.currency.clone(),
        )?;
        Ok(PreparedCheckout {
            flow: CheckoutFlow::OneTimeGift,
            intent,
            donor: donation.donor.clone(),
        })
    }

    /// Ask for the SetupIntent backing a monthly donation.
    pub async fn create_monthly_subscription(&self, donation: &Donation) -> CheckoutResult<ClientSecret> {
        let body = json!({
            "amount": donation.amount,
            "email": donation.donor.email,
            "name": donation.donor.name,
            "address": donation.donor.address,
        });
        self.post_for_secret(CREATE_MONTHLY_SUBSCRIPTION, body, None).await
    }

    /// Ask for a renewal PaymentIntent tied to the signed-in member.
    pub async fn create_renewal_intent(&self, address: &str) -> CheckoutResult<ClientSecret> {
        let token = self.bearer().await?;
        let body = json!({ "address": address });
        self.post_for_secret(MEMBERSHIP_RENEWAL_INTENT, body, Some(token)).await
    }

    /// Payment records belonging to an external subscription id.
    pub async fn find_payment_records(
        &self,
        subscription: &SubscriptionRef,
    ) -> CheckoutResult<Vec<PaymentRecord>> {
        let token = self.bearer().await?;
        let url = format!(
            "{}?subscription_id={}",
            self.config.endpoint(PAYMENTS),
            encode(subscription.as_str())
        );
        let response = self
            .transport
            .send(ApiRequest::get(url).bearer(token))
            .await
            .map_err(|e| CheckoutError::Backend(e.to_string()))?;
        let response = check_auth(response)?;
        if !response.is_success() {
            return Err(CheckoutError::Backend(
                backend_message(&response.body)
                    .unwrap_or_else(|| "Failed to look up payment records".to_string()),
            ));
        }
        response.json().map_err(|e| CheckoutError::Backend(e.to_string()))
    }

    /// Invoke the cancel endpoint for a resolved payment record.
    ///
    /// Non-2xx answers are returned as a [`CancelResponse`] when the body carries
    /// an error message, so the caller can recognise an already-cancelled record.
    pub async fn cancel_subscription(&self, payment: PaymentRecordId) -> CheckoutResult<CancelResponse> {
        let token = self.bearer().await?;
        let url = format!("{}{}/", self.config.endpoint(CANCEL_SUBSCRIPTION), payment);
        let response = self
            .transport
            .send(ApiRequest::post(url, json!({})).bearer(token))
            .await
            .map_err(|e| CheckoutError::Backend(e.to_string()))?;
        let response = check_auth(response)?;
        if response.is_success() {
            return response.json().map_err(|e| CheckoutError::Backend(e.to_string()));
        }
        match backend_message(&response.body) {
            Some(error) => Ok(CancelResponse {
                status: "error".to_string(),
                error: Some(error),
            }),
            None => Err(CheckoutError::Backend(
                "Failed to cancel subscription. Please try again.".to_string(),
            )),
        }
    }

    /// Current status of an intent according to the backend.
    pub async fn payment_status(&self, intent: &IntentId) -> CheckoutResult<IntentStatus> {
        let url = format!(
            "{}?payment_intent={}",
            self.config.endpoint(PAYMENT_STATUS),
            encode(intent.as_str())
        );
        let response = self
            .transport
            .send(ApiRequest::get(url))
            .await
            .map_err(|e| CheckoutError::Backend(e.to_string()))?;
        if !response.is_success() {
            return Err(CheckoutError::Backend(format!(
                "status lookup answered {}",
                response.status
            )));
        }
        let body: StatusResponse = response
            .json()
            .map_err(|e| CheckoutError::Backend(e.to_string()))?;
        Ok(body.status)
    }

    async fn bearer(&self) -> CheckoutResult<String> {
        self.tokens.get_token().await.ok_or_else(|| {
            CheckoutError::AuthenticationRequired(
                "You must be logged in to perform this action".to_string(),
            )
        })
    }

    async fn post_for_secret(
        &self,
        path: &str,
        body: serde_json::Value,
        bearer: Option<String>,
    ) -> CheckoutResult<ClientSecret> {
        let mut request = ApiRequest::post(self.config.endpoint(path), body);
        if let Some(token) = bearer {
            request = request.bearer(token);
        }
        debug!(endpoint = path, "requesting intent");

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(endpoint = path, error = %e, "intent request failed");
            CheckoutError::IntentCreationFailed(e.to_string())
        })?;
        let response = check_auth(response)?;
        if !response.is_success() {
            let message = backend_message(&response.body)
                .unwrap_or_else(|| "Failed to initialize payment".to_string());
            warn!(endpoint = path, status = response.status, "intent creation rejected");
            return Err(CheckoutError::IntentCreationFailed(message));
        }

        let parsed: SecretResponse = response
            .json()
            .map_err(|e| CheckoutError::IntentCreationFailed(e.to_string()))?;
        parsed.client_secret.ok_or_else(|| {
            CheckoutError::IntentCreationFailed("No client secret received from server".to_string())
        })
    }
}

fn check_auth(response: ApiResponse) -> CheckoutResult<ApiResponse> {
    match response.status {
        401 | 403 => Err(CheckoutError::AuthenticationRequired(
            backend_message(&response.body).unwrap_or_else(|| "Please sign in again".to_string()),
        )),
        _ => Ok(response),
    }
}

/// The `error` or `message` field of a backend error body.
pub(crate) fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
