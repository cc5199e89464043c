//! Browser implementations of the checkout ports.

use std::time::Duration;

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder};
use tracing::{debug, warn};
use wasm_bindgen::JsValue;
use yew::Callback;

use crate::error::TransportError;
use crate::ports::{
    ApiRequest, ApiResponse, HttpTransport, Location, Method, Navigator, Notifier, Timer,
    TokenProvider,
};
use crate::types::CheckoutEvent;

/// `fetch`-backed transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTransport;

#[async_trait(?Send)]
impl HttpTransport for GlooTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder: RequestBuilder = match request.method {
            Method::Get => Request::get(&request.url),
            Method::Post => Request::post(&request.url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.header("Authorization", &format!("Bearer {}", token));
        }
        let prepared = match &request.body {
            Some(body) => builder.json(body)?,
            None => builder.build()?,
        };

        let response = prepared.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(url = %request.url, status, "backend responded");
        Ok(ApiResponse::new(status, body))
    }
}

/// `window.location` plus `history.replaceState`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserLocation;

impl Location for BrowserLocation {
    fn search(&self) -> String {
        web_sys::window()
            .and_then(|win| win.location().search().ok())
            .unwrap_or_default()
    }

    fn pathname(&self) -> String {
        web_sys::window()
            .and_then(|win| win.location().pathname().ok())
            .unwrap_or_default()
    }

    fn replace(&self, url: &str) {
        let replaced = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))
            .and_then(|win| win.history())
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(err) = replaced {
            warn!(error = ?err, "history.replaceState failed");
        }
    }
}

/// Full page navigation through `location.href`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, to: &str) {
        let navigated = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))
            .and_then(|win| win.location().set_href(to));
        if let Err(err) = navigated {
            warn!(error = ?err, to, "navigation failed");
        }
    }
}

/// Hands navigation to the host, e.g. a router's `navigator.push`.
#[derive(Clone, PartialEq)]
pub struct CallbackNavigator(pub Callback<String>);

impl Navigator for CallbackNavigator {
    fn navigate(&self, to: &str) {
        self.0.emit(to.to_string());
    }
}

/// Forwards checkout events to a Yew callback.
#[derive(Clone, PartialEq)]
pub struct CallbackNotifier(pub Callback<CheckoutEvent>);

impl Notifier for CallbackNotifier {
    fn emit(&self, event: CheckoutEvent) {
        self.0.emit(event);
    }
}

/// Timers on the Yew platform scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformTimer;

#[async_trait(?Send)]
impl Timer for PlatformTimer {
    async fn sleep(&self, duration: Duration) {
        yew::platform::time::sleep(duration).await;
    }
}

/// Bearer token stored in `localStorage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStorageToken {
    key: String,
}

impl LocalStorageToken {
    pub const DEFAULT_KEY: &'static str = "access";

    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Default for LocalStorageToken {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEY)
    }
}

#[async_trait(?Send)]
impl TokenProvider for LocalStorageToken {
    async fn get_token(&self) -> Option<String> {
        web_sys::window()
            .and_then(|win| win.local_storage().ok().flatten())
            .and_then(|storage| storage.get_item(&self.key).ok().flatten())
            .filter(|token| !token.is_empty())
    }
}
