//! Browser session capabilities consumed by the engine.
//!
//! The engine only talks to [`Session`] and [`Element`]; [`CdpSession`] is the
//! Chrome DevTools implementation over chromiumoxide. Tests substitute an
//! in-memory dashboard.

use crate::error::SessionError;
use crate::model::NetworkResponse;
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{self, EventResponseReceived};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A DOM query the session resolves to zero or more elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{}", s),
            Locator::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

#[async_trait]
pub trait Session: Send + Sync {
    type Element: Element;

    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Evaluate a function-shaped script (`(a, b) => ...`) with JSON arguments.
    async fn evaluate_script(&self, code: &str, args: Vec<Value>) -> Result<Value, SessionError>;

    async fn find(&self, locator: &Locator) -> Result<Vec<Self::Element>, SessionError>;

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;

    async fn page_markup(&self) -> Result<String, SessionError>;

    /// Data-bearing responses recorded since the last call.
    async fn network_responses(&self) -> Vec<NetworkResponse>;

    async fn close(&self) -> Result<(), SessionError>;
}

#[async_trait]
pub trait Element: Send + Sync {
    async fn text(&self) -> Result<String, SessionError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, SessionError>;

    async fn scroll_into_view(&self) -> Result<(), SessionError>;

    async fn clear(&self) -> Result<(), SessionError>;

    async fn type_text(&self, text: &str) -> Result<(), SessionError>;

    /// Direct pointer click. Fails with [`SessionError::ClickIntercepted`] when
    /// something else covers the click point.
    async fn click(&self) -> Result<(), SessionError>;

    /// Live DOM property (e.g. `value`), stringified.
    async fn property(&self, name: &str) -> Result<Option<String>, SessionError>;

    /// Fire bubbling DOM events of the given types, in order.
    async fn dispatch_events(&self, events: &[&str]) -> Result<(), SessionError>;

    /// Assign `value` through the native setter, bypassing keyboard input.
    async fn assign_value(&self, value: &str) -> Result<(), SessionError>;

    /// Programmatic `element.click()`, immune to overlays.
    async fn activate(&self) -> Result<(), SessionError>;
}

pub(crate) fn from_cdp(err: CdpError) -> SessionError {
    match err {
        CdpError::JavascriptException(details) => SessionError::Script(details.text.clone()),
        CdpError::ScrollingFailed(msg) => SessionError::StaleElement(msg),
        CdpError::NotFound => SessionError::StaleElement("node not found".to_string()),
        CdpError::Chrome(e) => SessionError::Script(e.to_string()),
        other => SessionError::Transport(other.to_string()),
    }
}

/// Wrap a page-level script so the result always crosses CDP as a JSON string.
fn wrap_page_script(code: &str, args: &[Value]) -> Result<String, SessionError> {
    let args = serde_json::to_string(args).map_err(|e| SessionError::Script(e.to_string()))?;
    Ok(format!(
        "(() => {{ const r = ({})(...{}); return JSON.stringify(r === undefined ? null : r); }})()",
        code, args
    ))
}

/// URL fragments of the responses worth keeping (model queries, data APIs).
const DATA_URL_KEYWORDS: [&str; 4] = ["query", "data", "api", "execute"];

fn is_data_url(url: &str) -> bool {
    let url = url.to_lowercase();
    DATA_URL_KEYWORDS.iter().any(|k| url.contains(k))
}

/// Session over one chromiumoxide page.
pub struct CdpSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: JoinHandle<()>,
    responses: Arc<Mutex<Vec<NetworkResponse>>>,
}

impl CdpSession {
    pub fn new(browser: Browser, page: Page, handler: JoinHandle<()>) -> Self {
        Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            responses: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start recording data-bearing responses received by the page.
    ///
    /// The listener ends on its own once the handler loop stops.
    pub async fn capture_network(&self) -> Result<(), SessionError> {
        self.page
            .execute(network::EnableParams::default())
            .await
            .map_err(from_cdp)?;
        let mut events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(from_cdp)?;

        let buffer = self.responses.clone();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let response = &event.response;
                if !is_data_url(&response.url) {
                    continue;
                }
                tracing::debug!(url = %response.url, status = response.status, "Data response received");
                buffer.lock().await.push(NetworkResponse {
                    url: response.url.clone(),
                    status: response.status,
                    mime_type: response.mime_type.clone(),
                    request_id: event.request_id.inner().clone(),
                });
            }
        });
        Ok(())
    }
}

#[async_trait]
impl Session for CdpSession {
    type Element = CdpElement;

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.page.goto(url).await.map_err(from_cdp)?;
        Ok(())
    }

    async fn evaluate_script(&self, code: &str, args: Vec<Value>) -> Result<Value, SessionError> {
        let js = wrap_page_script(code, &args)?;
        let raw: String = self
            .page
            .evaluate_expression(js)
            .await
            .map_err(from_cdp)?
            .into_value()
            .map_err(|e| SessionError::Script(format!("non-string script result: {:?}", e)))?;
        serde_json::from_str(&raw).map_err(|e| SessionError::Script(e.to_string()))
    }

    async fn find(&self, locator: &Locator) -> Result<Vec<CdpElement>, SessionError> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.as_str()).await,
            Locator::XPath(expression) => self.page.find_xpaths(expression.as_str()).await,
        };
        match found {
            Ok(elements) => Ok(elements.into_iter().map(CdpElement::new).collect()),
            Err(err) => match from_cdp(err) {
                // Lookups that resolve to nothing surface as protocol errors.
                SessionError::Transport(msg) => Err(SessionError::Transport(msg)),
                _ => Ok(Vec::new()),
            },
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page.screenshot(params).await.map_err(from_cdp)
    }

    async fn page_markup(&self) -> Result<String, SessionError> {
        self.page.content().await.map_err(from_cdp)
    }

    async fn network_responses(&self) -> Vec<NetworkResponse> {
        std::mem::take(&mut *self.responses.lock().await)
    }

    async fn close(&self) -> Result<(), SessionError> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            browser.close().await.map_err(from_cdp)?;
            let _ = browser.wait().await;
        }
        self.handler.abort();
        Ok(())
    }
}

const HIT_TEST_JS: &str = r#"function() {
    const r = this.getBoundingClientRect();
    const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);
    if (!hit) return 'nothing at click point';
    if (hit === this || this.contains(hit)) return null;
    const cls = hit.getAttribute('class') || '';
    return hit.tagName.toLowerCase() + (cls ? '.' + cls.split(/\s+/).join('.') : '');
}"#;

pub struct CdpElement {
    inner: chromiumoxide::Element,
}

impl CdpElement {
    fn new(inner: chromiumoxide::Element) -> Self {
        Self { inner }
    }

    async fn call(&self, function: String) -> Result<Option<Value>, SessionError> {
        let ret = self
            .inner
            .call_js_fn(function, false)
            .await
            .map_err(from_cdp)?;
        if let Some(details) = ret.exception_details {
            return Err(SessionError::Script(details.text));
        }
        Ok(ret.result.value)
    }
}

fn js_string(value: &str) -> String {
    // serde_json string escaping is valid JS string literal syntax
    Value::String(value.to_string()).to_string()
}

#[async_trait]
impl Element for CdpElement {
    async fn text(&self) -> Result<String, SessionError> {
        Ok(self
            .inner
            .inner_text()
            .await
            .map_err(from_cdp)?
            .unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, SessionError> {
        self.inner.attribute(name).await.map_err(from_cdp)
    }

    async fn scroll_into_view(&self) -> Result<(), SessionError> {
        self.call("function() { this.scrollIntoView({block: 'center'}); }".to_string())
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        self.call(
            "function() { this.focus(); if ('value' in this) { this.select && this.select(); this.value = ''; } }"
                .to_string(),
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), SessionError> {
        self.inner.focus().await.map_err(from_cdp)?;
        self.inner.type_str(text).await.map_err(from_cdp)?;
        Ok(())
    }

    async fn click(&self) -> Result<(), SessionError> {
        if let Some(Value::String(blocker)) = self.call(HIT_TEST_JS.to_string()).await? {
            return Err(SessionError::ClickIntercepted(blocker));
        }
        self.inner.click().await.map_err(from_cdp)?;
        Ok(())
    }

    async fn property(&self, name: &str) -> Result<Option<String>, SessionError> {
        let value = self
            .call(format!(
                "function() {{ const v = this[{}]; return v == null ? null : String(v); }}",
                js_string(name)
            ))
            .await?;
        Ok(match value {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    async fn dispatch_events(&self, events: &[&str]) -> Result<(), SessionError> {
        let names = serde_json::to_string(events).map_err(|e| SessionError::Script(e.to_string()))?;
        self.call(format!(
            "function() {{ for (const t of {}) {{ this.dispatchEvent(new Event(t, {{bubbles: true}})); }} }}",
            names
        ))
        .await?;
        Ok(())
    }

    async fn assign_value(&self, value: &str) -> Result<(), SessionError> {
        self.call(format!(
            r#"function() {{
                const proto = Object.getPrototypeOf(this);
                const desc = Object.getOwnPropertyDescriptor(proto, 'value');
                if (desc && desc.set) {{ desc.set.call(this, {v}); }} else {{ this.value = {v}; }}
            }}"#,
            v = js_string(value)
        ))
        .await?;
        Ok(())
    }

    async fn activate(&self) -> Result<(), SessionError> {
        self.call("function() { this.click(); }".to_string()).await?;
        Ok(())
    }
}
