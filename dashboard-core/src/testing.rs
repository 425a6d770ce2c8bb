//! In-memory dashboard used by the unit tests.

use crate::error::SessionError;
use crate::model::NetworkResponse;
use crate::session::{Element, Locator, Session};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub(crate) struct FakeDashboard {
    pub page: u32,
    pub total_pages: u32,
    pub present: HashSet<Locator>,
    pub inputs: HashMap<Locator, Arc<Mutex<FakeInput>>>,
    pub next_locator: Option<Locator>,
    /// Value of the next control's `disabled` attribute, when present.
    pub next_disabled: Option<String>,
    /// `src` of every iframe on the current document.
    pub frames: Vec<String>,
    pub responses: Vec<NetworkResponse>,
    /// Cancel the token once the given page has been extracted.
    pub cancel_after: Option<(u32, CancellationToken)>,
    pub intercept_clicks: bool,
    pub activation_fails: bool,
    pub payloads: HashMap<u32, Value>,
    pub script_error: bool,
    pub transport_down: bool,
    pub extracted_on: Vec<u32>,
    pub navigations: Vec<String>,
    pub direct_clicks: usize,
    pub programmatic_clicks: usize,
    pub closed: bool,
}

#[derive(Default)]
pub(crate) struct FakeInput {
    pub value: String,
    /// Keystrokes land reformatted, the way some date pickers rewrite input.
    pub mangle_typing: bool,
    /// Programmatic assignment is reverted by the widget.
    pub ignore_assign: bool,
    pub events: Vec<String>,
}

#[derive(Clone)]
pub(crate) struct FakeSession {
    pub dash: Arc<Mutex<FakeDashboard>>,
}

impl FakeSession {
    pub fn new(total_pages: u32) -> Self {
        Self {
            dash: Arc::new(Mutex::new(FakeDashboard {
                page: 1,
                total_pages,
                ..Default::default()
            })),
        }
    }

    pub fn with_present(self, selector: &str) -> Self {
        self.dash
            .lock()
            .unwrap()
            .present
            .insert(Locator::css(selector));
        self
    }

    pub fn with_next(self, locator: Locator) -> Self {
        self.dash.lock().unwrap().next_locator = Some(locator);
        self
    }

    pub fn with_payload(self, page: u32, payload: Value) -> Self {
        self.dash.lock().unwrap().payloads.insert(page, payload);
        self
    }

    pub fn add_input(&self, locator: Locator, input: FakeInput) -> Arc<Mutex<FakeInput>> {
        let input = Arc::new(Mutex::new(input));
        self.dash
            .lock()
            .unwrap()
            .inputs
            .insert(locator, input.clone());
        input
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeDashboard)) {
        f(&mut self.dash.lock().unwrap());
    }

    pub fn read<T>(&self, f: impl FnOnce(&FakeDashboard) -> T) -> T {
        f(&self.dash.lock().unwrap())
    }

    fn check_transport(&self) -> Result<(), SessionError> {
        if self.dash.lock().unwrap().transport_down {
            return Err(SessionError::Transport("websocket closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Session for FakeSession {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.check_transport()?;
        self.dash.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    async fn evaluate_script(&self, _code: &str, _args: Vec<Value>) -> Result<Value, SessionError> {
        self.check_transport()?;
        let mut dash = self.dash.lock().unwrap();
        if dash.script_error {
            return Err(SessionError::Script("TypeError: x is undefined".into()));
        }
        let page = dash.page;
        dash.extracted_on.push(page);
        if let Some((after, token)) = &dash.cancel_after {
            if *after == page {
                token.cancel();
            }
        }
        Ok(dash.payloads.get(&page).cloned().unwrap_or_else(|| json!({})))
    }

    async fn find(&self, locator: &Locator) -> Result<Vec<FakeElement>, SessionError> {
        self.check_transport()?;
        let dash = self.dash.lock().unwrap();
        if *locator == Locator::css("iframe[src]") {
            return Ok(dash.frames.iter().cloned().map(FakeElement::Frame).collect());
        }
        if dash.next_locator.as_ref() == Some(locator) {
            return Ok(vec![FakeElement::Next(self.dash.clone())]);
        }
        if let Some(input) = dash.inputs.get(locator) {
            return Ok(vec![FakeElement::Input(input.clone())]);
        }
        if dash.present.contains(locator) {
            return Ok(vec![FakeElement::Marker]);
        }
        Ok(Vec::new())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError> {
        self.check_transport()?;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn page_markup(&self) -> Result<String, SessionError> {
        self.check_transport()?;
        let page = self.dash.lock().unwrap().page;
        Ok(format!("<html><body>page {}</body></html>", page))
    }

    async fn network_responses(&self) -> Vec<NetworkResponse> {
        std::mem::take(&mut self.dash.lock().unwrap().responses)
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.dash.lock().unwrap().closed = true;
        Ok(())
    }
}

pub(crate) enum FakeElement {
    Marker,
    Frame(String),
    Next(Arc<Mutex<FakeDashboard>>),
    Input(Arc<Mutex<FakeInput>>),
}

/// `01/10/2021` typed into a mangling widget becomes `1/10/2021`.
fn mangle(text: &str) -> String {
    text.trim_start_matches('0').to_string()
}

#[async_trait]
impl Element for FakeElement {
    async fn text(&self) -> Result<String, SessionError> {
        Ok(match self {
            FakeElement::Input(input) => input.lock().unwrap().value.clone(),
            _ => String::new(),
        })
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, SessionError> {
        Ok(match (self, name) {
            (FakeElement::Frame(src), "src") => Some(src.clone()),
            (FakeElement::Next(dash), "disabled") => dash.lock().unwrap().next_disabled.clone(),
            (FakeElement::Next(dash), "aria-disabled") => {
                let dash = dash.lock().unwrap();
                Some((dash.page >= dash.total_pages).to_string())
            }
            _ => None,
        })
    }

    async fn scroll_into_view(&self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        if let FakeElement::Input(input) = self {
            input.lock().unwrap().value.clear();
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), SessionError> {
        if let FakeElement::Input(input) = self {
            let mut input = input.lock().unwrap();
            let typed = if input.mangle_typing {
                mangle(text)
            } else {
                text.to_string()
            };
            input.value.push_str(&typed);
        }
        Ok(())
    }

    async fn click(&self) -> Result<(), SessionError> {
        if let FakeElement::Next(dash) = self {
            let mut dash = dash.lock().unwrap();
            if dash.intercept_clicks {
                return Err(SessionError::ClickIntercepted("div.overlay".into()));
            }
            dash.direct_clicks += 1;
            dash.page += 1;
        }
        Ok(())
    }

    async fn property(&self, name: &str) -> Result<Option<String>, SessionError> {
        Ok(match (self, name) {
            (FakeElement::Input(input), "value") => Some(input.lock().unwrap().value.clone()),
            _ => None,
        })
    }

    async fn dispatch_events(&self, events: &[&str]) -> Result<(), SessionError> {
        if let FakeElement::Input(input) = self {
            let mut input = input.lock().unwrap();
            input.events.extend(events.iter().map(|e| e.to_string()));
        }
        Ok(())
    }

    async fn assign_value(&self, value: &str) -> Result<(), SessionError> {
        if let FakeElement::Input(input) = self {
            let mut input = input.lock().unwrap();
            if !input.ignore_assign {
                input.value = value.to_string();
            }
        }
        Ok(())
    }

    async fn activate(&self) -> Result<(), SessionError> {
        if let FakeElement::Next(dash) = self {
            let mut dash = dash.lock().unwrap();
            if dash.activation_fails {
                return Err(SessionError::StaleElement("next button detached".into()));
            }
            dash.programmatic_clicks += 1;
            dash.page += 1;
        }
        Ok(())
    }
}
