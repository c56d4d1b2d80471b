//! W3C WebDriver backend (chromedriver, geckodriver, Selenium) over HTTP.

use super::{
    Browser, BrowserSession, Control, FileSelection, PendingFileSelection, SessionOptions,
    WaitCondition,
};
use crate::config::SelectorSet;
use crate::error::{DriverError, DriverResult};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct WebDriverBrowser {
    client: reqwest::Client,
    endpoint: String,
}

impl WebDriverBrowser {
    /// Connect to a running WebDriver server and check that it accepts new
    /// sessions.
    pub async fn launch(endpoint: impl Into<String>) -> DriverResult<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::new();

        let status = send(&client, Method::GET, &format!("{}/status", endpoint), None).await?;
        if !status["ready"].as_bool().unwrap_or(false) {
            return Err(DriverError::InvalidResponse(format!(
                "webdriver at {} is not ready: {}",
                endpoint, status["message"]
            )));
        }

        tracing::info!(endpoint = %endpoint, "Connected to webdriver");
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn new_session(&self, options: &SessionOptions) -> DriverResult<Arc<dyn BrowserSession>> {
        let value = send(
            &self.client,
            Method::POST,
            &format!("{}/session", self.endpoint),
            Some(capabilities(options)),
        )
        .await?;

        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| DriverError::InvalidResponse("missing sessionId".to_string()))?;
        tracing::info!(session_id, headless = options.headless, "Browser session started");

        Ok(Arc::new(WebDriverSession {
            inner: Arc::new(SessionInner {
                client: self.client.clone(),
                base: format!("{}/session/{}", self.endpoint, session_id),
            }),
        }))
    }
}

fn capabilities(options: &SessionOptions) -> Value {
    let (width, height) = options.window_size;
    let mut args = vec![format!("--window-size={},{}", width, height)];
    if options.headless {
        args.push("--headless=new".to_string());
    }
    if let Some(user_agent) = &options.user_agent {
        args.push(format!("--user-agent={}", user_agent));
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

/// Send one WebDriver command and unwrap its `value`.
async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> DriverResult<Value> {
    let request = client.request(method, url);
    let request = match body {
        Some(body) => request.json(&body),
        None => request,
    };

    let response = request.send().await?;
    let status = response.status();
    let mut payload: Value = response.json().await?;
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if !status.is_success() {
        return Err(DriverError::Protocol {
            error: value["error"].as_str().unwrap_or("unknown error").to_string(),
            message: value["message"].as_str().unwrap_or_default().to_string(),
        });
    }
    Ok(value)
}

#[derive(Clone)]
pub struct WebDriverSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: reqwest::Client,
    base: String,
}

impl WebDriverSession {
    async fn get(&self, path: &str) -> DriverResult<Value> {
        let url = format!("{}{}", self.inner.base, path);
        send(&self.inner.client, Method::GET, &url, None).await
    }

    async fn post(&self, path: &str, body: Value) -> DriverResult<Value> {
        let url = format!("{}{}", self.inner.base, path);
        send(&self.inner.client, Method::POST, &url, Some(body)).await
    }

    async fn find_all(&self, selector: &str) -> DriverResult<Vec<String>> {
        let value = self
            .post("/elements", json!({ "using": "css selector", "value": selector }))
            .await?;
        Ok(value
            .as_array()
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|el| el[ELEMENT_KEY].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn text(&self, id: &str) -> DriverResult<String> {
        let value = self.get(&format!("/element/{}/text", id)).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, id: &str, name: &str) -> DriverResult<Option<String>> {
        let value = self.get(&format!("/element/{}/attribute/{}", id, name)).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn ready_state(&self) -> DriverResult<String> {
        let value = self
            .post(
                "/execute/sync",
                json!({ "script": "return document.readyState;", "args": [] }),
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn find_first(&self, selectors: &SelectorSet) -> DriverResult<Option<Control>> {
        for selector in selectors.iter() {
            if let Some(id) = self.find_all(selector).await?.into_iter().next() {
                let text = self.text(&id).await.unwrap_or_default();
                return Ok(Some(Control {
                    id,
                    selector: selector.to_string(),
                    text,
                }));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str, wait: WaitCondition, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        self.post("/url", json!({ "url": url })).await?;

        loop {
            let state = self.ready_state().await?;
            let reached = match wait {
                WaitCondition::Load => state == "complete",
                WaitCondition::DomContentLoaded => state == "interactive" || state == "complete",
            };
            if reached {
                tracing::debug!(url, "Navigation finished");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::timeout(format!("navigation to {}", url), timeout));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_control(&self, selectors: &SelectorSet, timeout: Duration) -> DriverResult<Control> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(control) = self.find_first(selectors).await? {
                return Ok(control);
            }
            if Instant::now() >= deadline {
                return Err(DriverError::timeout(selectors.0.join(", "), timeout));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn fill(&self, control: &Control, value: &str) -> DriverResult<()> {
        self.post(&format!("/element/{}/value", control.id), json!({ "text": value }))
            .await?;
        Ok(())
    }

    async fn clear(&self, control: &Control) -> DriverResult<()> {
        self.post(&format!("/element/{}/clear", control.id), json!({}))
            .await?;
        Ok(())
    }

    async fn click(&self, control: &Control) -> DriverResult<()> {
        // Clicking a file input would open a native dialog WebDriver cannot
        // drive; paths are sent to the input directly instead.
        if self.attribute(&control.id, "type").await?.as_deref() == Some("file") {
            tracing::debug!(selector = %control.selector, "Skipping click on file input");
            return Ok(());
        }
        self.post(&format!("/element/{}/click", control.id), json!({}))
            .await?;
        Ok(())
    }

    async fn arm_file_selection(&self, timeout: Duration) -> DriverResult<PendingFileSelection> {
        let pending: PendingFileSelection = Box::pin(open_file_selection(self.clone(), timeout));
        Ok(pending)
    }

    async fn locate_all(&self, selectors: &SelectorSet) -> DriverResult<Vec<Control>> {
        let mut controls = Vec::new();
        for selector in selectors.iter() {
            for id in self.find_all(selector).await? {
                let text = self.text(&id).await.unwrap_or_default();
                controls.push(Control {
                    id,
                    selector: selector.to_string(),
                    text,
                });
            }
        }
        Ok(controls)
    }
}

async fn open_file_selection(
    session: WebDriverSession,
    timeout: Duration,
) -> DriverResult<Box<dyn FileSelection>> {
    let selectors = SelectorSet::new(["input[type='file']"]);
    let control = session.wait_for_control(&selectors, timeout).await?;
    let selection: Box<dyn FileSelection> = Box::new(WebDriverFileSelection {
        session,
        element: control.id,
    });
    Ok(selection)
}

struct WebDriverFileSelection {
    session: WebDriverSession,
    element: String,
}

#[async_trait]
impl FileSelection for WebDriverFileSelection {
    async fn supply_files(&self, paths: &[PathBuf]) -> DriverResult<()> {
        let text = paths
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join("\n");
        self.session
            .post(&format!("/element/{}/value", self.element), json!({ "text": text }))
            .await?;
        Ok(())
    }
}
