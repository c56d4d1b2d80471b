#![allow(dead_code)]

use async_trait::async_trait;
use auto_publisher::config::{LookupStrategy, SelectorSet, StepTimeouts};
use auto_publisher::destination::DestinationSearch;
use auto_publisher::driver::{
    Browser, BrowserSession, Control, FileSelection, PendingFileSelection, SessionOptions,
    WaitCondition,
};
use auto_publisher::error::DriverResult;
use auto_publisher::{
    ContentType, DestinationResolver, DestinationSuggestion, DriverError, EventBus, EventSink,
    SiteProfile, StatusEvent, UploadJobConfig, UploadSessionDriver,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Something the scripted page saw the session do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Navigate(String),
    Fill { selector: String, value: String },
    Clear(String),
    Click(String),
    Arm,
    Supply(usize),
}

#[derive(Default)]
struct Page {
    present: HashSet<String>,
    rendered: HashMap<String, Vec<String>>,
    calls: Vec<Call>,
    armed: Option<oneshot::Sender<()>>,
    supplies: usize,
    fail_on_supply: Option<usize>,
    cancel_on_supply: Option<(usize, CancellationToken)>,
}

/// A browser session backed by a scripted page: a set of selectors that
/// match, optional rendered suggestion texts, and a log of every call.
#[derive(Clone, Default)]
pub struct FakeSession {
    page: Arc<Mutex<Page>>,
}

impl FakeSession {
    /// A page on which every selector of the default profile is present.
    pub fn complete() -> Self {
        let profile = SiteProfile::default();
        let session = Self::default();
        {
            let mut page = session.page.lock().unwrap();
            let sets = [
                &profile.account_input,
                &profile.continue_button,
                &profile.secret_input,
                &profile.login_submit,
                &profile.login_confirmation,
                &profile.publish_menu,
                &profile.publish_entry,
                &profile.publish_surface,
                &profile.file_input,
                &profile.photo_drop_target,
                &profile.video_drop_target,
                &profile.generic_click,
                &profile.price_input,
                &profile.description_input,
                &profile.destination_input,
                &profile.destination_static,
                &profile.location_input,
                &profile.date_input,
                &profile.publish_button,
            ];
            for set in sets {
                page.present.extend(set.iter().map(str::to_string));
            }
        }
        session
    }

    pub fn remove(&self, selectors: &SelectorSet) -> &Self {
        let mut page = self.page.lock().unwrap();
        for selector in selectors.iter() {
            page.present.remove(selector);
        }
        self
    }

    pub fn render(&self, selector: &str, texts: &[&str]) -> &Self {
        self.page.lock().unwrap().rendered.insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn fail_on_supply(&self, n: usize) -> &Self {
        self.page.lock().unwrap().fail_on_supply = Some(n);
        self
    }

    pub fn cancel_on_supply(&self, n: usize, token: CancellationToken) -> &Self {
        self.page.lock().unwrap().cancel_on_supply = Some((n, token));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.page.lock().unwrap().calls.clone()
    }

    pub fn supplied(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Supply(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn clicked(&self, id: &str) -> bool {
        self.calls().contains(&Call::Click(id.to_string()))
    }

    pub fn filled(&self, selector: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Fill { selector: s, value } if s == selector => Some(value),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.page.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, url: &str, _wait: WaitCondition, _timeout: Duration) -> DriverResult<()> {
        self.record(Call::Navigate(url.to_string()));
        Ok(())
    }

    async fn wait_for_control(
        &self,
        selectors: &SelectorSet,
        timeout: Duration,
    ) -> DriverResult<Control> {
        let page = self.page.lock().unwrap();
        selectors
            .iter()
            .find(|selector| page.present.contains(*selector))
            .map(|selector| Control {
                id: selector.to_string(),
                selector: selector.to_string(),
                text: String::new(),
            })
            .ok_or_else(|| DriverError::timeout(selectors.iter().collect::<Vec<_>>().join(", "), timeout))
    }

    async fn fill(&self, control: &Control, value: &str) -> DriverResult<()> {
        self.record(Call::Fill {
            selector: control.selector.clone(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn clear(&self, control: &Control) -> DriverResult<()> {
        self.record(Call::Clear(control.selector.clone()));
        Ok(())
    }

    async fn click(&self, control: &Control) -> DriverResult<()> {
        let mut page = self.page.lock().unwrap();
        page.calls.push(Call::Click(control.id.clone()));
        if let Some(armed) = page.armed.take() {
            let _ = armed.send(());
        }
        Ok(())
    }

    async fn arm_file_selection(&self, timeout: Duration) -> DriverResult<PendingFileSelection> {
        let (tx, rx) = oneshot::channel();
        {
            let mut page = self.page.lock().unwrap();
            page.calls.push(Call::Arm);
            page.armed = Some(tx);
        }
        let session = self.clone();
        let pending: PendingFileSelection = Box::pin(async move {
            match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(())) => {
                    let selection: Box<dyn FileSelection> = Box::new(FakeSelection { session });
                    Ok(selection)
                }
                _ => Err(DriverError::timeout("file chooser", timeout)),
            }
        });
        Ok(pending)
    }

    async fn locate_all(&self, selectors: &SelectorSet) -> DriverResult<Vec<Control>> {
        let page = self.page.lock().unwrap();
        let mut controls = Vec::new();
        for selector in selectors.iter() {
            if let Some(texts) = page.rendered.get(selector) {
                controls.extend(texts.iter().enumerate().map(|(i, text)| Control {
                    id: format!("{}#{}", selector, i),
                    selector: selector.to_string(),
                    text: text.clone(),
                }));
            }
        }
        Ok(controls)
    }
}

struct FakeSelection {
    session: FakeSession,
}

#[async_trait]
impl FileSelection for FakeSelection {
    async fn supply_files(&self, paths: &[PathBuf]) -> DriverResult<()> {
        let mut page = self.session.page.lock().unwrap();
        page.supplies += 1;
        let n = page.supplies;
        if page.fail_on_supply == Some(n) {
            return Err(DriverError::InvalidResponse(format!("upload {} rejected", n)));
        }
        page.calls.push(Call::Supply(paths.len()));
        if let Some((at, token)) = &page.cancel_on_supply {
            if *at == n {
                token.cancel();
            }
        }
        Ok(())
    }
}

pub struct FakeBrowser {
    pub session: FakeSession,
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_session(&self, _options: &SessionOptions) -> DriverResult<Arc<dyn BrowserSession>> {
        Ok(Arc::new(self.session.clone()))
    }
}

/// Returns the same labels for every query and strategy.
pub struct FixedSearch(pub Vec<&'static str>);

#[async_trait]
impl DestinationSearch for FixedSearch {
    async fn search(&self, _query: &str, _strategy: &LookupStrategy) -> Vec<DestinationSuggestion> {
        self.0
            .iter()
            .map(|label| DestinationSuggestion {
                label: label.to_string(),
                value: label.to_lowercase(),
            })
            .collect()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<StatusEvent>>,
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &StatusEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn test_profile() -> SiteProfile {
    SiteProfile {
        timeouts: StepTimeouts::immediate(),
        ..SiteProfile::default()
    }
}

pub fn driver(session: &FakeSession, labels: Vec<&'static str>) -> UploadSessionDriver {
    driver_with_profile(session, labels, test_profile(), EventBus::new())
}

pub fn driver_with_profile(
    session: &FakeSession,
    labels: Vec<&'static str>,
    profile: SiteProfile,
    events: EventBus,
) -> UploadSessionDriver {
    let resolver = DestinationResolver::new(
        Arc::new(FixedSearch(labels)),
        profile.lookup_strategies.clone(),
    );
    let browser = FakeBrowser {
        session: session.clone(),
    };
    UploadSessionDriver::new(Arc::new(browser), resolver, profile, events)
}

pub fn job(folder: &Path, content_type: ContentType, batch_size: usize) -> UploadJobConfig {
    UploadJobConfig {
        account_id: "me@example.com".to_string(),
        secret: "hunter2".to_string(),
        folder_path: folder.to_path_buf(),
        content_type,
        price: 12.0,
        description: None,
        destination_query: "Studio".to_string(),
        batch_size,
        poll_interval_ms: 60_000,
        max_files_per_check: 500,
        location: None,
        date: None,
        exclude_patterns: Vec::new(),
    }
}

pub fn fake_files(n: usize) -> Vec<PathBuf> {
    (0..n)
        .map(|i| PathBuf::from(format!("/photos/img_{:03}.jpg", i)))
        .collect()
}

/// Write `n` empty files named `{prefix}_{i}.{ext}` into `dir`.
pub fn touch_files(dir: &Path, prefix: &str, ext: &str, n: usize) -> Vec<PathBuf> {
    (0..n)
        .map(|i| {
            let path = dir.join(format!("{}_{:03}.{}", prefix, i, ext));
            std::fs::write(&path, b"").unwrap();
            path
        })
        .collect()
}
