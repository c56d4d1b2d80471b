mod common;

use auto_publisher::{ContentType, EventBus, EventKind, MemoryStore, WatchScheduler};
use common::{driver, driver_with_profile, fake_files, job, test_profile, touch_files, Call, FakeSession, RecordingSink};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const FILE_INPUT: &str = "input[type='file']";
const PUBLISH: &str = "button[data-testid='publish']";
const PRICE: &str = "input[name='price']";
const OPTIONS: &str = "[role='listbox'] [role='option']";

fn publish_clicks(session: &FakeSession) -> usize {
    session
        .calls()
        .iter()
        .filter(|call| **call == Call::Click(PUBLISH.to_string()))
        .count()
}

fn recorded_events() -> (EventBus, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (EventBus::new().with_sink(sink.clone()), sink)
}

fn warnings(sink: &RecordingSink) -> Vec<String> {
    sink.events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.kind == EventKind::Warning)
        .map(|e| e.message.clone())
        .collect()
}

#[tokio::test]
async fn test_publishes_in_batches() {
    let session = FakeSession::complete();
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(250), &CancellationToken::new())
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.total_files, 250);
    assert_eq!(result.batches_completed, 3);
    assert_eq!(session.supplied(), vec![100, 100, 50]);
    assert_eq!(session.filled(PRICE), vec!["12", "12", "12"]);
    assert_eq!(publish_clicks(&session), 3);
}

#[tokio::test]
async fn test_failure_in_second_batch_fails_run() {
    let session = FakeSession::complete();
    session.fail_on_supply(2);
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(250), &CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(!result.cancelled);
    assert_eq!(result.batches_completed, 1);
    assert_eq!(result.total_files, 100);
    assert!(result.error.unwrap().contains("upload 2 rejected"));
    assert_eq!(publish_clicks(&session), 1);
}

#[tokio::test]
async fn test_cancel_stops_at_next_batch() {
    let session = FakeSession::complete();
    let cancel = CancellationToken::new();
    session.cancel_on_supply(1, cancel.clone());
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(250), &cancel)
        .await;

    assert!(!result.success);
    assert!(result.cancelled);
    assert_eq!(result.batches_completed, 1);
    assert_eq!(session.supplied(), vec![100]);
    assert_eq!(session.calls().iter().filter(|c| **c == Call::Arm).count(), 1);
}

#[tokio::test]
async fn test_invalid_config_never_opens_browser() {
    let session = FakeSession::complete();
    let mut config = job(Path::new("/photos"), ContentType::Photo, 100);
    config.secret.clear();

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("secret"));
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn test_empty_file_list_completes() {
    let session = FakeSession::complete();
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &[], &CancellationToken::new())
        .await;

    assert!(result.success);
    assert_eq!(result.batches_completed, 0);
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn test_login_timeout_fails_authentication() {
    let session = FakeSession::complete();
    session.remove(&test_profile().login_confirmation);
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("authentication failed"));
    assert!(!session.calls().contains(&Call::Arm));
    assert_eq!(session.filled("input[name='password']"), vec!["hunter2"]);
}

#[tokio::test]
async fn test_missing_price_field_fails() {
    let session = FakeSession::complete();
    session.remove(&test_profile().price_input);
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("'price'"));
    assert_eq!(publish_clicks(&session), 0);
}

#[tokio::test]
async fn test_missing_publish_button_is_a_warning() {
    let session = FakeSession::complete();
    session.remove(&test_profile().publish_button);
    let (events, sink) = recorded_events();
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver_with_profile(&session, vec!["Studio A"], test_profile(), events)
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(result.success);
    assert_eq!(result.batches_completed, 1);
    assert!(warnings(&sink).iter().any(|w| w.contains("no publish button")));
}

#[tokio::test]
async fn test_missing_optional_fields_are_skipped() {
    let session = FakeSession::complete();
    session.remove(&test_profile().location_input);
    let (events, sink) = recorded_events();
    let mut config = job(Path::new("/photos"), ContentType::Photo, 100);
    config.description = Some("Golden hour".to_string());
    config.location = Some("Lisbon".to_string());

    let result = driver_with_profile(&session, vec!["Studio A"], test_profile(), events)
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(result.success);
    assert_eq!(session.filled("textarea[name='description']"), vec!["Golden hour"]);
    assert!(warnings(&sink).iter().any(|w| w.contains("location")));
}

#[tokio::test]
async fn test_unresolved_destination_fails_before_publish() {
    let session = FakeSession::complete();
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec![])
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("no destination matches 'Studio'"));
    assert_eq!(publish_clicks(&session), 0);
}

#[tokio::test]
async fn test_file_selection_armed_before_click() {
    let session = FakeSession::complete();
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    let calls = session.calls();
    let armed = calls.iter().position(|c| *c == Call::Arm).unwrap();
    let clicked = calls
        .iter()
        .position(|c| *c == Call::Click(FILE_INPUT.to_string()))
        .unwrap();
    assert!(armed < clicked);
}

#[tokio::test]
async fn test_falls_back_to_drop_target() {
    let session = FakeSession::complete();
    session.remove(&test_profile().file_input);
    let config = job(Path::new("/videos"), ContentType::Video, 20);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(result.success);
    assert!(session.clicked("[data-testid='video-dropzone']"));
    assert!(!session.clicked("[data-testid='photo-dropzone']"));
}

#[tokio::test]
async fn test_falls_back_to_page_click() {
    let profile = test_profile();
    let session = FakeSession::complete();
    session
        .remove(&profile.file_input)
        .remove(&profile.photo_drop_target);
    let (events, sink) = recorded_events();
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver_with_profile(&session, vec!["Studio A"], profile, events)
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(result.success);
    assert!(session.clicked("main"));
    assert!(warnings(&sink).iter().any(|w| w.contains("clicking the page")));
}

#[tokio::test]
async fn test_no_way_to_select_files_fails() {
    let profile = test_profile();
    let session = FakeSession::complete();
    session
        .remove(&profile.file_input)
        .remove(&profile.photo_drop_target)
        .remove(&profile.generic_click);
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("file selection surface (batch 1)"));
    assert!(session.supplied().is_empty());
}

#[tokio::test]
async fn test_clicks_matching_rendered_suggestion() {
    let session = FakeSession::complete();
    session.render(OPTIONS, &["Beach", "Studio A"]);
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver(&session, vec!["Studio A"])
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(result.success);
    assert_eq!(session.filled("input[name='tag']"), vec!["Studio"]);
    assert!(session.clicked(&format!("{}#1", OPTIONS)));
    assert!(!session.clicked(&format!("{}#0", OPTIONS)));
}

#[tokio::test]
async fn test_first_rendered_suggestion_when_none_match() {
    let session = FakeSession::complete();
    session.render(".suggestion", &["Forest", "Lake"]);
    let (events, sink) = recorded_events();
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver_with_profile(&session, vec!["Studio A"], test_profile(), events)
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(result.success);
    assert!(session.clicked(".suggestion#0"));
    assert!(warnings(&sink).iter().any(|w| w.contains("choosing 'Forest'")));
}

#[tokio::test]
async fn test_rendered_suggestions_only_from_first_variant() {
    let session = FakeSession::complete();
    session
        .render(OPTIONS, &["Beach"])
        .render(".suggestion", &["Studio A"]);
    let (events, sink) = recorded_events();
    let config = job(Path::new("/photos"), ContentType::Photo, 100);

    let result = driver_with_profile(&session, vec!["Studio A"], test_profile(), events)
        .run(&config, &fake_files(3), &CancellationToken::new())
        .await;

    assert!(result.success);
    assert!(session.clicked(&format!("{}#0", OPTIONS)));
    assert!(!session.clicked(".suggestion#0"));
    assert!(warnings(&sink).iter().any(|w| w.contains("choosing 'Beach'")));
}

#[tokio::test]
async fn test_watch_marks_nothing_when_second_batch_fails() {
    let dir = tempfile::tempdir().unwrap();
    touch_files(dir.path(), "img", "jpg", 150);

    let session = FakeSession::complete();
    session.fail_on_supply(2);
    let runner = Arc::new(driver(&session, vec!["Studio A"]));
    let scheduler = WatchScheduler::new(runner, Arc::new(MemoryStore::new()), EventBus::new());

    let config = job(dir.path(), ContentType::Photo, 100);
    assert!(scheduler.start(config).await.success);

    let status = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let status = scheduler.status().await;
            if status.cycles > 0 {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    scheduler.stop().await;

    let last = status.last_result.unwrap();
    assert!(!last.success);
    assert_eq!(last.batches_completed, 1);
    assert_eq!(status.uploaded_count, 0);
    assert_eq!(session.supplied(), vec![100]);
}
