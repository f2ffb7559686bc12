use async_trait::async_trait;
use pretty_assertions::assert_eq;
use price_monitor::fetchers::FetcherRegistry;
use price_monitor::models::{AlertEvent, History, HistoryRecord, Identity, Site, TrackedItem};
use price_monitor::notifier::Notifier;
use price_monitor::storage::{HistoryStore, JsonFileStore};
use price_monitor::utils::http::create_client;
use price_monitor::{Monitor, MonitorError, NotificationError, PersistenceError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<AlertEvent>>,
}

#[async_trait]
impl Notifier for Recorder {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Records the stored price of each alerted identity at delivery time, then
/// fails delivery.
struct StoreInspector {
    store: JsonFileStore,
    stored_at_delivery: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for StoreInspector {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        let history = self.store.load().await.unwrap();
        let stored = history.get(&event.identity).unwrap().last_price.to_string();
        self.stored_at_delivery.lock().unwrap().push(stored);
        Err(NotificationError::Rejected {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "down".into(),
        })
    }
}

struct ReadOnlyStore {
    history: History,
}

#[async_trait]
impl HistoryStore for ReadOnlyStore {
    async fn load(&self) -> Result<History, PersistenceError> {
        Ok(self.history.clone())
    }

    async fn save(&self, _history: &History) -> Result<(), PersistenceError> {
        Err(PersistenceError::Write {
            path: "/read-only/price_history.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

async fn mount_price(server: &MockServer, page: &str, price: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(r#"<p class="price_color">£{}</p>"#, price)),
        )
        .mount(server)
        .await;
}

fn registry() -> FetcherRegistry {
    let client = create_client("price-monitor-tests", Duration::from_secs(5)).unwrap();
    let mut registry = FetcherRegistry::with_defaults(client, 1).unwrap();
    registry.alias("127.0.0.1", Site::ToScrape);
    registry
}

fn item(server: &MockServer, page: &str, label: &str) -> TrackedItem {
    TrackedItem::new(Some(format!("{}{}", server.uri(), page).as_str()), Some(label), &[]).unwrap()
}

async fn seed(path: &Path, records: &[(&Identity, &str)]) {
    let history: History = records
        .iter()
        .map(|(identity, price)| HistoryRecord {
            identity: (*identity).clone(),
            last_price: price.parse().unwrap(),
            last_seen: chrono::Utc::now(),
        })
        .collect();
    JsonFileStore::new(path).save(&history).await.unwrap();
}

#[tokio::test]
async fn run_records_alerts_and_persists() {
    let server = MockServer::start().await;
    mount_price(&server, "/a", "10.00").await;
    mount_price(&server, "/b", "25.00").await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let history_path = dir.path().join("price_history.json");

    let items = vec![
        item(&server, "/a?ref=newsletter", "Book A"),
        item(&server, "/b", "Book B"),
        item(&server, "/gone", "Gone"),
        TrackedItem::new(Some("https://shop.example.com/p/1"), Some("Unknown shop"), &[]).unwrap(),
    ];
    seed(&history_path, &[(&items[0].identity, "12.00"), (&items[2].identity, "5.00")]).await;

    let notifier = Arc::new(Recorder::default());
    let store = Arc::new(JsonFileStore::new(&history_path));
    let monitor = Monitor::new(registry(), store.clone(), notifier.clone())
        .with_notify_delay(Duration::ZERO);

    let summary = monitor.run_once(&items).await.unwrap();

    assert_eq!(summary.checked, 4);
    assert_eq!(summary.resolved, 2);
    assert_eq!(summary.unresolved, vec![items[2].identity.clone(), items[3].identity.clone()]);
    assert_eq!(summary.first_sightings, 1);
    assert_eq!(summary.alerts_sent, 1);
    assert_eq!(summary.alerts_failed, 0);

    {
        let events = notifier.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label, "Book A");
        assert_eq!(events[0].old_price.to_string(), "12.00");
        assert_eq!(events[0].new_price.to_string(), "10.00");
        assert_eq!(events[0].url, format!("{}/a", server.uri()));
    }

    let history = store.load().await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history.get(&items[0].identity).unwrap().last_price.to_string(), "10.00");
    assert_eq!(history.get(&items[1].identity).unwrap().last_price.to_string(), "25.00");
    assert_eq!(history.get(&items[2].identity).unwrap().last_price.to_string(), "5.00");

    let second = monitor.run_once(&items).await.unwrap();
    assert_eq!(second.alerts_sent, 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(notifier.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn history_is_saved_before_delivery() {
    let server = MockServer::start().await;
    mount_price(&server, "/a", "8.50").await;

    let dir = tempfile::tempdir().unwrap();
    let history_path = dir.path().join("price_history.json");
    let items = vec![item(&server, "/a", "Book A")];
    seed(&history_path, &[(&items[0].identity, "10.00")]).await;

    let notifier = Arc::new(StoreInspector {
        store: JsonFileStore::new(&history_path),
        stored_at_delivery: Mutex::new(Vec::new()),
    });
    let monitor = Monitor::new(
        registry(),
        Arc::new(JsonFileStore::new(&history_path)),
        notifier.clone(),
    )
    .with_notify_delay(Duration::ZERO);

    let summary = monitor.run_once(&items).await.unwrap();
    assert_eq!(summary.alerts_failed, 1);
    assert_eq!(*notifier.stored_at_delivery.lock().unwrap(), vec!["8.50".to_string()]);

    // The failed delivery is not retried on the next run
    let again = monitor.run_once(&items).await.unwrap();
    assert_eq!(again.alerts_failed + again.alerts_sent, 0);
}

#[tokio::test]
async fn save_failure_aborts_before_notifying() {
    let server = MockServer::start().await;
    mount_price(&server, "/a", "8.50").await;
    let items = vec![item(&server, "/a", "Book A")];

    let store = ReadOnlyStore {
        history: [HistoryRecord {
            identity: items[0].identity.clone(),
            last_price: "10.00".parse().unwrap(),
            last_seen: chrono::Utc::now(),
        }]
        .into_iter()
        .collect(),
    };
    let notifier = Arc::new(Recorder::default());
    let monitor = Monitor::new(registry(), Arc::new(store), notifier.clone());

    let result = monitor.run_once(&items).await;

    assert!(matches!(result, Err(MonitorError::Persistence(_))));
    assert!(notifier.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_history_aborts_before_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let history_path = dir.path().join("price_history.json");
    std::fs::write(&history_path, "{\"truncated\": ").unwrap();

    let monitor = Monitor::new(
        registry(),
        Arc::new(JsonFileStore::new(&history_path)),
        Arc::new(Recorder::default()),
    );

    let result = monitor.run_once(&[item(&server, "/a", "Book A")]).await;
    assert!(matches!(
        result,
        Err(MonitorError::Persistence(PersistenceError::Corrupt { .. }))
    ));
}
