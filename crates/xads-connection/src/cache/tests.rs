//! Tests for XA connection cache functionality

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use xads_core::{
    ConnectionManagerId, Credential, EnlistedConnection, EnlistmentAdapter, Result,
    XaConnection, XaDataSource, XadsError,
};

use super::cache::XaConnectionCache;
use super::config::PoolConfig;
use super::managed::ReleaseMode;
use super::stats::CacheStats;

/// Mock physical connection for testing
struct MockXaConnection {
    #[allow(dead_code)]
    id: usize,
    closed: AtomicBool,
    fail_close: bool,
}

impl MockXaConnection {
    fn new(id: usize, fail_close: bool) -> Self {
        Self {
            id,
            closed: AtomicBool::new(false),
            fail_close,
        }
    }
}

#[async_trait]
impl XaConnection for MockXaConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(XadsError::Closed("socket already reset".into()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Mock data source that counts connections opened
struct MockXaDataSource {
    counter: AtomicUsize,
    fail: AtomicBool,
    fail_close: AtomicBool,
    delay: Option<Duration>,
    principals: Mutex<Vec<Option<String>>>,
}

impl MockXaDataSource {
    fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            delay: None,
            principals: Mutex::new(Vec::new()),
        }
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    async fn open(&self, principal: Option<&str>) -> Result<Arc<dyn XaConnection>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(XadsError::ConnectionAcquisitionFailed(
                "connection refused".into(),
            ));
        }
        self.principals.lock().push(principal.map(str::to_string));
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        let fail_close = self.fail_close.load(Ordering::SeqCst);
        Ok(Arc::new(MockXaConnection::new(id, fail_close)))
    }
}

#[async_trait]
impl XaDataSource for MockXaDataSource {
    async fn xa_connection(&self) -> Result<Arc<dyn XaConnection>> {
        self.open(None).await
    }

    async fn xa_connection_as(
        &self,
        principal: Option<&str>,
        _secret: Option<&str>,
    ) -> Result<Arc<dyn XaConnection>> {
        self.open(principal).await
    }
}

/// Enlisted handle produced by the mock adapter
struct MockEnlistedConnection {
    xa_connection: Arc<dyn XaConnection>,
    connection_manager: ConnectionManagerId,
}

impl EnlistedConnection for MockEnlistedConnection {
    fn xa_connection(&self) -> &Arc<dyn XaConnection> {
        &self.xa_connection
    }

    fn connection_manager(&self) -> &ConnectionManagerId {
        &self.connection_manager
    }
}

/// Mock adapter that records the connection manager it was given
struct MockAdapter {
    wrapped: AtomicUsize,
    fail: AtomicBool,
    managers: Mutex<Vec<ConnectionManagerId>>,
}

impl MockAdapter {
    fn new() -> Self {
        Self {
            wrapped: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            managers: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EnlistmentAdapter for MockAdapter {
    async fn wrap(
        &self,
        xa_connection: Arc<dyn XaConnection>,
        connection_manager: &ConnectionManagerId,
    ) -> Result<Arc<dyn EnlistedConnection>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(XadsError::Enlistment("no active transaction manager".into()));
        }
        self.wrapped.fetch_add(1, Ordering::SeqCst);
        self.managers.lock().push(connection_manager.clone());
        Ok(Arc::new(MockEnlistedConnection {
            xa_connection,
            connection_manager: connection_manager.clone(),
        }))
    }
}

/// Captures formatted log output for assertions
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Install a warn-level subscriber for the current thread
fn capture_warnings() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    (buffer, tracing::subscriber::set_default(subscriber))
}

fn cache_with(
    config: PoolConfig,
    data_source: Arc<MockXaDataSource>,
    adapter: Arc<MockAdapter>,
) -> XaConnectionCache {
    XaConnectionCache::new(config, data_source, adapter)
}

fn pooled_cache() -> (XaConnectionCache, Arc<MockXaDataSource>, Arc<MockAdapter>) {
    let data_source = Arc::new(MockXaDataSource::new());
    let adapter = Arc::new(MockAdapter::new());
    let cache = cache_with(PoolConfig::new(true), data_source.clone(), adapter.clone());
    (cache, data_source, adapter)
}

// =============================================================================
// PoolConfig tests
// =============================================================================

#[test]
fn test_pool_config_default() {
    let config = PoolConfig::default();
    assert!(!config.enabled());
    assert_eq!(config.connection_manager().as_str(), "default");
}

#[test]
fn test_pool_config_with_connection_manager() {
    let config = PoolConfig::new(true).with_connection_manager("orders-db");
    assert!(config.enabled());
    assert_eq!(config.connection_manager(), &ConnectionManagerId::new("orders-db"));
}

#[test]
fn test_pool_config_serialization() {
    let config = PoolConfig::new(true).with_connection_manager("orders-db");
    let json = serde_json::to_string(&config).expect("serialize");
    assert!(json.contains("connection-manager"));
    let deserialized: PoolConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(deserialized, config);

    let partial: PoolConfig = serde_json::from_str(r#"{"enabled":true}"#).expect("deserialize");
    assert!(partial.enabled());
    assert_eq!(partial.connection_manager().as_str(), "default");
}

// =============================================================================
// CacheStats tests
// =============================================================================

#[test]
fn test_cache_stats_hit_ratio() {
    let stats = CacheStats::new(1, 1, 3);
    assert!((stats.hit_ratio() - 0.75).abs() < 0.001);
    assert!((CacheStats::default().hit_ratio() - 0.0).abs() < 0.001);
}

#[test]
fn test_cache_stats_serialization() {
    let stats = CacheStats::new(2, 3, 4);
    let json = serde_json::to_string(&stats).expect("serialize");
    let deserialized: CacheStats = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(stats, deserialized);
}

// =============================================================================
// XaConnectionCache tests
// =============================================================================

#[tokio::test]
async fn test_pooled_acquire_reuses_physical_connection() {
    let (cache, data_source, _adapter) = pooled_cache();
    let credential = Credential::new("app", "secret");

    let first = cache.acquire(&credential).await.expect("acquire");
    assert_eq!(first.release_mode(), ReleaseMode::Retain);
    first.close().await.expect("close");
    assert!(first.is_closed());
    assert!(!first.xa_connection().is_closed());

    let second = cache.acquire(&credential).await.expect("acquire");
    assert!(second.is_same_connection(&first));
    assert!(Arc::ptr_eq(first.xa_connection(), second.xa_connection()));
    assert!(!second.is_closed());

    assert_eq!(data_source.count(), 1);
    let stats = cache.stats();
    assert_eq!(stats.entries(), 1);
    assert_eq!(stats.opened(), 1);
    assert_eq!(stats.reused(), 1);
}

#[tokio::test]
async fn test_unpooled_acquire_opens_new_physical_connection() {
    let data_source = Arc::new(MockXaDataSource::new());
    let adapter = Arc::new(MockAdapter::new());
    let cache = cache_with(PoolConfig::new(false), data_source.clone(), adapter);
    let credential = Credential::new("app", "secret");

    let first = cache.acquire(&credential).await.expect("acquire");
    assert_eq!(first.release_mode(), ReleaseMode::Close);
    first.close().await.expect("close");
    assert!(first.xa_connection().is_closed());

    let second = cache.acquire(&credential).await.expect("acquire");
    assert!(!second.is_same_connection(&first));
    assert!(!Arc::ptr_eq(first.xa_connection(), second.xa_connection()));

    assert_eq!(data_source.count(), 2);
    assert_eq!(cache.stats().entries(), 0);
}

#[tokio::test]
async fn test_distinct_credentials_get_distinct_connections() {
    let (cache, data_source, _adapter) = pooled_cache();

    let app = cache.acquire(&Credential::new("app", "a")).await.expect("acquire");
    let ops = cache.acquire(&Credential::new("ops", "b")).await.expect("acquire");
    let default = cache.acquire_default().await.expect("acquire");

    assert!(!app.is_same_connection(&ops));
    assert!(!app.is_same_connection(&default));
    assert_eq!(data_source.count(), 3);
    assert_eq!(cache.stats().entries(), 3);
    assert_eq!(
        *data_source.principals.lock(),
        vec![Some("app".to_string()), Some("ops".to_string()), None]
    );
}

#[tokio::test]
async fn test_shared_reuse_without_close() {
    let (cache, data_source, _adapter) = pooled_cache();
    let credential = Credential::new("app", "secret");

    let first = cache.acquire(&credential).await.expect("acquire");
    let second = cache.acquire(&credential).await.expect("acquire");

    assert!(first.is_same_connection(&second));
    assert_eq!(data_source.count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquire_creates_one_physical_connection() {
    let data_source = Arc::new(MockXaDataSource::with_delay(Duration::from_millis(20)));
    let adapter = Arc::new(MockAdapter::new());
    let cache = Arc::new(cache_with(
        PoolConfig::new(true),
        data_source.clone(),
        adapter.clone(),
    ));
    let credential = Credential::new("app", "secret");
    let barrier = Arc::new(tokio::sync::Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            let credential = credential.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                cache.acquire(&credential).await.expect("acquire")
            })
        })
        .collect();

    let mut connections = Vec::new();
    for handle in handles {
        connections.push(handle.await.expect("join"));
    }

    assert_eq!(data_source.count(), 1);
    assert_eq!(adapter.wrapped.load(Ordering::SeqCst), 1);
    assert!(
        connections
            .iter()
            .all(|conn| conn.is_same_connection(&connections[0]))
    );
    let stats = cache.stats();
    assert_eq!(stats.entries(), 1);
    assert_eq!(stats.reused(), 15);
}

#[tokio::test]
async fn test_failed_acquire_leaves_no_entry() {
    let (cache, data_source, _adapter) = pooled_cache();
    let credential = Credential::new("app", "secret");

    data_source.set_failing(true);
    let result = cache.acquire(&credential).await;
    assert!(matches!(
        result,
        Err(XadsError::ConnectionAcquisitionFailed(ref msg)) if msg == "connection refused"
    ));
    assert_eq!(cache.stats().entries(), 0);
    assert_eq!(cache.stats().opened(), 0);
    assert!(!cache.invalidate(&credential).await.expect("invalidate"));

    data_source.set_failing(false);
    let conn = cache.acquire(&credential).await.expect("acquire");
    assert!(!conn.is_closed());
    assert_eq!(cache.stats().entries(), 1);
}

#[tokio::test]
async fn test_enlistment_failure_closes_physical_connection() {
    let (cache, data_source, adapter) = pooled_cache();
    adapter.fail.store(true, Ordering::SeqCst);

    let result = cache.acquire(&Credential::new("app", "secret")).await;
    let err = result.err().expect("enlistment should fail");
    assert!(matches!(err, XadsError::Enlistment(_)));
    assert_eq!(data_source.count(), 1);
    assert_eq!(cache.stats().entries(), 0);

    adapter.fail.store(false, Ordering::SeqCst);
    let conn = cache.acquire(&Credential::new("app", "secret")).await.expect("acquire");
    assert_eq!(data_source.count(), 2);
    assert!(!conn.xa_connection().is_closed());
}

#[tokio::test]
async fn test_closed_physical_connection_is_replaced() {
    let (cache, data_source, _adapter) = pooled_cache();
    let credential = Credential::new("app", "secret");

    let first = cache.acquire(&credential).await.expect("acquire");
    first.xa_connection().close().await.expect("close physical");

    let second = cache.acquire(&credential).await.expect("acquire");
    assert!(!second.is_same_connection(&first));
    assert!(!second.xa_connection().is_closed());
    assert_eq!(data_source.count(), 2);
    assert_eq!(cache.stats().entries(), 1);
}

#[tokio::test]
async fn test_adapter_receives_connection_manager() {
    let data_source = Arc::new(MockXaDataSource::new());
    let adapter = Arc::new(MockAdapter::new());
    let config = PoolConfig::new(true).with_connection_manager("orders-db");
    let cache = cache_with(config, data_source, adapter.clone());

    let conn = cache.acquire_default().await.expect("acquire");
    assert_eq!(conn.connection_manager().as_str(), "orders-db");
    assert_eq!(
        *adapter.managers.lock(),
        vec![ConnectionManagerId::new("orders-db")]
    );
}

#[tokio::test]
async fn test_invalidate_closes_entry() {
    let (cache, data_source, _adapter) = pooled_cache();
    let credential = Credential::new("app", "secret");

    let conn = cache.acquire(&credential).await.expect("acquire");
    assert!(cache.invalidate(&credential).await.expect("invalidate"));
    assert!(conn.xa_connection().is_closed());
    assert_eq!(cache.stats().entries(), 0);
    assert!(!cache.invalidate(&credential).await.expect("invalidate"));

    let replacement = cache.acquire(&credential).await.expect("acquire");
    assert!(!replacement.is_same_connection(&conn));
    assert_eq!(data_source.count(), 2);
}

#[tokio::test]
async fn test_close_all_closes_every_entry() {
    let (cache, _data_source, _adapter) = pooled_cache();

    let app = cache.acquire(&Credential::new("app", "a")).await.expect("acquire");
    let ops = cache.acquire(&Credential::new("ops", "b")).await.expect("acquire");

    assert_eq!(cache.close_all().await, 2);
    assert!(app.xa_connection().is_closed());
    assert!(ops.xa_connection().is_closed());
    assert_eq!(cache.stats().entries(), 0);
    assert_eq!(cache.close_all().await, 0);
}

#[tokio::test]
async fn test_double_close_is_noop() {
    let data_source = Arc::new(MockXaDataSource::new());
    let adapter = Arc::new(MockAdapter::new());
    let cache = cache_with(PoolConfig::new(false), data_source, adapter);

    let conn = cache.acquire_default().await.expect("acquire");
    conn.close().await.expect("close");
    conn.close().await.expect("second close");
    assert!(conn.is_closed());
}

#[tokio::test]
async fn test_stale_close_failure_is_logged_and_replaced() {
    let (cache, data_source, _adapter) = pooled_cache();
    let credential = Credential::new("app", "secret");
    data_source.fail_close.store(true, Ordering::SeqCst);

    let first = cache.acquire(&credential).await.expect("acquire");
    assert!(first.xa_connection().close().await.is_err());
    assert!(first.xa_connection().is_closed());

    let (logs, _guard) = capture_warnings();
    let second = cache.acquire(&credential).await.expect("acquire");

    assert!(!second.is_same_connection(&first));
    assert_eq!(cache.stats().entries(), 1);
    let output = logs.contents();
    assert!(output.contains("failed to close stale cached connection"));
    assert!(output.contains("socket already reset"));
}

#[tokio::test]
async fn test_close_failure_after_enlistment_failure_is_logged() {
    let (cache, data_source, adapter) = pooled_cache();
    data_source.fail_close.store(true, Ordering::SeqCst);
    adapter.fail.store(true, Ordering::SeqCst);

    let (logs, _guard) = capture_warnings();
    let err = cache
        .acquire(&Credential::new("app", "secret"))
        .await
        .err()
        .expect("enlistment should fail");

    assert!(matches!(err, XadsError::Enlistment(_)));
    assert_eq!(cache.stats().entries(), 0);
    assert!(
        logs.contents()
            .contains("failed to close physical connection after enlistment failure")
    );
}

#[tokio::test]
async fn test_acquire_waiting_across_invalidate_gets_a_cached_connection() {
    let data_source = Arc::new(MockXaDataSource::with_delay(Duration::from_millis(50)));
    let adapter = Arc::new(MockAdapter::new());
    let cache = Arc::new(cache_with(
        PoolConfig::new(true),
        data_source.clone(),
        adapter,
    ));
    let credential = Credential::new("app", "secret");

    // first acquirer holds the slot while the physical connection opens
    let first = tokio::spawn({
        let cache = cache.clone();
        let credential = credential.clone();
        async move { cache.acquire(&credential).await.expect("acquire") }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // second acquirer queues on the same slot
    let second = tokio::spawn({
        let cache = cache.clone();
        let credential = credential.clone();
        async move { cache.acquire(&credential).await.expect("acquire") }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // invalidate removes the slot from the map and queues behind both
    let invalidated = tokio::spawn({
        let cache = cache.clone();
        let credential = credential.clone();
        async move { cache.invalidate(&credential).await.expect("invalidate") }
    });

    let first = first.await.expect("join");
    let second = second.await.expect("join");
    assert!(invalidated.await.expect("join"));

    assert!(first.xa_connection().is_closed());
    assert!(!second.is_same_connection(&first));
    assert!(!second.xa_connection().is_closed());
    assert_eq!(data_source.count(), 2);
    assert_eq!(cache.stats().entries(), 1);

    // the second connection is tracked by the cache and closed with it
    assert_eq!(cache.close_all().await, 1);
    assert!(second.xa_connection().is_closed());
    assert_eq!(cache.stats().entries(), 0);
}
