/// Forwarding proxy tests
///
/// Covers `TargetProxy`, the `delegate_to_target!` adapter over the
/// different target sources, and the static/prototype/hot-swap sources.

use ferrous_target::{
    delegate_to_target, AlwaysStale, BeanCollection, HotSwappableTargetSource,
    PrototypeTargetSource, RefreshCheckDelay, RefreshableTargetSource, SingletonTargetSource,
    TargetError, TargetProxy, TargetResult, TargetSource,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

// ===== Capability trait =====

pub trait PriceList: Send + Sync {
    fn price(&self, sku: &str) -> Result<u32, TargetError>;
    fn revision(&self) -> Result<u32, TargetError>;
}

struct StaticPrices {
    revision: u32,
    markup: u32,
}

impl PriceList for StaticPrices {
    fn price(&self, sku: &str) -> Result<u32, TargetError> {
        if sku.is_empty() {
            return Err(TargetError::NotFound("empty sku".to_string()));
        }
        Ok(sku.len() as u32 * 100 + self.markup)
    }

    fn revision(&self) -> Result<u32, TargetError> {
        Ok(self.revision)
    }
}

delegate_to_target! {
    impl PriceList for TargetProxy<dyn PriceList> as dyn PriceList {
        fn price(&self, sku: &str) -> Result<u32, TargetError>;
        fn revision(&self) -> Result<u32, TargetError>;
    }
}

delegate_to_target! {
    impl PriceList for RefreshableTargetSource<dyn PriceList> as dyn PriceList {
        /// Price from the currently loaded list.
        fn price(&self, sku: &str) -> Result<u32, TargetError>;
        fn revision(&self) -> Result<u32, TargetError>;
    }
}

fn prices(revision: u32) -> Arc<dyn PriceList> {
    Arc::new(StaticPrices { revision, markup: revision })
}

/// Target source counting releases, to observe the get/release pairing.
struct CountingSource {
    target: Arc<dyn PriceList>,
    gets: AtomicUsize,
    releases: AtomicUsize,
}

impl TargetSource<dyn PriceList> for CountingSource {
    fn get_target(&self) -> TargetResult<Arc<dyn PriceList>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.target.clone())
    }

    fn release_target(&self, _target: &Arc<dyn PriceList>) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ===== TargetProxy =====

#[test]
fn test_proxy_forwards_arguments_and_results() {
    let proxy = TargetProxy::new(SingletonTargetSource::new(prices(7)));
    assert_eq!(proxy.price("abc").unwrap(), 307);
    assert_eq!(proxy.revision().unwrap(), 7);
}

#[test]
fn test_target_errors_pass_through_unchanged() {
    let proxy = TargetProxy::new(SingletonTargetSource::new(prices(1)));
    let err = proxy.price("").unwrap_err();
    assert!(matches!(err, TargetError::NotFound(ref m) if m == "empty sku"));
}

#[test]
fn test_every_call_releases_its_target() {
    let source = Arc::new(CountingSource {
        target: prices(1),
        gets: AtomicUsize::new(0),
        releases: AtomicUsize::new(0),
    });
    let proxy = TargetProxy::new(source.clone());

    proxy.price("a").unwrap();
    proxy.revision().unwrap();
    proxy.invoke(|p| p.revision()).unwrap().unwrap();

    assert_eq!(source.gets.load(Ordering::SeqCst), 3);
    assert_eq!(source.releases.load(Ordering::SeqCst), 3);
}

#[test]
fn test_source_failure_surfaces_before_target_runs() {
    let source = RefreshableTargetSource::<dyn PriceList>::builder()
        .name("prices")
        .loader(|| -> TargetResult<Arc<dyn PriceList>> {
            Err(TargetError::load("prices", "catalog offline"))
        })
        .build()
        .unwrap();
    let proxy = TargetProxy::new(source);

    let err = proxy.revision().unwrap_err();
    assert!(err.is_load_failure());
    assert!(err.to_string().contains("catalog offline"));

    let ran = AtomicU32::new(0);
    assert!(proxy.invoke(|_| ran.fetch_add(1, Ordering::SeqCst)).is_err());
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn test_proxy_clones_share_source() {
    let source = Arc::new(HotSwappableTargetSource::new(prices(1)));
    let proxy = TargetProxy::new(source.clone());
    let clone = proxy.clone();

    source.swap(prices(2));
    assert_eq!(proxy.revision().unwrap(), 2);
    assert_eq!(clone.revision().unwrap(), 2);
}

// ===== Delegation over a refreshable source =====

#[test]
fn test_refreshable_source_implements_capability() {
    let revision = Arc::new(AtomicU32::new(0));
    let counter = revision.clone();
    let source = RefreshableTargetSource::<dyn PriceList>::builder()
        .name("prices")
        .loader(move || Ok(prices(counter.fetch_add(1, Ordering::SeqCst) + 1)))
        .refresh_check_delay(RefreshCheckDelay::Always)
        .staleness(AlwaysStale)
        .build()
        .unwrap();

    assert_eq!(source.revision().unwrap(), 1);
    assert_eq!(source.revision().unwrap(), 2);
    assert_eq!(source.price("ab").unwrap(), 203);
}

// ===== Target sources =====

#[test]
fn test_singleton_source_is_static() {
    let source = SingletonTargetSource::new(prices(1));
    assert!(source.is_static());
    let a = source.get_target().unwrap();
    let b = source.get_target().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(TargetProxy::new(source).is_static());
}

#[test]
fn test_hot_swap_under_concurrent_readers() {
    let source = Arc::new(HotSwappableTargetSource::new(prices(0)));
    let proxy = TargetProxy::new(source.clone());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let proxy = proxy.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..200 {
                    let revision = proxy.revision().unwrap();
                    assert!(revision >= last);
                    last = revision;
                }
            })
        })
        .collect();

    for revision in 1..=50 {
        let old = source.swap(prices(revision));
        assert_eq!(old.revision().unwrap(), revision - 1);
    }
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(source.swap_count(), 50);
    assert_eq!(source.current().revision().unwrap(), 50);
}

#[test]
fn test_prototype_source_creates_per_call() {
    let mut beans = BeanCollection::new();
    beans.add_prototype("ticket", |_| AtomicU32::new(0));
    beans.add_singleton("config", String::from("shared"));
    let factory = beans.build();

    let source = PrototypeTargetSource::<AtomicU32>::from_bean_factory(&factory, "ticket").unwrap();
    let proxy = TargetProxy::new(source);
    for _ in 0..3 {
        let value = proxy.invoke(|t| t.fetch_add(1, Ordering::SeqCst) + 1).unwrap();
        assert_eq!(value, 1);
    }

    assert!(matches!(
        PrototypeTargetSource::<String>::from_bean_factory(&factory, "config"),
        Err(TargetError::SingletonNotAccepted(_))
    ));
    assert!(matches!(
        PrototypeTargetSource::<String>::from_bean_factory(&factory, "missing"),
        Err(TargetError::NotFound(_))
    ));
}
