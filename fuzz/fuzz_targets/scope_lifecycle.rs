#![no_main]

use ferrous_target::{BeanCollection, MapScopeStore, ScopeContext, ScopeKey, ScopedProxy};
use libfuzzer_sys::fuzz_target;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let ids = Arc::new(AtomicU64::new(0));
    let counter = ids.clone();
    let mut beans = BeanCollection::new();
    beans.add_prototype("cart", move |_| counter.fetch_add(1, Ordering::SeqCst));

    let store = Arc::new(MapScopeStore::session());
    let proxy = ScopedProxy::<u64>::builder()
        .target_bean_name("cart")
        .bean_factory(beans.build())
        .store(store.clone())
        .build()
        .unwrap();

    // Model: which scopes are active and which instance each one holds
    let mut model: HashMap<u8, Option<u64>> = HashMap::new();

    for op in data {
        let scope = op >> 2 & 0x7;
        let key = ScopeKey::from(format!("s{}", scope));
        let ctx = ScopeContext::new().with_session(key.clone());
        match op & 0x3 {
            0 => {
                if store.begin_scope(key) {
                    model.insert(scope, None);
                }
            }
            1 => {
                store.end_scope(&key);
                model.remove(&scope);
            }
            2 => match (proxy.target_in(&ctx), model.get_mut(&scope)) {
                (Ok(id), Some(slot)) => {
                    if let Some(expected) = slot {
                        assert_eq!(*id, *expected);
                    }
                    *slot = Some(*id);
                }
                (Err(e), None) => assert!(e.is_scope_not_active()),
                (result, entry) => panic!("store and model disagree: {:?} vs {:?}", result.is_ok(), entry),
            },
            _ => match (proxy.remove_in(&ctx), model.get_mut(&scope)) {
                (Ok(()), Some(slot)) => *slot = None,
                (Err(e), None) => assert!(e.is_scope_not_active()),
                (result, entry) => panic!("store and model disagree: {:?} vs {:?}", result.is_ok(), entry),
            },
        }
    }
});
