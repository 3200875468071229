//! Routing tests with an instrumented engine.
//!
//! The dispatcher clones its engine once per pool, so an engine that
//! numbers its clones can report which pool's execution unit handled a
//! task. These tests verify:
//! - Session init reaches all three units with the same key material
//! - The three priority classes land on three distinct units
//! - A priority class is sticky: repeated tasks hit the same unit

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use cryptnode_core::{
    CipherEngine, CryptoDispatcher, DispatcherConfig, EngineError, Priority, SessionKey,
};

/// Engine whose clones are numbered and which logs every key import.
struct RecordingEngine {
    next_instance: Arc<AtomicUsize>,
    instance: usize,
    imports: Arc<Mutex<Vec<(usize, Vec<u8>)>>>,
}

impl RecordingEngine {
    fn new() -> Self {
        Self {
            next_instance: Arc::new(AtomicUsize::new(1)),
            instance: 0,
            imports: Arc::new(Mutex::new(Vec::new())),
        }
    }

}

impl Clone for RecordingEngine {
    fn clone(&self) -> Self {
        Self {
            next_instance: Arc::clone(&self.next_instance),
            instance: self.next_instance.fetch_add(1, Ordering::SeqCst),
            imports: Arc::clone(&self.imports),
        }
    }
}

impl CipherEngine for RecordingEngine {
    type Key = Vec<u8>;

    fn import_key(&self, material: &[u8]) -> Result<Self::Key, EngineError> {
        self.imports.lock().unwrap().push((self.instance, material.to_vec()));
        Ok(material.to_vec())
    }

    fn seal(&self, _key: &Self::Key, _plaintext: &[u8]) -> Result<String, EngineError> {
        Ok(self.instance.to_string())
    }

    fn open(&self, _key: &Self::Key, _packed: &str) -> Result<Vec<u8>, EngineError> {
        Ok(self.instance.to_string().into_bytes())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn init_broadcasts_key_to_all_three_units() {
    let engine = RecordingEngine::new();
    let imports = engine.imports.clone();
    let dispatcher = CryptoDispatcher::new(DispatcherConfig::default(), engine);

    dispatcher.init_session("s1", SessionKey::new(vec![0x11; 32])).await.unwrap();

    // Init is fire-and-forget; a completed probe on each pool proves its
    // unit drained the import that was queued ahead of it.
    for priority in [Priority::High, Priority::Medium, Priority::Low] {
        dispatcher.encrypt("s1", b"probe".to_vec(), priority).await.unwrap();
    }

    let seen = imports.lock().unwrap().clone();
    let mut instances: Vec<usize> = seen.iter().map(|(instance, _)| *instance).collect();
    instances.sort_unstable();
    instances.dedup();
    assert_eq!(instances.len(), 3, "all three units imported the key: {seen:?}");
    assert!(seen.iter().all(|(_, material)| material == &vec![0x11u8; 32]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn priorities_route_to_distinct_units() {
    let dispatcher = CryptoDispatcher::new(DispatcherConfig::default(), RecordingEngine::new());
    dispatcher.init_session("s1", SessionKey::new(vec![0x11; 32])).await.unwrap();

    let mut units = Vec::new();
    for priority in [Priority::High, Priority::Medium, Priority::Low] {
        let unit = dispatcher.encrypt("s1", b"probe".to_vec(), priority).await.unwrap();
        units.push(unit);
    }

    let mut distinct = units.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 3, "each priority has its own unit: {units:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn priority_routing_is_sticky() {
    let dispatcher = CryptoDispatcher::new(DispatcherConfig::default(), RecordingEngine::new());
    dispatcher.init_session("s1", SessionKey::new(vec![0x11; 32])).await.unwrap();

    let first = dispatcher.encrypt("s1", b"a".to_vec(), Priority::Low).await.unwrap();
    let second = dispatcher.encrypt("s1", b"b".to_vec(), Priority::Low).await.unwrap();
    let decrypting = dispatcher.decrypt("s1", "c".to_string(), Priority::Low).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(decrypting, first.as_bytes());
}
