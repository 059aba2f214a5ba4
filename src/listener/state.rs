// DANS : src/listener/state.rs

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Ensemble borné des signatures déjà vues. Jamais relu par `get`, donc la plus ancienne est évincée en premier.
#[derive(Debug)]
pub struct SignatureCache {
    seen: LruCache<String, ()>,
}

impl SignatureCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { seen: LruCache::new(capacity) }
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.seen.contains(signature)
    }

    /// Retourne `false` si la signature était déjà connue.
    pub fn insert(&mut self, signature: &str) -> bool {
        if self.seen.contains(signature) {
            return false;
        }
        self.seen.put(signature.to_string(), ());
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.seen.cap().get()
    }
}

/// Remet le drapeau "en vol" à faux quand il sort de portée, y compris sur panic.
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// L'état de déduplication du listener : un seul pipeline en vol, et les signatures récentes.
#[derive(Debug)]
pub struct ListenerState {
    in_flight: Arc<AtomicBool>,
    processed: SignatureCache,
}

impl ListenerState {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
            processed: SignatureCache::new(cache_capacity),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// `None` si une exécution est déjà en cours.
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { flag: self.in_flight.clone() })
    }

    pub fn already_processed(&self, signature: &str) -> bool {
        self.processed.contains(signature)
    }

    pub fn remember(&mut self, signature: &str) -> bool {
        self.processed.insert(signature)
    }

    pub fn processed(&self) -> &SignatureCache {
        &self.processed
    }
}
