use std::sync::Arc;

use crate::engine::BookingEngine;
use crate::observability::metrics::Metrics;
use crate::store::{BookingStore, InMemoryBookingStore};

pub struct AppState {
    pub engine: BookingEngine,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        Self::with_store(Arc::new(InMemoryBookingStore::new()), event_buffer_size)
    }

    pub fn with_store(store: Arc<dyn BookingStore>, event_buffer_size: usize) -> Self {
        let metrics = Metrics::new();

        Self {
            engine: BookingEngine::new(store, metrics.clone(), event_buffer_size),
            metrics,
        }
    }
}
