use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Keeps every event it receives, in order.
///
/// Clones share the same buffer, so one clone can be handed to the
/// [`SubscriberSet`](crate::SubscriberSet) and another kept for inspection.
#[derive(Clone, Debug, Default)]
pub struct DispatchLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl DispatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.lock().iter().map(|e| e.kind).collect()
    }

    /// Action names of `ActionStarting` events, i.e. the dispatch order.
    pub fn started_actions(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| e.kind == EventKind::ActionStarting)
            .filter_map(|e| e.action.as_deref().map(str::to_string))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Subscribe for DispatchLog {
    async fn on_event(&self, event: &Event) {
        self.lock().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "dispatch-log"
    }
}
