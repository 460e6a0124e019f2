//! The host application's event surface.
//!
//! The host owns event delivery; the agent only subscribes. [`LocalEventBus`]
//! is the in-process bus used by the standalone binary.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::glog_trace;

/// Event fired by the host after it writes a file.
pub const FILE_SAVED_EVENT: &str = "file_manager:file_saved";

/// Fire-and-forget callback receiving the saved file's path.
pub type SaveHandler = Arc<dyn Fn(PathBuf) -> BoxFuture<'static, ()> + Send + Sync>;

pub trait EventBus {
    fn register(&mut self, event: &str, handler: SaveHandler);
}

#[derive(Default)]
pub struct LocalEventBus {
    handlers: HashMap<String, Vec<SaveHandler>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map(Vec::len).unwrap_or(0)
    }

    /// Deliver `path` to every handler of `event`, one after another.
    /// Returns how many handlers ran.
    pub async fn dispatch(&self, event: &str, path: PathBuf) -> usize {
        let Some(handlers) = self.handlers.get(event) else {
            glog_trace!("No handlers for event '{}'", event);
            return 0;
        };
        for handler in handlers {
            handler(path.clone()).await;
        }
        handlers.len()
    }
}

impl EventBus for LocalEventBus {
    fn register(&mut self, event: &str, handler: SaveHandler) {
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }
}
