//! In-process host: tabs, frames and extension pages in one process.
//!
//! Every posted envelope is round-tripped through JSON, the same way the
//! browser structured-clones messages, and handed to the receiving realm's
//! listener on a fresh task.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use pixiebrix_protocols::{Endpoint, FrameId, TabId};
use tracing::{debug, trace};

use crate::envelope::Envelope;
use crate::host::{DeliveryError, FrameInfo, FrameTopology, HostPort, MessageListener};

#[derive(Default)]
pub struct LocalHost {
    listeners: DashMap<Endpoint, Weak<dyn MessageListener>>,
    tabs: DashMap<TabId, BTreeMap<FrameId, FrameInfo>>,
    pages: RwLock<BTreeSet<String>>,
    invalidated: RwLock<HashSet<Endpoint>>,
    duplicate_delivery: AtomicBool,
    posts: AtomicUsize,
}

impl LocalHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make a frame known to the topology.
    pub fn open_frame(&self, tab_id: TabId, frame_id: FrameId, url: Option<&str>) {
        self.tabs.entry(tab_id).or_default().insert(
            frame_id,
            FrameInfo {
                frame_id,
                url: url.map(str::to_string),
            },
        );
    }

    /// Forget a frame and drop its listener.
    pub fn close_frame(&self, tab_id: TabId, frame_id: FrameId) {
        if let Some(mut frames) = self.tabs.get_mut(&tab_id) {
            frames.remove(&frame_id);
        }
        self.listeners.remove(&Endpoint::frame(tab_id, frame_id));
    }

    pub fn close_tab(&self, tab_id: TabId) {
        if let Some((_, frames)) = self.tabs.remove(&tab_id) {
            for frame_id in frames.keys() {
                self.listeners.remove(&Endpoint::frame(tab_id, *frame_id));
            }
        }
    }

    pub fn open_page(&self, name: &str) {
        self.pages.write().insert(name.to_string());
    }

    pub fn close_page(&self, name: &str) {
        self.pages.write().remove(name);
        self.listeners.remove(&Endpoint::page(name));
    }

    /// Tear down the realm at `endpoint`, as an extension reload would.
    pub fn invalidate(&self, endpoint: &Endpoint) {
        self.invalidated.write().insert(endpoint.clone());
        if let Some((_, listener)) = self.listeners.remove(endpoint) {
            if let Some(listener) = listener.upgrade() {
                listener.on_context_invalidated();
            }
        }
        debug!(%endpoint, "Invalidated context");
    }

    /// Deliver every envelope twice.
    pub fn set_duplicate_delivery(&self, enabled: bool) {
        self.duplicate_delivery.store(enabled, Ordering::SeqCst);
    }

    /// Envelopes posted so far, including refused ones.
    pub fn post_count(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    fn listener(&self, endpoint: &Endpoint) -> Option<Arc<dyn MessageListener>> {
        self.listeners.get(endpoint).and_then(|listener| listener.upgrade())
    }
}

#[async_trait]
impl HostPort for LocalHost {
    async fn post(&self, to: &Endpoint, envelope: Envelope) -> Result<(), DeliveryError> {
        self.posts.fetch_add(1, Ordering::SeqCst);

        if self.invalidated.read().contains(envelope.sender()) {
            return Err(DeliveryError::ContextInvalidated);
        }

        let bytes =
            serde_json::to_vec(&envelope).map_err(|e| DeliveryError::Serialization(e.to_string()))?;
        let cloned: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        let listener = self
            .listener(to)
            .ok_or_else(|| DeliveryError::NoReceiver(to.clone()))?;

        trace!(%to, id = cloned.id(), bytes = bytes.len(), "Delivering envelope");
        let copies = if self.duplicate_delivery.load(Ordering::SeqCst) {
            2
        } else {
            1
        };
        for _ in 0..copies {
            let listener = listener.clone();
            let envelope = cloned.clone();
            tokio::spawn(async move { listener.on_message(envelope) });
        }
        Ok(())
    }

    fn listen(&self, endpoint: Endpoint, listener: Arc<dyn MessageListener>) {
        self.invalidated.write().remove(&endpoint);
        self.listeners.insert(endpoint, Arc::downgrade(&listener));
    }

    fn unlisten(&self, endpoint: &Endpoint) {
        self.listeners.remove(endpoint);
    }
}

#[async_trait]
impl FrameTopology for LocalHost {
    async fn list_frames(&self, tab_id: TabId) -> Vec<FrameInfo> {
        self.tabs
            .get(&tab_id)
            .map(|frames| frames.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn list_pages(&self) -> Vec<String> {
        self.pages.read().iter().cloned().collect()
    }
}
