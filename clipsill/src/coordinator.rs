//! RefreshCoordinator - owns the published clipboard history view
//!
//! Refresh pipeline: fetch → truncate → hash + favorite lookup → stable
//! favorites-first partition → classify/build (new ids only) → reconcile →
//! publish.
//!
//! Concurrency Model:
//! - A single worker task drains a FIFO queue of triggers, so exactly one
//!   refresh body runs at a time and triggers are never coalesced
//! - Each trigger returns a RefreshHandle that resolves once its refresh ran
//! - The view is published through a watch channel; readers see either the
//!   old or the new list, never a partial one
//! - Event listening is tied to a CancellationToken cancelled by a DropGuard,
//!   so deactivating (or dropping the coordinator) unsubscribes
//! - Uses a global FALLBACK_RUNTIME when created outside any tokio runtime

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::config::HistorySettings;
use crate::content_detection::classify;
use crate::favorites::FavoritesStore;
use crate::hashing::content_hash;
use crate::interface::{
    ClipboardEntry, ClipboardEvent, ClipboardHistory, HistoryError, HistoryItemsStatus,
    SettingKey, SettingsProvider,
};
use crate::models::{build_view_entry, BuildOptions, EntryIdentity, ViewEntry};
use crate::reconcile::{reconcile_entries, Keyed, ReconcileStats};

/// Process-wide runtime for coordinators created outside any tokio runtime.
/// Never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("clipsill-refresh")
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// Get a tokio runtime handle - uses current runtime if available, otherwise global fallback
fn runtime_handle() -> tokio::runtime::Handle {
    tokio::runtime::Handle::try_current().unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
}

/// RAII guard that cancels a token when dropped
struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Ordered, immutable snapshot of the history list
pub type PublishedView = Arc<[Arc<ViewEntry>]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Why a refresh was queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    ContentChanged,
    HistoryChanged,
    HistoryEnabledChanged,
    SettingChanged(SettingKey),
    Activated,
    FavoriteToggled,
    Manual,
}

impl From<ClipboardEvent> for RefreshTrigger {
    fn from(event: ClipboardEvent) -> Self {
        match event {
            ClipboardEvent::ContentChanged => RefreshTrigger::ContentChanged,
            ClipboardEvent::HistoryChanged => RefreshTrigger::HistoryChanged,
            ClipboardEvent::HistoryEnabledChanged => RefreshTrigger::HistoryEnabledChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// History is turned off; the view was emptied
    Disabled,
    /// Enumeration failed or was refused; the view was emptied
    Unavailable,
    Published {
        retained: usize,
        built: usize,
        dropped: usize,
        total: usize,
    },
}

impl RefreshOutcome {
    fn published(stats: ReconcileStats, total: usize) -> Self {
        RefreshOutcome::Published {
            retained: stats.retained,
            built: stats.built,
            dropped: stats.dropped,
            total,
        }
    }
}

/// Completion of one queued refresh.
/// Resolves to [`HistoryError::Stopped`] if the worker is gone.
#[must_use = "dropping the handle does not cancel the refresh, but its outcome is lost"]
pub struct RefreshHandle {
    done: oneshot::Receiver<RefreshOutcome>,
}

impl Future for RefreshHandle {
    type Output = Result<RefreshOutcome, HistoryError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.done)
            .poll(cx)
            .map(|result| result.map_err(|_| HistoryError::Stopped))
    }
}

struct RefreshRequest {
    trigger: RefreshTrigger,
    done: oneshot::Sender<RefreshOutcome>,
}

fn enqueue(queue: &mpsc::UnboundedSender<RefreshRequest>, trigger: RefreshTrigger) -> RefreshHandle {
    let (done, rx) = oneshot::channel();
    if queue.send(RefreshRequest { trigger, done }).is_err() {
        tracing::warn!(?trigger, "Refresh worker stopped, trigger dropped");
    }
    RefreshHandle { done: rx }
}

/// Keep the first `max` entries, in order
pub fn truncate_history<T>(mut items: Vec<T>, max: usize) -> Vec<T> {
    items.truncate(max);
    items
}

/// Stable partition: favorites first, each group keeping its relative order
pub fn partition_favorites<T>(items: Vec<T>, is_favorite: impl Fn(&T) -> bool) -> Vec<T> {
    let (mut favorites, rest): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| is_favorite(item));
    favorites.extend(rest);
    favorites
}

/// Raw entry with its identity, waiting to be reconciled
struct PendingEntry {
    entry: Arc<dyn ClipboardEntry>,
    identity: EntryIdentity,
}

impl Keyed for PendingEntry {
    fn key(&self) -> &str {
        self.entry.id()
    }
}

/// Classify and build one entry, degrading to the generic view on failure
async fn build_entry(pending: PendingEntry, options: BuildOptions) -> Arc<ViewEntry> {
    let PendingEntry { entry, identity } = pending;

    let kind = match classify(entry.as_ref()).await {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!(entry_id = %entry.id(), error = %err, step = "classify", "Showing generic view");
            return Arc::new(ViewEntry::unknown(entry, identity));
        }
    };

    match build_view_entry(entry.clone(), kind, identity.clone(), options).await {
        Ok(view) => Arc::new(view),
        Err(err) => {
            tracing::warn!(
                entry_id = %entry.id(),
                kind = %kind,
                error = %err,
                step = "build",
                "Showing generic view"
            );
            Arc::new(ViewEntry::unknown(entry, identity))
        }
    }
}

struct Shared {
    history: Arc<dyn ClipboardHistory>,
    settings: Arc<dyn SettingsProvider>,
    favorites: FavoritesStore,
    view: watch::Sender<PublishedView>,
    state: watch::Sender<RefreshState>,
}

impl Shared {
    fn publish(&self, entries: Vec<Arc<ViewEntry>>) {
        self.view.send_replace(Arc::from(entries));
    }

    async fn refresh(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        if trigger == RefreshTrigger::SettingChanged(SettingKey::HidePasswords) {
            // every entry must be rebuilt with the new redaction setting
            self.publish(Vec::new());
        }

        let settings = HistorySettings::load(self.settings.as_ref());

        if !self.history.is_history_enabled() {
            tracing::debug!(?trigger, "Clipboard history disabled");
            self.publish(Vec::new());
            return RefreshOutcome::Disabled;
        }

        let items = match self.history.history_items().await {
            Ok(items) if items.status == HistoryItemsStatus::Success => items.items,
            Ok(items) => {
                tracing::warn!(?trigger, status = ?items.status, "Clipboard history not available");
                self.publish(Vec::new());
                return RefreshOutcome::Unavailable;
            }
            Err(err) => {
                tracing::warn!(?trigger, error = %err, step = "fetch", "Failed to read clipboard history");
                self.publish(Vec::new());
                return RefreshOutcome::Unavailable;
            }
        };

        let items = truncate_history(items, settings.maximum_history_count);

        let mut pending = Vec::with_capacity(items.len());
        for entry in items {
            let content_hash = content_hash(entry.as_ref()).await;
            let is_favorite = self.favorites.is_favorite(content_hash.as_ref());
            pending.push(PendingEntry {
                entry,
                identity: EntryIdentity { content_hash, is_favorite },
            });
        }
        let pending = partition_favorites(pending, |p| p.identity.is_favorite);

        let previous = self.view.borrow().clone();
        let options = BuildOptions { hide_passwords: settings.hide_passwords };
        let (entries, stats) =
            reconcile_entries(&previous[..], pending, |p: PendingEntry| build_entry(p, options)).await;

        for entry in &entries {
            entry.set_favorite(self.favorites.is_favorite(entry.content_hash()));
        }

        let total = entries.len();
        self.publish(entries);
        tracing::debug!(
            ?trigger,
            retained = stats.retained,
            built = stats.built,
            dropped = stats.dropped,
            total,
            "Published clipboard history"
        );
        RefreshOutcome::published(stats, total)
    }
}

async fn run_worker(shared: Arc<Shared>, mut queue: mpsc::UnboundedReceiver<RefreshRequest>) {
    while let Some(request) = queue.recv().await {
        shared.state.send_replace(RefreshState::Refreshing);
        let outcome = shared.refresh(request.trigger).await;
        shared.state.send_replace(RefreshState::Idle);
        let _ = request.done.send(outcome);
    }
    tracing::debug!("Refresh worker stopped");
}

/// Forward facility events and setting changes into the refresh queue until cancelled
async fn listen(
    mut events: mpsc::UnboundedReceiver<ClipboardEvent>,
    mut setting_changes: mpsc::UnboundedReceiver<SettingKey>,
    queue: mpsc::UnboundedSender<RefreshRequest>,
    token: CancellationToken,
) {
    let (mut events_open, mut settings_open) = (true, true);

    while events_open || settings_open {
        let trigger = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = events.recv(), if events_open => match event {
                Some(event) => RefreshTrigger::from(event),
                None => {
                    events_open = false;
                    continue;
                }
            },
            key = setting_changes.recv(), if settings_open => match key {
                // written by our own favorites store
                Some(SettingKey::FavoriteItems) => continue,
                Some(key) => RefreshTrigger::SettingChanged(key),
                None => {
                    settings_open = false;
                    continue;
                }
            },
        };
        tracing::trace!(?trigger, "Queueing refresh");
        drop(enqueue(&queue, trigger));
    }
    tracing::debug!("Clipboard history listener stopped");
}

/// Drives refreshes of the clipboard history view and executes entry commands
pub struct RefreshCoordinator {
    shared: Arc<Shared>,
    queue: mpsc::UnboundedSender<RefreshRequest>,
    listener: Mutex<Option<DropGuard>>,
}

impl RefreshCoordinator {
    /// Create an inactive coordinator and start its refresh worker.
    /// The published view starts empty.
    pub fn new(history: Arc<dyn ClipboardHistory>, settings: Arc<dyn SettingsProvider>) -> Self {
        let favorites = FavoritesStore::new(settings.clone());
        let (view, _) = watch::channel(PublishedView::from(Vec::new()));
        let (state, _) = watch::channel(RefreshState::Idle);
        let shared = Arc::new(Shared { history, settings, favorites, view, state });

        let (queue, rx) = mpsc::unbounded_channel();
        runtime_handle().spawn(run_worker(shared.clone(), rx));

        Self {
            shared,
            queue,
            listener: Mutex::new(None),
        }
    }

    /// Subscribe to clipboard and settings changes and queue an initial refresh
    pub fn activate(&self) -> RefreshHandle {
        {
            let mut listener = self.listener.lock();
            if listener.is_none() {
                let token = CancellationToken::new();
                runtime_handle().spawn(listen(
                    self.shared.history.subscribe(),
                    self.shared.settings.subscribe(),
                    self.queue.clone(),
                    token.clone(),
                ));
                *listener = Some(DropGuard::new(token));
                tracing::info!("Clipboard history listener activated");
            }
        }
        self.trigger(RefreshTrigger::Activated)
    }

    /// Stop listening. Returns false if the coordinator was not active.
    pub fn deactivate(&self) -> bool {
        let was_active = self.listener.lock().take().is_some();
        if was_active {
            tracing::info!("Clipboard history listener deactivated");
        }
        was_active
    }

    pub fn is_active(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn trigger(&self, trigger: RefreshTrigger) -> RefreshHandle {
        enqueue(&self.queue, trigger)
    }

    pub fn refresh(&self) -> RefreshHandle {
        self.trigger(RefreshTrigger::Manual)
    }

    pub fn state(&self) -> RefreshState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RefreshState> {
        self.shared.state.subscribe()
    }

    /// Currently published view
    pub fn view(&self) -> PublishedView {
        self.shared.view.borrow().clone()
    }

    pub fn subscribe_view(&self) -> watch::Receiver<PublishedView> {
        self.shared.view.subscribe()
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.shared.favorites
    }

    fn find(&self, id: &str) -> Result<Arc<ViewEntry>, HistoryError> {
        self.view()
            .iter()
            .find(|entry| entry.id() == id)
            .cloned()
            .ok_or_else(|| HistoryError::EntryNotFound(id.to_string()))
    }

    /// Make the entry the current clipboard content
    pub fn paste(&self, id: &str) -> Result<(), HistoryError> {
        let entry = self.find(id)?;
        self.shared.history.set_as_current_content(entry.source())
    }

    pub fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let entry = self.find(id)?;
        self.shared.history.delete_from_history(entry.source())
    }

    pub fn clear_all(&self) -> Result<bool, HistoryError> {
        self.shared.history.clear_history()
    }

    /// Flip the entry's favorite status, then queue a refresh so the list is
    /// re-ordered. Returns the new status and the refresh's handle.
    pub fn toggle_favorite(&self, id: &str) -> Result<(bool, RefreshHandle), HistoryError> {
        let entry = self.find(id)?;
        let hash = entry
            .content_hash()
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| HistoryError::NoContentHash(id.to_string()))?;

        let toggled = self.shared.favorites.toggle(hash);
        // a failed persist keeps the in-memory flip
        entry.set_favorite(self.shared.favorites.is_favorite(Some(hash)));
        let is_favorite = toggled?;

        tracing::debug!(entry_id = %id, is_favorite, "Toggled favorite");
        Ok((is_favorite, self.trigger(RefreshTrigger::FavoriteToggled)))
    }
}
