use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use devtrack_protocol::{AppState, LogLine, Notification, TuiState, UnknownViewType, ViewModel, ViewType, KNOWN_VIEW_TYPES};

use crate::daemon_client::DaemonClient;

pub type ViewSubscriber = Arc<dyn Fn(ViewType, ViewModel) + Send + Sync>;
pub type NotificationSubscriber = Arc<dyn Fn(Notification) + Send + Sync>;
pub type TuiStateCallback = Arc<dyn Fn(TuiState) + Send + Sync>;

/// Default cap on the presenter's local log view-model (§4.6), separate
/// from the server's own ring buffer.
pub const DEFAULT_MAX_LOG_LINES: usize = 1000;

/// Thin per-view adapter above `DaemonClient` (§4.6 Client Presenter). A
/// single read/write mutex protects `state` and the subscriber lists;
/// writers take it to mutate, readers clone the subscriber list under
/// lock and invoke callbacks after releasing it, so a subscriber can
/// never re-enter the presenter while holding its own lock.
pub struct ClientPresenter {
    state: parking_lot::RwLock<AppState>,
    subscribers: parking_lot::RwLock<Vec<ViewSubscriber>>,
    notification_subscribers: parking_lot::RwLock<Vec<NotificationSubscriber>>,
    tui_state_handler: parking_lot::RwLock<Option<TuiStateCallback>>,
    pending_tui_state: parking_lot::Mutex<Option<TuiState>>,
    has_snapshot: AtomicBool,
    max_log_lines: usize,
}

impl ClientPresenter {
    /// Installs the four client-side handlers and issues `RequestState`
    /// (§4.6 Initialization).
    pub async fn init(client: &DaemonClient) -> Arc<Self> {
        Self::init_with_capacity(client, DEFAULT_MAX_LOG_LINES).await
    }

    pub async fn init_with_capacity(client: &DaemonClient, max_log_lines: usize) -> Arc<Self> {
        let presenter = Arc::new(Self {
            state: parking_lot::RwLock::new(AppState::default()),
            subscribers: parking_lot::RwLock::new(Vec::new()),
            notification_subscribers: parking_lot::RwLock::new(Vec::new()),
            tui_state_handler: parking_lot::RwLock::new(None),
            pending_tui_state: parking_lot::Mutex::new(None),
            has_snapshot: AtomicBool::new(false),
            max_log_lines,
        });

        let p = presenter.clone();
        client.on_state(Arc::new(move |state| p.handle_state_update(state)));
        let p = presenter.clone();
        client.on_log(Arc::new(move |line| p.handle_log_line(line)));
        let p = presenter.clone();
        client.on_notify(Arc::new(move |n| p.handle_notification(n)));
        let p = presenter.clone();
        client.on_tui_state(Arc::new(move |t| p.handle_tui_state(t)));

        let _ = client.request_state().await;
        presenter
    }

    /// `GetViewModel` (§4.6): unknown types fail.
    pub fn view_model(&self, view_type: ViewType) -> Result<ViewModel, UnknownViewType> {
        self.state.read().view(view_type)
    }

    /// Registers a state-update callback. If a snapshot has already
    /// arrived, immediately fans out the present value of every known
    /// view-model in a fixed order, so a late subscriber does not miss
    /// its initial render (§4.6 Subscribe).
    pub fn subscribe(&self, callback: ViewSubscriber) {
        self.subscribers.write().push(callback.clone());
        if self.has_snapshot.load(Ordering::Acquire) {
            let state = self.state.read().clone();
            for view_type in KNOWN_VIEW_TYPES {
                if let Ok(vm) = state.view(view_type) {
                    callback(view_type, vm);
                }
            }
        }
    }

    pub fn subscribe_notifications(&self, callback: NotificationSubscriber) {
        self.notification_subscribers.write().push(callback);
    }

    /// Installing the TUI-state callback later delivers any parked
    /// value exactly once (§4.6 TUI-state plumbing).
    pub fn on_tui_state(&self, callback: TuiStateCallback) {
        let parked = {
            *self.tui_state_handler.write() = Some(callback.clone());
            self.pending_tui_state.lock().take()
        };
        if let Some(tui_state) = parked {
            callback(tui_state);
        }
    }

    /// Invariant 4: before adopting the new snapshot, if the current
    /// state's log view-model is non-empty, overwrite the incoming
    /// snapshot's log view-model with the current one (log lines flow
    /// on a separate message type and must not be clobbered by a
    /// catching-up full-state send).
    fn handle_state_update(&self, mut incoming: AppState) {
        {
            let current = self.state.read();
            if !current.logs.is_empty() {
                incoming.logs = current.logs.clone();
            }
        }
        *self.state.write() = incoming.clone();
        self.has_snapshot.store(true, Ordering::Release);

        let subs: Vec<_> = self.subscribers.read().clone();
        for view_type in KNOWN_VIEW_TYPES {
            if let Ok(vm) = incoming.view(view_type) {
                for callback in &subs {
                    callback(view_type, vm.clone());
                }
            }
        }
    }

    fn handle_log_line(&self, line: LogLine) {
        let vm = {
            let mut state = self.state.write();
            state.logs.push(line, self.max_log_lines);
            ViewModel::Logs(state.logs.clone())
        };
        let subs: Vec<_> = self.subscribers.read().clone();
        for callback in &subs {
            callback(ViewType::Logs, vm.clone());
        }
    }

    fn handle_notification(&self, notification: Notification) {
        self.state.write().notifications.push(notification.clone());
        let subs: Vec<_> = self.notification_subscribers.read().clone();
        for callback in &subs {
            callback(notification.clone());
        }
    }

    fn handle_tui_state(&self, tui_state: TuiState) {
        let handler = self.tui_state_handler.read().clone();
        match handler {
            Some(h) => h(tui_state),
            None => *self.pending_tui_state.lock() = Some(tui_state),
        }
    }
}
