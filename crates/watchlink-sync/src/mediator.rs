//! Event mediation between the host's playback streams and the engine.
//!
//! The [`EventMediator`] is the live half of the propagation pipeline.
//! It subscribes to the host's playback-stopped and user-data-saved
//! broadcast streams, filters out writes that must not propagate, and
//! fans the rest out to every account linked from the originating
//! viewer. Each (target, item) application goes through the
//! [`SyncDispatcher`](crate::dispatcher::SyncDispatcher) so bursts on
//! the same key collapse instead of racing.
//!
//! ```text
//! host streams --> listen loop --> links.targets_from(source)
//!                      |                    |
//!              CancellationToken      resolve target, then
//!                  (stop())           try_dispatch(key, apply)
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use watchlink_core::config::ConfigHandle;
use watchlink_core::domain::{
    AccountId, ItemId, PlaybackStoppedEvent, SaveReason, SyncKey, UserDataSavedEvent,
};
use watchlink_core::ports::{IAccountDirectory, IPlaybackEvents};
use watchlink_reconcile::ReconcileService;

use crate::dispatcher::SyncDispatcher;

// ============================================================================
// MediatorError
// ============================================================================

/// Errors from the mediator lifecycle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediatorError {
    /// `start` was called while the listen loop is still running
    #[error("event mediator is already started")]
    AlreadyStarted,
}

// ============================================================================
// EventMediator
// ============================================================================

/// Listens to host playback streams and dispatches propagation jobs
///
/// `start` subscribes to both streams and spawns the listen loop;
/// `stop` cancels it and waits for it to drop its receivers. The
/// mediator can be restarted after a stop.
pub struct EventMediator {
    /// Shared link configuration
    config: ConfigHandle,
    /// Resolves link targets against the host directory
    directory: Arc<dyn IAccountDirectory>,
    /// Source of the two host event streams
    events: Arc<dyn IPlaybackEvents>,
    /// Per-key serialization for spawned applications
    dispatcher: Arc<SyncDispatcher>,
    /// Applies play events to target records
    reconciler: Arc<ReconcileService>,
    /// Cancels the current listen loop
    cancel: CancellationToken,
    /// Handle of the running listen loop, if any
    listen_handle: Option<JoinHandle<()>>,
}

impl EventMediator {
    /// Creates a mediator; no subscription happens until [`start`](Self::start)
    pub fn new(
        config: ConfigHandle,
        directory: Arc<dyn IAccountDirectory>,
        events: Arc<dyn IPlaybackEvents>,
        dispatcher: Arc<SyncDispatcher>,
        reconciler: Arc<ReconcileService>,
    ) -> Self {
        Self {
            config,
            directory,
            events,
            dispatcher,
            reconciler,
            cancel: CancellationToken::new(),
            listen_handle: None,
        }
    }

    /// Subscribes to both playback streams and spawns the listen loop
    ///
    /// Subscription happens before this returns, so events published
    /// afterwards are never missed. Fails if the loop is already
    /// running; a stopped or crashed mediator can be started again.
    pub fn start(&mut self) -> Result<(), MediatorError> {
        if self.is_running() {
            return Err(MediatorError::AlreadyStarted);
        }

        info!("Starting event mediator");
        let stopped_rx = self.events.subscribe_playback_stopped();
        let saved_rx = self.events.subscribe_user_data_saved();

        let task = ListenTask {
            config: Arc::clone(&self.config),
            directory: Arc::clone(&self.directory),
            dispatcher: Arc::clone(&self.dispatcher),
            reconciler: Arc::clone(&self.reconciler),
        };

        // Each start gets a fresh token so a previous stop cannot
        // cancel the new loop.
        let cancel = CancellationToken::new();
        self.cancel = cancel.clone();
        self.listen_handle = Some(tokio::spawn(task.run(stopped_rx, saved_rx, cancel)));
        Ok(())
    }

    /// Cancels the listen loop and waits for it to exit
    ///
    /// The loop drops its stream receivers on exit, which unsubscribes
    /// from the host. Safe to call when not started, and more than once.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.listen_handle.take() {
            info!("Stopping event mediator");
            if let Err(err) = handle.await {
                warn!(error = %err, "Event mediator task ended abnormally");
            }
        }
    }

    /// Whether the listen loop is currently running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.listen_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

// ============================================================================
// ListenTask
// ============================================================================

/// Owned state of the spawned listen loop
struct ListenTask {
    config: ConfigHandle,
    directory: Arc<dyn IAccountDirectory>,
    dispatcher: Arc<SyncDispatcher>,
    reconciler: Arc<ReconcileService>,
}

impl ListenTask {
    async fn run(
        self,
        mut stopped_rx: broadcast::Receiver<PlaybackStoppedEvent>,
        mut saved_rx: broadcast::Receiver<UserDataSavedEvent>,
        cancel: CancellationToken,
    ) {
        info!("Event mediator listening for playback events");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Event mediator stopping");
                    break;
                }
                event = stopped_rx.recv() => match event {
                    Ok(event) => self.handle_playback_stopped(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Playback-stopped stream lagged, events dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("Playback-stopped stream closed, mediator exiting");
                        break;
                    }
                },
                event = saved_rx.recv() => match event {
                    Ok(event) => self.handle_user_data_saved(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "User-data stream lagged, events dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("User-data stream closed, mediator exiting");
                        break;
                    }
                },
            }
        }
    }

    /// A session ended: push its final position and completion flag out
    async fn handle_playback_stopped(&self, event: PlaybackStoppedEvent) {
        info!(
            source = %event.account_id,
            item = %event.item_id,
            played_to_completion = event.played_to_completion,
            "Playback stopped, propagating watch state",
        );

        let targets = {
            let config = self.config.read().await;
            config.links.targets_from(event.account_id)
        };

        self.fan_out(
            &event.account_id,
            event.item_id,
            event.position_ticks,
            event.played_to_completion,
            &targets,
        )
        .await;
    }

    /// A watch-state write happened: propagate manual played toggles only
    ///
    /// Every other save reason is either noise (progress saves already
    /// covered by the stopped stream) or a write this engine made
    /// itself, which must not echo back through the links.
    async fn handle_user_data_saved(&self, event: UserDataSavedEvent) {
        if event.reason != SaveReason::TogglePlayed {
            return;
        }
        let Some(item_id) = event.item_id else {
            return;
        };
        let Some(state) = event.state else {
            return;
        };

        info!(
            source = %event.account_id,
            item = %item_id,
            played = state.played,
            "Played flag toggled, propagating watch state",
        );

        let targets = {
            let config = self.config.read().await;
            config.links.targets_from(event.account_id)
        };

        self.fan_out(
            &event.account_id,
            item_id,
            Some(state.position_ticks),
            state.played,
            &targets,
        )
        .await;
    }

    /// Dispatches one application job per resolvable target
    async fn fan_out(
        &self,
        source: &AccountId,
        item_id: ItemId,
        position_ticks: Option<i64>,
        played_to_completion: bool,
        targets: &[AccountId],
    ) {
        for target in targets {
            let account = match self.directory.resolve(target).await {
                Ok(Some(account)) => account,
                Ok(None) => {
                    warn!(account = %target, "Sync target account not found, skipping");
                    continue;
                }
                Err(err) => {
                    warn!(account = %target, error = %err, "Account lookup failed, skipping");
                    continue;
                }
            };

            debug!(source = %source, target = account.name(), item = %item_id, "Dispatching play-state application");

            let key = SyncKey::new(*target, item_id);
            let reconciler = Arc::clone(&self.reconciler);
            let target_id = *target;
            // Contention is logged by the dispatcher; a started job runs
            // detached from the listen loop.
            self.dispatcher.try_dispatch(key, async move {
                // Live applications run to completion once started.
                let cancel = CancellationToken::new();
                if let Err(err) = reconciler
                    .apply_play_event(
                        &target_id,
                        &item_id,
                        position_ticks,
                        played_to_completion,
                        &cancel,
                    )
                    .await
                {
                    warn!(account = %target_id, item = %item_id, error = %err, "Play-state application failed");
                }
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use watchlink_core::config::SyncConfig;
    use watchlink_core::domain::{Account, PlaybackState};
    use watchlink_core::ports::IPlaybackStateStore;

    struct TestEvents {
        stopped_tx: broadcast::Sender<PlaybackStoppedEvent>,
        saved_tx: broadcast::Sender<UserDataSavedEvent>,
    }

    impl TestEvents {
        fn new() -> Self {
            Self {
                stopped_tx: broadcast::channel(16).0,
                saved_tx: broadcast::channel(16).0,
            }
        }
    }

    impl IPlaybackEvents for TestEvents {
        fn subscribe_playback_stopped(&self) -> broadcast::Receiver<PlaybackStoppedEvent> {
            self.stopped_tx.subscribe()
        }

        fn subscribe_user_data_saved(&self) -> broadcast::Receiver<UserDataSavedEvent> {
            self.saved_tx.subscribe()
        }
    }

    struct TestDirectory {
        accounts: HashMap<AccountId, Account>,
    }

    #[async_trait::async_trait]
    impl IAccountDirectory for TestDirectory {
        async fn resolve(&self, id: &AccountId) -> anyhow::Result<Option<Account>> {
            Ok(self.accounts.get(id).cloned())
        }
    }

    #[derive(Default)]
    struct TestStore {
        records: Mutex<HashMap<(AccountId, ItemId), PlaybackState>>,
        saves: Mutex<Vec<(AccountId, ItemId)>>,
    }

    impl TestStore {
        fn insert(&self, account: AccountId, item: ItemId, state: PlaybackState) {
            self.records.lock().unwrap().insert((account, item), state);
        }

        fn record(&self, account: AccountId, item: ItemId) -> Option<PlaybackState> {
            self.records.lock().unwrap().get(&(account, item)).cloned()
        }

        fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl IPlaybackStateStore for TestStore {
        async fn get(
            &self,
            account_id: &AccountId,
            item_id: &ItemId,
        ) -> anyhow::Result<Option<PlaybackState>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&(*account_id, *item_id))
                .cloned())
        }

        async fn save(
            &self,
            account_id: &AccountId,
            item_id: &ItemId,
            state: &PlaybackState,
            _reason: SaveReason,
            _cancel: &CancellationToken,
        ) -> anyhow::Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert((*account_id, *item_id), state.clone());
            self.saves.lock().unwrap().push((*account_id, *item_id));
            Ok(())
        }
    }

    struct Fixture {
        source: AccountId,
        target: AccountId,
        item: ItemId,
        store: Arc<TestStore>,
        events: Arc<TestEvents>,
        mediator: EventMediator,
    }

    /// One link (alice -> bob) with both accounts resolvable and an
    /// existing unplayed record for bob
    fn fixture() -> Fixture {
        let source = AccountId::from_uuid(uuid::Uuid::from_u128(1));
        let target = AccountId::from_uuid(uuid::Uuid::from_u128(2));
        let item = ItemId::from_uuid(uuid::Uuid::from_u128(10));

        let mut config = SyncConfig::default();
        config.add_link(source, target).unwrap();

        let directory = Arc::new(TestDirectory {
            accounts: HashMap::from([
                (source, Account::new(source, "alice")),
                (target, Account::new(target, "bob")),
            ]),
        });

        let store = Arc::new(TestStore::default());
        // The engine only updates records that already exist.
        store.insert(target, item, PlaybackState::unplayed());

        let events = Arc::new(TestEvents::new());
        let mediator = EventMediator::new(
            config.into_handle(),
            directory,
            events.clone(),
            Arc::new(SyncDispatcher::new()),
            Arc::new(ReconcileService::new(store.clone())),
        );

        Fixture {
            source,
            target,
            item,
            store,
            events,
            mediator,
        }
    }

    async fn wait_for_saves(store: &TestStore, want: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while store.save_count() < want {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("expected saves did not arrive in time");
    }

    fn stopped_event(fixture: &Fixture) -> PlaybackStoppedEvent {
        PlaybackStoppedEvent {
            account_id: fixture.source,
            item_id: fixture.item,
            position_ticks: Some(120_000),
            played_to_completion: true,
        }
    }

    #[tokio::test]
    async fn test_playback_stop_syncs_linked_target() {
        let mut fixture = fixture();
        fixture.mediator.start().unwrap();

        fixture.events.stopped_tx.send(stopped_event(&fixture)).unwrap();
        wait_for_saves(&fixture.store, 1).await;

        let state = fixture.store.record(fixture.target, fixture.item).unwrap();
        assert!(state.played);
        assert_eq!(state.play_count, 1);
        assert_eq!(state.position_ticks, 0);

        fixture.mediator.stop().await;
    }

    #[tokio::test]
    async fn test_toggle_played_syncs_linked_target() {
        let mut fixture = fixture();
        fixture.mediator.start().unwrap();

        let toggled = PlaybackState {
            played: true,
            play_count: 1,
            last_played: Some(chrono::Utc::now()),
            ..PlaybackState::unplayed()
        };
        fixture
            .events
            .saved_tx
            .send(UserDataSavedEvent {
                account_id: fixture.source,
                item_id: Some(fixture.item),
                reason: SaveReason::TogglePlayed,
                state: Some(toggled),
            })
            .unwrap();
        wait_for_saves(&fixture.store, 1).await;

        let state = fixture.store.record(fixture.target, fixture.item).unwrap();
        assert!(state.played);
        assert_eq!(state.play_count, 1);

        fixture.mediator.stop().await;
    }

    #[tokio::test]
    async fn test_ignores_non_toggle_save_reasons() {
        let mut fixture = fixture();
        fixture.mediator.start().unwrap();

        fixture
            .events
            .saved_tx
            .send(UserDataSavedEvent {
                account_id: fixture.source,
                item_id: Some(fixture.item),
                reason: SaveReason::PlaybackProgress,
                state: Some(PlaybackState {
                    played: true,
                    ..PlaybackState::unplayed()
                }),
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fixture.store.save_count(), 0);

        fixture.mediator.stop().await;
    }

    #[tokio::test]
    async fn test_ignores_toggle_without_item_or_state() {
        let mut fixture = fixture();
        fixture.mediator.start().unwrap();

        fixture
            .events
            .saved_tx
            .send(UserDataSavedEvent {
                account_id: fixture.source,
                item_id: None,
                reason: SaveReason::TogglePlayed,
                state: Some(PlaybackState::unplayed()),
            })
            .unwrap();
        fixture
            .events
            .saved_tx
            .send(UserDataSavedEvent {
                account_id: fixture.source,
                item_id: Some(fixture.item),
                reason: SaveReason::TogglePlayed,
                state: None,
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fixture.store.save_count(), 0);

        fixture.mediator.stop().await;
    }

    #[tokio::test]
    async fn test_unresolvable_target_is_skipped() {
        let source = AccountId::from_uuid(uuid::Uuid::from_u128(1));
        let ghost = AccountId::from_uuid(uuid::Uuid::from_u128(99));
        let item = ItemId::from_uuid(uuid::Uuid::from_u128(10));

        // The only link points at an account the directory cannot resolve.
        let mut config = SyncConfig::default();
        config.add_link(source, ghost).unwrap();

        let directory = Arc::new(TestDirectory {
            accounts: HashMap::from([(source, Account::new(source, "alice"))]),
        });
        let store = Arc::new(TestStore::default());
        let events = Arc::new(TestEvents::new());
        let mut mediator = EventMediator::new(
            config.into_handle(),
            directory,
            events.clone(),
            Arc::new(SyncDispatcher::new()),
            Arc::new(ReconcileService::new(store.clone())),
        );

        mediator.start().unwrap();
        events
            .stopped_tx
            .send(PlaybackStoppedEvent {
                account_id: source,
                item_id: item,
                position_ticks: Some(120_000),
                played_to_completion: true,
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.save_count(), 0);

        mediator.stop().await;
    }

    #[tokio::test]
    async fn test_lagged_stream_skips_oldest_and_keeps_listening() {
        let source = AccountId::from_uuid(uuid::Uuid::from_u128(1));
        let target = AccountId::from_uuid(uuid::Uuid::from_u128(2));
        let items: Vec<ItemId> = (0..22)
            .map(|n| ItemId::from_uuid(uuid::Uuid::from_u128(100 + n)))
            .collect();

        let mut config = SyncConfig::default();
        config.add_link(source, target).unwrap();

        let directory = Arc::new(TestDirectory {
            accounts: HashMap::from([
                (source, Account::new(source, "alice")),
                (target, Account::new(target, "bob")),
            ]),
        });
        let store = Arc::new(TestStore::default());
        for item in &items {
            store.insert(target, *item, PlaybackState::unplayed());
        }
        let events = Arc::new(TestEvents::new());
        let mut mediator = EventMediator::new(
            config.into_handle(),
            directory,
            events.clone(),
            Arc::new(SyncDispatcher::new()),
            Arc::new(ReconcileService::new(store.clone())),
        );
        mediator.start().unwrap();

        // The listen loop has not polled yet, so sending 21 events into
        // the 16-slot stream overwrites the oldest five.
        for item in &items[..21] {
            events
                .stopped_tx
                .send(PlaybackStoppedEvent {
                    account_id: source,
                    item_id: *item,
                    position_ticks: Some(120_000),
                    played_to_completion: true,
                })
                .unwrap();
        }

        wait_for_saves(&store, 16).await;
        assert_eq!(store.save_count(), 16);
        for item in &items[..5] {
            assert!(store.record(target, *item).unwrap().is_untouched());
        }
        for item in &items[5..21] {
            assert!(store.record(target, *item).unwrap().played);
        }

        // The lagged receive is logged and skipped, not treated as a
        // closed stream, so later events still come through.
        assert!(mediator.is_running());
        events
            .stopped_tx
            .send(PlaybackStoppedEvent {
                account_id: source,
                item_id: items[21],
                position_ticks: Some(120_000),
                played_to_completion: true,
            })
            .unwrap();
        wait_for_saves(&store, 17).await;
        assert!(store.record(target, items[21]).unwrap().played);

        mediator.stop().await;
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut fixture = fixture();
        fixture.mediator.start().unwrap();

        assert_eq!(
            fixture.mediator.start(),
            Err(MediatorError::AlreadyStarted)
        );

        fixture.mediator.stop().await;
    }

    #[tokio::test]
    async fn test_stop_before_start_is_safe() {
        let mut fixture = fixture();
        fixture.mediator.stop().await;
        assert!(!fixture.mediator.is_running());
    }

    #[tokio::test]
    async fn test_stop_drops_stream_subscriptions() {
        let mut fixture = fixture();
        fixture.mediator.start().unwrap();
        assert!(fixture.mediator.is_running());

        fixture.mediator.stop().await;
        assert!(!fixture.mediator.is_running());

        // The loop dropped the only receivers, so sends fail.
        assert!(fixture.events.stopped_tx.send(stopped_event(&fixture)).is_err());
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let mut fixture = fixture();
        fixture.mediator.start().unwrap();
        fixture.mediator.stop().await;

        fixture.mediator.start().unwrap();
        fixture.events.stopped_tx.send(stopped_event(&fixture)).unwrap();
        wait_for_saves(&fixture.store, 1).await;

        fixture.mediator.stop().await;
    }
}
