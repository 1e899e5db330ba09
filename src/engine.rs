//! Sync engine
//!
//! [`SyncEngine`] owns one [`SyncSession`] and a transport, and turns
//! inbound messages, local actions, and timer deadlines into state
//! transitions. Every handler is a synchronous `&mut self` method —
//! the protocol is a single-logical-thread state machine, so there is
//! nothing to lock — and [`run`] is the tokio driver that feeds it:
//! one task, one `select!`, all timers dying with the task on
//! teardown.

use crate::action::{ActionKind, ActionParam, ActionRecord, Side};
use crate::errors::Result;
use crate::logging::log_buffer_decision;
use crate::snapshot::storage::SnapshotStore;
use crate::snapshot::{restore, ActionHistory, Snapshot};
use crate::sync::{
    GapAction, OfferOutcome, PayloadStrategy, ResyncTrigger, SyncEvent, SyncSession,
};
use crate::transport::{Transport, WireMessage};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Commands the embedding client sends to a running engine
#[derive(Debug)]
pub enum EngineCommand {
    /// Perform and broadcast a local action
    PerformAction {
        kind: ActionKind,
        parameters: Vec<ActionParam>,
    },
    /// Explicit resync request (user/debug)
    RequestResync,
    /// Leave the room and tear the session down
    LeaveRoom,
    /// Stop the driver
    Shutdown,
}

/// The client-side synchronization engine for one room
pub struct SyncEngine<T: Transport> {
    session: SyncSession,
    transport: T,
}

impl<T: Transport> SyncEngine<T> {
    pub fn new(session: SyncSession, transport: T) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SyncSession {
        &mut self.session
    }

    fn send(&mut self, message: WireMessage) {
        if let Err(error) = self.transport.send(message) {
            // Transport loss shows up later as a counter gap; the
            // resync path repairs it.
            warn!(%error, "outbound send failed");
        }
    }

    /// Record, apply, and broadcast a local action. Returns its
    /// sequence number.
    pub fn perform_local_action(
        &mut self,
        kind: ActionKind,
        parameters: Vec<ActionParam>,
    ) -> u64 {
        let record = ActionRecord::new(Side::Own, kind, parameters);
        if let Err(error) = self.session.board.apply(&record) {
            warn!(%error, action = %record.kind, "local action did not apply cleanly");
        }
        let seq = self.session.logs.own.append(record.clone());
        self.session.logs.export_record(&record);
        self.session.metrics.actions_sent += 1;
        let room_id = self.session.room_id.clone();
        self.send(WireMessage::PushAction {
            room_id,
            counter: seq,
            record,
        });
        seq
    }

    /// Dispatch one inbound relay message.
    pub fn handle_wire(&mut self, message: WireMessage, now: Instant) {
        match message {
            WireMessage::PushAction {
                counter, record, ..
            } => self.handle_push_action(counter, record, now),
            WireMessage::ResyncActions { .. } => self.handle_resync_request(),
            WireMessage::CatchUpActions { action_data, .. } => {
                self.apply_catch_up(action_data, now)
            }
            WireMessage::SyncWithSnapshot { snapshot, .. } => {
                self.handle_snapshot(*snapshot, now)
            }
            WireMessage::SyncCheck { counter, .. } => self.handle_sync_check(counter, now),
            WireMessage::Heartbeat { timestamp } => {
                self.send(WireMessage::HeartbeatResponse { timestamp });
            }
            WireMessage::HeartbeatResponse { timestamp } => {
                if self
                    .session
                    .monitor
                    .record_heartbeat_response(timestamp, now)
                    .is_some()
                {
                    let debounce = self.session.monitor.debounce_for(&self.session.config);
                    self.session.buffer.set_debounce(debounce);
                }
            }
            WireMessage::JoinGame {
                is_reconnection, ..
            } => {
                if is_reconnection {
                    self.session.monitor.reset();
                    self.start_resync(ResyncTrigger::Reconnection, now);
                } else {
                    info!("peer started a fresh game session");
                    self.session.reset();
                    self.session.resync.abort();
                    self.session.emit(SyncEvent::NewSessionStarted);
                }
            }
            WireMessage::UserReconnected { .. } => {
                self.session.emit(SyncEvent::PeerReconnected);
                self.start_resync(ResyncTrigger::Reconnection, now);
            }
            WireMessage::UserDisconnected { .. } | WireMessage::LeaveRoom { .. } => {
                self.session.emit(SyncEvent::PeerDisconnected);
            }
        }
    }

    fn handle_push_action(&mut self, counter: u64, record: ActionRecord, now: Instant) {
        let expected = self.session.expected_remote();
        let debounce = self.session.monitor.debounce_for(&self.session.config);
        self.session.buffer.set_debounce(debounce);

        match self.session.buffer.offer(counter, record.clone(), expected, now) {
            OfferOutcome::Processed => {
                log_buffer_decision(counter, expected, "processed");
                self.apply_remote(counter, record);
                self.drain_buffered();
            }
            OfferOutcome::Buffered => {
                log_buffer_decision(counter, expected, "buffered");
                self.session.metrics.actions_buffered += 1;
            }
            OfferOutcome::Ignored => {
                log_buffer_decision(counter, expected, "ignored");
                self.session.metrics.actions_ignored += 1;
            }
        }
    }

    /// Apply one remote action: flip into the local perspective, hit
    /// the board best-effort, advance the opponent log, export.
    fn apply_remote(&mut self, counter: u64, record: ActionRecord) {
        let flipped = record.flipped();
        if let Err(error) = self.session.board.apply(&flipped) {
            // Best-effort: a bad action is logged and skipped, never
            // thrown into game code.
            warn!(counter, %error, action = %flipped.kind, "remote action failed to apply");
        }
        self.session.logs.opp.append_at(counter, flipped.clone());
        self.session.logs.export_record(&flipped);
        self.session.metrics.actions_applied += 1;
    }

    fn drain_buffered(&mut self) {
        let expected = self.session.expected_remote();
        let ready = self.session.buffer.drain_ready(expected);
        for action in ready {
            self.apply_remote(action.counter, action.record);
        }
    }

    /// Peer asked for catch-up data: answer with the full action list
    /// or, past the threshold, a compact snapshot.
    fn handle_resync_request(&mut self) {
        let room_id = self.session.room_id.clone();
        match self
            .session
            .resync
            .payload_strategy(self.session.logs.own.len())
        {
            PayloadStrategy::ActionList => {
                debug!(
                    entries = self.session.logs.own.len(),
                    "answering resync request with action list"
                );
                self.send(WireMessage::CatchUpActions {
                    room_id,
                    action_data: self.session.logs.own.entries().to_vec(),
                });
            }
            PayloadStrategy::Snapshot => match self.capture_snapshot() {
                Ok(snapshot) => {
                    debug!(snapshot_id = %snapshot.snapshot_id, "answering resync request with snapshot");
                    self.send(WireMessage::SyncWithSnapshot {
                        room_id,
                        snapshot: Box::new(snapshot),
                    });
                }
                Err(error) => {
                    warn!(%error, "snapshot capture failed; falling back to action list");
                    self.send(WireMessage::CatchUpActions {
                        room_id,
                        action_data: self.session.logs.own.entries().to_vec(),
                    });
                }
            },
        }
    }

    /// Reconcile against the peer's complete action log.
    fn apply_catch_up(&mut self, incoming: Vec<ActionRecord>, now: Instant) {
        // Fresh reconciliation supersedes buffered partial data.
        self.session.buffer.clear();

        let local = self.session.logs.opp.counter();
        let span = crate::logging::resync_span(&self.session.room_id, incoming.len());
        let _guard = span.enter();
        span.record("strategy", "action-replay");

        let plan = crate::sync::plan_catch_up(&incoming, local);
        if plan.is_trivially_complete() {
            span.record("outcome", "already-current");
            self.finish_resync(now);
            return;
        }

        let dropped = plan.dropped();
        for (index, record) in plan.missing.iter().enumerate() {
            let seq = self.session.logs.opp.append(record.clone());
            if !plan.applies(index) {
                continue;
            }
            if let Err(error) = self.session.board.apply(record) {
                warn!(counter = seq, %error, "catch-up entry failed to apply");
            }
            self.session.logs.export_record(record);
        }
        if dropped > 0 {
            debug!(dropped, "catch-up dropped entries superseded by reset/deck markers");
        }
        span.record("outcome", "replayed");
        self.finish_resync(now);
    }

    /// Ingest a peer snapshot: verify, flip into the local
    /// perspective, restore; on failure fall back to replaying the
    /// embedded history, then to a fresh session.
    fn handle_snapshot(&mut self, snapshot: Snapshot, now: Instant) {
        if let Err(error) = snapshot.verify() {
            warn!(%error, "peer snapshot rejected");
            self.session
                .emit(SyncEvent::SyncFailed {
                    reason: format!("snapshot rejected: {error}"),
                });
            self.recover_from_failed_snapshot(&snapshot, now);
            return;
        }

        let flipped = match snapshot.flipped() {
            Ok(flipped) => flipped,
            Err(error) => {
                warn!(%error, "snapshot perspective flip failed");
                self.recover_from_failed_snapshot(&snapshot, now);
                return;
            }
        };

        self.session.buffer.clear();
        match restore::restore_snapshot(&flipped, &mut self.session.board) {
            Ok(outcome) => {
                self.session.logs.own.replace(flipped.action_history.own.clone());
                self.session.logs.opp.replace(flipped.action_history.opp.clone());
                self.session
                    .logs
                    .own
                    .bump_counter(flipped.players.own.action_counter);
                self.session
                    .logs
                    .opp
                    .bump_counter(flipped.players.opponent.action_counter);
                // The spectator feed cannot be reconstructed in order
                // from a snapshot; it restarts from here.
                self.session.logs.export.clear();
                self.session.metrics.snapshots_restored += 1;
                self.session.emit(SyncEvent::SnapshotRestored {
                    cards: outcome.cards_restored,
                });
                self.finish_resync(now);
            }
            Err(error) => {
                warn!(%error, "snapshot restoration failed");
                self.session.emit(SyncEvent::SyncFailed {
                    reason: format!("snapshot restoration failed: {error}"),
                });
                self.recover_from_failed_snapshot(&snapshot, now);
            }
        }
    }

    /// Fallback chain after a snapshot failed: action replay when the
    /// capture carried history, otherwise a brand-new session.
    fn recover_from_failed_snapshot(&mut self, snapshot: &Snapshot, now: Instant) {
        match restore::fallback_phase(snapshot) {
            crate::snapshot::RestorePhase::ReplayHistory => {
                info!("falling back to action-replay reconciliation");
                // The peer's own-side log is our remote stream; the
                // catch-up planner does the perspective flip.
                self.apply_catch_up(snapshot.action_history.own.clone(), now);
            }
            crate::snapshot::RestorePhase::FreshSession => {
                info!("no recovery path left; starting a fresh session");
                self.session.reset();
                self.session.resync.abort();
                let room_id = self.session.room_id.clone();
                self.send(WireMessage::JoinGame {
                    room_id,
                    is_reconnection: false,
                });
                self.session.emit(SyncEvent::NewSessionStarted);
            }
        }
    }

    fn handle_sync_check(&mut self, peer_counter: u64, now: Instant) {
        if !self.session.buffer.is_empty() {
            self.drain_buffered();
        }
        let local = self.session.logs.opp.counter();
        if self.session.monitor.counter_gap_detected(peer_counter, local)
            && !self.session.resync.is_resyncing()
            && self.session.resync.cooldown_elapsed(now)
        {
            debug!(peer_counter, local, "sync check detected divergence");
            self.start_resync(ResyncTrigger::MonitorGap, now);
        }
    }

    /// Start a resync session and ask the peer for catch-up data.
    /// A no-op while one is already active.
    pub fn start_resync(&mut self, trigger: ResyncTrigger, now: Instant) {
        if !self.session.resync.begin(trigger, now) {
            return;
        }
        // A resync supersedes buffered partial data.
        self.session.buffer.clear();
        self.session.metrics.resyncs_started += 1;
        info!(trigger = trigger.as_str(), "resync starting");
        self.session.emit(SyncEvent::SyncStarted {
            trigger: trigger.as_str(),
        });
        let room_id = self.session.room_id.clone();
        let counter = self.session.logs.opp.counter();
        self.send(WireMessage::ResyncActions { room_id, counter });
    }

    fn finish_resync(&mut self, now: Instant) {
        match self.session.resync.complete(now) {
            Some(duration) => {
                self.session.metrics.resyncs_completed += 1;
                info!(duration_ms = duration.as_millis() as u64, "resync complete");
                self.session.emit(SyncEvent::SyncCompleted {
                    duration_ms: duration.as_millis() as u64,
                });
            }
            // Catch-up data we did not ask for (the peer resynced us
            // proactively); just stamp the cooldown.
            None => self.session.resync.note_full_sync(now),
        }
    }

    /// Fire every due deadline. Returns the next pending deadline so
    /// the driver knows when to wake up again.
    pub fn poll(&mut self, now: Instant) -> Option<Instant> {
        if let Some(trigger) = self.session.resync.check_timeout(now) {
            self.session.metrics.resyncs_timed_out += 1;
            warn!(trigger = trigger.as_str(), "resync timed out");
            self.session.emit(SyncEvent::SyncFailed {
                reason: "sync failed: timeout".to_string(),
            });
        }

        if self.session.buffer.deadline().is_some_and(|d| now >= d) {
            let expected = self.session.expected_remote();
            let resyncing = self.session.resync.is_resyncing();
            match self.session.buffer.gap_pass(expected, resyncing) {
                GapAction::None => {}
                GapAction::Skip { head, skipped } => {
                    warn!(
                        lost_from = expected,
                        applied = head.counter,
                        skipped,
                        "gap tolerance: applying past lost actions"
                    );
                    self.session.metrics.gaps_skipped += 1;
                    self.session.emit(SyncEvent::GapSkipped {
                        lost_from: expected,
                        applied: head.counter,
                    });
                    self.apply_remote(head.counter, head.record);
                    self.drain_buffered();
                    self.start_resync(ResyncTrigger::BufferGap, now);
                }
                GapAction::RequestResync { gap } => {
                    debug!(gap, "gap too wide to skip; requesting resync");
                    self.start_resync(ResyncTrigger::BufferGap, now);
                }
            }
        }

        self.next_deadline()
    }

    /// Earliest pending deadline across the buffer and the resync
    /// timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.session.buffer.deadline(), self.session.resync.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Monitor tick: broadcast the local counter and retry any
    /// buffered run that became contiguous.
    pub fn tick_sync_check(&mut self) {
        let room_id = self.session.room_id.clone();
        let counter = self.session.logs.own.counter();
        self.send(WireMessage::SyncCheck { room_id, counter });
        if !self.session.buffer.is_empty() {
            self.drain_buffered();
        }
    }

    /// Heartbeat tick: send a correlation-stamped probe.
    pub fn tick_heartbeat(&mut self, now: Instant) {
        let stamp = crate::utils::now_millis();
        self.session.monitor.record_heartbeat_sent(stamp, now);
        self.send(WireMessage::Heartbeat { timestamp: stamp });
    }

    /// Capture the current session as a checksummed snapshot.
    pub fn capture_snapshot(&mut self) -> Result<Snapshot> {
        let history = ActionHistory {
            own: self.session.logs.own.entries().to_vec(),
            opp: self.session.logs.opp.entries().to_vec(),
        };
        let snapshot = Snapshot::capture(&self.session.room_id, &self.session.board, history)?;
        self.session.metrics.snapshots_captured += 1;
        Ok(snapshot)
    }

    /// Announce ourselves to the room; on reconnection also ask for
    /// catch-up.
    pub fn join_game(&mut self, is_reconnection: bool, now: Instant) {
        let room_id = self.session.room_id.clone();
        self.send(WireMessage::JoinGame {
            room_id,
            is_reconnection,
        });
        if is_reconnection {
            self.start_resync(ResyncTrigger::Reconnection, now);
        }
    }

    /// Leave the room: notify the relay and tear everything down so
    /// no deadline or buffered action outlives the session.
    pub fn leave_room(&mut self) {
        let room_id = self.session.room_id.clone();
        self.send(WireMessage::LeaveRoom { room_id });
        self.session.reset();
        self.session.resync.abort();
    }
}

/// Spawnable driver: wires an engine to its inbox, command stream,
/// and autosave store. One task owns everything; dropping the command
/// sender (or sending [`EngineCommand::Shutdown`]) stops it and every
/// timer with it.
pub async fn run<T, S>(
    mut engine: SyncEngine<T>,
    mut inbox: mpsc::UnboundedReceiver<WireMessage>,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    store: Arc<S>,
) where
    T: Transport,
    S: SnapshotStore + ?Sized,
{
    let config = engine.session().config.clone();
    let mut sync_check = tokio::time::interval(config.sync_check_interval());
    let mut heartbeat = tokio::time::interval(config.heartbeat_interval());
    let autosave_period = config.autosave_interval();
    let mut autosave = tokio::time::interval(
        autosave_period.unwrap_or_else(|| std::time::Duration::from_secs(3600)),
    );
    sync_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    autosave.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let deadline = engine.next_deadline();
        let sleep = tokio::time::sleep_until(
            deadline
                .unwrap_or_else(|| Instant::now() + std::time::Duration::from_secs(60))
                .into(),
        );
        tokio::pin!(sleep);

        tokio::select! {
            message = inbox.recv() => match message {
                Some(message) => { engine.handle_wire(message, Instant::now()); }
                None => {
                    debug!("relay inbox closed; stopping engine");
                    break;
                }
            },
            command = commands.recv() => match command {
                Some(EngineCommand::PerformAction { kind, parameters }) => {
                    engine.perform_local_action(kind, parameters);
                }
                Some(EngineCommand::RequestResync) => {
                    engine.start_resync(ResyncTrigger::Explicit, Instant::now());
                }
                Some(EngineCommand::LeaveRoom) => {
                    engine.leave_room();
                }
                Some(EngineCommand::Shutdown) | None => {
                    debug!("engine shutdown requested");
                    break;
                }
            },
            _ = &mut sleep, if deadline.is_some() => {
                engine.poll(Instant::now());
            }
            _ = sync_check.tick() => {
                engine.tick_sync_check();
            }
            _ = heartbeat.tick() => {
                engine.tick_heartbeat(Instant::now());
            }
            _ = autosave.tick(), if autosave_period.is_some() => {
                match engine.capture_snapshot() {
                    Ok(snapshot) => {
                        let key = engine.session().room_id.clone();
                        if let Err(error) = store.put(&key, &snapshot).await {
                            warn!(%error, "autosave failed");
                        }
                    }
                    Err(error) => warn!(%error, "autosave capture failed"),
                }
            }
        }
    }
}
