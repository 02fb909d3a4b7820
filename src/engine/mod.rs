mod conflict;
mod error;
mod mutations;
mod queries;
mod replicate;
mod store;

pub use conflict::{
    Booking, is_assignment_taken, is_assignment_taken_excluding, is_slot_taken,
    is_slot_taken_excluding, is_slot_valid_for_shift, member_booking,
};
pub use error::EngineError;
pub use replicate::{PasteReport, PasteTargets, weekdays_between};
pub use store::{DayStore, SharedDay};

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, Mutex, OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

use crate::config::EngineConfig;
use crate::model::*;
use crate::observability;
use crate::wal::Wal;

/// Write guard over one day's document.
pub(crate) type DayGuard = OwnedRwLockWriteGuard<Option<DaySchedule>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Background task that owns the WAL and batches appends for group commit.
/// Every append already queued when the first one is picked up joins its
/// batch; the whole batch is committed with one fsync. A control command
/// found while draining ends the batch and runs right after it.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let WalCommand::Append { event, response } = cmd else {
            handle_control(&mut wal, cmd);
            continue;
        };
        let mut batch = vec![(event, response)];
        let mut control = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                WalCommand::Append { event, response } => batch.push((event, response)),
                other => {
                    control = Some(other);
                    break;
                }
            }
        }
        commit_batch(&mut wal, batch);
        if let Some(cmd) = control {
            handle_control(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: Vec<PendingAppend>) {
    metrics::histogram!(observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = Instant::now();
    let result = match batch.iter().try_for_each(|(event, _)| wal.stage(event)) {
        Ok(()) => wal.commit(),
        Err(e) => {
            wal.discard();
            Err(e)
        }
    };
    metrics::histogram!(observability::WAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    for (_, tx) in batch {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_control(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let _ = response.send(wal.compact(&events));
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { event, response } => commit_batch(wal, vec![(event, response)]),
    }
}

/// One tenant's schedule state: day documents, roster, catalogs, and the WAL
/// writer they persist through.
pub struct Engine {
    days: DayStore,
    roster: RwLock<Roster>,
    wal_tx: mpsc::Sender<WalCommand>,
    /// Writers hold this shared; compaction holds it exclusively so its
    /// snapshot cannot miss an event that is still in flight.
    compaction_gate: RwLock<()>,
    /// One paste at a time, so multi-day lock sets never interleave.
    paste_lock: Mutex<()>,
    config: EngineConfig,
}

/// Apply a day-scoped event to a day's document (caller holds the day's lock).
fn apply_to_day(day: &mut Option<DaySchedule>, event: &Event) {
    match event {
        Event::ShiftEntryAdded { shift, entry, .. } => {
            day.get_or_insert_with(DaySchedule::empty)
                .shift_mut(*shift)
                .push(entry.clone());
        }
        Event::ShiftEntryUpdated { shift, entry, .. } => {
            if let Some(day) = day
                && let Some(current) = day.shift_mut(*shift).iter_mut().find(|e| e.id == entry.id)
            {
                *current = entry.clone();
            }
        }
        Event::ShiftEntryRemoved { shift, id, .. } => {
            if let Some(day) = day {
                day.shift_mut(*shift).retain(|e| e.id != *id);
            }
        }
        Event::LeaveAdded { entry, .. } => {
            day.get_or_insert_with(DaySchedule::empty)
                .on_leave
                .push(entry.clone());
        }
        Event::LeaveRemoved { id, .. } => {
            if let Some(day) = day {
                day.on_leave.retain(|l| l.id != *id);
            }
        }
        // Whole-day overwrites and roster events are applied by their callers.
        _ => {}
    }
}

fn apply_to_roster(roster: &mut Roster, event: &Event) {
    match event {
        Event::MemberAdded { member } | Event::MemberUpdated { member } => {
            roster.members.insert(member.id, member.clone());
        }
        Event::MemberRemoved { id } => {
            roster.members.remove(id);
        }
        Event::AssignmentLabelAdded { label } => {
            if !roster.assignment_labels.contains(label) {
                roster.assignment_labels.push(label.clone());
            }
        }
        Event::LeaveReasonAdded { reason } => {
            if !roster.leave_reasons.contains(reason) {
                roster.leave_reasons.push(reason.clone());
            }
        }
        _ => {}
    }
}

/// Count and log a rejected mutation before handing the error back.
pub(super) fn rejected(err: EngineError) -> EngineError {
    metrics::counter!(observability::REJECTIONS_TOTAL, "kind" => err.kind()).increment(1);
    debug!("rejected: {err}");
    err
}

impl Engine {
    pub fn new(wal_path: PathBuf, config: EngineConfig) -> io::Result<Self> {
        let (wal, events) = Wal::recover(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            days: DayStore::new(),
            roster: RwLock::new(Roster::default()),
            wal_tx,
            compaction_gate: RwLock::new(()),
            paste_lock: Mutex::new(()),
            config,
        };

        // Sole owner of every lock here, so try_write always succeeds. Never
        // block: this may run inside an async context (lazy tenant creation).
        for event in &events {
            engine.replay_event(event);
        }
        debug!(
            path = %wal_path.display(),
            events = events.len(),
            "replayed WAL"
        );
        Ok(engine)
    }

    fn replay_event(&self, event: &Event) {
        if let Event::DaysReplaced { days } = event {
            for (date, day) in days {
                let handle = self.days.handle(*date);
                *handle.try_write().expect("replay: uncontended write") = Some(day.clone());
            }
            return;
        }
        match event.date() {
            Some(date) => {
                let handle = self.days.handle(date);
                let mut guard = handle.try_write().expect("replay: uncontended write");
                apply_to_day(&mut guard, event);
            }
            None => {
                let mut roster = self.roster.try_write().expect("replay: uncontended write");
                apply_to_roster(&mut roster, event);
            }
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// Write-lock a day, registering it as absent if it was never written.
    pub(super) async fn lock_day(&self, date: Date) -> DayGuard {
        self.days.handle(date).write_owned().await
    }

    /// Write-lock a day only if something was ever registered for it.
    pub(super) async fn lock_existing_day(&self, date: Date) -> Option<DayGuard> {
        let handle = self.days.get(&date)?;
        Some(handle.write_owned().await)
    }

    /// WAL-append then apply to the locked day.
    pub(super) async fn persist_day(
        &self,
        day: &mut Option<DaySchedule>,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_day(day, event);
        Ok(())
    }

    /// WAL-append then apply to the locked roster.
    pub(super) async fn persist_roster(
        &self,
        roster: &mut Roster,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_roster(roster, event);
        Ok(())
    }
}
