mod blocks;
mod bookings;
mod conflict;
mod error;
mod store;
mod sync;

pub use error::EngineError;
pub use store::{AllocationStore, PropertyCalendar, SharedCalendar};

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, OwnedRwLockWriteGuard};
use ulid::Ulid;

use crate::model::*;
use crate::observability;
use crate::wal::Wal;

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

/// Background task that owns the WAL and batches appends for group commit.
/// Block on the first append, drain everything immediately available into
/// one batch, then a single flush_sync covers the whole batch.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;
                while deferred.is_none() {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => deferred = Some(other),
                        Err(_) => break, // channel empty, flush what we have
                    }
                }
                flush_and_respond(&mut wal, batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = Instant::now();

    let mut append_err: Option<io::Error> = None;
    for (event, _) in &batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after an append error so partially buffered bytes don't
    // leak into the next batch (every caller in this batch is told it failed).
    let flush_err = wal.flush_sync().err();
    metrics::histogram!(observability::WAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    let result = match append_err.or(flush_err) {
        Some(e) => Err(e),
        None => Ok(()),
    };
    for (_, tx) in batch {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// The booking engine: entity tables, the per-property allocation mirror,
/// and the WAL that makes every applied event durable.
pub struct Engine {
    pub(super) store: AllocationStore,
    pub(super) bookings: DashMap<Ulid, Booking>,
    pub(super) blocks: DashMap<Ulid, Block>,
    wal_tx: mpsc::Sender<WalCommand>,
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            store: AllocationStore::new(),
            bookings: DashMap::new(),
            blocks: DashMap::new(),
            wal_tx,
        };
        for event in &events {
            engine.replay_event(event);
        }
        Ok(engine)
    }

    /// Write an event to the WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
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

    /// Apply an event to the entity tables and the allocation mirror.
    /// The caller holds the calendar write lock(s); `destination` is set
    /// only for a block update that moves properties.
    pub(super) fn apply_event_locked(
        &self,
        event: &Event,
        calendar: &mut PropertyCalendar,
        destination: Option<&mut PropertyCalendar>,
    ) {
        match event {
            Event::BookingCreated {
                id,
                property_id,
                guest_name,
                guest_email,
                range,
            } => {
                self.bookings.insert(
                    *id,
                    Booking {
                        id: *id,
                        property_id: property_id.clone(),
                        guest_name: guest_name.clone(),
                        guest_email: guest_email.clone(),
                        range: *range,
                        status: BookingStatus::Active,
                    },
                );
                sync::on_create(&self.store, calendar, *id, AllocationKind::Booking, *range);
            }
            Event::BookingUpdated {
                id,
                guest_name,
                guest_email,
                range,
            } => {
                if let Some(mut b) = self.bookings.get_mut(id) {
                    b.guest_name = guest_name.clone();
                    b.guest_email = guest_email.clone();
                    b.range = *range;
                }
                sync::on_update_range(&self.store, calendar, None, *id, *range);
            }
            Event::BookingCanceled { id } => {
                if let Some(mut b) = self.bookings.get_mut(id) {
                    b.status = BookingStatus::Canceled;
                }
                sync::on_cancel(calendar, *id);
            }
            Event::BookingRebooked { id } => {
                if let Some(mut b) = self.bookings.get_mut(id) {
                    b.status = BookingStatus::Active;
                }
                sync::on_rebook(calendar, *id);
            }
            Event::BookingDeleted { id } => {
                self.bookings.remove(id);
                sync::on_delete(&self.store, calendar, *id);
            }
            Event::BlockCreated {
                id,
                property_id,
                range,
            } => {
                self.blocks.insert(
                    *id,
                    Block {
                        id: *id,
                        property_id: property_id.clone(),
                        range: *range,
                    },
                );
                sync::on_create(&self.store, calendar, *id, AllocationKind::Block, *range);
            }
            Event::BlockUpdated {
                id,
                property_id,
                range,
            } => {
                if let Some(mut b) = self.blocks.get_mut(id) {
                    b.property_id = property_id.clone();
                    b.range = *range;
                }
                sync::on_update_range(&self.store, calendar, destination, *id, *range);
            }
            Event::BlockDeleted { id } => {
                self.blocks.remove(id);
                sync::on_delete(&self.store, calendar, *id);
            }
        }
    }

    /// Re-apply one replayed event. We are the sole owner of the calendar
    /// Arcs here, so try_write always succeeds instantly. Never use
    /// blocking_write, this may run inside an async context.
    fn replay_event(&self, event: &Event) {
        let (source, destination) = match event {
            Event::BookingCreated { property_id, .. } | Event::BlockCreated { property_id, .. } => {
                (Some(property_id.clone()), None)
            }
            Event::BookingUpdated { id, .. }
            | Event::BookingCanceled { id }
            | Event::BookingRebooked { id }
            | Event::BookingDeleted { id } => (
                self.bookings.get(id).map(|b| b.property_id.clone()),
                None,
            ),
            Event::BlockUpdated { id, property_id, .. } => {
                match self.blocks.get(id).map(|b| b.property_id.clone()) {
                    Some(src) => {
                        let dest = (src != *property_id).then(|| property_id.clone());
                        (Some(src), dest)
                    }
                    None => (None, None),
                }
            }
            Event::BlockDeleted { id } => {
                (self.blocks.get(id).map(|b| b.property_id.clone()), None)
            }
        };
        // Event references an entity the log never created. Skip it.
        let Some(source) = source else { return };

        let cal = self.store.calendar(&source);
        let mut guard = cal.try_write().expect("replay: uncontended write");
        match destination {
            Some(dest_property) => {
                let dest = self.store.calendar(&dest_property);
                let mut dest_guard = dest.try_write().expect("replay: uncontended write");
                self.apply_event_locked(event, &mut guard, Some(&mut *dest_guard));
            }
            None => self.apply_event_locked(event, &mut guard, None),
        }
    }

    /// Resolve a booking's property and take that calendar's write lock,
    /// re-reading the booking under the lock. Bookings never move between
    /// properties, so the booking either still lives here or was deleted
    /// while we waited.
    pub(super) async fn lock_booking(
        &self,
        id: Ulid,
    ) -> Result<(Booking, OwnedRwLockWriteGuard<PropertyCalendar>), EngineError> {
        let property_id = self
            .bookings
            .get(&id)
            .map(|b| b.property_id.clone())
            .ok_or(EngineError::NotFound(id))?;
        let cal = self.store.calendar(&property_id);
        let guard = cal.write_owned().await;
        match self.bookings.get(&id).map(|b| b.value().clone()) {
            Some(booking) => Ok((booking, guard)),
            None => Err(EngineError::NotFound(id)),
        }
    }

    /// Same as [`Self::lock_booking`] for blocks, which can move between
    /// properties: re-resolve until the locked calendar is still the
    /// block's home.
    pub(super) async fn lock_block(
        &self,
        id: Ulid,
    ) -> Result<(Block, OwnedRwLockWriteGuard<PropertyCalendar>), EngineError> {
        loop {
            let property_id = self
                .blocks
                .get(&id)
                .map(|b| b.property_id.clone())
                .ok_or(EngineError::NotFound(id))?;
            let cal = self.store.calendar(&property_id);
            let guard = cal.write_owned().await;
            match self.blocks.get(&id).map(|b| b.value().clone()) {
                Some(block) if block.property_id == guard.property_id => {
                    return Ok((block, guard));
                }
                Some(_) => continue, // moved while we waited for the lock
                None => return Err(EngineError::NotFound(id)),
            }
        }
    }

    /// Compact the WAL down to the events needed to recreate current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();
        for entry in self.bookings.iter() {
            let b = entry.value();
            events.push(Event::BookingCreated {
                id: b.id,
                property_id: b.property_id.clone(),
                guest_name: b.guest_name.clone(),
                guest_email: b.guest_email.clone(),
                range: b.range,
            });
            if b.status == BookingStatus::Canceled {
                events.push(Event::BookingCanceled { id: b.id });
            }
        }
        for entry in self.blocks.iter() {
            let b = entry.value();
            events.push(Event::BlockCreated {
                id: b.id,
                property_id: b.property_id.clone(),
                range: b.range,
            });
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
