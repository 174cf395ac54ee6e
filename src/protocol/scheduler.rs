//! The async pipeline (§4.3): one dedicated writer thread per protocol,
//! consuming a byte-accounted FIFO. Producers enqueue under a mutex and
//! either block (throttled) or trim the oldest queued writes (non-throttled)
//! to make room.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use log::warn;

use crate::packet::Packet;
use crate::protocol::Protocol;

/// Anything a writer thread can execute. Admin commands (`Connect`,
/// `Disconnect`, `Dispatch`) are never evicted by the trim policy; only
/// `WritePacket` contributes to the byte cap and is eligible for eviction.
pub enum SchedulerCommand {
    Connect,
    Disconnect,
    Dispatch(Box<dyn FnOnce(&mut dyn Protocol) + Send>),
    WritePacket(Packet),
}

impl SchedulerCommand {
    fn size(&self) -> usize {
        match self {
            Self::WritePacket(p) => p.size(),
            _ => 0,
        }
    }

    fn is_write_packet(&self) -> bool {
        matches!(self, Self::WritePacket(_))
    }
}

impl std::fmt::Debug for SchedulerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "Connect"),
            Self::Disconnect => write!(f, "Disconnect"),
            Self::Dispatch(_) => write!(f, "Dispatch"),
            Self::WritePacket(p) => write!(f, "WritePacket({:?})", p.packet_type()),
        }
    }
}

struct State {
    queue: VecDeque<SchedulerCommand>,
    size_bytes: usize,
    closed: bool,
}

/// Outcome of a successful `enqueue`: how many bytes of queued writes were
/// evicted to make room (0 in the common case), and whether the new command
/// itself had to be dropped because it didn't fit even after trimming.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    pub trimmed_bytes: usize,
    pub dropped: bool,
}

/// Shared handle to a protocol's backlog: clone to hand the consuming side
/// to a writer thread while producers keep their own handle.
#[derive(Clone)]
pub struct Scheduler {
    state: Arc<Mutex<State>>,
    not_empty: Arc<Condvar>,
    not_full: Arc<Condvar>,
    cap: usize,
    throttle: bool,
}

impl Scheduler {
    #[must_use]
    pub fn new(cap: usize, throttle: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                queue: VecDeque::new(),
                size_bytes: 0,
                closed: false,
            })),
            not_empty: Arc::new(Condvar::new()),
            not_full: Arc::new(Condvar::new()),
            cap,
            throttle,
        }
    }

    /// Enqueues `cmd`. In throttled mode, blocks the caller while the queue
    /// is at capacity. In non-throttled mode, evicts the oldest
    /// `WritePacket` commands until `cmd` fits, dropping `cmd` itself if it
    /// still doesn't fit after the backlog is exhausted.
    ///
    /// Returns `Err` if the protocol has already been closed.
    pub fn enqueue(&self, cmd: SchedulerCommand) -> Result<EnqueueOutcome, ()> {
        let mut state = self.state.lock().map_err(|_| ())?;
        if state.closed {
            return Err(());
        }

        let size = cmd.size();
        let mut outcome = EnqueueOutcome::default();

        if self.throttle {
            while !state.closed && state.size_bytes + size > self.cap {
                state = self.not_full.wait(state).map_err(|_| ())?;
            }
            if state.closed {
                return Err(());
            }
        } else {
            while state.size_bytes + size > self.cap {
                // Evict the oldest `WritePacket` wherever it sits in the
                // queue, skipping over admin commands (`Connect`/
                // `Disconnect`/`Dispatch`) rather than stopping trim as soon
                // as one happens to be at the front.
                let Some(index) = state.queue.iter().position(SchedulerCommand::is_write_packet) else {
                    break;
                };
                let evicted = state.queue.remove(index).expect("index came from position() above");
                let evicted_size = evicted.size();
                state.size_bytes -= evicted_size;
                outcome.trimmed_bytes += evicted_size;
            }
            if state.size_bytes + size > self.cap {
                outcome.dropped = true;
                warn!("queue at capacity, dropping incoming write of {size} bytes");
                return Ok(outcome);
            }
            if outcome.trimmed_bytes > 0 {
                warn!("queue overflow, trimmed {} bytes of oldest writes", outcome.trimmed_bytes);
            }
        }

        state.size_bytes += size;
        state.queue.push_back(cmd);
        self.not_empty.notify_one();
        Ok(outcome)
    }

    /// Blocks until a command is available or the scheduler is closed and
    /// drained, then returns it.
    fn dequeue(&self) -> Option<SchedulerCommand> {
        let mut state = self.state.lock().ok()?;
        loop {
            if let Some(cmd) = state.queue.pop_front() {
                state.size_bytes -= cmd.size();
                self.not_full.notify_one();
                return Some(cmd);
            }
            if state.closed {
                return None;
            }
            state = self.not_empty.wait(state).ok()?;
        }
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.state.lock().map(|s| s.size_bytes).unwrap_or(0)
    }

    /// Discards every queued `WritePacket` command, leaving admin commands
    /// (`Connect`/`Disconnect`/`Dispatch`) in place. Used by `disconnect()`
    /// when `async.clearondisconnect=true` (§4.3, §5).
    pub fn clear_pending_writes(&self) -> usize {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        let mut cleared = 0usize;
        state.queue.retain(|cmd| {
            if cmd.is_write_packet() {
                cleared += cmd.size();
                false
            } else {
                true
            }
        });
        state.size_bytes -= cleared;
        self.not_full.notify_all();
        cleared
    }

    /// Wakes every blocked producer and consumer with an error; no further
    /// commands may be enqueued afterwards.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Spawns the dedicated writer thread. `handle` executes each command in
    /// submission order; the thread exits once a `Disconnect` is drained or
    /// the scheduler is closed with an empty queue.
    pub fn spawn_writer<F>(&self, mut handle: F) -> JoinHandle<()>
    where
        F: FnMut(SchedulerCommand) + Send + 'static,
    {
        let scheduler = self.clone();
        thread::spawn(move || {
            while let Some(cmd) = scheduler.dequeue() {
                let is_disconnect = matches!(cmd, SchedulerCommand::Disconnect);
                handle(cmd);
                if is_disconnect {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::packet::{LogEntry, Packet};

    fn write_of(bytes: usize) -> SchedulerCommand {
        let mut e = LogEntry::new(0, "x".repeat(bytes.saturating_sub(48).max(0)));
        e.level = Level::Debug;
        SchedulerCommand::WritePacket(Packet::from(e))
    }

    #[test]
    fn fifo_order_is_preserved() {
        let sched = Scheduler::new(1_000_000, true);
        for i in 0..5 {
            sched.enqueue(write_of(100 + i)).unwrap();
        }
        let order = Arc::new(Mutex::new(Vec::new()));
        let order2 = order.clone();
        sched.enqueue(SchedulerCommand::Disconnect).unwrap();
        let handle = sched.spawn_writer(move |cmd| {
            order2.lock().unwrap().push(format!("{cmd:?}"));
        });
        handle.join().unwrap();
        assert_eq!(order.lock().unwrap().len(), 6);
    }

    #[test]
    fn s5_non_throttled_trims_oldest_write_packets() {
        let sched = Scheduler::new(1024, false);
        let mut delivered = 0;
        for _ in 0..100 {
            let outcome = sched.enqueue(SchedulerCommand::WritePacket(Packet::from({
                let mut e = LogEntry::new(0, "x".repeat(200 - 48));
                e.level = Level::Debug;
                e
            })));
            if outcome.is_ok() {
                delivered += 1;
            }
        }
        assert!(sched.size_bytes() <= 1024);
        // every enqueue "succeeds" (no blocking, no error) even though most
        // are immediately trimmed away; what matters is the final backlog.
        assert_eq!(delivered, 100);
        assert!(sched.size_bytes() / 200 <= 5);
    }

    #[test]
    fn clear_pending_writes_drops_writes_but_keeps_admin_commands() {
        let sched = Scheduler::new(1_000_000, true);
        sched.enqueue(write_of(100)).unwrap();
        sched.enqueue(write_of(100)).unwrap();
        sched.enqueue(SchedulerCommand::Disconnect).unwrap();
        let cleared = sched.clear_pending_writes();
        assert!(cleared > 0);
        assert_eq!(sched.size_bytes(), 0);

        let order = Arc::new(Mutex::new(Vec::new()));
        let order2 = order.clone();
        let handle = sched.spawn_writer(move |cmd| {
            order2.lock().unwrap().push(format!("{cmd:?}"));
        });
        handle.join().unwrap();
        assert_eq!(order.lock().unwrap().len(), 1);
    }

    #[test]
    fn closed_scheduler_rejects_enqueue() {
        let sched = Scheduler::new(1024, true);
        sched.close();
        assert!(sched.enqueue(SchedulerCommand::Disconnect).is_err());
    }
}
