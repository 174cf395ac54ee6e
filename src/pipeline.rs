//! Binds a [`Protocol`] to the base-option machinery around it (§4.2–§4.4):
//! the optional async queue and dedicated writer thread, reconnect
//! throttling, and the secondary backlog that gets replayed on (re)connect
//! or once a packet reaches `backlog.flushon`. Level gating stays inside
//! each `Protocol` impl; everything else generic to every sink lives here.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use log::{debug, warn};

use crate::error::{SiError, SiResult};
use crate::packet::{LogHeader, Packet};
use crate::protocol::reconnect::ReconnectPolicy;
use crate::protocol::scheduler::{Scheduler, SchedulerCommand};
use crate::protocol::{hostname, BaseOptions, Protocol};

/// One error observation surfaced to callers (§6, §7): which protocol it
/// came from, that protocol's connection-string options (for diagnostics),
/// and the underlying cause.
#[derive(Debug)]
pub struct ErrorEvent {
    pub protocol: String,
    pub options: String,
    pub error: SiError,
}

/// Sink for asynchronous error notifications (§6). Cloned freely; every
/// pipeline and the root `SmartInspect` share one.
pub type ErrorCallback = Arc<dyn Fn(ErrorEvent) + Send + Sync>;

struct Shared {
    protocol: Box<dyn Protocol>,
    backlog: VecDeque<Packet>,
    backlog_bytes: u64,
}

/// A configured sink in the fan-out: a concrete `Protocol` plus everything
/// `spec.md` §4.2–§4.4 describes as shared across every protocol.
pub struct Pipeline {
    name: String,
    options_string: String,
    base: BaseOptions,
    shared: Arc<Mutex<Shared>>,
    reconnect: Arc<Mutex<ReconnectPolicy>>,
    scheduler: Option<Scheduler>,
    writer: Option<JoinHandle<()>>,
    error_cb: ErrorCallback,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        name: String,
        options_string: String,
        protocol: Box<dyn Protocol>,
        base: BaseOptions,
        error_cb: ErrorCallback,
    ) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            protocol,
            backlog: VecDeque::new(),
            backlog_bytes: 0,
        }));
        let reconnect = Arc::new(Mutex::new(ReconnectPolicy::new(
            base.reconnect,
            base.reconnect_interval_ms,
        )));

        let mut scheduler = None;
        let mut writer = None;
        if base.async_enabled {
            let sched = Scheduler::new(base.async_queue as usize, base.async_throttle);
            let writer_shared = shared.clone();
            let writer_reconnect = reconnect.clone();
            let writer_base = base.clone();
            let writer_caption = base.caption.clone();
            let writer_options = options_string.clone();
            let writer_error_cb = error_cb.clone();
            writer = Some(sched.spawn_writer(move |cmd| {
                run_command(
                    &writer_shared,
                    &writer_base,
                    &writer_reconnect,
                    &writer_caption,
                    &writer_options,
                    &writer_error_cb,
                    cmd,
                );
            }));
            scheduler = Some(sched);
        }

        Self {
            name,
            options_string,
            base,
            shared,
            reconnect,
            scheduler,
            writer,
            error_cb,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn caption(&self) -> &str {
        &self.base.caption
    }

    /// Forces an explicit connect. Protocols already connect lazily on
    /// first write, so this is only needed to pre-warm a sink, or to submit
    /// an admin `Connect` command ahead of any queued writes in async mode.
    pub fn connect(&self) -> SiResult<()> {
        if let Some(scheduler) = &self.scheduler {
            scheduler
                .enqueue(SchedulerCommand::Connect)
                .map(|_| ())
                .map_err(|()| SiError::Closed(self.base.caption.clone()))
        } else {
            self.shared.lock()?.protocol.connect()
        }
    }

    /// Submits `packet`. In sync mode this blocks for the I/O, holding the
    /// shared lock for the duration (§5). In async mode this enqueues the
    /// write and returns once it is durably queued (or, non-throttled and
    /// over capacity, once it has been accounted for and possibly trimmed).
    pub fn submit(&self, packet: Packet) -> SiResult<()> {
        if let Some(scheduler) = &self.scheduler {
            match scheduler.enqueue(SchedulerCommand::WritePacket(packet)) {
                Ok(outcome) => {
                    if outcome.trimmed_bytes > 0 || outcome.dropped {
                        (self.error_cb)(ErrorEvent {
                            protocol: self.name.clone(),
                            options: self.options_string.clone(),
                            error: SiError::QueueOverflow {
                                protocol: self.base.caption.clone(),
                                dropped_bytes: outcome.trimmed_bytes,
                            },
                        });
                    }
                    Ok(())
                }
                Err(()) => Err(SiError::Closed(self.base.caption.clone())),
            }
        } else {
            let mut shared = self.shared.lock()?;
            let mut reconnect = self.reconnect.lock()?;
            execute_write(
                &mut shared,
                &self.base,
                &mut reconnect,
                &self.options_string,
                packet,
                &self.error_cb,
            );
            Ok(())
        }
    }

    /// Runs `action` against the underlying protocol and returns whatever it
    /// wrote into its own buffer. Used for the memory protocol's
    /// dispatch-to-stream (§4.9); routed through the async queue (if any) so
    /// it observes the same FIFO ordering as queued writes (§4.3, §6).
    pub fn dispatch_to_buffer(&self) -> SiResult<Vec<u8>> {
        if let Some(scheduler) = &self.scheduler {
            let (tx, rx) = mpsc::channel::<SiResult<Vec<u8>>>();
            let action: Box<dyn FnOnce(&mut dyn Protocol) + Send> = Box::new(move |protocol| {
                let mut buf = Vec::new();
                let result = protocol.dispatch(&mut buf).map(|()| buf);
                let _ = tx.send(result);
            });
            scheduler
                .enqueue(SchedulerCommand::Dispatch(action))
                .map_err(|()| SiError::Closed(self.base.caption.clone()))?;
            rx.recv().map_err(|_| SiError::Closed(self.base.caption.clone()))?
        } else {
            let mut shared = self.shared.lock()?;
            let mut buf = Vec::new();
            shared.protocol.dispatch(&mut buf)?;
            Ok(buf)
        }
    }

    /// Disconnects the sink. In async mode, discards queued writes first if
    /// `async.clearondisconnect=true`, then submits a poison `Disconnect`
    /// and waits for the writer thread to exit (§4.3, §5).
    pub fn disconnect(&mut self) -> SiResult<()> {
        if let Some(scheduler) = self.scheduler.take() {
            if self.base.async_clearondisconnect {
                scheduler.clear_pending_writes();
            }
            let _ = scheduler.enqueue(SchedulerCommand::Disconnect);
            scheduler.close();
            if let Some(writer) = self.writer.take() {
                let _ = writer.join();
            }
            Ok(())
        } else {
            self.shared.lock()?.protocol.disconnect()
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

fn run_command(
    shared: &Arc<Mutex<Shared>>,
    base: &BaseOptions,
    reconnect: &Arc<Mutex<ReconnectPolicy>>,
    caption: &str,
    options_string: &str,
    error_cb: &ErrorCallback,
    cmd: SchedulerCommand,
) {
    match cmd {
        SchedulerCommand::Connect => {
            if let Ok(mut shared) = shared.lock() {
                if let Err(error) = shared.protocol.connect() {
                    error_cb(ErrorEvent {
                        protocol: caption.to_string(),
                        options: options_string.to_string(),
                        error,
                    });
                }
            }
        }
        SchedulerCommand::WritePacket(packet) => {
            if let (Ok(mut shared), Ok(mut reconnect)) = (shared.lock(), reconnect.lock()) {
                execute_write(&mut shared, base, &mut reconnect, options_string, packet, error_cb);
            }
        }
        SchedulerCommand::Disconnect => {
            if let Ok(mut shared) = shared.lock() {
                let _ = shared.protocol.disconnect();
            }
        }
        SchedulerCommand::Dispatch(action) => {
            if let Ok(mut shared) = shared.lock() {
                action(shared.protocol.as_mut());
            }
        }
    }
}

/// Writes one packet through the protocol, applying the backlog and
/// reconnect policies around it (§4.2–§4.4). Called both directly (sync
/// mode) and from the writer thread (async mode).
fn execute_write(
    shared: &mut Shared,
    base: &BaseOptions,
    reconnect: &mut ReconnectPolicy,
    options_string: &str,
    packet: Packet,
    error_cb: &ErrorCallback,
) {
    if base.backlog_enabled {
        let triggers_flush = packet.level() >= base.backlog_flushon;
        push_backlog(shared, base, packet);
        if triggers_flush {
            flush_backlog(shared, &base.caption, options_string, error_cb);
            if !base.backlog_keepopen {
                let _ = shared.protocol.disconnect();
            }
        }
        return;
    }
    write_through(shared, base, reconnect, options_string, packet, error_cb);
}

fn write_through(
    shared: &mut Shared,
    base: &BaseOptions,
    reconnect: &mut ReconnectPolicy,
    options_string: &str,
    packet: Packet,
    error_cb: &ErrorCallback,
) {
    if let Err(error) = shared.protocol.write_packet(&packet) {
        if base.reconnect {
            attempt_reconnect(shared, base, reconnect, options_string, error_cb);
        } else {
            error_cb(ErrorEvent {
                protocol: base.caption.clone(),
                options: options_string.to_string(),
                error,
            });
        }
    }
}

/// On write failure with `reconnect=true`: attempt `connect()` if
/// `reconnect.interval` has elapsed since the last attempt; on success,
/// write a fresh `LogHeader` and flush the backlog (§4.4). Otherwise the
/// failing packet is dropped silently, counted as a recoverable error (§4.4,
/// §7).
fn attempt_reconnect(
    shared: &mut Shared,
    base: &BaseOptions,
    reconnect: &mut ReconnectPolicy,
    options_string: &str,
    error_cb: &ErrorCallback,
) {
    if !reconnect.should_attempt(Instant::now()) {
        debug!("reconnect to {} throttled, dropping packet", base.caption);
        error_cb(ErrorEvent {
            protocol: base.caption.clone(),
            options: options_string.to_string(),
            error: SiError::Closed(base.caption.clone()),
        });
        return;
    }

    match shared.protocol.connect() {
        Ok(()) => {
            debug!("reconnected to {}", base.caption);
            let header = LogHeader::new(&[("hostname", &hostname()), ("appname", env!("CARGO_PKG_NAME"))]);
            let _ = shared.protocol.write_packet(&Packet::from(header));
            if base.backlog_enabled {
                flush_backlog(shared, &base.caption, options_string, error_cb);
            }
        }
        Err(error) => {
            warn!("reconnect to {} failed: {error}", base.caption);
            error_cb(ErrorEvent {
                protocol: base.caption.clone(),
                options: options_string.to_string(),
                error,
            });
        }
    }
}

fn push_backlog(shared: &mut Shared, base: &BaseOptions, packet: Packet) {
    let size = packet.size() as u64;
    if size > base.backlog_queue {
        return;
    }
    while shared.backlog_bytes + size > base.backlog_queue {
        let Some(oldest) = shared.backlog.pop_front() else { break };
        shared.backlog_bytes -= oldest.size() as u64;
    }
    shared.backlog_bytes += size;
    shared.backlog.push_back(packet);
}

fn flush_backlog(shared: &mut Shared, caption: &str, options_string: &str, error_cb: &ErrorCallback) {
    let packets: Vec<Packet> = shared.backlog.drain(..).collect();
    shared.backlog_bytes = 0;
    for packet in packets {
        if let Err(error) = shared.protocol.write_packet(&packet) {
            error_cb(ErrorEvent {
                protocol: caption.to_string(),
                options: options_string.to_string(),
                error,
            });
            break;
        }
    }
}
