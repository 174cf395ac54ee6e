//! The root of the transport core (§6, §9): the object application code
//! (or, more commonly, the external session API) talks to through
//! `submit`/`set_connections`/`dispatch`, plus a process-wide default
//! instance for callers that don't want to thread one through explicitly.

use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};

use log::{info, warn};

use crate::error::SiResult;
use crate::factory;
use crate::packet::Packet;
use crate::pipeline::{ErrorCallback, ErrorEvent, Pipeline};

fn no_op_error_cb() -> ErrorCallback {
    Arc::new(|_event: ErrorEvent| {})
}

/// Owns a fan-out of protocol sinks built from a connections string and
/// forwards packets to every one of them (§2). Cheap to construct; callers
/// typically keep one instance (or use [`init_default`]) for the lifetime
/// of the process.
pub struct SmartInspect {
    app_name: String,
    pipelines: Mutex<Vec<Pipeline>>,
    error_cb: Mutex<ErrorCallback>,
}

impl std::fmt::Debug for SmartInspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartInspect")
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

impl SmartInspect {
    #[must_use]
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            pipelines: Mutex::new(Vec::new()),
            error_cb: Mutex::new(no_op_error_cb()),
        }
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Registers the callback that receives asynchronous error
    /// notifications (§6, §7). Replaces any previously registered callback.
    pub fn set_error_callback(&self, cb: impl Fn(ErrorEvent) + Send + Sync + 'static) {
        if let Ok(mut slot) = self.error_cb.lock() {
            *slot = Arc::new(cb);
        }
    }

    fn error_callback(&self) -> ErrorCallback {
        self.error_cb.lock().map(|cb| cb.clone()).unwrap_or_else(|_| no_op_error_cb())
    }

    fn report(&self, event: ErrorEvent) {
        (self.error_callback())(event);
    }

    /// Replaces the active protocol set (§6). Builds the new pipelines
    /// first; on a configuration error the existing set is left completely
    /// untouched and the error is returned to the caller as well as
    /// reported via the error callback, matching §7's "fatal configuration
    /// errors additionally surface synchronously from `setConnections`".
    pub fn set_connections(&self, conns: &str) -> SiResult<()> {
        let error_cb = self.error_callback();
        match factory::build_pipelines(conns, error_cb.clone()) {
            Ok(new_pipelines) => {
                info!("{}: connections set to \"{conns}\"", self.app_name);
                let mut old = match self.pipelines.lock() {
                    Ok(mut guard) => std::mem::replace(&mut *guard, new_pipelines),
                    Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), new_pipelines),
                };
                for pipeline in &mut old {
                    let _ = pipeline.disconnect();
                }
                Ok(())
            }
            Err(error) => {
                warn!("{}: rejecting connections \"{conns}\": {error}", self.app_name);
                error_cb(ErrorEvent {
                    protocol: String::new(),
                    options: conns.to_string(),
                    error: clone_for_report(&error),
                });
                Err(error)
            }
        }
    }

    /// Submits `packet` to every configured sink (§6). Non-blocking unless
    /// a sink is synchronous, or asynchronous with `async.throttle=true` and
    /// at capacity. Per-sink I/O errors never propagate here; they reach the
    /// error callback instead (§7).
    pub fn submit(&self, packet: Packet) {
        let Ok(pipelines) = self.pipelines.lock() else { return };
        for pipeline in pipelines.iter() {
            if let Err(error) = pipeline.submit(packet.clone()) {
                self.report(ErrorEvent {
                    protocol: pipeline.name().to_string(),
                    options: pipeline.caption().to_string(),
                    error,
                });
            }
        }
    }

    /// Runs every protocol matching `protocol_filter` (`"*"` for all) through
    /// its `dispatch` hook and writes whatever it produced into `state`
    /// (§4.9, §6). Meaningful chiefly for the memory protocol; other
    /// protocols no-op.
    pub fn dispatch(&self, protocol_filter: &str, state: &mut dyn Write) -> SiResult<()> {
        let Ok(pipelines) = self.pipelines.lock() else {
            return Ok(());
        };
        for pipeline in pipelines
            .iter()
            .filter(|p| protocol_filter == "*" || p.name().eq_ignore_ascii_case(protocol_filter))
        {
            match pipeline.dispatch_to_buffer() {
                Ok(buf) => state.write_all(&buf)?,
                Err(error) => self.report(ErrorEvent {
                    protocol: pipeline.name().to_string(),
                    options: pipeline.caption().to_string(),
                    error,
                }),
            }
        }
        Ok(())
    }

    /// Disconnects and drops every configured sink, leaving the instance
    /// with none (equivalent to `set_connections("")`).
    pub fn clear_connections(&self) {
        let Ok(mut pipelines) = self.pipelines.lock() else { return };
        for pipeline in pipelines.iter_mut() {
            let _ = pipeline.disconnect();
        }
        pipelines.clear();
    }
}

/// `thiserror`'s `io::Error` source isn't `Clone`, so error events built
/// for both the error callback and the `Result` returned to the caller
/// re-render the original through its `Display` impl as a fresh
/// configuration error rather than sharing the same value.
fn clone_for_report(error: &crate::error::SiError) -> crate::error::SiError {
    crate::error::SiError::ConnectionsParse {
        position: 0,
        reason: error.to_string(),
    }
}

static DEFAULT: OnceLock<Mutex<Option<Arc<SmartInspect>>>> = OnceLock::new();

fn default_slot() -> &'static Mutex<Option<Arc<SmartInspect>>> {
    DEFAULT.get_or_init(|| Mutex::new(None))
}

/// Initializes (or replaces) the process-wide default instance (§9). Not a
/// language-level singleton: callers may still build isolated instances via
/// [`SmartInspect::new`] alongside this one.
pub fn init_default(app_name: impl Into<String>) -> Arc<SmartInspect> {
    let instance = Arc::new(SmartInspect::new(app_name));
    if let Ok(mut slot) = default_slot().lock() {
        *slot = Some(instance.clone());
    }
    instance
}

/// Returns the process-wide default instance, if [`init_default`] has been
/// called and [`close_default`] hasn't cleared it since.
#[must_use]
pub fn default() -> Option<Arc<SmartInspect>> {
    default_slot().lock().ok().and_then(|slot| slot.clone())
}

/// Disconnects and drops the process-wide default instance, if any.
pub fn close_default() {
    if let Ok(mut slot) = default_slot().lock() {
        if let Some(instance) = slot.take() {
            instance.clear_connections();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LogEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[test]
    fn submit_fans_out_to_every_configured_sink() {
        let dir = tempdir().unwrap();
        let path_a = dir.path().join("a.sil");
        let path_b = dir.path().join("b.sil");
        let si = SmartInspect::new("test-app");
        si.set_connections(&format!(
            "file(filename=\"{}\"),file(filename=\"{}\")",
            path_a.to_str().unwrap(),
            path_b.to_str().unwrap()
        ))
        .unwrap();

        si.submit(Packet::from(LogEntry::new(0, "hello")));
        si.clear_connections();

        assert!(std::fs::read(&path_a).unwrap().len() > 8);
        assert!(std::fs::read(&path_b).unwrap().len() > 8);
    }

    #[test]
    fn invalid_connections_leaves_existing_set_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.sil");
        let si = SmartInspect::new("test-app");
        si.set_connections(&format!("file(filename=\"{}\")", path.to_str().unwrap())).unwrap();

        let err = si.set_connections("bogus-protocol()");
        assert!(err.is_err());

        si.submit(Packet::from(LogEntry::new(0, "still-routed")));
        si.clear_connections();
        assert!(std::fs::read(&path).unwrap().len() > 8);
    }

    #[test]
    fn error_callback_receives_configuration_failures() {
        let si = SmartInspect::new("test-app");
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        si.set_error_callback(move |_event| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        let _ = si.set_connections("nope()");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn memory_dispatch_writes_buffered_packets() {
        let si = SmartInspect::new("test-app");
        si.set_connections("mem(astext=true,pattern=%title%)").unwrap();
        si.submit(Packet::from(LogEntry::new(0, "hi")));

        let mut out = Vec::new();
        si.dispatch("mem", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hi\r\n");
        si.clear_connections();
    }

    #[test]
    fn default_instance_lifecycle() {
        let instance = init_default("default-app");
        assert_eq!(instance.app_name(), "default-app");
        assert!(default().is_some());
        close_default();
        assert!(default().is_none());
    }
}
