//! Best-effort handoff cleanup on termination.
//!
//! A hook interrupted between phases must not leave a stale handoff record
//! behind, and must never report failure to git. Signal handlers unlink the
//! record and exit 0; [`HandoffGuard`] covers ordinary early returns and
//! panics.
use crate::handoff::HandoffStore;
use std::path::Path;

#[cfg(unix)]
mod imp {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;
    use std::sync::OnceLock;

    static HANDOFF_PATH: OnceLock<CString> = OnceLock::new();

    extern "C" fn on_signal(_signal: libc::c_int) {
        // Only async-signal-safe calls below.
        if let Some(path) = HANDOFF_PATH.get() {
            unsafe {
                libc::unlink(path.as_ptr());
            }
        }
        unsafe { libc::_exit(0) }
    }

    pub fn install(handoff_path: &Path) -> bool {
        let Ok(path) = CString::new(handoff_path.as_os_str().as_bytes()) else {
            return false;
        };
        if HANDOFF_PATH.set(path).is_err() {
            return false;
        }
        let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        for signal in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP] {
            let previous = unsafe { libc::signal(signal, handler) };
            if previous == libc::SIG_ERR {
                tracing::warn!(signal, "failed to install signal handler");
            }
        }
        true
    }
}

#[cfg(not(unix))]
mod imp {
    use std::path::Path;

    pub fn install(_handoff_path: &Path) -> bool {
        false
    }
}

/// Register SIGINT/SIGTERM/SIGHUP handlers that delete `handoff_path` and
/// exit with status 0. Only the first call in a process takes effect.
pub fn install(handoff_path: &Path) -> bool {
    let installed = imp::install(handoff_path);
    tracing::debug!(installed, path = %handoff_path.display(), "shutdown handlers");
    installed
}

/// Deletes the handoff record when dropped.
pub struct HandoffGuard<'a> {
    store: &'a HandoffStore,
    armed: bool,
}

impl<'a> HandoffGuard<'a> {
    pub fn new(store: &'a HandoffStore) -> Self {
        Self { store, armed: true }
    }

    /// Keep the record; used when phase A hands it to phase B.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for HandoffGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.delete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::HandoffMetadata;

    #[test]
    fn guard_deletes_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HandoffStore::new(dir.path().join("handoff.json"));
        store
            .write(&HandoffMetadata::new("m".to_string(), true))
            .expect("write");
        {
            let _guard = HandoffGuard::new(&store);
        }
        assert!(!store.path().exists());
    }

    #[test]
    fn guard_deletes_during_panic_unwind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HandoffStore::new(dir.path().join("handoff.json"));
        store
            .write(&HandoffMetadata::new("m".to_string(), true))
            .expect("write");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = HandoffGuard::new(&store);
            panic!("interrupted mid-phase");
        }));
        assert!(result.is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn disarmed_guard_keeps_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = HandoffStore::new(dir.path().join("handoff.json"));
        store
            .write(&HandoffMetadata::new("m".to_string(), true))
            .expect("write");
        HandoffGuard::new(&store).disarm();
        assert!(store.load().is_some());
    }
}
