use crate::popup::{PopupHandle, PopupLauncher, PopupRequest};
use followgate_core::error::GateError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared closed flag for a fake popup.
#[derive(Debug, Clone, Default)]
pub struct ClosedFlag(Arc<AtomicBool>);

impl ClosedFlag {
    pub fn close(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct FakePopup {
    closed: ClosedFlag,
}

impl FakePopup {
    pub fn new() -> (Self, ClosedFlag) {
        let closed = ClosedFlag::default();
        (Self { closed: closed.clone() }, closed)
    }
}

impl PopupHandle for FakePopup {
    fn is_closed(&mut self) -> bool {
        self.closed.0.load(Ordering::SeqCst)
    }
}

/// Launcher that records requests and hands out fake popups.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    inner: Arc<Mutex<LauncherState>>,
}

#[derive(Default)]
struct LauncherState {
    blocked: bool,
    requests: Vec<PopupRequest>,
    popups: Vec<ClosedFlag>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.inner.lock().expect("launcher lock").blocked = blocked;
    }

    pub fn requests(&self) -> Vec<PopupRequest> {
        self.inner.lock().expect("launcher lock").requests.clone()
    }

    /// Close the popup opened for `generation`.
    pub fn close(&self, generation: u64) {
        let state = self.inner.lock().expect("launcher lock");
        let idx = state
            .requests
            .iter()
            .position(|r| r.generation == generation)
            .expect("no popup opened for generation");
        state.popups[idx].close();
    }
}

impl PopupLauncher for FakeLauncher {
    fn open(&mut self, request: &PopupRequest) -> Result<Box<dyn PopupHandle>, GateError> {
        let mut state = self.inner.lock().expect("launcher lock");
        if state.blocked {
            return Err(GateError::PopupBlocked("blocked by test".into()));
        }
        let (popup, closed) = FakePopup::new();
        state.requests.push(request.clone());
        state.popups.push(closed);
        Ok(Box::new(popup))
    }
}
