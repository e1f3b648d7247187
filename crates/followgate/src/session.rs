use crate::notify::Category;
use crate::poller::ClosurePoller;
use crate::popup::{PopupLauncher, PopupRequest};
use followgate_core::config::{Config, OpenerConfig, PopupConfig};
use followgate_core::error::GateError;
use followgate_core::signal::Signal;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Verification session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// No popup has been opened yet.
    #[default]
    Idle,
    /// Popup open, nothing heard from it.
    Opened,
    /// The popup reported a login in progress.
    AttemptDetected,
    Succeeded,
    ClosedWithoutSuccess,
    /// The user abandoned the popup.
    Cancelled,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Opened => "opened",
            State::AttemptDetected => "attempt_detected",
            State::Succeeded => "succeeded",
            State::ClosedWithoutSuccess => "closed_without_success",
            State::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One popup lifecycle. The three booleans are latches: once set they stay
/// set until the next generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationSession {
    pub generation: u64,
    pub state: State,
    pub attempt_seen: bool,
    pub success_seen: bool,
    pub closure_handled: bool,
}

/// Side effects the controller wants the caller to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Show(Category),
    Cancel(Category),
    /// Set `instagram_followed` on the form and clear its error.
    MarkFollowed,
    /// Stop the follow reminder for the rest of the page's life.
    DisarmReminder,
}

/// Reconciles popup messages, closure polling and focus changes into one
/// verdict per generation.
///
/// A closed popup, whether reported by the popup or seen by the poller, is
/// only judged after the settle delay so a success sent just before closing
/// still wins. The warning is emitted at most once per generation.
pub struct Controller {
    session: VerificationSession,
    poller: Option<ClosurePoller>,
    settle_until: Option<Instant>,
    warned: bool,
    popup: PopupConfig,
    opener: OpenerConfig,
}

impl Controller {
    pub fn new(config: &Config) -> Self {
        Self {
            session: VerificationSession::default(),
            poller: None,
            settle_until: None,
            warned: false,
            popup: config.popup.clone(),
            opener: config.opener.clone(),
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &VerificationSession {
        &self.session
    }

    pub fn state(&self) -> State {
        self.session.state
    }

    pub fn generation(&self) -> u64 {
        self.session.generation
    }

    #[cfg(test)]
    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Open a popup for a new generation, superseding whatever came before.
    ///
    /// If the popup is blocked nothing changes and the error is returned for
    /// the caller to surface.
    pub fn initiate(
        &mut self,
        launcher: &mut dyn PopupLauncher,
        now: Instant,
    ) -> Result<Vec<Action>, GateError> {
        let generation = self.session.generation + 1;
        let request = PopupRequest::new(&self.popup, &self.opener, generation);
        let handle = launcher.open(&request)?;

        if let Some(old) = self.poller.take() {
            debug!(generation = old.generation(), "stopping poller for superseded popup");
        }
        self.session = VerificationSession {
            generation,
            state: State::Opened,
            ..VerificationSession::default()
        };
        self.settle_until = None;
        self.warned = false;
        self.poller = Some(ClosurePoller::start(
            generation,
            handle,
            self.popup.poll_interval(),
            now,
        ));
        info!(generation, url = %request.url, "verification popup opened");

        Ok(vec![
            Action::Cancel(Category::ReminderPending),
            Action::Cancel(Category::ClosedWarning),
        ])
    }

    /// Single entry point for every signal source.
    ///
    /// Signals tagged with any generation other than the current one are
    /// rejected with `StaleSignal` and change nothing.
    pub fn handle_signal(&mut self, signal: Signal, now: Instant) -> Result<Vec<Action>, GateError> {
        if let Some(got) = signal.generation() {
            let current = self.session.generation;
            if got != current || current == 0 {
                debug!(got, current, ?signal, "dropping stale signal");
                return Err(GateError::StaleSignal { got, current });
            }
        }

        Ok(match signal {
            Signal::Attempt(_) => self.on_attempt(),
            Signal::Success(_) => self.on_success(),
            Signal::ClosedWithoutLogin(_) => self.on_closed_without_login(now),
            Signal::PopupClosed(_) => self.on_popup_closed(now),
            Signal::FocusRegained => self.on_focus(now),
        })
    }

    /// User abandoned the popup: stop watching it and drop any pending verdict.
    pub fn cancel(&mut self) -> Vec<Action> {
        match self.session.state {
            State::Opened | State::AttemptDetected | State::ClosedWithoutSuccess => {}
            _ => return Vec::new(),
        }
        self.poller = None;
        self.settle_until = None;
        self.session.state = State::Cancelled;
        info!(generation = self.session.generation, "verification cancelled");
        vec![Action::Cancel(Category::ClosedWarning)]
    }

    /// Run the poller and the settle timer if their deadlines have passed.
    pub fn check_timer(&mut self, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();

        if let Some(poller) = self.poller.as_mut() {
            if poller.poll(now) {
                info!(generation = poller.generation(), "popup closed");
                actions.extend(self.on_popup_closed(now));
            }
        }

        if self.settle_until.is_some_and(|at| now >= at) {
            self.settle_until = None;
            actions.extend(self.resolve_closure());
        }

        actions
    }

    /// The next instant at which `check_timer()` has work, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        let poll = self.poller.as_ref().map(|p| p.next_deadline());
        match (poll, self.settle_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn on_attempt(&mut self) -> Vec<Action> {
        self.session.attempt_seen = true;
        if self.session.state == State::Opened {
            debug!(generation = self.session.generation, "login attempt detected");
            self.session.state = State::AttemptDetected;
        }
        Vec::new()
    }

    fn on_success(&mut self) -> Vec<Action> {
        if self.session.success_seen {
            debug!(generation = self.session.generation, "duplicate success ignored");
            return Vec::new();
        }
        self.session.success_seen = true;
        self.session.attempt_seen = true;
        self.session.closure_handled = true;
        self.session.state = State::Succeeded;
        self.poller = None;
        self.settle_until = None;
        info!(generation = self.session.generation, "verification succeeded");

        vec![
            Action::MarkFollowed,
            Action::DisarmReminder,
            Action::Cancel(Category::ReminderPending),
            Action::Cancel(Category::ClosedWarning),
            Action::Show(Category::Success),
        ]
    }

    fn on_closed_without_login(&mut self, now: Instant) -> Vec<Action> {
        if self.session.success_seen || self.session.state == State::Cancelled {
            return Vec::new();
        }
        debug!(generation = self.session.generation, "popup reports closing without login");
        self.session.closure_handled = true;
        self.session.state = State::ClosedWithoutSuccess;
        self.arm_settle(now);
        Vec::new()
    }

    fn on_popup_closed(&mut self, now: Instant) -> Vec<Action> {
        self.poller = None;
        if self.session.success_seen || self.session.state == State::Cancelled {
            return Vec::new();
        }
        if self.session.closure_handled {
            debug!(generation = self.session.generation, "closure already handled by popup message");
            return Vec::new();
        }
        self.arm_settle(now);
        Vec::new()
    }

    /// Focus usually means the user came back from the popup: sample now
    /// instead of waiting for the next poll tick.
    fn on_focus(&mut self, now: Instant) -> Vec<Action> {
        let Some(poller) = self.poller.as_mut() else {
            return Vec::new();
        };
        if poller.sample(now) {
            info!(generation = poller.generation(), "popup closed (seen on focus)");
            return self.on_popup_closed(now);
        }
        Vec::new()
    }

    fn arm_settle(&mut self, now: Instant) {
        if self.settle_until.is_none() {
            self.settle_until = Some(now + self.popup.settle_delay());
        }
    }

    fn resolve_closure(&mut self) -> Vec<Action> {
        if self.session.success_seen {
            debug!("success arrived within settle window");
            return Vec::new();
        }
        if self.warned {
            return Vec::new();
        }
        self.warned = true;
        self.session.closure_handled = true;
        self.session.state = State::ClosedWithoutSuccess;
        warn!(
            generation = self.session.generation,
            attempt_seen = self.session.attempt_seen,
            "popup closed without completing login"
        );
        vec![Action::Show(Category::ClosedWarning)]
    }
}
