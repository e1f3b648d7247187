use crate::notify::{Change, Scheduler};
use crate::popup::PopupLauncher;
use crate::session::{Action, Controller};
use followgate_core::config::Config;
use followgate_core::form::{ApplicationForm, Field, FormError};
use followgate_core::ipc::{ClientMsg, ServerMsg};
use followgate_core::signal::Signal;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const POPUP_BLOCKED_ALERT: &str =
    "Please allow popups for this site to continue with Instagram verification.";

/// Everything one open application page owns. Inputs are applied strictly
/// one at a time by the runtime loop.
pub struct Page {
    controller: Controller,
    scheduler: Scheduler,
    form: ApplicationForm,
    launcher: Box<dyn PopupLauncher>,
}

impl Page {
    pub fn new(config: &Config, launcher: Box<dyn PopupLauncher>, now: Instant) -> Self {
        Self {
            controller: Controller::new(config),
            scheduler: Scheduler::new(&config.notifications, now),
            form: ApplicationForm::new(),
            launcher,
        }
    }

    #[cfg(test)]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[cfg(test)]
    pub fn form(&self) -> &ApplicationForm {
        &self.form
    }

    /// Apply one inbound message and produce the reply for its sender.
    pub fn handle(&mut self, msg: ClientMsg, now: Instant) -> ServerMsg {
        match msg {
            ClientMsg::LoginSuccess { .. }
            | ClientMsg::LoginAttempt { .. }
            | ClientMsg::PopupClosedWithoutLogin { .. } => {
                match Signal::from_popup(&msg) {
                    Ok(signal) => self.signal(signal, now),
                    Err(e) => {
                        debug!(?msg, "dropping popup message without generation");
                        ServerMsg::failed(e.to_string())
                    }
                }
            }
            ClientMsg::Focus => self.signal(Signal::FocusRegained, now),
            ClientMsg::Verify => self.verify(now),
            ClientMsg::Cancel => {
                let actions = self.controller.cancel();
                self.apply(actions, now);
                ServerMsg::ok(format!("verification {}", self.controller.state()))
            }
            ClientMsg::SetField { field, value } => {
                match field.parse::<Field>().and_then(|f| self.form.set_field(f, value)) {
                    Ok(()) => ServerMsg::ok(format!("{field} updated")),
                    Err(e) => ServerMsg::failed(e.to_string()),
                }
            }
            ClientMsg::ToggleSkill { skill } => {
                let selected = self.form.toggle_skill(&skill);
                let verb = if selected { "selected" } else { "deselected" };
                ServerMsg::ok(format!("{skill} {verb}"))
            }
            ClientMsg::Submit => self.submit(),
            ClientMsg::GetStatus => self.status(),
            ClientMsg::Unknown => {
                debug!("ignoring unrecognised message");
                ServerMsg::failed("unrecognised message")
            }
        }
    }

    fn signal(&mut self, signal: Signal, now: Instant) -> ServerMsg {
        match self.controller.handle_signal(signal, now) {
            Ok(actions) => {
                self.apply(actions, now);
                ServerMsg::ok(format!("verification {}", self.controller.state()))
            }
            Err(e) => ServerMsg::failed(e.to_string()),
        }
    }

    fn verify(&mut self, now: Instant) -> ServerMsg {
        match self.controller.initiate(self.launcher.as_mut(), now) {
            Ok(actions) => {
                self.apply(actions, now);
                ServerMsg::ok(format!(
                    "verification popup opened (generation {})",
                    self.controller.generation()
                ))
            }
            Err(e) if e.is_user_facing() => {
                warn!(error = %e, "verification popup blocked");
                println!("[alert] {POPUP_BLOCKED_ALERT}");
                ServerMsg::failed(POPUP_BLOCKED_ALERT)
            }
            Err(e) => ServerMsg::failed(e.to_string()),
        }
    }

    fn submit(&mut self) -> ServerMsg {
        match self.form.submit() {
            Ok(()) => {
                match serde_json::to_string(&self.form) {
                    Ok(record) => info!(%record, "application submitted"),
                    Err(e) => warn!(error = %e, "application submitted but could not be logged"),
                }
                ServerMsg::ok("application submitted")
            }
            Err(FormError::Invalid(errors)) => {
                let summary: Vec<String> = errors
                    .iter()
                    .map(|(field, message)| format!("{field}: {message}"))
                    .collect();
                ServerMsg::failed(summary.join("\n"))
            }
            Err(e) => ServerMsg::failed(e.to_string()),
        }
    }

    pub fn status(&self) -> ServerMsg {
        ServerMsg::Status {
            generation: self.controller.generation(),
            state: self.controller.state().to_string(),
            followed: self.form.followed(),
            submitted: self.form.submitted(),
            notifications: self
                .scheduler
                .visible()
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    /// Fire whatever controller or notification timers are due.
    pub fn check_timers(&mut self, now: Instant) {
        let actions = self.controller.check_timer(now);
        self.apply(actions, now);
        for change in self.scheduler.check_timer(now, self.form.followed()) {
            render(change);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.controller.next_deadline(), self.scheduler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn apply(&mut self, actions: Vec<Action>, now: Instant) {
        for action in actions {
            match action {
                Action::Show(category) => render(self.scheduler.show(category, now)),
                Action::Cancel(category) => {
                    if let Some(change) = self.scheduler.cancel(category) {
                        render(change);
                    }
                }
                Action::MarkFollowed => self.form.mark_followed(),
                Action::DisarmReminder => self.scheduler.disarm_reminder(),
            }
        }
    }
}

fn render(change: Change) {
    match change {
        Change::Shown(category) => {
            info!(%category, "notification shown");
            println!("[{category}] {}", category.message());
        }
        Change::Hidden(category) => debug!(%category, "notification hidden"),
    }
}
