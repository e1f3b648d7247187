use followgate_core::config::NotificationConfig;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Welcome,
    ReminderPending,
    Success,
    ClosedWarning,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Welcome => "welcome",
            Category::ReminderPending => "reminder_pending",
            Category::Success => "success",
            Category::ClosedWarning => "closed_warning",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Category::Welcome => "Applications are open! Fill in the form to apply for the internship.",
            Category::ReminderPending => "Don't forget: following our Instagram is required to apply.",
            Category::Success => "Instagram verified. Thanks for following!",
            Category::ClosedWarning => {
                "The Instagram window was closed before login completed. Run `followctl verify` to retry."
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRecord {
    pub category: Category,
    pub visible: bool,
    pub expires_at: Instant,
}

/// A visibility flip the UI should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Shown(Category),
    Hidden(Category),
}

/// Auto-dismissing notifications, at most one visible per category, plus the
/// two one-shot page timers (welcome and follow reminder).
pub struct Scheduler {
    records: BTreeMap<Category, NotificationRecord>,
    welcome_at: Option<Instant>,
    reminder_at: Option<Instant>,
    config: NotificationConfig,
}

impl Scheduler {
    /// Arm the welcome and reminder timers relative to page load.
    pub fn new(config: &NotificationConfig, now: Instant) -> Self {
        Self {
            records: BTreeMap::new(),
            welcome_at: Some(now + Duration::from_millis(config.welcome_delay_ms)),
            reminder_at: Some(now + Duration::from_millis(config.reminder_delay_ms)),
            config: config.clone(),
        }
    }

    fn duration(&self, category: Category) -> Duration {
        let ms = match category {
            Category::Welcome => self.config.welcome_ms,
            Category::ReminderPending => self.config.reminder_ms,
            Category::Success => self.config.success_ms,
            Category::ClosedWarning => self.config.closed_warning_ms,
        };
        Duration::from_millis(ms)
    }

    /// Show `category`, replacing any visible record of it. The dismiss
    /// timer restarts rather than stacking.
    pub fn show(&mut self, category: Category, now: Instant) -> Change {
        let expires_at = now + self.duration(category);
        self.records.insert(
            category,
            NotificationRecord {
                category,
                visible: true,
                expires_at,
            },
        );
        Change::Shown(category)
    }

    /// Hide `category` now. Returns a change only if it was visible.
    pub fn cancel(&mut self, category: Category) -> Option<Change> {
        match self.records.get_mut(&category) {
            Some(record) if record.visible => {
                record.visible = false;
                Some(Change::Hidden(category))
            }
            _ => None,
        }
    }

    /// Permanently stop the follow reminder from firing.
    pub fn disarm_reminder(&mut self) {
        if self.reminder_at.take().is_some() {
            debug!("follow reminder disarmed");
        }
    }

    pub fn is_visible(&self, category: Category) -> bool {
        self.records.get(&category).is_some_and(|r| r.visible)
    }

    #[cfg(test)]
    pub fn record(&self, category: Category) -> Option<&NotificationRecord> {
        self.records.get(&category)
    }

    pub fn visible(&self) -> Vec<Category> {
        self.records
            .values()
            .filter(|r| r.visible)
            .map(|r| r.category)
            .collect()
    }

    /// Expire records and fire the one-shot timers whose time has come.
    /// The reminder is skipped if the applicant has already followed.
    pub fn check_timer(&mut self, now: Instant, followed: bool) -> Vec<Change> {
        let mut changes = Vec::new();

        for record in self.records.values_mut() {
            if record.visible && now >= record.expires_at {
                record.visible = false;
                changes.push(Change::Hidden(record.category));
            }
        }

        if self.welcome_at.is_some_and(|at| now >= at) {
            self.welcome_at = None;
            changes.push(self.show(Category::Welcome, now));
        }

        if self.reminder_at.is_some_and(|at| now >= at) {
            self.reminder_at = None;
            if followed {
                debug!("already followed, skipping reminder");
            } else {
                changes.push(self.show(Category::ReminderPending, now));
            }
        }

        changes
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.records
            .values()
            .filter(|r| r.visible)
            .map(|r| r.expires_at)
            .chain(self.welcome_at)
            .chain(self.reminder_at)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn make() -> (Scheduler, Instant) {
        let t0 = Instant::now();
        (Scheduler::new(&NotificationConfig::default(), t0), t0)
    }

    #[test]
    fn nothing_visible_at_load() {
        let (mut s, t0) = make();
        assert!(s.check_timer(t0, false).is_empty());
        assert!(s.visible().is_empty());
    }

    #[test]
    fn first_deadline_is_the_welcome_delay() {
        let (s, t0) = make();
        assert_eq!(s.next_deadline(), Some(t0 + ms(1000)));
    }

    #[test]
    fn welcome_shows_after_one_second_for_four() {
        let (mut s, t0) = make();
        assert_eq!(s.check_timer(t0 + ms(1000), false), vec![Change::Shown(Category::Welcome)]);
        assert!(s.is_visible(Category::Welcome));
        assert_eq!(s.record(Category::Welcome).unwrap().expires_at, t0 + ms(5000));

        assert!(s.check_timer(t0 + ms(4999), false).is_empty());
        assert_eq!(s.check_timer(t0 + ms(5000), false), vec![Change::Hidden(Category::Welcome)]);
        assert!(!s.is_visible(Category::Welcome));
    }

    #[test]
    fn reminder_fires_at_ten_seconds_when_not_followed() {
        let (mut s, t0) = make();
        s.check_timer(t0 + ms(1000), false);
        let changes = s.check_timer(t0 + ms(10_000), false);
        assert!(changes.contains(&Change::Shown(Category::ReminderPending)));
        assert_eq!(s.record(Category::ReminderPending).unwrap().expires_at, t0 + ms(16_000));
    }

    #[test]
    fn reminder_skipped_when_followed() {
        let (mut s, t0) = make();
        let changes = s.check_timer(t0 + ms(10_000), true);
        assert!(!changes.contains(&Change::Shown(Category::ReminderPending)));
        // One-shot: never fires later either
        assert!(!s.check_timer(t0 + ms(20_000), false).contains(&Change::Shown(Category::ReminderPending)));
    }

    #[test]
    fn disarmed_reminder_never_fires() {
        let (mut s, t0) = make();
        s.disarm_reminder();
        let changes = s.check_timer(t0 + ms(30_000), false);
        assert!(!changes.contains(&Change::Shown(Category::ReminderPending)));
    }

    #[test]
    fn reshowing_restarts_timer_without_second_instance() {
        let (mut s, t0) = make();
        s.show(Category::ReminderPending, t0);
        s.show(Category::ReminderPending, t0 + ms(4000));
        assert_eq!(s.visible(), vec![Category::ReminderPending]);
        assert_eq!(s.record(Category::ReminderPending).unwrap().expires_at, t0 + ms(10_000));

        // The first 6s expiry no longer applies
        assert!(s.check_timer(t0 + ms(6000), true).iter().all(|c| *c != Change::Hidden(Category::ReminderPending)));
        assert!(s.is_visible(Category::ReminderPending));
    }

    #[test]
    fn cancel_hides_immediately_and_only_once() {
        let (mut s, t0) = make();
        s.show(Category::ClosedWarning, t0);
        assert_eq!(s.cancel(Category::ClosedWarning), Some(Change::Hidden(Category::ClosedWarning)));
        assert_eq!(s.cancel(Category::ClosedWarning), None);
        assert!(!s.is_visible(Category::ClosedWarning));
    }

    #[test]
    fn cancelled_record_does_not_expire_again() {
        let (mut s, t0) = make();
        s.disarm_reminder();
        s.show(Category::Success, t0);
        s.cancel(Category::Success);
        let changes = s.check_timer(t0 + ms(5000), true);
        assert!(!changes.contains(&Change::Hidden(Category::Success)));
    }

    #[test]
    fn categories_are_independent() {
        let (mut s, t0) = make();
        s.show(Category::Success, t0);
        s.show(Category::ClosedWarning, t0);
        assert_eq!(s.visible(), vec![Category::Success, Category::ClosedWarning]);
        // Success (5s) expires before the warning (8s)
        let changes = s.check_timer(t0 + ms(5000), true);
        assert!(changes.contains(&Change::Hidden(Category::Success)));
        assert!(s.is_visible(Category::ClosedWarning));
    }

    #[test]
    fn next_deadline_tracks_visible_expiry() {
        let (mut s, t0) = make();
        s.check_timer(t0 + ms(1000), false);
        s.disarm_reminder();
        assert_eq!(s.next_deadline(), Some(t0 + ms(5000)));
        s.check_timer(t0 + ms(5000), false);
        assert_eq!(s.next_deadline(), None);
    }
}
