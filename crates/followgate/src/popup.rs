use followgate_core::config::{OpenerConfig, PopupConfig};
use followgate_core::error::GateError;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

/// Screen placement of a popup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl Geometry {
    /// Centre a `width` x `height` window on the opener.
    pub fn centered(opener: &OpenerConfig, width: u32, height: u32) -> Self {
        let left = opener.x + (opener.width as i32 - width as i32) / 2;
        let top = opener.y + (opener.height as i32 - height as i32) / 2;
        Self { width, height, left, top }
    }
}

/// Everything needed to open the popup for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRequest {
    pub generation: u64,
    pub url: String,
    pub geometry: Geometry,
}

impl PopupRequest {
    pub fn new(config: &PopupConfig, opener: &OpenerConfig, generation: u64) -> Self {
        Self {
            generation,
            url: session_url(&config.url, generation),
            geometry: Geometry::centered(opener, config.width, config.height),
        }
    }
}

/// Append the generation as a `session` query parameter so the popup can
/// echo it back with every message.
pub fn session_url(base: &str, generation: u64) -> String {
    let (base, fragment) = match base.split_once('#') {
        Some((b, f)) => (b, Some(f)),
        None => (base, None),
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    let mut url = format!("{base}{sep}session={generation}");
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// An opened popup window. No close notification exists, so callers poll.
pub trait PopupHandle: Send {
    fn is_closed(&mut self) -> bool;
}

pub trait PopupLauncher {
    /// Open one popup. A failure means the popup was blocked.
    fn open(&mut self, request: &PopupRequest) -> Result<Box<dyn PopupHandle>, GateError>;
}

/// Opens the popup by spawning a browser from an argv template.
pub struct CommandLauncher {
    template: Vec<String>,
}

impl CommandLauncher {
    pub fn new(config: &PopupConfig) -> Self {
        Self {
            template: config.command.clone(),
        }
    }

    fn argv(&self, request: &PopupRequest) -> Vec<String> {
        let g = &request.geometry;
        self.template
            .iter()
            .map(|arg| {
                arg.replace("{url}", &request.url)
                    .replace("{width}", &g.width.to_string())
                    .replace("{height}", &g.height.to_string())
                    .replace("{left}", &g.left.to_string())
                    .replace("{top}", &g.top.to_string())
            })
            .collect()
    }
}

impl PopupLauncher for CommandLauncher {
    fn open(&mut self, request: &PopupRequest) -> Result<Box<dyn PopupHandle>, GateError> {
        let argv = self.argv(request);
        let Some((program, args)) = argv.split_first() else {
            return Err(GateError::PopupBlocked("popup command is empty".into()));
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| GateError::PopupBlocked(format!("{program}: {e}")))?;

        info!(
            generation = request.generation,
            pid = child.id(),
            program = %program,
            "popup launched"
        );
        Ok(Box::new(ChildPopup { child: Some(child) }))
    }
}

/// A launched browser process. Dropping the handle does not close the
/// window, but the process is always reaped once it exits.
struct ChildPopup {
    child: Option<Child>,
}

impl PopupHandle for ChildPopup {
    fn is_closed(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), %status, "popup process exited");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(pid = child.id(), error = %e, "cannot query popup process, treating as closed");
                true
            }
        }
    }
}

impl Drop for ChildPopup {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }

        let pid = child.id();
        let reaper = std::thread::Builder::new()
            .name(format!("popup-reaper-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => debug!(pid, %status, "detached popup process reaped"),
                Err(e) => warn!(pid, error = %e, "failed to reap popup process"),
            });
        if let Err(e) = reaper {
            warn!(pid, error = %e, "cannot spawn popup reaper thread");
        }
    }
}
