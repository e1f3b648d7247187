mod notify;
mod page;
mod poller;
mod popup;
mod session;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use followgate_core::config::{self, Config};
use followgate_core::ipc::{self, ClientMsg, ServerMsg};
use page::Page;
use popup::CommandLauncher;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// One decoded client message waiting for the page loop, with its reply slot.
struct Request {
    msg: ClientMsg,
    reply: oneshot::Sender<ServerMsg>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("followgate=info".parse()?),
        )
        .init();

    info!("followgate starting");

    let config = Config::load().context("loading config")?;
    info!(
        url = %config.popup.url,
        poll_ms = config.popup.poll_interval_ms,
        settle_ms = config.popup.settle_delay_ms,
        "config loaded"
    );

    let launcher = CommandLauncher::new(&config.popup);
    let mut page = Page::new(&config, Box::new(launcher), Instant::now());

    let (req_tx, mut req_rx) = mpsc::unbounded_channel::<Request>();

    let socket_path = config::socket_path();
    // Remove stale socket
    let _ = std::fs::remove_file(&socket_path);
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("binding socket {}", socket_path.display()))?;
    info!(path = %socket_path.display(), "IPC socket listening");

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    tokio::spawn(handle_ipc_client(stream, req_tx.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "IPC accept error");
                }
            }
        }
    });

    run_page(&mut page, &mut req_rx, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for interrupt");
        }
    })
    .await;

    info!("followgate shutting down");
    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

/// Page loop: the only place page state is touched, one input at a time.
/// Returns once `shutdown` completes. The future is polled across
/// iterations so a signal that lands between two inputs is not lost.
async fn run_page<F: Future>(
    page: &mut Page,
    requests: &mut mpsc::UnboundedReceiver<Request>,
    shutdown: F,
) {
    tokio::pin!(shutdown);

    loop {
        let deadline = page.next_deadline();
        let sleep_fut = match deadline {
            Some(dl) => tokio::time::sleep_until(tokio::time::Instant::from_std(dl)),
            None => tokio::time::sleep(Duration::from_secs(86400)),
        };
        let has_deadline = deadline.is_some();

        tokio::select! {
            Some(request) = requests.recv() => {
                let reply = page.handle(request.msg, Instant::now());
                // Client may have hung up; the input is applied regardless.
                let _ = request.reply.send(reply);
            }
            _ = sleep_fut, if has_deadline => {
                page.check_timers(Instant::now());
            }
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
        }
    }
}

/// Decode JSON lines from one client and forward them to the page loop,
/// writing each reply back on the same connection.
async fn handle_ipc_client(stream: UnixStream, req_tx: mpsc::UnboundedSender<Request>) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let Some(msg) = ipc::decode_client(&line) else {
            debug!(len = line.len(), "dropping undecodable line");
            continue;
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if req_tx.send(Request { msg, reply: reply_tx }).is_err() {
            break;
        }
        let Ok(reply) = reply_rx.await else {
            break;
        };
        if writer.write_all(ipc::encode(&reply).as_bytes()).await.is_err() {
            break;
        }
    }
}
