use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use followgate_core::config;
use followgate_core::ipc::{self, ClientMsg, ServerMsg};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

#[derive(Parser)]
#[command(name = "followctl", about = "Drive a running followgate application page")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show verification and form status
    Status,
    /// Open the Instagram verification popup (again)
    Verify,
    /// Tell the page its window regained focus
    Focus,
    /// Abandon the current verification popup
    Cancel,
    /// Set a form field
    Set {
        /// first_name, last_name, mobile, email, college or passing_year
        field: String,
        value: String,
    },
    /// Select or deselect a technical skill
    Skill { name: String },
    /// Submit the application
    Submit,
    /// Relay a message as the popup page would
    Signal {
        kind: SignalKind,
        /// Generation from the popup URL's `session` parameter
        #[arg(long)]
        generation: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SignalKind {
    Attempt,
    Success,
    Closed,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let socket_path = config::socket_path();
    let stream = UnixStream::connect(&socket_path).with_context(|| {
        format!("connecting to followgate at {}\nIs the page running?", socket_path.display())
    })?;

    let mut writer = stream.try_clone().context("cloning stream")?;
    let reader = BufReader::new(stream);

    let msg = match cli.command {
        Command::Status => ClientMsg::GetStatus,
        Command::Verify => ClientMsg::Verify,
        Command::Focus => ClientMsg::Focus,
        Command::Cancel => ClientMsg::Cancel,
        Command::Set { field, value } => ClientMsg::SetField { field, value },
        Command::Skill { name } => ClientMsg::ToggleSkill { skill: name },
        Command::Submit => ClientMsg::Submit,
        Command::Signal { kind, generation } => match kind {
            SignalKind::Attempt => ClientMsg::LoginAttempt { generation },
            SignalKind::Success => ClientMsg::LoginSuccess { generation },
            SignalKind::Closed => ClientMsg::PopupClosedWithoutLogin { generation },
        },
    };

    let line = ipc::encode(&msg);
    writer
        .write_all(line.as_bytes())
        .context("sending command")?;

    // Read response
    for line in reader.lines() {
        let line = line.context("reading response")?;
        if let Some(resp) = ipc::decode_server(&line) {
            match resp {
                ServerMsg::Status {
                    generation,
                    state,
                    followed,
                    submitted,
                    notifications,
                } => {
                    println!("followgate v{}", env!("CARGO_PKG_VERSION"));
                    println!("  session:   #{} ({})", generation, state);
                    println!("  followed:  {}", followed);
                    println!("  submitted: {}", submitted);
                    if !notifications.is_empty() {
                        println!("  showing:   {}", notifications.join(", "));
                    }
                }
                ServerMsg::Ack { ok, message } => {
                    if ok {
                        println!("{}", message);
                    } else {
                        eprintln!("error: {}", message);
                        std::process::exit(1);
                    }
                }
            }
            break;
        }
    }

    Ok(())
}
