use std::net::{SocketAddr, TcpListener};
use std::process::{Command, ExitCode, Stdio};
use std::thread;

use anyhow::{bail, Context};
use clap::Parser;
use logbuffer::config::load_config;
use logbuffer::logging::setup_logging;
use logbuffer::LogBuffer;
use tracing::{debug, info, warn};

/// Run a command and stream its combined output to every TCP client that connects.
///
/// Clients that connect late receive everything printed so far, then live output,
/// and are disconnected when the command exits.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to accept viewer connections on
    #[arg(long, default_value = "127.0.0.1:7878")]
    listen: SocketAddr,

    /// Also echo output to this process's stdout
    #[arg(long)]
    echo: bool,

    /// Command to run, followed by its arguments
    #[arg(trailing_var_arg = true, required = true)]
    command: Vec<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    setup_logging();
    let args = Args::parse();

    let mut config = load_config()?;
    let Some((program, program_args)) = args.command.split_first() else {
        bail!("no command given");
    };
    config.name.get_or_insert_with(|| program.clone());

    let buffer = LogBuffer::with_config(&config);

    let listener = TcpListener::bind(args.listen).with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "Accepting viewers");
    {
        let buffer = buffer.clone();
        thread::spawn(move || serve_viewers(listener, buffer));
    }

    // Registered before the child starts so no output can be missed
    let echo = args.echo.then(|| buffer.subscribe(std::io::stdout()));

    let mut child = Command::new(program)
        .args(program_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    let stdout = child.stdout.take().context("child stdout was not piped")?;
    let stderr = child.stderr.take().context("child stderr was not piped")?;
    let pumps = [
        {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.capture(stdout))
        },
        {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.capture(stderr))
        },
    ];

    let status = child.wait().context("failed to wait for child")?;
    for pump in pumps {
        match pump.join() {
            Ok(Ok(bytes)) => debug!(bytes, "Output stream drained"),
            Ok(Err(e)) => warn!(error = %e, "Output stream ended with an error"),
            Err(_) => warn!("Output pump panicked"),
        }
    }

    buffer.close()?;
    if let Some(echo) = echo {
        echo.wait();
    }
    info!(%status, bytes = buffer.len(), "Command finished");

    Ok(status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map(ExitCode::from)
        .unwrap_or(ExitCode::FAILURE))
}

fn serve_viewers(listener: TcpListener, buffer: LogBuffer) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let peer = stream.peer_addr().ok();
                info!(?peer, "Viewer connected");
                let buffer = buffer.clone();
                thread::spawn(move || {
                    buffer.attach(stream);
                    debug!(?peer, "Viewer released");
                });
            }
            Err(e) => warn!(error = %e, "Failed to accept viewer"),
        }
    }
}
