//! dbgcon binary entry point.
//!
//! Interactive terminal front-end for a remote debuggee: publishes its
//! listening endpoints for the launching editor, accepts one command session
//! connection, and runs the command loop until the session ends.

use clap::Parser;
use tokio::runtime::Runtime;
use tracing::{error, info};

use dbgcon_console::cli::Cli;
use dbgcon_console::console::{Console, ConsoleOptions};
use dbgcon_core::bootstrap::{EndpointFormat, EndpointGuard, publish_endpoint, write_pid_file};
use dbgcon_core::constants::SHUTDOWN_LINGER;
use dbgcon_core::events::run_event_listener;
use dbgcon_core::session::Session;

fn main() {
    let cli = Cli::parse();

    let log_format = cli.log_format.into();
    if let Err(e) = dbgcon_core::init_logging(cli.verbose, cli.log_file.as_deref(), log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "debug console starting");

    if let Some(path) = &cli.pid_file {
        if let Err(e) = write_pid_file(path) {
            error!(path = %path.display(), error = %e, "failed to write pid file");
            eprintln!("dbgcon: {}", e);
            std::process::exit(1);
        }
    }

    let rt = Runtime::new().expect("failed to create tokio runtime");

    if let Err(e) = run(&rt, &cli) {
        error!(error = %e, fatal = e.is_fatal(), "console session failed");
        eprintln!("dbgcon: {}", e);
        std::process::exit(1);
    }
}

fn run(rt: &Runtime, cli: &Cli) -> dbgcon_core::Result<()> {
    // Bind, publish, and accept on the runtime; the guards must outlive the
    // console so the published files are removed at exit.
    let (session, _guards) = rt.block_on(setup(cli))?;

    // Interactive interrupts are absorbed, never propagated: an in-flight
    // request must not be abandoned mid-frame.
    rt.spawn(async {
        loop {
            let _ = tokio::signal::ctrl_c().await;
            info!("interrupt absorbed");
        }
    });

    let options = ConsoleOptions {
        history: cli.history.clone(),
        vim: cli.vim,
    };
    let console = Console::new(rt.handle().clone(), session, options)?;

    // The command loop runs on the main thread; the frame reader and event
    // tasks run on the runtime's workers.
    let session = console.run()?;

    // Give the editor a moment to collect trailing output before the
    // endpoint files disappear.
    std::thread::sleep(SHUTDOWN_LINGER);

    rt.block_on(session.join())
}

async fn setup(cli: &Cli) -> dbgcon_core::Result<(Session, Vec<EndpointGuard>)> {
    let mut guards = Vec::new();

    let (command_listener, command_guard) =
        publish_endpoint(&cli.client_addr_file, EndpointFormat::HostPort).await?;
    guards.push(command_guard);

    let event_listener = match &cli.program_port_file {
        Some(path) => {
            let (listener, guard) = publish_endpoint(path, EndpointFormat::PortOnly).await?;
            guards.push(guard);
            Some(listener)
        }
        None => None,
    };

    // Exactly one command session per process
    let (conn, peer) = command_listener.accept().await?;
    info!(%peer, "command session connected");
    let session = Session::start(conn);

    if let Some(listener) = event_listener {
        tokio::spawn(run_event_listener(
            listener,
            cli.program_type.clone(),
            session.writer(),
        ));
    }

    Ok((session, guards))
}
