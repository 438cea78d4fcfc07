//! ConsoleRelay CLI Client
//!
//! Attaches the local terminal to a relayed console.

use std::io::{self, BufRead, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;

use clap::Parser;
use crossbeam::channel;
use crossbeam::select;
use tracing_subscriber::{fmt, EnvFilter};

/// ConsoleRelay CLI
#[derive(Parser, Debug)]
#[command(name = "consolerelay-cli")]
#[command(about = "Attach to a relayed game server console")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:25575")]
    server: String,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();

    if let Err(e) = attach(&args.server) {
        tracing::error!("{}: {}", args.server, e);
        std::process::exit(1);
    }
}

/// Copy socket → stdout and stdin → socket until either side ends
///
/// Stdin is read on its own thread so a closed connection can end the
/// session even while the terminal is idle.
fn attach(server: &str) -> io::Result<()> {
    let stream = TcpStream::connect(server)?;
    stream.set_nodelay(true)?;
    tracing::info!("Connected to {}", server);

    // Never sent on: disconnects when the printer finishes
    let (done_tx, done_rx) = channel::bounded::<()>(0);
    let mut socket_reader = stream.try_clone()?;
    let printer = thread::spawn(move || {
        let _done = done_tx;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Err(e) = io::copy(&mut socket_reader, &mut out) {
            tracing::debug!("Connection read ended: {}", e);
        }
        let _ = out.flush();
    });

    let (line_tx, line_rx) = channel::unbounded::<io::Result<String>>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut writer = &stream;
    loop {
        select! {
            recv(line_rx) -> line => match line {
                Ok(line) => {
                    let line = line?;
                    if writer.write_all(format!("{}\n", line).as_bytes()).is_err() {
                        break;
                    }
                }
                // Stdin closed
                Err(_) => break,
            },
            recv(done_rx) -> _ => {
                tracing::info!("Server closed the connection");
                return Ok(());
            }
        }
    }

    let _ = stream.shutdown(Shutdown::Write);
    let _ = printer.join();
    Ok(())
}
