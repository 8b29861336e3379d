//! Palisade: a village simulation speaking a line protocol.
//!
//! Reads commands from stdin and answers each with one line on stdout.
//! Logs go to stderr, filtered by `RUST_LOG`.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use palisade::clock::{Clock, ManualClock, SystemClock};
use palisade::config::GameConfig;
use palisade::notify::MemoryNotifier;
use palisade::protocol::session::write_error;
use palisade::protocol::{parse_command, CommandError, Flow, Session};
use palisade::store::MemoryStore;
use palisade::Game;

struct Args {
    config: Option<PathBuf>,
    manual_clock: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        manual_clock: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--manual-clock" => args.manual_clock = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("usage: palisade [--config PATH] [--manual-clock]");
            return ExitCode::from(2);
        }
    };
    let mut config = match &args.config {
        Some(path) => match GameConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::from(2);
            }
        },
        None => GameConfig::default(),
    };
    config.manual_clock |= args.manual_clock;

    let store = match &config.state_path {
        Some(path) => match MemoryStore::open(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => MemoryStore::new(),
    };
    let store = Arc::new(store);

    let manual_clock = config
        .manual_clock
        .then(|| Arc::new(ManualClock::new(SystemClock.now())));
    let clock: Arc<dyn Clock> = match &manual_clock {
        Some(c) => c.clone(),
        None => Arc::new(SystemClock),
    };
    let inbox = Arc::new(MemoryNotifier::new());
    let worker = config.worker_id();
    let game = Game::new(store, clock, inbox.clone(), config.clone());
    let dispatcher = Arc::new(game.dispatcher(worker));
    tracing::info!(worker, speed = config.speed, manual_clock = config.manual_clock, "palisade ready");

    let shutdown = Arc::new(AtomicBool::new(false));
    let background = if config.manual_clock {
        None
    } else {
        let dispatcher = dispatcher.clone();
        let shutdown = shutdown.clone();
        Some(std::thread::spawn(move || dispatcher.run(&shutdown)))
    };

    let mut session = Session::new(game, dispatcher, inbox, manual_clock);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let cmd = match parse_command(&line) {
            Ok(c) => c,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                if write_error(&mut out, &e.to_string()).is_err() {
                    break;
                }
                continue;
            }
        };

        match session.handle(cmd, &mut out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) | Err(_) => break,
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    if let Some(handle) = background {
        if handle.join().is_err() {
            tracing::error!("dispatcher thread panicked");
        }
    }
    ExitCode::SUCCESS
}
