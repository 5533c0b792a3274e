//! WowTTY entry point: option resolution, credential prompts, and the
//! reactor multiplexing keyboard lines, engine events, and the guild
//! refresh timer.

use std::io::Write as _;

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

use wowtty::commands::Registry;
use wowtty::options::{Cli, Options};
use wowtty::output::OutputRouter;
use wowtty::session::{Control, Session, GUILD_REFRESH_SECS};
use wowtty_sdk::engine::{self, ConnectConfig};
use wowtty_sdk::event::Event;

const BANNER: &str = r"
 _ _ _           _____ _____ __ __
| | | |___ _ _ _|_   _|_   _|  |  |
| | | | . | | | | | |   | | |_   _|
|_____|___|_____| |_|   |_|   |_|
";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wowtty=warn".into()),
        )
        .init();

    println!("{BANNER}");

    let options = Options::from_cli(Cli::parse())?;

    let account = match &options.user {
        Some(user) => user.clone(),
        None => match prompt_user() {
            Some(user) => user,
            None => return Ok(()),
        },
    };
    let password = match &options.pass {
        Some(pass) => pass.clone(),
        None => match rpassword::prompt_password("Enter pass: ") {
            Ok(pass) => pass,
            Err(_) => {
                println!();
                return Ok(());
            }
        },
    };

    println!("Connecting to realm server at {}:{}.", options.host, options.port);

    let (conn, mut events) = engine::connect(ConnectConfig {
        host: options.host.clone(),
        port: options.port,
        account,
        password,
    })
    .await?;

    let registry = Registry::new();
    let mut session = Session::new(options, conn, OutputRouter::stdout());
    run(&registry, &mut session, &mut events).await
}

/// Plain prompt for the account name. `None` means the operator aborted
/// entry, which exits cleanly.
fn prompt_user() -> Option<String> {
    print!("Enter user: ");
    std::io::stdout().flush().ok()?;
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => {
            println!();
            None
        }
        Ok(_) => Some(line.trim().to_string()),
    }
}

enum Input {
    Line(String),
    Event(Event),
    Tick,
    StdinClosed,
    EngineGone,
}

async fn run(
    registry: &Registry,
    session: &mut Session,
    events: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdin_open = true;
    let mut guild_timer: Option<Interval> = None;
    let mut timer_epoch = session.timer_epoch();

    loop {
        let input = tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => Input::Line(line),
                Ok(None) | Err(_) => Input::StdinClosed,
            },
            event = events.recv() => match event {
                Some(event) => Input::Event(event),
                None => Input::EngineGone,
            },
            _ = tick(&mut guild_timer) => Input::Tick,
        };

        match input {
            Input::Line(line) => registry.dispatch(&line, session),
            Input::Event(event) => match session.handle_event(event) {
                Control::Continue => {}
                Control::AuthFailed => std::process::exit(1),
            },
            Input::Tick => session.refresh_guild(),
            Input::StdinClosed => stdin_open = false,
            Input::EngineGone => return Ok(()),
        }

        if session.quit {
            return Ok(());
        }

        // Reconcile the running interval with the session's timer intent.
        // A new epoch means a fresh login: the period starts over.
        if session.timer_armed() {
            if guild_timer.is_none() || timer_epoch != session.timer_epoch() {
                timer_epoch = session.timer_epoch();
                let period = Duration::from_secs(GUILD_REFRESH_SECS);
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                guild_timer = Some(interval);
            }
        } else {
            guild_timer = None;
        }
    }
}

/// Resolves on the next guild refresh tick, never while the timer is
/// disarmed.
async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
