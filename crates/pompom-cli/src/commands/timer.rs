use std::io::{BufRead, Write};
use std::sync::Arc;

use clap::Subcommand;
use pompom_core::timer::{minutes_to_secs, parse_minutes};
use pompom_core::{Config, Event, Notification, Notifier, Phase, TimerEngine, TimerView};
use tokio::sync::{broadcast, mpsc};

const BAR_WIDTH: usize = 20;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run an interactive work/break session in the terminal
    Run {
        /// Work minutes (defaults to timer.work_minutes from the config)
        #[arg(long, short, allow_hyphen_values = true)]
        minutes: Option<String>,
        /// Mute the chime; the break notice stays on screen instead
        #[arg(long)]
        mute: bool,
    },
}

/// A line typed by the user during a session.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start(Option<String>),
    Pause,
    Reset,
    Quit,
    Help,
    Nothing,
}

impl Command {
    fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Command::Nothing;
        };
        match word.to_ascii_lowercase().as_str() {
            "s" | "start" => Command::Start(words.next().map(str::to_string)),
            "p" | "pause" | "resume" => Command::Pause,
            "r" | "reset" => Command::Reset,
            "q" | "quit" | "exit" => Command::Quit,
            _ => Command::Help,
        }
    }
}

/// Prints announcements to the terminal and rings the bell for audible ones.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) {
        let bell = if notification.sound_volume.is_some() { "\x07" } else { "" };
        println!("\n{bell}*** {}: {} ***", notification.title, notification.body);
        if notification.sticky {
            println!("(muted: this notice stays until the next work phase or a reset)");
        }
    }

    fn dismiss(&self) {
        tracing::debug!("break notice dismissed");
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run { minutes, mute } => {
            // A broken config file should not keep the timer from running.
            let config = Config::load_or_default();
            let mut settings = config.timer_settings();
            if mute {
                settings.volume = 0;
            }
            let minutes = match minutes {
                Some(text) => parse_minutes(&text)?,
                None => i64::from(config.timer.work_minutes),
            };
            // Refuse bad input before any runtime or terminal setup.
            minutes_to_secs(minutes)?;

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async move {
                let engine = TimerEngine::new(settings, Arc::new(TerminalNotifier))?;
                session(&engine, minutes).await
            })
        }
    }
}

async fn session(engine: &TimerEngine, minutes: i64) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = engine.subscribe_view();
    let mut events = engine.subscribe_events();
    let mut input = spawn_input_reader();

    print_help();
    engine.start(minutes)?;

    loop {
        // Output first, so nothing already published is lost to a quit.
        tokio::select! {
            biased;
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                render(&view.borrow_and_update());
            }
            event = events.recv() => match event {
                Ok(event) => report(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "terminal fell behind on timer events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            line = input.recv() => {
                let Some(line) = line else {
                    // stdin closed
                    break;
                };
                match Command::parse(&line) {
                    Command::Start(text) => {
                        let result = match text {
                            Some(text) => engine.start_from_input(&text),
                            None => engine.start((engine.work_secs() / 60) as i64),
                        };
                        if let Err(err) = result {
                            eprintln!("error: {err}");
                        }
                    }
                    Command::Pause => engine.pause(),
                    Command::Reset => engine.reset(),
                    Command::Quit => break,
                    Command::Help => print_help(),
                    Command::Nothing => {}
                }
            }
        }
    }

    engine.shutdown().await;
    println!();
    Ok(())
}

/// Read stdin lines on a plain thread; the channel closes at EOF.
fn spawn_input_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_help() {
    println!("commands: [s]tart [minutes] | [p]ause/resume | [r]eset | [q]uit");
}

fn render(view: &TimerView) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(
        stdout,
        "\r{} [{}] {:<24}",
        view.time_text,
        progress_bar(view.progress),
        view.status.label()
    );
    let _ = stdout.flush();
}

fn report(event: &Event) {
    match event {
        Event::PhaseStarted {
            phase: Phase::Break,
            duration_secs,
            ..
        } => println!("\nbreak started ({} min)", duration_secs / 60),
        Event::PhaseStarted {
            phase: Phase::Work,
            duration_secs,
            ..
        } => println!("\nwork started ({} min)", duration_secs / 60),
        Event::PhaseCompleted { phase, .. } => {
            tracing::info!(?phase, "phase completed");
        }
        other => tracing::debug!(kind = other.kind(), "timer event"),
    }
}

/// Remaining time as a bar that empties as the phase runs.
fn progress_bar(progress: f64) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}
