//! seedcalc command line front end.
//!
//! Feeds key labels into the engine and prints the screen, either once for
//! keys given as arguments or after every line read from stdin.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use seedcalc::calculator::{
    ArithmeticEvaluator, CalculationMode, CalculatorEngine, EngineEvent, parse_keys,
};
use seedcalc::config::Config;
use seedcalc::logging::{LogConfig, init_logging};
use seedcalc::screen::Screen;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "seedcalc",
    version,
    about = "A calculator that can show its work",
    long_about = "Type calculator keys (digits, + - * / × ÷, ( ), ., =, AC, Del).\n\n\
                  With KEYS, presses them and prints the screen once.\n\
                  Without, reads one line of keys at a time from stdin."
)]
struct Cli {
    /// Keys to press, e.g. `12+3=` or `AC 7 ÷ 2 =`.
    #[arg(value_name = "KEYS")]
    keys: Vec<String>,

    /// Configuration file (default: the platform config directory).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// What `=` does, overriding the configuration file.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Play replays without pausing between frames.
    #[arg(long = "no-delay")]
    no_delay: bool,

    /// Print engine events as JSON lines instead of the screen.
    #[arg(long)]
    json: bool,

    /// More logging (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Regular,
    DemoSteps,
}

impl From<ModeArg> for CalculationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Regular => CalculationMode::Regular,
            ModeArg::DemoSteps => CalculationMode::DemoSteps,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_ansi(cli.log_file.is_none() && io::stderr().is_terminal())
        .with_log_file(cli.log_file.clone());
    init_logging(&log_config).context("failed to initialize logging")?;

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let mut engine =
        CalculatorEngine::with_config(Arc::new(ArithmeticEvaluator), config.engine_config());
    if let Some(mode) = cli.mode {
        engine.set_calculation_mode(mode.into());
    }
    debug!(engine_config = ?engine.config(), "starting engine");

    let frame_delay = if cli.no_delay {
        Duration::ZERO
    } else {
        config.frame_delay()
    };

    let mut session = Session::new(engine, frame_delay, cli.json);

    if !cli.keys.is_empty() {
        let line = cli.keys.join(" ");
        return session.run_line(&line);
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        if let Err(err) = session.run_line(&line) {
            eprintln!("error: {err:#}");
        }
    }
    Ok(())
}

/// An engine plus the output it drives.
struct Session {
    engine: CalculatorEngine,
    events: Option<flume::Receiver<EngineEvent>>,
    frame_delay: Duration,
}

impl Session {
    fn new(mut engine: CalculatorEngine, frame_delay: Duration, json: bool) -> Self {
        let events = json.then(|| engine.subscribe());
        Self {
            engine,
            events,
            frame_delay,
        }
    }

    /// Press every key in `line`, then print the result.
    fn run_line(&mut self, line: &str) -> Result<()> {
        let keys = parse_keys(line).with_context(|| format!("cannot read keys from {line:?}"))?;

        // The last replay frame already shows the final screen.
        let mut up_to_date = false;
        for key in keys {
            if !self.engine.accepting_input() {
                debug!(%key, "engine busy, key dropped");
                continue;
            }
            self.engine.handle_input(key);
            up_to_date = !self.engine.accepting_input();
            if up_to_date {
                self.play_replay()?;
            }
        }

        match self.events {
            Some(_) => self.flush_events(),
            None if up_to_date => Ok(()),
            None => self.print_screen(),
        }
    }

    /// Show every replay frame, pausing between them.
    fn play_replay(&mut self) -> Result<()> {
        while let Some(frame) = self.engine.advance_replay() {
            if self.events.is_some() {
                self.flush_events()?;
            } else {
                self.print_screen()?;
            }
            if !frame.is_final() && !self.frame_delay.is_zero() {
                thread::sleep(self.frame_delay);
            }
        }
        Ok(())
    }

    fn print_screen(&self) -> Result<()> {
        let screen = Screen::render(&self.engine);
        let mut out = io::stdout().lock();
        writeln!(out, "{screen}")?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }

    fn flush_events(&self) -> Result<()> {
        let Some(events) = &self.events else {
            return Ok(());
        };
        let mut out = io::stdout().lock();
        for event in events.try_iter() {
            let line = serde_json::to_string(&event).context("failed to encode event")?;
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }
}
