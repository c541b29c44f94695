//! REPL – the interactive EcoBot console.
//!
//! Supported slash-commands:
//!   /help           – show this list
//!   /start          – start the cleaning mission
//!   /stop           – pause the mission (battery is frozen)
//!   /reset          – return to standby with a full battery and all trash back
//!   /status         – mission dashboard
//!   /watch [secs]   – stream the dashboard once per second
//!   /chat           – open the EcoBot Engineer chat; plain lines are sent to it
//!   /back           – close the chat (its history is discarded)
//!   /settings       – edit `~/.ecobot/config.toml`
//!   /models         – list / switch the active AI model
//!   /quit | /exit   – stop the simulation and exit

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use ecobot_runtime::{
    ChatSession, CompletionBackend, DriverCommand, FrameDriverHandle, GeminiDriver,
    OpenAiCompatDriver, SessionError,
};
use ecobot_types::{Role, SimulationState, TelemetrySnapshot};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::runtime::Runtime;

use crate::config::{self, AiProvider, Config};
use crate::models;

const DEFAULT_WATCH_SECS: u64 = 10;

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(runtime: &Runtime, driver: &FrameDriverHandle, shutdown: Arc<AtomicBool>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}: {}", "Terminal error".red(), e);
            return;
        }
    };
    let mut repl = Repl {
        runtime,
        driver,
        shutdown,
        chat: None,
    };
    repl.run(&mut editor);
}

struct Repl<'a> {
    runtime: &'a Runtime,
    driver: &'a FrameDriverHandle,
    shutdown: Arc<AtomicBool>,
    /// Open chat, if any.  Closing it discards the conversation.
    chat: Option<ChatSession>,
}

impl Repl<'_> {
    fn run(&mut self, editor: &mut DefaultEditor) {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let prompt = if self.chat.is_some() {
                format!("{} ", "you>".bold().blue())
            } else {
                format!("{} ", "ecobot>".bold().cyan())
            };

            let line = match editor.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    self.quit();
                    break;
                }
                Err(e) => {
                    eprintln!("{}: {}", "Read error".red(), e);
                    break;
                }
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            let _ = editor.add_history_entry(input);

            if !input.starts_with('/') && self.chat.is_some() {
                self.send_chat(input);
                continue;
            }

            let mut words = input.split_whitespace();
            let command = words.next().unwrap_or_default();
            match command {
                "/help" => cmd_help(),
                "/start" => self.command(DriverCommand::Start, "Mission started."),
                "/stop" => self.command(DriverCommand::Stop, "Mission paused."),
                "/reset" => self.command(DriverCommand::Reset, "Simulation reset."),
                "/status" => print_status(&self.driver.snapshot()),
                "/watch" => {
                    let secs = words
                        .next()
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(DEFAULT_WATCH_SECS);
                    self.cmd_watch(secs);
                }
                "/chat" => self.cmd_chat(),
                "/back" => self.cmd_back(),
                "/settings" => cmd_settings(editor),
                "/models" => cmd_models(editor),
                "/quit" | "/exit" => {
                    self.quit();
                    break;
                }
                other => {
                    println!(
                        "{} '{}'. Type {} for available commands.",
                        "Unknown command:".red(),
                        other.yellow(),
                        "/help".bold()
                    );
                }
            }
        }
    }

    fn quit(&mut self) {
        if let Some(chat) = self.chat.take() {
            chat.close();
        }
        println!("{}", "Goodbye.".green());
        self.shutdown.store(true, Ordering::SeqCst);
    }

    // ── Simulation control ──────────────────────────────────────────────────

    fn command(&self, command: DriverCommand, done: &str) {
        match self.runtime.block_on(self.driver.send(command)) {
            Ok(()) => println!("  {} {}", "✓".green().bold(), done),
            Err(e) => println!("  {}: {}", "Error".red(), e),
        }
    }

    fn cmd_watch(&self, secs: u64) {
        println!("  Streaming telemetry for {secs}s …");
        for _ in 0..secs {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.runtime.block_on(tokio::time::sleep(Duration::from_secs(1)));
            println!("  {}", status_line(&self.driver.snapshot()));
        }
    }

    // ── Chat ────────────────────────────────────────────────────────────────

    fn cmd_chat(&mut self) {
        if self.chat.is_some() {
            println!("  Chat is already open. Type {} to close it.", "/back".bold());
            return;
        }
        let cfg = config::load_or_default();
        let session = ChatSession::new(build_backend(&cfg));
        println!();
        println!(
            "{} {}",
            "AI Engineer".bold().underline(),
            format!("({} · {})", cfg.ai_provider, cfg.active_model).dimmed()
        );
        for turn in session.turns() {
            print_turn(turn.role, &turn.text);
        }
        println!(
            "  {}",
            "Ask about materials, code, or physics … (/back to close)".dimmed()
        );
        self.chat = Some(session);
    }

    fn cmd_back(&mut self) {
        match self.chat.take() {
            Some(chat) => {
                chat.close();
                println!("  Chat closed.");
            }
            None => println!("  No chat is open."),
        }
    }

    fn send_chat(&self, text: &str) {
        let Some(chat) = &self.chat else {
            return;
        };
        println!("  {}", "Analyzing design schematics...".italic().dimmed());
        match self.runtime.block_on(chat.submit(text)) {
            Ok(reply) => print_turn(Role::Assistant, &reply),
            Err(SessionError::EmptyInput) => {}
            Err(e) => println!("  {}: {}", "Chat".yellow(), e),
        }
    }
}

/// Construct the completion backend selected in `cfg`.
pub fn build_backend(cfg: &Config) -> Arc<dyn CompletionBackend> {
    match cfg.ai_provider {
        AiProvider::Gemini => Arc::new(GeminiDriver::new(
            &cfg.gemini_url,
            &cfg.active_model,
            Some(cfg.gemini_api_key.clone()),
        )),
        AiProvider::Ollama => Arc::new(OpenAiCompatDriver::new(&cfg.ollama_url, &cfg.active_model)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

fn print_turn(role: Role, text: &str) {
    match role {
        Role::User => println!("  {} {}", "you".bold().blue(), text),
        Role::Assistant => println!("  {} {}", "engineer".bold().green(), text),
    }
}

fn battery_bar(percent: f32) -> String {
    let filled = ((percent / 10.0).round() as usize).min(10);
    format!("[{}{}]", "█".repeat(filled), "·".repeat(10 - filled))
}

fn status_line(snap: &TelemetrySnapshot) -> String {
    let state = match snap.state {
        SimulationState::Running => snap.state.to_string().blue().bold(),
        SimulationState::Idle => snap.state.to_string().yellow().bold(),
    };
    let battery = format!("{}%", snap.battery_percent.round() as i32);
    let battery = if snap.battery_low { battery.red() } else { battery.green() };
    format!(
        "{state}  {} kg  {battery}  ({:>6.2}, {:>6.2})  {:>4.0}°",
        snap.score,
        snap.position_x,
        snap.position_z,
        snap.heading_rad.to_degrees().rem_euclid(360.0),
    )
}

fn print_status(snap: &TelemetrySnapshot) {
    let battery = format!(
        "{} {}% Power",
        battery_bar(snap.battery_percent),
        snap.battery_percent.round() as i32
    );
    println!();
    println!("{}", "EcoBot Sim – Autonomous Surface Cleaning Unit".bold().underline());
    println!(
        "  Status          : {}",
        match snap.state {
            SimulationState::Running => snap.state.to_string().blue().bold(),
            SimulationState::Idle => snap.state.to_string().yellow().bold(),
        }
    );
    println!("  Trash collected : {}", format!("{} kg", snap.score).green());
    println!("  Items remaining : {}", snap.items_remaining);
    println!(
        "  Battery         : {}",
        if snap.battery_low { battery.red() } else { battery.green() }
    );
    println!(
        "  Position        : x {:.2}, z {:.2}",
        snap.position_x, snap.position_z
    );
    println!(
        "  Heading         : {:.0}° (target {:.0}°)",
        snap.heading_rad.to_degrees().rem_euclid(360.0),
        snap.target_heading_rad.to_degrees().rem_euclid(360.0)
    );
    println!("  Paddles         : {:.1} rad/s", snap.paddle_speed);
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "EcoBot Commands".bold().underline());
    println!("  {}          – start the cleaning mission", "/start".bold().cyan());
    println!("  {}           – pause the mission", "/stop".bold().cyan());
    println!("  {}          – standby, full battery, trash restored", "/reset".bold().cyan());
    println!("  {}         – mission dashboard", "/status".bold().cyan());
    println!("  {}   – stream the dashboard", "/watch [secs]".bold().cyan());
    println!("  {}           – talk to the AI Engineer", "/chat".bold().cyan());
    println!("  {}           – close the chat", "/back".bold().cyan());
    println!("  {}       – edit ~/.ecobot/config.toml", "/settings".bold().cyan());
    println!("  {}         – list and switch AI models", "/models".bold().cyan());
    println!("  {}   – exit", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_settings(editor: &mut DefaultEditor) {
    let mut cfg = match config::load() {
        Ok(Some(c)) => c,
        Ok(None) => Config::default(),
        Err(e) => {
            println!("{}: {}", "Error loading config".red(), e);
            return;
        }
    };

    println!("{}", "Settings Editor".bold().underline());
    println!("  (press Enter to keep the current value)");

    let provider = prompt_str(
        editor,
        &format!("  AI provider (gemini / ollama) [{}]: ", cfg.ai_provider),
        &cfg.ai_provider.to_string(),
    );
    let provider = match provider.to_lowercase().as_str() {
        "ollama" => AiProvider::Ollama,
        _ => AiProvider::Gemini,
    };
    if provider != cfg.ai_provider {
        cfg.active_model = provider.default_model().to_string();
        cfg.ai_provider = provider;
    }

    cfg.active_model = prompt_str(
        editor,
        &format!("  Active model [{}]: ", cfg.active_model),
        &cfg.active_model,
    );

    if cfg.ai_provider == AiProvider::Gemini {
        let shown = if cfg.gemini_api_key.is_empty() { "not set" } else { "set" };
        let key = prompt_str(editor, &format!("  Gemini API key [{shown}]: "), "");
        if !key.is_empty() {
            cfg.gemini_api_key = key;
        }
    } else {
        cfg.ollama_url = prompt_str(
            editor,
            &format!("  Ollama URL [{}]: ", cfg.ollama_url),
            &cfg.ollama_url,
        );
    }

    let count = prompt_str(
        editor,
        &format!("  Trash items [{}]: ", cfg.simulation.item_count),
        &cfg.simulation.item_count.to_string(),
    );
    match count.parse::<usize>() {
        Ok(n) => cfg.simulation.item_count = n,
        Err(_) => println!(
            "  {} '{}' is not a number, keeping {}",
            "Warning:".yellow(),
            count,
            cfg.simulation.item_count
        ),
    }

    match config::save(&cfg) {
        Ok(()) => {
            println!(
                "{} {}",
                "✓ Settings saved to".green(),
                config::config_path().display().to_string().bold()
            );
            println!("  Chat changes apply to the next /chat; pond changes to the next launch.");
        }
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

fn cmd_models(editor: &mut DefaultEditor) {
    let cfg = config::load_or_default();

    println!("{}", "AI Models".bold().underline());
    println!("  Provider     : {}", cfg.ai_provider.to_string().yellow());
    println!("  Active model : {}", cfg.active_model.yellow());

    let available: Vec<String> = match cfg.ai_provider {
        AiProvider::Gemini => {
            let key = if cfg.gemini_api_key.is_empty() {
                "not set – chat replies will fall back to an apology".red()
            } else {
                "set".green()
            };
            println!("  API key      : {}", key);
            models::GEMINI_MODELS.iter().map(|m| m.to_string()).collect()
        }
        AiProvider::Ollama => match models::fetch_ollama_models(&cfg.ollama_url) {
            Ok(models) if models.is_empty() => {
                println!("  {}", "Ollama is online but has no models.".yellow());
                println!("  Run `ollama pull llama3` to download one.");
                return;
            }
            Ok(models) => models,
            Err(e) => {
                println!("  {}", "Ollama offline".red());
                println!("  {}", e.dimmed());
                println!("  Is Ollama running?  Try: ollama serve");
                return;
            }
        },
    };

    for name in &available {
        let marker = if *name == cfg.active_model { "▶" } else { " " };
        println!("    {} {}", marker.green(), name.bold());
    }

    let choice = prompt_str(
        editor,
        &format!("  Switch to model [{}]: ", cfg.active_model),
        &cfg.active_model,
    );
    if choice == cfg.active_model {
        return;
    }
    if !available.iter().any(|m| *m == choice) {
        println!("{} '{}'", "Unknown model:".red(), choice.yellow());
        return;
    }
    let mut new_cfg = cfg.clone();
    new_cfg.active_model = choice.clone();
    match config::save(&new_cfg) {
        Ok(()) => println!("{} {}", "✓ Active model set to".green(), choice.bold()),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Prompt for a string value.  Returns `default` when the user presses Enter.
fn prompt_str(editor: &mut DefaultEditor, msg: &str, default: &str) -> String {
    match editor.readline(msg) {
        Ok(line) => {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(_) => default.to_string(),
    }
}
