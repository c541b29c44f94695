//! `ecobot` – EcoBot Sim command line interface
//!
//! This binary drives the pond-cleaning simulation headlessly.  It:
//!
//! 1. Checks for `~/.ecobot/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Scatters the trash and starts the frame driver in standby.
//! 3. Drops the user into an **interactive REPL** with slash-commands
//!    (`/start`, `/status`, `/chat`, `/settings`, `/help`).
//! 4. Intercepts **Ctrl-C** to pause the mission and exit safely.

mod config;
mod models;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use ecobot_runtime::{DriverCommand, FrameDriver};
use ecobot_sim::Simulation;

fn main() {
    // RUST_LOG filters (default "info"); ECOBOT_LOG_FORMAT=json switches to
    // JSON lines.  User-facing output still uses println!.
    let _telemetry = ecobot_runtime::init_tracing("ecobot");

    print_banner();

    // ── First-Run Wizard ──────────────────────────────────────────────────
    match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(_)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
        }
    }
    let cfg = config::load_or_default();

    // ── Simulation ────────────────────────────────────────────────────────
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    let sim = match Simulation::new(cfg.simulation.clone()) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("{}: {}", "Invalid simulation settings".red(), e);
            eprintln!("  Fix [simulation] in {}", config::config_path().display());
            std::process::exit(1);
        }
    };
    println!(
        "  Pond ready: {} pieces of trash, robot on {}.",
        sim.items_remaining().to_string().bold(),
        sim.state().to_string().yellow()
    );

    let driver = {
        let _enter = runtime.enter();
        FrameDriver::new(sim, cfg.frame_rate).spawn()
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let commands = driver.commands();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – pausing the mission …".yellow().bold());
        if commands.try_send(DriverCommand::Stop).is_ok() {
            println!("{}", "  ✓ Robot paddles stopped.".green());
        }
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&runtime, &driver, shutdown);

    match runtime.block_on(driver.shutdown()) {
        Ok(sim) => println!(
            "  Final score: {} collected, {}% battery left.",
            format!("{} kg", sim.score()).green().bold(),
            sim.battery().level().round() as i32
        ),
        Err(e) => warn!(error = %e, "simulation did not shut down cleanly"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║       EcoBot First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up the AI Engineer.\n");

    let mut cfg = config::Config::default();

    println!("  Which AI provider should power the Engineer chat?");
    println!("    1) Google Gemini  (default, needs an API key)");
    println!("    2) Local AI via Ollama");
    let choice = prompt_line("  Enter choice [1]: ", "1");
    cfg.ai_provider = match choice.trim() {
        "2" => config::AiProvider::Ollama,
        _ => config::AiProvider::Gemini,
    };
    cfg.active_model = cfg.ai_provider.default_model().to_string();

    if cfg.ai_provider == config::AiProvider::Gemini {
        println!(
            "  {}",
            "Leave empty to use GEMINI_API_KEY from the environment.".dimmed()
        );
        cfg.gemini_api_key = prompt_line("  Gemini API key: ", "");
    }

    let count = prompt_line(
        &format!("  Pieces of trash in the pond [{}]: ", cfg.simulation.item_count),
        &cfg.simulation.item_count.to_string(),
    );
    if let Ok(n) = count.trim().parse::<usize>() {
        cfg.simulation.item_count = n;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ____         ___       __ "#.bold().green());
    println!("{}", r#"  / __/______  / _ )___  / /_"#.bold().green());
    println!("{}", r#" / _// __/ _ \/ _  / _ \/ __/"#.bold().green());
    println!("{}", r#"/___/\__/\___/____/\___/\__/ "#.bold().green());
    println!();
    println!(
        "  {} {}",
        "EcoBot Sim".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Autonomous Surface Cleaning Unit");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
