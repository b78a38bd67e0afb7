//! Deadlock Simulator - terminal driver for the deadlock engine
//!
//! Usage:
//!   deadlock-sim levels
//!   deadlock-sim play --level 2
//!   deadlock-sim random --processes 4 --resources 3 --seed 42

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use deadlock_solver_core::config::EngineConfig;
use deadlock_solver_core::engine::{EngineEvent, Session};
use deadlock_solver_core::levels;
use deadlock_solver_core::logging::init_tracing;
use deadlock_solver_core::model::{ProcessId, ResourceId};
use deadlock_solver_core::scenario::ScenarioGenerator;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deadlock-sim")]
#[command(about = "Interactive deadlock detection and resolution simulator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON engine configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in levels
    Levels,

    /// Play a built-in level
    Play {
        #[arg(short, long, default_value = "1")]
        level: u32,
    },

    /// Play a randomly generated sandbox scenario
    Random {
        #[arg(short, long, default_value = "3")]
        processes: usize,

        #[arg(short, long, default_value = "3")]
        resources: usize,

        /// Seed for a reproducible scenario
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {:?}", path))?,
        None => EngineConfig::from_env()?,
    };
    init_tracing(&config.logging)?;

    let session = match cli.command {
        Commands::Levels => {
            print_levels();
            return Ok(());
        }
        Commands::Play { level } => {
            let Some(definition) = levels::level(level) else {
                bail!("unknown level {}", level);
            };
            println!("{} {}", format!("Level {}:", definition.id).bright_yellow().bold(), definition.title);
            println!("  {}", definition.objective);
            Session::start_level(&definition, config)?
        }
        Commands::Random {
            processes,
            resources,
            seed,
        } => {
            let generator = ScenarioGenerator::new(processes, resources)?;
            let scenario = match seed {
                Some(seed) => generator.generate_seeded(seed),
                None => generator.generate(&mut rand::thread_rng()),
            };
            Session::start(scenario.processes, scenario.resources, config)?
        }
    };

    run_repl(session)
}

fn print_levels() {
    println!("\n{}", "Built-in Levels:".bright_yellow().bold());
    for level in levels::builtin_levels() {
        println!(
            "  {} {} ({} processes, {} resources, {}s)",
            format!("{:>2}.", level.id).dimmed(),
            level.title.green(),
            level.processes.len(),
            level.resources.len(),
            level.max_time_secs
        );
    }
    println!();
}

fn print_help() {
    println!("\n{}", "Available Commands:".bright_yellow().bold());
    println!("  {}  - Allocate a resource to a process", "alloc <process> <resource>".green());
    println!("  {}  - Preempt a resource from its holder", "preempt <process> <resource>".green());
    println!("  {}  - Terminate a process", "kill <process>".green());
    println!("  {}  - Withdraw a process without penalty", "remove <process>".green());
    println!("  {}  - Release every allocation", "rollback".green());
    println!("  {}  - Run deadlock detection", "check".green());
    println!("  {}  - Show the wait-for graph", "graph".green());
    println!("  {}  - Show processes and resources", "state".green());
    println!("  {}  - Dump the session as JSON", "json".green());
    println!("  {}  - Exit", "quit".green());
    println!();
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::ResourceAllocated { process, resource } => {
            println!("  {} {} -> {}", "allocated".cyan(), resource, process)
        }
        EngineEvent::ProcessCompleted { process, reward } => {
            println!("  {} {} (+{})", "completed".green().bold(), process.id, reward)
        }
        EngineEvent::DeadlockDetected {
            cycle,
            strategies_remaining,
        } => {
            let path: Vec<&str> = cycle.iter().map(ProcessId::as_str).collect();
            println!("  {} {}", "DEADLOCK".red().bold(), path.join(" -> "));
            let names: Vec<String> = strategies_remaining.iter().map(|s| s.to_string()).collect();
            println!("  strategies left: {}", names.join(", "));
        }
        EngineEvent::DeadlockResolved { method, penalty, .. } => {
            println!("  {} by {} (-{})", "resolved".green(), method, penalty)
        }
        EngineEvent::StrategyUnavailable { strategy } => {
            println!("  {} {} already used", "unavailable:".yellow(), strategy)
        }
        EngineEvent::SessionEnded {
            status,
            reason,
            score,
        } => println!(
            "\n{} {} - {} (score {})",
            "Session".bright_yellow().bold(),
            status,
            reason,
            score
        ),
    }
}

fn print_state(session: &Session) {
    println!("\n{}", "Processes:".bright_yellow().bold());
    for process in session.processes() {
        let needs: Vec<String> = process
            .needs()
            .iter()
            .map(|r| {
                if process.holds(r) {
                    r.to_string().green().to_string()
                } else {
                    r.to_string()
                }
            })
            .collect();
        println!(
            "  {} {} [{}] {}%",
            process.icon,
            process.id.as_str().bold(),
            needs.join(" "),
            process.progress_percent()
        );
    }
    println!("{}", "Resources:".bright_yellow().bold());
    for resource in session.resources() {
        let holder = resource
            .held_by()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "free".dimmed().to_string());
        println!("  {} {} ({}) {}", resource.icon, resource.id, resource.name, holder);
    }
    println!("Score: {}\n", session.score());
}

fn execute(session: &mut Session, line: &str) -> anyhow::Result<bool> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [] => {}
        ["help"] => print_help(),
        ["quit"] | ["exit"] => return Ok(false),
        ["alloc", p, r] => {
            session.allocate(&ProcessId::new(*p), &ResourceId::new(*r))?;
        }
        ["preempt", p, r] => {
            let outcome = session.preempt(&ProcessId::new(*p), &ResourceId::new(*r))?;
            if !outcome.resolved {
                println!("  deadlock persists: {:?}", outcome.remaining_cycle);
            }
        }
        ["kill", p] => {
            let outcome = session.kill(&ProcessId::new(*p))?;
            if !outcome.resolved {
                println!("  deadlock persists: {:?}", outcome.remaining_cycle);
            }
        }
        ["remove", p] => {
            let released = session.remove_process(&ProcessId::new(*p))?;
            println!("  {} {} (released {:?})", "removed".cyan(), p, released);
        }
        ["rollback"] => {
            session.rollback()?;
        }
        ["check"] => {
            if !session.check_deadlock()?.detected {
                println!("  {}", "no deadlock".green());
            }
        }
        ["graph"] => {
            for (process, waits_for) in session.wait_for_graph().adjacency() {
                let targets: Vec<String> = waits_for.iter().map(|p| p.to_string()).collect();
                println!("  {} -> [{}]", process, targets.join(", "));
            }
        }
        ["state"] => print_state(session),
        ["json"] => println!("{}", serde_json::to_string_pretty(&session.snapshot())?),
        _ => bail!("unrecognised command '{}', type help", line),
    }
    Ok(true)
}

fn run_repl(mut session: Session) -> anyhow::Result<()> {
    session.subscribe(print_event);
    print_help();
    print_state(&session);

    let stdin = io::stdin();
    loop {
        print!("{} ", "deadlock>".bright_cyan());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match execute(&mut session, line.trim()) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => println!("  {} {}", "error:".red(), err),
        }

        if !session.status().is_running() {
            break;
        }
    }

    Ok(())
}
