//! Basecamp CLI - bootstrap and verify a model-serving platform on Kubernetes

use clap::{Parser, Subcommand};

mod commands;
mod display;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "basecamp")]
#[command(author = "Basecamp Contributors")]
#[command(version)]
#[command(about = "Bootstrap and verify a model-serving platform on Kubernetes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare this host: mirror config, swap, kernel modules, packages
    Node {
        /// Download mirror to use (global, cn)
        #[arg(long)]
        mirror: Option<String>,

        /// Model served by the inference release
        #[arg(long)]
        model: Option<String>,

        /// Evaluate guards and report, mutating nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Initialize the control plane, pod network, and node readiness
    Cluster {
        /// Download mirror to use (global, cn)
        #[arg(long)]
        mirror: Option<String>,

        /// Model served by the inference release
        #[arg(long)]
        model: Option<String>,

        /// Evaluate guards and report, mutating nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Install the platform: namespaces, storage, inference, console
    Platform {
        /// Download mirror to use (global, cn)
        #[arg(long)]
        mirror: Option<String>,

        /// Model served by the inference release
        #[arg(long)]
        model: Option<String>,

        /// Evaluate guards and report, mutating nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check platform health without mutating anything
    Verify {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    // Set debug level
    if cli.debug {
        // SAFETY: We're the only thread touching the environment at this point
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    let result = match cli.command {
        Commands::Node {
            mirror,
            model,
            dry_run,
        } => commands::node::run(mirror, model, dry_run).await,

        Commands::Cluster {
            mirror,
            model,
            dry_run,
        } => commands::cluster::run(mirror, model, dry_run).await,

        Commands::Platform {
            mirror,
            model,
            dry_run,
        } => commands::platform::run(mirror, model, dry_run).await,

        Commands::Verify { json } => commands::verify::run(json).await,
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(code);
        }
    }
}
