use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod describe;
pub mod list;
pub mod summary;

#[derive(Debug, Parser)]
#[command(name = "pqdata-toolbox", version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv). Use -q to quiet.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease output. Overrides -v.
    #[arg(short = 'q', long, action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the keys of a group.
    Ls {
        #[arg(value_name = "ROOT", help = "Path to the store root")]
        root: String,
        #[arg(value_name = "KEY_PATH", help = "Slash separated key path, e.g. mod/rna")]
        key_path: Option<String>,
    },
    /// Print the shape and schema of a table.
    Describe {
        #[arg(value_name = "ROOT", help = "Path to the store root")]
        root: String,
        #[arg(value_name = "KEY_PATH", help = "Slash separated key path, e.g. obsm/X_pca")]
        key_path: String,
    },
    /// Read the whole object and print a summary.
    Read {
        #[arg(value_name = "ROOT", help = "Path to the store root")]
        root: String,
    },
}

fn setup_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => pqdata_config::CONFIG.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Ls { root, key_path } => list::list_keys(&root, key_path.as_deref()),
        Commands::Describe { root, key_path } => describe::describe(&root, &key_path),
        Commands::Read { root } => summary::summarize(&root),
    }
}
