use clap::{Parser, Subcommand};
use pup::{config, output, package};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pup")]
#[command(about = "Package a project directory into a distributable zip")]
#[command(long_about = "\
Package a project directory into a distributable zip

Rule files in the project root decide which files ship:

  project/
  ├── .puprc           # Tool config (JSON, optional)
  ├── .distfiles       # Allowlist: only matching files ship, ignore files are skipped
  ├── .distinclude     # Additional allowlist entries
  ├── .distignore      # Files that never ship
  └── .gitattributes   # `path export-ignore` lines are treated as ignores

A deny always beats an allow. Prefix a line with ! to move it to the other list.

Run 'pup gen-config' to print the stock .puprc.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Show resolved rules, exclusion reasons and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stage the project and zip it as <name>.<version>.zip
    Package {
        /// Version string used in the archive name
        version: String,
    },
    /// Show which files would ship without copying anything
    Check,
    /// Print the stock .puprc with all options
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Package { version } => {
            let config = config::load_config(&cli.root)?;
            println!("==> Packaging {}", cli.root.display());
            let result = package::package(
                &cli.root,
                &config,
                &version,
                &package::ZipCommand::default(),
            )?;
            output::print_package_output(&result, &cli.root);
        }
        Command::Check => {
            let config = config::load_config(&cli.root)?;
            println!("==> Checking {}", cli.root.display());
            let result = package::check(&cli.root, &config)?;
            output::print_check_output(&result, cli.verbose);
        }
        Command::GenConfig => {
            println!("{}", config::stock_config_json());
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug and the default is warn.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "pup=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
