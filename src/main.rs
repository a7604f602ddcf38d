use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::PathBuf;
use std::process::ExitCode;
use subnet_allocator::commands::Command;
use subnet_allocator::output::{print_error, print_outcome};
use subnet_allocator::{Allocator, InventoryConfig, NetboxInventory, Result};

const LOG_CONFIG_FILE: &str = "log4rs.yml";

#[derive(Debug, Parser)]
#[command(name = "subnet-allocator")]
#[command(about = "Allocate non-overlapping IPv4 subnets from a parent block")]
struct Cli {
    /// Inventory config file (NETBOX_URL, NETBOX_TOKEN)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parent network to allocate from
    #[arg(long, default_value = "192.168.0.0/16")]
    parent: String,

    /// Enable debug logging when no log4rs.yml is present
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_logging(verbose: bool) {
    if log4rs::init_file(LOG_CONFIG_FILE, Default::default()).is_ok() {
        return;
    }
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)} {h({l:5})} {t} - {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("Error initializing logging: {e}");
            }
        }
        Err(e) => eprintln!("Error building logging config: {e}"),
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let outcome = if cli.command.needs_inventory() {
        let config = InventoryConfig::load(cli.config.as_deref())?;
        let inventory = NetboxInventory::new(&config)?;
        let allocator = Allocator::connect(&cli.parent, inventory).await?;
        cli.command.execute(&allocator).await?
    } else {
        cli.command.execute_local().await?
    };
    print_outcome(&outcome);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Do as little as possible in main.rs as it can't contain any tests
    let cli = Cli::parse();
    dotenv::dotenv().ok();
    init_logging(cli.verbose);
    log::info!("#Start main() {:?}", cli.command);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Command failed [{}]: {e}", e.kind());
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}
