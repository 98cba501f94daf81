use anyhow::Result;
use clap::{Parser, Subcommand};
use songplays_dwh::cli::{self, Operation};
use songplays_dwh::util::env;

#[derive(Parser, Debug)]
#[command(name = "dwh", version, about = "Songplays warehouse loader")]
struct Cli {
    /// Override DWH_DIALECT (redshift or postgres)
    #[arg(long, global = true)]
    dialect: Option<String>,
    /// Override the warehouse connection URL
    #[arg(long, global = true)]
    db_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Drop and recreate the staging, fact and dimension tables
    CreateTables,
    /// Stage raw JSON, then populate the star schema
    Etl,
    /// Only load the staging tables
    Stage,
    /// Only run the star-schema inserts (staging must already be loaded)
    Transform,
    /// create-tables followed by etl
    Run,
    /// Print row counts for every table
    Counts,
    /// Compare live columns with the expected schema
    Audit,
    /// Print every statement a full run would issue, without connecting
    Plan,
}

impl From<Commands> for Operation {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::CreateTables => Operation::CreateTables,
            Commands::Etl => Operation::Etl,
            Commands::Stage => Operation::Stage,
            Commands::Transform => Operation::Transform,
            Commands::Run => Operation::Run,
            Commands::Counts => Operation::Counts,
            Commands::Audit => Operation::Audit,
            Commands::Plan => Operation::Plan,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env::bootstrap_cli("dwh")?;
    let args = Cli::parse();
    let config = cli::load_config(args.dialect, args.db_url)?;
    cli::execute(&config, args.command.into()).await
}
