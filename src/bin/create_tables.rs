use anyhow::Result;
use songplays_dwh::cli::{self, Operation};
use songplays_dwh::util::env;

#[tokio::main]
async fn main() -> Result<()> {
    env::bootstrap_cli("create_tables")?;
    let config = cli::load_config(None, None)?;
    cli::execute(&config, Operation::CreateTables).await
}
