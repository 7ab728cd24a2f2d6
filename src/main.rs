//! rental-lens - canned analytical reports over a read-only DVD rental datastore.

use rental_lens::catalog::QueryCatalog;
use rental_lens::cli::{Cli, Command};
use rental_lens::config::Config;
use rental_lens::db::{self, DatabaseClient};
use rental_lens::error::{ReportError, Result};
use rental_lens::logging;
use rental_lens::output::OutputFormatter;
use rental_lens::runner::QueryRunner;
use tracing::{debug, error};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Could not load .env: {e}");
        }
    }

    let cli = Cli::parse_args();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            logging::init_stderr_logging();
            fail(&e);
        }
    };
    logging::init(&config.logging);

    if let Err(e) = run(cli, config).await {
        fail(&e);
    }
}

fn fail(e: &ReportError) -> ! {
    error!("{}: {}", e.category(), e);
    eprintln!("{}: {}", e.category(), e);
    std::process::exit(1);
}

/// Loads configuration with precedence CLI > config file > environment.
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config);
    config.datastore.apply_env_defaults();
    debug!("Configuration loaded from {}", config_path.display());
    Ok(config)
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let mut catalog = QueryCatalog::dvd_rental()?;
    catalog.register_custom(&config.reports.custom)?;
    let formatter = OutputFormatter::new(config.output.format);

    // Catalog-only commands need no datastore.
    match &cli.command {
        Command::List => {
            print!("{}", formatter.format_catalog(&catalog)?);
            return Ok(());
        }
        Command::Show { id } => {
            print!("{}", formatter.format_entry(catalog.get(id)?)?);
            return Ok(());
        }
        _ => {}
    }

    let client = db::open(&config.datastore).await?;
    let runner = QueryRunner::new(&client, &catalog).with_max_rows(config.output.max_rows);

    let result = match &cli.command {
        Command::Run { id, .. } => {
            let params = cli.command.report_params()?;
            runner
                .run_catalog_entry(id, &params)
                .await
                .and_then(|outcome| formatter.format_outcome(&outcome))
        }
        Command::Sql { sql } => runner
            .run_ad_hoc(sql)
            .await
            .and_then(|outcome| formatter.format_outcome(&outcome)),
        Command::Tables => runner
            .tables()
            .await
            .and_then(|schema| formatter.format_tables(&schema)),
        Command::List | Command::Show { .. } => Ok(String::new()),
    };

    client.close().await?;
    let text = result?;
    print!("{text}");
    Ok(())
}
