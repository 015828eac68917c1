mod config;
mod managers;
mod retention;
mod store;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use managers::backup::BackupManager;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pgbackup-manager")]
#[command(about = "PostgreSQL backup tool with GFS retention", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/pgbackup-manager/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump and prune all databases, or a specific database
    Run {
        /// Specific database to back up (defaults to all databases)
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Apply the retention policy without taking new backups
    Prune {
        /// Specific database to prune (defaults to all databases)
        #[arg(short, long)]
        database: Option<String>,

        /// Show what would be deleted without deleting anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List the databases the server reports (after exclusions)
    List,

    /// Show backups on disk and their retention classification
    Status {
        /// Specific database to inspect
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration. Configuration problems are usage
    // errors: report and exit 2 before touching any collaborator.
    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    // Setup logging with file rotation (must keep guard alive)
    let logging_config = managers::logging::LoggingConfig::from_config(
        &config.global.log_directory,
        &config.global.log_level,
        config.global.log_max_files,
    );
    let _log_guard = managers::logging::init_logging(&logging_config)?;

    // Ensure the postgres client tools are available (except for validate)
    match &cli.command {
        Some(Commands::Validate) => {
            // Skip tool check for validate
        }
        command => {
            let mut required = vec!["psql"];
            if matches!(command, Some(Commands::Run { .. })) {
                required.push("pg_dump");
            }
            for tool in required {
                if which::which(tool).is_err() {
                    eprintln!("⚠️  {} not found in PATH!", tool);
                    eprintln!();
                    eprintln!("The PostgreSQL client tools are required for backup operations.");
                    eprintln!("Install the postgresql client package for your platform and");
                    eprintln!("make sure '{}' is on PATH.", tool);
                    eprintln!();
                    std::process::exit(1);
                }
            }
        }
    }

    // Create backup manager
    let backup_manager = BackupManager::new(config.clone());

    // If no command specified, show status overview
    let command = cli.command.unwrap_or(Commands::Status { database: None });

    match command {
        Commands::Run { database } => {
            if let Some(database) = database {
                println!("Running backup for database: {}", database);
                backup_manager.run_database(&database)?;
                println!("✓ Backup completed successfully");
            } else {
                println!("Running backups for all databases...");
                backup_manager.run_all()?;
                println!("✓ All backups completed successfully");
            }
        }

        Commands::Prune { database, dry_run, yes } => {
            use dialoguer::Confirm;

            let databases = match database {
                Some(database) => vec![database],
                None => backup_manager.list_databases()?,
            };

            let today = chrono::Local::now().date_naive();
            let codec = backup_manager.codec();

            // Show the plan for every database before anything is deleted
            let mut total_discarded = 0;
            for database in &databases {
                let plan = backup_manager.plan_database(database, today)?;
                println!("=== {} ===", database);

                if plan.retained.is_empty() && plan.discarded.is_empty() {
                    println!("  No backups found.\n");
                    continue;
                }

                for date in &plan.retained {
                    println!("  keep    {}", codec.encode(database, *date));
                }
                for date in &plan.discarded {
                    println!("  delete  {}", codec.encode(database, *date));
                }
                println!();

                total_discarded += plan.discarded.len();
            }

            if total_discarded == 0 {
                println!("Nothing to prune.");
                return Ok(());
            }

            if dry_run {
                println!(
                    "DRY RUN: {} backup file(s) would be deleted.",
                    total_discarded
                );
                return Ok(());
            }

            if !yes {
                let confirm = Confirm::new()
                    .with_prompt(format!("Delete {} backup file(s)?", total_discarded))
                    .default(false)
                    .interact()?;

                if !confirm {
                    println!("Prune cancelled.");
                    return Ok(());
                }
            }

            let mut failures = 0;
            for database in &databases {
                match backup_manager.prune_database(database, today) {
                    Ok(plan) => {
                        if !plan.is_noop() {
                            println!("✓ Pruned {}: {} deleted", database, plan.discarded.len());
                        }
                    }
                    Err(e) => {
                        eprintln!("✗ Failed to prune {}: {}", database, e);
                        failures += 1;
                    }
                }
            }

            if failures > 0 {
                std::process::exit(1);
            }
        }

        Commands::List => {
            let databases = backup_manager.list_databases()?;
            println!("Databases eligible for backup:");
            for database in databases {
                println!("  {}", database);
            }
        }

        Commands::Status { database } => {
            // With an explicit database, show every file's classification
            let detailed = database.is_some();
            let databases = match database {
                Some(database) => vec![database],
                None => backup_manager.list_databases()?,
            };

            let today = chrono::Local::now().date_naive();
            let codec = backup_manager.codec();

            println!("=== Backup Status ===\n");
            for database in &databases {
                let plan = backup_manager.plan_database(database, today)?;
                let total = plan.retained.len() + plan.discarded.len();

                println!("Database: {}", database);
                if total == 0 {
                    println!("  No backups found.");
                } else {
                    println!("  Backups: {}", total);
                    let newest = plan
                        .retained
                        .first()
                        .into_iter()
                        .chain(plan.discarded.first())
                        .max();
                    if let Some(newest) = newest {
                        println!("  Most recent: {}", codec.encode(database, *newest));
                    }
                    if !plan.discarded.is_empty() {
                        println!("  Would prune: {}", plan.discarded.len());
                    }
                    if detailed {
                        for date in &plan.retained {
                            println!("    keep   {}", codec.encode(database, *date));
                        }
                        for date in &plan.discarded {
                            println!("    prune  {}", codec.encode(database, *date));
                        }
                    }
                }
                println!();
            }
        }

        Commands::Validate => {
            println!("Configuration is valid!");
            println!("Backup directory: {}", config.global.backup_directory.display());
            println!(
                "Retention: {} daily / {} weekly / {} monthly",
                config.global.retention_daily,
                config.global.retention_weekly,
                config.global.retention_monthly
            );
            println!(
                "Postgres: {}@{}:{}",
                config.postgres.user, config.postgres.host, config.postgres.port
            );
            if !config.postgres.exclude_databases.is_empty() {
                println!(
                    "Excluded databases: {}",
                    config.postgres.exclude_databases.join(", ")
                );
            }
        }
    }

    Ok(())
}
