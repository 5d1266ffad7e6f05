//! One-shot migration of the JSON file store into PostgreSQL.
//!
//! Reads `roles.json` and `votes.json` from the data directory
//! (`BLINDVOTE_DATA_DIR`, default the working directory), writes everything
//! into the database named by `DATABASE_URL`, verifies row counts, and
//! leaves timestamped backups of the source files behind. The originals are
//! never modified.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use log::info;

use blindvote::migration::Migrator;
use blindvote::storage::traits::{RoleStorage, VoteStorage};
use blindvote::storage::{DbStorage, JsonConnection, DATABASE_URL_ENV};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let database_url = std::env::var(DATABASE_URL_ENV).unwrap_or_default();
    if database_url.trim().is_empty() {
        bail!(
            "{DATABASE_URL_ENV} is not set; set it to your PostgreSQL \
             connection string before migrating"
        );
    }

    let connection = Arc::new(JsonConnection::new_default()?);
    if !connection.roles_path().exists() {
        bail!(
            "{} not found, nothing to migrate",
            connection.roles_path().display()
        );
    }
    if !connection.votes_path().exists() {
        bail!(
            "{} not found, nothing to migrate",
            connection.votes_path().display()
        );
    }

    let target = DbStorage::connect(&database_url)
        .await
        .context("connecting to the database")?;
    target
        .connection()
        .init_db()
        .await
        .context("initializing database schema")?;

    // Re-running against a non-empty database overwrites records with the
    // same ids; make the operator confirm that.
    let existing_roles = target.roles().load_roles().await?.roles.len();
    let existing_votes = target.votes().load_votes().await?.votes.len();
    if existing_roles > 0 || existing_votes > 0 {
        println!(
            "WARNING: database already contains {existing_roles} role(s) and \
             {existing_votes} vote(s)."
        );
        print!("Replace data with matching ids from the JSON files? (yes/no): ");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if answer.trim().to_lowercase() != "yes" {
            bail!("migration cancelled by user");
        }
    }

    let migrator = Migrator::new(connection, target);
    let report = migrator.run().await.context("running migration")?;

    info!("migration completed successfully");
    println!("Migrated to PostgreSQL:");
    println!("  - {} roles", report.roles);
    println!("  - {} candidates", report.candidates);
    println!("  - {} allowed voters", report.allowed_voters);
    println!("  - {} votes", report.votes);
    if report.backups.is_empty() {
        println!("No backup files were created.");
    } else {
        println!("Backup files created:");
        for backup in &report.backups {
            println!("  - {}", backup.display());
        }
    }
    println!("The application will now use PostgreSQL for storage.");

    Ok(())
}
