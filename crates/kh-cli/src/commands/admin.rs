//! Maintenance commands: migrations, superusers and statistics.

use anyhow::{bail, Context, Result};
use colored::Colorize;

use kh_core::db::{
    create_employee_repository, create_pool_with_options, run_migrations, DbPool, PoolOptions,
};
use kh_core::{hash_password, validate_password_strength, Catalog, Employee};

use crate::config::AppConfig;

/// Opens the configured database and brings its schema up to date.
pub async fn open_database(config: &AppConfig) -> Result<DbPool> {
    let url = &config.database.url;
    let options = if url.contains(":memory:") || url.contains("mode=memory") {
        PoolOptions::in_memory()
    } else if std::env::var("DATABASE_MAX_CONNECTIONS").is_ok() {
        PoolOptions::default()
    } else {
        PoolOptions::default().with_max_connections(config.database.max_connections)
    };

    println!("  {} Database: {}", "→".green(), config.database.url);
    let pool = create_pool_with_options(&config.database.url, options)
        .await
        .context("Failed to create database connection pool")?;

    println!("  {} Running migrations...", "→".green());
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    println!("  {} Migrations complete", "✓".green());

    Ok(pool)
}

/// Applies pending migrations and exits.
pub async fn migrate(config: &AppConfig) -> Result<()> {
    let pool = open_database(config).await?;
    pool.close().await;
    Ok(())
}

/// Arguments for `create-superuser`.
#[derive(Debug, Clone)]
pub struct SuperuserArgs {
    pub username: String,
    pub email: String,
    pub position: String,
    pub password: String,
}

/// Creates a superuser account.
pub async fn create_superuser(config: &AppConfig, args: SuperuserArgs) -> Result<()> {
    let username = args.username.trim();
    if username.is_empty() {
        bail!("Username must not be empty");
    }
    let problems = validate_password_strength(&args.password);
    if !problems.is_empty() {
        bail!("Password is too weak: {}", problems.join("; "));
    }

    let pool = open_database(config).await?;
    let employees = create_employee_repository(&pool);

    if employees
        .get_by_username(username)
        .await
        .context("Failed to look up username")?
        .is_some()
    {
        bail!("An employee named '{}' already exists", username);
    }

    let hash = hash_password(&args.password).context("Failed to hash password")?;
    let employee =
        Employee::new(username, args.email.trim(), hash, args.position.trim()).superuser();
    let employee = employees
        .create(&employee)
        .await
        .context("Failed to create superuser")?;

    println!(
        "{} Superuser '{}' created ({})",
        "✓".green(),
        employee.username,
        employee.id
    );
    pool.close().await;
    Ok(())
}

/// Prints the site totals.
pub async fn print_stats(config: &AppConfig, json: bool) -> Result<()> {
    let pool = open_database(config).await?;
    let stats = Catalog::new(&pool)
        .site_statistics()
        .await
        .context("Failed to compute statistics")?;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!();
        println!("{}", "Knowledge Hub Statistics".bold());
        println!("─────────────────────────");
        println!("  {:<20} {}", "Knowledge bases:", stats.total_knowledge_bases);
        println!("  {:<20} {}", "Categories:", stats.total_categories);
        println!("  {:<20} {}", "Published articles:", stats.total_articles);
        println!("  {:<20} {}", "Comments:", stats.total_comments);
        println!("  {:<20} {}", "Employees:", stats.total_employees);
        println!("  {:<20} {}", "Authors:", stats.total_authors);
    }

    Ok(())
}
