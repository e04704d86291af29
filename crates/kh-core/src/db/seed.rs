//! Database seeding.
//!
//! Creates the initial superuser on first start so that someone can log in
//! and create knowledge bases.

use super::{create_employee_repository, DbError, DbPool};
use crate::auth::password::{hash_password, PasswordError};
use crate::models::Employee;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable holding the initial superuser password.
pub const ADMIN_PASSWORD_ENV: &str = "KH_ADMIN_PASSWORD";

pub const ADMIN_USERNAME: &str = "admin";

#[derive(Error, Debug)]
pub enum SeedError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Ensures at least one employee exists.
///
/// When the employee table is empty an `admin` superuser is created with the
/// password from `KH_ADMIN_PASSWORD`, or a generated one.
///
/// Returns `Ok(Some(password))` when the account was created and `Ok(None)`
/// when employees already exist.
pub async fn ensure_superuser(pool: &DbPool) -> Result<Option<String>, SeedError> {
    let password = std::env::var(ADMIN_PASSWORD_ENV)
        .ok()
        .filter(|value| !value.is_empty());
    create_superuser_if_missing(pool, password).await
}

pub(crate) async fn create_superuser_if_missing(
    pool: &DbPool,
    password: Option<String>,
) -> Result<Option<String>, SeedError> {
    let employees = create_employee_repository(pool);

    if employees.any_exist().await? {
        info!("Employees already exist, skipping superuser seed");
        return Ok(None);
    }

    let password = password.unwrap_or_else(|| {
        warn!("No {} set, generated a random password", ADMIN_PASSWORD_ENV);
        generate_password()
    });

    let admin = Employee::new(
        ADMIN_USERNAME,
        "admin@localhost",
        hash_password(&password)?,
        "Administrator",
    )
    .superuser();
    employees.create(&admin).await?;

    info!(username = ADMIN_USERNAME, "Created initial superuser");
    Ok(Some(password))
}

/// 16 alphanumeric characters with at least one of each class the
/// strength rules require.
fn generate_password() -> String {
    const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
    const DIGITS: &[u8] = b"23456789";

    let mut rng = rand::thread_rng();
    let all: Vec<u8> = [UPPER, LOWER, DIGITS].concat();

    let mut password = vec![
        UPPER[rng.gen_range(0..UPPER.len())],
        LOWER[rng.gen_range(0..LOWER.len())],
        DIGITS[rng.gen_range(0..DIGITS.len())],
    ];
    password.extend((0..13).map(|_| all[rng.gen_range(0..all.len())]));
    password.shuffle(&mut rng);

    password.into_iter().map(char::from).collect()
}
