//! Administrator account commands.
//!
//! Administrators cannot register through the API; this is the only way to
//! create one.

use std::io::BufRead;

use super::{CliError, state};

/// Create an `ADMIN` account.
///
/// When `password` is `None` the first line of stdin is used.
///
/// # Errors
///
/// Returns `CliError::Service` for invalid fields or a taken email/phone.
pub async fn create(
    name: &str,
    email: &str,
    phone: &str,
    address: &str,
    password: Option<String>,
) -> Result<(), CliError> {
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };

    let state = state().await?;
    let admin = state
        .accounts()
        .create_admin(name, email, phone, address, &password)
        .await?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        admin.id,
        admin.email
    );
    Ok(())
}

#[allow(clippy::print_stderr)]
fn read_password() -> Result<String, CliError> {
    eprintln!("Password:");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
