//! Passport commands.

use device_warranty_server::models::PassportDraft;

use super::{CliError, state};

/// Arguments of `passport create`.
pub struct PassportArgs {
    pub name: String,
    pub model: String,
    pub prefix: String,
    pub from: i64,
    pub to: i64,
    pub months: i32,
}

/// # Errors
///
/// Returns `CliError::Service` for an invalid or overlapping range.
pub async fn create(args: PassportArgs) -> Result<(), CliError> {
    let state = state().await?;
    let passport = state
        .passport_service()
        .create(PassportDraft {
            name: args.name,
            model: args.model,
            serial_prefix: args.prefix,
            from_serial_number: args.from,
            to_serial_number: args.to,
            warranty_months: args.months,
        })
        .await?;

    tracing::info!(
        "Passport created! ID: {}, Prefix: {}, Range: {}..={}",
        passport.id,
        passport.serial_prefix,
        passport.from_serial_number,
        passport.to_serial_number
    );
    Ok(())
}

/// Print every passport as pretty JSON on stdout.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CliError> {
    let state = state().await?;
    let passports = state.passport_service().list().await?;
    println!("{}", serde_json::to_string_pretty(&passports)?);
    Ok(())
}
