//! `pwvault totp`: manage the second factor.

use chrono::Utc;

use crate::cli::commands::init::print_enrollment;
use crate::cli::output;
use crate::cli::{audit, open_session, AuditOp, Cli, TotpAction};
use crate::crypto::totp;
use crate::errors::Result;

/// Execute a `totp` subcommand.
pub fn execute(cli: &Cli, action: &TotpAction) -> Result<()> {
    let (session, _settings) = open_session(cli)?;

    match action {
        TotpAction::Enable => {
            let secret = session.enable_totp()?;
            audit(session.path(), AuditOp::TotpEnable, None, None);
            print_enrollment(session.path(), &secret);
        }
        TotpAction::Disable => {
            session.disable_totp()?;
            audit(session.path(), AuditOp::TotpDisable, None, None);
            output::success("Second factor removed.");
        }
        TotpAction::Code => match session.totp_secret()? {
            Some(secret) => {
                let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
                let code = totp::generate(&secret, now)?;
                println!("{code}");
                output::tip(&format!(
                    "valid for {}s more",
                    totp::seconds_remaining(now)
                ));
            }
            None => output::info("No second factor is enrolled."),
        },
    }

    Ok(())
}
