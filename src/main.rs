use clap::Parser;
use pwvault::cli::commands;
use pwvault::cli::commands::add::AddArgs;
use pwvault::cli::commands::edit::EditArgs;
use pwvault::cli::{output, Cli, Commands};
use pwvault::errors::Result;
use pwvault::generator::GeneratorOptions;
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr; `PWVAULT_LOG=debug` turns them up.
    let filter = EnvFilter::try_from_env("PWVAULT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match cli.command {
        Commands::Init { kdf, with_totp } => commands::init::execute(cli, kdf, with_totp),
        Commands::Add {
            ref title,
            ref username,
            ref url,
            ref notes,
            ref category,
            ref tags,
            generate,
        } => commands::add::execute(
            cli,
            AddArgs {
                title: title.clone(),
                username: username.clone(),
                url: url.clone(),
                notes: notes.clone(),
                category: category.clone(),
                tags: tags.clone(),
                generate,
            },
        ),
        Commands::Show { ref id, copy } => commands::show::execute(cli, id, copy),
        Commands::List {
            ref category,
            ref tag,
            newest_first,
        } => commands::list::execute(cli, category.clone(), tag.clone(), newest_first),
        Commands::Search {
            ref query,
            newest_first,
        } => commands::search::execute(cli, query, newest_first),
        Commands::Edit {
            ref id,
            ref title,
            ref username,
            ref url,
            ref notes,
            ref category,
            ref tags,
            secret,
            generate,
        } => commands::edit::execute(
            cli,
            EditArgs {
                id: id.clone(),
                title: title.clone(),
                username: username.clone(),
                url: url.clone(),
                notes: notes.clone(),
                category: category.clone(),
                tags: tags.clone(),
                prompt_secret: secret,
                generate,
            },
        ),
        Commands::Delete { ref id, force } => commands::delete::execute(cli, id, force),
        Commands::Generate {
            length,
            no_lowercase,
            no_uppercase,
            no_digits,
            no_symbols,
            exclude_ambiguous,
            passphrase,
            ref separator,
        } => {
            let options = GeneratorOptions {
                length,
                lowercase: !no_lowercase,
                uppercase: !no_uppercase,
                digits: !no_digits,
                symbols: !no_symbols,
                exclude_ambiguous,
            };
            commands::generate::execute(&options, passphrase, separator)
        }
        Commands::Export { ref output } => commands::export::execute(cli, output.as_deref()),
        Commands::Import { ref file } => commands::import_cmd::execute(cli, file),
        Commands::RotatePassphrase { kdf } => commands::rotate_passphrase::execute(cli, kdf),
        Commands::Totp { ref action } => commands::totp::execute(cli, action),
        Commands::Shell => commands::shell::execute(cli),
        Commands::Audit {
            last,
            ref since,
            ref entry,
        } => audit(cli, last, since.as_deref(), entry.as_deref()),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}

#[cfg(feature = "audit-log")]
fn audit(cli: &Cli, last: usize, since: Option<&str>, entry: Option<&str>) -> Result<()> {
    commands::audit_cmd::execute(cli, last, since, entry)
}

#[cfg(not(feature = "audit-log"))]
fn audit(_cli: &Cli, _last: usize, _since: Option<&str>, _entry: Option<&str>) -> Result<()> {
    Err(pwvault::errors::VaultError::AuditError(
        "audit log not compiled; rebuild with `--features audit-log`".into(),
    ))
}
