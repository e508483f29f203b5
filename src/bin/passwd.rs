//! Password manager CLI
//!
//! Sets or removes a user's basic-provider password in the directory file.
//! Each invocation writes a dated `passwd-YYYY-MM-DD.log` when a log directory
//! is configured.

use clap::Parser;
use std::sync::Arc;

use accountd::auth::password;
use accountd::store::{KeyProvider, Store, User};
use accountd::{cli, config, logger};

const MAX_ATTEMPTS: u32 = 5;

#[derive(Parser)]
#[command(
    name = "passwd",
    about = "Manage user passwords from the command line",
    after_help = "Examples:\n  passwd --user AUser --set\n  passwd --user AUser --remove"
)]
struct Cli {
    /// Sets which user is being modified, by username or identifier
    #[arg(short = 'u', long, value_name = "USER")]
    user: Option<String>,

    /// Sets password for a user, must be used with the `user` option
    #[arg(short = 's', long)]
    set: bool,

    /// Removes password for a user, must be used with the `user` option
    #[arg(short = 'r', long)]
    remove: bool,

    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config")]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    let cfg = config::Config::load_from(&args.config)?;
    logger::init(&cfg, "passwd")?;

    let store = Arc::new(Store::open(&cfg.store.path)?);

    let Some(identifier) = args.user.as_deref() else {
        println!("No user specified, see --help for usage");
        return Ok(());
    };

    let Some(user) = user_by_identifier(&store, identifier) else {
        println!("No user found matching '{identifier}'");
        return Ok(());
    };

    if args.set {
        set_password(&store, &user);
    } else if args.remove {
        remove_password(&store, &user);
    } else {
        println!("No operation requested, see --help for usage");
    }

    Ok(())
}

/// Resolve a user by numeric identifier first, then by username
fn user_by_identifier(store: &Store, identifier: &str) -> Option<User> {
    if let Ok(id) = identifier.parse::<u64>() {
        return store.user_by_id(id);
    }

    store.user_by_username(identifier)
}

fn query_password(is_confirmation: bool) -> Option<String> {
    let prompt = if is_confirmation {
        "Confirm Password"
    } else {
        "Password"
    };

    cli::query_input(
        prompt,
        None,
        "Invalid password provided",
        MAX_ATTEMPTS,
        |value| Store::validate_password(value),
    )
}

fn set_password(store: &Store, user: &User) {
    let Some(plain) = query_password(false) else {
        logger::log_error(&format!(
            "Password input failed setting password for user #{}",
            user.id
        ));
        return;
    };
    let Some(confirmation) = query_password(true) else {
        logger::log_error(&format!(
            "Password confirmation failed setting password for user #{}",
            user.id
        ));
        return;
    };

    if plain != confirmation {
        logger::log_error(&format!(
            "Mismatched password confirmation for user #{}",
            user.id
        ));
        println!("Passwords did not match, no changes made");
        return;
    }

    let outcome = password::hash_password(&plain)
        .map_err(|e| e.to_string())
        .and_then(|hash| {
            store
                .set_login_key(user.id, KeyProvider::Basic, &hash)
                .map_err(|e| e.to_string())
        });

    match outcome {
        Ok(()) => {
            logger::log_info(&format!("Set password for user #{}", user.id));
            println!("Password set for user '{}'", user.username);
        }
        Err(e) => {
            logger::log_error(&format!("Failed to set password for user #{}: {e}", user.id));
            println!("Failed to set password: {e}");
        }
    }
}

fn remove_password(store: &Store, user: &User) {
    match cli::confirm("Really proceed? This cannot be undone.. (Y/N)", 2) {
        Some(true) => match store.remove_login_key(user.id, KeyProvider::Basic) {
            Ok(()) => {
                logger::log_info(&format!("Removed password for user #{}", user.id));
                println!("Password removed for user '{}'", user.username);
            }
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to remove password for user #{}: {e}",
                    user.id
                ));
                println!("Failed to remove password: {e}");
            }
        },
        _ => println!("Aborted, no changes made"),
    }
}
