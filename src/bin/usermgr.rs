//! User manager CLI
//!
//! Offline management of user accounts against the same directory file the
//! API daemon serves: interactive create/edit, read, delete, and admin-role
//! grants. Each invocation writes a dated `usermgr-YYYY-MM-DD.log` when a log
//! directory is configured.

use clap::Parser;
use std::sync::Arc;

use accountd::store::{Store, User};
use accountd::{cli, config, logger};

const MAX_ATTEMPTS: u32 = 5;

#[derive(Parser)]
#[command(
    name = "usermgr",
    about = "Manage user accounts from the command line",
    after_help = "Examples:\n  usermgr --read 1\n  usermgr --edit 1\n  usermgr --delete 1\n  usermgr --make-admin 1\n  usermgr --remove-admin 1"
)]
struct Cli {
    /// Starts an interactive session to create a user
    #[arg(short = 'c', long)]
    create: bool,

    /// Retrieves and displays a user's information
    #[arg(short = 'r', long, value_name = "USER_ID")]
    read: Option<u64>,

    /// Starts an interactive session to edit a user
    #[arg(short = 'e', long, value_name = "USER_ID")]
    edit: Option<u64>,

    /// Starts an interactive session to delete a user
    #[arg(short = 'd', long, value_name = "USER_ID")]
    delete: Option<u64>,

    /// Adds the administrator role to a user account
    #[arg(long, value_name = "USER_ID")]
    make_admin: Option<u64>,

    /// Removes the administrator role from a user account
    #[arg(long, value_name = "USER_ID")]
    remove_admin: Option<u64>,

    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config")]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    let cfg = config::Config::load_from(&args.config)?;
    logger::init(&cfg, "usermgr")?;

    let store = Arc::new(Store::open(&cfg.store.path)?);
    let admin_role = cfg.api.admin_role.as_str();

    if args.create {
        create_user(&store);
    } else if let Some(id) = args.read {
        read_user(&store, id, admin_role);
    } else if let Some(id) = args.edit {
        edit_user(&store, id);
    } else if let Some(id) = args.delete {
        delete_user(&store, id);
    } else if let Some(id) = args.make_admin {
        make_admin(&store, id, admin_role);
    } else if let Some(id) = args.remove_admin {
        remove_admin(&store, id, admin_role);
    } else {
        println!("No operation requested, see --help for usage");
    }

    Ok(())
}

fn query_username(store: &Store, existing: Option<&str>) -> Option<String> {
    cli::query_input(
        "Username",
        existing,
        "Invalid username provided",
        MAX_ATTEMPTS,
        |value| {
            // An unchanged value skips the uniqueness check
            if existing == Some(value) {
                return Ok(());
            }
            store.validate_username(value, true)
        },
    )
}

fn query_email(store: &Store, existing: Option<&str>) -> Option<String> {
    cli::query_input(
        "Email Address",
        existing,
        "Invalid email address provided",
        MAX_ATTEMPTS,
        |value| {
            if existing == Some(value) {
                return Ok(());
            }
            store.validate_email(value, true)
        },
    )
}

fn query_email_confirmed(existing: Option<&str>) -> Option<bool> {
    let answer = cli::query_input(
        "Email Confirmed (Y/N)",
        existing,
        "Email confirmed must be 'Y' or 'N'",
        MAX_ATTEMPTS,
        |value| match value.to_lowercase().as_str() {
            "y" | "n" => Ok(()),
            _ => Err("must be 'Y' or 'N'".to_string()),
        },
    )?;

    Some(answer.to_lowercase() == "y")
}

fn print_user(user: &User) {
    println!("User #{}", user.id);
    println!("  Username:        {}", user.username);
    println!("  Email:           {}", user.email);
    println!("  Email Confirmed: {}", if user.email_confirmed { "Y" } else { "N" });
    println!("  Date Joined:     {}", user.date_joined.to_rfc3339());
    match user.last_login {
        Some(at) => println!("  Last Login:      {}", at.to_rfc3339()),
        None => println!("  Last Login:      never"),
    }
}

fn create_user(store: &Store) {
    println!("Creating new user, answer the following queries...");
    println!();

    let Some(username) = query_username(store, None) else {
        logger::log_error("User input failed during user creation");
        return;
    };
    let Some(email) = query_email(store, None) else {
        logger::log_error("Email input failed during user creation");
        return;
    };
    let Some(confirmed) = query_email_confirmed(None) else {
        logger::log_error("Email confirmed input failed during user creation");
        return;
    };

    match store.create_user(&username, &email, confirmed) {
        Ok(user) => {
            logger::log_info(&format!(
                "Created user #{} with username {}",
                user.id, user.username
            ));
            println!();
            print_user(&user);
        }
        Err(e) => {
            logger::log_error(&format!("Failed to create user: {e}"));
            println!("Failed to create user: {e}");
        }
    }
}

fn read_user(store: &Store, id: u64, admin_role: &str) {
    match store.user_by_id(id) {
        Some(user) => {
            print_user(&user);
            println!(
                "  Administrator:   {}",
                if store.user_in_role(user.id, admin_role) { "Y" } else { "N" }
            );
        }
        None => println!("No user found with identifier {id}"),
    }
}

fn edit_user(store: &Store, id: u64) {
    let Some(user) = store.user_by_id(id) else {
        println!("No user found with identifier {id}");
        return;
    };

    println!("Editing user #{id}, empty input keeps the current value...");
    println!();

    let Some(username) = query_username(store, Some(&user.username)) else {
        logger::log_error(&format!("User input failed editing user #{id}"));
        return;
    };
    let Some(email) = query_email(store, Some(&user.email)) else {
        logger::log_error(&format!("Email input failed editing user #{id}"));
        return;
    };
    let existing_confirmed = if user.email_confirmed { "y" } else { "n" };
    let Some(confirmed) = query_email_confirmed(Some(existing_confirmed)) else {
        logger::log_error(&format!("Email confirmed input failed editing user #{id}"));
        return;
    };

    let updated = User {
        username,
        email,
        email_confirmed: confirmed,
        ..user
    };

    match store.update_user(&updated) {
        Ok(()) => {
            logger::log_info(&format!("Updated user #{id}"));
            println!();
            print_user(&updated);
        }
        Err(e) => {
            logger::log_error(&format!("Failed to update user #{id}: {e}"));
            println!("Failed to update user: {e}");
        }
    }
}

fn delete_user(store: &Store, id: u64) {
    let Some(user) = store.user_by_id(id) else {
        println!("No user found with identifier {id}");
        return;
    };

    print_user(&user);
    println!();

    match cli::confirm("Really delete this user? This cannot be undone.. (Y/N)", 2) {
        Some(true) => match store.delete_user(id) {
            Ok(()) => {
                logger::log_info(&format!("Deleted user #{id}"));
                println!("User #{id} was deleted");
            }
            Err(e) => {
                logger::log_error(&format!("Failed to delete user #{id}: {e}"));
                println!("Failed to delete user: {e}");
            }
        },
        _ => println!("Aborted, user was not deleted"),
    }
}

fn make_admin(store: &Store, id: u64, admin_role: &str) {
    if store.user_by_id(id).is_none() {
        println!("No user found with identifier {id}");
        return;
    }

    if let Err(e) = store.create_role_if_missing(admin_role) {
        logger::log_error(&format!("Failed to ensure role '{admin_role}': {e}"));
        println!("Failed to ensure role '{admin_role}': {e}");
        return;
    }

    if store.user_in_role(id, admin_role) {
        println!("User #{id} already has the '{admin_role}' role");
        return;
    }

    if let Err(e) = store.add_user_to_role(id, admin_role) {
        logger::log_error(&format!("Failed to grant '{admin_role}' to user #{id}: {e}"));
        println!("Failed to grant role: {e}");
        return;
    }

    // Verify the grant actually landed
    if store.user_in_role(id, admin_role) {
        logger::log_info(&format!("Granted '{admin_role}' to user #{id}"));
        println!("User #{id} now has the '{admin_role}' role");
    } else {
        logger::log_error(&format!("Grant of '{admin_role}' to user #{id} did not stick"));
        println!("Failed to grant role, please check the directory file");
    }
}

fn remove_admin(store: &Store, id: u64, admin_role: &str) {
    if store.user_by_id(id).is_none() {
        println!("No user found with identifier {id}");
        return;
    }

    if !store.user_in_role(id, admin_role) {
        println!("User #{id} does not have the '{admin_role}' role");
        return;
    }

    if let Err(e) = store.remove_user_from_role(id, admin_role) {
        logger::log_error(&format!(
            "Failed to remove '{admin_role}' from user #{id}: {e}"
        ));
        println!("Failed to remove role: {e}");
        return;
    }

    if store.user_in_role(id, admin_role) {
        logger::log_error(&format!(
            "Removal of '{admin_role}' from user #{id} did not stick"
        ));
        println!("Failed to remove role, please check the directory file");
    } else {
        logger::log_info(&format!("Removed '{admin_role}' from user #{id}"));
        println!("User #{id} no longer has the '{admin_role}' role");
    }
}
