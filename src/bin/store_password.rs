//! Store the orchestrator credentials in the OS secret store, keyed by a
//! fixed service name so the main tool and operators agree on the entry.

use anyhow::{Context, Result};
use dialoguer::{Input, Password};

const SERVICE: &str = "confdiff";

fn main() -> Result<()> {
    let username: String = Input::new()
        .with_prompt("username")
        .interact_text()
        .context("Failed to read username")?;
    let password = Password::new()
        .with_prompt("password")
        .interact()
        .context("Failed to read password")?;
    let entry = keyring::Entry::new(SERVICE, &username)
        .context("Failed to open the OS secret store")?;
    entry
        .set_password(&password)
        .context("Failed to store the password")?;
    println!("stored credentials for '{username}' under service '{SERVICE}'");
    Ok(())
}
