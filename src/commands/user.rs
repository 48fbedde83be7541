//! Manage back-office accounts from the command line

use anyhow::{anyhow, Result};

use crate::auth::{generate_password, hash_password, validate_password, validate_username};
use crate::data::{Handler, Role, User};
use crate::Site;

/// Length of generated passwords
const GENERATED_PASSWORD_LEN: usize = 16;

fn choose_password(password: Option<String>, generated_len: usize) -> Result<String> {
    match password {
        Some(password) => {
            validate_password(&password)?;
            Ok(password)
        }
        None => Ok(generate_password(generated_len)),
    }
}

/// Create a user, returning the password it was given
pub fn add_user(
    data: &Handler,
    username: &str,
    role: Role,
    password: Option<String>,
    generated_len: usize,
) -> Result<String> {
    let username = username.trim();
    validate_username(username)?;
    if data.user_by_username(username)?.is_some() {
        return Err(anyhow!("User '{}' already exists", username));
    }
    let password = choose_password(password, generated_len)?;

    data.add_user(&User {
        username: username.to_string(),
        display_name: String::new(),
        email: String::new(),
        role,
        password_hash: hash_password(&password)?,
        created_at: chrono::Utc::now().to_rfc3339(),
    })?;
    tracing::info!("Created {} '{}'", role, username);
    Ok(password)
}

/// Reset a user's password, returning the new one
pub fn set_password(data: &Handler, username: &str, password: Option<String>) -> Result<String> {
    let stored = data
        .user_by_username(username.trim())?
        .ok_or_else(|| anyhow!("No user named '{}'", username.trim()))?;
    let password = choose_password(password, GENERATED_PASSWORD_LEN)?;

    let mut user = stored.record;
    user.password_hash = hash_password(&password)?;
    data.update_user(stored.id, &user)?;
    tracing::info!("Reset password for '{}'", user.username);
    Ok(password)
}

/// `marques user add`
pub fn add(site: &Site, username: &str, role: &str, password: Option<String>) -> Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    let data = site.open_data()?;
    let generated = password.is_none();
    let password = add_user(&data, username, role, password, GENERATED_PASSWORD_LEN)?;

    println!("Created {} '{}'", role, username.trim());
    if generated {
        println!("Password: {}", password);
    }
    Ok(())
}

/// `marques user passwd`
pub fn passwd(site: &Site, username: &str, password: Option<String>) -> Result<()> {
    let data = site.open_data()?;
    let generated = password.is_none();
    let password = set_password(&data, username, password)?;

    println!("Password for '{}' updated", username.trim());
    if generated {
        println!("Password: {}", password);
    }
    Ok(())
}
