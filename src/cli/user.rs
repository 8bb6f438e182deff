use crate::{services::auth, Config, Database};
use anyhow::Result;
use std::path::Path;

use super::UserCommand;

pub async fn run(config_path: &Path, command: UserCommand) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open_with_pool_size(&config.database.path, config.database.pool_size)?;

    match command {
        UserCommand::Add {
            email,
            username,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => {
                    let p = rpassword::prompt_password("Password: ")?;
                    let p_confirm = rpassword::prompt_password("Confirm password: ")?;
                    if p != p_confirm {
                        anyhow::bail!("Passwords do not match");
                    }
                    p
                }
            };

            auth::create_user(&db, &email, &username, &password)?;
            tracing::info!("User '{}' created", username);
        }
        UserCommand::List => {
            let users = auth::list_users(&db)?;

            println!("{:<6} {:<20} {:<30} {:<25}", "ID", "USERNAME", "EMAIL", "CREATED");
            println!("{}", "-".repeat(84));
            for user in users {
                println!(
                    "{:<6} {:<20} {:<30} {:<25}",
                    user.id, user.username, user.email, user.created_at
                );
            }
        }
        UserCommand::Passwd { username } => {
            let password = rpassword::prompt_password("New password: ")?;
            let password_confirm = rpassword::prompt_password("Confirm password: ")?;

            if password != password_confirm {
                anyhow::bail!("Passwords do not match");
            }

            auth::update_password(&db, &username, &password)?;
            tracing::info!("Password updated for '{}'", username);
        }
    }

    Ok(())
}
