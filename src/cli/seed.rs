use crate::{services::auth, Config, Database};
use anyhow::Result;
use std::path::Path;

pub async fn run(config_path: &Path, email: &str, username: &str, password: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let db = Database::open_with_pool_size(&config.database.path, config.database.pool_size)?;
    db.migrate()?;

    let user = auth::upsert_user(&db, email, username, password)?;

    println!("Demo user ready:");
    println!("- email: {}", user.email);
    println!("- password: {}", password);
    println!("- username: {}", user.username);
    println!("- id: {}", user.id);

    Ok(())
}
