use crate::Config;
use anyhow::Result;
use std::path::PathBuf;

pub async fn run(path: PathBuf, name: Option<String>) -> Result<()> {
    let site_name = name.unwrap_or_else(|| "My Blog".to_string());
    let config_path = path.join("lity.toml");
    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    std::fs::create_dir_all(path.join("data"))?;

    let config = toml::to_string_pretty(&Config::default_for(&site_name))?;
    std::fs::write(&config_path, config)?;

    tracing::info!("Created new site at {:?}", path);
    tracing::info!("Run 'lity migrate' to set up the database");
    tracing::info!("Run 'lity serve' to start the server");

    Ok(())
}
