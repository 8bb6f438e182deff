pub mod init;
pub mod migrate;
pub mod seed;
pub mod serve;
pub mod user;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lity")]
#[command(version)]
#[command(about = "A small multi-user blogging service", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "lity.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a site directory with a default config
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    /// Run the HTTP API
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations
    Migrate,
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Create or reset the demo account
    Seed {
        #[arg(long, env = "DEMO_EMAIL", default_value = "demo@lity.local")]
        email: String,
        #[arg(long, env = "DEMO_USERNAME", default_value = "demo")]
        username: String,
        #[arg(long, env = "DEMO_PASSWORD", default_value = "DemoPass123!")]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    List,
    Passwd {
        username: String,
    },
}
