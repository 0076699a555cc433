//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::{load_guard, open_db};

pub async fn cmd_serve(
    db_path: &Path,
    config_path: Option<&Path>,
    host: &str,
    port: u16,
    no_encrypt: bool,
) -> Result<()> {
    // A malformed config stops the server before it binds
    let guard = load_guard(config_path)?;
    let db = open_db(db_path, no_encrypt)?;

    println!("🚀 Starting Nudge web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    // Comma-separated list of origins allowed to call the API from a browser
    let allowed_origins: Vec<String> = std::env::var("NUDGE_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }

    if host != "127.0.0.1" && host != "localhost" {
        println!();
        println!("   ⚠️  The API has no authentication - do not expose it to a network!");
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let config = nudge_server::ServerConfig { allowed_origins };
    nudge_server::serve_with_config(db, guard, host, port, config).await?;

    Ok(())
}
