//! `switchboard cleanup | init`

use std::path::Path;
use switchboard_config::AppConfig;

use super::{CliResult, management_provider, open_router};

pub async fn cleanup(config: &AppConfig, days: Option<u32>) -> CliResult {
    let days = days.unwrap_or(config.history.retention_days);
    let router = open_router(config, management_provider(config)).await?;
    let removed = router.cleanup_history(days).await?;
    println!("✓ Removed {removed} messages older than {days} days");
    Ok(())
}

/// Write the default config to `path` (or the default location).
pub fn init(path: Option<&Path>, force: bool) -> CliResult {
    let default_path = AppConfig::config_dir().join("config.toml");
    let config_path = path.unwrap_or(&default_path);

    if config_path.exists() && !force {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually, or re-run with --force to overwrite.");
        return Ok(());
    }
    write_default_config(config_path)?;

    println!("✅ Created config at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("  1. Set SWITCHBOARD_API_KEY (or OPENAI_API_KEY), or api_key in the file");
    println!("  2. switchboard create --interactive");
    println!("  3. switchboard assign <sender> <agent-id>");
    Ok(())
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())
}
