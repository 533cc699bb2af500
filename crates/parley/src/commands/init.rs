use parley_core::Config;
use parley_telemetry::{atomic_write, Paths};
use std::path::Path;

pub fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let path = paths.config_file();

    if write_default_config(&path, force)? {
        println!("✓ Wrote default configuration to {}", path.display());
    } else {
        println!(
            "Configuration already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}

fn write_default_config(path: &Path, force: bool) -> anyhow::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    let json = serde_json::to_string_pretty(&Config::new())?;
    atomic_write(path, json.as_bytes())?;
    Ok(true)
}
