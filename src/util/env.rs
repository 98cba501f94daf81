//! Environment helpers: centralized dotenv loading, ergonomic getters and
//! redacted configuration snapshots.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        // Missing .env is normal in deployed environments.
        let _ = dotenv::dotenv();
    });
}

/// Common bootstrap for CLI binaries:
///   * load .env once (so RUST_LOG from .env applies)
///   * install the tracing subscriber
///   * log which binary started
pub fn bootstrap_cli(bin_name: &str) -> anyhow::Result<()> {
    init_env();
    crate::logging::init_tracing("info,sqlx=warn")?;
    info!(
        target = "bootstrap",
        bin = bin_name,
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );
    Ok(())
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Replace the user and password of a postgres DSN with `***`.
pub fn redact_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(mut u) => {
            if !u.username().is_empty() {
                let _ = u.set_username("***");
            }
            if u.password().is_some() {
                let _ = u.set_password(Some("***"));
            }
            u.to_string()
        }
        // Unparseable: never echo it back, it may still hold credentials.
        Err(_) => "***".to_string(),
    }
}

/// Redact a config value for logging based on its key and shape.
pub fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("TOKEN") {
        return "***".to_string();
    }

    // Trim so copy/paste newlines don't leak into logs.
    let val_trim = val.trim();

    if k.contains("URL")
        || k.contains("DSN")
        || val_trim.starts_with("postgres://")
        || val_trim.starts_with("postgresql://")
    {
        return redact_url(val_trim);
    }

    val_trim.to_string()
}

/// Log a consolidated, redacted snapshot of the given keys.
/// Unset keys are logged as empty so a missing setting is visible at a glance.
pub fn log_config_snapshot(title: &str, keys: &[&str]) {
    init_env();
    let snapshot: Vec<(String, String)> = keys
        .iter()
        .map(|&k| {
            let v = env_opt(k).unwrap_or_default();
            (k.to_string(), redact_value(k, &v))
        })
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
}
