//! Configuration display

use crate::args::OutputFormat;
use warden_core::WardenConfig;

/// Print the resolved configuration
pub fn show(config: &WardenConfig, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render(config, format)?);
    Ok(())
}

fn render(config: &WardenConfig, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Toml => config.to_toml()?,
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_toml() {
        let rendered = render(&WardenConfig::default(), OutputFormat::Toml).unwrap();
        assert!(rendered.contains("[failover]"));
        assert!(rendered.contains("hourly_limit_usd = 1.0"));
    }

    #[test]
    fn test_render_json() {
        let rendered = render(&WardenConfig::default(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["rate_limit"]["store_timeout"], "250ms");
        assert_eq!(value["failover"]["enabled"], true);
    }
}
