use std::{fs, path::Path};

use permit::{Config, Namespace};
use tracing::instrument;

use super::CONFIG_FILE;

#[derive(Debug, Default, clap::Parser)]
pub struct Init {
    /// Prefix of storage keys, to keep several sites apart in one directory
    #[arg(long, value_parser = parse_namespace)]
    namespace: Option<Namespace>,
}

fn parse_namespace(s: &str) -> Result<Namespace, String> {
    s.trim().parse::<Namespace>().map_err(|e| e.to_string())
}

impl Init {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            anyhow::bail!(
                "Already initialized (found existing {})",
                config_path.display()
            );
        }

        fs::create_dir_all(root)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", root.display()))?;

        let mut config = Config::default();
        if let Some(namespace) = self.namespace {
            config.set_namespace(namespace);
        }
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_FILE}: {e}"))?;

        println!("Initialized permit store in {}", root.display());
        println!("  Created: {CONFIG_FILE}");
        println!();
        println!("Next steps:");
        println!("  ptw new");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn writes_default_config() {
        let tmp = tempdir().unwrap();

        Init::default().run(tmp.path()).unwrap();

        let config = Config::load(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn records_namespace() {
        let tmp = tempdir().unwrap();
        let init = Init {
            namespace: Some(parse_namespace("site-b").unwrap()),
        };

        init.run(tmp.path()).unwrap();

        let config = Config::load(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.namespace(), "site-b");
    }

    #[test]
    fn blank_namespace_is_rejected() {
        assert!(parse_namespace("  ").is_err());
    }

    #[test]
    fn namespace_with_a_path_separator_is_rejected() {
        let error = parse_namespace("site/a").unwrap_err();
        assert!(error.contains("path separators"));
        assert!(parse_namespace(".site").is_err());
    }

    #[test]
    fn refuses_to_overwrite() {
        let tmp = tempdir().unwrap();
        Init::default().run(tmp.path()).unwrap();

        let error = Init::default().run(tmp.path()).unwrap_err();
        assert!(error.to_string().starts_with("Already initialized"));
    }
}
