use std::path::Path;

use anyhow::Context;
use pattern_miner::MiningConfig;

/// Flags that override values loaded from the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub max_len: Option<usize>,
    pub min_support: Option<u64>,
    pub workers: Option<usize>,
    pub max_depth: Option<usize>,
}

pub fn load_config(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<MiningConfig> {
    let mut config = match path {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&src).with_context(|| format!("invalid config: {}", path.display()))?
        }
        None => MiningConfig::default(),
    };
    apply_overrides(&mut config, overrides);
    Ok(config)
}

pub fn parse_config(src: &str) -> anyhow::Result<MiningConfig> {
    Ok(toml::from_str(src)?)
}

fn apply_overrides(config: &mut MiningConfig, overrides: Overrides) {
    if let Some(v) = overrides.max_len {
        config.max_pattern_len = v;
    }
    if let Some(v) = overrides.min_support {
        config.min_user_support = v;
    }
    if let Some(v) = overrides.workers {
        config.workers = v;
    }
    if let Some(v) = overrides.max_depth {
        config.tree.max_depth = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse_config("").unwrap(), MiningConfig::default());
    }

    #[test]
    fn nested_tree_table_is_read() {
        let config = parse_config(
            r#"
max_pattern_len = 3
workers = 4

[tree]
max_children = 5
require_positive_gini_drop = false
"#,
        )
        .unwrap();
        assert_eq!(config.max_pattern_len, 3);
        assert_eq!(config.workers, 4);
        assert_eq!(config.min_user_support, 1);
        assert_eq!(config.tree.max_children, 5);
        assert_eq!(config.tree.max_depth, 3);
        assert!(!config.tree.require_positive_gini_drop);
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = parse_config("max_pattern_len = 2\n[tree]\nmax_depth = 5\n").unwrap();
        apply_overrides(
            &mut config,
            Overrides {
                max_len: Some(4),
                max_depth: Some(1),
                ..Overrides::default()
            },
        );
        assert_eq!(config.max_pattern_len, 4);
        assert_eq!(config.tree.max_depth, 1);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn unknown_value_type_is_rejected() {
        assert!(parse_config("workers = \"many\"").is_err());
    }
}
