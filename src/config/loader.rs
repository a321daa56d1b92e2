use crate::config::schema::{self, ChannelSettings, CrawlConfig, PoolSettings};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<CrawlConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        Self::load_with_inheritance(path, &mut visited, false)
    }

    fn load_with_inheritance(
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        is_parent_load: bool,
    ) -> Result<CrawlConfig> {
        let path = fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let config = Self::load_file(&path)?;

        let final_config = if let Some(parent_path_str) = &config.extends {
            let parent_path = path.parent()
                .ok_or_else(|| Error::Config(format!(
                    "Cannot determine parent directory for {}",
                    path.display()
                )))?
                .join(parent_path_str);

            let parent_config = Self::load_with_inheritance(&parent_path, visited, true)?;
            Self::merge_configs(parent_config, config)
        } else {
            config
        };

        if !is_parent_load {
            final_config.validate()?;
        }

        Ok(final_config)
    }

    fn load_file(path: &Path) -> Result<CrawlConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "Unsupported file extension: {}",
                path.display()
            ))),
        }
    }

    fn merge_configs(mut parent: CrawlConfig, child: CrawlConfig) -> CrawlConfig {
        if !child.name.is_empty() {
            parent.name = child.name;
        }
        if !child.seed_url.is_empty() {
            parent.seed_url = child.seed_url;
        }
        if child.max_depth != schema::default_max_depth() {
            parent.max_depth = child.max_depth;
        }
        if child.channels != ChannelSettings::default() {
            parent.channels = child.channels;
        }
        if child.pools != PoolSettings::default() {
            parent.pools = child.pools;
        }
        if child.feed_interval_ms != schema::default_feed_interval() {
            parent.feed_interval_ms = child.feed_interval_ms;
        }
        if child.monitor_interval_ms != schema::default_monitor_interval() {
            parent.monitor_interval_ms = child.monitor_interval_ms;
        }
        if child.summary_interval_ms != schema::default_summary_interval() {
            parent.summary_interval_ms = child.summary_interval_ms;
        }
        if child.idle_confirmations != schema::default_idle_confirmations() {
            parent.idle_confirmations = child.idle_confirmations;
        }
        if !child.fail_fast {
            parent.fail_fast = false;
        }
        if child.request_timeout_ms != schema::default_request_timeout() {
            parent.request_timeout_ms = child.request_timeout_ms;
        }
        if child.user_agent.is_some() {
            parent.user_agent = child.user_agent;
        }
        if child.output.is_some() {
            parent.output = child.output;
        }

        for domain in child.permit_domains {
            if !parent.permit_domains.contains(&domain) {
                parent.permit_domains.push(domain);
            }
        }

        parent.extends = None;
        parent
    }
}
