use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

const CONFIG_FILENAME: &str = "webext.toml";

/// Project configuration, loaded from `webext.toml` at the project root.
/// Every field has a default matching the conventional layout, so the file
/// may be partial or absent; unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub project: ProjectConfig,
    pub scripts: ScriptsConfig,
    pub styles: StylesConfig,
    pub template: TemplateConfig,
    pub tools: ToolsConfig,
    pub test: TestConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Name of the assembled script/style bundle.
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "webext".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsConfig {
    /// Ordered script sources concatenated after the generated template
    /// fragment. Order is load-bearing: definitions must precede uses.
    pub sources: Vec<String>,
    /// Entry script appended last.
    pub entry: String,
    /// Per-target scripts inserted before the entry script, keyed by
    /// target id.
    pub overrides: BTreeMap<String, Vec<String>>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            sources: [
                "src/constants.js",
                "src/adapters/adapter.js",
                "src/adapters/github.js",
                "src/adapters/gitlab.js",
                "src/view.help.js",
                "src/view.error.js",
                "src/view.tree.js",
                "src/view.options.js",
                "src/util.location.js",
                "src/util.module.js",
                "src/util.async.js",
                "src/util.storage.js",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            entry: "src/main.js".to_string(),
            overrides: BTreeMap::from([(
                "chrome".to_string(),
                vec!["src/config/chrome/overrides.js".to_string()],
            )]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    pub entry: String,
    /// External stylesheet compiler, invoked as `<compiler> <entry> <out>`.
    pub compiler: String,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: "src/styles/main.less".to_string(),
            compiler: "lessc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    pub source: String,
    /// Name of the generated constant holding the inlined markup.
    pub constant: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            source: "src/template.html".to_string(),
            constant: "TEMPLATE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Browser binary used to sign and pack the Chrome tree.
    pub signer: String,
    /// Packer producing the Firefox installer package.
    pub packer: String,
    /// Signing key path, relative to the home directory.
    pub signing_key: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            signer: "google-chrome".to_string(),
            packer: "cfx".to_string(),
            signing_key: ".ssh/chrome.pem".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            command: "./node_modules/.bin/mocha".to_string(),
            args: ["--reporter", "spec", "--bail", "--recursive"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

impl Config {
    /// Load `webext.toml` from the project root, or defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILENAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading project config '{}'", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("parsing project config '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_file_absent() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.project.name, "webext");
        assert_eq!(config.scripts.sources[0], "src/constants.js");
        assert!(config.scripts.overrides.contains_key("chrome"));
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("webext.toml"),
            "[project]\nname = \"octoview\"\n\n[scripts]\nsources = [\"src/one.js\"]\nentry = \"src/app.js\"\n\n[scripts.overrides]\nfirefox = [\"src/config/firefox/extra.js\"]\n",
        )
        .unwrap();

        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.project.name, "octoview");
        assert_eq!(config.scripts.sources, vec!["src/one.js"]);
        assert_eq!(config.scripts.entry, "src/app.js");
        assert_eq!(
            config.scripts.overrides["firefox"],
            vec!["src/config/firefox/extra.js"]
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.styles.compiler, "lessc");
        assert_eq!(config.watch.debounce_ms, 200);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("webext.toml"), "[projekt]\nname = \"x\"\n").unwrap();
        assert!(Config::load(temp.path()).is_err());
    }
}
