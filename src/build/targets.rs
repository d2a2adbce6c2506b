use anyhow::{bail, Context, Result};

use crate::build::{BuildEnv, SCRATCH_DIR};
use crate::pipeline::fileset::FileSet;
use crate::pipeline::preprocess::{BuildContext, Preprocess};
use crate::pipeline::template::InlineTemplate;
use crate::pipeline::transform::{self, Concat};

/// A supported output platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Opera,
    Firefox,
    Safari,
}

impl Browser {
    pub const ALL: [Browser; 4] = [
        Browser::Chrome,
        Browser::Opera,
        Browser::Safari,
        Browser::Firefox,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Opera => "opera",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
        }
    }

    /// The conditional-compilation flag selecting this platform's code.
    pub fn flag(self) -> &'static str {
        match self {
            Browser::Chrome => "CHROME",
            Browser::Opera => "OPERA",
            Browser::Firefox => "FIREFOX",
            Browser::Safari => "SAFARI",
        }
    }

    pub fn parse(value: &str) -> Result<Browser> {
        match value {
            "chrome" => Ok(Browser::Chrome),
            "opera" => Ok(Browser::Opera),
            "firefox" => Ok(Browser::Firefox),
            "safari" => Ok(Browser::Safari),
            other => bail!(
                "unsupported target '{}'; expected one of: chrome, opera, firefox, safari",
                other
            ),
        }
    }

    /// Conditional context for this platform's build: its own flag on,
    /// every other flag off.
    pub fn context(self) -> Result<BuildContext> {
        BuildContext::with_flag(self.flag())
    }
}

/// Preprocess the markup template for `browser` and inline it as the
/// generated fragment `tmp/template.js`, the first concatenation input.
pub fn build_template(env: &BuildEnv, browser: Browser) -> Result<()> {
    let config = &env.config;
    let set = FileSet::new().include(&config.template.source);
    let preprocess = Preprocess {
        ctx: browser.context()?,
    };
    let inline = InlineTemplate::new(&config.template.constant);
    transform::run(&env.root, &set, &[&preprocess, &inline], &env.scratch())
        .with_context(|| format!("building template fragment for {}", browser.id()))?;
    Ok(())
}

/// Concatenate the ordered script sources (template fragment first, entry
/// last) into the target's conditioned bundle `tmp/<name>.js`.
pub fn build_scripts(env: &BuildEnv, browser: Browser) -> Result<()> {
    let config = &env.config;
    let mut sources: Vec<String> = Vec::new();
    sources.push(format!("{SCRATCH_DIR}/template.js"));
    sources.extend(config.scripts.sources.iter().cloned());
    if let Some(overrides) = config.scripts.overrides.get(browser.id()) {
        sources.extend(overrides.iter().cloned());
    }
    sources.push(config.scripts.entry.clone());

    let set = FileSet::from_list(&sources);
    let concat = Concat::new(env.bundle("js"));
    let preprocess = Preprocess {
        ctx: browser.context()?,
    };
    transform::run(&env.root, &set, &[&concat, &preprocess], &env.scratch())
        .with_context(|| format!("assembling scripts for {}", browser.id()))?;
    Ok(())
}

/// Lay out the conditioned files in the shape `browser` ships.
pub fn assemble_tree(env: &BuildEnv, browser: Browser) -> Result<()> {
    match browser {
        Browser::Chrome => assemble_chrome(env),
        Browser::Opera => assemble_opera(env),
        Browser::Firefox => assemble_firefox(env),
        Browser::Safari => assemble_safari(env),
    }
    .with_context(|| format!("assembling {} tree", browser.id()))
}

fn assemble_chrome(env: &BuildEnv) -> Result<()> {
    let tree = env.target_dir(Browser::Chrome);
    transform::copy(
        &env.root,
        &FileSet::new().include("icons/**/*"),
        &tree.join("icons"),
    )?;
    let set = FileSet::new()
        .include("libs/**/*")
        .include(&format!("{SCRATCH_DIR}/{}.*", env.config.project.name))
        .include("src/config/chrome/**/*")
        .exclude("src/config/chrome/storage.js");
    transform::copy(&env.root, &set, &tree)?;
    Ok(())
}

// Opera ships the finished chrome tree verbatim under its own name.
fn assemble_opera(env: &BuildEnv) -> Result<()> {
    let tree = env.target_dir(Browser::Opera);
    transform::copy(
        &env.root,
        &FileSet::new().include(&format!("{SCRATCH_DIR}/chrome/**/*")),
        &tree,
    )?;
    Ok(())
}

fn assemble_safari(env: &BuildEnv) -> Result<()> {
    let name = &env.config.project.name;
    let tree = env
        .target_dir(Browser::Safari)
        .join(format!("{name}.safariextension"));
    transform::copy(
        &env.root,
        &FileSet::new().include("icons/**/*"),
        &tree.join("icons"),
    )?;
    let set = FileSet::new()
        .include("libs/**/*")
        .include(&format!("{SCRATCH_DIR}/{name}.js"))
        .include(&format!("{SCRATCH_DIR}/{name}.css"))
        .include("src/config/safari/**/*")
        .exclude("src/config/safari/storage.js");
    transform::copy(&env.root, &set, &tree)?;
    Ok(())
}

fn assemble_firefox(env: &BuildEnv) -> Result<()> {
    let name = &env.config.project.name;
    let tree = env.target_dir(Browser::Firefox);
    transform::copy(
        &env.root,
        &FileSet::new().include("icons/**/*"),
        &tree.join("data/icons"),
    )?;
    let set = FileSet::new()
        .include("libs/**/*")
        .include(&format!("{SCRATCH_DIR}/{name}.js"))
        .include(&format!("{SCRATCH_DIR}/{name}.css"));
    transform::copy(&env.root, &set, &tree.join("data"))?;
    transform::copy(
        &env.root,
        &FileSet::new().include("src/config/firefox/firefox.js"),
        &tree.join("lib"),
    )?;
    transform::copy(
        &env.root,
        &FileSet::new().include("src/config/firefox/package.json"),
        &tree,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config::Config;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.project.name = "app".to_string();
        config.scripts.sources = vec!["src/constants.js".to_string(), "src/view.js".to_string()];
        config.scripts.entry = "src/main.js".to_string();
        config
            .scripts
            .overrides
            .insert("chrome".to_string(), vec!["src/config/chrome/overrides.js".to_string()]);
        config
    }

    fn fixture_project(root: &Path) {
        fs::create_dir_all(root.join("src/config/chrome")).unwrap();
        fs::create_dir_all(root.join("src/config/safari")).unwrap();
        fs::create_dir_all(root.join("src/config/firefox")).unwrap();
        fs::create_dir_all(root.join("libs")).unwrap();
        fs::create_dir_all(root.join("icons/16")).unwrap();

        fs::write(
            root.join("src/template.html"),
            "<div>\n<!-- @if CHROME -->\n<span>chrome</span>\n<!-- @endif -->\n<!-- @if FIREFOX -->\n<span>firefox</span>\n<!-- @endif -->\n</div>",
        )
        .unwrap();
        fs::write(root.join("src/constants.js"), "const GREETING = 'hi'").unwrap();
        fs::write(root.join("src/view.js"), "render(GREETING)").unwrap();
        fs::write(
            root.join("src/main.js"),
            "// @if CHROME\nchromeBoot()\n// @endif\n// @if FIREFOX\nfirefoxBoot()\n// @endif\nstart()",
        )
        .unwrap();
        fs::write(root.join("src/config/chrome/overrides.js"), "const STORE = 'sync'").unwrap();
        fs::write(root.join("src/config/chrome/storage.js"), "legacy()").unwrap();
        fs::write(root.join("src/config/chrome/background.js"), "background()").unwrap();
        fs::write(root.join("src/config/safari/settings.js"), "settings()").unwrap();
        fs::write(root.join("src/config/safari/storage.js"), "legacy()").unwrap();
        fs::write(root.join("src/config/firefox/firefox.js"), "exports.main = start").unwrap();
        fs::write(root.join("src/config/firefox/package.json"), "{\"name\": \"app\"}").unwrap();
        fs::write(root.join("libs/jquery.js"), "jq()").unwrap();
        fs::write(root.join("icons/16/icon.png"), [1u8]).unwrap();
    }

    fn env_for(temp: &TempDir) -> BuildEnv {
        fixture_project(temp.path());
        BuildEnv {
            root: temp.path().to_path_buf(),
            config: test_config(),
        }
    }

    #[test]
    fn template_is_conditioned_and_inlined() {
        let temp = TempDir::new().unwrap();
        let env = env_for(&temp);

        build_template(&env, Browser::Chrome).unwrap();
        let fragment = fs::read_to_string(env.scratch().join("template.js")).unwrap();
        assert!(fragment.starts_with("const TEMPLATE = '"));
        assert!(fragment.contains("chrome"));
        assert!(!fragment.contains("firefox"));
    }

    #[test]
    fn scripts_concatenate_in_declared_order_with_overrides() {
        let temp = TempDir::new().unwrap();
        let env = env_for(&temp);

        build_template(&env, Browser::Chrome).unwrap();
        build_scripts(&env, Browser::Chrome).unwrap();

        let bundle = fs::read_to_string(env.scratch().join("app.js")).unwrap();
        let template_at = bundle.find("const TEMPLATE").unwrap();
        let constants_at = bundle.find("const GREETING").unwrap();
        let view_at = bundle.find("render(GREETING)").unwrap();
        let override_at = bundle.find("const STORE").unwrap();
        let entry_at = bundle.find("start()").unwrap();
        assert!(template_at < constants_at);
        assert!(constants_at < view_at);
        assert!(view_at < override_at);
        assert!(override_at < entry_at);

        // The chrome context keeps chrome regions and drops the others.
        assert!(bundle.contains("chromeBoot()"));
        assert!(!bundle.contains("firefoxBoot()"));
    }

    #[test]
    fn firefox_build_has_no_chrome_overrides() {
        let temp = TempDir::new().unwrap();
        let env = env_for(&temp);

        build_template(&env, Browser::Firefox).unwrap();
        build_scripts(&env, Browser::Firefox).unwrap();

        let bundle = fs::read_to_string(env.scratch().join("app.js")).unwrap();
        assert!(bundle.contains("firefoxBoot()"));
        assert!(!bundle.contains("chromeBoot()"));
        assert!(!bundle.contains("const STORE"));
    }

    #[test]
    fn chrome_tree_excludes_the_storage_override() {
        let temp = TempDir::new().unwrap();
        let env = env_for(&temp);

        build_template(&env, Browser::Chrome).unwrap();
        build_scripts(&env, Browser::Chrome).unwrap();
        fs::write(env.scratch().join("app.css"), "body {}").unwrap();
        assemble_tree(&env, Browser::Chrome).unwrap();

        let tree = env.target_dir(Browser::Chrome);
        assert!(tree.join("icons/16/icon.png").is_file());
        assert!(tree.join("jquery.js").is_file());
        assert!(tree.join("app.js").is_file());
        assert!(tree.join("app.css").is_file());
        assert!(tree.join("background.js").is_file());
        assert!(tree.join("overrides.js").is_file());
        assert!(!tree.join("storage.js").exists());
    }

    #[test]
    fn opera_tree_mirrors_chrome() {
        let temp = TempDir::new().unwrap();
        let env = env_for(&temp);

        build_template(&env, Browser::Chrome).unwrap();
        build_scripts(&env, Browser::Chrome).unwrap();
        fs::write(env.scratch().join("app.css"), "body {}").unwrap();
        assemble_tree(&env, Browser::Chrome).unwrap();
        assemble_tree(&env, Browser::Opera).unwrap();

        let tree = env.target_dir(Browser::Opera);
        assert!(tree.join("icons/16/icon.png").is_file());
        assert!(tree.join("app.js").is_file());
        assert_eq!(
            fs::read(tree.join("app.js")).unwrap(),
            fs::read(env.target_dir(Browser::Chrome).join("app.js")).unwrap()
        );
    }

    #[test]
    fn firefox_tree_uses_the_addon_layout() {
        let temp = TempDir::new().unwrap();
        let env = env_for(&temp);

        build_template(&env, Browser::Firefox).unwrap();
        build_scripts(&env, Browser::Firefox).unwrap();
        fs::write(env.scratch().join("app.css"), "body {}").unwrap();
        assemble_tree(&env, Browser::Firefox).unwrap();

        let tree = env.target_dir(Browser::Firefox);
        assert!(tree.join("data/icons/16/icon.png").is_file());
        assert!(tree.join("data/app.js").is_file());
        assert!(tree.join("data/app.css").is_file());
        assert!(tree.join("data/jquery.js").is_file());
        assert!(tree.join("lib/firefox.js").is_file());
        assert!(tree.join("package.json").is_file());
    }

    #[test]
    fn safari_tree_nests_under_the_extension_folder() {
        let temp = TempDir::new().unwrap();
        let env = env_for(&temp);

        build_template(&env, Browser::Safari).unwrap();
        build_scripts(&env, Browser::Safari).unwrap();
        fs::write(env.scratch().join("app.css"), "body {}").unwrap();
        assemble_tree(&env, Browser::Safari).unwrap();

        let tree = env
            .target_dir(Browser::Safari)
            .join("app.safariextension");
        assert!(tree.join("icons/16/icon.png").is_file());
        assert!(tree.join("app.js").is_file());
        assert!(tree.join("settings.js").is_file());
        assert!(!tree.join("storage.js").exists());
    }

    #[test]
    fn parse_rejects_unknown_targets() {
        assert!(Browser::parse("edge").is_err());
        assert_eq!(Browser::parse("opera").unwrap(), Browser::Opera);
    }
}
