//! Editing of the nginx reverse-proxy configuration that fronts the per-client
//! n8n containers.
//!
//! Everything here is written to be re-run: blocks are only appended when the
//! exact same text isn't already present, the base site file is only written
//! when missing, and the sites-enabled link is only created once.

use std::path::{Path, PathBuf};

use crate::{
    config::ProxyConfig,
    errors::{ErrorLayer, Result, ToolError},
    runner::CommandRunner,
    store::TextStore,
    templating::builder::{
        build_and_parse_embedded, render, PROXY_BASE_TEMPLATE, PROXY_CLIENTS_HEADER_TEMPLATE,
        PROXY_LOCATION_TEMPLATE,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInsertion {
    pub text: String,
    pub inserted: bool,
}

/// Append `block` to `existing_text` unless the exact block is already in
/// there somewhere.  Only verbatim containment counts, so two blocks that
/// differ just in their client identifier or port are both kept.
pub fn ensure_block_present(existing_text: &str, block: &str) -> BlockInsertion {
    if existing_text.contains(block) {
        return BlockInsertion {
            text: existing_text.to_string(),
            inserted: false,
        };
    }

    let mut text = String::with_capacity(existing_text.len() + block.len());
    text.push_str(existing_text);
    text.push_str(block);
    BlockInsertion {
        text,
        inserted: true,
    }
}

pub fn render_location_block(
    location_prefix: &str,
    client_identifier: &str,
    client_port: u16,
) -> Result<String> {
    let template = build_and_parse_embedded(PROXY_LOCATION_TEMPLATE)?;
    let globals = liquid::object!({
        "location_prefix": location_prefix,
        "client_identifier": client_identifier,
        "client_port": client_port as i64,
    });
    render(&template, &globals)
}

/// First line of a freshly created locations file.
pub fn render_clients_header(location_prefix: &str) -> Result<String> {
    let template = build_and_parse_embedded(PROXY_CLIENTS_HEADER_TEMPLATE)?;
    let globals = liquid::object!({
        "location_prefix": location_prefix,
    });
    render(&template, &globals)
}

/// Make sure `block` is in the file at `path`, creating the file with `header`
/// first if it doesn't exist yet.  Returns whether the block was added.
pub fn update_proxy_config(
    store: &dyn TextStore,
    path: &Path,
    header: &str,
    block: &str,
) -> Result<bool> {
    let (existing, created) = match store.read(path)? {
        Some(existing) => (existing, false),
        None => {
            info!(path = %path.display(), "proxy config does not exist, creating it");
            (header.to_string(), true)
        }
    };

    let insertion = ensure_block_present(&existing, block);
    if insertion.inserted || created {
        store.write(path, &insertion.text)?;
    }

    if insertion.inserted {
        info!(path = %path.display(), "added location block");
    } else {
        info!(path = %path.display(), "location block already present");
    }
    Ok(insertion.inserted)
}

/// Everything the base site file (TLS server + HTTP redirect) needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseConfig {
    pub server_name: String,
    pub locations_path: PathBuf,
    pub certificate: PathBuf,
    pub certificate_key: PathBuf,
    pub options_include: PathBuf,
    pub dhparam: PathBuf,
}

impl BaseConfig {
    /// `None` when no server name is configured, meaning the site file is
    /// managed by someone else.
    pub fn from_proxy_config(proxy: &ProxyConfig) -> Option<BaseConfig> {
        let server_name = proxy.server_name.clone()?;
        let live_dir = proxy.tls.live_dir_for(&server_name);
        Some(BaseConfig {
            locations_path: proxy.locations_path.clone(),
            certificate: live_dir.join("fullchain.pem"),
            certificate_key: live_dir.join("privkey.pem"),
            options_include: proxy.tls.options_include.clone(),
            dhparam: proxy.tls.dhparam.clone(),
            server_name,
        })
    }

    pub fn render(&self) -> Result<String> {
        let template = build_and_parse_embedded(PROXY_BASE_TEMPLATE)?;
        let globals = liquid::object!({
            "server_name": self.server_name.clone(),
            "locations_path": self.locations_path.display().to_string(),
            "tls": {
                "certificate": self.certificate.display().to_string(),
                "certificate_key": self.certificate_key.display().to_string(),
                "options_include": self.options_include.display().to_string(),
                "dhparam": self.dhparam.display().to_string(),
            },
        });
        render(&template, &globals)
    }
}

/// Write the base site file unless it already exists, then hand it to root
/// with 0644 permissions.  Ownership and mode are applied on every call so a
/// run that died between writing and `chown` is repaired by the next one.
/// Returns whether the file was created.
pub fn create_base_config(
    store: &dyn TextStore,
    runner: &dyn CommandRunner,
    path: &Path,
    base: &BaseConfig,
) -> Result<bool> {
    let created = if store.exists(path)? {
        info!(path = %path.display(), "base proxy config already exists");
        false
    } else {
        store.write(path, &base.render()?)?;
        info!(path = %path.display(), "created base proxy config");
        true
    };

    let path_str = path.display().to_string();
    runner.run("chown", &["root:root", &path_str])?;
    runner.run("chmod", &["644", &path_str])?;
    Ok(created)
}

/// Check the configuration and, only if it passes, reload nginx.
pub fn reload_proxy(runner: &dyn CommandRunner) -> Result<()> {
    runner.run("nginx", &["-t"])?;
    runner.run("nginx", &["-s", "reload"])?;
    info!("nginx configuration reloaded");
    Ok(())
}

/// Link `config_path` into `enabled_dir` unless a link (even a dangling one)
/// is already there.  Returns whether the link was created.
pub fn enable_site(
    store: &dyn TextStore,
    runner: &dyn CommandRunner,
    config_path: &Path,
    enabled_dir: &Path,
) -> Result<bool> {
    let file_name = config_path.file_name().ok_or_else(|| {
        ToolError::sticky(
            ErrorLayer::ConfigLayer,
            format!("'{}' has no file name to enable", config_path.display()),
        )
    })?;
    let enabled_path = enabled_dir.join(file_name);

    if store.link_exists(&enabled_path)? {
        info!(path = %enabled_path.display(), "site already enabled");
        return Ok(false);
    }

    let config_str = config_path.display().to_string();
    let enabled_str = enabled_path.display().to_string();
    runner.run("ln", &["-s", &config_str, &enabled_str])?;
    info!(path = %enabled_path.display(), "site enabled");
    Ok(true)
}
