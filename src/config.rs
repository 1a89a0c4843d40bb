//! Deployment configuration.  Every path the deployment touches lives here so
//! nothing reaches for a hard-coded location; the `deploy-client` binary
//! loads this from an optional TOML file and lets flags override bits of it.
//!
//! An example file:
//!
//! ```toml
//! output_dir = "/srv/n8n"
//!
//! [proxy]
//! server_name = "hub.example.com"
//! location_prefix = "n8n"
//!
//! [ports]
//! base_port = 5678
//! ```

use std::{
    io::ErrorKind,
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorLayer, Result, ToolError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// Liquid template for the compose file.  The embedded template is used
    /// when unset.
    pub compose_template: Option<PathBuf>,
    /// Where `docker-compose-<client>.yaml` files get written.
    pub output_dir: PathBuf,
    pub compose_image: String,
    pub proxy: ProxyConfig,
    pub ports: PortConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            compose_template: None,
            output_dir: PathBuf::from("."),
            compose_image: "docker.n8n.io/n8nio/n8n:latest".to_string(),
            proxy: ProxyConfig::default(),
            ports: PortConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Without a server name we won't create the base server config and
    /// assume somebody already wrote one that includes `locations_path`.
    pub server_name: Option<String>,
    /// The site file living in sites-available.
    pub site_config_path: PathBuf,
    pub sites_enabled_dir: PathBuf,
    /// Per-client location blocks are appended here; the site file includes
    /// it from inside its TLS server block.
    pub locations_path: PathBuf,
    pub location_prefix: String,
    pub tls: TlsConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            server_name: None,
            site_config_path: PathBuf::from("/etc/nginx/sites-available/n8n-clients"),
            sites_enabled_dir: PathBuf::from("/etc/nginx/sites-enabled"),
            locations_path: PathBuf::from("/etc/nginx/snippets/n8n-clients.conf"),
            location_prefix: "n8n".to_string(),
            tls: TlsConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsConfig {
    /// Directory holding `fullchain.pem` and `privkey.pem`.  Defaults to the
    /// certbot live directory for the server name.
    pub live_dir: Option<PathBuf>,
    pub options_include: PathBuf,
    pub dhparam: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        TlsConfig {
            live_dir: None,
            options_include: PathBuf::from("/etc/letsencrypt/options-ssl-nginx.conf"),
            dhparam: PathBuf::from("/etc/letsencrypt/ssl-dhparams.pem"),
        }
    }
}

impl TlsConfig {
    pub fn live_dir_for(&self, server_name: &str) -> PathBuf {
        match &self.live_dir {
            Some(dir) => dir.clone(),
            None => Path::new("/etc/letsencrypt/live").join(server_name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortConfig {
    pub base_port: u16,
    pub max_attempts: u32,
    /// Address we probe-bind on when looking for a free port.
    pub bind_host: IpAddr,
}

impl Default for PortConfig {
    fn default() -> Self {
        PortConfig {
            base_port: 5678,
            max_attempts: 100,
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

pub fn parse_deploy_config(toml_str: &str) -> Result<DeployConfig> {
    Ok(toml::from_str(toml_str)?)
}

/// Load the config from `path`, or the defaults if no path was given.  A path
/// that was given but doesn't exist is an error rather than a silent
/// fallback.
pub fn load_deploy_config(path: Option<&Path>) -> Result<DeployConfig> {
    let path = match path {
        Some(path) => path,
        None => return Ok(DeployConfig::default()),
    };

    let toml_str = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ToolError::sticky(
                ErrorLayer::ConfigLayer,
                format!("Config file '{}' was not found", path.display()),
            ));
        }
        Err(e) => {
            return Err(ToolError::sticky(
                ErrorLayer::ConfigLayer,
                format!("Problem reading config file '{}': {}", path.display(), e),
            ));
        }
    };

    parse_deploy_config(&toml_str).map_err(|e| {
        ToolError::sticky(
            ErrorLayer::ConfigLayer,
            format!("Problem parsing config file '{}': {}", path.display(), e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(parse_deploy_config("").unwrap(), DeployConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_what_it_names() {
        let config = parse_deploy_config(
            r#"
output_dir = "/srv/n8n"

[proxy]
server_name = "hub.example.com"

[ports]
base_port = 6000
bind_host = "0.0.0.0"
"#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/srv/n8n"));
        assert_eq!(config.proxy.server_name.as_deref(), Some("hub.example.com"));
        assert_eq!(config.proxy.location_prefix, "n8n");
        assert_eq!(config.ports.base_port, 6000);
        assert_eq!(config.ports.max_attempts, 100);
        assert_eq!(config.ports.bind_host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_deploy_config("outptu_dir = \"/tmp\"").unwrap_err();
        assert_eq!(err.layer(), ErrorLayer::ConfigLayer);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_deploy_config(Some(Path::new("/nonexistent/opstools.toml"))).unwrap_err();
        assert!(err.message().contains("was not found"));
    }

    #[test]
    fn no_config_file_means_defaults() {
        assert_eq!(load_deploy_config(None).unwrap(), DeployConfig::default());
    }

    #[test]
    fn tls_live_dir_defaults_to_certbot_layout() {
        let tls = TlsConfig::default();
        assert_eq!(
            tls.live_dir_for("hub.example.com"),
            PathBuf::from("/etc/letsencrypt/live/hub.example.com")
        );
    }
}
