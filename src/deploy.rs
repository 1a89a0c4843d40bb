//! Stand up one n8n client: pick a port, render its compose file, start it,
//! and route `/<prefix>/<client>/` to it through nginx.

use std::{
    net::{IpAddr, TcpListener},
    path::{Path, PathBuf},
};

use regex::Regex;
use serde::Serialize;

use crate::{
    config::DeployConfig,
    errors::{ErrorLayer, Result, ToolError},
    proxy_config::{
        create_base_config, enable_site, reload_proxy, render_clients_header,
        render_location_block, update_proxy_config, BaseConfig,
    },
    runner::CommandRunner,
    store::TextStore,
    templating::builder::{build_and_parse, embedded_template_source, render, COMPOSE_TEMPLATE},
};

/// Find the first port at or above `base_port` we can bind on `host`, giving
/// up after `max_attempts` ports.
///
/// This is inherently racy (someone can grab the port between us releasing it
/// and docker binding it) but it's what we've got without asking docker.
pub fn find_next_available_port(host: IpAddr, base_port: u16, max_attempts: u32) -> Result<u16> {
    let mut port = base_port;
    for _ in 0..max_attempts {
        match TcpListener::bind((host, port)) {
            Ok(listener) => {
                drop(listener);
                trace!(port, "found available port");
                return Ok(port);
            }
            Err(e) => {
                trace!(port, error = %e, "port unavailable");
            }
        }
        port = match port.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    Err(ToolError::sticky(
        ErrorLayer::ExternalLayer,
        format!(
            "No available port found after {} attempts starting at {}.",
            max_attempts, base_port
        ),
    ))
}

/// Client identifiers end up in file names, container names, and URL paths,
/// so we keep them to a boring alphabet.
pub fn validate_client_identifier(client_identifier: &str) -> Result<()> {
    lazy_static! {
        static ref RE_CLIENT_IDENTIFIER: Regex =
            Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap();
    }

    if RE_CLIENT_IDENTIFIER.is_match(client_identifier) {
        Ok(())
    } else {
        Err(ToolError::sticky(
            ErrorLayer::BadInput,
            format!(
                "Client identifier '{}' must be letters, digits, '-' or '_'",
                client_identifier
            ),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// What the operator asks for; the port gets decided at deploy time.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    pub client_identifier: String,
    /// Defaults to the client identifier.
    pub basic_auth_user: Option<String>,
    pub basic_auth_password: String,
    pub database: DatabaseSettings,
}

/// The variables available to the compose template.
#[derive(Debug, Clone, Serialize)]
pub struct ClientData {
    pub client_identifier: String,
    pub client_port: u16,
    pub image: String,
    pub location_prefix: String,
    pub postgres_host: String,
    pub postgres_port: String,
    pub postgres_database: String,
    pub postgres_user: String,
    pub postgres_password: String,
    pub basic_auth_user: String,
    pub basic_auth_password: String,
}

impl ClientData {
    pub fn new(request: &ClientRequest, client_port: u16, config: &DeployConfig) -> Self {
        ClientData {
            client_identifier: request.client_identifier.clone(),
            client_port,
            image: config.compose_image.clone(),
            location_prefix: config.proxy.location_prefix.clone(),
            postgres_host: request.database.host.clone(),
            postgres_port: request.database.port.clone(),
            postgres_database: request.database.database.clone(),
            postgres_user: request.database.user.clone(),
            postgres_password: request.database.password.clone(),
            basic_auth_user: request
                .basic_auth_user
                .clone()
                .unwrap_or_else(|| request.client_identifier.clone()),
            basic_auth_password: request.basic_auth_password.clone(),
        }
    }
}

/// Load the compose template source: the configured file if there is one,
/// otherwise the embedded default.
pub fn load_compose_template(store: &dyn TextStore, config: &DeployConfig) -> Result<String> {
    match &config.compose_template {
        None => Ok(embedded_template_source(COMPOSE_TEMPLATE)?.to_string()),
        Some(path) => match store.read(path)? {
            Some(source) => Ok(source),
            None => Err(ToolError::sticky(
                ErrorLayer::ConfigLayer,
                format!("The compose template '{}' was not found.", path.display()),
            )),
        },
    }
}

pub fn render_compose(template_source: &str, client: &ClientData) -> Result<String> {
    let template = build_and_parse(template_source)?;
    let globals = liquid::to_object(client)?;
    render(&template, &globals)
}

pub fn compose_file_path(output_dir: &Path, client_identifier: &str) -> PathBuf {
    output_dir.join(format!("docker-compose-{}.yaml", client_identifier))
}

pub fn write_compose_file(
    store: &dyn TextStore,
    output_dir: &Path,
    client_identifier: &str,
    rendered: &str,
) -> Result<PathBuf> {
    let path = compose_file_path(output_dir, client_identifier);
    store.write(&path, rendered)?;
    info!(path = %path.display(), "compose file generated");
    Ok(path)
}

pub fn run_compose(runner: &dyn CommandRunner, compose_file: &Path) -> Result<()> {
    let compose_str = compose_file.display().to_string();
    runner.run("docker-compose", &["-f", &compose_str, "up", "-d"])?;
    Ok(())
}

/// The collaborators a deployment works through.
pub struct DeployContext<'a> {
    pub config: &'a DeployConfig,
    pub store: &'a dyn TextStore,
    pub runner: &'a dyn CommandRunner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub client_identifier: String,
    pub client_port: u16,
    pub compose_file: PathBuf,
    /// `docker-compose up` failures are logged and reported here rather than
    /// aborting, so the proxy side still gets set up and a later manual
    /// `up` is all that's needed.
    pub compose_started: bool,
    pub base_config_created: bool,
    pub location_added: bool,
    pub site_enabled: bool,
}

/// Deploy one client end to end: port, compose file, `docker-compose up`,
/// base site, location block, site link, then `nginx -t` and reload.
///
/// Re-running for a client whose container is still up is not a no-op: its
/// old port is taken, so a new port is picked and a second
/// `location /<prefix>/<client>/` block is appended next to the old one.
/// nginx rejects the duplicate location at `nginx -t`, which leaves the
/// running proxy untouched but the locations file already saved.  Take the
/// old container down and remove its block before redeploying.
pub fn deploy_client(ctx: &DeployContext, request: &ClientRequest) -> Result<DeployReport> {
    let span = info_span!("deploy_client", client = %request.client_identifier);
    let _span_guard = span.enter();

    validate_client_identifier(&request.client_identifier)?;
    let config = ctx.config;

    let client_port = find_next_available_port(
        config.ports.bind_host,
        config.ports.base_port,
        config.ports.max_attempts,
    )?;
    let client = ClientData::new(request, client_port, config);

    let template_source = load_compose_template(ctx.store, config)?;
    let rendered = render_compose(&template_source, &client)?;
    let compose_file = write_compose_file(
        ctx.store,
        &config.output_dir,
        &client.client_identifier,
        &rendered,
    )?;

    let compose_started = match run_compose(ctx.runner, &compose_file) {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "problem running docker-compose");
            false
        }
    };

    let proxy = &config.proxy;
    let base_config_created = match BaseConfig::from_proxy_config(proxy) {
        Some(base) => create_base_config(ctx.store, ctx.runner, &proxy.site_config_path, &base)?,
        None => false,
    };

    let header = render_clients_header(&proxy.location_prefix)?;
    let block = render_location_block(
        &proxy.location_prefix,
        &client.client_identifier,
        client.client_port,
    )?;
    let location_added = update_proxy_config(ctx.store, &proxy.locations_path, &header, &block)?;

    // Link before reloading so a brand new site is picked up by this reload.
    let site_enabled = enable_site(
        ctx.store,
        ctx.runner,
        &proxy.site_config_path,
        &proxy.sites_enabled_dir,
    )?;
    reload_proxy(ctx.runner)?;

    Ok(DeployReport {
        client_identifier: client.client_identifier,
        client_port,
        compose_file,
        compose_started,
        base_config_created,
        location_added,
        site_enabled,
    })
}
