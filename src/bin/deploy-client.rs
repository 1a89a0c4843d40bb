use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use opstools::{
    config::load_deploy_config,
    deploy::{deploy_client, ClientRequest, DatabaseSettings, DeployContext},
    logging::init_logging,
    runner::SystemCommandRunner,
    store::FsTextStore,
};

/// Deploy an n8n instance for a client: docker-compose file, container, and
/// an nginx location under the shared site.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Unique identifier for the client.  Used in file, container, and URL
    /// names.
    client_identifier: String,

    /// TOML deployment config.  Built-in defaults are used when absent.
    #[arg(long, env = "OPSTOOLS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the compose file is written to.  Overrides the config.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Public server name.  When given, the base nginx site is created if it
    /// doesn't exist yet.  Overrides the config.
    #[arg(long)]
    server_name: Option<String>,

    /// First port to try for the client.  Overrides the config.
    #[arg(long)]
    base_port: Option<u16>,

    /// Defaults to the client identifier.
    #[arg(long)]
    basic_auth_user: Option<String>,

    #[arg(long, env = "N8N_BASIC_AUTH_PASSWORD", hide_env_values = true)]
    basic_auth_password: String,

    #[arg(long, env = "DB_POSTGRESDB_HOST")]
    db_host: String,

    #[arg(long, env = "DB_POSTGRESDB_PORT", default_value = "5432")]
    db_port: String,

    #[arg(long, env = "DB_POSTGRESDB_DATABASE", default_value = "n8n")]
    db_name: String,

    #[arg(long, env = "DB_POSTGRESDB_USER")]
    db_user: String,

    #[arg(long, env = "DB_POSTGRESDB_PASSWORD", hide_env_values = true)]
    db_password: String,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let mut config = match load_deploy_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(server_name) = args.server_name {
        config.proxy.server_name = Some(server_name);
    }
    if let Some(base_port) = args.base_port {
        config.ports.base_port = base_port;
    }

    let request = ClientRequest {
        client_identifier: args.client_identifier,
        basic_auth_user: args.basic_auth_user,
        basic_auth_password: args.basic_auth_password,
        database: DatabaseSettings {
            host: args.db_host,
            port: args.db_port,
            database: args.db_name,
            user: args.db_user,
            password: args.db_password,
        },
    };

    let store = FsTextStore;
    let runner = SystemCommandRunner;
    let ctx = DeployContext {
        config: &config,
        store: &store,
        runner: &runner,
    };

    match deploy_client(&ctx, &request) {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Error: Problem serializing report: {}", err),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
