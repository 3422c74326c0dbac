//! This client logs in against the server's local authentication route
//! and caches the returned access token for later use.
use anyhow::{anyhow, Context};
use authlocal::auth::{
    request::Credentials,
    response::{AuthenticateResponse, ErrorResponse},
};
use config::{Config, File, FileFormat};
use once_cell::sync::Lazy;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The base URL for making API requests.
static BASE_URL: Lazy<String> =
    Lazy::new(|| std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()));

/// Posts the credentials to the local authentication route.
fn log_in(
    credentials: &Credentials,
    client: &reqwest::blocking::Client,
) -> anyhow::Result<AuthenticateResponse> {
    debug!("logging in as {:?}", credentials.username);

    let res = client
        .post(format!("{}/auths/local", *BASE_URL))
        .json(credentials)
        .send()
        .context("request for access token failed")?;

    if res.status().is_success() {
        res.json::<AuthenticateResponse>()
            .context("failed to parse auth response")
    } else {
        let status = res.status();
        let err = res
            .json::<ErrorResponse>()
            .context("failed to parse error response")?;

        Err(anyhow!(
            "authentication failed with {} ({:?}): {}",
            status,
            err.status,
            err.error
        ))
    }
}

/// Writes the access token to `access_token_path`, creating its parent
/// directory if needed.
fn store_token(token: &str, access_token_path: &Path) -> anyhow::Result<()> {
    let data_directory_path = access_token_path
        .parent()
        .context("failed to get directory path")?;

    fs::create_dir_all(data_directory_path).context("failed to create data directory")?;
    fs::write(access_token_path, token).context("failed to write access token")?;

    debug!("stored access token at {:?}", access_token_path);

    Ok(())
}

/// Resolves `file` inside this app's directory under `base`, which is one
/// of the platform config or data directories.
fn app_path(base: Option<PathBuf>, kind: &str, file: &str) -> anyhow::Result<PathBuf> {
    let base = base.ok_or_else(|| anyhow!("failed to find the local {kind} directory"))?;

    Ok(base.join("authlocal").join(file))
}

fn main() {
    // setup logging
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("client=debug")
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("failed to set global default");

    // determine config file paths
    let config_file_path = app_path(dirs::config_dir(), "config", "config.toml")
        .expect("couldn't find the config file path");
    let access_token_path = app_path(dirs::data_dir(), "data", "access_token")
        .expect("couldn't find the access token path");

    // load config items
    let config = Config::builder()
        .add_source(
            File::from(config_file_path.clone())
                .required(true)
                .format(FileFormat::Toml),
        )
        .build()
        .expect("failed to load config file");
    let username = config
        .get::<String>("username")
        .expect("property 'username' not found in config file");
    let password = config
        .get::<String>("password")
        .expect("property 'password' not found in config file");

    debug!("config file path: {:?}", config_file_path);
    debug!("access token path: {:?}", access_token_path);

    let client = reqwest::blocking::Client::new();
    let credentials = Credentials::new(username, password);

    let res = log_in(&credentials, &client).expect("couldn't acquire an access token");

    store_token(&res.access_token, &access_token_path).expect("couldn't store the access token");

    println!(
        "logged in as {} ({}, verified: {})",
        res.user.username, res.user.id, res.user.verified
    );
}
