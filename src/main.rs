mod cli;
mod config;
mod gmail;
mod oauth;
mod status;
mod store;
#[cfg(test)]
mod testing;
mod token;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use oauth2::basic::BasicRequestTokenError;
use oauth2::{reqwest, HttpClientError};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::App;
use crate::config::{get_credentials_path, get_token_path, ClientConfig};
use crate::gmail::{session::AuthorizedSession, Gmail};
use crate::oauth::{http_client, ConsoleAuthorizer};
use crate::store::CredentialStore;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("token request failed: {0}")]
    RequestToken(#[from] BasicRequestTokenError<HttpClientError<reqwest::Error>>),

    #[error("no authorization code was provided")]
    MissingAuthorizationCode,

    #[error("the redirect does not belong to this authorization request")]
    StateMismatch,

    #[error("authorization was denied: {0}")]
    AuthorizationDenied(String),

    #[error("Gmail API responded with {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("couldn't read client configuration from {}: {source}", path.display())]
    ClientConfig {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("couldn't cache token at {}: {source}", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("no user configuration directory is available")]
    NoConfigDir,
}

/// Logs go to stderr, stdout only carries the status record.
fn setup_logging() -> WorkerGuard {
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(Level::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    guard
}

fn main() -> ExitCode {
    let _guard = setup_logging();

    execute(App::parse())
}

/// Failures are reported here and only here, as a single line.
fn execute(app: App) -> ExitCode {
    match run(app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(app: App) -> Result<(), Error> {
    let credentials_path = get_credentials_path(app.credentials);
    let config =
        ClientConfig::load(&credentials_path).map_err(|source| Error::ClientConfig {
            path: credentials_path,
            source: Box::new(source),
        })?;

    let store = CredentialStore::new(get_token_path(app.token)?);
    tracing::debug!("Using credential cache at {}", store.path().display());
    let client = config.client();
    let http_client = http_client()?;

    let authorizer = ConsoleAuthorizer::new(&client, &http_client, config.scope.clone());
    let credential = store.acquire(&authorizer)?;

    let session = AuthorizedSession::new(&client, &http_client, &store, credential);
    let mut gmail = Gmail::new(session);
    status::report(&mut gmail, std::io::stdout().lock())
}
