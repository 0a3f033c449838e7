use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use oauth2::{basic::BasicClient, AuthUrl, ClientId, ClientSecret, RedirectUrl, Scope, TokenUrl};
use serde::Deserialize;

use crate::oauth::AppClient;

/// Client secret location, relative to the working directory.
pub const CREDENTIALS_PATH: &str = ".config/gmailcheck/credentials.json";

const APP_DIR: &str = "gmailcheck";
const TOKEN_FILE: &str = "token.json";

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

pub fn get_credentials_path<P>(path: Option<P>) -> PathBuf
where
    P: AsRef<Path>,
{
    match path {
        Some(path) => path.as_ref().to_path_buf(),
        None => PathBuf::from(CREDENTIALS_PATH),
    }
}

pub fn get_token_path<P>(path: Option<P>) -> Result<PathBuf, crate::Error>
where
    P: AsRef<Path>,
{
    if let Some(path) = path {
        return Ok(path.as_ref().to_path_buf());
    };

    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(TOKEN_FILE))
        .ok_or(crate::Error::NoConfigDir)
}

/// The client secret file as downloaded from the Google Cloud console.
#[derive(Debug, Deserialize)]
enum ClientSecretFile {
    #[serde(rename = "installed")]
    Installed(ClientConfig),
    #[serde(rename = "web")]
    Web(ClientConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    #[serde(alias = "auth_uri")]
    pub auth_url: AuthUrl,
    #[serde(alias = "token_uri")]
    pub token_url: TokenUrl,
    #[serde(default)]
    pub redirect_uris: Vec<RedirectUrl>,
    #[serde(default = "readonly_scope")]
    pub scope: Scope,
}

fn readonly_scope() -> Scope {
    Scope::new(GMAIL_READONLY_SCOPE.to_string())
}

impl ClientConfig {
    pub fn load<P>(path: P) -> Result<Self, crate::Error>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new().read(true).open(path)?;
        let (ClientSecretFile::Installed(config) | ClientSecretFile::Web(config)) =
            serde_json::from_reader(file)?;
        Ok(config)
    }

    /// Builds the OAuth client, redirecting to the first registered redirect URI.
    pub fn client(&self) -> AppClient {
        let client = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone());

        match self.redirect_uris.first() {
            Some(redirect_url) => client.set_redirect_uri(redirect_url.clone()),
            None => {
                tracing::warn!("Client configuration has no redirect URI");
                client
            }
        }
    }
}
