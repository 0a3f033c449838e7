use std::io::{BufRead, Write};

use chrono::Utc;
use oauth2::{
    basic::BasicClient,
    reqwest::{self},
    url::Url,
    AuthorizationCode, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge, Scope,
};

use crate::{token::Credential, Error};

pub type AppClient = BasicClient<
    EndpointSet, // Auth URL
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet, // Token URL
>;

pub fn http_client() -> Result<reqwest::blocking::Client, Error> {
    Ok(reqwest::blocking::ClientBuilder::new()
        // Following redirects opens the client up to SSRF vulnerabilities.
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}

/// Obtains a brand new credential from the user.
pub trait Authorizer {
    fn authorize(&self) -> Result<Credential, Error>;
}

/// Authorization code flow driven from the terminal: the user opens the printed URL and
/// pastes back the code (or the whole URL the browser was redirected to).
pub struct ConsoleAuthorizer<'a> {
    client: &'a AppClient,
    http_client: &'a reqwest::blocking::Client,
    scope: Scope,
}

impl<'a> ConsoleAuthorizer<'a> {
    pub fn new(
        client: &'a AppClient,
        http_client: &'a reqwest::blocking::Client,
        scope: Scope,
    ) -> Self {
        Self {
            client,
            http_client,
            scope,
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn authorize_with<R, W>(&self, mut input: R, mut prompt: W) -> Result<Credential, Error>
    where
        R: BufRead,
        W: Write,
    {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(self.scope.clone())
            // Without offline access Google does not hand out a refresh token
            .add_extra_param("access_type", "offline")
            .set_pkce_challenge(pkce_challenge)
            .url();

        writeln!(
            prompt,
            "Open the following URL, then paste the authorization code (or the URL you were redirected to):\n{auth_url}"
        )?;
        prompt.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            tracing::debug!("Input closed before an authorization code was provided");
            return Err(Error::MissingAuthorizationCode);
        }
        let code = parse_authorization_input(&line, &csrf_token)?;

        let token = self
            .client
            .exchange_code(code)
            .set_pkce_verifier(pkce_verifier)
            .request(self.http_client)?;
        tracing::debug!("Authorization code exchanged for a new token");

        Ok(Credential::from_token_response(&token, None, Utc::now()))
    }
}

impl Authorizer for ConsoleAuthorizer<'_> {
    fn authorize(&self) -> Result<Credential, Error> {
        self.authorize_with(std::io::stdin().lock(), std::io::stderr().lock())
    }
}

/// Accepts either a bare authorization code or the full redirect URL.
pub fn parse_authorization_input(
    input: &str,
    expected_state: &CsrfToken,
) -> Result<AuthorizationCode, Error> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::MissingAuthorizationCode);
    }

    let Ok(url) = Url::parse(input) else {
        return Ok(AuthorizationCode::new(input.to_string()));
    };

    let (mut code, mut state, mut error) = (None, None, None);
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => { /* no-op */ }
        }
    }

    if let Some(error) = error {
        return Err(Error::AuthorizationDenied(error));
    }
    if state.is_some_and(|state| &state != expected_state.secret()) {
        return Err(Error::StateMismatch);
    }

    code.map(AuthorizationCode::new)
        .ok_or(Error::MissingAuthorizationCode)
}
