use chrono::Utc;
use oauth2::reqwest::{
    self,
    blocking::{Client, Response},
    StatusCode,
};
use serde::Serialize;

use crate::{oauth::AppClient, store::CredentialStore, token::Credential, Error};

/// Sends requests on behalf of the user, refreshing the access token when it has expired
/// or the server rejects it. Refreshed credentials replace the cached one.
pub struct AuthorizedSession<'a> {
    client: &'a AppClient,
    http_client: &'a Client,
    store: &'a CredentialStore,
    credential: Credential,
}

impl<'a> AuthorizedSession<'a> {
    pub fn new(
        client: &'a AppClient,
        http_client: &'a Client,
        store: &'a CredentialStore,
        credential: Credential,
    ) -> Self {
        Self {
            client,
            http_client,
            store,
            credential,
        }
    }

    /// The response is returned whatever its status, except for a 401 that a refresh fixed.
    #[tracing::instrument(skip(self, query))]
    pub fn get<Q>(&mut self, url: &str, query: &Q) -> Result<Response, Error>
    where
        Q: Serialize + ?Sized,
    {
        let mut refreshed = false;
        if self.credential.is_expired(Utc::now()) && self.credential.refresh_token.is_some() {
            tracing::debug!("Access token expired, refreshing before the request");
            self.refresh()?;
            refreshed = true;
        }

        let response = self.send(url, query)?;
        if response.status() != StatusCode::UNAUTHORIZED
            || refreshed
            || self.credential.refresh_token.is_none()
        {
            return Ok(response);
        }

        tracing::info!("Access token was rejected, refreshing");
        self.refresh()?;
        Ok(self.send(url, query)?)
    }

    fn send<Q>(&self, url: &str, query: &Q) -> Result<Response, reqwest::Error>
    where
        Q: Serialize + ?Sized,
    {
        self.http_client
            .get(url)
            .bearer_auth(self.credential.access_token.secret())
            .query(query)
            .send()
    }

    fn refresh(&mut self) -> Result<(), Error> {
        let Some(refresh_token) = self.credential.refresh_token.as_ref() else {
            return Ok(());
        };

        let response = self
            .client
            .exchange_refresh_token(refresh_token)
            .request(self.http_client)?;
        let credential =
            Credential::from_token_response(&response, Some(refresh_token), Utc::now());

        self.store.save(&credential)?;
        self.credential = credential;
        Ok(())
    }
}
