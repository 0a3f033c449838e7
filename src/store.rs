use std::{
    fs::{self, File, OpenOptions},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use crate::{oauth::Authorizer, token::Credential, Error};

/// The on-disk credential cache.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached credential, if there is one that parses.
    ///
    /// Expiry is not checked here, expired tokens are refreshed when used.
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    pub fn acquire<A>(&self, authorizer: &A) -> Result<Credential, Error>
    where
        A: Authorizer,
    {
        if let Some(credential) = self.load() {
            return Ok(credential);
        }

        tracing::info!("No usable cached credential, starting interactive authorization");
        let credential = authorizer.authorize()?;
        self.save(&credential)?;
        Ok(credential)
    }

    /// A missing or unreadable cache is not an error, the caller asks for a new credential.
    pub fn load(&self) -> Option<Credential> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) => {
                tracing::debug!("No cached credential at {}: {err}", self.path.display());
                return None;
            }
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(credential) => Some(credential),
            Err(err) => {
                tracing::warn!(
                    "Ignoring unparseable cached credential at {}: {err}",
                    self.path.display()
                );
                None
            }
        }
    }

    /// Replaces the cache with `credential`, readable by the owner only.
    pub fn save(&self, credential: &Credential) -> Result<(), Error> {
        self.write(credential).map_err(|source| Error::CacheWrite {
            path: self.path.clone(),
            source: Box::new(source),
        })
    }

    fn write(&self, credential: &Credential) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        // The mode only applies to newly created files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(&credential.to_json()?)?;
        file.sync_all()?;
        tracing::debug!("Cached credential at {}", self.path.display());
        Ok(())
    }
}
