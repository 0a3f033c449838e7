use std::path::PathBuf;

/// Print the unread Gmail inbox count as a status bar record.
///
/// Without arguments the client secret is read from `.config/gmailcheck/credentials.json`
/// (relative to the working directory) and the token is cached under the user's
/// configuration directory.
#[derive(Debug, Clone, clap::Parser)]
#[command(version, about)]
pub struct App {
    /// Path to the OAuth client secret file (only JSON is supported).
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Path to the cached OAuth token.
    #[arg(long)]
    pub token: Option<PathBuf>,
}
