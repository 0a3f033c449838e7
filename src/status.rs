use std::io::Write;

use serde::Serialize;

use crate::Error;

pub trait UnreadCounter {
    fn count_unread(&mut self) -> Result<usize, Error>;
}

/// Status bar record, in the format of waybar's custom modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl StatusRecord {
    pub fn unread(count: usize) -> Self {
        Self {
            text: Some(format!("{count} ✉️")),
            alt: Some("mail".to_string()),
            tooltip: Some(format!("{count} unread mail")),
        }
    }
}

/// Writes the unread count as a single JSON line. Nothing is written if counting fails.
pub fn report<C, W>(counter: &mut C, mut out: W) -> Result<(), Error>
where
    C: UnreadCounter,
    W: Write,
{
    let count = counter.count_unread()?;
    tracing::debug!("{count} unread messages");

    let record = StatusRecord::unread(count);
    let mut line = serde_json::to_vec(&record)?;
    line.push(b'\n');
    out.write_all(&line)?;
    out.flush()?;
    Ok(())
}
