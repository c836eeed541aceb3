//! Consent prompts for system-wide capture.
//!
//! [`TerminalConsentPrompt`] asks on stdin/stdout for the CLI binary.
//! [`FixedConsent`] answers without asking, for unattended deployments that
//! recorded the user's decision elsewhere (`--assume-consent`).

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::warn;

use crate::application::mode_manager::ConsentPrompt;

/// Returns `true` for an affirmative answer (`y`, `yes`, any case).
fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Asks the consent question on a line-oriented reader/writer pair.
///
/// Anything other than `y`/`yes`, including end of input or an I/O error,
/// counts as a decline.
pub struct TerminalConsentPrompt<R, W> {
    io: Mutex<(R, W)>,
}

impl TerminalConsentPrompt<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Prompt on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> TerminalConsentPrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }
}

#[async_trait]
impl<R, W> ConsentPrompt for TerminalConsentPrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn request_consent(&self, notice: &str) -> bool {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        let question = format!("\n{notice}\n\nEnable background scanning? [y/N] ");
        if let Err(e) = async {
            writer.write_all(question.as_bytes()).await?;
            writer.flush().await
        }
        .await
        {
            warn!("could not show consent prompt: {e}");
            return false;
        }

        let mut answer = String::new();
        match reader.read_line(&mut answer).await {
            Ok(0) => false,
            Ok(_) => is_yes(&answer),
            Err(e) => {
                warn!("could not read consent answer: {e}");
                false
            }
        }
    }
}

/// A prompt that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedConsent(pub bool);

#[async_trait]
impl ConsentPrompt for FixedConsent {
    async fn request_consent(&self, _notice: &str) -> bool {
        self.0
    }
}
