//! Console collaborators: interactive permission prompt and outcome output.

use async_trait::async_trait;
use diagpack_exporter::permission::StoragePermissionGate;
use diagpack_exporter::{ExportOutcome, OutcomeSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Asks on the terminal before writing to shared storage.
pub struct PromptGate {
    required: bool,
    assume_yes: bool,
}

impl PromptGate {
    pub fn new(required: bool, assume_yes: bool) -> Self {
        Self {
            required,
            assume_yes,
        }
    }
}

#[async_trait]
impl StoragePermissionGate for PromptGate {
    fn is_required(&self) -> bool {
        self.required
    }

    async fn request(&self) -> bool {
        if self.assume_yes {
            return true;
        }

        eprint!("Allow writing the diagnostic bundle to shared storage? [y/N] ");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(_) => is_yes(&line),
            Err(e) => {
                warn!("Could not read answer: {}", e);
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Prints outcomes; successes go to stdout with the share details.
pub struct ConsoleSink {
    app_id: String,
}

impl ConsoleSink {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }
}

impl OutcomeSink for ConsoleSink {
    fn present(&self, outcome: &ExportOutcome) {
        match outcome {
            ExportOutcome::Saved { share, .. } => {
                println!("{}", outcome.message());
                println!(
                    "Share: {} ({})",
                    share.content_locator(&self.app_id),
                    share.mime_type()
                );
                println!("SHA256: {}", share.sha256);
            }
            ExportOutcome::Failed { reason } => {
                eprintln!("{} ({})", outcome.message(), reason);
            }
            ExportOutcome::PermissionDenied | ExportOutcome::Busy => {
                eprintln!("{}", outcome.message());
            }
        }
    }
}
