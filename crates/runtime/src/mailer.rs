//! Outbound care reminders.
//!
//! The transport is an external program (historically a small script wrapping
//! a mail API) that receives the reminder as command-line flags.  Without one
//! configured, reminders are only logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use plantcare_config::AppConfig;
use plantcare_core::Plant;
use plantcare_scheduler::CareNeeds;

/// Stderr kept on a failed send, in bytes.
const MAX_STDERR: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareReminder {
    pub recipient: String,
    pub plant_name: String,
    pub username: String,
    pub needs_fertilizer: bool,
    pub needs_water: bool,
}

impl CareReminder {
    pub fn for_plant(plant: &Plant, needs: CareNeeds) -> Self {
        Self {
            recipient: plant.owner.email.clone(),
            plant_name: plant.care.name.clone(),
            username: plant.owner.username.clone(),
            needs_fertilizer: needs.needs_fertilize,
            needs_water: needs.needs_water,
        }
    }

    pub fn subject(&self) -> String {
        format!("{} needs some care!", self.plant_name)
    }

    /// e.g. `Time to fertilize and water Fern`.
    pub fn body(&self) -> String {
        let mut body = String::from("Time to ");
        if self.needs_fertilizer {
            body.push_str("fertilize");
        }
        if self.needs_water {
            if self.needs_fertilizer {
                body.push_str(" and ");
            }
            body.push_str("water");
        }
        body.push(' ');
        body.push_str(&self.plant_name);
        body
    }

    /// Flags handed to the external sender.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--recipient".to_string(),
            self.recipient.clone(),
            "--plant-name".to_string(),
            self.plant_name.clone(),
            "--username".to_string(),
            self.username.clone(),
        ];
        if self.needs_fertilizer {
            args.push("--needs-fertilizer".to_string());
        }
        if self.needs_water {
            args.push("--needs-water".to_string());
        }
        args
    }
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("reminder to {recipient} suppressed: debug recipient is {debug_recipient}")]
    Suppressed {
        recipient: String,
        debug_recipient: String,
    },
    #[error("failed to start mail sender {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("mail sender timed out after {0}s")]
    TimedOut(u64),
    #[error("mail sender exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

#[async_trait]
pub trait CareMailer: Send + Sync {
    /// Deliver one reminder.  `Ok` means the transport accepted it.
    async fn send(&self, reminder: &CareReminder) -> Result<(), MailError>;
}

/// Runs `program [args..] --recipient .. --plant-name .. --username ..
/// [--needs-fertilizer] [--needs-water]` and waits for it to exit.
#[derive(Debug, Clone)]
pub struct CommandMailer {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandMailer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl CareMailer for CommandMailer {
    async fn send(&self, reminder: &CareReminder) -> Result<(), MailError> {
        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.program)
                .args(&self.args)
                .args(reminder.to_args())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| MailError::TimedOut(self.timeout.as_secs()))?
        .map_err(|source| MailError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = match stderr.char_indices().nth(MAX_STDERR) {
                Some((end, _)) => format!("{}…", &stderr[..end]),
                None => stderr.trim_end().to_string(),
            };
            return Err(MailError::Failed {
                code: output.status.code(),
                stderr,
            });
        }

        debug!(
            recipient = %reminder.recipient,
            stdout = %String::from_utf8_lossy(&output.stdout).trim_end(),
            "mail sender finished"
        );
        Ok(())
    }
}

/// Logs reminders instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl CareMailer for LogMailer {
    async fn send(&self, reminder: &CareReminder) -> Result<(), MailError> {
        info!(
            recipient = %reminder.recipient,
            username = %reminder.username,
            subject = %reminder.subject(),
            body = %reminder.body(),
            "care reminder (not sent: no mail command configured)"
        );
        Ok(())
    }
}

/// Passes through only reminders addressed to the debug recipient.
pub struct DebugOnly {
    inner: Arc<dyn CareMailer>,
    recipient: String,
}

impl DebugOnly {
    pub fn new(inner: Arc<dyn CareMailer>, recipient: impl Into<String>) -> Self {
        Self {
            inner,
            recipient: recipient.into(),
        }
    }
}

#[async_trait]
impl CareMailer for DebugOnly {
    async fn send(&self, reminder: &CareReminder) -> Result<(), MailError> {
        if reminder.recipient != self.recipient {
            warn!(
                recipient = %reminder.recipient,
                debug_recipient = %self.recipient,
                "debug recipient does not match, not sending"
            );
            return Err(MailError::Suppressed {
                recipient: reminder.recipient.clone(),
                debug_recipient: self.recipient.clone(),
            });
        }
        self.inner.send(reminder).await
    }
}

/// The mailer described by `config`: the external command when one is set,
/// the log-only mailer otherwise, behind the debug filter when configured.
pub fn mailer_from_config(config: &AppConfig) -> Arc<dyn CareMailer> {
    let command = config.email.command.trim();
    let base: Arc<dyn CareMailer> = if command.is_empty() {
        Arc::new(LogMailer)
    } else {
        Arc::new(CommandMailer::new(
            command,
            config.email.args.clone(),
            Duration::from_secs(config.email.timeout_secs.max(1)),
        ))
    };
    match config.debug_recipient() {
        Some(recipient) => Arc::new(DebugOnly::new(base, recipient)),
        None => base,
    }
}
