//! Per-user Drive access through delegated tokens.
//!
//! Token minting is left to an external command so no signing keys are
//! handled here. The command's arguments may contain `{subject}`, replaced
//! by the user's email; its trimmed stdout is the access token.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use gwaudit_core::FetchError;
use gwaudit_google::model::DriveFile;
use gwaudit_google::{ApiFetcher, DriveApi, GoogleClient};
use tokio::process::Command;

use crate::source::{DelegatedTokens, UserFilesSource};

const SUBJECT: &str = "{subject}";

/// Tokens printed by an external command, one invocation per user.
#[derive(Debug, Clone)]
pub struct CommandTokens {
    argv: Arc<[String]>,
}

impl CommandTokens {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.first().is_none_or(|p| p.trim().is_empty()) {
            bail!("Delegated token command is empty");
        }
        Ok(Self { argv: argv.into() })
    }

    fn args_for(&self, subject: &str) -> Vec<String> {
        self.argv[1..]
            .iter()
            .map(|a| a.replace(SUBJECT, subject))
            .collect()
    }
}

impl DelegatedTokens for CommandTokens {
    fn token_for(&self, subject: &str) -> impl Future<Output = Result<String, FetchError>> + Send {
        let program = self.argv[0].clone();
        let args = self.args_for(subject);
        let subject = subject.to_string();
        async move {
            let out = Command::new(&program)
                .args(&args)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| FetchError::Fatal(format!("cannot run {program}: {e}")))?;
            if !out.status.success() {
                let stderr = String::from_utf8_lossy(&out.stderr);
                return Err(FetchError::Fatal(format!(
                    "token command failed for {subject} ({}): {}",
                    out.status,
                    stderr.trim()
                )));
            }
            let token = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if token.is_empty() {
                return Err(FetchError::Fatal(format!(
                    "token command printed no token for {subject}"
                )));
            }
            Ok(token)
        }
    }
}

/// Drive file search run as each user in turn.
#[derive(Debug, Clone)]
pub struct DelegatedDrive<T> {
    tokens: T,
    timeout: Duration,
    fetcher: ApiFetcher,
}

impl<T: DelegatedTokens> DelegatedDrive<T> {
    pub fn new(tokens: T, timeout: Duration, fetcher: ApiFetcher) -> Self {
        Self {
            tokens,
            timeout,
            fetcher,
        }
    }
}

impl<T: DelegatedTokens> UserFilesSource for DelegatedDrive<T> {
    fn user_files(
        &self,
        user_email: &str,
        query: &str,
    ) -> impl Future<Output = Result<Vec<DriveFile>, FetchError>> + Send {
        let this = self.clone();
        let user_email = user_email.to_string();
        let query = query.to_string();
        async move {
            let token = this.tokens.token_for(&user_email).await?;
            let client = GoogleClient::new(&token, this.timeout)
                .map_err(|e| FetchError::Fatal(e.to_string()))?;
            DriveApi::new(client, this.fetcher.clone())
                .files(&query, &user_email)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_command_rejected() {
        assert!(CommandTokens::new(Vec::new()).is_err());
        assert!(CommandTokens::new(argv(&[" "])).is_err());
    }

    #[test]
    fn subject_substituted_in_every_argument() {
        let tokens =
            CommandTokens::new(argv(&["mint", "--subject={subject}", "{subject}", "-q"])).unwrap();
        assert_eq!(
            tokens.args_for("ada@example.com"),
            argv(&["--subject=ada@example.com", "ada@example.com", "-q"])
        );
    }

    #[tokio::test]
    async fn token_is_trimmed_stdout() {
        let tokens = CommandTokens::new(argv(&["echo", "ya29.{subject}"])).unwrap();
        let token = tokens.token_for("ada@example.com").await.unwrap();
        assert_eq!(token, "ya29.ada@example.com");
    }

    #[tokio::test]
    async fn failing_command_is_fatal() {
        let tokens = CommandTokens::new(argv(&["false"])).unwrap();
        let err = tokens.token_for("ada@example.com").await.unwrap_err();
        assert!(err.to_string().contains("ada@example.com"));

        let missing = CommandTokens::new(argv(&["gwaudit-no-such-binary-42"])).unwrap();
        assert!(missing.token_for("a@x").await.is_err());
    }
}
