use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::services::Decryptor;

/// Decrypts documents by piping them through the `sops` CLI.
///
/// The ciphertext goes in on stdin and sops is asked for JSON output, so any
/// input type sops understands ends up as a [`Value`].
pub struct SopsDecryptor {
    binary: PathBuf,
}

impl SopsDecryptor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// Arguments passed to sops for one decryption.
pub fn sops_args(input_type: &str, kms_key: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-d".to_string(),
        "--input-type".to_string(),
        input_type.to_string(),
        "--output-type".to_string(),
        "json".to_string(),
    ];
    if let Some(key) = kms_key {
        args.push("--kms".to_string());
        args.push(key.to_string());
    }
    args.push("/dev/stdin".to_string());
    args
}

#[async_trait::async_trait]
impl Decryptor for SopsDecryptor {
    #[tracing::instrument(
        skip(self, data),
        fields(binary = %self.binary.display(), bytes = data.len())
    )]
    async fn decrypt(
        &self,
        data: &[u8],
        input_type: &str,
        kms_key: Option<&str>,
    ) -> Result<Value> {
        let args = sops_args(input_type, kms_key);
        trace!(?args, "Spawning sops");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.binary.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(data).await {
                Ok(()) => {}
                // sops exited without reading all of stdin; its status and
                // stderr below say why.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(error = %e, "sops closed stdin early");
                }
                Err(e) => return Err(e).context("failed to write ciphertext to sops"),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .context("failed waiting for sops")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("sops exited with {}: {}", output.status, stderr.trim());
        }

        debug!(bytes = output.stdout.len(), "sops decryption finished");
        serde_json::from_slice(&output.stdout)
            .context("sops output is not valid JSON")
    }
}
