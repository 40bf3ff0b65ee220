use anyhow::{Result, bail};
use std::path::PathBuf;

/// Settings for the lifecycle handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Path to the sops executable.
    pub sops_binary: PathBuf,
    /// Fail Create/Update when fetching, decrypting or writing the secret
    /// fails, instead of logging and reporting success.
    pub fail_on_sync_error: bool,
}

impl HandlerConfig {
    /// Fails when `sops_binary` names an explicit path that does not exist.
    /// A bare name is left to `PATH` lookup at spawn time.
    pub fn check_sops_binary(&self) -> Result<()> {
        let explicit = self.sops_binary.components().count() > 1;
        if explicit && !self.sops_binary.is_file() {
            bail!("sops binary not found at {}", self.sops_binary.display());
        }
        Ok(())
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            sops_binary: default_sops_binary(),
            fail_on_sync_error: false,
        }
    }
}

/// `sops` shipped next to the running executable, as in a Lambda bundle,
/// falling back to whatever `sops` is on `PATH`.
pub fn default_sops_binary() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("sops")))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from("sops"))
}
