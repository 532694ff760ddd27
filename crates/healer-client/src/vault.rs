use anyhow::Context;
use healer_core::session::TokenVault;
use keyring::Entry;
use tracing::debug;

const SERVICE: &str = "repo-healer";
const ACCOUNT_PREFIX: &str = "session";

/// Persists the session token in the platform credential store.
pub struct KeyringVault {
    account: String,
}

impl KeyringVault {
    /// One entry per backend, so switching `api_base_url` does not reuse a
    /// token issued by a different server.
    pub fn for_backend(base_url: &str) -> Self {
        Self {
            account: account_key(base_url),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    fn entry(&self) -> anyhow::Result<Entry> {
        Entry::new(SERVICE, &self.account).context("open keyring entry")
    }
}

impl TokenVault for KeyringVault {
    fn load(&self) -> anyhow::Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token)),
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err).context("read token from keyring"),
        }
    }

    fn store(&self, token: &str) -> anyhow::Result<()> {
        self.entry()?
            .set_password(token)
            .context("write token to keyring")?;
        debug!(account = %self.account, "session token stored");
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err).context("delete token from keyring"),
        }
    }
}

pub fn account_key(base_url: &str) -> String {
    format!("{ACCOUNT_PREFIX}:{}", base_url.trim_end_matches('/'))
}
