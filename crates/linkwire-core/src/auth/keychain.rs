use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "linkwire";

/// OAuth client secret kept in the OS keychain, keyed by client id.
pub struct ClientSecretStore;

impl ClientSecretStore {
    /// Store the client secret for a client id in the OS keychain
    pub fn store(client_id: &str, secret: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, client_id)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(secret)
            .context("Failed to store client secret in keychain")?;
        Ok(())
    }

    /// Retrieve the client secret for a client id
    pub fn get(client_id: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, client_id)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve client secret from keychain")
    }

    /// Remove the client secret for a client id from the OS keychain
    pub fn delete(client_id: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, client_id)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete client secret from keychain")?;
        Ok(())
    }
}
