//! Persistent client identity.
//!
//! A UUIDv4 stored as `.clientid` in the install directory. Generated once
//! on first run; an existing file is used verbatim.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::constants::CLIENT_ID_FILE;
use crate::utils::atomic_write;

/// Read the persisted client id, generating and persisting a fresh one when
/// the file is absent or unreadable.
pub fn load_or_create_client_id(install_path: &Path) -> Result<String> {
    let path = install_path.join(CLIENT_ID_FILE);

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(contents),
        Err(err) => {
            debug!("no usable client id at {} ({err}), generating one", path.display());
            let id = Uuid::new_v4().to_string();
            atomic_write(&path, id.as_bytes())
                .with_context(|| format!("Failed to persist client id: {}", path.display()))?;
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generates_and_persists_on_first_run() {
        let temp = tempdir().unwrap();
        let first = load_or_create_client_id(temp.path()).unwrap();
        assert!(Uuid::parse_str(&first).is_ok());

        // Second call reuses the stored id.
        let second = load_or_create_client_id(temp.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn existing_contents_used_verbatim() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join(CLIENT_ID_FILE), "custom-client-identity").unwrap();
        let id = load_or_create_client_id(temp.path()).unwrap();
        assert_eq!(id, "custom-client-identity");
    }
}
