//! Keypair loading
//!
//! Keypairs are JSON byte arrays, as written by `solana-keygen`. Files that
//! are readable by group or others are refused.

use std::path::Path;

use solana_sdk::signature::Keypair;
use tracing::debug;

use crate::error::{Error, Result};

/// Load a keypair file, checking its permissions first
pub fn load_keypair<P: AsRef<Path>>(path: P) -> Result<Keypair> {
    let path = path.as_ref();
    debug!("Loading keypair from: {:?}", path);

    check_permissions(path)?;

    let keypair_bytes = std::fs::read(path).map_err(|e| {
        Error::InvalidKeypair(format!("Failed to read keypair {}: {}", path.display(), e))
    })?;

    let keypair_json: Vec<u8> = serde_json::from_slice(&keypair_bytes).map_err(|e| {
        Error::InvalidKeypair(format!(
            "Failed to parse keypair JSON {}: {}",
            path.display(),
            e
        ))
    })?;

    Keypair::from_bytes(&keypair_json).map_err(|e| {
        Error::InvalidKeypair(format!("Invalid keypair bytes {}: {}", path.display(), e))
    })
}

/// Load the keypair named by an environment variable
pub fn load_keypair_from_env(var: &str) -> Result<Keypair> {
    let path = std::env::var(var).map_err(|_| Error::MissingEnvVar(var.to_string()))?;
    load_keypair(path)
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(Error::InsecureKeypair(format!(
                "Keypair {} has insecure permissions {:o}. Run 'chmod 600 {}'",
                path.display(),
                mode & 0o777,
                path.display()
            )));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;
    use tempfile::tempdir;

    fn write_keypair(path: &Path, keypair: &Keypair) {
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        std::fs::write(path, json).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }
    }

    #[test]
    fn test_load_keypair() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keypair.json");
        let keypair = Keypair::new();
        write_keypair(&path, &keypair);

        let loaded = load_keypair(&path).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[cfg(unix)]
    #[test]
    fn test_world_readable_keypair_is_refused() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("keypair.json");
        write_keypair(&path, &Keypair::new());
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(matches!(
            load_keypair(&path),
            Err(Error::InsecureKeypair(_))
        ));
    }

    #[test]
    fn test_garbage_keypair_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keypair.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }

        assert!(matches!(
            load_keypair(&path),
            Err(Error::InvalidKeypair(_))
        ));
    }

    #[test]
    fn test_missing_env_var() {
        assert!(matches!(
            load_keypair_from_env("HWALLET_TEST_UNSET_KEYPAIR_VAR"),
            Err(Error::MissingEnvVar(_))
        ));
    }
}
