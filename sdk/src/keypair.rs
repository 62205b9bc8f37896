//! Keypair loading utilities

use crate::error::{OpsError, Result};
use anchor_client::solana_sdk::signature::Keypair;
use std::fs;
use std::path::Path;

/// Load a keypair from a file holding a JSON array of key bytes
///
/// # Arguments
/// * `keypair_path` - Path to the key file (Solana CLI format)
///
/// # Returns
/// * `Ok(Keypair)` - The loaded keypair
/// * `Err(OpsError::Config)` - If the file is absent or unreadable
/// * `Err(OpsError::Keypair)` - If the content is not a valid key
pub fn load_keypair(keypair_path: &Path) -> Result<Keypair> {
    let display = keypair_path.display().to_string();

    let contents = fs::read_to_string(keypair_path).map_err(|e| {
        OpsError::Config(format!("Cannot read signer key file {display}: {e}"))
    })?;

    keypair_from_json(&contents).map_err(|reason| OpsError::Keypair {
        path: display,
        reason,
    })
}

/// Parse a JSON byte array into a keypair
///
/// # Errors
/// Returns a description of why the content is not a valid key
pub fn keypair_from_json(contents: &str) -> std::result::Result<Keypair, String> {
    let bytes: Vec<u8> = serde_json::from_str(contents.trim())
        .map_err(|e| format!("expected a JSON array of bytes: {e}"))?;

    if bytes.len() != 64 {
        return Err(format!("expected 64 key bytes, found {}", bytes.len()));
    }

    Keypair::try_from(bytes.as_slice()).map_err(|e| format!("invalid key bytes: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_client::solana_sdk::signature::Signer;
    use tempfile::tempdir;

    fn write_keypair(path: &Path, keypair: &Keypair) {
        let keypair_json = format!(
            "[{}]",
            keypair
                .to_bytes()
                .iter()
                .map(std::string::ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        );
        fs::write(path, keypair_json).unwrap();
    }

    #[test]
    fn test_load_keypair_from_file() {
        let dir = tempdir().unwrap();
        let keypair_path = dir.path().join("admin.json");

        let keypair = Keypair::new();
        write_keypair(&keypair_path, &keypair);

        let loaded = load_keypair(&keypair_path).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_load_nonexistent_keypair() {
        let err = load_keypair(Path::new("/nonexistent/path.json")).unwrap_err();
        assert!(matches!(err, OpsError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/path.json"));
    }

    #[test]
    fn test_load_malformed_keypair() {
        let dir = tempdir().unwrap();
        let keypair_path = dir.path().join("broken.json");
        fs::write(&keypair_path, "{\"secret\": \"nope\"}").unwrap();

        let err = load_keypair(&keypair_path).unwrap_err();
        assert!(matches!(err, OpsError::Keypair { .. }));
        assert!(err.to_string().contains("Failed to load keypair"));
    }

    #[test]
    fn test_short_byte_array_rejected() {
        let err = keypair_from_json("[1, 2, 3]").unwrap_err();
        assert!(err.contains("64"));
    }
}
