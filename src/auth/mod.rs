//! Authentication module (encrypted file-based credential storage)
//!
//! The portal credential carries a password and device fingerprints, so
//! it never touches plain-text config. It is stored AES-256-GCM encrypted
//! in ~/.config/satchel/credentials.enc with a key derived from
//! machine-specific identifiers, making the file useless when copied off
//! the machine.

pub mod sso;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::models::Credential;
use crate::paths;

const NONCE_SIZE: usize = 12;

/// Encrypted store holding the single portal credential
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Open the store at the default path (~/.config/satchel/credentials.enc)
    pub fn open_default() -> Result<Self> {
        Ok(Self {
            path: paths::credentials_path()?,
        })
    }

    /// Open the store at a specific path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the stored credential.
    ///
    /// A missing, truncated or undecryptable file reads as `None`; the
    /// caller then falls back to interactive login instead of failing.
    pub fn load(&self) -> Option<Credential> {
        if !self.path.exists() {
            return None;
        }

        let encrypted = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("unreadable credential file: {err}");
                return None;
            }
        };

        if encrypted.len() < NONCE_SIZE {
            warn!("credential file truncated, ignoring");
            return None;
        }

        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        let cipher = Aes256Gcm::new(&derive_key().into());

        let Ok(plaintext) = cipher.decrypt(nonce, ciphertext) else {
            warn!("credential file does not decrypt on this machine, ignoring");
            return None;
        };

        serde_json::from_slice(&plaintext)
            .map_err(|err| warn!("corrupt credential record: {err}"))
            .ok()
    }

    /// Save the credential, replacing any previous record
    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create credential directory")?;
        }

        let json = serde_json::to_vec(credential).context("Failed to serialize credential")?;

        let cipher = Aes256Gcm::new(&derive_key().into());

        let mut rng = rand::rng();
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rng.fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, json.as_slice())
            .map_err(|_| anyhow::anyhow!("Failed to encrypt credential"))?;

        let mut output = nonce_bytes.to_vec();
        output.extend(ciphertext);

        fs::write(&self.path, output).context("Failed to write credential file")?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// Delete the stored credential, if any
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to remove credential file")?;
        }
        Ok(())
    }
}

/// Get machine ID for key derivation (cross-platform)
fn get_machine_id() -> String {
    // Linux: /etc/machine-id or /var/lib/dbus/machine-id
    #[cfg(target_os = "linux")]
    {
        if let Ok(id) = fs::read_to_string("/etc/machine-id") {
            return id.trim().to_string();
        }
        if let Ok(id) = fs::read_to_string("/var/lib/dbus/machine-id") {
            return id.trim().to_string();
        }
    }

    // macOS: IOPlatformUUID via ioreg
    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("IOPlatformUUID") {
                    if let Some(uuid) = line.split('"').nth(3) {
                        return uuid.to_string();
                    }
                }
            }
        }
    }

    // Windows: MachineGuid from registry
    #[cfg(target_os = "windows")]
    {
        if let Ok(output) = std::process::Command::new("reg")
            .args([
                "query",
                r"HKLM\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if line.contains("MachineGuid") {
                    if let Some(guid) = line.split_whitespace().last() {
                        return guid.to_string();
                    }
                }
            }
        }
    }

    // Fallback: home directory path (always available via dirs crate)
    dirs::home_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "satchel-fallback-key".to_string())
}

/// Derive the encryption key from machine-specific data
fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();

    // Primary: machine-specific ID
    hasher.update(get_machine_id().as_bytes());

    // Secondary: home directory path
    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }

    // Fixed salt for this app
    hasher.update(b"satchel-portal-client-v1");

    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("credentials.enc"));
        assert!(store.load().is_none());

        let cred = Credential::new("alice", "hunter2");
        store.save(&cred).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, cred);
    }

    #[test]
    fn test_file_is_not_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        let store = CredentialStore::at(&path);
        store.save(&Credential::new("alice", "hunter2")).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(!bytes.windows(7).any(|w| w == b"hunter2"));
        assert!(!bytes.windows(5).any(|w| w == b"alice"));
    }

    #[test]
    fn test_corrupt_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.enc");

        fs::write(&path, b"way too short").unwrap();
        assert!(CredentialStore::at(&path).load().is_none());

        fs::write(&path, [0u8; 64]).unwrap();
        assert!(CredentialStore::at(&path).load().is_none());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("credentials.enc"));

        store.save(&Credential::new("alice", "hunter2")).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());

        // Clearing an already-empty store is fine
        store.clear().unwrap();
    }
}
