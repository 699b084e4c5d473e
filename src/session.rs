//! Session store: the bearer token and the identity claims decoded from it.
//!
//! The token is the only client state that outlives the process. Claims are
//! never cached; they are decoded from the held token whenever identity is
//! needed.

use crate::error::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Identity claims carried in the token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry, epoch seconds.
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Decode the payload segment of a JWT. The signature is not checked;
    /// the backend verifies tokens on every request.
    pub fn decode(token: &str) -> Result<Self> {
        let mut parts = token.trim().split('.');
        let payload = match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
            _ => return Err(Error::InvalidToken("expected three dot-separated segments".into())),
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidToken(format!("payload is not base64url: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidToken(format!("payload is not a claims object: {e}")))
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .or(self.sub.as_deref())
            .unwrap_or("unknown user")
    }
}

/// Persistent slot for the bearer token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Token kept in a single file, readable only by the owner.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_private_dir(parent)?;
            }
        }
        // Written to a 0600 temp file first, then renamed into place.
        let temp_path = self.path.with_extension("tmp");
        if let Err(e) = write_private(&temp_path, token.as_bytes()) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

fn create_private_dir(path: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    let mut file = options.open(path)?;
    // A leftover temp file keeps its old mode; tighten it before writing.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(FILE_MODE))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

/// In-memory token slot.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock() = None;
        Ok(())
    }
}

/// Process-wide session context. `login` and `logout` are its only
/// mutators; everything needing auth borrows it through an `Arc`.
pub struct SessionStore {
    store: Box<dyn TokenStore>,
    token: RwLock<Option<String>>,
}

impl SessionStore {
    /// Restore the persisted session. A token that no longer decodes is
    /// discarded and the store starts logged out.
    pub fn restore(store: impl TokenStore + 'static) -> Result<Self> {
        let persisted = store.load()?;
        let token = match persisted {
            Some(token) => match Claims::decode(&token) {
                Ok(_) => Some(token),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding persisted token");
                    store.clear()?;
                    None
                }
            },
            None => None,
        };
        Ok(Self {
            store: Box::new(store),
            token: RwLock::new(token),
        })
    }

    /// Adopt `token` if it decodes. On failure the session ends up logged
    /// out and nothing is persisted.
    pub fn login(&self, token: &str) -> Result<Claims> {
        let token = token.trim();
        match Claims::decode(token) {
            Ok(claims) => {
                self.store.save(token)?;
                *self.token.write() = Some(token.to_string());
                tracing::info!(user = claims.display_name(), "logged in");
                Ok(claims)
            }
            Err(e) => {
                self.logout()?;
                Err(e)
            }
        }
    }

    pub fn logout(&self) -> Result<()> {
        *self.token.write() = None;
        self.store.clear()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Token for the `Authorization` header.
    pub fn bearer(&self) -> Result<String> {
        self.token.read().clone().ok_or(Error::NotAuthenticated)
    }

    /// Claims decoded from the current token, if logged in.
    pub fn claims(&self) -> Option<Claims> {
        let token = self.token.read();
        token.as_deref().and_then(|t| Claims::decode(t).ok())
    }
}

#[cfg(test)]
pub(crate) fn test_token(email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"k1"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "email": email, "sub": "user-1", "exp": 1_900_000_000 })
            .to_string(),
    );
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
