use dirs_next::config_dir;
use std::env;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Environment variable overriding where the secret is persisted.
pub const GATE_DIR_ENV: &str = "NANOSTAB_GATE_DIR";

const SECRET_FILE: &str = "app_password";

/// Persistence for the single remembered secret.
pub trait SecretStore {
    fn load(&self) -> io::Result<Option<String>>;
    fn save(&mut self, secret: &str) -> io::Result<()>;
    fn clear(&mut self) -> io::Result<()>;
}

/// Default directory: `$NANOSTAB_GATE_DIR`, else `<config dir>/nanostab`.
pub fn default_gate_dir() -> io::Result<PathBuf> {
    if let Ok(dir) = env::var(GATE_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let base = config_dir().ok_or_else(|| {
        io::Error::new(ErrorKind::NotFound, "unable to locate config directory")
    })?;
    Ok(base.join("nanostab"))
}

/// Stores the secret as a plain file inside a directory.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> io::Result<Self> {
        Ok(Self::new(default_gate_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn secret_path(&self) -> PathBuf {
        self.dir.join(SECRET_FILE)
    }
}

impl SecretStore for FileSecretStore {
    /// Bytes that are not UTF-8 load lossily, so they never match and the
    /// gate discards them.
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read(self.secret_path()) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save(&mut self, secret: &str) -> io::Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        fs::write(self.secret_path(), secret)
    }

    fn clear(&mut self) -> io::Result<()> {
        match fs::remove_file(self.secret_path()) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// In-process store; forgets everything when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    secret: Option<String>,
}

impl MemorySecretStore {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.secret.clone())
    }

    fn save(&mut self, secret: &str) -> io::Result<()> {
        self.secret = Some(secret.to_string());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.secret = None;
        Ok(())
    }
}
