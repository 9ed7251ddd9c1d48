//! File-backed credential storage.
//!
//! The token pair lives in a human-readable JSON file. Writers hold a
//! process-local mutex and an OS advisory lock on a sidecar sentinel file,
//! in that order, so writes are totally ordered both within one process and
//! across processes (the server and the CLI share the same file). Readers
//! take no lock; they only wait on the refresh gate so an in-flight renewal
//! is never observed half-done.

use crate::error::{VaultError, VaultResult};
use crate::gate::RefreshGate;
use cinegate_core::TokenPair;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const TOKEN_FILE: &str = "tokens.json";
const LOCK_FILE: &str = "tokens.json.lock";

/// How often a blocked writer re-attempts the advisory lock.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Advisory-lock acquisition behavior.
#[derive(Clone, Copy, Debug)]
pub struct LockOptions {
    /// Give up after this long when the lock is contended.
    pub timeout: Duration,
    /// Fail immediately on contention instead of waiting.
    pub nonblocking: bool,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            nonblocking: false,
        }
    }
}

/// The credential store shared by the gateway, the refresher and the CLI.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    token_path: PathBuf,
    lock_path: PathBuf,
    lock: LockOptions,
    gate: Arc<RefreshGate>,
    /// Process-local write ordering; taken before the file lock.
    write_mutex: Mutex<()>,
}

impl CredentialStore {
    pub fn new(data_dir: impl AsRef<Path>, lock: LockOptions, gate: Arc<RefreshGate>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            inner: Arc::new(StoreInner {
                token_path: data_dir.join(TOKEN_FILE),
                lock_path: data_dir.join(LOCK_FILE),
                lock,
                gate,
                write_mutex: Mutex::new(()),
            }),
        }
    }

    pub fn from_config(cfg: &cinegate_core::config::VaultConfig, gate: Arc<RefreshGate>) -> Self {
        Self::new(
            &cfg.data_dir,
            LockOptions {
                timeout: cfg.lock_timeout(),
                nonblocking: cfg.lock_nonblocking,
            },
            gate,
        )
    }

    /// Path of the backing token file.
    pub fn token_path(&self) -> &Path {
        &self.inner.token_path
    }

    /// Read the current pair, waiting (bounded) for any in-flight refresh
    /// first. Returns the zero value when no backing file exists yet.
    pub async fn read(&self) -> VaultResult<TokenPair> {
        self.inner.gate.wait_idle().await;
        self.inner.read_file()
    }

    /// Read without consulting the refresh gate. Used by the refresher
    /// itself, which would otherwise deadlock against its own gate.
    pub fn read_for_refresh(&self) -> VaultResult<TokenPair> {
        self.inner.read_file()
    }

    /// Full replace of the pair, stamped with the current time.
    pub async fn write(&self, refresh_token: &str, access_token: &str) -> VaultResult<()> {
        let inner = self.inner.clone();
        let pair = TokenPair::new(refresh_token, access_token);
        tokio::task::spawn_blocking(move || inner.locked(|inner| inner.write_file(&pair))).await?
    }

    /// Read-modify-write merge: empty fields keep their previous value.
    pub async fn update(&self, refresh_token: &str, access_token: &str) -> VaultResult<()> {
        let inner = self.inner.clone();
        let refresh_token = refresh_token.to_string();
        let access_token = access_token.to_string();
        tokio::task::spawn_blocking(move || {
            inner.locked(|inner| {
                let mut pair = inner.read_file()?;
                pair.merge(&refresh_token, &access_token);
                inner.write_file(&pair)
            })
        })
        .await?
    }

    /// Whether the stored pair is usable against the given age threshold.
    pub async fn is_valid(&self, max_age: Duration) -> VaultResult<bool> {
        Ok(self.read().await?.is_valid(max_age))
    }
}

impl StoreInner {
    /// Run `f` under the process mutex and the advisory file lock. Both are
    /// released on every exit path (mutex by scope, file lock by RAII).
    fn locked<T>(&self, f: impl FnOnce(&Self) -> VaultResult<T>) -> VaultResult<T> {
        let _process_guard = self
            .write_mutex
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _file_guard = self.acquire_file_lock()?;
        f(self)
    }

    fn acquire_file_lock(&self) -> VaultResult<LockedFile> {
        self.ensure_data_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;

        if self.lock.nonblocking {
            return match file.try_lock_exclusive() {
                Ok(()) => Ok(LockedFile(file)),
                Err(e) if is_contended(&e) => Err(VaultError::LockBusy),
                Err(e) => Err(e.into()),
            };
        }

        let deadline = Instant::now() + self.lock.timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(LockedFile(file)),
                Err(e) if is_contended(&e) => {
                    if Instant::now() >= deadline {
                        return Err(VaultError::LockTimeout(self.lock.timeout));
                    }
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn ensure_data_dir(&self) -> std::io::Result<()> {
        if let Some(dir) = self.token_path.parent() {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    fn read_file(&self) -> VaultResult<TokenPair> {
        if !self.token_path.exists() {
            return Ok(TokenPair::default());
        }
        let data = fs::read(&self.token_path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn write_file(&self, pair: &TokenPair) -> VaultResult<()> {
        self.ensure_data_dir()?;
        let json = serde_json::to_vec_pretty(pair)?;
        fs::write(&self.token_path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.token_path, fs::Permissions::from_mode(0o644))?;
        }
        Ok(())
    }
}

/// Unlocks and closes the sentinel file on drop.
struct LockedFile(File);

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.0) {
            tracing::warn!(error = %e, "failed to release credential file lock");
        }
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
