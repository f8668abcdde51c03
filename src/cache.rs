//! The `Export`/`Replace` coordinator: the seam between an external
//! in-memory cache and a [`crate::accessor::Accessor`], guarded by a
//! same-process mutex and the [`CrossProcessLock`].

use crate::accessor::Accessor;
use crate::cancel::Context;
use crate::config::{CoordinatorConfig, LockConfig};
use crate::err::Result;
use crate::lock::CrossProcessLock;
use crate::logger;
use crate::timestamp;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::Mutex as AsyncMutex;

/// Serializes the external cache's current state to bytes. Implementors
/// that close over a mutable in-memory cache typically need `&mut self`,
/// which is why this isn't just a plain closure parameter.
pub trait Marshaler: Send {
    fn marshal(&mut self) -> Result<Bytes>;
}

impl<F> Marshaler for F
where
    F: FnMut() -> Result<Bytes> + Send,
{
    fn marshal(&mut self) -> Result<Bytes> {
        self()
    }
}

/// Ingests bytes into the external cache. May be called more than once per
/// `Replace` if earlier attempts observed a torn read.
pub trait Unmarshaler: Send {
    fn unmarshal(&mut self, data: &[u8]) -> Result<()>;
}

impl<F> Unmarshaler for F
where
    F: FnMut(&[u8]) -> Result<()> + Send,
{
    fn unmarshal(&mut self, data: &[u8]) -> Result<()> {
        self(data)
    }
}

struct State {
    bytes_last: Bytes,
    t_sync: Option<SystemTime>,
}

/// Bridges an external in-memory token cache and a storage accessor.
pub struct TokenCache {
    accessor: Box<dyn Accessor>,
    lock: CrossProcessLock,
    ts_path: PathBuf,
    coordinator_config: CoordinatorConfig,
    state: AsyncMutex<State>,
}

fn lockfile_path_for(ts_path: &Path) -> PathBuf {
    let mut os = ts_path.as_os_str().to_owned();
    os.push(".lockfile");
    PathBuf::from(os)
}

impl TokenCache {
    /// Builds a coordinator over `accessor`, using `ts_path` as the
    /// heartbeat file. Creates `ts_path`'s directories and the file itself
    /// (without truncating pre-existing content) if missing.
    pub async fn new(ts_path: impl Into<PathBuf>, accessor: Box<dyn Accessor>) -> Result<Self> {
        Self::with_config(ts_path, accessor, LockConfig::default(), CoordinatorConfig::default()).await
    }

    pub async fn with_config(
        ts_path: impl Into<PathBuf>,
        accessor: Box<dyn Accessor>,
        lock_config: LockConfig,
        coordinator_config: CoordinatorConfig,
    ) -> Result<Self> {
        let ts_path = ts_path.into();
        if let Some(parent) = ts_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        timestamp::ensure_exists(&ts_path).await?;
        let lock = CrossProcessLock::new(lockfile_path_for(&ts_path), lock_config)?;
        Ok(Self {
            accessor,
            lock,
            ts_path,
            coordinator_config,
            state: AsyncMutex::new(State {
                bytes_last: Bytes::new(),
                t_sync: None,
            }),
        })
    }

    pub fn timestamp_path(&self) -> &Path {
        &self.ts_path
    }

    /// Serialize via `marshaler`, write the result through the accessor
    /// under the cross-process lock, and touch the heartbeat file.
    pub async fn export(&self, ctx: &Context, marshaler: &mut dyn Marshaler) -> Result<()> {
        let mut state = self.state.lock().await;

        let bytes = marshaler.marshal()?;

        self.lock.lock(ctx).await?;

        let write_result = self.accessor.write(ctx, bytes.clone()).await;

        if write_result.is_ok() {
            let now = SystemTime::now();
            match timestamp::touch(&self.ts_path, now).await {
                Ok(applied) => state.t_sync = Some(applied),
                Err(e) => logger::global().debug(format!("failed to touch timestamp file: {}", e)),
            }
            state.bytes_last = bytes;
        }

        let unlock_result = self.lock.unlock().await;

        match write_result {
            Err(e) => Err(e),
            Ok(()) => unlock_result,
        }
    }

    /// Ingest the accessor's current bytes via `unmarshaler`, skipping the
    /// accessor read entirely when the heartbeat file's mtime hasn't moved
    /// since the last successful sync.
    pub async fn replace(&self, ctx: &Context, unmarshaler: &mut dyn Unmarshaler) -> Result<()> {
        let mut state = self.state.lock().await;

        let mut read = true;
        if let Ok(m) = timestamp::mtime(&self.ts_path).await {
            if state.t_sync == Some(m) {
                read = false;
            }
        }

        let mut data = state.bytes_last.clone();
        let mut last_err = None;

        for attempt in 0..self.coordinator_config.max_unmarshal_tries {
            if read {
                data = self.accessor.read(ctx).await?;
            }

            match unmarshaler.unmarshal(&data) {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(e) => {
                    last_err = Some(e);
                    let is_final = attempt + 1 == self.coordinator_config.max_unmarshal_tries;
                    if is_final {
                        break;
                    }
                    ctx.sleep(self.coordinator_config.retry_delay).await?;
                }
            }
        }

        if let Some(e) = last_err {
            return Err(e);
        }

        if read {
            state.bytes_last = data;
            if let Ok(m) = timestamp::mtime(&self.ts_path).await {
                state.t_sync = Some(m);
            }
        }

        Ok(())
    }
}
