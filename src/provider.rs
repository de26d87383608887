//! The multi-dimension world provider.
//!
//! A provider owns up to three in-memory worlds (one per dimension), the
//! world settings and the player spawn map, all behind a single
//! reader-writer lock. Saving rewrites each dimension's file wholesale,
//! either synchronously or through a coalescing background worker.

use crate::dimension::Dimension;
use crate::settings::Settings;
use log::{debug, warn};
use pile_format::io::{write_streaming, write_with_compression};
use pile_format::{read, Chunk, CompressionLevel, PileError, Result, World};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// An absolute block position.
pub type BlockPos = (i32, i32, i32);

/// Thread-safe storage for a small multi-dimension world.
///
/// Every accessor takes the shared lock, every mutator the exclusive one.
/// Disk I/O happens while the exclusive lock is held; worlds are small by
/// design, so save latency stays bounded. Callers that cannot block use
/// [`Provider::save_async`].
pub struct Provider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    dir: PathBuf,
    read_only: bool,
    state: RwLock<ProviderState>,
}

struct ProviderState {
    settings: Settings,
    overworld: Option<World>,
    nether: Option<World>,
    end: Option<World>,
    player_spawns: HashMap<Uuid, BlockPos>,
    dirty: bool,
    compression_level: CompressionLevel,
    streaming_saves: bool,
    saver: Option<SaverHandle>,
}

struct SaverHandle {
    requests: SyncSender<()>,
    worker: JoinHandle<()>,
}

impl Provider {
    /// Opens or creates a provider directory with default compression.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref(), CompressionLevel::Default, false)
    }

    pub fn new_with_compression(dir: impl AsRef<Path>, level: CompressionLevel) -> Result<Self> {
        Self::open(dir.as_ref(), level, false)
    }

    /// Opens an existing directory without ever writing to it. Mutators on
    /// the returned provider succeed but change nothing.
    pub fn new_read_only(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref(), CompressionLevel::Default, true)
    }

    fn open(dir: &Path, level: CompressionLevel, read_only: bool) -> Result<Self> {
        if !read_only {
            fs::create_dir_all(dir)?;
        }

        let inner = Arc::new(ProviderInner {
            dir: dir.to_path_buf(),
            read_only,
            state: RwLock::new(ProviderState {
                settings: Settings::default(),
                overworld: None,
                nether: None,
                end: None,
                player_spawns: HashMap::new(),
                dirty: false,
                compression_level: level,
                streaming_saves: false,
                saver: None,
            }),
        });

        let provider = Provider { inner };
        provider.load()?;
        Ok(provider)
    }

    /// Loads every dimension file that exists. A missing file is fine; a
    /// present file that fails to decode fails the whole construction.
    fn load(&self) -> Result<()> {
        let mut state = self.inner.write_state();
        for dim in Dimension::ALL {
            let path = self.inner.dir.join(dim.file_name());
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };

            let mut world = read(BufReader::new(file))?;
            if self.inner.read_only {
                world.set_read_only(true);
            }
            debug!(
                "loaded {} with {} chunks",
                dim.file_name(),
                world.chunk_count()
            );
            *state.world_slot(dim) = Some(world);
        }

        if let Some(overworld) = &state.overworld {
            if let Some(settings) = Settings::from_user_data(&overworld.user_data) {
                state.settings = settings;
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        self.inner.read_state().settings.clone()
    }

    pub fn save_settings(&self, settings: Settings) {
        if self.inner.read_only {
            return;
        }
        let mut state = self.inner.write_state();
        state.settings = settings;
        state.dirty = true;
    }

    /// Installs a chunk into a dimension, creating that dimension's world on
    /// first use.
    pub fn store_column(&self, dim: Dimension, chunk: Chunk) -> Result<()> {
        if self.inner.read_only {
            return Ok(());
        }
        let mut state = self.inner.write_state();
        let world = state.world_slot(dim).get_or_insert_with(|| {
            let (min, max) = dim.section_range();
            World::new(min, max)
        });
        world.set_chunk(chunk);
        state.dirty = true;
        Ok(())
    }

    /// Fetches a copy of a stored chunk, or [`PileError::NotFound`].
    pub fn load_column(&self, dim: Dimension, x: i32, z: i32) -> Result<Chunk> {
        self.inner
            .read_state()
            .world(dim)
            .and_then(|world| world.chunk(x, z))
            .cloned()
            .ok_or(PileError::NotFound)
    }

    pub fn load_player_spawn_position(&self, id: Uuid) -> Option<BlockPos> {
        self.inner.read_state().player_spawns.get(&id).copied()
    }

    pub fn save_player_spawn_position(&self, id: Uuid, pos: BlockPos) {
        if self.inner.read_only {
            return;
        }
        let mut state = self.inner.write_state();
        state.player_spawns.insert(id, pos);
        state.dirty = true;
    }

    /// World-level user data of a dimension, if that dimension exists.
    pub fn get_user_data(&self, dim: Dimension) -> Option<Vec<u8>> {
        self.inner
            .read_state()
            .world(dim)
            .map(|world| world.user_data.clone())
    }

    pub fn set_user_data(&self, dim: Dimension, data: Vec<u8>) {
        if self.inner.read_only {
            return;
        }
        let mut state = self.inner.write_state();
        let world = state.world_slot(dim).get_or_insert_with(|| {
            let (min, max) = dim.section_range();
            World::new(min, max)
        });
        world.user_data = data;
        state.dirty = true;
    }

    pub fn set_compression_level(&self, level: CompressionLevel) {
        if self.inner.read_only {
            return;
        }
        self.inner.write_state().compression_level = level;
    }

    /// Switches future saves between the buffered and the chunk-by-chunk
    /// write path.
    pub fn set_streaming_saves(&self, enabled: bool) {
        if self.inner.read_only {
            return;
        }
        self.inner.write_state().streaming_saves = enabled;
    }

    pub fn chunk_count(&self) -> usize {
        let state = self.inner.read_state();
        Dimension::ALL
            .iter()
            .filter_map(|dim| state.world(*dim))
            .map(World::chunk_count)
            .sum()
    }

    pub fn dimension_chunk_count(&self, dim: Dimension) -> usize {
        self.inner
            .read_state()
            .world(dim)
            .map_or(0, World::chunk_count)
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.read_state().dirty
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    /// Writes every present dimension to disk and clears the dirty state.
    /// On failure the in-memory state is left untouched so the call can be
    /// retried.
    pub fn save(&self) -> Result<()> {
        let mut state = self.inner.write_state();
        self.inner.save_locked(&mut state)
    }

    /// Stops the background saver, then saves once if anything is dirty.
    pub fn close(&self) -> Result<()> {
        self.disable_background_saves();
        let mut state = self.inner.write_state();
        if state.dirty {
            self.inner.save_locked(&mut state)
        } else {
            Ok(())
        }
    }

    /// Spawns the background save worker. Subsequent calls are no-ops while
    /// it is running.
    pub fn enable_background_saves(&self) {
        if self.inner.read_only {
            return;
        }
        let mut state = self.inner.write_state();
        if state.saver.is_some() {
            return;
        }

        // Capacity 1 makes coalescing intrinsic: a request against a full
        // channel is simply dropped.
        let (requests, receiver) = sync_channel(1);
        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name("pile-background-saver".to_string())
            .spawn(move || run_saver(inner, receiver));
        match spawned {
            Ok(worker) => state.saver = Some(SaverHandle { requests, worker }),
            Err(err) => warn!("could not start background saver: {}", err),
        }
    }

    /// Stops the background save worker and waits for it to finish. Pending
    /// requests are still honored before it exits.
    pub fn disable_background_saves(&self) {
        let saver = self.inner.write_state().saver.take();
        if let Some(SaverHandle { requests, worker }) = saver {
            // Dropping the sender closes the channel; the worker drains what
            // is queued and returns. Join outside the lock or the worker
            // could never acquire it for its final save.
            drop(requests);
            if worker.join().is_err() {
                warn!("background saver exited abnormally");
            }
        }
    }

    /// Requests a save from the background worker and returns immediately.
    /// A no-op when the worker is not running; requests arriving while one
    /// is already queued coalesce into a single save.
    pub fn save_async(&self) {
        let requests = self
            .inner
            .read_state()
            .saver
            .as_ref()
            .map(|saver| saver.requests.clone());
        if let Some(requests) = requests {
            let _ = requests.try_send(());
        }
    }
}

impl ProviderInner {
    fn read_state(&self) -> RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saves every present dimension. Must be called with the exclusive lock
    /// held; the caller keeps it for the duration of the disk write.
    fn save_locked(&self, state: &mut ProviderState) -> Result<()> {
        if self.read_only {
            return Ok(());
        }

        // Settings travel inside the overworld's user data.
        let settings_blob = state.settings.to_user_data();
        if let Some(overworld) = state.overworld.as_mut() {
            overworld.user_data = settings_blob;
        }

        let level = state.compression_level;
        let streaming = state.streaming_saves;
        for dim in Dimension::ALL {
            let Some(world) = state.world_slot(dim).as_mut() else {
                continue;
            };

            let path = self.dir.join(dim.file_name());
            let file = File::create(&path)?;
            let mut out = BufWriter::new(file);
            if streaming {
                write_streaming(&mut out, world, level)?;
            } else {
                write_with_compression(&mut out, world, level)?;
            }
            out.flush()?;
            drop(out);

            world.clear_dirty();
            debug!("saved {}", dim.file_name());
        }

        state.dirty = false;
        Ok(())
    }
}

impl ProviderState {
    fn world(&self, dim: Dimension) -> Option<&World> {
        match dim {
            Dimension::Overworld => self.overworld.as_ref(),
            Dimension::Nether => self.nether.as_ref(),
            Dimension::End => self.end.as_ref(),
        }
    }

    fn world_slot(&mut self, dim: Dimension) -> &mut Option<World> {
        match dim {
            Dimension::Overworld => &mut self.overworld,
            Dimension::Nether => &mut self.nether,
            Dimension::End => &mut self.end,
        }
    }
}

/// Body of the background save worker: sleep on the request channel, drain
/// any queued requests, save once. Errors are logged and swallowed; callers
/// that need durability use [`Provider::save`].
fn run_saver(inner: Arc<ProviderInner>, receiver: Receiver<()>) {
    while receiver.recv().is_ok() {
        while receiver.try_recv().is_ok() {}
        let mut state = inner.write_state();
        if let Err(err) = inner.save_locked(&mut state) {
            warn!("background save failed: {}", err);
        }
    }
}
