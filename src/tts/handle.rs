use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::EngineError;
use crate::tts::voice::ensure_artifacts;
use crate::tts::{Synthesizer, VoiceLoader};

/// Lazily loaded voice engine shared by every request.
///
/// The model is read from disk on the first `get_or_init` call and kept for
/// the life of the process. Concurrent first calls are serialized on the
/// write lock so exactly one load happens; later calls only take the read
/// lock. A failed load leaves the handle empty and the next call retries.
/// `is_loaded` reads a flag instead of the lock, so it never waits on a load.
pub struct EngineHandle {
    model_path: PathBuf,
    config_path: PathBuf,
    loader: Box<dyn VoiceLoader>,
    engine: RwLock<Option<Arc<dyn Synthesizer>>>,
    loaded: AtomicBool,
}

impl EngineHandle {
    pub fn new(model_path: PathBuf, config_path: PathBuf, loader: Box<dyn VoiceLoader>) -> Self {
        Self {
            model_path,
            config_path,
            loader,
            engine: RwLock::new(None),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn get_or_init(&self) -> Result<Arc<dyn Synthesizer>, EngineError> {
        {
            let engine = self.engine.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(engine) = engine.as_ref() {
                return Ok(Arc::clone(engine));
            }
        }

        let mut engine = self.engine.write().unwrap_or_else(PoisonError::into_inner);

        // Another request may have finished loading while we waited
        if let Some(engine) = engine.as_ref() {
            return Ok(Arc::clone(engine));
        }

        ensure_artifacts(&self.model_path, &self.config_path)?;

        tracing::info!(
            model = %self.model_path.display(),
            config = %self.config_path.display(),
            "Loading voice model"
        );
        let loaded = self.loader.load(&self.model_path, &self.config_path)?;
        *engine = Some(Arc::clone(&loaded));
        self.loaded.store(true, Ordering::Release);

        Ok(loaded)
    }
}
