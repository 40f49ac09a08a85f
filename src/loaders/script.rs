//! Dynamic script targets: recompile and re-instantiate on change.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};

use crate::error::{BoxError, TargetError, TargetResult};
use crate::loaders::TargetLoader;
use crate::policy::{LoadInfo, Staleness};

/// Where script text comes from.
pub trait ScriptSource: Send + Sync {
    /// Location used in logs and errors, e.g. a file path.
    fn location(&self) -> String;

    fn read(&self) -> Result<String, BoxError>;

    /// Opaque revision; changes whenever the text changes.
    fn revision(&self) -> Result<u64, BoxError>;
}

/// Script stored in a file; the revision is the modification time.
#[derive(Debug, Clone)]
pub struct FileScriptSource {
    path: PathBuf,
}

impl FileScriptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScriptSource for FileScriptSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<String, BoxError> {
        Ok(std::fs::read_to_string(&self.path)?)
    }

    fn revision(&self) -> Result<u64, BoxError> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        Ok(mtime_revision(modified.duration_since(UNIX_EPOCH)?))
    }
}

/// Nanoseconds since the epoch, saturating past the `u64` range.
fn mtime_revision(since_epoch: Duration) -> u64 {
    u64::try_from(since_epoch.as_nanos()).unwrap_or(u64::MAX)
}

/// Script held in memory. Every [`update`](Self::update) bumps the revision.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{InMemoryScriptSource, ScriptSource};
///
/// let script = InMemoryScriptSource::new("greeting", "hello");
/// let before = script.revision().unwrap();
/// script.update("bonjour");
/// assert_eq!(script.read().unwrap(), "bonjour");
/// assert!(script.revision().unwrap() > before);
/// ```
#[derive(Debug)]
pub struct InMemoryScriptSource {
    name: String,
    state: RwLock<(String, u64)>,
}

impl InMemoryScriptSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new((text.into(), 0)),
        }
    }

    pub fn update(&self, text: impl Into<String>) {
        let mut state = self.state.write();
        state.0 = text.into();
        state.1 += 1;
    }
}

impl ScriptSource for InMemoryScriptSource {
    fn location(&self) -> String {
        format!("inline:{}", self.name)
    }

    fn read(&self) -> Result<String, BoxError> {
        Ok(self.state.read().0.clone())
    }

    fn revision(&self) -> Result<u64, BoxError> {
        Ok(self.state.read().1)
    }
}

/// Turns script text into a target instance.
///
/// Closures `Fn(&str) -> Result<Arc<T>, BoxError>` implement this trait.
pub trait ScriptCompiler<T: ?Sized>: Send + Sync {
    fn compile(&self, source: &str) -> Result<Arc<T>, BoxError>;
}

impl<T, F> ScriptCompiler<T> for F
where
    T: ?Sized,
    F: Fn(&str) -> Result<Arc<T>, BoxError> + Send + Sync,
{
    fn compile(&self, source: &str) -> Result<Arc<T>, BoxError> {
        self(source)
    }
}

/// Loads a target by reading and compiling a script.
///
/// Pair it with [`staleness`](Self::staleness) so a refreshable source
/// recompiles only when the script actually changed.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{
///     BoxError, InMemoryScriptSource, ManualClock, RefreshCheckDelay,
///     RefreshableTargetSource, ScriptLoader, TargetSource,
/// };
/// use std::sync::Arc;
///
/// let script = Arc::new(InMemoryScriptSource::new("greeting", "hello"));
/// let loader = ScriptLoader::new(script.clone(), |text: &str| -> Result<Arc<String>, BoxError> {
///     Ok(Arc::new(text.to_uppercase()))
/// });
/// let source = RefreshableTargetSource::builder()
///     .name("greeting")
///     .staleness(loader.staleness())
///     .loader(loader)
///     .refresh_check_delay(RefreshCheckDelay::Always)
///     .build()
///     .unwrap();
///
/// assert_eq!(source.get_target().unwrap().as_str(), "HELLO");
/// script.update("bonjour");
/// assert_eq!(source.get_target().unwrap().as_str(), "BONJOUR");
/// assert_eq!(source.get_target().unwrap().as_str(), "BONJOUR");
/// assert_eq!(source.stats().refresh_count, 2);
/// ```
pub struct ScriptLoader<T: ?Sized> {
    source: Arc<dyn ScriptSource>,
    compiler: Arc<dyn ScriptCompiler<T>>,
    compiled_revision: Arc<Mutex<Option<u64>>>,
}

impl<T: ?Sized + 'static> ScriptLoader<T> {
    pub fn new(source: Arc<dyn ScriptSource>, compiler: impl ScriptCompiler<T> + 'static) -> Self {
        Self {
            source,
            compiler: Arc::new(compiler),
            compiled_revision: Arc::new(Mutex::new(None)),
        }
    }

    /// Revision of the script text last compiled successfully.
    pub fn compiled_revision(&self) -> Option<u64> {
        *self.compiled_revision.lock()
    }

    pub fn staleness(&self) -> ScriptModified {
        ScriptModified {
            source: Arc::clone(&self.source),
            compiled_revision: Arc::clone(&self.compiled_revision),
        }
    }
}

impl<T: ?Sized + 'static> TargetLoader<T> for ScriptLoader<T> {
    fn load(&self) -> TargetResult<Arc<T>> {
        let location = self.source.location();
        // Revision first: a change racing the read shows up on the next check.
        let revision = self
            .source
            .revision()
            .map_err(|e| TargetError::load(location.clone(), e))?;
        let text = self
            .source
            .read()
            .map_err(|e| TargetError::load(location.clone(), e))?;
        let compiled = self
            .compiler
            .compile(&text)
            .map_err(|e| TargetError::load(location.clone(), e))?;

        tracing::debug!(script = %location, revision, "script compiled");
        *self.compiled_revision.lock() = Some(revision);
        Ok(compiled)
    }

    fn describe(&self) -> String {
        format!("script {}", self.source.location())
    }
}

/// Staleness predicate reporting a modified script.
///
/// A source whose revision cannot be read counts as unmodified.
pub struct ScriptModified {
    source: Arc<dyn ScriptSource>,
    compiled_revision: Arc<Mutex<Option<u64>>>,
}

impl ScriptModified {
    pub fn is_modified(&self) -> bool {
        match self.source.revision() {
            Ok(revision) => *self.compiled_revision.lock() != Some(revision),
            Err(e) => {
                tracing::warn!(script = %self.source.location(), error = %e, "cannot read script revision");
                false
            }
        }
    }
}

impl<T: ?Sized> Staleness<T> for ScriptModified {
    fn is_stale(&self, _current: &T, _info: &LoadInfo) -> bool {
        self.is_modified()
    }
}
