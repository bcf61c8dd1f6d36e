//! Isolate lifecycle and per-thread attachment.
//!
//! One isolate exists per process. It is created lazily on first use and
//! lives until the process exits. Each OS thread that calls into it is
//! attached on first use and detached when its thread-local storage is torn
//! down.

use std::cell::RefCell;
use std::ffi::CString;
use std::marker::PhantomData;
use std::os::raw::c_int;
use std::ptr;
use std::sync::OnceLock;

use dxfeed_graal_sys::{
    DXFG_EXECUTE_SUCCESSFULLY, DxfgApi, NativeLibrary, graal_isolate_t, graal_isolatethread_t,
};
use tracing::{debug, warn};

use crate::config::RuntimeConfig;
use crate::error::{GraalError, GraalResult, IsolateErrorCode, JavaException};
use crate::exception;

static ISOLATE: OnceLock<Result<Isolate, CreationFailure>> = OnceLock::new();

thread_local! {
    static CURRENT: RefCell<Option<AttachedThread>> = const { RefCell::new(None) };
}

/// Isolate creation failures are sticky: every later call observes the
/// same failure.
#[derive(Debug, Clone)]
struct CreationFailure {
    code: Option<IsolateErrorCode>,
    reason: String,
}

impl From<&CreationFailure> for GraalError {
    fn from(failure: &CreationFailure) -> Self {
        GraalError::IsolateCreationFailed {
            code: failure.code,
            reason: failure.reason.clone(),
        }
    }
}

/// The process-wide runtime instance.
pub struct Isolate {
    api: DxfgApi,
    raw: *mut graal_isolate_t,
    config: RuntimeConfig,
    _library: Option<NativeLibrary>,
}

// SAFETY: the isolate address is only passed to graal_attach_thread, which is
// thread-safe; the entry point table is immutable.
unsafe impl Send for Isolate {}
unsafe impl Sync for Isolate {}

impl Isolate {
    /// Get the isolate, creating it on first use.
    ///
    /// The native image is located through [`RuntimeConfig::from_env`].
    pub fn instance() -> GraalResult<&'static Isolate> {
        ISOLATE
            .get_or_init(|| {
                let config = RuntimeConfig::from_env().map_err(|e| CreationFailure {
                    code: None,
                    reason: e.to_string(),
                })?;
                Self::load(config)
            })
            .as_ref()
            .map_err(GraalError::from)
    }

    /// Create the isolate from an already resolved entry point table.
    ///
    /// If the isolate already exists it is returned unchanged and `api` and
    /// `config` are ignored.
    pub fn install(api: DxfgApi, config: RuntimeConfig) -> GraalResult<&'static Isolate> {
        ISOLATE
            .get_or_init(|| Self::create(api, None, config))
            .as_ref()
            .map_err(GraalError::from)
    }

    /// Check whether the isolate has been created successfully
    pub fn is_initialized() -> bool {
        matches!(ISOLATE.get(), Some(Ok(_)))
    }

    /// Get the entry point table
    pub fn api(&self) -> &DxfgApi {
        &self.api
    }

    /// Get the configuration the isolate was created with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn load(config: RuntimeConfig) -> Result<Isolate, CreationFailure> {
        let path = config.resolved_library_path();
        debug!(library = ?path, "Loading native image");

        // SAFETY: the configured library is expected to be the dxFeed native image
        let library = unsafe { NativeLibrary::open(&path) }.map_err(|e| CreationFailure {
            code: Some(IsolateErrorCode::LocateImageFailed),
            reason: format!("Failed to load {}: {}", path.to_string_lossy(), e),
        })?;

        let api = *library.api();
        Self::create(api, Some(library), config)
    }

    fn create(
        api: DxfgApi,
        library: Option<NativeLibrary>,
        config: RuntimeConfig,
    ) -> Result<Isolate, CreationFailure> {
        let mut isolate = ptr::null_mut();
        let mut thread = ptr::null_mut();

        // SAFETY: null params select the image defaults
        let code = unsafe { (api.graal_create_isolate)(ptr::null_mut(), &mut isolate, &mut thread) };
        if code != DXFG_EXECUTE_SUCCESSFULLY || isolate.is_null() || thread.is_null() {
            let code = IsolateErrorCode::from_code(if code == 0 { 1 } else { code });
            return Err(CreationFailure {
                code: Some(code),
                reason: code.to_string(),
            });
        }

        for (key, value) in &config.properties {
            // SAFETY: thread was attached by graal_create_isolate
            unsafe { push_property(&api, thread, key, value) }.map_err(|e| CreationFailure {
                code: None,
                reason: format!("Failed to set system property {}: {}", key, e),
            })?;
        }

        // graal_create_isolate attaches the creating thread
        CURRENT.with(|current| {
            *current.borrow_mut() = Some(AttachedThread {
                raw: thread,
                owned: true,
            })
        });

        debug!(properties = config.properties.len(), "Graal isolate created");

        Ok(Isolate {
            api,
            raw: isolate,
            config,
            _library: library,
        })
    }

    fn attach(&self) -> GraalResult<*mut graal_isolatethread_t> {
        let mut thread = ptr::null_mut();
        // SAFETY: raw is a live isolate; attaching an attached thread is idempotent
        let code = unsafe { (self.api.graal_attach_thread)(self.raw, &mut thread) };
        if code != DXFG_EXECUTE_SUCCESSFULLY {
            return Err(GraalError::Isolate(IsolateErrorCode::from_code(code)));
        }
        if thread.is_null() {
            return Err(GraalError::Isolate(IsolateErrorCode::UnattachedThread));
        }
        Ok(thread)
    }
}

impl std::fmt::Debug for Isolate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Isolate")
            .field("raw", &self.raw)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Push one system property through a raw thread.
///
/// # Safety
/// `thread` must be attached to the isolate `api` belongs to.
pub(crate) unsafe fn push_property(
    api: &DxfgApi,
    thread: *mut graal_isolatethread_t,
    key: &str,
    value: &str,
) -> GraalResult<()> {
    let key = CString::new(key).map_err(|_| GraalError::invalid_argument("property key contains NUL"))?;
    let value =
        CString::new(value).map_err(|_| GraalError::invalid_argument("property value contains NUL"))?;
    // SAFETY: strings outlive the call; thread per caller contract
    unsafe {
        let code = (api.dxfg_system_set_property)(thread, key.as_ptr(), value.as_ptr());
        exception::check_code(api, thread, code, "dxfg_system_set_property")?;
    }
    Ok(())
}

/// Thread-local attachment record.
///
/// Threads attached by this crate are detached on thread exit. Threads
/// adopted from a native callback belong to the runtime and are left alone.
struct AttachedThread {
    raw: *mut graal_isolatethread_t,
    owned: bool,
}

impl Drop for AttachedThread {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        let Some(Ok(isolate)) = ISOLATE.get() else {
            return;
        };
        // SAFETY: raw was attached on this thread and is detached exactly once
        let code = unsafe { (isolate.api.graal_detach_thread)(self.raw) };
        if code == DXFG_EXECUTE_SUCCESSFULLY {
            debug!("Detached thread from Graal isolate");
        } else {
            warn!(
                error = %IsolateErrorCode::from_code(code),
                "Failed to detach thread from Graal isolate"
            );
        }
    }
}

/// Execution context of the calling thread.
///
/// Cheap to copy and never `Send`: a context is only valid on the thread it
/// was obtained on.
///
/// ```compile_fail
/// use dxfeed_graal::IsolateThread;
///
/// let thread = IsolateThread::current().unwrap();
/// std::thread::spawn(move || {
///     // IsolateThread is !Send
///     let _ = thread.raw();
/// });
/// ```
#[derive(Clone, Copy)]
pub struct IsolateThread {
    raw: *mut graal_isolatethread_t,
    isolate: &'static Isolate,
    _marker: PhantomData<*mut ()>,
}

impl IsolateThread {
    /// Get the context of the calling thread, attaching it on first use.
    pub fn current() -> GraalResult<IsolateThread> {
        let isolate = Isolate::instance()?;
        let raw = CURRENT
            .try_with(|current| -> GraalResult<_> {
                if let Some(attached) = current.borrow().as_ref() {
                    return Ok(attached.raw);
                }
                let raw = isolate.attach()?;
                debug!("Attached thread to Graal isolate");
                *current.borrow_mut() = Some(AttachedThread { raw, owned: true });
                Ok(raw)
            })
            // Thread-local storage is already being torn down
            .map_err(|_| GraalError::Isolate(IsolateErrorCode::UnattachedThread))??;

        Ok(IsolateThread {
            raw,
            isolate,
            _marker: PhantomData,
        })
    }

    /// Run `f` with the calling thread's context
    pub fn with<R>(f: impl FnOnce(IsolateThread) -> GraalResult<R>) -> GraalResult<R> {
        f(Self::current()?)
    }

    /// Record a thread handed to us by a native callback so calls made from
    /// the callback reuse it instead of attaching again.
    pub(crate) fn adopt(raw: *mut graal_isolatethread_t) {
        if raw.is_null() {
            return;
        }
        let _ = CURRENT.try_with(|current| {
            if let Ok(mut current) = current.try_borrow_mut() {
                if current.is_none() {
                    *current = Some(AttachedThread { raw, owned: false });
                }
            }
        });
    }

    /// Raw context pointer passed as the first argument of every entry point
    pub fn raw(&self) -> *mut graal_isolatethread_t {
        self.raw
    }

    /// Get the entry point table
    pub fn api(&self) -> &'static DxfgApi {
        &self.isolate.api
    }

    /// Fail if `code` is negative, raising the pending exception
    pub fn check_code(&self, code: c_int, operation: &'static str) -> GraalResult<c_int> {
        // SAFETY: self.raw is attached to this isolate on this thread
        unsafe { exception::check_code(self.api(), self.raw, code, operation) }
    }

    /// Fail if `ptr` is null, raising the pending exception
    pub fn check_ptr<T>(&self, ptr: *mut T, operation: &'static str) -> GraalResult<*mut T> {
        // SAFETY: self.raw is attached to this isolate on this thread
        unsafe { exception::check_ptr(self.api(), self.raw, ptr, operation) }
    }

    /// Fetch and clear the pending exception, if any
    pub fn take_pending_exception(&self) -> Option<JavaException> {
        // SAFETY: self.raw is attached to this isolate on this thread
        unsafe { exception::take_pending(self.api(), self.raw) }
    }
}

impl std::fmt::Debug for IsolateThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IsolateThread").field(&self.raw).finish()
    }
}
