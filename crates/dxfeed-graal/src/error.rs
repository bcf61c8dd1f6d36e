//! Error types for the dxFeed Graal binding
//!
//! Two failure domains meet here: infrastructure errors reported by the Graal
//! isolate itself (attach/detach, allocation, unsupported CPU) and Java
//! exceptions raised inside the embedded runtime. Both are variants of one
//! closed [`GraalError`] so call sites can match exhaustively.

use std::fmt;

use thiserror::Error;

/// Result type alias for binding operations
pub type GraalResult<T> = Result<T, GraalError>;

/// Infrastructure error codes returned by the Graal C entry points
/// (`graal_create_isolate`, `graal_attach_thread`, `graal_detach_thread`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum IsolateErrorCode {
    NoError = 0,
    Unspecified = 1,
    NullArgument = 2,
    AllocationFailed = 3,
    UnattachedThread = 4,
    UninitializedIsolate = 5,
    LocateImageFailed = 6,
    OpenImageFailed = 7,
    MapHeapFailed = 8,
    ProtectHeapFailed = 9,
    UnsupportedIsolateParametersVersion = 10,
    ThreadingInitializationFailed = 11,
    UncaughtException = 12,
    IsolateInitializationFailed = 13,
    OpenAuxImageFailed = 14,
    ReadAuxImageMetaFailed = 15,
    MapAuxImageFailed = 16,
    InsufficientAuxImageMemory = 17,
    AuxImageUnsupported = 18,
    FreeAddressSpaceFailed = 19,
    FreeImageHeapFailed = 20,
    AuxImagePrimaryImageMismatch = 21,
    ArgumentParsingFailed = 22,
    CpuFeatureCheckFailed = 23,
    PageSizeCheckFailed = 24,
    ReserveAddressSpaceFailed = 801,
    InsufficientAddressSpace = 802,
}

impl IsolateErrorCode {
    const ALL: [Self; 27] = [
        Self::NoError,
        Self::Unspecified,
        Self::NullArgument,
        Self::AllocationFailed,
        Self::UnattachedThread,
        Self::UninitializedIsolate,
        Self::LocateImageFailed,
        Self::OpenImageFailed,
        Self::MapHeapFailed,
        Self::ProtectHeapFailed,
        Self::UnsupportedIsolateParametersVersion,
        Self::ThreadingInitializationFailed,
        Self::UncaughtException,
        Self::IsolateInitializationFailed,
        Self::OpenAuxImageFailed,
        Self::ReadAuxImageMetaFailed,
        Self::MapAuxImageFailed,
        Self::InsufficientAuxImageMemory,
        Self::AuxImageUnsupported,
        Self::FreeAddressSpaceFailed,
        Self::FreeImageHeapFailed,
        Self::AuxImagePrimaryImageMismatch,
        Self::ArgumentParsingFailed,
        Self::CpuFeatureCheckFailed,
        Self::PageSizeCheckFailed,
        Self::ReserveAddressSpaceFailed,
        Self::InsufficientAddressSpace,
    ];

    /// Map a raw return code. Codes outside the known set become
    /// [`IsolateErrorCode::Unspecified`].
    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .unwrap_or(Self::Unspecified)
    }

    /// Raw numeric code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Fixed human-readable description
    pub fn description(self) -> &'static str {
        match self {
            Self::NoError => "No error occurred",
            Self::Unspecified => "An unspecified error occurred",
            Self::NullArgument => "An argument was NULL",
            Self::AllocationFailed => "Memory allocation failed",
            Self::UnattachedThread => "The specified thread is not attached to the isolate",
            Self::UninitializedIsolate => "The specified isolate is unknown",
            Self::LocateImageFailed => "Locating the image file failed",
            Self::OpenImageFailed => "Opening the image file failed",
            Self::MapHeapFailed => "Mapping the heap from the image file failed",
            Self::ProtectHeapFailed => "Setting the protection of the heap memory failed",
            Self::UnsupportedIsolateParametersVersion => {
                "The version of the specified isolate parameters is unsupported"
            }
            Self::ThreadingInitializationFailed => "Initialization of threading in the isolate failed",
            Self::UncaughtException => "Some exception is not caught",
            Self::IsolateInitializationFailed => "Initialization the isolate failed",
            Self::OpenAuxImageFailed => "Opening an auxiliary image failed",
            Self::ReadAuxImageMetaFailed => "Reading an opened auxiliary image failed",
            Self::MapAuxImageFailed => "Mapping an auxiliary image failed",
            Self::InsufficientAuxImageMemory => "Insufficient memory for the auxiliary image",
            Self::AuxImageUnsupported => "Auxiliary images are not supported on this platform",
            Self::FreeAddressSpaceFailed => "Releasing the isolate's address space failed",
            Self::FreeImageHeapFailed => "Releasing the isolate's image heap memory failed",
            Self::AuxImagePrimaryImageMismatch => {
                "The auxiliary image was built from a different primary image"
            }
            Self::ArgumentParsingFailed => "The isolate arguments could not be parsed",
            Self::CpuFeatureCheckFailed => {
                "Current target does not support the CPU features required by the image"
            }
            Self::PageSizeCheckFailed => {
                "Image page size is incompatible with the run-time page size"
            }
            Self::ReserveAddressSpaceFailed => "Reserving address space for the new isolate failed",
            Self::InsufficientAddressSpace => "The image heap does not fit in the available address space",
        }
    }
}

impl fmt::Display for IsolateErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.description(), self.code())
    }
}

/// A Java exception raised inside the embedded runtime.
///
/// Only the description crosses the boundary: class name, message and the
/// printed stack trace are kept verbatim, the Java type itself is not
/// reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class_name}: {message}")]
pub struct JavaException {
    pub class_name: String,
    pub message: String,
    pub stack_trace: String,
    pub cause: Option<Box<JavaException>>,
}

impl JavaException {
    pub fn new(
        class_name: impl Into<String>,
        message: impl Into<String>,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
            stack_trace: stack_trace.into(),
            cause: None,
        }
    }

    /// Iterate over this exception and its causes, outermost first
    pub fn chain(&self) -> impl Iterator<Item = &JavaException> {
        std::iter::successors(Some(self), |e| e.cause.as_deref())
    }
}

/// Translation failures between Rust values and native records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// Discriminator value that is not part of the protocol
    #[error("Unknown {kind} discriminator: {value}")]
    UnknownVariant { kind: &'static str, value: i32 },

    /// Valid protocol value that this binding version cannot translate
    #[error("{kind} {name} is not implemented by this binding")]
    NotImplemented { kind: &'static str, name: &'static str },

    /// Record that violates the native layout contract
    #[error("Malformed native {kind}: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

impl MarshalError {
    pub fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            reason: reason.into(),
        }
    }
}

/// Structured error type for every binding operation
#[derive(Debug, Error)]
pub enum GraalError {
    /// The native image could not be loaded or the isolate not created
    #[error("Isolate creation failed: {reason}")]
    IsolateCreationFailed {
        code: Option<IsolateErrorCode>,
        reason: String,
    },

    /// Isolate infrastructure failure (thread attach/detach, allocation)
    #[error("Isolate error: {0}")]
    Isolate(IsolateErrorCode),

    /// Exception raised inside the embedded Java runtime
    #[error("Java exception {0}")]
    Java(#[from] JavaException),

    /// Native record translation failure
    #[error("Marshaling error: {0}")]
    Marshal(#[from] MarshalError),

    /// Invalid input rejected before any native call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A native call reported failure but left no pending exception
    #[error("Internal error: {operation} failed without a pending exception")]
    NativeCallFailed { operation: &'static str },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraalError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this error carries a Java exception
    pub fn is_java_exception(&self) -> bool {
        matches!(self, Self::Java(_))
    }

    /// Get the Java exception if this error carries one
    pub fn java_exception(&self) -> Option<&JavaException> {
        match self {
            Self::Java(e) => Some(e),
            _ => None,
        }
    }

    /// Get the isolate error code if this is an infrastructure error
    pub fn isolate_code(&self) -> Option<IsolateErrorCode> {
        match self {
            Self::Isolate(code) => Some(*code),
            Self::IsolateCreationFailed { code, .. } => *code,
            _ => None,
        }
    }

    /// Get the error type name; for Java exceptions this is the Java class name
    pub fn error_type(&self) -> &str {
        match self {
            Self::IsolateCreationFailed { .. } => "IsolateCreationFailed",
            Self::Isolate(_) => "IsolateError",
            Self::Java(e) => &e.class_name,
            Self::Marshal(MarshalError::UnknownVariant { .. }) => "UnknownVariant",
            Self::Marshal(MarshalError::NotImplemented { .. }) => "NotImplemented",
            Self::Marshal(MarshalError::Malformed { .. }) => "MalformedRecord",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::NativeCallFailed { .. } => "NativeCallFailed",
            Self::Config(_) => "ConfigError",
            Self::Json(_) => "JsonError",
        }
    }
}
