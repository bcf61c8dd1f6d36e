//! Indexed event sources.
//!
//! A source appears both as a standalone record (pointed to by indexed-event
//! subscription symbols) and embedded by value inside order records. The
//! record-level helpers serve the embedded case.

use std::fmt;

use dxfeed_graal_sys::{DXFG_INDEXED_EVENT_SOURCE, DXFG_ORDER_SOURCE, dxfg_indexed_event_source_t};
use serde::{Deserialize, Serialize};

use crate::error::{GraalResult, MarshalError};
use crate::marshal::{NativeMarshal, string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Plain indexed event source
    Generic,
    /// Order source
    Order,
}

impl SourceKind {
    fn code(self) -> i32 {
        match self {
            Self::Generic => DXFG_INDEXED_EVENT_SOURCE,
            Self::Order => DXFG_ORDER_SOURCE,
        }
    }

    fn from_code(code: i32) -> GraalResult<Self> {
        match code {
            DXFG_INDEXED_EVENT_SOURCE => Ok(Self::Generic),
            DXFG_ORDER_SOURCE => Ok(Self::Order),
            value => Err(MarshalError::UnknownVariant {
                kind: "indexed event source",
                value,
            }
            .into()),
        }
    }
}

/// Source identifier of indexed events (orders, time-and-sales, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexedEventSource {
    pub kind: SourceKind,
    pub id: i32,
    pub name: String,
}

impl IndexedEventSource {
    /// Generic source
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Generic,
            id,
            name: name.into(),
        }
    }

    /// Order source
    pub fn order(id: i32, name: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Order,
            id,
            name: name.into(),
        }
    }

    /// Fill a record; the name is allocated and must be freed with
    /// [`IndexedEventSource::release_record`].
    pub(crate) fn write_record(&self) -> GraalResult<dxfg_indexed_event_source_t> {
        Ok(dxfg_indexed_event_source_t {
            type_: self.kind.code(),
            id: self.id,
            name: string::to_native(&self.name)?,
        })
    }

    /// # Safety
    /// `record.name` must be null or NUL-terminated.
    pub(crate) unsafe fn read_record(record: &dxfg_indexed_event_source_t) -> GraalResult<Self> {
        Ok(Self {
            kind: SourceKind::from_code(record.type_)?,
            id: record.id,
            // SAFETY: per caller contract
            name: unsafe { string::from_native(record.name) }?,
        })
    }

    /// # Safety
    /// `record` must come from [`IndexedEventSource::write_record`].
    pub(crate) unsafe fn release_record(record: &dxfg_indexed_event_source_t) {
        // SAFETY: name came from string::to_native
        unsafe { string::release_native(record.name.cast_mut()) };
    }
}

impl Default for IndexedEventSource {
    /// The default source, id 0
    fn default() -> Self {
        Self::new(0, "DEFAULT")
    }
}

impl fmt::Display for IndexedEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl NativeMarshal for IndexedEventSource {
    type Native = dxfg_indexed_event_source_t;

    fn to_native(&self) -> GraalResult<*mut Self::Native> {
        Ok(Box::into_raw(Box::new(self.write_record()?)))
    }

    unsafe fn from_native(native: *const Self::Native) -> GraalResult<Self> {
        if native.is_null() {
            return Err(MarshalError::malformed("indexed event source", "null pointer").into());
        }
        // SAFETY: non-null and valid per trait contract
        unsafe { Self::read_record(&*native) }
    }

    unsafe fn release_native(native: *mut Self::Native) {
        if native.is_null() {
            return;
        }
        // SAFETY: allocated by to_native
        let record = unsafe { Box::from_raw(native) };
        // SAFETY: record came from write_record
        unsafe { Self::release_record(&record) };
    }
}
