//! Conversion between Rust values and native fixed-layout records.
//!
//! Records produced by [`NativeMarshal::to_native`] are allocated by Rust and
//! must be freed with [`NativeMarshal::release_native`], never with a native
//! `*_release` entry point. Records allocated by the native side go the
//! other way: they are read with `from_native` and freed by the matching
//! native entry point.

use std::marker::PhantomData;
use std::ptr;

use crate::error::GraalResult;

pub mod list;
pub mod source;
pub mod string;
pub mod symbol;

pub use list::PartialConversion;
pub use source::{IndexedEventSource, SourceKind};
pub use symbol::Symbol;

/// A value with a native record representation.
pub trait NativeMarshal: Sized {
    /// Native record type
    type Native;

    /// Allocate a native record holding a copy of `self`.
    fn to_native(&self) -> GraalResult<*mut Self::Native>;

    /// Read a native record. A null pointer is an error; use
    /// [`from_native_opt`] where null means "absent".
    ///
    /// # Safety
    /// `native` must be null or point to a valid record of this type.
    unsafe fn from_native(native: *const Self::Native) -> GraalResult<Self>;

    /// Free a record produced by [`NativeMarshal::to_native`]. Null is a no-op.
    ///
    /// # Safety
    /// `native` must be null or come from `to_native` of this type, and must
    /// not be used afterwards.
    unsafe fn release_native(native: *mut Self::Native);
}

/// Marshal an optional value; `None` becomes a null pointer
pub fn to_native_opt<T: NativeMarshal>(value: Option<&T>) -> GraalResult<*mut T::Native> {
    match value {
        Some(value) => value.to_native(),
        None => Ok(ptr::null_mut()),
    }
}

/// Read an optional record; a null pointer becomes `None`
///
/// # Safety
/// Same contract as [`NativeMarshal::from_native`].
pub unsafe fn from_native_opt<T: NativeMarshal>(native: *const T::Native) -> GraalResult<Option<T>> {
    if native.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null, valid per caller contract
    unsafe { T::from_native(native) }.map(Some)
}

/// Scoped owner of a Rust-allocated native record.
///
/// Used for arguments of native calls: the record is freed when the guard
/// leaves scope, on the success and error paths alike.
pub struct NativeBox<T: NativeMarshal> {
    ptr: *mut T::Native,
    _marker: PhantomData<T>,
}

impl<T: NativeMarshal> NativeBox<T> {
    /// Marshal `value` into a new guarded record
    pub fn new(value: &T) -> GraalResult<Self> {
        Ok(Self {
            ptr: value.to_native()?,
            _marker: PhantomData,
        })
    }

    /// Guard an optional value; `None` guards a null pointer
    pub fn new_opt(value: Option<&T>) -> GraalResult<Self> {
        Ok(Self {
            ptr: to_native_opt(value)?,
            _marker: PhantomData,
        })
    }

    /// Guard a record produced by `T::to_native`.
    ///
    /// # Safety
    /// `ptr` must be null or come from `T::to_native` and be owned by the caller.
    pub unsafe fn from_raw(ptr: *mut T::Native) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *mut T::Native {
        self.ptr
    }

    /// Give up ownership without freeing
    pub fn into_raw(self) -> *mut T::Native {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }
}

impl<T: NativeMarshal> Drop for NativeBox<T> {
    fn drop(&mut self) {
        // SAFETY: ptr came from T::to_native and is released exactly once
        unsafe { T::release_native(self.ptr) };
    }
}
