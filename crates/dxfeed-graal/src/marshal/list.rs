//! `{size, elements}` lists of element pointers.
//!
//! A Rust-allocated list is three kinds of allocation: the header, the
//! pointer array and one record per element. Release frees them in reverse:
//! elements, then the array, then the header.

use std::ptr;

use dxfeed_graal_sys::dxfg_list;

use crate::error::{GraalError, GraalResult, MarshalError};
use crate::marshal::NativeMarshal;

/// Elements converted before a failure, plus the failure itself.
///
/// List conversion is not transactional: elements converted before a bad
/// record are kept.
#[derive(Debug)]
pub struct PartialConversion<T> {
    pub converted: Vec<T>,
    pub error: Option<GraalError>,
}

impl<T> PartialConversion<T> {
    /// Surface the error, dropping the converted prefix
    pub fn into_result(self) -> GraalResult<Vec<T>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.converted),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Allocate a native list holding copies of `items`.
pub fn to_native<T: NativeMarshal>(items: &[T]) -> GraalResult<*mut dxfg_list<T::Native>> {
    let size = i32::try_from(items.len()).map_err(|_| {
        GraalError::invalid_argument(format!("list of {} elements is too long", items.len()))
    })?;

    let mut elements: Vec<*mut T::Native> = Vec::with_capacity(items.len());
    for item in items {
        match item.to_native() {
            Ok(element) => elements.push(element),
            Err(e) => {
                for element in elements {
                    // SAFETY: produced by T::to_native above
                    unsafe { T::release_native(element) };
                }
                return Err(e);
            }
        }
    }

    let array = if elements.is_empty() {
        ptr::null_mut()
    } else {
        Box::into_raw(elements.into_boxed_slice()).cast::<*mut T::Native>()
    };

    Ok(Box::into_raw(Box::new(dxfg_list {
        size,
        elements: array,
    })))
}

/// Free a list produced by [`to_native`]. Null is a no-op.
///
/// # Safety
/// `list` must be null or come from [`to_native`] for the same `T`.
pub unsafe fn release_native<T: NativeMarshal>(list: *mut dxfg_list<T::Native>) {
    if list.is_null() {
        return;
    }
    // SAFETY: header came from Box::into_raw in to_native
    let header = unsafe { Box::from_raw(list) };
    if !header.elements.is_null() {
        // SAFETY: array came from a boxed slice of exactly `size` pointers
        let array = unsafe {
            Box::from_raw(ptr::slice_from_raw_parts_mut(
                header.elements,
                header.size as usize,
            ))
        };
        for &element in array.iter() {
            // SAFETY: each element came from T::to_native
            unsafe { T::release_native(element) };
        }
        drop(array);
    }
    drop(header);
}

/// Convert every element of a native list, stopping at the first failure.
///
/// # Safety
/// `list` must be null or point to a valid list whose elements are valid
/// records of `T::Native`.
pub unsafe fn from_native_partial<T: NativeMarshal>(
    list: *const dxfg_list<T::Native>,
) -> PartialConversion<T> {
    let mut converted = Vec::new();
    // SAFETY: per caller contract
    let error = match unsafe { elements(list) } {
        Ok(elements) => elements.iter().find_map(|&element| {
            // SAFETY: elements are valid records per caller contract
            match unsafe { T::from_native(element) } {
                Ok(value) => {
                    converted.push(value);
                    None
                }
                Err(e) => Some(e),
            }
        }),
        Err(e) => Some(e),
    };
    PartialConversion { converted, error }
}

/// Convert every element of a native list, preserving order.
///
/// # Safety
/// Same contract as [`from_native_partial`].
pub unsafe fn from_native<T: NativeMarshal>(list: *const dxfg_list<T::Native>) -> GraalResult<Vec<T>> {
    // SAFETY: per caller contract
    unsafe { from_native_partial(list) }.into_result()
}

/// Borrow the element pointers of a list.
///
/// # Safety
/// `list` must be null or point to a valid list header.
unsafe fn elements<'a, N>(list: *const dxfg_list<N>) -> GraalResult<&'a [*mut N]> {
    if list.is_null() {
        return Err(MarshalError::malformed("list", "null pointer").into());
    }
    // SAFETY: non-null per check above
    let header = unsafe { &*list };
    if header.size < 0 {
        return Err(MarshalError::malformed("list", format!("negative size {}", header.size)).into());
    }
    if header.size == 0 {
        return Ok(&[]);
    }
    if header.elements.is_null() {
        return Err(MarshalError::malformed(
            "list",
            format!("{} elements but no element array", header.size),
        )
        .into());
    }
    // SAFETY: the array holds `size` pointers
    Ok(unsafe { std::slice::from_raw_parts(header.elements, header.size as usize) })
}

impl<T: NativeMarshal> NativeMarshal for Vec<T> {
    type Native = dxfg_list<T::Native>;

    fn to_native(&self) -> GraalResult<*mut Self::Native> {
        to_native(self.as_slice())
    }

    unsafe fn from_native(native: *const Self::Native) -> GraalResult<Self> {
        // SAFETY: per trait contract
        unsafe { from_native::<T>(native) }
    }

    unsafe fn release_native(native: *mut Self::Native) {
        // SAFETY: per trait contract
        unsafe { release_native::<T>(native) }
    }
}
