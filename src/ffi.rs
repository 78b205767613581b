// FILE: src/ffi.rs
//! C-compatible boundary for the host application.
//!
//! Conventions:
//! - Strings in are NUL-terminated UTF-8; a null pointer or invalid UTF-8 is
//!   rejected with the `InvalidInput` code.
//! - Strings out are copied into fixed buffers, truncated if needed, and are
//!   always NUL-terminated.
//! - Negative return values are `-code` of a [`WoxelError`].

use std::ffi::CStr;
use std::path::Path;

use libc::{c_char, c_int, c_longlong, c_ulonglong};

use crate::core::{classify, in_flight, Category};
use crate::error::WoxelError;
use crate::listing;
use crate::storage::FileIndex;

pub const PATH_CAPACITY: usize = 1024;
pub const NAME_CAPACITY: usize = 256;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct WoxelEntry {
    pub path: [c_char; PATH_CAPACITY],
    pub name: [c_char; NAME_CAPACITY],
    pub size: c_ulonglong,
    pub modified_ms: c_longlong,
    pub is_dir: c_int,
    pub category: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct WoxelSearchResult {
    pub path: [c_char; PATH_CAPACITY],
    pub name: [c_char; NAME_CAPACITY],
}

/// Borrow a C string as `&str`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the
/// returned reference.
unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, WoxelError> {
    if ptr.is_null() {
        return Err(WoxelError::InvalidInput("Null string pointer".into()));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| WoxelError::InvalidInput("String is not valid UTF-8".into()))
}

/// Like [`read_str`] but a null pointer means "absent" and yields `""`.
unsafe fn read_optional_str<'a>(ptr: *const c_char) -> Result<&'a str, WoxelError> {
    if ptr.is_null() {
        Ok("")
    } else {
        read_str(ptr)
    }
}

/// Copy `src` into `dst`, truncating on a UTF-8 boundary so the result is
/// always NUL-terminated and valid.
pub(crate) fn copy_truncated(src: &str, dst: &mut [c_char]) {
    if dst.is_empty() {
        return;
    }
    let mut len = src.len().min(dst.len() - 1);
    while !src.is_char_boundary(len) {
        len -= 1;
    }
    for (d, s) in dst.iter_mut().zip(&src.as_bytes()[..len]) {
        *d = *s as c_char;
    }
    dst[len] = 0;
}

fn failure(err: WoxelError) -> c_int {
    tracing::debug!("[FFI] {}", err);
    -err.code()
}

/// Fill up to `max_entries` entries for the children of `path`.
/// Returns the number written, or a negative error code.
///
/// # Safety
/// `path` must be a valid C string and `entries` must point to at least
/// `max_entries` writable `WoxelEntry` values.
#[no_mangle]
pub unsafe extern "C" fn woxel_list_dir(path: *const c_char, entries: *mut WoxelEntry, max_entries: c_int) -> c_int {
    let path = match read_str(path) {
        Ok(p) => p,
        Err(e) => return failure(e),
    };
    if entries.is_null() && max_entries > 0 {
        return failure(WoxelError::InvalidInput("Null entry buffer".into()));
    }

    let listing = match listing::list_directory(path) {
        Ok(l) => l,
        Err(e) => return failure(e),
    };

    let n = listing.len().min(max_entries.max(0) as usize);
    for (i, entry) in listing.iter().take(n).enumerate() {
        let out = &mut *entries.add(i);
        copy_truncated(&entry.path, &mut out.path);
        copy_truncated(&entry.name, &mut out.name);
        out.size = entry.size;
        out.modified_ms = entry.modified_ms;
        out.is_dir = entry.is_dir as c_int;
        out.category = if entry.is_dir {
            Category::Others.code() as c_int
        } else {
            classify(Path::new(&entry.path), "").code() as c_int
        };
    }
    n as c_int
}

/// Category code for `path`. `mime` may be null. Never fails; unreadable
/// input classifies as `Others`.
///
/// # Safety
/// Non-null pointers must be valid C strings.
#[no_mangle]
pub unsafe extern "C" fn woxel_classify(path: *const c_char, mime: *const c_char) -> c_int {
    let path = read_str(path).unwrap_or("");
    let mime = read_optional_str(mime).unwrap_or("");
    classify(Path::new(path), mime).code() as c_int
}

/// Returns 1 on success, 0 on failure.
///
/// # Safety
/// `db` must be a valid C string.
#[no_mangle]
pub unsafe extern "C" fn woxel_index_init(db: *const c_char) -> c_int {
    match read_str(db) {
        Ok(db) => FileIndex::new(db).init() as c_int,
        Err(_) => 0,
    }
}

/// Returns 1 on success, 0 on failure.
///
/// # Safety
/// All string pointers must be valid C strings.
#[no_mangle]
pub unsafe extern "C" fn woxel_index_upsert(
    db: *const c_char,
    path: *const c_char,
    name: *const c_char,
    modified_ms: c_longlong,
    size: c_longlong,
) -> c_int {
    let (db, path, name) = match (read_str(db), read_str(path), read_str(name)) {
        (Ok(db), Ok(path), Ok(name)) => (db, path, name),
        _ => return 0,
    };
    FileIndex::new(db).upsert(path, name, modified_ms, size) as c_int
}

/// Write up to `min(limit, max_out)` matches into `out`. Returns the number
/// written, or a negative error code.
///
/// # Safety
/// `db` and `text` must be valid C strings; `out` must point to at least
/// `max_out` writable `WoxelSearchResult` values.
#[no_mangle]
pub unsafe extern "C" fn woxel_index_query(
    db: *const c_char,
    text: *const c_char,
    limit: c_int,
    out: *mut WoxelSearchResult,
    max_out: c_int,
) -> c_int {
    let (db, text) = match (read_str(db), read_optional_str(text)) {
        (Ok(db), Ok(text)) => (db, text),
        (Err(e), _) | (_, Err(e)) => return failure(e),
    };
    let cap = limit.min(max_out);
    if cap <= 0 {
        return 0;
    }
    if out.is_null() {
        return failure(WoxelError::InvalidInput("Null result buffer".into()));
    }

    let results = match FileIndex::new(db).try_query(text, cap as i64) {
        Ok(r) => r,
        Err(e) => return failure(e),
    };
    for (i, result) in results.iter().enumerate() {
        let slot = &mut *out.add(i);
        copy_truncated(&result.path, &mut slot.path);
        copy_truncated(&result.name, &mut slot.name);
    }
    results.len() as c_int
}

/// Returns 1 if a record was removed, 0 if there was none, or a negative
/// error code.
///
/// # Safety
/// Both pointers must be valid C strings.
#[no_mangle]
pub unsafe extern "C" fn woxel_index_remove(db: *const c_char, path: *const c_char) -> c_int {
    let (db, path) = match (read_str(db), read_str(path)) {
        (Ok(db), Ok(path)) => (db, path),
        (Err(e), _) | (_, Err(e)) => return failure(e),
    };
    match FileIndex::new(db).remove(path) {
        Ok(removed) => removed as c_int,
        Err(e) => failure(e),
    }
}

/// 1 if the caller now owns `key` and must call `woxel_thumb_complete`,
/// 0 if another caller is already deriving it (or `key` is unusable).
///
/// # Safety
/// `key` must be a valid C string.
#[no_mangle]
pub unsafe extern "C" fn woxel_thumb_try_begin(key: *const c_char) -> c_int {
    match read_str(key) {
        Ok(key) => in_flight::global().try_begin(key) as c_int,
        Err(_) => 0,
    }
}

/// # Safety
/// `key` must be null or a valid C string.
#[no_mangle]
pub unsafe extern "C" fn woxel_thumb_complete(key: *const c_char) {
    if let Ok(key) = read_str(key) {
        in_flight::global().complete(key);
    }
}

/// A zeroed entry, for Rust callers preparing a buffer.
pub fn empty_entry() -> WoxelEntry {
    WoxelEntry {
        path: [0; PATH_CAPACITY],
        name: [0; NAME_CAPACITY],
        size: 0,
        modified_ms: 0,
        is_dir: 0,
        category: Category::Others.code() as c_int,
    }
}

pub fn empty_result() -> WoxelSearchResult {
    WoxelSearchResult { path: [0; PATH_CAPACITY], name: [0; NAME_CAPACITY] }
}
