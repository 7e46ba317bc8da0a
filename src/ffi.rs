//! FFI bindings for Resurface
//!
//! This module provides C-compatible functions for calling Resurface from the
//! host app, its share extension and its widget. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `resurface_free_string`. Timestamps cross the boundary as Unix
//! seconds.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};

use crate::config::ResurfaceConfig;
use crate::pipeline::{best_item_json, capture_json_to_item_json, ResurfaceProcessor};
use crate::types::{CaptureEvent, Stack, StoredItem};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn unix_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Unwrap an argument or record the error and return NULL from the caller
macro_rules! require {
    ($value:expr, $msg:expr) => {
        match $value {
            Some(v) => v,
            None => {
                set_last_error($msg);
                return ptr::null_mut();
            }
        }
    };
}

// ============================================================================
// Stateless API
// ============================================================================

/// Turn a capture JSON object into a stored item JSON object.
///
/// # Safety
/// - `capture_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `resurface_free_string`.
/// - Returns NULL on error; call `resurface_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn resurface_capture_to_item(
    capture_json: *const c_char,
    now_unix_secs: i64,
) -> *mut c_char {
    clear_last_error();

    let json_str = require!(cstr_to_string(capture_json), "Invalid capture JSON string pointer");
    let now = require!(unix_to_utc(now_unix_secs), "Timestamp out of range");

    match capture_json_to_item_json(&json_str, now) {
        Ok(item) => string_to_cstr(&item),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Select the best item of `stack` from a JSON array of stored items.
///
/// # Safety
/// - `items_json` and `stack` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `resurface_free_string`.
/// - Returns NULL both when there is nothing to suggest and on error; in the
///   first case `resurface_last_error` returns NULL.
#[no_mangle]
pub unsafe extern "C" fn resurface_best_item(
    items_json: *const c_char,
    stack: *const c_char,
    at_unix_secs: i64,
) -> *mut c_char {
    clear_last_error();

    let json_str = require!(cstr_to_string(items_json), "Invalid items JSON string pointer");
    let stack_str = require!(cstr_to_string(stack), "Invalid stack string pointer");
    let at = require!(unix_to_utc(at_unix_secs), "Timestamp out of range");

    match best_item_json(&json_str, &stack_str, at) {
        Ok(Some(item)) => string_to_cstr(&item),
        Ok(None) => ptr::null_mut(),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Processor API
// ============================================================================

/// Opaque handle to a ResurfaceProcessor
pub struct ResurfaceProcessorHandle {
    processor: ResurfaceProcessor,
}

/// Create a processor from a config JSON object, or defaults when `config_json` is NULL.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `resurface_processor_free`.
/// - Returns NULL on error; call `resurface_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn resurface_processor_new(
    config_json: *const c_char,
) -> *mut ResurfaceProcessorHandle {
    clear_last_error();

    let processor = if config_json.is_null() {
        ResurfaceProcessor::new()
    } else {
        let json_str = require!(cstr_to_string(config_json), "Invalid config string");
        let built = ResurfaceConfig::from_json(&json_str).and_then(ResurfaceProcessor::with_config);
        match built {
            Ok(processor) => processor,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(ResurfaceProcessorHandle { processor }))
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `resurface_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn resurface_processor_free(processor: *mut ResurfaceProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Process a capture JSON object with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `resurface_processor_new`.
/// - `capture_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `resurface_free_string`.
/// - Returns NULL on error; call `resurface_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn resurface_processor_process_capture(
    processor: *const ResurfaceProcessorHandle,
    capture_json: *const c_char,
    now_unix_secs: i64,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let json_str = require!(cstr_to_string(capture_json), "Invalid capture JSON string pointer");
    let now = require!(unix_to_utc(now_unix_secs), "Timestamp out of range");

    let event: CaptureEvent = match serde_json::from_str(&json_str) {
        Ok(event) => event,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let item = handle.processor.process_capture(&event, now);
    match serde_json::to_string(&item) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Select the best item of `stack` with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `resurface_processor_new`.
/// - `items_json` and `stack` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `resurface_free_string`.
/// - Returns NULL when there is nothing to suggest (no error set) or on error.
#[no_mangle]
pub unsafe extern "C" fn resurface_processor_best_item(
    processor: *const ResurfaceProcessorHandle,
    items_json: *const c_char,
    stack: *const c_char,
    at_unix_secs: i64,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let json_str = require!(cstr_to_string(items_json), "Invalid items JSON string pointer");
    let stack_str = require!(cstr_to_string(stack), "Invalid stack string pointer");
    let at = require!(unix_to_utc(at_unix_secs), "Timestamp out of range");

    let stack: Stack = match stack_str.parse() {
        Ok(stack) => stack,
        Err(e) => {
            set_last_error(&format!("{e}"));
            return ptr::null_mut();
        }
    };
    let items: Vec<StoredItem> = match serde_json::from_str(&json_str) {
        Ok(items) => items,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match handle.processor.suggest(stack, at, &items) {
        Some(item) => match serde_json::to_string(item) {
            Ok(json) => string_to_cstr(&json),
            Err(e) => {
                set_last_error(&e.to_string());
                ptr::null_mut()
            }
        },
        None => ptr::null_mut(),
    }
}

/// Free a string returned by Resurface functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Resurface function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn resurface_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Resurface function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn resurface_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Resurface library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn resurface_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_719_824_400; // 2024-07-01T09:00:00Z

    fn sample_capture_json() -> CString {
        CString::new(
            r#"{
                "id": "0b4d9f1e-52c3-4a7e-8d6f-2e9a1c3b5d7f",
                "timestamp": "2024-07-01T07:45:00-04:00",
                "trigger": "quick_save",
                "text": "Deadlift 5x5, then 3 sets of pullups"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_ffi_capture_to_item() {
        let json = sample_capture_json();

        unsafe {
            let result = resurface_capture_to_item(json.as_ptr(), NOW);
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let item: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(item["stack"], "body");
            assert_eq!(item["state"], "fresh");

            resurface_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let json = sample_capture_json();
        let stack = CString::new("body").unwrap();

        unsafe {
            let processor = resurface_processor_new(ptr::null());
            assert!(!processor.is_null());

            let item = resurface_processor_process_capture(processor, json.as_ptr(), NOW);
            assert!(!item.is_null());

            let item_str = CStr::from_ptr(item).to_str().unwrap();
            let items_json = CString::new(format!("[{item_str}]")).unwrap();
            resurface_free_string(item);

            let best = resurface_processor_best_item(processor, items_json.as_ptr(), stack.as_ptr(), NOW + 60);
            assert!(!best.is_null());
            resurface_free_string(best);

            resurface_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_processor_with_invalid_config() {
        let config = CString::new(r#"{"freshness_horizon_seconds": 0}"#).unwrap();

        unsafe {
            let processor = resurface_processor_new(config.as_ptr());
            assert!(processor.is_null());
            assert!(!resurface_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_no_suggestion_is_not_an_error() {
        let items = CString::new("[]").unwrap();
        let stack = CString::new("mind").unwrap();

        unsafe {
            let result = resurface_best_item(items.as_ptr(), stack.as_ptr(), NOW);
            assert!(result.is_null());
            assert!(resurface_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let invalid_json = CString::new("not json").unwrap();

        unsafe {
            let result = resurface_capture_to_item(invalid_json.as_ptr(), NOW);
            assert!(result.is_null());

            let error = resurface_last_error();
            assert!(!error.is_null());

            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = resurface_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
