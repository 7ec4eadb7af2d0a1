//! C ABI for embedding hosts that are not written in Rust.
//!
//! Hosts are referred to by opaque `u64` handles; 0 means failure. Strings
//! cross the boundary as NUL-terminated UTF-8. Strings returned by
//! `hb_host_dispatch` are owned by the caller and must be released with
//! `hb_string_free`.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::{LazyLock, Mutex, MutexGuard};

use crate::demo;
use crate::dispatcher::{unknown_command, Dispatcher, HostResult};
use crate::handle::HandleStore;

pub const HB_OK: i32 = 0;
pub const HB_REJECTED: i32 = 1;
pub const HB_INVALID: i32 = -1;

/// Command implemented in C.
///
/// Receives the payload and the `user_data` given at registration. Writes
/// `HB_OK` or any other value (failure) to `status` and returns the response
/// or failure message. The returned string only needs to stay valid until
/// the callback returns; it is copied immediately. NULL means an empty string.
pub type HbCommandFn =
    unsafe extern "C" fn(payload: *const c_char, user_data: *mut c_void, status: *mut i32) -> *const c_char;

struct HostState {
    dispatcher: Dispatcher,
    last_error: Option<CString>,
}

static HOSTS: LazyLock<Mutex<HandleStore<HostState>>> = LazyLock::new(|| Mutex::new(HandleStore::new()));

fn hosts() -> MutexGuard<'static, HandleStore<HostState>> {
    HOSTS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_last_error(host: u64, message: &str) {
    log::error!("[ffi] host {host}: {message}");
    if let Some(state) = hosts().get_mut(host) {
        state.last_error = CString::new(message.replace('\0', " ")).ok();
    }
}

/// Borrow a C string as UTF-8. NULL and invalid UTF-8 give `None`.
///
/// # Safety
/// `ptr` must be NULL or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn write_status(status: *mut i32, value: i32) {
    if !status.is_null() {
        unsafe { *status = value };
    }
}

struct ForeignCommand {
    callback: HbCommandFn,
    user_data: *mut c_void,
}

// The embedder promises the callback and its user data may be used from any thread.
unsafe impl Send for ForeignCommand {}
unsafe impl Sync for ForeignCommand {}

impl ForeignCommand {
    fn call(&self, payload: &str) -> HostResult {
        let payload = CString::new(payload).map_err(|_| "payload contains a NUL byte".to_string())?;
        let mut status = HB_OK;
        let out = unsafe { (self.callback)(payload.as_ptr(), self.user_data, &mut status) };
        let text = if out.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(out) }.to_string_lossy().into_owned()
        };
        if status == HB_OK {
            Ok(text)
        } else {
            Err(text)
        }
    }
}

// ============================================================
// FFI: Lifecycle
// ============================================================

/// Create a host. With `with_demo != 0` it starts with the example commands.
/// Returns a host handle (> 0).
#[no_mangle]
pub extern "C" fn hb_host_create(with_demo: i32) -> u64 {
    let _ = env_logger::try_init();

    let dispatcher = if with_demo != 0 { demo::dispatcher() } else { Dispatcher::new() };
    let mut store = hosts();
    let handle = store.insert(HostState {
        dispatcher,
        last_error: None,
    });
    log::info!("[ffi] created host {handle} ({} live)", store.len());
    handle
}

/// Destroy a host. Unknown handles are ignored.
#[no_mangle]
pub extern "C" fn hb_host_destroy(host: u64) {
    if hosts().remove(host).is_some() {
        log::info!("[ffi] destroyed host {host}");
    }
}

// ============================================================
// FFI: Commands
// ============================================================

/// Register (or replace) a C command. Returns `HB_OK` or `HB_INVALID`.
#[no_mangle]
pub extern "C" fn hb_host_register(
    host: u64,
    command: *const c_char,
    callback: Option<HbCommandFn>,
    user_data: *mut c_void,
) -> i32 {
    let Some(name) = (unsafe { read_str(command) }).filter(|n| !n.is_empty()) else {
        set_last_error(host, "command name must be a non-empty UTF-8 string");
        return HB_INVALID;
    };
    let Some(callback) = callback else {
        set_last_error(host, "callback must not be NULL");
        return HB_INVALID;
    };

    let foreign = ForeignCommand { callback, user_data };
    match hosts().get_mut(host) {
        Some(state) => {
            state.dispatcher.register(name, move |payload: &str| foreign.call(payload));
            HB_OK
        }
        None => HB_INVALID,
    }
}

/// Run `command` with `payload` (NULL = empty) on the calling thread.
///
/// Writes `HB_OK`, `HB_REJECTED` or `HB_INVALID` to `status`. Returns the
/// response (or rejection message) as an owned string, or NULL when the
/// call was invalid; see `hb_host_last_error`.
#[no_mangle]
pub extern "C" fn hb_host_dispatch(
    host: u64,
    command: *const c_char,
    payload: *const c_char,
    status: *mut i32,
) -> *mut c_char {
    let Some(name) = (unsafe { read_str(command) }).filter(|n| !n.is_empty()) else {
        set_last_error(host, "command name must be a non-empty UTF-8 string");
        write_status(status, HB_INVALID);
        return std::ptr::null_mut();
    };
    let payload = if payload.is_null() {
        ""
    } else {
        match unsafe { read_str(payload) } {
            Some(p) => p,
            None => {
                set_last_error(host, "payload is not valid UTF-8");
                write_status(status, HB_INVALID);
                return std::ptr::null_mut();
            }
        }
    };

    // Release the store before running the handler so callbacks may call back in.
    let handler = match hosts().get(host) {
        Some(state) => state.dispatcher.handler(name),
        None => {
            write_status(status, HB_INVALID);
            return std::ptr::null_mut();
        }
    };
    let outcome = match handler {
        Some(handler) => handler(payload),
        None => Err(unknown_command(name)),
    };

    let (code, text) = match outcome {
        Ok(text) => (HB_OK, text),
        Err(message) => (HB_REJECTED, message),
    };
    match CString::new(text) {
        Ok(c_str) => {
            write_status(status, code);
            c_str.into_raw()
        }
        Err(_) => {
            set_last_error(host, &format!("response to '{name}' contains a NUL byte"));
            write_status(status, HB_INVALID);
            std::ptr::null_mut()
        }
    }
}

/// Release a string returned by `hb_host_dispatch`. NULL is ignored.
#[no_mangle]
pub extern "C" fn hb_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ============================================================
// FFI: Error handling
// ============================================================

/// Last error recorded for `host`, or NULL. Valid until the next failing
/// call on the same host or its destruction.
#[no_mangle]
pub extern "C" fn hb_host_last_error(host: u64) -> *const c_char {
    match hosts().get(host) {
        Some(HostState {
            last_error: Some(err), ..
        }) => err.as_ptr(),
        _ => std::ptr::null(),
    }
}
