// src/core/privilege.rs

use once_cell::sync::Lazy;

// Elevation cannot change while the process runs, so ask the OS once.
static ELEVATED: Lazy<bool> = Lazy::new(query_elevation);

/// Whether the process runs with administrator (or root) rights. Only used
/// to word the simulated-source advisory.
pub fn is_elevated() -> bool {
    *ELEVATED
}

#[cfg(windows)]
fn query_elevation() -> bool {
    use std::mem;
    use std::ptr;
    use winapi::ctypes::c_void;
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::{GetCurrentProcess, OpenProcessToken};
    use winapi::um::securitybaseapi::GetTokenInformation;
    use winapi::um::winnt::{TOKEN_ELEVATION, TOKEN_QUERY, TokenElevation};

    unsafe {
        let mut token: *mut c_void = ptr::null_mut();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
            tracing::debug!("OpenProcessToken failed, assuming not elevated");
            return false;
        }

        let mut elevation: TOKEN_ELEVATION = mem::zeroed();
        let mut size: u32 = 0;
        let ok = GetTokenInformation(
            token,
            TokenElevation,
            &mut elevation as *mut _ as *mut c_void,
            mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut size,
        );
        CloseHandle(token);

        ok != 0 && elevation.TokenIsElevated != 0
    }
}

#[cfg(unix)]
fn query_elevation() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(any(windows, unix)))]
fn query_elevation() -> bool {
    false
}
