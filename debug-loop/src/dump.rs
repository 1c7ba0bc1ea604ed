// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Minidump capture on crash, via `MiniDumpWriteDump`.
//!
//! `winapi` 0.3 does not vendor DbgHelp's minidump-writing API (only the
//! symbol-handler half of `dbghelp.dll`), so the one function and struct this
//! module needs are declared directly against the real DLL export in
//! [`mini_dump_ffi`], following the same `extern "system"` + `#[repr(C)]`
//! convention `winapi` itself uses.

use std::os::windows::io::AsRawHandle;
use std::path::{Path, PathBuf};
use std::ptr::null_mut;

use anyhow::{Context, Result};
use winapi::{
    shared::minwindef::{DWORD, FALSE},
    um::{
        minwinbase::EXCEPTION_DEBUG_INFO,
        processthreadsapi::{GetThreadContext, GetThreadId},
        winnt::{CONTEXT, CONTEXT_ALL, EXCEPTION_POINTERS, HANDLE},
    },
};

use mini_dump_ffi::{MiniDumpWriteDump, MINIDUMP_EXCEPTION_INFORMATION, MINI_DUMP_NORMAL};

mod mini_dump_ffi {
    use winapi::{
        shared::minwindef::{BOOL, DWORD, ULONG32},
        um::winnt::{EXCEPTION_POINTERS, HANDLE},
    };

    pub const MINI_DUMP_NORMAL: DWORD = 0x0000_0000;

    #[repr(C)]
    pub struct MINIDUMP_EXCEPTION_INFORMATION {
        pub ThreadId: DWORD,
        pub ExceptionPointers: *mut EXCEPTION_POINTERS,
        pub ClientPointers: BOOL,
    }

    #[link(name = "dbghelp")]
    extern "system" {
        pub fn MiniDumpWriteDump(
            h_process: HANDLE,
            process_id: DWORD,
            h_file: HANDLE,
            dump_type: ULONG32,
            exception_param: *mut MINIDUMP_EXCEPTION_INFORMATION,
            user_stream_param: *mut std::ffi::c_void,
            callback_param: *mut std::ffi::c_void,
        ) -> BOOL;
    }
}

/// Writes a minidump for the current exception to `dump_directory`, returning
/// the path written. `process_handle` and `thread_handle` must be the raw
/// debuggee handles already known to the loop's process/thread tables.
pub fn capture_crash_dump(
    process_handle: HANDLE,
    thread_handle: HANDLE,
    process_id: u32,
    exception_info: &EXCEPTION_DEBUG_INFO,
    dump_directory: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dump_directory)
        .with_context(|| format!("creating dump directory {}", dump_directory.display()))?;

    let dump_path = dump_directory.join(dump_file_name(process_id));
    let dump_file = std::fs::File::create(&dump_path)
        .with_context(|| format!("creating dump file {}", dump_path.display()))?;

    let mut context: CONTEXT = unsafe { std::mem::zeroed() };
    context.ContextFlags = CONTEXT_ALL;
    if unsafe { GetThreadContext(thread_handle, &mut context) } == FALSE {
        return Err(win_util::last_os_error()).context("GetThreadContext failed");
    }

    let mut exception_pointers: EXCEPTION_POINTERS = unsafe { std::mem::zeroed() };
    // SAFETY: `ExceptionRecord` is a plain struct owned by the caller's
    // `exception_info`; `ContextRecord` points at our freshly-filled context.
    // Both outlive the `MiniDumpWriteDump` call below.
    exception_pointers.ExceptionRecord =
        &exception_info.ExceptionRecord as *const _ as *mut _;
    exception_pointers.ContextRecord = &mut context;

    let mut exception_param = MINIDUMP_EXCEPTION_INFORMATION {
        ThreadId: unsafe { GetThreadId(thread_handle) },
        ExceptionPointers: &mut exception_pointers,
        ClientPointers: FALSE,
    };

    let result = unsafe {
        MiniDumpWriteDump(
            process_handle,
            process_id as DWORD,
            dump_file.as_raw_handle() as HANDLE,
            MINI_DUMP_NORMAL,
            &mut exception_param,
            null_mut(),
            null_mut(),
        )
    };

    if result == FALSE {
        return Err(win_util::last_os_error()).context("MiniDumpWriteDump failed");
    }

    Ok(dump_path)
}

fn dump_file_name(process_id: u32) -> String {
    format!(
        "crash-{}-{}.dmp",
        process_id,
        chrono::Local::now().format("%Y-%m-%d-%H-%M-%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_file_name_format() {
        let name = dump_file_name(4242);
        assert!(name.starts_with("crash-4242-"));
        assert!(name.ends_with(".dmp"));
        // crash- + pid + - + YYYY-MM-DD-HH-MM-SS + .dmp
        let stamp = name
            .strip_prefix("crash-4242-")
            .unwrap()
            .strip_suffix(".dmp")
            .unwrap();
        assert_eq!(stamp.split('-').count(), 6);
    }
}
