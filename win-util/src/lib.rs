// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(windows)]

pub mod file;
pub mod handle;

use winapi::shared::minwindef::{BOOL, FALSE};

pub fn last_os_error() -> anyhow::Error {
    std::io::Error::last_os_error().into()
}

/// Run a Win32 call that signals failure by returning `FALSE`, turning it
/// into a `Result` via `GetLastError`.
pub fn check_winapi(f: impl FnOnce() -> BOOL) -> anyhow::Result<()> {
    if f() == FALSE {
        Err(last_os_error())
    } else {
        Ok(())
    }
}
