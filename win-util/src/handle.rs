// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use winapi::um::{handleapi::CloseHandle, winnt::HANDLE};

/// Owns a Win32 handle for the scope of this value and closes it on drop.
///
/// Used to release event-embedded file handles (`CREATE_PROCESS`/`LOAD_DLL`)
/// on every exit path out of the scope that received them, including when the
/// scope unwinds due to a handler error.
pub struct Handle(pub HANDLE);

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}
