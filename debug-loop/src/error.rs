// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Fatal errors that abort the debug loop.
///
/// `DumpWriteFailed` is intentionally absent here: a failed minidump capture
/// is logged and discarded, never surfaced to the caller of `run`.
#[derive(Debug, Error)]
pub enum DebugLoopError {
    #[error("{which} failed with OS error {code}")]
    OsCallFailed { which: &'static str, code: u32 },

    #[error("duplicate process id {0} on CREATE_PROCESS")]
    DuplicateProcessId(u32),

    #[error("duplicate thread id {0} on CREATE_THREAD")]
    DuplicateThreadId(u32),

    #[error("missing process id {0} for non-creational event")]
    MissingProcessId(u32),

    #[error("missing thread id {0} for non-creational event")]
    MissingThreadId(u32),
}
