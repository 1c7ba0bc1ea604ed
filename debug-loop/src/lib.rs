// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Allow safe functions that take `HANDLE` arguments.
//
// Though they type alias raw pointers, they are opaque. In the future, we will
// wrap them in a newtype. This will witness that they were obtained via win32
// API calls or documented pseudohandle construction.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

// The event pump itself is Win32-only. The exception policy table and the
// process/thread bookkeeping it drives are kept free of any FFI dependency
// (see `tables` and `exception`) so they can be exercised by `cargo test` on
// any host, not just under a live Windows debuggee.
#[cfg(windows)]
mod debug_event;
#[cfg(windows)]
mod debug_loop;
#[cfg(windows)]
mod dump;
mod error;
mod exception;
mod handler;
mod tables;

#[cfg(windows)]
pub use self::debug_loop::{DebugLoop, DebugLoopConfig, DebugLoopResult};
pub use self::{
    error::DebugLoopError,
    exception::{Continue, ExceptionDecision, ExceptionPolicy, ProcessStatus},
    handler::{
        CreateProcessInfo, DebugEventsHandler, ExceptionInfo, ExceptionOutcome, ExitProcessInfo,
        LoadDllInfo, UnloadDllInfo,
    },
};
