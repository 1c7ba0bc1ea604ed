// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;

/// Notified after the process/thread handle tables have already been updated
/// for the event being reported.
pub struct CreateProcessInfo {
    pub path: PathBuf,
    pub base_address: u64,
}

pub struct ExitProcessInfo {
    /// The authoritative per-process exit code.
    pub exit_code: i32,
}

pub struct LoadDllInfo {
    pub path: PathBuf,
    pub base_address: u64,
}

pub struct UnloadDllInfo {
    pub base_address: u64,
}

pub struct ExceptionInfo {
    pub exception_code: u32,
    pub exception_address: u64,
    pub first_chance: bool,
}

/// The handler's classification of an exception, driving the loop's
/// continuation and crash-dump policy. Closed by design: the loop's exception
/// dispatch matches all five variants exhaustively, so there is no "unknown
/// classification" runtime state to guard against the way a non-enum port
/// would have to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionOutcome {
    /// A breakpoint the loop itself installed for coverage instrumentation.
    BreakPoint,
    /// A breakpoint the loop did not install (assertion failure, `int3`).
    InvalidBreakPoint,
    /// An exception the handler chose not to interpret.
    NotHandled,
    /// Same as `NotHandled`, distinguished only for the handler's own logging.
    Error,
    /// A recognized language-level (C++) thrown exception.
    CppError,
}

pub trait DebugEventsHandler {
    fn on_create_process(&mut self, _info: &CreateProcessInfo) {}
    fn on_exit_process(&mut self, _info: &ExitProcessInfo) {}
    fn on_exit_thread(&mut self, _thread_id: u32) {}
    fn on_load_dll(&mut self, _info: &LoadDllInfo) {}
    fn on_unload_dll(&mut self, _info: &UnloadDllInfo) {}

    /// Classify an exception the loop did not recognize as one of its own
    /// debugger notifications. No default matches the teacher's
    /// `DBG_EXCEPTION_NOT_HANDLED` default continuation behavior.
    fn on_exception(&mut self, _info: &ExceptionInfo) -> ExceptionOutcome {
        ExceptionOutcome::NotHandled
    }
}
