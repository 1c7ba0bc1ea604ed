// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The single-threaded Win32 debug-event pump: spawns (or attaches to) a
//! debuggee, tracks its process/thread tree, classifies exceptions through a
//! [`DebugEventsHandler`], and optionally captures a minidump on crash.

use std::mem::MaybeUninit;
use std::os::windows::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command};

use anyhow::{Context, Result};
use log::{error, trace, warn};
use win_util::handle::Handle;
use winapi::{
    shared::minwindef::{BOOL, DWORD, FALSE, TRUE},
    um::{
        debugapi::{ContinueDebugEvent, WaitForDebugEvent},
        errhandlingapi::GetLastError,
        winbase::{DebugSetProcessKillOnExit, DEBUG_ONLY_THIS_PROCESS, DEBUG_PROCESS, INFINITE},
        winnt::{DBG_CONTINUE, DBG_EXCEPTION_NOT_HANDLED, HANDLE},
    },
};

use crate::debug_event::{DebugEvent, DebugEventInfo};
use crate::dump::capture_crash_dump;
use crate::error::DebugLoopError;
use crate::exception::{decide_exception, Continue, ExceptionPolicy};
use crate::handler::{
    CreateProcessInfo, DebugEventsHandler, ExceptionInfo, ExitProcessInfo, LoadDllInfo,
    UnloadDllInfo,
};
use crate::tables::{ProcessTable, ThreadTable};

/// Run a Win32 call that signals failure by returning `FALSE`, turning it
/// into a typed [`DebugLoopError::OsCallFailed`] carrying the primitive's
/// name and `GetLastError()` code.
fn os_call(which: &'static str, f: impl FnOnce() -> BOOL) -> Result<(), DebugLoopError> {
    if f() == FALSE {
        Err(DebugLoopError::OsCallFailed {
            which,
            code: unsafe { GetLastError() },
        })
    } else {
        Ok(())
    }
}

/// Policy knobs for the loop's exception table and crash-dump capture.
#[derive(Debug, Clone)]
pub struct DebugLoopConfig {
    /// Ask the OS to report events for descendant processes too, instead of
    /// only the one spawned directly.
    pub cover_children: bool,
    /// Treat an uninstrumented breakpoint (assertion failure, `int3`) as a
    /// stop condition instead of silently swallowing it.
    pub stop_on_assert: bool,
    /// Let a recognized C++ exception propagate to the debuggee's own
    /// handlers instead of treating it as fatal to the loop.
    pub continue_after_cpp_exception: bool,
    /// Write a minidump for crashing (non first-chance) exceptions.
    pub dump_on_crash: bool,
    /// Destination directory for captured minidumps. Required when
    /// `dump_on_crash` is set.
    pub dump_directory: Option<PathBuf>,
}

impl Default for DebugLoopConfig {
    fn default() -> Self {
        Self {
            cover_children: true,
            stop_on_assert: false,
            continue_after_cpp_exception: true,
            dump_on_crash: false,
            dump_directory: None,
        }
    }
}

impl DebugLoopConfig {
    fn exception_policy(&self) -> ExceptionPolicy {
        ExceptionPolicy {
            stop_on_assert: self.stop_on_assert,
            continue_after_cpp_exception: self.continue_after_cpp_exception,
            dump_on_crash: self.dump_on_crash,
        }
    }
}

/// The outcome of running a debuggee to completion.
#[derive(Debug, Clone, Copy)]
pub struct DebugLoopResult {
    /// The root process's exit code. Latched once by whichever event first
    /// supplies one for the root pid — either its own `EXIT_PROCESS`, or an
    /// earlier exception whose continuation directive implied an exit code
    /// (e.g. a swallowed assertion, or a continued C++ exception). Never
    /// overwritten afterwards.
    pub exit_code: i32,
}

pub struct DebugLoop {
    config: DebugLoopConfig,
    processes: ProcessTable,
    threads: ThreadTable,
    root_process_id: u32,
    root_process_handle: HANDLE,
    root_exit_code: Option<i32>,
}

// The loop only ever touches its Win32 handles from the single thread that
// owns it; `Child` itself is already `Send`.
unsafe impl Send for DebugLoop {}

impl DebugLoop {
    /// Spawn `command` under the debugger and block until its initial
    /// `CREATE_PROCESS_DEBUG_EVENT` has been consumed.
    ///
    /// `config.cover_children` selects `DEBUG_PROCESS` (descendant processes
    /// also report events) versus `DEBUG_ONLY_THIS_PROCESS` (only the one
    /// spawned here).
    pub fn start(
        mut command: Command,
        config: DebugLoopConfig,
        handler: &mut impl DebugEventsHandler,
    ) -> Result<(Self, Child)> {
        if config.dump_on_crash && config.dump_directory.is_none() {
            anyhow::bail!("dump_on_crash requires a dump_directory");
        }

        let creation_flags = if config.cover_children {
            DEBUG_PROCESS
        } else {
            DEBUG_ONLY_THIS_PROCESS
        };

        let child = command
            .creation_flags(creation_flags)
            .spawn()
            .context("debuggee failed to start")?;

        os_call("DebugSetProcessKillOnExit", || unsafe {
            DebugSetProcessKillOnExit(TRUE)
        })?;

        // The kernel blocks the target until its CREATE_PROCESS event is
        // consumed, so an indefinite wait here cannot hang on a healthy
        // debuggee.
        let mut de = MaybeUninit::uninit();
        os_call("WaitForDebugEvent", || unsafe {
            WaitForDebugEvent(de.as_mut_ptr(), INFINITE)
        })?;
        let de = unsafe { de.assume_init() };
        let de = DebugEvent::new(&de);

        let DebugEventInfo::CreateProcess(info) = de.info() else {
            anyhow::bail!("unexpected initial debug event: {}", de);
        };
        trace!("{}", de);

        let mut processes = ProcessTable::new();
        let mut threads = ThreadTable::new();
        processes.insert(de.process_id(), info.hProcess as usize)?;
        threads.insert(de.thread_id(), info.hThread as usize)?;

        {
            // Scoped release of the event's embedded file handle, regardless
            // of how `on_create_process` returns (including unwinding).
            let _file_handle = Handle(info.hFile);
            let path = win_util::file::get_path_from_handle(info.hFile)
                .unwrap_or_else(|_| "???".into());
            handler.on_create_process(&CreateProcessInfo {
                path,
                base_address: info.lpBaseOfImage as u64,
            });
        }

        os_call("ContinueDebugEvent", || unsafe {
            ContinueDebugEvent(de.process_id(), de.thread_id(), DBG_CONTINUE)
        })?;

        let debug_loop = DebugLoop {
            config,
            processes,
            threads,
            root_process_id: de.process_id(),
            root_process_handle: info.hProcess,
            root_exit_code: None,
        };

        Ok((debug_loop, child))
    }

    /// Pump debug events until every tracked process has exited.
    pub fn run(&mut self, handler: &mut impl DebugEventsHandler) -> Result<DebugLoopResult> {
        while !self.processes.is_empty() {
            let mut de = MaybeUninit::uninit();
            os_call("WaitForDebugEvent", || unsafe {
                WaitForDebugEvent(de.as_mut_ptr(), INFINITE)
            })?;
            let de = unsafe { de.assume_init() };
            let de = DebugEvent::new(&de);
            trace!("{}", de);

            if let DebugEventInfo::CreateThread(info) = de.info() {
                self.threads.insert(de.thread_id(), info.hThread as usize)?;
            }

            let continue_status = match self.dispatch(&de, handler) {
                Ok(status) => status,
                Err(err) => {
                    error!("error processing debug event: {:#}", err);
                    DBG_EXCEPTION_NOT_HANDLED
                }
            };

            os_call("ContinueDebugEvent", || unsafe {
                ContinueDebugEvent(de.process_id(), de.thread_id(), continue_status)
            })?;
        }

        Ok(DebugLoopResult {
            exit_code: self.root_exit_code.unwrap_or(0),
        })
    }

    fn dispatch(&mut self, de: &DebugEvent, handler: &mut impl DebugEventsHandler) -> Result<DWORD> {
        match de.info() {
            DebugEventInfo::CreateProcess(info) => {
                // A nested debuggee-spawned process: already tracked via the
                // loop's own CREATE_PROCESS wait for the root, so any other
                // occurrence here is a genuine child of the tree.
                self.processes.insert(de.process_id(), info.hProcess as usize)?;
                self.threads.insert(de.thread_id(), info.hThread as usize)?;

                {
                    let _file_handle = Handle(info.hFile);
                    let path = win_util::file::get_path_from_handle(info.hFile)
                        .unwrap_or_else(|_| "???".into());
                    handler.on_create_process(&CreateProcessInfo {
                        path,
                        base_address: info.lpBaseOfImage as u64,
                    });
                }
                Ok(DBG_CONTINUE)
            }

            DebugEventInfo::ExitProcess(info) => {
                // The process's final thread exits together with it; there is
                // no separate EXIT_THREAD for it.
                self.threads.remove(de.thread_id())?;
                handler.on_exit_thread(de.thread_id());

                self.processes.remove(de.process_id())?;
                if de.process_id() == self.root_process_id && self.root_exit_code.is_none() {
                    self.root_exit_code = Some(info.dwExitCode as i32);
                }
                handler.on_exit_process(&ExitProcessInfo {
                    exit_code: info.dwExitCode as i32,
                });
                Ok(DBG_CONTINUE)
            }

            DebugEventInfo::ExitThread(_info) => {
                self.threads.remove(de.thread_id())?;
                Ok(DBG_CONTINUE)
            }

            DebugEventInfo::LoadDll(info) => {
                let _file_handle = Handle(info.hFile);
                let path = win_util::file::get_path_from_handle(info.hFile)
                    .unwrap_or_else(|_| "???".into());
                handler.on_load_dll(&LoadDllInfo {
                    path,
                    base_address: info.lpBaseOfDll as u64,
                });
                Ok(DBG_CONTINUE)
            }

            DebugEventInfo::UnloadDll(info) => {
                handler.on_unload_dll(&UnloadDllInfo {
                    base_address: info.lpBaseOfDll as u64,
                });
                Ok(DBG_CONTINUE)
            }

            DebugEventInfo::Exception(info) => self.dispatch_exception(de, info, handler),

            DebugEventInfo::Rip(info) => {
                warn!("RIP debug event: error=0x{:x} type={}", info.dwError, info.dwType);
                Ok(DBG_CONTINUE)
            }

            DebugEventInfo::CreateThread(_) | DebugEventInfo::Unknown => Ok(DBG_CONTINUE),
        }
    }

    fn dispatch_exception(
        &mut self,
        de: &DebugEvent,
        info: &winapi::um::minwinbase::EXCEPTION_DEBUG_INFO,
        handler: &mut impl DebugEventsHandler,
    ) -> Result<DWORD> {
        let exception_code = info.ExceptionRecord.ExceptionCode;
        let exception_address = info.ExceptionRecord.ExceptionAddress as u64;
        let first_chance = info.dwFirstChance != 0;

        let outcome = handler.on_exception(&ExceptionInfo {
            exception_code,
            exception_address,
            first_chance,
        });

        let decision = decide_exception(
            outcome,
            exception_code,
            first_chance,
            &self.config.exception_policy(),
        );

        if decision.capture_dump {
            if let Some(dump_directory) = self.config.dump_directory.clone() {
                let process_handle = self.processes.get(de.process_id())? as HANDLE;
                let thread_handle = self.threads.get(de.thread_id())? as HANDLE;
                match capture_crash_dump(
                    process_handle,
                    thread_handle,
                    de.process_id(),
                    info,
                    &dump_directory,
                ) {
                    Ok(path) => trace!("captured crash dump at {}", path.display()),
                    Err(err) => error!("failed to capture crash dump: {:#}", err),
                }
            }
        }

        if let Some(exit_code) = decision.status.exit_code {
            if de.process_id() == self.root_process_id && self.root_exit_code.is_none() {
                self.root_exit_code = Some(exit_code);
            }
        }

        Ok(match decision.status.continue_status {
            Some(Continue::Consume) | None => DBG_CONTINUE,
            Some(Continue::NotHandled) => DBG_EXCEPTION_NOT_HANDLED,
        })
    }

    pub fn root_process_handle(&self) -> HANDLE {
        self.root_process_handle
    }
}
