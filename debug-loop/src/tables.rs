// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Handle tables for the process/thread tree owned by the debug loop.
//!
//! Handles are kept as an opaque `usize` here so the invariant-checking
//! logic can be unit tested without a live Win32 debuggee; the loop converts
//! to and from the real `HANDLE` type at the FFI boundary.

use std::collections::HashMap;

use crate::error::DebugLoopError;

pub type RawHandle = usize;

#[derive(Default)]
pub struct ProcessTable {
    processes: HashMap<u32, RawHandle>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pid: u32, handle: RawHandle) -> Result<(), DebugLoopError> {
        if self.processes.contains_key(&pid) {
            return Err(DebugLoopError::DuplicateProcessId(pid));
        }
        self.processes.insert(pid, handle);
        Ok(())
    }

    pub fn remove(&mut self, pid: u32) -> Result<RawHandle, DebugLoopError> {
        self.processes
            .remove(&pid)
            .ok_or(DebugLoopError::MissingProcessId(pid))
    }

    pub fn get(&self, pid: u32) -> Result<RawHandle, DebugLoopError> {
        self.processes
            .get(&pid)
            .copied()
            .ok_or(DebugLoopError::MissingProcessId(pid))
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }
}

#[derive(Default)]
pub struct ThreadTable {
    threads: HashMap<u32, RawHandle>,
}

impl ThreadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tid: u32, handle: RawHandle) -> Result<(), DebugLoopError> {
        if self.threads.contains_key(&tid) {
            return Err(DebugLoopError::DuplicateThreadId(tid));
        }
        self.threads.insert(tid, handle);
        Ok(())
    }

    pub fn remove(&mut self, tid: u32) -> Result<RawHandle, DebugLoopError> {
        self.threads
            .remove(&tid)
            .ok_or(DebugLoopError::MissingThreadId(tid))
    }

    pub fn get(&self, tid: u32) -> Result<RawHandle, DebugLoopError> {
        self.threads
            .get(&tid)
            .copied()
            .ok_or(DebugLoopError::MissingThreadId(tid))
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_table_invariants() {
        let mut table = ProcessTable::new();
        table.insert(100, 1).unwrap();
        assert_eq!(table.len(), 1);

        // Duplicate CREATE_PROCESS for an already-tracked pid is an error.
        assert!(matches!(
            table.insert(100, 2),
            Err(DebugLoopError::DuplicateProcessId(100))
        ));

        table.insert(200, 2).unwrap();
        assert_eq!(table.len(), 2);

        table.remove(100).unwrap();
        assert_eq!(table.len(), 1);

        // EXIT_PROCESS for an untracked pid is an error.
        assert!(matches!(
            table.remove(100),
            Err(DebugLoopError::MissingProcessId(100))
        ));

        table.remove(200).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_thread_table_invariants() {
        let mut table = ThreadTable::new();
        table.insert(1, 10).unwrap();
        assert!(matches!(
            table.insert(1, 11),
            Err(DebugLoopError::DuplicateThreadId(1))
        ));

        assert_eq!(table.get(1).unwrap(), 10);
        table.remove(1).unwrap();
        assert!(matches!(
            table.get(1),
            Err(DebugLoopError::MissingThreadId(1))
        ));
    }
}
