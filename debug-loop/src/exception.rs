// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pure decision logic for the exception-handling policy described in the
//! Debug Loop's exception table. Kept free of any Win32 dependency so it can
//! be unit tested without a live debuggee.

use crate::handler::ExceptionOutcome;

/// The Win32 code for `EXCEPTION_BREAKPOINT` (`0x80000003`), used as the
/// transient exit code when an `InvalidBreakPoint` is swallowed.
const EXCEPTION_BREAKPOINT_CODE: u32 = 0x8000_0003;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continue {
    /// Continue and consume the exception.
    Consume,
    /// Continue and let the target's own handler see it.
    NotHandled,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStatus {
    pub exit_code: Option<i32>,
    pub continue_status: Option<Continue>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExceptionPolicy {
    pub stop_on_assert: bool,
    pub continue_after_cpp_exception: bool,
    pub dump_on_crash: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ExceptionDecision {
    pub status: ProcessStatus,
    pub capture_dump: bool,
}

/// Decide the continuation directive and crash-dump policy for a classified
/// exception, per the Debug Loop's exception table.
pub fn decide_exception(
    outcome: ExceptionOutcome,
    exception_code: u32,
    first_chance: bool,
    policy: &ExceptionPolicy,
) -> ExceptionDecision {
    use ExceptionOutcome::*;

    match outcome {
        BreakPoint => ExceptionDecision {
            status: ProcessStatus {
                exit_code: None,
                continue_status: Some(Continue::Consume),
            },
            capture_dump: false,
        },

        InvalidBreakPoint => {
            // Always dumps on first chance: the target rarely catches this.
            let capture_dump = policy.dump_on_crash;
            let status = if policy.stop_on_assert {
                ProcessStatus {
                    exit_code: None,
                    continue_status: Some(Continue::NotHandled),
                }
            } else {
                ProcessStatus {
                    exit_code: Some(EXCEPTION_BREAKPOINT_CODE as i32),
                    continue_status: Some(Continue::Consume),
                }
            };
            ExceptionDecision {
                status,
                capture_dump,
            }
        }

        NotHandled | Error => ExceptionDecision {
            status: ProcessStatus {
                exit_code: None,
                continue_status: Some(Continue::NotHandled),
            },
            capture_dump: policy.dump_on_crash && !first_chance,
        },

        CppError => {
            let capture_dump = policy.dump_on_crash && !first_chance;
            let status = if policy.continue_after_cpp_exception {
                ProcessStatus {
                    exit_code: Some(exception_code as i32),
                    continue_status: Some(Continue::Consume),
                }
            } else {
                ProcessStatus {
                    exit_code: None,
                    continue_status: Some(Continue::NotHandled),
                }
            };
            ExceptionDecision {
                status,
                capture_dump,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(stop_on_assert: bool, continue_after_cpp: bool, dump_on_crash: bool) -> ExceptionPolicy {
        ExceptionPolicy {
            stop_on_assert,
            continue_after_cpp_exception: continue_after_cpp,
            dump_on_crash,
        }
    }

    #[test]
    fn test_breakpoint_always_consumed_never_dumped() {
        let decision = decide_exception(
            ExceptionOutcome::BreakPoint,
            0,
            true,
            &policy(true, true, true),
        );
        assert_eq!(decision.status.continue_status, Some(Continue::Consume));
        assert_eq!(decision.status.exit_code, None);
        assert!(!decision.capture_dump);
    }

    #[test]
    fn test_invalid_breakpoint_stop_on_assert() {
        let decision = decide_exception(
            ExceptionOutcome::InvalidBreakPoint,
            0,
            false,
            &policy(true, false, true),
        );
        assert_eq!(
            decision.status.continue_status,
            Some(Continue::NotHandled)
        );
        assert!(decision.capture_dump);
    }

    #[test]
    fn test_invalid_breakpoint_swallowed() {
        let decision = decide_exception(
            ExceptionOutcome::InvalidBreakPoint,
            0,
            false,
            &policy(false, false, true),
        );
        assert_eq!(decision.status.continue_status, Some(Continue::Consume));
        assert_eq!(decision.status.exit_code, Some(0x8000_0003u32 as i32));
        // Dumps even though this isn't first-chance marked by the caller -
        // InvalidBreakPoint always passes includeFirstChance=true.
        assert!(decision.capture_dump);
    }

    #[test]
    fn test_not_handled_suppresses_dump_on_first_chance() {
        let decision = decide_exception(
            ExceptionOutcome::NotHandled,
            0,
            true,
            &policy(false, false, true),
        );
        assert!(!decision.capture_dump);

        let decision = decide_exception(
            ExceptionOutcome::NotHandled,
            0,
            false,
            &policy(false, false, true),
        );
        assert!(decision.capture_dump);
    }

    #[test]
    fn test_cpp_error_continue_after() {
        let decision = decide_exception(
            ExceptionOutcome::CppError,
            0xE06D7363,
            false,
            &policy(false, true, true),
        );
        assert_eq!(decision.status.continue_status, Some(Continue::Consume));
        assert_eq!(decision.status.exit_code, Some(0xE06D7363u32 as i32));
        assert!(decision.capture_dump);
    }

    #[test]
    fn test_cpp_error_not_continued() {
        let decision = decide_exception(
            ExceptionOutcome::CppError,
            0xE06D7363,
            false,
            &policy(false, false, true),
        );
        assert_eq!(
            decision.status.continue_status,
            Some(Continue::NotHandled)
        );
        assert_eq!(decision.status.exit_code, None);
    }
}
