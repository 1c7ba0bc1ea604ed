// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[macro_use]
extern crate log;

pub mod allowlist;
pub mod diff;
pub mod manager;

#[doc(inline)]
pub use allowlist::{AllowList, TargetAllowList};

#[doc(inline)]
pub use diff::UnifiedDiffFilter;

#[doc(inline)]
pub use manager::{CoverageFilter, CoverageSettings};
