// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// codescan-pipeline: the adaptive scanning strategy.
//
// A page is probed for emptiness, decoded whole, cleaned once, then searched
// region by region over a coarse-to-fine tiling until something decodes.
// The dispatcher fans the pages of a document out over a bounded set of
// workers, each holding one pooled decoder handle, and merges their results
// into a page-indexed map.

pub mod dispatch;
pub mod pipeline;
pub mod regions;

pub use dispatch::Scanner;
pub use pipeline::{PageOutcome, PagePipeline, Stage};
pub use regions::{Regions, regions};
