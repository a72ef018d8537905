// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// codescan-engine: symbol decoding.
//
// Defines the contract a barcode decoding engine fulfils, the production
// engine built on `rxing`, a single decode attempt over a page region, and
// the bounded pool that hands out exclusive engine handles to page workers.

pub mod attempt;
pub mod engine;
pub mod pool;
pub mod rxing_engine;

pub use attempt::decode_region;
pub use engine::DecodeEngine;
pub use pool::{HandlePool, Lease};
pub use rxing_engine::RxingEngine;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
