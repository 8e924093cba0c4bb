//! Kronos E2E Verification Harness
//!
//! Drives the web management UI of Kronos timing/GNSS devices through
//! Playwright and verifies behavior against a per-model capability registry.
//!
//! # Architecture
//!
//! ```text
//! HarnessConfig ──> Harness ──> DeviceProbe      (is anything listening?)
//!                      │
//!                      ├──> PlaywrightDriver ──> PageSnapshot  (UI boundary)
//!                      │
//!                      ├──> TableWaiter          (structure rendered?)
//!                      ├──> ModelResolver        (which device is this?)
//!                      ├──> AdaptiveExtractor    (read fields, tiered)
//!                      │
//!                      └──> ExecutionAggregator  (run capability matrix)
//!                                 │
//!                                 └──> RunReport (JSON)
//! ```
//!
//! Decision logic lives in `kronos-common` and is pure; everything that
//! touches a browser or the network lives here. The driver reduces each page
//! interaction to a [`snapshot::PageSnapshot`], so extraction, resolution,
//! and verification are all testable against synthetic snapshots.

pub mod aggregator;
pub mod caps;
pub mod config;
pub mod device;
pub mod error;
pub mod extract;
pub mod playwright;
pub mod resolver;
pub mod runner;
pub mod snapshot;
pub mod waiter;

pub use aggregator::{Classification, ExecutionAggregator, RunOutcome};
pub use caps::SupportsPerformanceValidation;
pub use config::HarnessConfig;
pub use device::DeviceProbe;
pub use error::{E2eError, E2eResult};
pub use extract::{AdaptiveExtractor, Confidence, ExtractionResult, FieldSpec};
pub use playwright::{Browser, PlaywrightDriver, UiAction};
pub use resolver::ModelResolver;
pub use runner::{Harness, RunReport};
pub use snapshot::PageSnapshot;
pub use waiter::TableWaiter;
