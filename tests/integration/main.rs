//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware required.

mod access_flow_tests;
mod auth_client_tests;
mod mock_hw;
mod telemetry_tests;

// Links the std critical-section implementation the telemetry channel needs.
use critical_section as _;
