//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the gateway against an
//! in-memory controller. No serial hardware required.

mod gateway_tests;
mod mock_device;
