//! Integration tests for the PLC control unit.
//!
//! These drive a complete `ScanEngine` through plant scenarios by writing
//! sensor inputs into the image between ticks, the same way the Modbus
//! server does at runtime.

mod integration;
