//! Integration tests for the delivery engine.
//!
//! Organization:
//!
//! - `harness.rs`     - Scriptable mock sink, manual reachability, test rig
//! - `delivery.rs`    - Send-now vs enqueue behavior and queue draining
//! - `reconnect.rs`   - Retry policy, backoff parking, reachability edges
//! - `reconfigure.rs` - Reconfiguration, idempotence, user-id decoration
//! - `status.rs`      - Status snapshot contracts and port validation
