//! End-to-end command flows.

mod cipher_flow_test;
mod key_flow_test;
