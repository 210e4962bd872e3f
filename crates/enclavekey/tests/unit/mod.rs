//! Focused tests of the binary crate's parsing and error mapping.

mod cli_parse_test;
