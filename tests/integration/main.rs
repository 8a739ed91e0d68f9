//! Integration tests for tg-forward

mod forward_tests;
mod service_tests;
mod session_tests;
