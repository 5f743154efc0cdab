//! Integration tests for Sumi-Check
//!
//! These tests use wiremock to create mock HTTP servers and tempfile for
//! local file trees.

mod check_tests;
mod crawl_tests;
