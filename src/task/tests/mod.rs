//! Unit tests for fix-task orchestration.

mod domain_tests;
