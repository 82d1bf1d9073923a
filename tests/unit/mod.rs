//! Unit test modules.

mod zones_test;
