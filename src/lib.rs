//! Pont Chaban-Delmas Closure Feed Library
//!
//! This module exposes the cache, data, and web modules for use in integration tests.

pub mod cache;
pub mod calendar;
pub mod cli;
pub mod data;
pub mod web;
