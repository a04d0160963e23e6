//! Core of a small disk-oriented relational database engine.
//!
//! Two subsystems make up the crate:
//!
//! - **Query execution** ([`executor`]): Volcano-style operators
//!   (sequential scan, index scan, projection, nested-loop join) pulled
//!   a row at a time, plus single-shot mutation executors that keep
//!   every secondary index consistent and log undo records.
//! - **Concurrency control** ([`tx`]): hierarchical two-phase locking
//!   with record S/X and table IS/IX/S/SIX/X modes, no-wait deadlock
//!   prevention, and a transaction manager whose abort path replays the
//!   undo log.
//!
//! Storage is reached through traits ([`heap::TableFile`],
//! [`index::IndexFile`]); the crate ships in-memory implementations,
//! and disk-backed ones plug in behind the same contracts.

pub mod catalog;
pub mod datum;
pub mod executor;
pub mod heap;
pub mod index;
pub mod tx;
