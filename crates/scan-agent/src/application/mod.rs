//! Application layer use cases for the scan agent.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules, here the `scan-core` classifier) and the infrastructure
//! (OS hooks, terminal, files).  Use cases here orchestrate domain objects
//! and talk to infrastructure only through traits, so every decision can be
//! unit-tested with mocks.
//!
//! # Sub-modules
//!
//! - **`mode_manager`** – Decides which capture source is live, owns the
//!   one-time consent gate for system-wide capture, and reacts to window
//!   lifecycle signals.
//!
//! - **`dispatch`** – The single consumer of the key queue.  Runs every key
//!   through the keystroke classifier and hands accepted barcodes to the
//!   downstream consumer.

pub mod dispatch;
pub mod mode_manager;
