//! Infrastructure layer for the scan agent.
//!
//! Contains OS-facing adapters: keystroke capture sources, the terminal
//! consent prompt, and file-system storage for the agent configuration.

pub mod consent;
pub mod input_capture;
pub mod storage;
