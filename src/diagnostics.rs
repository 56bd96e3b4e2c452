// ==============================================================================
// diagnostics.rs - Diagnostic Message Sinks
// ==============================================================================
// Description: Injected sink for informational messages emitted while parsing
// Author: Matt Barham
// Created: 2026-09-15
// Modified: 2026-09-15
// Version: 1.0.0
// ==============================================================================

use std::sync::Mutex;
use tracing::info;

/// Receiver of informational messages
///
/// Messages are diagnostic only: nothing emitted here changes behaviour or
/// stands in for an error.
pub trait Diagnostics: Send + Sync {
    fn info(&self, message: &str);
}

/// Forwards messages to `tracing` at INFO level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn info(&self, message: &str) {
        info!("{}", message);
    }
}

/// Keeps messages in memory so callers can inspect them
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    messages: Mutex<Vec<String>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, in emission order
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn info(&self, message: &str) {
        let mut messages = match self.messages.lock() {
            Ok(messages) => messages,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.push(message.to_string());
    }
}
