//! Database layer for habitcal
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Named storage slots holding the serialized record array
//! - Import history
//!
//! The record store only sees the [`EntryStorage`] trait, so tests and other
//! front ends can swap the backend.

pub mod repo;
pub mod schema;

pub use repo::{Database, ImportRecord};

use crate::error::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// Durable home for a serialized record set under a named key.
pub trait EntryStorage {
    /// Raw payload under `key`, or `None` if nothing was ever written.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the payload under `key`.
    fn write(&self, key: &str, payload: &str) -> Result<()>;
}

/// Volatile storage, for tests and one-shot tools.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with `payload` under `key`.
    pub fn with_payload(key: &str, payload: &str) -> Self {
        let storage = Self::default();
        storage
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), payload.to_string());
        storage
    }
}

impl EntryStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, payload: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.insert(key.to_string(), payload.to_string());
        Ok(())
    }
}

impl<S: EntryStorage + ?Sized> EntryStorage for &S {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, payload: &str) -> Result<()> {
        (**self).write(key, payload)
    }
}
