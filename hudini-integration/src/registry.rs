use chrono::{DateTime, Utc};
use hudini_core::{PmsError, PmsProvider, PmsResult, ProviderKind, UnavailableReason};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Operator view of one registered provider
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderDescriptor {
    pub name: String,
    pub kind: ProviderKind,
    pub authenticated: bool,
    pub is_default: bool,
    pub session_expires_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct RegistryState {
    /// Registration order
    entries: Vec<(String, Arc<dyn PmsProvider>)>,
    /// Explicit default; falls back to the first entry when unset or unknown
    default: Option<String>,
}

impl RegistryState {
    fn find(&self, name: &str) -> Option<&Arc<dyn PmsProvider>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, adapter)| adapter)
    }

    fn default_entry(&self) -> Option<&(String, Arc<dyn PmsProvider>)> {
        self.default
            .as_deref()
            .and_then(|name| self.entries.iter().find(|(n, _)| n == name))
            .or_else(|| self.entries.first())
    }
}

/// Named adapters plus the default pointer. Provider set and default live
/// under one lock so a reader never sees a half-applied switch.
#[derive(Default)]
pub struct ProviderRegistry {
    state: RwLock<RegistryState>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a provider. Re-registering a name replaces the adapter in place
    /// and keeps its position.
    pub fn register(&self, name: impl Into<String>, adapter: Arc<dyn PmsProvider>) {
        let name = name.into();
        let mut state = self.write();

        if let Some(slot) = state.entries.iter_mut().find(|(n, _)| *n == name) {
            warn!(provider = %name, "provider re-registered, replacing adapter");
            slot.1 = adapter;
            return;
        }

        info!(provider = %name, kind = %adapter.kind(), "provider registered");
        state.entries.push((name, adapter));
    }

    pub fn get(&self, name: &str) -> PmsResult<Arc<dyn PmsProvider>> {
        self.read()
            .find(name)
            .cloned()
            .ok_or_else(|| PmsError::unavailable(name, UnavailableReason::NotRegistered))
    }

    /// Provider names in registration order
    pub fn list(&self) -> Vec<String> {
        self.read().entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Name and adapter pairs, copied out so callers can await without the lock.
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn PmsProvider>)> {
        self.read().entries.clone()
    }

    pub fn get_default(&self) -> PmsResult<Arc<dyn PmsProvider>> {
        self.read()
            .default_entry()
            .map(|(_, adapter)| adapter.clone())
            .ok_or_else(|| PmsError::unavailable("default", UnavailableReason::NoProviders))
    }

    pub fn default_name(&self) -> Option<String> {
        self.read().default_entry().map(|(name, _)| name.clone())
    }

    /// Pin the default at startup. Only registration is required; the
    /// provider may still be logging in.
    pub fn set_default(&self, name: &str) -> PmsResult<()> {
        let mut state = self.write();
        if state.find(name).is_none() {
            return Err(PmsError::unavailable(name, UnavailableReason::NotRegistered));
        }
        state.default = Some(name.to_string());
        info!(provider = %name, "default provider set");
        Ok(())
    }

    /// Make `name` the default at runtime. The provider must hold a live
    /// session. Returns the previous default.
    pub fn switch_to(&self, name: &str) -> PmsResult<Option<String>> {
        let mut state = self.write();

        let adapter = state
            .find(name)
            .ok_or_else(|| PmsError::unavailable(name, UnavailableReason::NotRegistered))?;
        if !adapter.is_authenticated() {
            warn!(provider = %name, "refusing to switch to unauthenticated provider");
            return Err(PmsError::unavailable(name, UnavailableReason::NotAuthenticated));
        }

        let previous = state.default_entry().map(|(n, _)| n.clone());
        state.default = Some(name.to_string());
        info!(provider = %name, previous = ?previous, "switched default provider");
        Ok(previous)
    }

    pub fn describe(&self) -> Vec<ProviderDescriptor> {
        let state = self.read();
        let default = state.default_entry().map(|(name, _)| name.as_str());

        state
            .entries
            .iter()
            .map(|(name, adapter)| ProviderDescriptor {
                name: name.clone(),
                kind: adapter.kind(),
                authenticated: adapter.is_authenticated(),
                is_default: Some(name.as_str()) == default,
                session_expires_at: adapter.session_expires_at(),
            })
            .collect()
    }
}
