use std::collections::BTreeMap;

use tracing::warn;

use crate::substitution::Resolver;

/// Destination for loaded environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEnv {
    kind: TargetEnvKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetEnvKind {
    /// Apply entries to the current process environment.
    ///
    /// This writes through [`std::env::set_var`], which mutates global process
    /// state and is not thread-safe for concurrent environment access.
    Process,
    /// Apply entries to an in-memory map.
    Memory(BTreeMap<String, String>),
}

impl Default for TargetEnv {
    fn default() -> Self {
        Self::memory()
    }
}

impl TargetEnv {
    /// Create a process-environment target.
    ///
    /// # Safety
    ///
    /// The caller must ensure no other threads concurrently read or write the
    /// process environment for the duration of operations that may mutate this
    /// target.
    pub unsafe fn process() -> Self {
        Self {
            kind: TargetEnvKind::Process,
        }
    }

    /// Create an in-memory environment target.
    ///
    /// Use this to avoid mutating the process environment.
    pub fn memory() -> Self {
        Self::from_memory(BTreeMap::new())
    }

    /// Create an in-memory environment target from an existing map.
    pub fn from_memory(map: BTreeMap<String, String>) -> Self {
        Self {
            kind: TargetEnvKind::Memory(map),
        }
    }

    pub fn as_memory(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub fn into_memory(self) -> Option<BTreeMap<String, String>> {
        match self.kind {
            TargetEnvKind::Memory(map) => Some(map),
            TargetEnvKind::Process => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match &self.kind {
            TargetEnvKind::Process => is_settable_process_key(key) && std::env::var_os(key).is_some(),
            TargetEnvKind::Memory(map) => map.contains_key(key),
        }
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        match &self.kind {
            TargetEnvKind::Process if is_settable_process_key(key) => {
                std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
            }
            TargetEnvKind::Process => None,
            TargetEnvKind::Memory(map) => map.get(key).cloned(),
        }
    }

    /// Set a variable, returning whether the target accepted it.
    ///
    /// The process environment rejects empty keys, keys containing `=` and
    /// anything containing NUL.
    pub(crate) fn set_var(&mut self, key: &str, value: &str) -> bool {
        match &mut self.kind {
            TargetEnvKind::Process => {
                if !is_settable_process_key(key) || value.contains('\0') {
                    warn!(key, "skipping variable the process environment cannot hold");
                    return false;
                }
                // SAFETY: `TargetEnv::process` is unsafe and its caller
                // guarantees exclusive access to the process environment.
                unsafe { std::env::set_var(key, value) };
                true
            }
            TargetEnvKind::Memory(map) => {
                map.insert(key.to_owned(), value.to_owned());
                true
            }
        }
    }
}

impl Resolver for TargetEnv {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get_var(name)
    }
}

fn is_settable_process_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0'])
}
