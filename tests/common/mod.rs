//! Shared test fixtures: an in-memory vault that records every call.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use op_secure_notes_mcp::catalog::Catalog;
use op_secure_notes_mcp::vault::{ItemSummary, VaultError, VaultResult, VaultStore};

#[derive(Debug, Default)]
struct Inner {
    /// (vault, title) -> (content, archived)
    notes: BTreeMap<(String, String), (String, bool)>,
    calls: Vec<String>,
    fail_with: Option<String>,
    unavailable: bool,
    read_delay: Option<Duration>,
}

/// In-memory stand-in for the `op` CLI.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a live note.
    pub fn with_note(self, vault: &str, title: &str, content: &str) -> Self {
        self.inner.lock().unwrap().notes.insert(
            (vault.to_string(), title.to_string()),
            (content.to_string(), false),
        );
        self
    }

    /// Makes every subsequent store call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        self.inner.lock().unwrap().fail_with = Some(message.to_string());
    }

    /// Makes the vault access check fail.
    pub fn set_unavailable(&self) {
        self.inner.lock().unwrap().unavailable = true;
    }

    /// Makes every read pause after fetching the content, widening the
    /// window between an append's read and its write.
    pub fn set_read_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().read_delay = Some(delay);
    }

    /// Names of the store methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// Current content of a live note.
    pub fn content(&self, vault: &str, title: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .notes
            .get(&(vault.to_string(), title.to_string()))
            .filter(|(_, archived)| !archived)
            .map(|(content, _)| content.clone())
    }

    pub fn is_archived(&self, vault: &str, title: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .notes
            .get(&(vault.to_string(), title.to_string()))
            .is_some_and(|(_, archived)| *archived)
    }

    fn record(&self, call: &str) -> VaultResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call.to_string());
        match &inner.fail_with {
            Some(message) => Err(VaultError::CommandFailed {
                status: "exit status: 1".to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn live_mut<'a>(
        inner: &'a mut Inner,
        vault: &str,
        name: &str,
    ) -> VaultResult<&'a mut String> {
        match inner.notes.get_mut(&(vault.to_string(), name.to_string())) {
            Some((content, false)) => Ok(content),
            _ => Err(VaultError::ItemNotFound {
                name: name.to_string(),
            }),
        }
    }
}

impl VaultStore for MemoryVault {
    fn version(&self) -> VaultResult<String> {
        self.record("version")?;
        Ok("2.30.0".to_string())
    }

    fn ensure_available(&self, vault: &str) -> VaultResult<()> {
        self.record("ensure_available")?;
        if self.inner.lock().unwrap().unavailable {
            return Err(VaultError::Unavailable {
                vault: vault.to_string(),
                reason: "You are not currently signed in.".to_string(),
            });
        }
        Ok(())
    }

    fn list_items(&self, vault: &str) -> VaultResult<Vec<ItemSummary>> {
        self.record("list_items")?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .notes
            .iter()
            .filter(|((v, _), (_, archived))| v == vault && !archived)
            .enumerate()
            .map(|(i, ((_, title), _))| ItemSummary {
                id: format!("id{i}"),
                title: title.clone(),
                category: "SECURE_NOTE".to_string(),
            })
            .collect())
    }

    fn get_note_field(&self, vault: &str, name: &str) -> VaultResult<String> {
        self.record("get_note_field")?;
        let (content, delay) = {
            let mut inner = self.inner.lock().unwrap();
            let delay = inner.read_delay;
            (Self::live_mut(&mut inner, vault, name).cloned(), delay)
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        content
    }

    fn create_item(&self, vault: &str, name: &str, content: &str) -> VaultResult<()> {
        self.record("create_item")?;
        self.inner.lock().unwrap().notes.insert(
            (vault.to_string(), name.to_string()),
            (content.to_string(), false),
        );
        Ok(())
    }

    fn replace_note_field(&self, vault: &str, name: &str, content: &str) -> VaultResult<()> {
        self.record("replace_note_field")?;
        let mut inner = self.inner.lock().unwrap();
        *Self::live_mut(&mut inner, vault, name)? = content.to_string();
        Ok(())
    }

    fn archive_item(&self, vault: &str, name: &str) -> VaultResult<()> {
        self.record("archive_item")?;
        let mut inner = self.inner.lock().unwrap();
        Self::live_mut(&mut inner, vault, name)?;
        if let Some(entry) = inner.notes.get_mut(&(vault.to_string(), name.to_string())) {
            entry.1 = true;
        }
        Ok(())
    }
}

/// Builds the production catalog over `store`.
pub fn catalog(vault: Option<&str>, store: &MemoryVault) -> Catalog {
    Catalog::with_secure_note_tools(vault.map(str::to_string), store.clone()).unwrap()
}
