use crate::data_structures::AddressBookEntry;
use crate::error::{BridgeError, BridgeResult};
use parking_lot::Mutex;
use std::collections::HashSet;

// Display-only mapping of (currency, label) to addresses
#[derive(Debug, Default)]
pub struct AddressBook {
    inner: Mutex<BookInner>,
}

#[derive(Debug, Default)]
struct BookInner {
    entries: Vec<AddressBookEntry>,
    seen: HashSet<AddressBookEntry>,
}

impl AddressBook {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends an entry; adding an identical entry again is a no-op.
    pub fn add(&self, currency: &str, label: &str, address: &str) -> BridgeResult<()> {
        if currency.trim().is_empty() {
            return Err(BridgeError::InvalidCurrency(currency.to_string()));
        }
        let entry = AddressBookEntry {
            currency: currency.to_string(),
            label: label.to_string(),
            address: address.to_string(),
        };
        let mut inner = self.inner.lock();
        if inner.seen.insert(entry.clone()) {
            inner.entries.push(entry);
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<AddressBookEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn entries_for(&self, currency: &str) -> Vec<AddressBookEntry> {
        self.inner.lock().entries.iter().filter(|e| e.currency == currency).cloned().collect()
    }
}
