//! テストおよびブラウザ以外のホスト用のインメモリ KV ストア。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::KeyValueStore;
use crate::error::StorageError;

/// `localStorage` の代役。同じブラウザプロファイルの全タブが
/// 一つの `localStorage` を共有するのと同様に、クローン同士は同じマップを共有する。
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// `localStorage.clear()` と同様に全キーを削除する。
    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}
