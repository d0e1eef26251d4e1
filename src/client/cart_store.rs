use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::{
    models::LineItem,
    services::cart_service::{self, MAX_LINE_QUANTITY},
};

/// Local cart held by a storefront client.
///
/// Every mutation is published on a `watch` channel and written to the
/// backing file, if any. File errors are logged and never returned.
pub struct CartStore {
    items: watch::Sender<Vec<LineItem>>,
    path: Option<PathBuf>,
}

impl CartStore {
    pub fn in_memory() -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self { items, path: None }
    }

    /// Loads the cart persisted at `path`, or starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (items, _) = watch::channel(load(&path));
        Self {
            items,
            path: Some(path),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<LineItem>> {
        self.items.subscribe()
    }

    pub fn items(&self) -> Vec<LineItem> {
        self.items.borrow().clone()
    }

    /// Adds `item`, summing quantities when its (product, size) is already
    /// present. A line never exceeds [`MAX_LINE_QUANTITY`].
    pub fn add(&self, item: LineItem) -> bool {
        if item.quantity < 1 {
            return false;
        }

        let added = self.items.send_if_modified(|items| {
            match items.iter_mut().find(|existing| existing.key() == item.key()) {
                Some(existing) => {
                    let quantity = cart_service::add_quantity(existing.quantity, item.quantity);
                    let changed = quantity != existing.quantity;
                    existing.quantity = quantity;
                    changed
                }
                None => {
                    items.push(LineItem {
                        quantity: item.quantity.min(MAX_LINE_QUANTITY),
                        ..item
                    });
                    true
                }
            }
        });
        if added {
            self.persist();
        }
        added
    }

    pub fn remove(&self, product_ref: &str, size: &str) -> bool {
        let removed = self.items.send_if_modified(|items| {
            let before = items.len();
            items.retain(|i| !(i.product_ref == product_ref && i.size == size));
            items.len() != before
        });
        if removed {
            self.persist();
        }
        removed
    }

    /// Quantities below one are ignored; use `remove` to drop a line.
    pub fn update_quantity(&self, product_ref: &str, size: &str, quantity: i32) -> bool {
        if quantity < 1 {
            return false;
        }
        let quantity = quantity.min(MAX_LINE_QUANTITY);

        let updated = self.items.send_if_modified(|items| {
            match items
                .iter_mut()
                .find(|i| i.product_ref == product_ref && i.size == size)
            {
                Some(item) if item.quantity != quantity => {
                    item.quantity = quantity;
                    true
                }
                _ => false,
            }
        });
        if updated {
            self.persist();
        }
        updated
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    /// Swaps in a whole new item list, e.g. the merged cart returned by the server.
    pub fn replace(&self, items: Vec<LineItem>) {
        self.items.send_replace(items);
        self.persist();
    }

    pub fn total(&self) -> Decimal {
        self.items.borrow().iter().map(LineItem::line_total).sum()
    }

    pub fn count(&self) -> i64 {
        self.items
            .borrow()
            .iter()
            .map(|i| i64::from(i.quantity))
            .sum()
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let result = serde_json::to_vec(&*self.items.borrow())
            .map_err(std::io::Error::other)
            .and_then(|bytes| fs::write(path, bytes));

        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to save local cart");
        }
    }
}

fn load(path: &Path) -> Vec<LineItem> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read local cart");
            return Vec::new();
        }
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Failed to parse local cart");
        Vec::new()
    })
}
