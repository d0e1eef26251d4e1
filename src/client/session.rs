use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{CartStore, RemoteCart};
use crate::{models::LineItem, services::cart_service};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nobody is signed in; the local cart is the only copy.
    LocalOnly,
    Synced,
    /// The last remote call failed; the local cart stays authoritative.
    Unsynced,
}

struct Attached {
    owner_id: String,
    remote: Arc<dyn RemoteCart>,
    sync_token: String,
    /// Local lines sent with `sync_token`. Retries resend exactly these, so
    /// the server merges them at most once whatever happened to earlier
    /// responses.
    sent: Option<Vec<LineItem>>,
    reconciled: bool,
}

/// Ties a local [`CartStore`] to the signed-in owner's remote cart.
///
/// Reconciliation runs once per anonymous to authenticated transition.
/// Remote calls and session mutations go through one lock, so a mutation
/// issued during sign-in lands after the merge and is pushed on top of it.
pub struct CartSession {
    cart: Arc<CartStore>,
    attached: Mutex<Option<Attached>>,
    state: std::sync::Mutex<SyncState>,
}

impl CartSession {
    pub fn new(cart: Arc<CartStore>) -> Self {
        Self {
            cart,
            attached: Mutex::new(None),
            state: std::sync::Mutex::new(SyncState::LocalOnly),
        }
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn sync_state(&self) -> SyncState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(SyncState::Unsynced)
    }

    fn set_state(&self, next: SyncState) -> SyncState {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
        next
    }

    pub async fn sign_in(&self, owner_id: &str, remote: Arc<dyn RemoteCart>) -> SyncState {
        let mut attached = self.attached.lock().await;

        let same_owner = attached
            .as_ref()
            .is_some_and(|current| current.owner_id == owner_id);

        if same_owner {
            if let Some(current) = attached.as_mut() {
                if current.reconciled {
                    return self.sync_state();
                }
                current.remote = remote;
            }
        } else {
            *attached = Some(Attached {
                owner_id: owner_id.to_string(),
                remote,
                sync_token: Uuid::new_v4().to_string(),
                sent: None,
                reconciled: false,
            });
        }

        match attached.as_mut() {
            Some(current) => self.reconcile(current).await,
            None => self.set_state(SyncState::LocalOnly),
        }
    }

    /// The local cart is kept; the next sign-in merges it again.
    pub async fn sign_out(&self) {
        *self.attached.lock().await = None;
        self.set_state(SyncState::LocalOnly);
    }

    pub async fn add(&self, item: LineItem) -> SyncState {
        let attached = self.attached.lock().await;
        if !self.cart.add(item) {
            return self.sync_state();
        }
        self.push_locked(attached).await
    }

    pub async fn remove(&self, product_ref: &str, size: &str) -> SyncState {
        let attached = self.attached.lock().await;
        if !self.cart.remove(product_ref, size) {
            return self.sync_state();
        }
        self.push_locked(attached).await
    }

    pub async fn update_quantity(&self, product_ref: &str, size: &str, quantity: i32) -> SyncState {
        let attached = self.attached.lock().await;
        if !self.cart.update_quantity(product_ref, size, quantity) {
            return self.sync_state();
        }
        self.push_locked(attached).await
    }

    pub async fn clear(&self) -> SyncState {
        let attached = self.attached.lock().await;
        self.cart.clear();
        self.push_locked(attached).await
    }

    /// Sends the local cart upstream: retries a failed reconciliation,
    /// otherwise overwrites the remote copy.
    pub async fn push(&self) -> SyncState {
        let attached = self.attached.lock().await;
        self.push_locked(attached).await
    }

    async fn push_locked(&self, mut attached: MutexGuard<'_, Option<Attached>>) -> SyncState {
        let Some(current) = attached.as_mut() else {
            return self.set_state(SyncState::LocalOnly);
        };

        if !current.reconciled {
            return self.reconcile(current).await;
        }

        match current.remote.replace(&self.cart.items()).await {
            Ok(_) => self.set_state(SyncState::Synced),
            Err(e) => {
                tracing::warn!(owner_id = %current.owner_id, error = %e, "Cart push failed");
                self.set_state(SyncState::Unsynced)
            }
        }
    }

    async fn reconcile(&self, current: &mut Attached) -> SyncState {
        let sent = current
            .sent
            .get_or_insert_with(|| self.cart.items())
            .clone();

        let merged = match current.remote.sync(&sent, &current.sync_token).await {
            Ok(merged) => merged,
            Err(e) => {
                tracing::warn!(owner_id = %current.owner_id, error = %e, "Cart reconciliation failed");
                return self.set_state(SyncState::Unsynced);
            }
        };

        current.reconciled = true;
        current.sent = None;

        // Local edits made after `sent` was taken still have to reach the server
        let rebased = cart_service::rebase_items(&merged.items, &sent, &self.cart.items());
        if rebased == merged.items {
            self.cart.replace(rebased);
            tracing::info!(owner_id = %current.owner_id, "Cart reconciled");
            return self.set_state(SyncState::Synced);
        }

        self.cart.replace(rebased);
        match current.remote.replace(&self.cart.items()).await {
            Ok(_) => {
                tracing::info!(owner_id = %current.owner_id, "Cart reconciled with local edits");
                self.set_state(SyncState::Synced)
            }
            Err(e) => {
                tracing::warn!(owner_id = %current.owner_id, error = %e, "Cart push after reconciliation failed");
                self.set_state(SyncState::Unsynced)
            }
        }
    }
}
