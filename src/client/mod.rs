//! Storefront-side cart: a local store that survives restarts and a session
//! that reconciles it with the server once the shopper signs in.

mod cart_store;
mod remote;
mod session;

pub use cart_store::CartStore;
pub use remote::{HttpRemoteCart, RemoteCart};
pub use session::{CartSession, SyncState};
