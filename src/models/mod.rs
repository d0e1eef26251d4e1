mod address;
mod cart;
mod order;
mod product;
mod review;
mod session;

pub use address::*;
pub use cart::*;
pub use order::*;
pub use product::*;
pub use review::*;
pub use session::*;
