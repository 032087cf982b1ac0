// OpenList API surface: endpoint table and typed client

mod client;
pub mod endpoints;

pub use client::{OpenListClient, RenameObject};
pub use endpoints::{Endpoint, ENDPOINTS};
