//! Product catalog entity and the inventory ledger embedded in it.

mod inventory;
mod product;
mod service;

pub use inventory::InventoryLedger;
pub use product::Product;
pub use service::ProductCatalog;
