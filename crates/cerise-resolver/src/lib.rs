mod catalog;
mod error;
mod resolver;

pub use catalog::{AnyTarget, FsTargetCatalog, TargetCatalog};
pub use error::ResolveError;
pub use resolver::{Resolver, StandardResolver};
