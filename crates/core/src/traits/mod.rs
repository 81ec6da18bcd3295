pub mod repository;
pub mod source_client;

pub use repository::{HostRepository, LinkClaim, LinkRepository};
pub use source_client::SourceClient;
