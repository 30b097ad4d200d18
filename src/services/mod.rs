// Service exports
pub mod appwrite;
pub mod cache;
pub mod ports;
pub mod postgres;
pub mod store;

pub use appwrite::{AppwriteClient, AppwriteCollections};
pub use cache::{SessionCache, SessionStats};
pub use ports::{bounded, BlockSource, MatchAuthority, ProfileSource, RemoteError, SwipeAuthority};
pub use postgres::PostgresStore;
pub use store::{LocalStore, MatchInsert, MemoryStore, StoreError};
