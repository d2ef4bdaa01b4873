pub mod blob_store;
pub mod gateway_client;
pub mod metrics;
pub mod poller;
pub mod transaction_store;
pub mod transactions;

pub use blob_store::{BlobStore, FileBlobStore, MemoryBlobStore, RedisBlobStore};
pub use gateway_client::{GatewayClient, GatewayError, PaymentGateway};
pub use poller::{PollTarget, PollerHandle, StatusPoller};
pub use transaction_store::{StoreError, TransactionStore};
pub use transactions::{ServiceError, TransactionService};
