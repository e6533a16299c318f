#[macro_use]
extern crate log;

pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod reference_vm;
pub mod trace;
pub mod transport;
pub mod utils;

pub use error::{LocalnetError, Result};
pub use utils::sha256_hex;

// Core API exports
pub use crate::core::{Executor, StepOutcome, TxHash};
pub use crate::core::account::{AccountState, Address, GenTimings, LastTransactionId, LogicalTime};
pub use crate::core::fetcher::{AccountFetcher, FetchedAccount};
pub use crate::core::genesis::ZERO_ADDRESS;
pub use crate::core::index::TransactionIndex;
pub use crate::core::ledger::Ledger;
pub use crate::core::message::Message;
pub use crate::core::oracle::{
    AccountUpdate,
    BocKind,
    ExecutionOracle,
    ExecutionOutput,
    ExecutionRequest,
    OracleAdapter,
    OracleCall,
    OracleError,
    OracleOutcome,
    RawExecution,
    EMPTY_STATE,
};
pub use crate::core::queue::{MessageQueue, QueueError};
pub use crate::core::snapshot::{SnapshotId, SnapshotManager};
pub use crate::core::state::{SimulationState, SnapshotableState, StateSnapshot};
pub use crate::core::transaction::Transaction;

pub use clock::{Clock, ClockWithOffset, FixedClock, SystemClock};
pub use config::{ChainConfig, EngineConfig, GenesisConfig, DEFAULT_GIVER_ADDRESS, DEFAULT_GLOBAL_ID};
pub use network::LocalNetwork;
pub use trace::{parse_trace, TraceStep};
pub use transport::{AccountsPage, BlockchainConfig, LocalTransport, ReliableBehavior, TransportInfo, MAX_TRANSACTIONS_PER_FETCH};
