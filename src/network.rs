//! Local network handle: owns the executor and the transport handed to clients.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::core::fetcher::AccountFetcher;
use crate::core::oracle::{BocKind, ExecutionOracle};
use crate::core::Executor;
use crate::error::Result;
use crate::trace::TraceStep;
use crate::transport::LocalTransport;

#[derive(Debug)]
pub struct LocalNetwork {
    executor: Arc<Executor>,
    transport: Arc<LocalTransport>,
}

impl LocalNetwork {
    pub fn new(config: EngineConfig, oracle: Arc<dyn ExecutionOracle>) -> Result<Self> {
        Ok(Self::from_executor(Executor::new(config, oracle)?))
    }

    pub fn with_fetcher(
        config: EngineConfig,
        oracle: Arc<dyn ExecutionOracle>,
        fetcher: Arc<dyn AccountFetcher>,
    ) -> Result<Self> {
        Ok(Self::from_executor(Executor::new(config, oracle)?.with_fetcher(fetcher)))
    }

    fn from_executor(executor: Executor) -> Self {
        let executor = Arc::new(executor);
        let transport = Arc::new(LocalTransport::new(executor.clone()));
        Self { executor, transport }
    }

    /// Connection factory: assigns the clock and returns the transport.
    ///
    /// The clock can be assigned only once, so a second call fails with `ClockAlreadySet`.
    pub fn connect(&self, clock: Arc<dyn Clock>) -> Result<Arc<LocalTransport>> {
        self.executor.set_clock(clock)?;
        info!("Local network connected");
        Ok(self.transport.clone())
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn set_account(&self, address: &str, boc: &[u8], kind: BocKind) -> Result<()> {
        self.executor.set_account(address, boc, kind)
    }

    pub fn tx_trace(&self, tx_hash: &str) -> Option<Vec<TraceStep>> {
        self.executor.get_tx_trace(tx_hash)
    }
}
