//! Execution oracle boundary.
//!
//! The oracle is the external component that implements VM semantics and the blob
//! codec. [`OracleAdapter`] is the stateless translation layer between the engine's
//! types and the oracle's call signature: it packages blobs for a call and turns the
//! raw reply into an explicit [`OracleOutcome`].

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::config::ChainConfig;
use crate::core::account::AccountState;
use crate::core::message::Message;
use crate::core::transaction::Transaction;
use crate::error::{LocalnetError, Result};
use crate::trace::{parse_trace, TraceStep};

/// Account state sentinel for "no account": an empty blob.
pub const EMPTY_STATE: Bytes = Bytes::new();

/// Layout of an account blob handed to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BocKind {
    /// Full account: state plus last-transaction reference.
    FullAccount,
    /// Bare account stuff, without the last-transaction reference.
    AccountStuff,
}

/// Errors reported by the oracle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("VM failure: {0}")]
    Vm(String),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<OracleError> for LocalnetError {
    fn from(err: OracleError) -> Self {
        LocalnetError::Oracle(err.to_string())
    }
}

/// Raw arguments of one oracle execution.
#[derive(Debug, Clone, Copy)]
pub struct OracleCall<'a> {
    pub config: &'a [u8],
    /// `None` stands for the empty-state sentinel.
    pub account: Option<&'a [u8]>,
    pub message: &'a [u8],
    /// Unix seconds.
    pub utime: u32,
    pub global_id: i32,
    pub trace: bool,
}

/// Raw reply of a successful oracle execution.
#[derive(Debug, Clone)]
pub struct RawExecution {
    /// New account blob. Empty when the account no longer exists.
    pub account: Bytes,
    pub transaction: Transaction,
    /// Line-oriented trace text, present only when tracing was requested.
    pub trace: Option<String>,
}

/// VM and codec, consumed as an opaque function.
///
/// Implementations must be deterministic: identical calls yield identical replies.
pub trait ExecutionOracle: Send + Sync {
    fn execute(&self, call: &OracleCall<'_>) -> std::result::Result<RawExecution, OracleError>;

    /// Decodes an account blob. `Ok(None)` means the blob describes no account.
    fn decode_account(
        &self,
        address: &str,
        boc: &[u8],
        kind: BocKind,
    ) -> std::result::Result<Option<AccountState>, OracleError>;

    fn decode_message(&self, boc: &[u8]) -> std::result::Result<Message, OracleError>;

    /// Capability bitmask derived from a chain config blob.
    fn capabilities(&self, config: &[u8]) -> std::result::Result<u64, OracleError>;
}

/// Engine-side arguments of one execute step.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub config: &'a ChainConfig,
    /// Receiver state; `None` for an absent (un-deployed) account.
    pub account: Option<&'a AccountState>,
    pub message: &'a Message,
    pub utime: u32,
    pub trace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountUpdate {
    Updated(AccountState),
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    pub account: AccountUpdate,
    pub transaction: Transaction,
    pub trace: Option<Vec<TraceStep>>,
}

/// Result of one oracle execution: success payload or failure reason.
#[derive(Debug, Clone)]
pub enum OracleOutcome {
    Success(ExecutionOutput),
    Failure { reason: OracleError },
}

impl OracleOutcome {
    fn failure(reason: OracleError) -> Self {
        OracleOutcome::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OracleOutcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// `true` only for a successful execution whose transaction aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, OracleOutcome::Success(out) if out.transaction.aborted)
    }

    pub fn into_result(self) -> std::result::Result<ExecutionOutput, OracleError> {
        match self {
            OracleOutcome::Success(output) => Ok(output),
            OracleOutcome::Failure { reason } => Err(reason),
        }
    }
}

/// Stateless adapter around an [`ExecutionOracle`].
#[derive(Clone)]
pub struct OracleAdapter {
    oracle: Arc<dyn ExecutionOracle>,
}

impl fmt::Debug for OracleAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleAdapter").finish_non_exhaustive()
    }
}

impl OracleAdapter {
    pub fn new(oracle: Arc<dyn ExecutionOracle>) -> Self {
        Self { oracle }
    }

    /// Executes `request.message` against `request.account`.
    pub fn execute(&self, request: &ExecutionRequest<'_>) -> OracleOutcome {
        let Some(address) = request.message.dst.as_deref() else {
            return OracleOutcome::failure(OracleError::Malformed(format!(
                "message {} has no destination",
                request.message.hash
            )));
        };

        let call = OracleCall {
            config: &request.config.boc,
            account: request.account.map(|state| &state.boc[..]),
            message: &request.message.boc,
            utime: request.utime,
            global_id: request.config.global_id,
            trace: request.trace,
        };

        let raw = match self.oracle.execute(&call) {
            Ok(raw) => raw,
            Err(reason) => return OracleOutcome::failure(reason),
        };

        let account = if raw.account.is_empty() {
            AccountUpdate::Destroyed
        } else {
            match self.oracle.decode_account(address, &raw.account, BocKind::FullAccount) {
                Ok(Some(state)) => AccountUpdate::Updated(state),
                Ok(None) => AccountUpdate::Destroyed,
                Err(reason) => return OracleOutcome::failure(reason),
            }
        };

        OracleOutcome::Success(ExecutionOutput {
            account,
            transaction: raw.transaction,
            trace: raw.trace.as_deref().map(parse_trace),
        })
    }

    pub fn decode_account(&self, address: &str, boc: &[u8], kind: BocKind) -> Result<Option<AccountState>> {
        Ok(self.oracle.decode_account(address, boc, kind)?)
    }

    pub fn decode_message(&self, boc: &[u8]) -> Result<Message> {
        Ok(self.oracle.decode_message(boc)?)
    }

    pub fn capabilities(&self, config: &ChainConfig) -> Result<u64> {
        Ok(self.oracle.capabilities(&config.boc)?)
    }
}
