//! Deterministic reference VM with a JSON blob codec.
//!
//! Implements [`ExecutionOracle`] for tests, demos and the CLI. Account and message
//! blobs are JSON documents; a message body selects one of a handful of operations.
//! Transactions get `lt = max(last_trans_lt, created_lt) + 1` and their outbound
//! messages `lt + 1 + i`. An aborted transaction keeps only the incoming value.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::GenesisConfig;
use crate::core::account::{AccountState, Address, GenTimings, LastTransactionId, LogicalTime};
use crate::core::message::Message;
use crate::core::oracle::{BocKind, ExecutionOracle, OracleCall, OracleError, RawExecution};
use crate::core::transaction::Transaction;
use crate::utils::sha256_hex;

/// Code installed on the genesis giver.
pub const GIVER_CODE: &str = "giver-v1";

pub const REFERENCE_CAPABILITIES: u64 = 0x0000_0000_0004_0e2e;

/// Exit code of an operation that needs code on an un-deployed account.
pub const EXIT_NO_CODE: i32 = 60;
pub const EXIT_NOT_ENOUGH_BALANCE: i32 = 37;

type VmResult<T> = std::result::Result<T, OracleError>;

fn codec_error(err: serde_json::Error) -> OracleError {
    OracleError::Codec(err.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmAccount {
    #[serde(default)]
    pub balance: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub last_trans_lt: LogicalTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_trans_hash: Option<String>,
    #[serde(default)]
    pub gen_utime: u32,
}

impl VmAccount {
    pub fn decode(boc: &[u8]) -> VmResult<Self> {
        serde_json::from_slice(boc).map_err(codec_error)
    }

    pub fn encode(&self) -> VmResult<Bytes> {
        serde_json::to_vec(self).map(Bytes::from).map_err(codec_error)
    }

    pub fn is_deployed(&self) -> bool {
        self.code.is_some()
    }

    /// No code and no funds: nothing worth keeping on the ledger.
    fn is_empty(&self) -> bool {
        self.code.is_none() && self.balance == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum VmBody {
    /// Plain value transfer.
    #[default]
    Transfer,
    /// Installs `code` unless the account already has code.
    Deploy { code: String },
    /// Sends `value` to `to`, carrying `body` (a transfer when absent).
    Forward {
        to: Address,
        value: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Box<VmBody>>,
    },
    /// Emits an outbound event.
    Emit { event: String },
    /// Aborts the transaction with `exit_code`.
    Abort { exit_code: i32 },
    /// Sends the whole balance to `beneficiary` and deletes the account.
    Destroy { beneficiary: Address },
}

impl VmBody {
    fn mnemonic(&self) -> String {
        match self {
            VmBody::Transfer => "ACCEPT".to_string(),
            VmBody::Deploy { .. } => "SETCODE".to_string(),
            VmBody::Forward { .. } | VmBody::Emit { .. } => "SENDRAWMSG".to_string(),
            VmBody::Abort { exit_code } => format!("PUSHINT {}", exit_code),
            VmBody::Destroy { .. } => "SENDRAWMSG 160".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<Address>,
    #[serde(default)]
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_lt: Option<LogicalTime>,
    #[serde(default)]
    pub body: VmBody,
    /// Tells apart otherwise identical external messages.
    #[serde(default)]
    pub nonce: u64,
}

impl VmMessage {
    /// Inbound message from outside the chain.
    pub fn external(dst: impl Into<Address>, body: VmBody) -> Self {
        Self {
            dst: Some(dst.into()),
            body,
            ..Self::default()
        }
    }

    pub fn internal(src: impl Into<Address>, dst: impl Into<Address>, value: u64, body: VmBody) -> Self {
        Self {
            src: Some(src.into()),
            dst: Some(dst.into()),
            value,
            body,
            ..Self::default()
        }
    }

    pub fn with_created_lt(mut self, lt: LogicalTime) -> Self {
        self.created_lt = Some(lt);
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn decode(boc: &[u8]) -> VmResult<Self> {
        serde_json::from_slice(boc).map_err(codec_error)
    }

    pub fn encode(&self) -> VmResult<Bytes> {
        serde_json::to_vec(self).map(Bytes::from).map_err(codec_error)
    }

    /// Encodes and wraps into an engine [`Message`].
    pub fn to_message(&self) -> VmResult<Message> {
        let boc = self.encode()?;
        Ok(self.wrap(boc))
    }

    fn wrap(&self, boc: Bytes) -> Message {
        Message {
            hash: sha256_hex(&boc),
            src: self.src.clone(),
            dst: self.dst.clone(),
            lt: self.created_lt,
            boc,
        }
    }
}

/// Hashed and stored as the transaction blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmTransaction {
    pub account: Address,
    pub lt: LogicalTime,
    pub prev_trans_lt: LogicalTime,
    pub prev_trans_hash: Option<String>,
    pub now: u32,
    pub aborted: bool,
    pub exit_code: i32,
    pub in_msg: String,
    pub out_msgs: Vec<String>,
}

#[derive(Debug, Default)]
struct Effects {
    out: Vec<VmMessage>,
    destroyed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceVm;

impl ReferenceVm {
    pub fn new() -> Self {
        Self
    }

    pub fn code_hash(code: &str) -> String {
        sha256_hex(code.as_bytes())
    }

    /// Genesis whose giver holds `giver_balance` and runs [`GIVER_CODE`].
    pub fn genesis(giver_balance: u64) -> VmResult<GenesisConfig> {
        let giver = VmAccount {
            balance: giver_balance,
            code: Some(GIVER_CODE.to_string()),
            ..VmAccount::default()
        };
        Ok(GenesisConfig::new(giver.encode()?))
    }
}

fn require_code(account: &VmAccount) -> std::result::Result<(), i32> {
    if account.is_deployed() {
        Ok(())
    } else {
        Err(EXIT_NO_CODE)
    }
}

fn lt_overflow() -> OracleError {
    OracleError::Malformed("logical time overflow".to_string())
}

/// Runs the body against `account`. `Err` carries the abort exit code.
fn apply_body(address: &str, account: &mut VmAccount, body: &VmBody) -> std::result::Result<Effects, i32> {
    match body {
        VmBody::Transfer => Ok(Effects::default()),
        VmBody::Deploy { code } => {
            if account.code.is_none() {
                account.code = Some(code.clone());
            }
            Ok(Effects::default())
        }
        VmBody::Forward { to, value, body } => {
            require_code(account)?;
            if account.balance < *value {
                return Err(EXIT_NOT_ENOUGH_BALANCE);
            }
            account.balance -= value;
            let body = body.as_deref().cloned().unwrap_or_default();
            Ok(Effects {
                out: vec![VmMessage::internal(address, to.as_str(), *value, body)],
                destroyed: false,
            })
        }
        VmBody::Emit { event } => {
            require_code(account)?;
            let event = VmMessage {
                src: Some(address.to_string()),
                body: VmBody::Emit { event: event.clone() },
                ..VmMessage::default()
            };
            Ok(Effects {
                out: vec![event],
                destroyed: false,
            })
        }
        VmBody::Abort { exit_code } => Err(*exit_code),
        VmBody::Destroy { beneficiary } => {
            require_code(account)?;
            let value = std::mem::take(&mut account.balance);
            Ok(Effects {
                out: vec![VmMessage::internal(address, beneficiary.as_str(), value, VmBody::Transfer)],
                destroyed: true,
            })
        }
    }
}

fn render_trace(code_hash: &str, value: u64, body: &VmBody, exit_code: Option<i32>) -> String {
    let mut text = String::from("vm: reference\n");
    text.push_str(&format!("stack: [ ]\nexecute SETCP 0\ncode cell hash: {}:0:8\n", code_hash));
    text.push_str(&format!(
        "stack: [ {} ]\nexecute {}\ncode cell hash: {}:8:16\n",
        value,
        body.mnemonic(),
        code_hash
    ));
    if let Some(code) = exit_code {
        text.push_str(&format!(
            "stack: [ {} {} ]\nexecute THROWANY\ncode cell hash: {}:24:16\n",
            value, code, code_hash
        ));
    }
    text
}

impl ExecutionOracle for ReferenceVm {
    fn execute(&self, call: &OracleCall<'_>) -> VmResult<RawExecution> {
        let msg = VmMessage::decode(call.message)?;
        let address = msg
            .dst
            .clone()
            .ok_or_else(|| OracleError::Malformed("message has no destination".to_string()))?;
        let prev = match call.account {
            Some(boc) if !boc.is_empty() => VmAccount::decode(boc)?,
            _ => VmAccount::default(),
        };
        let lt = prev
            .last_trans_lt
            .max(msg.created_lt.unwrap_or(0))
            .checked_add(1)
            .ok_or_else(lt_overflow)?;

        let mut credited = prev.clone();
        credited.balance = credited
            .balance
            .checked_add(msg.value)
            .ok_or_else(|| OracleError::Vm("balance overflow".to_string()))?;

        let mut working = credited.clone();
        let (mut account, effects, exit_code) = match apply_body(&address, &mut working, &msg.body) {
            Ok(effects) => (working, effects, None),
            Err(code) => (credited, Effects::default(), Some(code)),
        };
        let aborted = exit_code.is_some();
        let destroyed = effects.destroyed;

        let out_messages = effects
            .out
            .into_iter()
            .enumerate()
            .map(|(i, out)| {
                let created_lt = (i as u64)
                    .checked_add(1)
                    .and_then(|offset| lt.checked_add(offset))
                    .ok_or_else(lt_overflow)?;
                out.with_created_lt(created_lt).to_message()
            })
            .collect::<VmResult<Vec<_>>>()?;
        let in_message = msg.wrap(Bytes::copy_from_slice(call.message));

        let record = VmTransaction {
            account: address,
            lt,
            prev_trans_lt: prev.last_trans_lt,
            prev_trans_hash: prev.last_trans_hash.clone(),
            now: call.utime,
            aborted,
            exit_code: exit_code.unwrap_or(0),
            in_msg: in_message.hash.clone(),
            out_msgs: out_messages.iter().map(|m| m.hash.clone()).collect(),
        };
        let tx_boc = serde_json::to_vec(&record).map_err(codec_error)?;
        let hash = sha256_hex(&tx_boc);

        account.last_trans_lt = lt;
        account.last_trans_hash = Some(hash.clone());
        account.gen_utime = call.utime;
        let account_boc = if destroyed || account.is_empty() {
            Bytes::new()
        } else {
            account.encode()?
        };

        let trace = call.trace.then(|| {
            let code_hash = Self::code_hash(prev.code.as_deref().unwrap_or_default());
            render_trace(&code_hash, msg.value, &msg.body, exit_code)
        });

        Ok(RawExecution {
            account: account_boc,
            transaction: Transaction {
                hash,
                lt,
                now: call.utime,
                aborted,
                in_message,
                out_messages,
                boc: Bytes::from(tx_boc),
            },
            trace,
        })
    }

    fn decode_account(&self, address: &str, boc: &[u8], kind: BocKind) -> VmResult<Option<AccountState>> {
        if boc.is_empty() {
            return Ok(None);
        }
        let vm = VmAccount::decode(boc)?;
        let last_transaction_id = match (kind, &vm.last_trans_hash) {
            (BocKind::FullAccount, Some(hash)) => Some(LastTransactionId {
                lt: vm.last_trans_lt,
                hash: hash.clone(),
            }),
            _ => None,
        };

        Ok(Some(AccountState {
            address: address.to_string(),
            boc: Bytes::copy_from_slice(boc),
            balance: u128::from(vm.balance),
            is_deployed: vm.is_deployed(),
            code_hash: vm.code.as_deref().map(Self::code_hash),
            last_transaction_id,
            gen_timings: GenTimings {
                gen_lt: vm.last_trans_lt,
                gen_utime: vm.gen_utime,
            },
        }))
    }

    fn decode_message(&self, boc: &[u8]) -> VmResult<Message> {
        let msg = VmMessage::decode(boc)?;
        Ok(msg.wrap(Bytes::copy_from_slice(boc)))
    }

    fn capabilities(&self, _config: &[u8]) -> VmResult<u64> {
        Ok(REFERENCE_CAPABILITIES)
    }
}
