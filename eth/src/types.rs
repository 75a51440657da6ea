//! Typed results for the convenience methods.
//!
//! Nodes return blocks, transactions, and logs with hex-encoded quantities
//! and lower-case addresses. The types here are what the provider hands
//! back after reshaping: quantities as integers, addresses in checksum
//! casing, and absent optional fields as `None`.

use crate::address::{checksummed, opt_checksummed};
use crate::quantity::{quantity_opt_u64, quantity_opt_u128, quantity_u64, quantity_u128, to_hex};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Network identity reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Result of `net_version`
    pub network_id: u64,
    /// Result of `eth_chainId`
    pub chain_id: u64,
}

/// Block selector for `eth_getBlockByNumber` and log ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    /// A specific height
    Number(u64),
    /// Most recent block
    Latest,
    /// Genesis
    Earliest,
    /// Pending state
    Pending,
    /// Latest safe head
    Safe,
    /// Latest finalized block
    Finalized,
}

impl BlockTag {
    /// The JSON-RPC parameter form: a hex quantity or a tag name.
    #[must_use]
    pub fn to_param(self) -> String {
        match self {
            Self::Number(n) => to_hex(n),
            Self::Latest => "latest".to_string(),
            Self::Earliest => "earliest".to_string(),
            Self::Pending => "pending".to_string(),
            Self::Safe => "safe".to_string(),
            Self::Finalized => "finalized".to_string(),
        }
    }
}

impl From<u64> for BlockTag {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

/// A block with reshaped header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Height
    pub number: u64,
    /// Block hash
    pub hash: String,
    /// Unix timestamp in seconds
    pub timestamp: u64,
    /// Parent block hash
    pub parent_hash: String,
    /// Beacon root, post-Dencun only
    pub parent_beacon_block_root: Option<String>,
    /// Proof-of-work nonce
    pub nonce: Option<String>,
    /// Difficulty (zero after the merge)
    pub difficulty: u128,
    /// Cumulative difficulty, if the node still reports it
    pub total_difficulty: Option<u128>,
    /// Gas limit
    pub gas_limit: u128,
    /// Gas used
    pub gas_used: u128,
    /// State trie root
    pub state_root: String,
    /// Receipts trie root
    pub receipts_root: String,
    /// Blob gas used, post-Dencun only
    pub blob_gas_used: Option<u128>,
    /// Excess blob gas, post-Dencun only
    pub excess_blob_gas: Option<u128>,
    /// Fee recipient, checksummed
    pub miner: String,
    /// Extra data bytes as hex
    pub extra_data: String,
    /// Base fee, post-London only
    pub base_fee_per_gas: Option<u128>,
    /// Transaction hashes, in block order
    pub transactions: Vec<String>,
    /// Full transactions, present when they were requested
    pub prefetched_transactions: Option<Vec<Transaction>>,
}

/// Signature components of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// `r` as hex
    pub r: String,
    /// `s` as hex
    pub s: String,
    /// Parity bit of typed transactions
    #[serde(default, deserialize_with = "quantity_opt_u64")]
    pub y_parity: Option<u64>,
}

/// One entry of an access list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// Accessed account, checksummed
    #[serde(deserialize_with = "checksummed")]
    pub address: String,
    /// Accessed storage slots
    pub storage_keys: Vec<String>,
}

/// A transaction as included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Including block height
    #[serde(default, deserialize_with = "quantity_opt_u64")]
    pub block_number: Option<u64>,
    /// Including block hash
    #[serde(default)]
    pub block_hash: Option<String>,
    /// Position within the block
    #[serde(rename = "transactionIndex", default, deserialize_with = "quantity_opt_u64")]
    pub index: Option<u64>,
    /// Transaction hash
    pub hash: String,
    /// Envelope type (0 for legacy)
    #[serde(rename = "type", default, deserialize_with = "quantity_u64")]
    pub tx_type: u64,
    /// Sender, checksummed
    #[serde(deserialize_with = "checksummed")]
    pub from: String,
    /// Recipient, checksummed; `None` for contract creation
    #[serde(default, deserialize_with = "opt_checksummed")]
    pub to: Option<String>,
    /// Sender nonce
    #[serde(deserialize_with = "quantity_u64")]
    pub nonce: u64,
    /// Legacy recovery id
    #[serde(default, deserialize_with = "quantity_opt_u64")]
    pub v: Option<u64>,
    /// Gas limit
    #[serde(rename = "gas", deserialize_with = "quantity_u128")]
    pub gas_limit: u128,
    /// Gas price (effective price for typed transactions)
    #[serde(default, deserialize_with = "quantity_opt_u128")]
    pub gas_price: Option<u128>,
    /// Priority fee cap, EIP-1559 only
    #[serde(default, deserialize_with = "quantity_opt_u128")]
    pub max_priority_fee_per_gas: Option<u128>,
    /// Fee cap, EIP-1559 only
    #[serde(default, deserialize_with = "quantity_opt_u128")]
    pub max_fee_per_gas: Option<u128>,
    /// Call data as hex
    #[serde(rename = "input")]
    pub data: String,
    /// Transferred value in wei
    #[serde(deserialize_with = "quantity_u128")]
    pub value: u128,
    /// Chain id, for replay-protected transactions
    #[serde(default, deserialize_with = "quantity_opt_u64")]
    pub chain_id: Option<u64>,
    /// Signature components
    #[serde(flatten)]
    pub signature: Signature,
    /// Access list, typed transactions only
    #[serde(default)]
    pub access_list: Option<Vec<AccessListItem>>,
}

/// A log entry returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Emitting transaction
    pub transaction_hash: String,
    /// Including block hash
    pub block_hash: String,
    /// Including block height
    #[serde(deserialize_with = "quantity_u64")]
    pub block_number: u64,
    /// Always `false`; logs come from canonical ranges
    #[serde(skip_deserializing)]
    pub removed: bool,
    /// Emitting contract, checksummed
    #[serde(deserialize_with = "checksummed")]
    pub address: String,
    /// Non-indexed data as hex
    pub data: String,
    /// Indexed topics
    pub topics: Vec<String>,
    /// Position within the block
    #[serde(rename = "logIndex", deserialize_with = "quantity_u64")]
    pub index: u64,
    /// Position of the emitting transaction within the block
    #[serde(deserialize_with = "quantity_u64")]
    pub transaction_index: u64,
}

/// One topic position in a [`LogFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TopicFilter {
    /// Match anything
    Any,
    /// Match this topic
    Exact(String),
    /// Match any of these topics
    OneOf(Vec<String>),
}

/// Parameters for [`get_logs`](crate::JsonRpcProvider::get_logs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Restrict to one emitting contract
    pub address: Option<String>,
    /// Topic constraints by position
    pub topics: Vec<TopicFilter>,
    /// First block of the range
    pub from_block: BlockTag,
    /// Last block of the range
    pub to_block: BlockTag,
}

impl LogFilter {
    /// Filter matching every log in `from..=to`.
    #[must_use]
    pub fn range(from: impl Into<BlockTag>, to: impl Into<BlockTag>) -> Self {
        Self {
            address: None,
            topics: Vec::new(),
            from_block: from.into(),
            to_block: to.into(),
        }
    }

    /// Restrict to logs emitted by `address`.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Append a topic constraint for the next position.
    #[must_use]
    pub fn topic(mut self, topic: TopicFilter) -> Self {
        self.topics.push(topic);
        self
    }

    /// The `eth_getLogs` filter object.
    #[must_use]
    pub fn to_param(&self) -> Value {
        json!({
            "address": self.address,
            "topics": self.topics,
            "fromBlock": self.from_block.to_param(),
            "toBlock": self.to_block.to_param(),
        })
    }
}

/// Entry of a block's `transactions` array: hashes by default, full
/// objects when the call asked for them.
#[derive(Deserialize)]
#[serde(untagged)]
enum BlockTransaction {
    Hash(String),
    Full(Box<Transaction>),
}

/// Block as the node encodes it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawBlock {
    #[serde(deserialize_with = "quantity_u64")]
    number: u64,
    hash: String,
    #[serde(deserialize_with = "quantity_u64")]
    timestamp: u64,
    parent_hash: String,
    #[serde(default)]
    parent_beacon_block_root: Option<String>,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default, deserialize_with = "quantity_u128")]
    difficulty: u128,
    #[serde(default, deserialize_with = "quantity_opt_u128")]
    total_difficulty: Option<u128>,
    #[serde(deserialize_with = "quantity_u128")]
    gas_limit: u128,
    #[serde(deserialize_with = "quantity_u128")]
    gas_used: u128,
    state_root: String,
    receipts_root: String,
    #[serde(default, deserialize_with = "quantity_opt_u128")]
    blob_gas_used: Option<u128>,
    #[serde(default, deserialize_with = "quantity_opt_u128")]
    excess_blob_gas: Option<u128>,
    #[serde(deserialize_with = "checksummed")]
    miner: String,
    #[serde(default)]
    extra_data: String,
    #[serde(default, deserialize_with = "quantity_opt_u128")]
    base_fee_per_gas: Option<u128>,
    #[serde(default)]
    transactions: Vec<BlockTransaction>,
}

impl RawBlock {
    /// Reshape into a [`Block`]. With `prefetched`, full transaction objects
    /// move to `prefetched_transactions` and `transactions` keeps their
    /// hashes.
    pub(crate) fn into_block(self, prefetched: bool) -> Block {
        let mut hashes = Vec::with_capacity(self.transactions.len());
        let mut full = Vec::new();
        for tx in self.transactions {
            match tx {
                BlockTransaction::Hash(hash) => hashes.push(hash),
                BlockTransaction::Full(tx) => {
                    hashes.push(tx.hash.clone());
                    full.push(*tx);
                }
            }
        }

        Block {
            number: self.number,
            hash: self.hash,
            timestamp: self.timestamp,
            parent_hash: self.parent_hash,
            parent_beacon_block_root: self.parent_beacon_block_root,
            nonce: self.nonce,
            difficulty: self.difficulty,
            total_difficulty: self.total_difficulty,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            state_root: self.state_root,
            receipts_root: self.receipts_root,
            blob_gas_used: self.blob_gas_used,
            excess_blob_gas: self.excess_blob_gas,
            miner: self.miner,
            extra_data: self.extra_data,
            base_fee_per_gas: self.base_fee_per_gas,
            transactions: hashes,
            prefetched_transactions: prefetched.then_some(full),
        }
    }
}
