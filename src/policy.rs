//! Redaction policy
//!
//! One rule per recognized RPC method. The policy is an allow-list of
//! redaction rules: unrecognized methods are never blocked or altered.
//! Decisions are pure functions over already-fetched bindings; all cache
//! traffic happens before [`decide`] is called.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::address::AddressKey;
use crate::crypto::keccak256;
use crate::rpc::JsonrpcMessage;

/// Unauthorized balance query
pub const ERR_UNAUTHORIZED_BALANCE: i64 = -32802;
/// Unauthorized transaction-count (nonce) query
pub const ERR_UNAUTHORIZED_TX_COUNT: i64 = -32803;

/// Canonical empty transaction input
const EMPTY_INPUT: &str = "0x";

/// The closed set of methods the policy has rules for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    GetBalance,
    GetTransactionByHash,
    GetTransactionCount,
    GetTransactionReceipt,
    GetBlockByHash,
    GetBlockByNumber,
}

impl RpcMethod {
    /// Map a wire method name onto the rule table. `None` means the method
    /// has no redaction rule and passes through untouched.
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "eth_getBalance" => Some(RpcMethod::GetBalance),
            "eth_getTransactionByHash" => Some(RpcMethod::GetTransactionByHash),
            "eth_getTransactionCount" => Some(RpcMethod::GetTransactionCount),
            "eth_getTransactionReceipt" => Some(RpcMethod::GetTransactionReceipt),
            "eth_getBlockByHash" => Some(RpcMethod::GetBlockByHash),
            "eth_getBlockByNumber" => Some(RpcMethod::GetBlockByNumber),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::GetBalance => "eth_getBalance",
            RpcMethod::GetTransactionByHash => "eth_getTransactionByHash",
            RpcMethod::GetTransactionCount => "eth_getTransactionCount",
            RpcMethod::GetTransactionReceipt => "eth_getTransactionReceipt",
            RpcMethod::GetBlockByHash => "eth_getBlockByHash",
            RpcMethod::GetBlockByNumber => "eth_getBlockByNumber",
        }
    }
}

/// Outcome of applying the policy to one response. Consumed exactly once by
/// the interceptor.
#[derive(Debug, Clone, PartialEq)]
pub enum RedactionDecision {
    /// Emit the original bytes verbatim
    Pass,
    /// Replace the whole response with an authorization error
    Error { code: i64, message: String },
    /// Replace the success payload with the redacted value
    Rewrite(Value),
}

/// Tokens fetched for the addresses a request touches. Addresses with no
/// live binding are simply absent.
pub type TokenBindings = HashMap<AddressKey, String>;

/// The authorization predicate used by every rule: fail-closed.
///
/// A missing caller token, an empty caller token, or a missing binding is
/// never authorized.
fn authorized(caller_token: Option<&str>, bound: Option<&String>) -> bool {
    match (caller_token, bound) {
        (Some(caller), Some(bound)) if !caller.is_empty() => caller == bound.as_str(),
        _ => false,
    }
}

/// Addresses whose bindings the interceptor must fetch before calling
/// [`decide`].
pub fn addresses_of_interest(
    method: RpcMethod,
    request: &JsonrpcMessage,
    response: &JsonrpcMessage,
) -> Vec<AddressKey> {
    match method {
        RpcMethod::GetBalance | RpcMethod::GetTransactionCount => request
            .param_str(0)
            .and_then(|s| AddressKey::parse(s).ok())
            .into_iter()
            .collect(),
        RpcMethod::GetTransactionByHash => response
            .result
            .as_ref()
            .and_then(Value::as_object)
            .map(transaction_addresses)
            .unwrap_or_default(),
        RpcMethod::GetTransactionReceipt => Vec::new(),
        RpcMethod::GetBlockByHash | RpcMethod::GetBlockByNumber => {
            if !request.param_bool(1) {
                return Vec::new();
            }
            block_transactions(response)
                .map(|txs| {
                    txs.iter()
                        .filter_map(Value::as_object)
                        .flat_map(transaction_addresses)
                        .collect()
                })
                .unwrap_or_default()
        }
    }
}

/// Apply the rule for `method` to one request/response pair.
pub fn decide(
    method: RpcMethod,
    request: &JsonrpcMessage,
    response: &JsonrpcMessage,
    caller_token: Option<&str>,
    bindings: &TokenBindings,
) -> RedactionDecision {
    match method {
        RpcMethod::GetBalance => decide_account_query(
            request,
            caller_token,
            bindings,
            ERR_UNAUTHORIZED_BALANCE,
            "unauthorized to get balance",
        ),
        RpcMethod::GetTransactionCount => decide_account_query(
            request,
            caller_token,
            bindings,
            ERR_UNAUTHORIZED_TX_COUNT,
            "unauthorized to get transaction count",
        ),
        RpcMethod::GetTransactionByHash => decide_transaction(response, caller_token, bindings),
        RpcMethod::GetTransactionReceipt => RedactionDecision::Pass,
        RpcMethod::GetBlockByHash | RpcMethod::GetBlockByNumber => {
            decide_block(request, response, caller_token, bindings)
        }
    }
}

/// Balance and nonce queries: the single address parameter must carry a
/// binding equal to the caller's token, otherwise the whole response is
/// replaced with an authorization error.
fn decide_account_query(
    request: &JsonrpcMessage,
    caller_token: Option<&str>,
    bindings: &TokenBindings,
    code: i64,
    message: &str,
) -> RedactionDecision {
    let bound = request
        .param_str(0)
        .and_then(|s| AddressKey::parse(s).ok())
        .and_then(|key| bindings.get(&key));

    if authorized(caller_token, bound) {
        RedactionDecision::Pass
    } else {
        RedactionDecision::Error {
            code,
            message: message.to_string(),
        }
    }
}

/// Transaction-by-hash: redact the input field unless the caller holds the
/// token bound to the sender or recipient.
fn decide_transaction(
    response: &JsonrpcMessage,
    caller_token: Option<&str>,
    bindings: &TokenBindings,
) -> RedactionDecision {
    if response.error.is_some() {
        return RedactionDecision::Pass;
    }
    let Some(tx) = response.result.as_ref().and_then(Value::as_object) else {
        return RedactionDecision::Pass;
    };
    match redact_transaction(tx, caller_token, bindings) {
        Some(redacted) => RedactionDecision::Rewrite(Value::Object(redacted)),
        None => RedactionDecision::Pass,
    }
}

/// Block queries: without the full-transactions flag only hashes are
/// present and the block passes through byte-identical. With it, the
/// transaction rule applies independently to every embedded transaction.
fn decide_block(
    request: &JsonrpcMessage,
    response: &JsonrpcMessage,
    caller_token: Option<&str>,
    bindings: &TokenBindings,
) -> RedactionDecision {
    if !request.param_bool(1) || response.error.is_some() {
        return RedactionDecision::Pass;
    }
    let Some(block) = response.result.as_ref().and_then(Value::as_object) else {
        return RedactionDecision::Pass;
    };
    let Some(txs) = block.get("transactions").and_then(Value::as_array) else {
        return RedactionDecision::Pass;
    };

    let mut changed = false;
    let rewritten: Vec<Value> = txs
        .iter()
        .map(|tx| match tx.as_object() {
            Some(obj) => match redact_transaction(obj, caller_token, bindings) {
                Some(redacted) => {
                    changed = true;
                    Value::Object(redacted)
                }
                None => tx.clone(),
            },
            None => tx.clone(),
        })
        .collect();

    if !changed {
        return RedactionDecision::Pass;
    }

    let mut new_block = block.clone();
    new_block.insert("transactions".to_string(), Value::Array(rewritten));
    RedactionDecision::Rewrite(Value::Object(new_block))
}

/// Sender and (when present) recipient of a transaction object
fn transaction_addresses(tx: &Map<String, Value>) -> Vec<AddressKey> {
    ["from", "to"]
        .iter()
        .filter_map(|field| tx.get(*field))
        .filter_map(Value::as_str)
        .filter_map(|s| AddressKey::parse(s).ok())
        .collect()
}

fn block_transactions(response: &JsonrpcMessage) -> Option<&Vec<Value>> {
    response
        .result
        .as_ref()?
        .as_object()?
        .get("transactions")?
        .as_array()
}

/// Apply the per-transaction rule.
///
/// Returns the redacted transaction, or `None` when the original must be
/// kept (empty input, or the caller is authorized). The redacted input is a
/// one-way commitment: the Keccak-256 hash of the original input bytes,
/// never the plaintext.
fn redact_transaction(
    tx: &Map<String, Value>,
    caller_token: Option<&str>,
    bindings: &TokenBindings,
) -> Option<Map<String, Value>> {
    let input = tx.get("input").and_then(Value::as_str)?;
    if input.is_empty() || input == EMPTY_INPUT {
        return None;
    }

    for key in transaction_addresses(tx) {
        if authorized(caller_token, bindings.get(&key)) {
            return None;
        }
    }

    let stripped = input.strip_prefix("0x").unwrap_or(input);
    let input_bytes = hex::decode(stripped).unwrap_or_else(|_| stripped.as_bytes().to_vec());
    let commitment = keccak256(&[&input_bytes]);

    let mut redacted = tx.clone();
    redacted.insert(
        "input".to_string(),
        Value::String(format!("0x{}", hex::encode(commitment))),
    );
    Some(redacted)
}
