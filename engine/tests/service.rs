//! End-to-end orchestrator tests against fake collaborators — no real chain,
//! Lightning, or wallet process is involved.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use swap_core::currency::{Currency, CurrencyKind, NetworkDescriptor};
use swap_core::model::Limits;
use swap_core::model::Pair;
use swap_core::ServiceError;

use swap_engine::collaborators::{
    AccountHtlcParams, AccountHtlcOutput, AccountProvider, BlockchainInfo, ChainClient, ChainRpcError,
    ChannelBalance, HtlcBuilder, KeyPair, LightningInfo, LndClient, NetworkInfo, PaymentResult,
    SendResult, UtxoHtlcParams, UtxoHtlcOutput, Wallet, WalletBalance,
};
use swap_engine::currency::CurrencyRuntime;
use swap_engine::service::{CreateReverseSwapArgs, CreateSwapArgs, Service};

struct FakeChainClient {
    fee_rate: f64,
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn get_network_info(&self) -> anyhow::Result<NetworkInfo> {
        Ok(NetworkInfo { version: "25.0".to_string(), connections: 8 })
    }
    async fn get_blockchain_info(&self) -> anyhow::Result<BlockchainInfo> {
        Ok(BlockchainInfo { blocks: 800_000, scanned_blocks: 800_000 })
    }
    async fn estimate_fee(&self, _blocks: u32) -> anyhow::Result<f64> {
        Ok(self.fee_rate)
    }
    async fn get_raw_transaction(&self, _txid: &str) -> anyhow::Result<String> {
        Ok("deadbeef".to_string())
    }
    async fn send_raw_transaction(&self, _hex: &str) -> Result<String, ChainRpcError> {
        Ok("broadcast-txid".to_string())
    }
}

struct FakeLndClient;

#[async_trait]
impl LndClient for FakeLndClient {
    async fn get_info(&self) -> anyhow::Result<LightningInfo> {
        Ok(LightningInfo {
            version: "0.17".to_string(),
            block_height: 800_000,
            num_active_channels: 2,
            num_inactive_channels: 0,
            num_pending_channels: 0,
            identity_pubkey: "02node".to_string(),
            uris: vec!["02node@10.0.0.1:9735".to_string()],
        })
    }
    async fn list_channels(&self) -> anyhow::Result<Vec<ChannelBalance>> {
        Ok(vec![
            ChannelBalance { local_balance: 1, remote_balance: 2 },
            ChannelBalance { local_balance: 1, remote_balance: 2 },
        ])
    }
    async fn send_payment(&self, _invoice: &str) -> anyhow::Result<PaymentResult> {
        Ok(PaymentResult { payment_hash: "hash".to_string(), payment_preimage: "preimage".to_string() })
    }
}

struct FakeAccountProvider;

#[async_trait]
impl AccountProvider for FakeAccountProvider {
    async fn get_block_number(&self) -> anyhow::Result<u64> {
        Ok(1_000)
    }
    async fn get_gas_price(&self) -> anyhow::Result<u64> {
        Ok(20_000_000_000)
    }
}

struct FakeWallet;

#[async_trait]
impl Wallet for FakeWallet {
    async fn get_balance(&self) -> anyhow::Result<WalletBalance> {
        Ok(WalletBalance { total: 1, confirmed: 2, unconfirmed: 3 })
    }
    async fn get_address(&self) -> anyhow::Result<String> {
        Ok("bc1qfakeaddress".to_string())
    }
    async fn get_keys_by_index(&self, index: u64) -> anyhow::Result<KeyPair> {
        Ok(KeyPair { public_key: format!("02pub{index}"), private_key: format!("priv{index}") })
    }
    async fn send_to_address(&self, _address: &str, _amount: u64, _fee: Option<f64>) -> anyhow::Result<SendResult> {
        Ok(SendResult { transaction_id: "sendtx".to_string(), vout: Some(0) })
    }
    async fn sweep_wallet(&self, _address: &str, _fee: Option<f64>) -> anyhow::Result<SendResult> {
        Ok(SendResult { transaction_id: "sweeptx".to_string(), vout: Some(0) })
    }
}

struct FakeHtlcBuilder;

#[async_trait]
impl HtlcBuilder for FakeHtlcBuilder {
    async fn build_utxo_lockup(&self, _params: UtxoHtlcParams) -> anyhow::Result<UtxoHtlcOutput> {
        Ok(UtxoHtlcOutput { redeem_script: "76a914deadbeef88ac".to_string(), lockup_address: "bc1qlockup".to_string() })
    }
    async fn build_account_lockup(&self, _params: AccountHtlcParams) -> anyhow::Result<AccountHtlcOutput> {
        Ok(AccountHtlcOutput { contract_address: "0xcontract".to_string() })
    }
}

fn btc() -> Currency {
    Currency {
        symbol: "BTC".to_string(),
        kind: CurrencyKind::BitcoinLike,
        network: NetworkDescriptor { name: "mainnet".to_string(), chain_id: None },
        native_chain_symbol: None,
    }
}

fn btc_btc_pair() -> Pair {
    Pair {
        base: "BTC".to_string(),
        quote: "BTC".to_string(),
        rate: 1.0,
        limits: Limits { minimal: 10_000, maximal: 4_000_000 },
        hash: String::new(),
        percentage_fee: 0.02,
        timeout_block_delta: 144,
    }
}

async fn build_service(fee_rate: f64) -> Service {
    let mut percentage_fees = HashMap::new();
    percentage_fees.insert("BTC/BTC".to_string(), 0.02);

    let service = Service::new(percentage_fees, HashMap::new(), "test".to_string());

    let runtime = CurrencyRuntime {
        currency: btc(),
        chain_client: Some(Arc::new(FakeChainClient { fee_rate })),
        lnd_client: Some(Arc::new(FakeLndClient)),
        account_provider: Some(Arc::new(FakeAccountProvider)),
        wallet: Some(Arc::new(FakeWallet)),
    };
    service.register_currency(runtime, Some(Arc::new(FakeHtlcBuilder))).await;

    service.init(vec![btc_btc_pair()], vec![btc()]).await.unwrap();
    service
}

#[tokio::test]
async fn creates_forward_swap_with_refund_public_key() {
    let service = build_service(2.0).await;

    let response = service
        .create_swap(CreateSwapArgs {
            pair_id: "BTC/BTC".to_string(),
            order_side: "buy".to_string(),
            preimage_hash: vec![1; 32],
            refund_public_key: Some("02refund".to_string()),
            claim_address: None,
            channel: None,
            referral_id: None,
        })
        .await
        .unwrap();

    assert_eq!(response.address, "bc1qlockup");
    assert!(response.redeem_script.is_some());
    assert!(response.claim_address.is_none());
    assert_eq!(response.timeout_block_height, 144);
}

#[tokio::test]
async fn rejects_duplicate_preimage_hash() {
    let service = build_service(2.0).await;
    let args = || CreateSwapArgs {
        pair_id: "BTC/BTC".to_string(),
        order_side: "buy".to_string(),
        preimage_hash: vec![7; 32],
        refund_public_key: Some("02refund".to_string()),
        claim_address: None,
        channel: None,
        referral_id: None,
    };

    service.create_swap(args()).await.unwrap();
    let err = service.create_swap(args()).await.unwrap_err();
    assert!(matches!(err, ServiceError::SwapWithPreimageExists));
}

#[tokio::test]
async fn forward_swap_requires_refund_public_key_for_bitcoin_like() {
    let service = build_service(2.0).await;
    let err = service
        .create_swap(CreateSwapArgs {
            pair_id: "BTC/BTC".to_string(),
            order_side: "buy".to_string(),
            preimage_hash: vec![2; 32],
            refund_public_key: None,
            claim_address: None,
            channel: None,
            referral_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UndefinedParameter(_)));
}

#[tokio::test]
async fn set_swap_invoice_rejects_malformed_invoice() {
    let service = build_service(2.0).await;
    let created = service
        .create_swap(CreateSwapArgs {
            pair_id: "BTC/BTC".to_string(),
            order_side: "buy".to_string(),
            preimage_hash: vec![3; 32],
            refund_public_key: Some("02refund".to_string()),
            claim_address: None,
            channel: None,
            referral_id: None,
        })
        .await
        .unwrap();

    let err = service
        .set_swap_invoice(created.id, "not-a-bolt11-invoice".to_string(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UndefinedParameter(_)));
}

#[tokio::test]
async fn reverse_swap_disabled_by_flag() {
    let service = build_service(2.0).await;
    service.set_allow_reverse_swaps(false);

    let err = service
        .create_reverse_swap(CreateReverseSwapArgs {
            pair_id: "BTC/BTC".to_string(),
            order_side: "buy".to_string(),
            preimage_hash: vec![4; 32],
            invoice_amount: Some(100_000),
            onchain_amount: None,
            pair_hash: None,
            routing_node: None,
            referral_id: None,
            claim_public_key: Some("02claim".to_string()),
            claim_address: None,
            prepay_miner_fee: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ReverseSwapsDisabled));
}

#[tokio::test]
async fn reverse_swap_invoice_amount_path_matches_fee_formula() {
    // base_fee = ceil(2.0 sat/vByte * 153 vBytes) = 306
    let service = build_service(2.0).await;

    let response = service
        .create_reverse_swap(CreateReverseSwapArgs {
            pair_id: "BTC/BTC".to_string(),
            order_side: "buy".to_string(),
            preimage_hash: vec![5; 32],
            invoice_amount: Some(100_000),
            onchain_amount: None,
            pair_hash: None,
            routing_node: None,
            referral_id: None,
            claim_public_key: Some("02claim".to_string()),
            claim_address: None,
            prepay_miner_fee: false,
        })
        .await
        .unwrap();

    // percentageFee = ceil(0.02 * 100000 * 1) = 2000
    // onchainAmount = floor(100000*1 - 2000 - 306) = 97694
    assert_eq!(response.onchain_amount, Some(97_694));
    assert!(response.prepay_miner_fee_amount.is_none());
}

#[tokio::test]
async fn reverse_swap_rejects_both_amounts_specified() {
    let service = build_service(2.0).await;
    let err = service
        .create_reverse_swap(CreateReverseSwapArgs {
            pair_id: "BTC/BTC".to_string(),
            order_side: "buy".to_string(),
            preimage_hash: vec![6; 32],
            invoice_amount: Some(100_000),
            onchain_amount: Some(90_000),
            pair_hash: None,
            routing_node: None,
            referral_id: None,
            claim_public_key: Some("02claim".to_string()),
            claim_address: None,
            prepay_miner_fee: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvoiceAndOnchainAmountSpecified));
}

#[tokio::test]
async fn get_balance_aggregates_wallet_and_channels() {
    let service = build_service(2.0).await;
    let balances = service.get_balance().await;
    let btc_balance = &balances["BTC"];

    let wallet = btc_balance.wallet.as_ref().unwrap();
    assert_eq!(wallet.total, 1);
    assert_eq!(wallet.confirmed, 2);

    let lightning = btc_balance.lightning.as_ref().unwrap();
    assert_eq!(lightning.local_balance, 2);
    assert_eq!(lightning.remote_balance, 4);
}

#[tokio::test]
async fn get_pairs_reports_reverse_swaps_disabled_warning() {
    let service = build_service(2.0).await;
    service.set_allow_reverse_swaps(false);

    let response = service.get_pairs().await;
    assert!(response.warnings.contains(&"ReverseSwapsDisabled".to_string()));
    assert!(response.pairs.contains_key("BTC/BTC"));
}

#[tokio::test]
async fn init_snapshots_lightning_node_uris() {
    let service = build_service(2.0).await;

    let nodes = service.get_nodes().await;
    let btc_node = nodes.get("BTC").expect("BTC node snapshot missing");
    assert_eq!(btc_node.pubkey, "02node");
    assert_eq!(btc_node.uris, vec!["02node@10.0.0.1:9735".to_string()]);
}
