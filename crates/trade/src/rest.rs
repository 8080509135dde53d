use async_trait::async_trait;
use candlewick_core::config::BrokerConfig;
use candlewick_core::trade::entity::{
    AccountInfo, Balance, OrderId, OrderReceipt, OrderSide, OrderStatus,
};
use candlewick_core::trade::port::{Broker, TradeError};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

// 交易所错误码：余额不足
const CODE_INSUFFICIENT_BALANCE: i64 = -2010;
// 交易所错误码：订单不存在
const CODE_UNKNOWN_ORDER: i64 = -2011;

/// # Summary
/// Binance 兼容现货 REST 接口的券商实现。
///
/// # Invariants
/// - 私有接口全部使用 HMAC-SHA256 签名，签名覆盖包含 `recvWindow` 与 `timestamp` 的完整查询串。
/// - 金额与数量在请求与响应中都以十进制字符串传输。
pub struct RestBroker {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    quote_asset: String,
    recv_window_ms: u64,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Deserialize, Debug)]
struct AccountResponse {
    balances: Vec<AssetBalance>,
}

#[derive(Deserialize, Debug)]
struct AssetBalance {
    asset: String,
    free: Decimal,
    locked: Decimal,
}

#[derive(Deserialize, Debug)]
struct TickerPrice {
    price: Decimal,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: i64,
    symbol: String,
    status: String,
    orig_qty: Decimal,
    executed_qty: Decimal,
}

/// # Summary
/// 对参数编码并追加签名。
///
/// # Logic
/// 1. 依次追加 `recvWindow` (大于 0 时) 与 `timestamp`。
/// 2. URL 编码为查询串。
/// 3. 以密钥对查询串计算 HMAC-SHA256，十六进制编码后作为 `signature` 追加。
pub fn sign_query(
    secret: &str,
    mut params: Vec<(String, String)>,
    recv_window_ms: u64,
    timestamp_ms: i64,
) -> Result<String, TradeError> {
    if recv_window_ms > 0 {
        params.push(("recvWindow".into(), recv_window_ms.to_string()));
    }
    params.push(("timestamp".into(), timestamp_ms.to_string()));

    let query = serde_urlencoded::to_string(&params)
        .map_err(|e| TradeError::BrokerIntegrationError(e.to_string()))?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TradeError::BrokerIntegrationError(format!("failed to init signer: {}", e)))?;
    mac.update(query.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("{}&signature={}", query, signature))
}

fn parse_status(status: &str) -> OrderStatus {
    match status {
        "FILLED" => OrderStatus::Filled,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "CANCELED" | "EXPIRED" => OrderStatus::Canceled,
        "REJECTED" => OrderStatus::Rejected,
        _ => OrderStatus::New,
    }
}

/// # Summary
/// 把交易所的错误响应映射为 `TradeError`。
fn map_api_error(status: reqwest::StatusCode, body: &str) -> TradeError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(err) if err.code == CODE_INSUFFICIENT_BALANCE => TradeError::Rejected(err.msg),
        Ok(err) if err.code == CODE_UNKNOWN_ORDER => TradeError::OrderNotFound(err.msg),
        Ok(err) if status.is_client_error() => {
            TradeError::Rejected(format!("{} ({})", err.msg, err.code))
        }
        Ok(err) => TradeError::BrokerIntegrationError(format!("{} ({})", err.msg, err.code)),
        Err(_) => TradeError::BrokerIntegrationError(format!("HTTP {}: {}", status, body)),
    }
}

impl RestBroker {
    /// # Summary
    /// 根据券商配置创建客户端。
    ///
    /// # Returns
    /// 缺少 API 凭证或 HTTP 客户端初始化失败时返回 `BrokerIntegrationError`。
    pub fn new(config: &BrokerConfig) -> Result<Self, TradeError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(TradeError::BrokerIntegrationError(
                "api_key and api_secret are required for the rest broker".into(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TradeError::BrokerIntegrationError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            quote_asset: config.quote_asset.clone(),
            recv_window_ms: config.recv_window_ms,
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: String,
        signed: bool,
    ) -> Result<T, TradeError> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        let mut request = self.client.request(method.clone(), &url);
        if signed {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TradeError::BrokerIntegrationError(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TradeError::BrokerIntegrationError(e.to_string()))?;
        debug!(%method, path, %status, "broker response");

        if !status.is_success() {
            return Err(map_api_error(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| TradeError::BrokerIntegrationError(format!("{}: {}", path, e)))
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T, TradeError> {
        let query = sign_query(
            &self.api_secret,
            params,
            self.recv_window_ms,
            Utc::now().timestamp_millis(),
        )?;
        self.send(method, path, query, true).await
    }

    async fn ticker_price(&self, symbol: &str) -> Result<Decimal, TradeError> {
        let query = serde_urlencoded::to_string([("symbol", symbol)])
            .map_err(|e| TradeError::BrokerIntegrationError(e.to_string()))?;
        let ticker: TickerPrice = self
            .send(Method::GET, "/api/v3/ticker/price", query, false)
            .await?;
        Ok(ticker.price)
    }

    async fn fetch_balances(&self) -> Result<Vec<Balance>, TradeError> {
        let account: AccountResponse = self
            .signed(Method::GET, "/api/v3/account", Vec::new())
            .await?;
        Ok(account
            .balances
            .into_iter()
            .map(|b| Balance {
                total: b.free + b.locked,
                free: b.free,
                coin: b.asset,
            })
            .filter(|b| !b.total.is_zero())
            .collect())
    }
}

#[async_trait]
impl Broker for RestBroker {
    /// # Summary
    /// 查询账户概况。
    ///
    /// # Logic
    /// 1. 拉取全部非零余额。
    /// 2. 非计价资产按 `<coin><quote>` 的最新成交价折算为计价资产。
    async fn account_info(&self) -> Result<AccountInfo, TradeError> {
        let balances = self.fetch_balances().await?;

        let mut total = Decimal::ZERO;
        let mut free_collateral = Decimal::ZERO;
        for balance in &balances {
            if balance.coin == self.quote_asset {
                total += balance.total;
                free_collateral = balance.free;
            } else {
                let price = self
                    .ticker_price(&format!("{}{}", balance.coin, self.quote_asset))
                    .await?;
                total += balance.total * price;
            }
        }

        Ok(AccountInfo {
            quote_asset: self.quote_asset.clone(),
            total_account_value: total,
            free_collateral,
            balances,
        })
    }

    async fn balances(&self) -> Result<Vec<Balance>, TradeError> {
        self.fetch_balances().await
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: Decimal,
    ) -> Result<OrderReceipt, TradeError> {
        if size <= Decimal::ZERO {
            return Err(TradeError::InvalidOrder(format!("size must be positive, got {}", size)));
        }

        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), side.to_string()),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), size.normalize().to_string()),
        ];
        let order: OrderResponse = self.signed(Method::POST, "/api/v3/order", params).await?;
        info!(symbol, %side, %size, order_id = order.order_id, status = %order.status, "market order placed");

        Ok(OrderReceipt {
            id: OrderId(order.order_id.to_string()),
            symbol: order.symbol,
            side,
            size: order.orig_qty,
            filled: order.executed_qty,
            status: parse_status(&order.status),
        })
    }

    async fn cancel_order(&self, symbol: &str, order_id: &OrderId) -> Result<(), TradeError> {
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("orderId".to_string(), order_id.0.clone()),
        ];
        let _: serde_json::Value = self.signed(Method::DELETE, "/api/v3/order", params).await?;
        info!(symbol, order_id = %order_id.0, "order canceled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sign_query_matches_reference_vector() {
        // 交易所 API 文档中的示例密钥与参数
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let params = vec![
            ("symbol".to_string(), "LTCBTC".to_string()),
            ("side".to_string(), "BUY".to_string()),
            ("type".to_string(), "LIMIT".to_string()),
            ("timeInForce".to_string(), "GTC".to_string()),
            ("quantity".to_string(), "1".to_string()),
            ("price".to_string(), "0.1".to_string()),
        ];
        let query = sign_query(secret, params, 5000, 1499827319559).unwrap();
        assert_eq!(
            query,
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1\
             &recvWindow=5000&timestamp=1499827319559\
             &signature=c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_map_api_error() {
        let bad = reqwest::StatusCode::BAD_REQUEST;
        assert!(matches!(
            map_api_error(bad, r#"{"code":-2010,"msg":"Account has insufficient balance"}"#),
            TradeError::Rejected(_)
        ));
        assert!(matches!(
            map_api_error(bad, r#"{"code":-2011,"msg":"Unknown order sent."}"#),
            TradeError::OrderNotFound(_)
        ));
        assert!(matches!(
            map_api_error(reqwest::StatusCode::BAD_GATEWAY, "<html>"),
            TradeError::BrokerIntegrationError(_)
        ));
    }

    #[test]
    fn test_order_response_decimals() {
        let body = r#"{"symbol":"BTCUSDT","orderId":28,"clientOrderId":"x","transactTime":1507725176595,
            "price":"0.00000000","origQty":"0.00120000","executedQty":"0.00120000","status":"FILLED",
            "type":"MARKET","side":"BUY"}"#;
        let order: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(order.executed_qty, dec!(0.0012));
        assert_eq!(parse_status(&order.status), OrderStatus::Filled);
    }

    #[test]
    fn test_missing_credentials() {
        let config = candlewick_core::config::AppConfig::default().broker;
        assert!(matches!(
            RestBroker::new(&config),
            Err(TradeError::BrokerIntegrationError(_))
        ));
    }
}
