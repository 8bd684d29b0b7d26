mod common;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

struct Session {
    client: Client,
    token: String,
}

impl Session {
    async fn start(server: &common::TestServer) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            token: common::register_user(server).await?,
        })
    }

    async fn create_account(&self, server: &common::TestServer, body: Value) -> Result<String> {
        let res = self
            .client
            .post(server.url("/api/accounts"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let account = common::data_of(res, StatusCode::CREATED).await?;
        account["id"].as_str().map(str::to_string).context("account id")
    }

    async fn balance_of(&self, server: &common::TestServer, id: &str) -> Result<f64> {
        let res = self
            .client
            .get(server.url(&format!("/api/accounts/{}", id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let account = common::data_of(res, StatusCode::OK).await?;
        account["currentBalance"].as_f64().context("currentBalance")
    }
}

#[tokio::test]
async fn transfer_moves_balances_and_delete_reverses_them() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await? {
        return Ok(());
    }
    let session = Session::start(server).await?;

    let checking = session
        .create_account(server, json!({ "name": "Checking", "accountType": "bank", "initialBalance": 1000 }))
        .await?;
    let savings = session
        .create_account(server, json!({ "name": "Savings", "accountType": "bank" }))
        .await?;

    let res = session
        .client
        .post(server.url("/api/transactions"))
        .bearer_auth(&session.token)
        .json(&json!({
            "sourceAccountId": checking,
            "targetAccountId": savings,
            "currency": "zar",
            "amount": 250,
            "category": "transfer"
        }))
        .send()
        .await?;
    let transaction = common::data_of(res, StatusCode::CREATED).await?;
    assert_eq!(transaction["currency"], "ZAR");
    assert_eq!(transaction["amountHomeCurrency"].as_f64(), Some(250.0), "{}", transaction);
    let transaction_id = transaction["id"].as_str().context("transaction id")?;

    assert_eq!(session.balance_of(server, &checking).await?, 750.0);
    assert_eq!(session.balance_of(server, &savings).await?, 250.0);

    let res = session
        .client
        .delete(server.url(&format!("/api/transactions/{}", transaction_id)))
        .bearer_auth(&session.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    assert_eq!(session.balance_of(server, &checking).await?, 1000.0);
    assert_eq!(session.balance_of(server, &savings).await?, 0.0);

    let res = session
        .client
        .delete(server.url(&format!("/api/transactions/{}", transaction_id)))
        .bearer_auth(&session.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn oversized_amount_is_rejected_without_touching_balances() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await? {
        return Ok(());
    }
    let session = Session::start(server).await?;
    let wallet = session
        .create_account(server, json!({ "name": "Wallet", "accountType": "bank", "initialBalance": 10 }))
        .await?;

    let res = session
        .client
        .post(server.url("/api/transactions"))
        .bearer_auth(&session.token)
        .json(&json!({
            "sourceAccountId": wallet,
            "currency": "ZAR",
            "amount": 10_000_000_000_000_000u64,
            "category": "expense"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR", "{}", body);
    assert!(body["field_errors"]["amount"].is_string(), "{}", body);

    assert_eq!(session.balance_of(server, &wallet).await?, 10.0);
    Ok(())
}

#[tokio::test]
async fn net_worth_subtracts_liabilities() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_ready(server).await? {
        return Ok(());
    }
    let session = Session::start(server).await?;
    session
        .create_account(server, json!({ "name": "Bank", "accountType": "bank", "initialBalance": 5000 }))
        .await?;
    session
        .create_account(
            server,
            json!({ "name": "Card", "accountType": "credit", "initialBalance": 1200, "isLiability": true }),
        )
        .await?;

    let res = session
        .client
        .get(server.url("/api/net-worth"))
        .bearer_auth(&session.token)
        .send()
        .await?;
    let summary = common::data_of(res, StatusCode::OK).await?;
    assert_eq!(summary["homeCurrency"], "ZAR");
    assert_eq!(summary["totalAssets"]["amount"].as_f64(), Some(5000.0), "{}", summary);
    assert_eq!(summary["totalLiabilities"]["amount"].as_f64(), Some(1200.0), "{}", summary);
    assert_eq!(summary["netWorth"]["amount"].as_f64(), Some(3800.0), "{}", summary);
    assert_eq!(summary["byType"]["credit"].as_f64(), Some(-1200.0), "{}", summary);
    assert_eq!(summary["accountCount"], 2);

    // Snapshots come from the daily job, which is disabled here
    let res = session
        .client
        .get(server.url("/api/net-worth/history?period=3M"))
        .bearer_auth(&session.token)
        .send()
        .await?;
    let history = common::data_of(res, StatusCode::OK).await?;
    assert_eq!(history["period"], "3M");
    assert_eq!(history["dataPoints"], 0);
    assert_eq!(history["currentNetWorth"].as_f64(), Some(0.0));
    Ok(())
}
