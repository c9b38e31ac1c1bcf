//! Mock Core Banking Service
//!
//! Stands in for the bank's customer mainframe and the credit bureau:
//! three seeded customers, their bureau scores, and a disbursement ledger
//! that mints a fresh transaction id per call. Served by the `bank`
//! binary and mounted in-process by integration tests.

use crate::error::Result;
use crate::models::{CreditReport, CustomerProfile, DisbursementReceipt};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

type SharedBank = Arc<BankState>;

pub struct BankState {
    customers: HashMap<String, CustomerProfile>,
    credit_scores: HashMap<String, i64>,
    txn_counter: AtomicU64,
}

impl BankState {
    /// The reference dataset: one strong applicant, one weak, one in the
    /// manual-review band.
    pub fn seed() -> Self {
        let mut customers = HashMap::new();
        customers.insert(
            "user_123".to_string(),
            CustomerProfile {
                name: "Alice Johnson".to_string(),
                income: 5000.0,
                employment_status: "employed".to_string(),
                active_loans: 0,
            },
        );
        customers.insert(
            "user_456".to_string(),
            CustomerProfile {
                name: "Bob Smith".to_string(),
                income: 3000.0,
                employment_status: "unemployed".to_string(),
                active_loans: 1,
            },
        );
        customers.insert(
            "user_789".to_string(),
            CustomerProfile {
                name: "Charlie Medium".to_string(),
                income: 4500.0,
                employment_status: "self-employed".to_string(),
                active_loans: 0,
            },
        );

        let mut credit_scores = HashMap::new();
        credit_scores.insert("user_123".to_string(), 750);
        credit_scores.insert("user_456".to_string(), 580);
        credit_scores.insert("user_789".to_string(), 650);

        Self {
            customers,
            credit_scores,
            txn_counter: AtomicU64::new(0),
        }
    }
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "System Online",
        "service": "Core Banking API"
    }))
}

async fn get_customer(
    State(bank): State<SharedBank>,
    Path(user_id): Path<String>,
) -> Response {
    match bank.customers.get(&user_id) {
        Some(profile) => Json(profile.clone()).into_response(),
        None => not_found("Customer not found"),
    }
}

async fn get_credit_score(
    State(bank): State<SharedBank>,
    Path(user_id): Path<String>,
) -> Response {
    match bank.credit_scores.get(&user_id) {
        Some(score) => Json(CreditReport {
            user_id,
            credit_score: *score,
        })
        .into_response(),
        None => not_found("Score not found"),
    }
}

#[derive(Debug, Deserialize)]
struct DisburseParams {
    user_id: String,
    amount: f64,
}

async fn disburse(
    State(bank): State<SharedBank>,
    Query(params): Query<DisburseParams>,
) -> Response {
    if !bank.customers.contains_key(&params.user_id) {
        return not_found("Customer not found");
    }

    let seq = bank.txn_counter.fetch_add(1, Ordering::Relaxed);
    let receipt = DisbursementReceipt {
        status: "SUCCESS".to_string(),
        transaction_id: format!("TXN_{}", 1000 + seq),
        message: format!("Disbursed ${} to {}", params.amount, params.user_id),
    };

    info!(
        user_id = %params.user_id,
        amount = params.amount,
        transaction_id = %receipt.transaction_id,
        "Disbursement recorded"
    );

    Json(receipt).into_response()
}

pub fn router() -> Router {
    let bank: SharedBank = Arc::new(BankState::seed());

    Router::new()
        .route("/", get(root))
        .route("/customer/:user_id", get(get_customer))
        .route("/credit-score/:user_id", get(get_credit_score))
        .route("/loan/disburse", post(disburse))
        .with_state(bank)
}

pub async fn start_server(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🏦 Mock Core Banking API listening on http://{}", addr);
    info!("   GET  /customer/:user_id");
    info!("   GET  /credit-score/:user_id");
    info!("   POST /loan/disburse?user_id=&amount=");

    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_data_is_consistent() {
        let bank = BankState::seed();

        assert_eq!(bank.customers.len(), 3);
        assert_eq!(bank.credit_scores.len(), 3);
        for user_id in bank.customers.keys() {
            assert!(
                bank.credit_scores.contains_key(user_id),
                "customer {} is missing a bureau score",
                user_id
            );
        }
        assert_eq!(bank.customers["user_123"].name, "Alice Johnson");
        assert_eq!(bank.credit_scores["user_456"], 580);
    }
}
