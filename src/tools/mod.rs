//! Tool trait and registry
//!
//! The four loan-desk capabilities the decision engine may invoke.
//! HTTP-backed tools call the core banking service; risk assessment runs
//! in-process. Service-level failures (missing records, unreachable API)
//! never abort a pass: each tool renders them as text for the decision
//! engine to read on the next round.

use crate::error::OrchestrationError;
use crate::models::{CreditReport, CustomerProfile, DisbursementReceipt};
use crate::risk;
use crate::Result;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// Named arguments of a single tool invocation.
pub type ToolArguments = serde_json::Map<String, Value>;

/// Trait for a single tool. `execute` returns the text that becomes the
/// ToolResult content; recoverable service failures are folded into that
/// text, while argument errors surface as `InvalidInput`.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the named arguments, advertised to the decision
    /// capability as part of the tool catalogue.
    fn parameters(&self) -> Value;
    async fn execute(&self, args: &ToolArguments) -> Result<String>;
}

/// Catalogue entry for one tool, in the shape function-calling APIs expect.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// The full catalogue, sorted by name so advertised declarations are
    /// stable across runs.
    pub fn catalogue(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const API_NOT_CONFIGURED: &str = "BANKING_API_BASE_URL is not configured";

/// HTTP client for the core banking service.
#[derive(Clone)]
pub struct BankingApiClient {
    client: Client,
    base_url: String,
}

impl BankingApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let base_url = env::var("BANKING_API_BASE_URL").ok()?;
        Some(Self::new(base_url))
    }

    async fn get_typed<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.get(&url).send().await.map_err(|e| {
            OrchestrationError::RemoteUnavailable(format!("request to {} failed: {}", path, e))
        })?;

        Self::decode(path, response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            let detail = Self::error_detail(response).await;
            return Err(OrchestrationError::NotFound(detail));
        }
        if !status.is_success() {
            let detail = Self::error_detail(response).await;
            return Err(OrchestrationError::RemoteUnavailable(format!(
                "banking API returned {} for {}: {}",
                status, path, detail
            )));
        }

        response.json::<T>().await.map_err(|e| {
            OrchestrationError::RemoteUnavailable(format!("invalid JSON from {}: {}", path, e))
        })
    }

    /// Pull the `detail` field FastAPI-style services put in error bodies,
    /// falling back to the raw body text.
    async fn error_detail(response: reqwest::Response) -> String {
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
            .unwrap_or(body)
    }

    pub async fn fetch_customer(&self, user_id: &str) -> Result<CustomerProfile> {
        self.get_typed(&format!("/customer/{}", user_id)).await
    }

    pub async fn fetch_credit_score(&self, user_id: &str) -> Result<CreditReport> {
        self.get_typed(&format!("/credit-score/{}", user_id)).await
    }

    pub async fn disburse(&self, user_id: &str, amount: f64) -> Result<DisbursementReceipt> {
        let path = "/loan/disburse";
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .query(&[("user_id", user_id.to_string()), ("amount", amount.to_string())])
            .send()
            .await
            .map_err(|e| {
                OrchestrationError::RemoteUnavailable(format!("request to {} failed: {}", path, e))
            })?;

        Self::decode(path, response).await
    }
}

fn require_str(args: &ToolArguments, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            OrchestrationError::InvalidInput(format!("Expected string argument '{}'", key))
        })
}

fn require_f64(args: &ToolArguments, key: &str) -> Result<f64> {
    args.get(key).and_then(|v| v.as_f64()).ok_or_else(|| {
        OrchestrationError::InvalidInput(format!("Expected numeric argument '{}'", key))
    })
}

fn require_i64(args: &ToolArguments, key: &str) -> Result<i64> {
    args.get(key).and_then(|v| v.as_i64()).ok_or_else(|| {
        OrchestrationError::InvalidInput(format!("Expected integer argument '{}'", key))
    })
}

/// Looks a customer up in the core banking system.
pub struct VerifyIdentityTool {
    api: Option<BankingApiClient>,
}

impl VerifyIdentityTool {
    pub fn new(api: Option<BankingApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for VerifyIdentityTool {
    fn name(&self) -> &'static str {
        "verify_identity"
    }

    fn description(&self) -> &'static str {
        "Checks if the user ID exists in the core banking system and returns the customer profile (name, employment status, income)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "Customer identifier, e.g. user_123"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, args: &ToolArguments) -> Result<String> {
        let user_id = require_str(args, "user_id")?;

        let result = match self.api.as_ref() {
            Some(api) => api.fetch_customer(&user_id).await,
            None => Err(OrchestrationError::RemoteUnavailable(
                API_NOT_CONFIGURED.to_string(),
            )),
        };

        match result {
            Ok(profile) => Ok(format!(
                "SUCCESS: User found. Name: {}, Status: {}, Income: ${}.",
                profile.name, profile.employment_status, profile.income
            )),
            Err(OrchestrationError::NotFound(_)) => {
                Ok("ERROR: User ID not found in the database.".to_string())
            }
            Err(OrchestrationError::RemoteUnavailable(detail)) => Ok(format!(
                "SYSTEM ERROR: Could not connect to Banking API. Details: {}",
                detail
            )),
            Err(other) => Err(other),
        }
    }
}

/// Pulls the bureau score for a customer.
pub struct CheckCreditScoreTool {
    api: Option<BankingApiClient>,
}

impl CheckCreditScoreTool {
    pub fn new(api: Option<BankingApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for CheckCreditScoreTool {
    fn name(&self) -> &'static str {
        "check_credit_score"
    }

    fn description(&self) -> &'static str {
        "Retrieves the credit score for a given user ID from the credit bureau."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "Customer identifier, e.g. user_123"
                }
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, args: &ToolArguments) -> Result<String> {
        let user_id = require_str(args, "user_id")?;

        let result = match self.api.as_ref() {
            Some(api) => api.fetch_credit_score(&user_id).await,
            None => Err(OrchestrationError::RemoteUnavailable(
                API_NOT_CONFIGURED.to_string(),
            )),
        };

        match result {
            Ok(report) => Ok(format!(
                "CREDIT REPORT: User: {}, Score: {}.",
                report.user_id, report.credit_score
            )),
            Err(OrchestrationError::NotFound(_)) => Ok("ERROR: Score not found.".to_string()),
            Err(OrchestrationError::RemoteUnavailable(detail)) => {
                Ok(format!("API ERROR: {}", detail))
            }
            Err(other) => Err(other),
        }
    }
}

/// Runs the in-process underwriting rules.
pub struct AssessLoanRiskTool;

#[async_trait::async_trait]
impl Tool for AssessLoanRiskTool {
    fn name(&self) -> &'static str {
        "assess_loan_risk"
    }

    fn description(&self) -> &'static str {
        "Analyzes loan risk based on income, credit score, and requested amount. Returns APPROVED, REJECTED, or MANUAL_REVIEW with a reason. Mandatory before any disbursement."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "income": {
                    "type": "number",
                    "description": "Monthly income in dollars"
                },
                "credit_score": {
                    "type": "integer",
                    "description": "Bureau credit score"
                },
                "loan_amount": {
                    "type": "number",
                    "description": "Requested loan principal in dollars"
                }
            },
            "required": ["income", "credit_score", "loan_amount"]
        })
    }

    async fn execute(&self, args: &ToolArguments) -> Result<String> {
        let income = require_f64(args, "income")?;
        let credit_score = require_i64(args, "credit_score")?;
        let loan_amount = require_f64(args, "loan_amount")?;

        let decision = risk::assess(income, credit_score, loan_amount)?;

        Ok(format!(
            "RISK ASSESSMENT: Decision: {}. Reason: {}",
            decision.verdict, decision.reason
        ))
    }
}

/// Sends money through the remote ledger.
pub struct DisburseFundsTool {
    api: Option<BankingApiClient>,
}

impl DisburseFundsTool {
    pub fn new(api: Option<BankingApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Tool for DisburseFundsTool {
    fn name(&self) -> &'static str {
        "disburse_funds"
    }

    fn description(&self) -> &'static str {
        "Disburses the loan amount to the user's account. Call only after the risk assessment outcome allows it."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "string",
                    "description": "Customer identifier, e.g. user_123"
                },
                "amount": {
                    "type": "number",
                    "description": "Amount to transfer in dollars"
                }
            },
            "required": ["user_id", "amount"]
        })
    }

    async fn execute(&self, args: &ToolArguments) -> Result<String> {
        let user_id = require_str(args, "user_id")?;
        let amount = require_f64(args, "amount")?;

        let result = match self.api.as_ref() {
            Some(api) => api.disburse(&user_id, amount).await,
            None => Err(OrchestrationError::RemoteUnavailable(
                API_NOT_CONFIGURED.to_string(),
            )),
        };

        match result {
            Ok(receipt) => Ok(format!(
                "TRANSACTION SUCCESS: {} (Txn ID: {})",
                receipt.message, receipt.transaction_id
            )),
            Err(OrchestrationError::NotFound(detail)) => {
                Ok(format!("TRANSACTION FAILED: {}", detail))
            }
            Err(OrchestrationError::RemoteUnavailable(detail)) => {
                Ok(format!("SYSTEM ERROR: {}", detail))
            }
            Err(other) => Err(other),
        }
    }
}

/// Create the loan-desk registry with HTTP-backed banking tools.
pub fn create_default_registry(api: Option<BankingApiClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(VerifyIdentityTool::new(api.clone())));
    registry.register(Arc::new(CheckCreditScoreTool::new(api.clone())));
    registry.register(Arc::new(AssessLoanRiskTool));
    registry.register(Arc::new(DisburseFundsTool::new(api)));

    registry
}

/// Registry wired from `BANKING_API_BASE_URL`; HTTP-backed tools degrade
/// to SYSTEM ERROR text when the variable is unset.
pub fn registry_from_env() -> ToolRegistry {
    create_default_registry(BankingApiClient::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank;

    fn args(value: Value) -> ToolArguments {
        value.as_object().expect("test args must be an object").clone()
    }

    async fn spawn_bank() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, bank::router()).await.expect("serve mock bank");
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_registry_holds_the_four_tools() {
        let registry = create_default_registry(None);

        let mut names = registry.list();
        names.sort();
        assert_eq!(
            names,
            vec!["assess_loan_risk", "check_credit_score", "disburse_funds", "verify_identity"]
        );
        assert!(registry.get("verify_identity").is_some());
        assert!(registry.get("approve_everything").is_none());
    }

    #[test]
    fn test_catalogue_is_sorted_and_schema_backed() {
        let registry = create_default_registry(None);
        let catalogue = registry.catalogue();

        let names: Vec<&str> = catalogue.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["assess_loan_risk", "check_credit_score", "disburse_funds", "verify_identity"]
        );
        for spec in &catalogue {
            assert_eq!(spec.parameters["type"], "object");
            assert!(spec.parameters["required"].is_array());
        }
    }

    #[tokio::test]
    async fn test_assess_tool_renders_decision_text() {
        let tool = AssessLoanRiskTool;
        let text = tool
            .execute(&args(json!({
                "income": 5000.0,
                "credit_score": 750,
                "loan_amount": 10000.0
            })))
            .await
            .unwrap();

        assert_eq!(
            text,
            "RISK ASSESSMENT: Decision: APPROVED. Reason: Excellent credit score and healthy income ratio."
        );
    }

    #[tokio::test]
    async fn test_assess_tool_rejects_bad_arguments() {
        let tool = AssessLoanRiskTool;

        let missing = tool.execute(&args(json!({ "income": 5000.0 }))).await;
        assert!(matches!(missing, Err(OrchestrationError::InvalidInput(_))));

        let out_of_domain = tool
            .execute(&args(json!({
                "income": 0.0,
                "credit_score": 750,
                "loan_amount": 10000.0
            })))
            .await;
        assert!(matches!(out_of_domain, Err(OrchestrationError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_api_degrades_to_system_error_text() {
        let tool = VerifyIdentityTool::new(None);
        let text = tool
            .execute(&args(json!({ "user_id": "user_123" })))
            .await
            .unwrap();

        assert!(text.starts_with("SYSTEM ERROR: Could not connect to Banking API."));
        assert!(text.contains("BANKING_API_BASE_URL"));
    }

    #[tokio::test]
    async fn test_verify_identity_against_mock_bank() {
        let base_url = spawn_bank().await;
        let tool = VerifyIdentityTool::new(Some(BankingApiClient::new(base_url)));

        let found = tool
            .execute(&args(json!({ "user_id": "user_123" })))
            .await
            .unwrap();
        assert_eq!(
            found,
            "SUCCESS: User found. Name: Alice Johnson, Status: employed, Income: $5000."
        );

        let missing = tool
            .execute(&args(json!({ "user_id": "user_999" })))
            .await
            .unwrap();
        assert_eq!(missing, "ERROR: User ID not found in the database.");
    }

    #[tokio::test]
    async fn test_credit_score_against_mock_bank() {
        let base_url = spawn_bank().await;
        let tool = CheckCreditScoreTool::new(Some(BankingApiClient::new(base_url)));

        let report = tool
            .execute(&args(json!({ "user_id": "user_456" })))
            .await
            .unwrap();
        assert_eq!(report, "CREDIT REPORT: User: user_456, Score: 580.");

        let missing = tool
            .execute(&args(json!({ "user_id": "user_999" })))
            .await
            .unwrap();
        assert_eq!(missing, "ERROR: Score not found.");
    }

    #[tokio::test]
    async fn test_disburse_against_mock_bank() {
        let base_url = spawn_bank().await;
        let tool = DisburseFundsTool::new(Some(BankingApiClient::new(base_url)));

        let text = tool
            .execute(&args(json!({ "user_id": "user_123", "amount": 3000.0 })))
            .await
            .unwrap();
        assert!(text.starts_with("TRANSACTION SUCCESS: Disbursed $3000 to user_123"));
        assert!(text.contains("Txn ID: TXN_"));

        let failed = tool
            .execute(&args(json!({ "user_id": "user_999", "amount": 3000.0 })))
            .await
            .unwrap();
        assert!(failed.starts_with("TRANSACTION FAILED:"));
    }
}
