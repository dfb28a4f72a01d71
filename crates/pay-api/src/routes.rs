//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Payments:
///   - POST /api/v1/payments - Create payment
///   - GET  /api/v1/payments/{id} - Get payment
///   - POST /api/v1/payments/{id}/approve - Start or resume approval
///   - POST /api/v1/payments/{id}/deposit - Capture
///   - POST /api/v1/payments/{id}/credit - Refund
///   - POST /api/v1/payments/{id}/reverse - Void the authorization
///
/// - Buyer callbacks:
///   - GET /checkout/return?token=... - Resume approval after consent
///   - GET /checkout/cancel - Cancel page
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let checkout_routes = Router::new()
        .route("/return", get(handlers::checkout_return))
        .route("/cancel", get(handlers::checkout_cancel));

    let api_routes = Router::new()
        .route("/payments", post(handlers::create_payment))
        .route("/payments/{payment_id}", get(handlers::get_payment))
        .route("/payments/{payment_id}/approve", post(handlers::approve_payment))
        .route("/payments/{payment_id}/deposit", post(handlers::deposit_payment))
        .route("/payments/{payment_id}/credit", post(handlers::credit_payment))
        .route("/payments/{payment_id}/reverse", post(handlers::reverse_payment));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/checkout", checkout_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use pay_core::{
        ExtendedKey, FinancialTransaction, PaymentError, PaymentPlugin, PluginOutcome,
        PluginRegistry,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Redirects on the first approval, completes once a token is stored
    struct ScriptedPlugin;

    #[async_trait]
    impl PaymentPlugin for ScriptedPlugin {
        async fn approve(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
            if !transaction
                .extended_data
                .has(ExtendedKey::ExpressCheckoutToken)
            {
                transaction
                    .extended_data
                    .set(ExtendedKey::ExpressCheckoutToken, "EC-TEST");
                transaction.mark_pending();
                return PluginOutcome::ActionRequired {
                    url: "https://sandbox.buybox.net/secure/payment_login.php?token=EC-TEST".into(),
                };
            }

            transaction.reference_number = Some("AUTH-1".into());
            transaction.processed_amount = Some(transaction.requested_amount);
            transaction.mark_success();
            PluginOutcome::Completed
        }

        async fn approve_and_deposit(
            &self,
            transaction: &mut FinancialTransaction,
        ) -> PluginOutcome {
            self.approve(transaction).await
        }

        async fn deposit(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
            if transaction.approval.is_none() {
                return PluginOutcome::failed(PaymentError::InvalidRequest(
                    "Deposit requires an approved payment".into(),
                ));
            }
            transaction.mark_success();
            PluginOutcome::Completed
        }

        async fn credit(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
            transaction.mark_pending();
            PluginOutcome::Pending {
                reason: "refund_review".into(),
            }
        }

        async fn reverse_approval(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
            transaction.mark_failed(Some("Failure".into()), Some("10600".into()));
            PluginOutcome::failed(PaymentError::financial(
                "void refused",
                Some("Failure".into()),
                Some("10600".into()),
            ))
        }

        fn processes(&self, payment_system: &str) -> bool {
            payment_system == "buybox_express_checkout"
        }

        fn plugin_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn server() -> TestServer {
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "http://localhost:8080".to_string(),
            environment: "test".to_string(),
        };
        let plugins = PluginRegistry::new().with_plugin(Arc::new(ScriptedPlugin));
        TestServer::new(create_router(AppState::with_plugins(config, plugins))).unwrap()
    }

    async fn create_payment(server: &TestServer, body: Value) -> String {
        let response = server.post("/api/v1/payments").json(&body).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Value>()["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let server = server();
        let response = server.get("/health").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["plugins"], json!(["scripted"]));
    }

    #[tokio::test]
    async fn test_create_and_get_payment() {
        let server = server();
        let id = create_payment(
            &server,
            json!({
                "amount": "42.50",
                "currency": "USD",
                "return_url": "https://shop.example/return",
                "checkout_params": {"CUSTOM_PARAMETER": "foo"}
            }),
        )
        .await;

        let response = server.get(&format!("/api/v1/payments/{}", id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let body = response.json::<Value>();
        assert_eq!(body["approval"]["transaction_type"], "approve");
        assert_eq!(body["approval"]["currency"], "USD");
        assert_eq!(
            body["approval"]["extended_data"]["values"]["return_url"],
            "https://shop.example/return"
        );
        assert_eq!(
            body["approval"]["extended_data"]["checkout_params"]["CUSTOM_PARAMETER"],
            "foo"
        );
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let server = server();

        let response = server
            .post("/api/v1/payments")
            .json(&json!({"amount": "0"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/v1/payments")
            .json(&json!({"amount": "10", "payment_system": "unknown"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_payment_is_not_found() {
        let server = server();
        let response = server.get("/api/v1/payments/nope").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        let response = server.post("/api/v1/payments/nope/approve").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_approve_redirects_then_return_completes() {
        let server = server();
        let id = create_payment(&server, json!({"amount": "100.00"})).await;

        let response = server
            .post(&format!("/api/v1/payments/{}/approve", id))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["status"], "action_required");
        assert_eq!(
            body["redirect_url"],
            "https://sandbox.buybox.net/secure/payment_login.php?token=EC-TEST"
        );

        let response = server
            .get("/checkout/return")
            .add_query_param("token", "EC-TEST")
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["status"], "completed");
        assert_eq!(body["payment_id"], id.as_str());
        assert_eq!(body["transaction"]["reference_number"], "AUTH-1");
    }

    #[tokio::test]
    async fn test_return_with_unknown_token() {
        let server = server();
        let response = server
            .get("/checkout/return")
            .add_query_param("token", "EC-NONE")
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_follow_ups_after_approval() {
        let server = server();
        let id = create_payment(&server, json!({"amount": "100.00"})).await;

        server.post(&format!("/api/v1/payments/{}/approve", id)).await;
        server.post(&format!("/api/v1/payments/{}/approve", id)).await;

        let response = server
            .post(&format!("/api/v1/payments/{}/deposit", id))
            .json(&json!({"amount": "60.00"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["transaction"]["transaction_type"], "deposit");

        let response = server
            .post(&format!("/api/v1/payments/{}/credit", id))
            .json(&json!({"amount": "10.00"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        assert_eq!(response.json::<Value>()["reason"], "refund_review");

        let response = server
            .post(&format!("/api/v1/payments/{}/reverse", id))
            .await;
        assert_eq!(response.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(response.json::<Value>()["details"], "reason_code=10600");

        let payment = server
            .get(&format!("/api/v1/payments/{}", id))
            .await
            .json::<Value>();
        assert_eq!(payment["follow_ups"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_deposit_before_approval_is_rejected() {
        let server = server();
        let id = create_payment(&server, json!({"amount": "100.00"})).await;

        let response = server
            .post(&format!("/api/v1/payments/{}/deposit", id))
            .json(&json!({"amount": "100.00"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cancel_page() {
        let server = server();
        let response = server.get("/checkout/cancel").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("Payment Cancelled"));
    }
}
