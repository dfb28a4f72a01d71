//! # Buybox NVP Client
//!
//! One method per gateway operation. Each builds the name/value fields,
//! merges caller-supplied optional fields underneath the fixed ones and
//! posts them through [`BuyboxClient::send_api_request`].
//!
//! The client is stateless: every call is independent and nothing is
//! retried. Sequencing of the checkout protocol lives in the plugin.

use crate::amount::format_amount;
use crate::auth::AuthenticationStrategy;
use crate::environment::Environment;
use crate::response::Response;
use crate::transport::{ApiRequest, Fields, RawResponse, TransportOptions};
use pay_core::{PaymentError, PaymentResult};
use reqwest::multipart::Form;
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// `PAYMENTACTION` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    /// Authorize now, capture later
    Authorization,
    /// Authorize and capture immediately
    Sale,
    Order,
}

impl PaymentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentAction::Authorization => "Authorization",
            PaymentAction::Sale => "Sale",
            PaymentAction::Order => "Order",
        }
    }
}

/// `COMPLETETYPE` values of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteType {
    /// Last capture; the rest of the authorization is released
    Complete,
    /// Partial capture; the remainder stays capturable
    NotComplete,
}

impl CompleteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompleteType::Complete => "Complete",
            CompleteType::NotComplete => "NotComplete",
        }
    }
}

/// Merge fixed fields over the caller's optional fields
fn merge<const N: usize>(mut optional: Fields, fixed: [(&str, String); N]) -> Fields {
    for (key, value) in fixed {
        optional.insert(key.to_string(), value);
    }
    optional
}

/// Client for the Buybox express-checkout NVP API
#[derive(Clone)]
pub struct BuyboxClient {
    auth: Arc<dyn AuthenticationStrategy>,
    environment: Environment,
    endpoint: String,
    http: Client,
}

impl BuyboxClient {
    /// Create a client with default transport options
    pub fn new(
        auth: impl AuthenticationStrategy + 'static,
        environment: Environment,
    ) -> PaymentResult<Self> {
        Self::with_options(auth, environment, TransportOptions::default())
    }

    /// Create a client with explicit transport options
    pub fn with_options(
        auth: impl AuthenticationStrategy + 'static,
        environment: Environment,
        options: TransportOptions,
    ) -> PaymentResult<Self> {
        let http = options.build_client()?;
        let endpoint = auth.api_endpoint(environment);

        Ok(Self {
            auth: Arc::new(auth),
            environment,
            endpoint,
            http,
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn address_verify(
        &self,
        email: &str,
        street: &str,
        postal_code: &str,
    ) -> PaymentResult<Response> {
        self.send_api_request(merge(
            Fields::new(),
            [
                ("METHOD", "AddressVerify".to_string()),
                ("EMAIL", email.to_string()),
                ("STREET", street.to_string()),
                ("ZIP", postal_code.to_string()),
            ],
        ))
        .await
    }

    pub async fn bill_outstanding_amount(
        &self,
        profile_id: &str,
        optional: Fields,
    ) -> PaymentResult<Response> {
        self.send_api_request(merge(
            optional,
            [
                ("METHOD", "BillOutstandingAmount".to_string()),
                ("PROFILEID", profile_id.to_string()),
            ],
        ))
        .await
    }

    pub async fn create_recurring_payments_profile(&self, token: &str) -> PaymentResult<Response> {
        self.send_api_request(merge(
            Fields::new(),
            [
                ("METHOD", "CreateRecurringPaymentsProfile".to_string()),
                ("TOKEN", token.to_string()),
            ],
        ))
        .await
    }

    pub async fn do_authorization(
        &self,
        transaction_id: &str,
        amount: Decimal,
        optional: Fields,
    ) -> PaymentResult<Response> {
        self.send_api_request(merge(
            optional,
            [
                ("METHOD", "DoAuthorization".to_string()),
                ("TRANSACTIONID", transaction_id.to_string()),
                ("AMT", format_amount(amount)),
            ],
        ))
        .await
    }

    pub async fn do_capture(
        &self,
        authorization_id: &str,
        amount: Decimal,
        complete_type: CompleteType,
        optional: Fields,
    ) -> PaymentResult<Response> {
        self.send_api_request(merge(
            optional,
            [
                ("METHOD", "DoCapture".to_string()),
                ("AUTHORIZATIONID", authorization_id.to_string()),
                ("AMT", format_amount(amount)),
                ("COMPLETETYPE", complete_type.as_str().to_string()),
            ],
        ))
        .await
    }

    pub async fn do_direct_payment(
        &self,
        ip_address: &str,
        optional: Fields,
    ) -> PaymentResult<Response> {
        self.send_api_request(merge(
            optional,
            [
                ("METHOD", "DoDirectPayment".to_string()),
                ("IPADDRESS", ip_address.to_string()),
            ],
        ))
        .await
    }

    /// Commit an express checkout payment.
    ///
    /// `PAYERID` is only sent when the payer is known.
    pub async fn do_express_checkout_payment(
        &self,
        token: &str,
        amount: Decimal,
        payment_action: PaymentAction,
        payer_id: Option<&str>,
        optional: Fields,
    ) -> PaymentResult<Response> {
        let mut fields = merge(
            optional,
            [
                ("METHOD", "DoExpressCheckoutPayment".to_string()),
                ("TOKEN", token.to_string()),
                ("AMT", format_amount(amount)),
                ("PAYMENTACTION", payment_action.as_str().to_string()),
            ],
        );
        match payer_id {
            Some(payer_id) => {
                fields.insert("PAYERID".to_string(), payer_id.to_string());
            }
            None => {
                fields.remove("PAYERID");
            }
        }

        self.send_api_request(fields).await
    }

    pub async fn do_void(
        &self,
        authorization_id: &str,
        optional: Fields,
    ) -> PaymentResult<Response> {
        self.send_api_request(merge(
            optional,
            [
                ("METHOD", "DoVoid".to_string()),
                ("AUTHORIZATIONID", authorization_id.to_string()),
            ],
        ))
        .await
    }

    pub async fn set_express_checkout(
        &self,
        amount: Decimal,
        return_url: &str,
        cancel_url: &str,
        optional: Fields,
    ) -> PaymentResult<Response> {
        self.send_api_request(merge(
            optional,
            [
                ("METHOD", "SetExpressCheckout".to_string()),
                ("AMT", format_amount(amount)),
                ("RETURNURL", return_url.to_string()),
                ("CANCELURL", cancel_url.to_string()),
            ],
        ))
        .await
    }

    pub async fn get_express_checkout_details(&self, token: &str) -> PaymentResult<Response> {
        self.send_api_request(merge(
            Fields::new(),
            [
                ("METHOD", "GetExpressCheckoutDetails".to_string()),
                ("TOKEN", token.to_string()),
            ],
        ))
        .await
    }

    pub async fn get_transaction_details(&self, transaction_id: &str) -> PaymentResult<Response> {
        self.send_api_request(merge(
            Fields::new(),
            [
                ("METHOD", "GetTransactionDetails".to_string()),
                ("TRANSACTIONID", transaction_id.to_string()),
            ],
        ))
        .await
    }

    pub async fn refund_transaction(
        &self,
        transaction_id: &str,
        optional: Fields,
    ) -> PaymentResult<Response> {
        self.send_api_request(merge(
            optional,
            [
                ("METHOD", "RefundTransaction".to_string()),
                ("TRANSACTIONID", transaction_id.to_string()),
            ],
        ))
        .await
    }

    /// Authenticate and post `parameters`, then parse the URL-encoded reply.
    ///
    /// Any status other than 200 is a communication error carrying the raw body.
    #[instrument(
        skip(self, parameters),
        fields(method = parameters.get("METHOD").map(String::as_str).unwrap_or("-"))
    )]
    pub async fn send_api_request(&self, parameters: Fields) -> PaymentResult<Response> {
        let mut request = ApiRequest::post(self.endpoint.clone(), parameters);
        self.auth.authenticate(&mut request);

        debug!("Sending Buybox request: {}", request.describe());

        let raw = self.request(&request).await?;

        if raw.status != 200 {
            error!("Buybox API error: status={}, body={}", raw.status, raw.body);
            return Err(PaymentError::communication(
                format!(
                    "The API request was not successful (Status: {}): {}",
                    raw.status, raw.body
                ),
                Some(raw.status),
            ));
        }

        let response = Response::from_body(&raw.body)?;

        debug!(
            "Received Buybox response: ack={:?}, correlation_id={:?}",
            response.ack(),
            response.correlation_id()
        );

        Ok(response)
    }

    /// Login/consent URL the buyer is redirected to.
    ///
    /// Parameters are appended in the given order without URL-encoding.
    pub fn authenticate_express_checkout_token_url(
        &self,
        token: &str,
        params: &[(&str, &str)],
    ) -> String {
        let mut url = format!("{}?token={}", self.environment.login_url(), token);
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, value));
        }
        url
    }

    /// Perform the HTTP exchange.
    ///
    /// POST bodies are form-urlencoded unless the request is marked multipart.
    #[instrument(skip(self, request), fields(url = %request.url, http_method = %request.method))]
    pub async fn request(&self, request: &ApiRequest) -> PaymentResult<RawResponse> {
        let mut builder = self.http.request(request.method.clone(), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if request.method == Method::POST {
            builder = if request.is_multipart() {
                let form = request
                    .fields
                    .iter()
                    .fold(Form::new(), |form, (key, value)| {
                        form.text(key.clone(), value.clone())
                    });
                builder.multipart(form)
            } else {
                builder.form(&request.fields)
            };
        }

        let response = builder.send().await.map_err(|e| {
            error!("Buybox transport error: {}", e);
            PaymentError::communication(
                format!("HTTP transport error: {}", e),
                e.status().map(|s| s.as_u16()),
            )
        })?;

        let status = response.status().as_u16();

        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            headers.insert(
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }

        let body = response.text().await.map_err(|e| {
            PaymentError::communication(
                format!("Failed to read response body: {}", e),
                Some(status),
            )
        })?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for BuyboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuyboxClient")
            .field("environment", &self.environment)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
