//! HTTP implementation of [`RemoteBillingPort`] against the hosted billing
//! API. Authentication is HTTP Basic with the API key as the username.

use std::collections::VecDeque;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::application::app_error::{AppError, AppResult, FieldError};
use crate::application::ports::billing_remote::{
    InvoiceCursor, NewAccount, NewSubscription, RemoteBillingPort, RemoteCursor,
    SubscriptionChange, SubscriptionCursor, SubscriptionStateFilter,
};
use crate::domain::entities::cancel_behavior::RefundType;
use crate::domain::entities::remote_account::{BillingInfo, RemoteAccount};
use crate::domain::entities::remote_plan::{
    CouponRedemption, RemoteCoupon, RemoteInvoice, RemotePlan, SubscriptionPreview,
};
use crate::domain::entities::remote_subscription::RemoteSubscription;

#[derive(Clone, Debug)]
pub struct RecurlyClient {
    client: Client,
    base: String,
    api_key: SecretString,
}

/// Envelope of a list endpoint: one page of records plus the cursor for the
/// next one.
#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    total: usize,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireFieldError {
    #[serde(default)]
    field: String,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<WireFieldError>,
    #[serde(default)]
    description: Option<String>,
}

impl RecurlyClient {
    /// An empty key or base URL would turn every remote call into a confusing
    /// 401/connect error, so both are rejected up front.
    pub fn new(base: String, api_key: SecretString) -> AppResult<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(AppError::Config(
                "billing API key is not configured".to_string(),
            ));
        }
        if base.is_empty() {
            return Err(AppError::Config(
                "billing API base URL is not configured".to_string(),
            ));
        }
        Ok(Self {
            client: Client::new(),
            base: base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.api_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base, path))
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
    }

    /// Invoice downloads negotiate PDF instead of JSON; reqwest appends
    /// rather than replaces headers, so this skips [`request`](Self::request).
    fn pdf_request(&self, invoice_number: &str) -> RequestBuilder {
        self.client
            .request(
                Method::GET,
                format!("{}/invoices/{invoice_number}", self.base),
            )
            .header("Authorization", self.auth_header())
            .header("Accept", "application/pdf")
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::RemoteUnavailable(e.to_string()))?;
        check_status(&response)?;
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::RemoteUnavailable(format!("bad response body: {e}")))
    }

    async fn open_cursor<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        path: &str,
        state: Option<&str>,
        per_page: usize,
    ) -> AppResult<HttpCursor<T>> {
        HttpCursor::open(self.clone(), path.to_string(), state.map(str::to_string), per_page).await
    }
}

/// Maps a provider response status to the application error taxonomy. Error
/// bodies carry field-level details on 422 and a description otherwise.
fn check_status(response: &Response) -> AppResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Config(
            "billing API credentials were rejected".to_string(),
        )),
        StatusCode::NOT_FOUND => Err(AppError::RemoteNotFound(
            response.url().path().to_string(),
        )),
        _ => Err(AppError::RemoteUnavailable(format!(
            "unexpected status {status}"
        ))),
    }
}

/// Like [`check_status`] but consumes the response so 4xx bodies can be
/// turned into validation errors. Used on every mutating call.
async fn check_status_with_body(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Config(
            "billing API credentials were rejected".to_string(),
        )),
        StatusCode::NOT_FOUND => Err(AppError::RemoteNotFound(
            response.url().path().to_string(),
        )),
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            if body.errors.is_empty() {
                Err(AppError::InvalidInput(
                    body.description
                        .unwrap_or_else(|| "the billing provider rejected the request".to_string()),
                ))
            } else {
                Err(AppError::RemoteValidation(
                    body.errors
                        .into_iter()
                        .map(|e| FieldError::new(e.field, e.message))
                        .collect(),
                ))
            }
        }
        _ => Err(AppError::RemoteUnavailable(format!(
            "unexpected status {status}"
        ))),
    }
}

impl RecurlyClient {
    async fn send_checked(&self, request: RequestBuilder) -> AppResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::RemoteUnavailable(e.to_string()))?;
        check_status_with_body(response).await
    }

    async fn mutate_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = self.send_checked(request).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::RemoteUnavailable(format!("bad response body: {e}")))
    }
}

struct HttpCursor<T> {
    client: RecurlyClient,
    path: String,
    state: Option<String>,
    per_page: usize,
    buffer: VecDeque<T>,
    next_cursor: Option<String>,
    total: usize,
}

impl<T: DeserializeOwned + Send + Sync + 'static> HttpCursor<T> {
    /// Fetches the first page eagerly so the total is known up front.
    async fn open(
        client: RecurlyClient,
        path: String,
        state: Option<String>,
        per_page: usize,
    ) -> AppResult<Self> {
        let mut cursor = Self {
            client,
            path,
            state,
            per_page,
            buffer: VecDeque::new(),
            next_cursor: None,
            total: 0,
        };
        let page = cursor.fetch(None).await?;
        cursor.total = page.total;
        cursor.next_cursor = page.next_cursor;
        cursor.buffer = page.items.into();
        Ok(cursor)
    }

    async fn fetch(&self, cursor: Option<&str>) -> AppResult<Page<T>> {
        let mut request = self
            .client
            .request(Method::GET, &self.path)
            .query(&[("per_page", self.per_page.to_string())]);
        if let Some(state) = &self.state {
            request = request.query(&[("state", state)]);
        }
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        self.client.fetch_json(request).await
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send + Sync + 'static> RemoteCursor<T> for HttpCursor<T> {
    fn total(&self) -> usize {
        self.total
    }

    async fn next(&mut self) -> AppResult<Option<T>> {
        if self.buffer.is_empty()
            && let Some(cursor) = self.next_cursor.take()
        {
            let page = self.fetch(Some(&cursor)).await?;
            self.next_cursor = page.next_cursor;
            self.buffer = page.items.into();
        }
        Ok(self.buffer.pop_front())
    }
}

#[async_trait]
impl RemoteBillingPort for RecurlyClient {
    async fn get_account(&self, account_code: &str) -> AppResult<RemoteAccount> {
        self.fetch_json(self.request(Method::GET, &format!("/accounts/{account_code}")))
            .await
    }

    async fn create_account(&self, account: NewAccount) -> AppResult<RemoteAccount> {
        self.mutate_json(self.request(Method::POST, "/accounts").json(&account))
            .await
    }

    async fn update_account(&self, account: &RemoteAccount) -> AppResult<RemoteAccount> {
        self.mutate_json(
            self.request(Method::PUT, &format!("/accounts/{}", account.account_code))
                .json(account),
        )
        .await
    }

    async fn close_account(&self, account_code: &str) -> AppResult<()> {
        self.send_checked(self.request(Method::DELETE, &format!("/accounts/{account_code}")))
            .await?;
        Ok(())
    }

    async fn get_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription> {
        self.fetch_json(self.request(Method::GET, &format!("/subscriptions/{uuid}")))
            .await
    }

    async fn subscriptions_for_account(
        &self,
        account_code: &str,
        filter: Option<SubscriptionStateFilter>,
        per_page: usize,
    ) -> AppResult<SubscriptionCursor> {
        let cursor = self
            .open_cursor::<RemoteSubscription>(
                &format!("/accounts/{account_code}/subscriptions"),
                filter.map(<&'static str>::from),
                per_page,
            )
            .await?;
        Ok(Box::new(cursor))
    }

    async fn create_subscription(
        &self,
        subscription: NewSubscription,
    ) -> AppResult<RemoteSubscription> {
        self.mutate_json(self.request(Method::POST, "/subscriptions").json(&subscription))
            .await
    }

    async fn preview_change(
        &self,
        uuid: &str,
        change: &SubscriptionChange,
    ) -> AppResult<SubscriptionPreview> {
        self.mutate_json(
            self.request(Method::POST, &format!("/subscriptions/{uuid}/preview"))
                .json(change),
        )
        .await
    }

    async fn apply_change(
        &self,
        uuid: &str,
        change: &SubscriptionChange,
    ) -> AppResult<RemoteSubscription> {
        self.mutate_json(
            self.request(Method::PUT, &format!("/subscriptions/{uuid}"))
                .json(change),
        )
        .await
    }

    async fn cancel_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription> {
        self.mutate_json(self.request(Method::PUT, &format!("/subscriptions/{uuid}/cancel")))
            .await
    }

    async fn terminate_subscription(
        &self,
        uuid: &str,
        refund: RefundType,
    ) -> AppResult<RemoteSubscription> {
        self.mutate_json(
            self.request(Method::PUT, &format!("/subscriptions/{uuid}/terminate"))
                .query(&[("refund", refund.as_ref())]),
        )
        .await
    }

    async fn reactivate_subscription(&self, uuid: &str) -> AppResult<RemoteSubscription> {
        self.mutate_json(self.request(Method::PUT, &format!("/subscriptions/{uuid}/reactivate")))
            .await
    }

    async fn get_plan(&self, plan_code: &str) -> AppResult<RemotePlan> {
        self.fetch_json(self.request(Method::GET, &format!("/plans/{plan_code}")))
            .await
    }

    async fn list_plans(&self) -> AppResult<Vec<RemotePlan>> {
        let page: Page<RemotePlan> = self
            .fetch_json(self.request(Method::GET, "/plans"))
            .await?;
        Ok(page.items)
    }

    async fn get_coupon(&self, coupon_code: &str) -> AppResult<RemoteCoupon> {
        self.fetch_json(self.request(Method::GET, &format!("/coupons/{coupon_code}")))
            .await
    }

    async fn redeem_coupon(
        &self,
        coupon_code: &str,
        account_code: &str,
        currency: &str,
    ) -> AppResult<CouponRedemption> {
        self.mutate_json(
            self.request(Method::POST, &format!("/coupons/{coupon_code}/redeem"))
                .json(&json!({
                    "account_code": account_code,
                    "currency": currency,
                })),
        )
        .await
    }

    async fn invoices_for_account(
        &self,
        account_code: &str,
        per_page: usize,
    ) -> AppResult<InvoiceCursor> {
        let cursor = self
            .open_cursor::<RemoteInvoice>(
                &format!("/accounts/{account_code}/invoices"),
                None,
                per_page,
            )
            .await?;
        Ok(Box::new(cursor))
    }

    async fn get_invoice(&self, invoice_number: &str) -> AppResult<RemoteInvoice> {
        self.fetch_json(self.request(Method::GET, &format!("/invoices/{invoice_number}")))
            .await
    }

    async fn invoice_pdf(&self, invoice_number: &str) -> AppResult<Vec<u8>> {
        let response = self.send(self.pdf_request(invoice_number)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::RemoteUnavailable(format!("bad response body: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn get_billing_info(&self, account_code: &str) -> AppResult<BillingInfo> {
        self.fetch_json(
            self.request(Method::GET, &format!("/accounts/{account_code}/billing_info")),
        )
        .await
    }

    async fn update_billing_info(
        &self,
        account_code: &str,
        info: &BillingInfo,
    ) -> AppResult<BillingInfo> {
        self.mutate_json(
            self.request(Method::PUT, &format!("/accounts/{account_code}/billing_info"))
                .json(info),
        )
        .await
    }
}
