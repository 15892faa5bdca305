use crate::{CategoryId, DebtId, NotificationId, TransactionId, requests, responses};
use reqwest::StatusCode;
use serde::Serialize;

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the backend.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path)).json(body);

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn empty_post(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.post(self.format_url(path));

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        let request = self.inner_client.get(self.format_url(path));

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }
}

/// Methods on the backend API
impl APIClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.empty_get("health_check").await?;
        ok_empty(response).await
    }

    pub async fn login(
        &self,
        details: &requests::LoginCredentials,
    ) -> Result<(), ClientError> {
        let response = self.post("login", &details).await?;
        ok_empty(response).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.empty_post("logout").await?;
        ok_empty(response).await
    }

    /// Check if the user is logged in.
    pub async fn login_check(&self) -> Result<bool, ClientError> {
        let response = self.empty_post("login_check").await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::UNAUTHORIZED => Ok(false),
            _ => Err(ClientError::APIError(
                response.status(),
                response.text().await?,
            )),
        }
    }

    pub async fn create_account(
        &self,
        details: &requests::CreateAccount,
    ) -> Result<(), ClientError> {
        let response = self.post("create_account", details).await?;
        ok_empty(response).await
    }

    pub async fn change_password(
        &self,
        details: &requests::ChangePassword,
    ) -> Result<responses::SuccessMessage, ClientError> {
        let response = self.post("change_password", details).await?;
        ok_body(response).await
    }

    pub async fn user_profile(
        &self,
    ) -> Result<responses::UserProfile, ClientError> {
        let response = self.empty_get("user_profile").await?;
        ok_body(response).await
    }

    // Debts and payments

    pub async fn create_debt(
        &self,
        details: &crate::Debt,
    ) -> Result<DebtId, ClientError> {
        let response = self.post("create_debt", details).await?;
        ok_body(response).await
    }

    pub async fn get_debt(
        &self,
        debt_id: &DebtId,
    ) -> Result<responses::Debt, ClientError> {
        let response = self.post("get_debt", debt_id).await?;
        ok_body(response).await
    }

    pub async fn list_debts(
        &self,
        filter: &requests::ListDebts,
    ) -> Result<Vec<responses::Debt>, ClientError> {
        let response = self.post("debts", filter).await?;
        ok_body(response).await
    }

    pub async fn update_debt(
        &self,
        details: &requests::UpdateDebt,
    ) -> Result<responses::Debt, ClientError> {
        let response = self.post("debt", details).await?;
        ok_body(response).await
    }

    pub async fn delete_debt(
        &self,
        debt_id: &DebtId,
    ) -> Result<(), ClientError> {
        let response = self.post("delete_debt", debt_id).await?;
        ok_empty(response).await
    }

    pub async fn add_payment(
        &self,
        details: &requests::AddPayment,
    ) -> Result<responses::Debt, ClientError> {
        let response = self.post("add_payment", details).await?;
        ok_body(response).await
    }

    pub async fn list_payments(
        &self,
        debt_id: &DebtId,
    ) -> Result<Vec<responses::Payment>, ClientError> {
        let response = self.post("payments", debt_id).await?;
        ok_body(response).await
    }

    // Transactions

    pub async fn create_transaction(
        &self,
        details: &crate::Transaction,
    ) -> Result<TransactionId, ClientError> {
        let response = self.post("create_transaction", details).await?;
        ok_body(response).await
    }

    pub async fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<responses::Transaction, ClientError> {
        let response = self.post("get_transaction", transaction_id).await?;
        ok_body(response).await
    }

    pub async fn list_transactions(
        &self,
        filter: &requests::ListTransactions,
    ) -> Result<Vec<responses::Transaction>, ClientError> {
        let response = self.post("transactions", filter).await?;
        ok_body(response).await
    }

    pub async fn update_transaction(
        &self,
        details: &requests::UpdateTransaction,
    ) -> Result<responses::Transaction, ClientError> {
        let response = self.post("transaction", details).await?;
        ok_body(response).await
    }

    pub async fn delete_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<(), ClientError> {
        let response = self.post("delete_transaction", transaction_id).await?;
        ok_empty(response).await
    }

    pub async fn list_categories(
        &self,
    ) -> Result<Vec<responses::Category>, ClientError> {
        let response = self.empty_get("categories").await?;
        ok_body(response).await
    }

    pub async fn create_category(
        &self,
        details: &requests::CreateCategory,
    ) -> Result<CategoryId, ClientError> {
        let response = self.post("create_category", details).await?;
        ok_body(response).await
    }

    // Notifications

    pub async fn list_notifications(
        &self,
    ) -> Result<Vec<responses::Notification>, ClientError> {
        let response = self.empty_get("notifications").await?;
        ok_body(response).await
    }

    pub async fn unread_count(&self) -> Result<i64, ClientError> {
        let response = self.empty_get("unread_count").await?;
        ok_body(response).await
    }

    pub async fn mark_notification_read(
        &self,
        details: &requests::MarkNotificationRead,
    ) -> Result<(), ClientError> {
        let response = self.post("mark_notification_read", details).await?;
        ok_empty(response).await
    }

    pub async fn mark_all_read(&self) -> Result<(), ClientError> {
        let response = self.empty_post("mark_all_read").await?;
        ok_empty(response).await
    }

    pub async fn delete_notification(
        &self,
        notification_id: &NotificationId,
    ) -> Result<(), ClientError> {
        let response = self.post("delete_notification", notification_id).await?;
        ok_empty(response).await
    }

    /// Delete all read notifications for the current user; returns the
    /// number deleted.
    pub async fn clear_read_notifications(&self) -> Result<u64, ClientError> {
        let response = self.empty_post("clear_read_notifications").await?;
        ok_body(response).await
    }

    // Reports and settings

    pub async fn monthly_report(
        &self,
        details: &requests::MonthlyReport,
    ) -> Result<responses::MonthlyReport, ClientError> {
        let response = self.post("monthly_report", details).await?;
        ok_body(response).await
    }

    pub async fn dashboard_summary(
        &self,
    ) -> Result<responses::DashboardSummary, ClientError> {
        let response = self.empty_get("dashboard_summary").await?;
        ok_body(response).await
    }

    pub async fn get_settings(
        &self,
    ) -> Result<Vec<responses::Setting>, ClientError> {
        let response = self.empty_get("settings").await?;
        ok_body(response).await
    }

    pub async fn update_setting(
        &self,
        details: &requests::UpdateSetting,
    ) -> Result<(), ClientError> {
        let response = self.post("setting", details).await?;
        ok_empty(response).await
    }

    pub async fn list_activity(
        &self,
    ) -> Result<Vec<responses::ActivityLogEntry>, ClientError> {
        let response = self.empty_get("activity").await?;
        ok_body(response).await
    }

    /// Trigger a notification sweep immediately (admin only). The scheduler
    /// runs the same sweep on a timer; this exists for operators and tests.
    pub async fn run_sweep(
        &self,
    ) -> Result<responses::SweepOutcome, ClientError> {
        let response = self.empty_post("run_sweep").await?;
        ok_body(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}
