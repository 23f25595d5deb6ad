// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Typed calls against the Secrets Safe and Password Safe endpoints

use crate::error::{ApiError, ApiResult};
use crate::session::{error_message, Session};
use crate::transport::{ApiRequest, ApiResponse};
use insight_models::{AccessRequest, ManagedAccount, RequestId, SecretRecord};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Folder separator sent with every secrets lookup
pub const PATH_SEPARATOR: &str = "/";

/// Sentinel payload the API returns instead of an account
pub const MANAGED_ACCOUNT_NOT_FOUND: &str = "Managed Account not found";

const SECRETS_PATH: &str = "/secrets-safe/secrets";
const MANAGED_ACCOUNTS_PATH: &str = "/ManagedAccounts";
const REQUESTS_PATH: &str = "/Requests";

impl Session {
    async fn call(&self, endpoint: &str, request: ApiRequest) -> ApiResult<ApiResponse> {
        let response = self.transport().send(request).await.map_err(|e| {
            insight_logging::error(&format!("{}: {}", endpoint, e));
            ApiError::from(e)
        })?;
        Ok(response)
    }

    fn fail<T>(&self, endpoint: &str, response: &ApiResponse) -> ApiResult<T> {
        let error = ApiError::status(endpoint, response.status, error_message(&response.body));
        insight_logging::error(&error.to_string());
        Err(error)
    }

    fn decode<T: DeserializeOwned>(&self, endpoint: &str, response: &ApiResponse) -> ApiResult<T> {
        response
            .json()
            .map_err(|source| ApiError::decode(endpoint, source))
    }

    /// `GET /secrets-safe/secrets`. With a title, looks up that one secret in
    /// `path`; without, lists every secret directly in the folder `path`.
    pub async fn find_secrets(
        &self,
        path: &str,
        title: Option<&str>,
    ) -> ApiResult<Vec<SecretRecord>> {
        let endpoint = "get_secret_by_path";
        let mut request = ApiRequest::get(SECRETS_PATH);
        if let Some(title) = title {
            request = request.query("title", title);
        }
        let request = request
            .query("path", path)
            .query("separator", PATH_SEPARATOR);

        let response = self.call(endpoint, request).await?;
        if response.status != 200 {
            return self.fail(endpoint, &response);
        }
        self.decode(endpoint, &response)
    }

    /// `GET /secrets-safe/secrets/{id}/file/download`
    pub async fn download_secret_file(&self, secret_id: &str) -> ApiResult<String> {
        let endpoint = "get_file_by_id";
        let request = ApiRequest::get(format!("{}/{}/file/download", SECRETS_PATH, secret_id));

        let response = self.call(endpoint, request).await?;
        if response.status != 200 {
            return self.fail(endpoint, &response);
        }
        Ok(response.body)
    }

    /// `GET /ManagedAccounts` for one system/account pair.
    /// `Ok(None)` when the API reports the account as not found.
    pub async fn find_managed_account(
        &self,
        system_name: &str,
        account_name: &str,
    ) -> ApiResult<Option<ManagedAccount>> {
        let endpoint = "get_managed_accounts";
        let response = self
            .call(endpoint, managed_accounts_request(system_name, account_name))
            .await?;
        if response.status != 200 {
            return self.fail(endpoint, &response);
        }

        match self.decode::<Value>(endpoint, &response)? {
            Value::String(message) => {
                insight_logging::debug(&format!("{}: {}", endpoint, message));
                Ok(None)
            }
            Value::Array(items) => match items.into_iter().next() {
                Some(item) => serde_json::from_value(item)
                    .map(Some)
                    .map_err(|source| ApiError::decode(endpoint, source)),
                None => Ok(None),
            },
            other => serde_json::from_value(other)
                .map(Some)
                .map_err(|source| ApiError::decode(endpoint, source)),
        }
    }

    /// `GET /ManagedAccounts` with empty filters: every account visible to the caller
    pub async fn list_managed_accounts(&self) -> ApiResult<Vec<ManagedAccount>> {
        let endpoint = "get_managed_accounts";
        let response = self.call(endpoint, managed_accounts_request("", "")).await?;
        if response.status != 200 {
            return self.fail(endpoint, &response);
        }

        match self.decode::<Value>(endpoint, &response)? {
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<ManagedAccount>, _>>()
                .map_err(|source| ApiError::decode(endpoint, source)),
            Value::String(message) if message == MANAGED_ACCOUNT_NOT_FOUND => Ok(Vec::new()),
            other => serde_json::from_value(other)
                .map(|account| vec![account])
                .map_err(|source| ApiError::decode(endpoint, source)),
        }
    }

    /// `POST /Requests`
    pub async fn create_access_request(&self, account: &ManagedAccount) -> ApiResult<RequestId> {
        let endpoint = "create_request";
        let body = AccessRequest::for_account(account);
        let payload =
            serde_json::to_value(&body).map_err(|source| ApiError::decode(endpoint, source))?;
        let request = ApiRequest::post(REQUESTS_PATH).json(payload);

        let response = self.call(endpoint, request).await?;
        if !matches!(response.status, 200 | 201) {
            return self.fail(endpoint, &response);
        }
        self.decode(endpoint, &response)
    }

    /// `GET /Credentials/{requestId}`; the password with its JSON quotes removed
    pub async fn get_credential(&self, request_id: &RequestId) -> ApiResult<String> {
        let endpoint = "get_credential_by_request_id";
        let request = ApiRequest::get(format!("/Credentials/{}", request_id));

        let response = self.call(endpoint, request).await?;
        if response.status != 200 {
            return self.fail(endpoint, &response);
        }
        Ok(strip_quotes(&response.body).to_string())
    }

    /// `PUT /Requests/{requestId}/checkin`: release the lease early
    pub async fn check_in(&self, request_id: &RequestId) -> ApiResult<()> {
        let endpoint = "request_check_in";
        let request =
            ApiRequest::put(format!("{}/{}/checkin", REQUESTS_PATH, request_id)).json(json!({}));

        let response = self.call(endpoint, request).await?;
        if !matches!(response.status, 200 | 204) {
            return self.fail(endpoint, &response);
        }
        Ok(())
    }
}

fn managed_accounts_request(system_name: &str, account_name: &str) -> ApiRequest {
    ApiRequest::get(MANAGED_ACCOUNTS_PATH)
        .query("systemName", system_name)
        .query("accountName", account_name)
}

/// Remove one layer of surrounding double quotes
fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_session;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn account() -> ManagedAccount {
        ManagedAccount {
            system_id: 3,
            account_id: 8,
            system_name: "srv01".to_string(),
            account_name: "admin".to_string(),
        }
    }

    #[test]
    fn test_strip_quotes_removes_one_layer() {
        assert_eq!(strip_quotes("\"p@ss\""), "p@ss");
        assert_eq!(strip_quotes("\"\"quoted\"\""), "\"quoted\"");
        assert_eq!(strip_quotes("bare"), "bare");
        assert_eq!(strip_quotes("\"unbalanced"), "\"unbalanced");
    }

    #[tokio::test]
    async fn test_find_secrets_with_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets-safe/secrets"))
            .and(query_param("title", "secretX"))
            .and(query_param("path", "folderA"))
            .and(query_param("separator", "/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "Id": "a1",
                "Title": "secretX",
                "Username": "svc",
                "Password": "pw",
                "FolderPath": "folderA",
                "SecretType": "Credential"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let session = mock_session(&server);
        let secrets = session.find_secrets("folderA", Some("secretX")).await.unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].title, "secretX");
    }

    #[tokio::test]
    async fn test_find_secrets_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets-safe/secrets"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!("Forbidden")))
            .mount(&server)
            .await;

        let session = mock_session(&server);
        let err = session.find_secrets("folderA", None).await.unwrap_err();
        assert_eq!(err.http_status(), Some(403));
    }

    #[tokio::test]
    async fn test_find_managed_account_sentinel_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ManagedAccounts"))
            .and(query_param("systemName", "srv01"))
            .and(query_param("accountName", "ghost"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!(MANAGED_ACCOUNT_NOT_FOUND)),
            )
            .mount(&server)
            .await;

        let session = mock_session(&server);
        let found = session.find_managed_account("srv01", "ghost").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_managed_account_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ManagedAccounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "SystemId": 3,
                "AccountId": 8,
                "SystemName": "srv01",
                "AccountName": "admin",
                "DomainName": null
            })))
            .mount(&server)
            .await;

        let session = mock_session(&server);
        let found = session.find_managed_account("srv01", "admin").await.unwrap();
        assert_eq!(found, Some(account()));
    }

    #[tokio::test]
    async fn test_list_managed_accounts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ManagedAccounts"))
            .and(query_param("systemName", ""))
            .and(query_param("accountName", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"SystemId": 3, "AccountId": 8, "SystemName": "srv01", "AccountName": "admin"},
                {"SystemId": 4, "AccountId": 9, "SystemName": "srv02", "AccountName": "root"}
            ])))
            .mount(&server)
            .await;

        let session = mock_session(&server);
        let accounts = session.list_managed_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].system_name, "srv02");
    }

    #[tokio::test]
    async fn test_create_access_request_posts_lease_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Requests"))
            .and(body_json(json!({
                "SystemID": 3,
                "AccountID": 8,
                "DurationMinutes": 5,
                "Reason": "Test",
                "ConflictOption": "reuse"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!(42)))
            .expect(1)
            .mount(&server)
            .await;

        let session = mock_session(&server);
        let request_id = session.create_access_request(&account()).await.unwrap();
        assert_eq!(request_id.as_str(), "42");
    }

    #[tokio::test]
    async fn test_get_credential_and_check_in() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Credentials/42"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"p@ss\""))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/Requests/42/checkin"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let session = mock_session(&server);
        let request_id = RequestId::new("42");
        assert_eq!(session.get_credential(&request_id).await.unwrap(), "p@ss");
        session.check_in(&request_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_in_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/Requests/42/checkin"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Request already expired"))
            .mount(&server)
            .await;

        let session = mock_session(&server);
        let err = session.check_in(&RequestId::new("42")).await.unwrap_err();
        assert!(err.to_string().contains("Request already expired"));
    }
}
