//! API client for the ChargePoint driver REST API.
//!
//! This module provides the `ApiClient` struct for logging in and reading
//! account and home charger state. The client never stores a token; every
//! authenticated call takes the caller's `SessionToken`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::{Credentials, SessionToken};
use crate::models::{AccountSnapshot, ChargerId, ChargerSnapshot, ChargingSession};

use super::error::{ApiError, ApiResult};

// ============================================================================
// Constants
// ============================================================================

/// Accounts service (login, profile, balance) for North America
const DEFAULT_ACCOUNTS_URL: &str = "https://account.chargepoint.com/account";

/// Mobile web services (home charger status and technical info)
const DEFAULT_WEBSERVICES_URL: &str = "https://webservices.chargepoint.com/backend.php";

/// Map cache service (user charging status and sessions)
const DEFAULT_MAPCACHE_URL: &str = "https://mc.chargepoint.com/map-prod";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Cookie carrying the session token on authenticated requests
const SESSION_COOKIE: &str = "coulomb_sess";

/// Identifies the client to the login endpoint
const APP_ID: &str = "com.coulomb.ChargePoint";
const APP_VERSION: &str = "5.97.0-430-3033";

/// Base URLs of the three vendor services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub accounts: String,
    pub webservices: String,
    pub mapcache: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            accounts: DEFAULT_ACCOUNTS_URL.to_string(),
            webservices: DEFAULT_WEBSERVICES_URL.to_string(),
            mapcache: DEFAULT_MAPCACHE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Serve every service from one base URL (local proxies, mock servers)
    pub fn single(base_url: impl Into<String>) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        Self {
            accounts: base.clone(),
            webservices: base.clone(),
            mapcache: base,
        }
    }

    fn login_url(&self) -> String {
        format!("{}/v2/driver/profile/account/login", self.accounts)
    }

    fn profile_url(&self) -> String {
        format!("{}/v1/driver/profile/user", self.accounts)
    }

    fn mobile_api_url(&self) -> String {
        format!("{}/mobileapi/v5", self.webservices)
    }

    fn map_cache_url(&self) -> String {
        format!("{}/v2", self.mapcache)
    }
}

// ============================================================================
// Wire types - internal only
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    device_data: DeviceData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceData<'a> {
    app_id: &'a str,
    manufacturer: &'a str,
    model: &'a str,
    notification_id: &'a str,
    notification_id_type: &'a str,
    #[serde(rename = "type")]
    device_type: &'a str,
    udid: &'a str,
    version: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(rename = "userId")]
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    user: ProfileUser,
    #[serde(rename = "accountBalance")]
    account_balance: AccountBalance,
}

#[derive(Debug, Deserialize)]
struct ProfileUser {
    #[serde(rename = "userId")]
    user_id: i64,
    username: String,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    /// Decimal string, e.g. "12.50"
    amount: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct UserStatusEnvelope {
    user_status: Option<UserStatus>,
}

#[derive(Debug, Deserialize)]
struct UserStatus {
    charging: Option<UserCharging>,
}

#[derive(Debug, Deserialize)]
struct UserCharging {
    #[serde(rename = "sessionId")]
    session_id: i64,
}

#[derive(Debug, Deserialize)]
struct ChargingStatusEnvelope {
    charging_status: ChargingStatusApi,
}

#[derive(Debug, Deserialize)]
struct ChargingStatusApi {
    session_id: i64,
    device_id: i64,
    current_charging: Option<String>,
    power_kw: Option<f64>,
    energy_kwh: Option<f64>,
    total_amount: Option<f64>,
    currency_iso_code: Option<String>,
    charging_time: Option<i64>,
    miles_added: Option<f64>,
    miles_added_per_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GetPandasEnvelope {
    get_pandas: GetPandas,
}

#[derive(Debug, Deserialize)]
struct GetPandas {
    #[serde(default)]
    device_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct PandaStatusEnvelope {
    get_panda_status: PandaStatus,
}

#[derive(Debug, Deserialize)]
struct PandaStatus {
    brand: Option<String>,
    model: Option<String>,
    charging_status: Option<String>,
    plugged_in: Option<bool>,
    connected: Option<bool>,
    /// Milliseconds since the Unix epoch
    last_connected_at: Option<i64>,
    amperage_limit: Option<i64>,
    #[serde(default)]
    possible_amperage_limits: Vec<i64>,
    mac_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TechnicalInfoEnvelope {
    get_station_technical_info: TechnicalInfo,
}

#[derive(Debug, Deserialize)]
struct TechnicalInfo {
    software_version: Option<String>,
    serial_number: Option<String>,
    mac_address: Option<String>,
}

/// Status of one home charger as returned by the vendor.
#[derive(Debug, Clone)]
pub struct HomeChargerStatus {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub charging_status: Option<String>,
    pub plugged_in: Option<bool>,
    pub connected: Option<bool>,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub amperage_limit: Option<i64>,
    pub possible_amperage_limits: Vec<i64>,
    pub mac_address: Option<String>,
}

/// Firmware and hardware details of one home charger.
#[derive(Debug, Clone, Default)]
pub struct HomeChargerTechnicalInfo {
    pub software_version: Option<String>,
    pub serial_number: Option<String>,
    pub mac_address: Option<String>,
}

impl From<PandaStatus> for HomeChargerStatus {
    fn from(p: PandaStatus) -> Self {
        Self {
            brand: p.brand,
            model: p.model,
            charging_status: p.charging_status,
            plugged_in: p.plugged_in,
            connected: p.connected,
            last_connected_at: p.last_connected_at.and_then(DateTime::from_timestamp_millis),
            amperage_limit: p.amperage_limit,
            possible_amperage_limits: p.possible_amperage_limits,
            mac_address: p.mac_address,
        }
    }
}

impl From<ChargingStatusApi> for ChargingSession {
    fn from(c: ChargingStatusApi) -> Self {
        Self {
            session_id: c.session_id,
            device_id: c.device_id,
            charging_state: c.current_charging,
            power_kw: c.power_kw,
            energy_kwh: c.energy_kwh,
            total_amount: c.total_amount,
            currency: c.currency_iso_code,
            charging_time_ms: c.charging_time,
            miles_added: c.miles_added,
            miles_added_per_hour: c.miles_added_per_hour,
        }
    }
}

/// Combine the per-charger reads into one snapshot.
fn charger_snapshot(
    id: ChargerId,
    status: HomeChargerStatus,
    tech: HomeChargerTechnicalInfo,
    active_session: Option<&ChargingSession>,
) -> ChargerSnapshot {
    ChargerSnapshot {
        id,
        brand: status.brand,
        model: status.model,
        charging_status: status.charging_status,
        plugged_in: status.plugged_in,
        connected: status.connected,
        last_connected_at: status.last_connected_at,
        amperage_limit: status.amperage_limit,
        possible_amperage_limits: status.possible_amperage_limits,
        software_version: tech.software_version,
        serial_number: tech.serial_number,
        mac_address: tech.mac_address.or(status.mac_address),
        session: active_session.filter(|s| s.device_id == id).cloned(),
    }
}

/// Random 32-character hex device identifier sent with each login.
fn generate_udid() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// API client for ChargePoint.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
    udid: String,
}

impl ApiClient {
    /// Create a client against the default (North America) endpoints
    pub fn new() -> ApiResult<Self> {
        Self::with_endpoints(Endpoints::default())
    }

    pub fn with_endpoints(endpoints: Endpoints) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoints,
            udid: generate_udid(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Log in and return a fresh session token.
    ///
    /// Blank credentials fail with `AuthError::EmptyCredentials` without a
    /// request; a rejected login fails with the matching `AuthError`.
    pub async fn authenticate(&self, credentials: &Credentials) -> ApiResult<SessionToken> {
        credentials.validate()?;

        info!(username = %credentials.username, "Authenticating with ChargePoint");

        let body = LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
            device_data: DeviceData {
                app_id: APP_ID,
                manufacturer: "Apple",
                model: "iPhone",
                notification_id: "",
                notification_id_type: "",
                device_type: "IOS",
                udid: &self.udid,
                version: APP_VERSION,
            },
        };

        let response = self
            .client
            .post(self.endpoints.login_url())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_login_status(status, &body);
            warn!(status = status.as_u16(), error = %err, "Login rejected");
            return Err(err);
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("login: {}", e)))?;

        if login.session_id.is_empty() {
            return Err(ApiError::InvalidResponse(
                "login: empty session id".to_string(),
            ));
        }

        debug!(user_id = login.user.user_id, "Login successful");
        Ok(SessionToken::new(login.session_id, login.user.user_id))
    }

    /// Fetch the account balance and profile
    pub async fn get_account_balance(&self, token: &SessionToken) -> ApiResult<AccountSnapshot> {
        let profile: ProfileResponse = self.get(&self.endpoints.profile_url(), token).await?;

        let balance = profile
            .account_balance
            .amount
            .trim()
            .parse::<f64>()
            .map_err(|e| {
                ApiError::InvalidResponse(format!(
                    "account balance {:?}: {}",
                    profile.account_balance.amount, e
                ))
            })?;

        Ok(AccountSnapshot {
            user_id: profile.user.user_id,
            username: profile.user.username,
            balance,
            currency: profile.account_balance.currency,
        })
    }

    /// Id of the user's in-progress charging session, if any
    pub async fn get_user_charging_status(&self, token: &SessionToken) -> ApiResult<Option<i64>> {
        let body = json!({ "user_status": { "mfhs": {} } });
        let envelope: UserStatusEnvelope =
            self.post(&self.endpoints.map_cache_url(), token, &body).await?;

        Ok(envelope
            .user_status
            .and_then(|s| s.charging)
            .map(|c| c.session_id))
    }

    pub async fn get_charging_session(
        &self,
        token: &SessionToken,
        session_id: i64,
    ) -> ApiResult<ChargingSession> {
        let body = json!({ "charging_status": { "mfhs": {}, "session_id": session_id } });
        let envelope: ChargingStatusEnvelope =
            self.post(&self.endpoints.map_cache_url(), token, &body).await?;
        Ok(envelope.charging_status.into())
    }

    /// Device ids of the home chargers registered to the account
    pub async fn get_home_chargers(&self, token: &SessionToken) -> ApiResult<Vec<ChargerId>> {
        let body = json!({ "user_id": token.user_id(), "get_pandas": { "mfhs": {} } });
        let envelope: GetPandasEnvelope =
            self.post(&self.endpoints.mobile_api_url(), token, &body).await?;
        Ok(envelope.get_pandas.device_ids)
    }

    pub async fn get_home_charger_status(
        &self,
        token: &SessionToken,
        charger_id: ChargerId,
    ) -> ApiResult<HomeChargerStatus> {
        let body = json!({
            "user_id": token.user_id(),
            "get_panda_status": { "device_id": charger_id, "mfhs": {} }
        });
        let envelope: PandaStatusEnvelope =
            self.post(&self.endpoints.mobile_api_url(), token, &body).await?;
        Ok(envelope.get_panda_status.into())
    }

    pub async fn get_home_charger_technical_info(
        &self,
        token: &SessionToken,
        charger_id: ChargerId,
    ) -> ApiResult<HomeChargerTechnicalInfo> {
        let body = json!({
            "user_id": token.user_id(),
            "get_station_technical_info": { "device_id": charger_id }
        });
        let envelope: TechnicalInfoEnvelope =
            self.post(&self.endpoints.mobile_api_url(), token, &body).await?;
        let info = envelope.get_station_technical_info;
        Ok(HomeChargerTechnicalInfo {
            software_version: info.software_version,
            serial_number: info.serial_number,
            mac_address: info.mac_address,
        })
    }

    /// The user's in-progress charging session, wherever it is running
    pub async fn get_active_session(&self, token: &SessionToken) -> ApiResult<Option<ChargingSession>> {
        match self.get_user_charging_status(token).await? {
            Some(session_id) => {
                let session = self.get_charging_session(token, session_id).await?;
                debug!(session_id, device_id = session.device_id, "Active charging session");
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Read every home charger, attaching `active_session` to the charger it
    /// is running on.
    pub async fn list_home_chargers(
        &self,
        token: &SessionToken,
        active_session: Option<&ChargingSession>,
    ) -> ApiResult<Vec<ChargerSnapshot>> {
        let ids = self.get_home_chargers(token).await?;
        debug!(count = ids.len(), "Home chargers listed");

        let mut chargers = Vec::with_capacity(ids.len());
        for id in ids {
            let status = self.get_home_charger_status(token, id).await?;
            let tech = self.get_home_charger_technical_info(token, id).await?;
            chargers.push(charger_snapshot(id, status, tech, active_session));
        }

        Ok(chargers)
    }

    /// Fetch the active session, then every home charger with it attached.
    pub async fn list_chargers(&self, token: &SessionToken) -> ApiResult<Vec<ChargerSnapshot>> {
        let active_session = self.get_active_session(token).await?;
        self.list_home_chargers(token, active_session.as_ref()).await
    }

    // ===== Request helpers =====

    fn session_cookie(token: &SessionToken) -> String {
        format!("{}={}", SESSION_COOKIE, token.value())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> ApiResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, token: &SessionToken) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .header(header::COOKIE, Self::session_cookie(token))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse(response, url).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        token: &SessionToken,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .client
            .post(url)
            .header(header::COOKIE, Self::session_cookie(token))
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse(response, url).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::AuthError;
    use mockito::{Matcher, Server, ServerGuard};

    pub(crate) const SESSION_ID: &str = "sess-abc123";
    pub(crate) const USER_ID: i64 = 4242;
    pub(crate) const CHARGER_ID: i64 = 12345678;

    pub(crate) fn credentials() -> Credentials {
        Credentials::new("user@example.com", "pw")
    }

    pub(crate) fn client_for(server: &ServerGuard) -> ApiClient {
        ApiClient::with_endpoints(Endpoints::single(server.url())).expect("client builds")
    }

    pub(crate) async fn mock_login(server: &mut ServerGuard) -> mockito::Mock {
        login_mock(server).create_async().await
    }

    /// Login mock not yet registered, for tests that set hit expectations
    pub(crate) fn login_mock(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/v2/driver/profile/account/login")
            .match_body(Matcher::PartialJson(json!({
                "username": "user@example.com",
                "password": "pw"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "sessionId": SESSION_ID, "user": { "userId": USER_ID } }).to_string())
    }

    pub(crate) async fn mock_profile(server: &mut ServerGuard, amount: &str) -> mockito::Mock {
        profile_mock(server, amount).create_async().await
    }

    pub(crate) fn profile_mock(server: &mut ServerGuard, amount: &str) -> mockito::Mock {
        server
            .mock("GET", "/v1/driver/profile/user")
            .match_header("cookie", format!("coulomb_sess={}", SESSION_ID).as_str())
            .with_status(200)
            .with_body(
                json!({
                    "user": { "userId": USER_ID, "username": "user@example.com" },
                    "accountBalance": { "accountNumber": "1", "amount": amount, "currency": "USD" }
                })
                .to_string(),
            )
    }

    pub(crate) async fn mock_no_active_session(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/v2")
            .match_body(Matcher::PartialJson(json!({ "user_status": {} })))
            .with_status(200)
            .with_body(json!({ "user_status": {} }).to_string())
            .create_async()
            .await
    }

    pub(crate) async fn mock_active_session(server: &mut ServerGuard, power_kw: f64) -> Vec<mockito::Mock> {
        let status = server
            .mock("POST", "/v2")
            .match_body(Matcher::PartialJson(json!({ "user_status": {} })))
            .with_status(200)
            .with_body(json!({ "user_status": { "charging": { "sessionId": 777 } } }).to_string())
            .create_async()
            .await;
        let session = server
            .mock("POST", "/v2")
            .match_body(Matcher::PartialJson(json!({ "charging_status": { "session_id": 777 } })))
            .with_status(200)
            .with_body(
                json!({
                    "charging_status": {
                        "session_id": 777,
                        "device_id": CHARGER_ID,
                        "current_charging": "in_use",
                        "power_kw": power_kw,
                        "energy_kwh": 4.5678,
                        "total_amount": 1.5,
                        "currency_iso_code": "USD",
                        "charging_time": 3_723_000,
                        "miles_added": 15.123,
                        "miles_added_per_hour": 22.0
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        vec![status, session]
    }

    pub(crate) async fn mock_chargers(server: &mut ServerGuard, ids: &[i64]) -> Vec<mockito::Mock> {
        let mut mocks = vec![server
            .mock("POST", "/mobileapi/v5")
            .match_body(Matcher::PartialJson(json!({ "get_pandas": {} })))
            .with_status(200)
            .with_body(json!({ "get_pandas": { "device_ids": ids } }).to_string())
            .create_async()
            .await];

        for id in ids {
            mocks.push(
                server
                    .mock("POST", "/mobileapi/v5")
                    .match_body(Matcher::PartialJson(
                        json!({ "get_panda_status": { "device_id": id } }),
                    ))
                    .with_status(200)
                    .with_body(
                        json!({
                            "get_panda_status": {
                                "brand": "CP",
                                "model": "CPH50-NEMA6-50-L23",
                                "charging_status": "AVAILABLE",
                                "plugged_in": true,
                                "connected": true,
                                "last_connected_at": 1_700_000_000_000_i64,
                                "amperage_limit": 28,
                                "possible_amperage_limits": [8, 16, 24, 28, 32]
                            }
                        })
                        .to_string(),
                    )
                    .create_async()
                    .await,
            );
            mocks.push(
                server
                    .mock("POST", "/mobileapi/v5")
                    .match_body(Matcher::PartialJson(
                        json!({ "get_station_technical_info": { "device_id": id } }),
                    ))
                    .with_status(200)
                    .with_body(
                        json!({
                            "get_station_technical_info": {
                                "software_version": "5.5.2.3",
                                "serial_number": "SN-1",
                                "mac_address": "00:11:22:33:44:55"
                            }
                        })
                        .to_string(),
                    )
                    .create_async()
                    .await,
            );
        }
        mocks
    }

    #[tokio::test]
    async fn test_authenticate_then_balance() {
        let mut server = Server::new_async().await;
        let login = mock_login(&mut server).await;
        let profile = mock_profile(&mut server, "12.50").await;
        let client = client_for(&server);

        let token = client.authenticate(&credentials()).await.unwrap();
        assert_eq!(token.value(), SESSION_ID);
        assert_eq!(token.user_id(), USER_ID);

        let account = client.get_account_balance(&token).await.unwrap();
        assert_eq!(account.balance, 12.5);
        assert!(account.balance >= 0.0);
        assert_eq!(account.currency, "USD");
        assert_eq!(account.username, "user@example.com");

        login.assert_async().await;
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_invalid_credentials() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/v2/driver/profile/account/login")
            .with_status(401)
            .with_body(json!({ "errorId": 9, "errorMessage": "Invalid" }).to_string())
            .create_async()
            .await;
        let client = client_for(&server);

        let err = client
            .authenticate(&Credentials::new("user@example.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::InvalidCredentials));
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_locked_account() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v2/driver/profile/account/login")
            .with_status(403)
            .with_body(json!({ "errorId": 241 }).to_string())
            .create_async()
            .await;
        let client = client_for(&server);

        let err = client.authenticate(&credentials()).await.unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::AccountLocked));
    }

    #[tokio::test]
    async fn test_authenticate_empty_credentials_sends_nothing() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/v2/driver/profile/account/login")
            .expect(0)
            .create_async()
            .await;
        let client = client_for(&server);

        let err = client
            .authenticate(&Credentials::new("", ""))
            .await
            .unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::EmptyCredentials));
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_is_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/driver/profile/user")
            .with_status(401)
            .create_async()
            .await;
        let client = client_for(&server);

        let err = client
            .get_account_balance(&SessionToken::new("stale", USER_ID))
            .await
            .unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_unparseable_balance_is_invalid_response() {
        let mut server = Server::new_async().await;
        mock_profile(&mut server, "n/a").await;
        let client = client_for(&server);

        let err = client
            .get_account_balance(&SessionToken::new(SESSION_ID, USER_ID))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_list_chargers_attaches_active_session() {
        let mut server = Server::new_async().await;
        let _session = mock_active_session(&mut server, 7.2).await;
        let _chargers = mock_chargers(&mut server, &[CHARGER_ID]).await;
        let client = client_for(&server);

        let chargers = client
            .list_chargers(&SessionToken::new(SESSION_ID, USER_ID))
            .await
            .unwrap();

        assert_eq!(chargers.len(), 1);
        let charger = &chargers[0];
        assert_eq!(charger.id, CHARGER_ID);
        assert_eq!(charger.short_model(), Some("CPH50"));
        assert_eq!(charger.software_version.as_deref(), Some("5.5.2.3"));
        assert_eq!(
            charger.last_connected_at.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
        assert_eq!(charger.power_kw(), Some(7.2));
        assert_eq!(charger.state(), crate::models::ChargerState::Charging);
    }

    #[tokio::test]
    async fn test_list_chargers_empty() {
        let mut server = Server::new_async().await;
        let _status = mock_no_active_session(&mut server).await;
        let _chargers = mock_chargers(&mut server, &[]).await;
        let client = client_for(&server);

        let chargers = client
            .list_chargers(&SessionToken::new(SESSION_ID, USER_ID))
            .await
            .unwrap();
        assert!(chargers.is_empty());
    }

    #[test]
    fn test_session_for_other_device_not_attached() {
        let status = HomeChargerStatus {
            brand: None,
            model: None,
            charging_status: None,
            plugged_in: None,
            connected: Some(true),
            last_connected_at: None,
            amperage_limit: None,
            possible_amperage_limits: vec![],
            mac_address: Some("aa".to_string()),
        };
        let session = ChargingSession {
            session_id: 1,
            device_id: 2,
            charging_state: Some("in_use".to_string()),
            power_kw: Some(1.0),
            energy_kwh: None,
            total_amount: None,
            currency: None,
            charging_time_ms: None,
            miles_added: None,
            miles_added_per_hour: None,
        };

        let snapshot = charger_snapshot(1, status, HomeChargerTechnicalInfo::default(), Some(&session));
        assert!(snapshot.session.is_none());
        assert_eq!(snapshot.mac_address.as_deref(), Some("aa"));
    }

    #[test]
    fn test_generate_udid() {
        let udid = generate_udid();
        assert_eq!(udid.len(), 32);
        assert!(udid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_endpoints_single_trims_slash() {
        let endpoints = Endpoints::single("http://127.0.0.1:1234/");
        assert_eq!(
            endpoints.login_url(),
            "http://127.0.0.1:1234/v2/driver/profile/account/login"
        );
        assert_eq!(endpoints.mobile_api_url(), "http://127.0.0.1:1234/mobileapi/v5");
    }
}
