//! Polling coordinator.
//!
//! The host calls [`Coordinator::refresh`] on its own schedule. Each call
//! reads the account and every home charger, then publishes the result on
//! a `watch` channel. A failed cycle publishes an update without data so
//! every entity shows as unavailable until the next successful one.
//!
//! Ticks never overlap: a `refresh` that arrives while another is running
//! returns [`RefreshOutcome::Skipped`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, ApiResult, AuthError};
use crate::auth::{Credentials, Session, SessionToken};
use crate::models::{AccountSnapshot, ChargerId, ChargerSnapshot, ChargingSession};

/// Everything read in one successful poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorData {
    pub account: AccountSnapshot,
    /// The user's in-progress session, including one on a public station
    pub active_session: Option<ChargingSession>,
    pub chargers: BTreeMap<ChargerId, ChargerSnapshot>,
}

/// What subscribers see after each tick.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorUpdate {
    /// `None` before the first poll and after a failed one
    pub data: Option<Arc<CoordinatorData>>,
    /// Message of the failure that cleared `data`
    pub error: Option<String>,
    pub polled_at: Option<DateTime<Utc>>,
}

impl CoordinatorUpdate {
    pub fn is_available(&self) -> bool {
        self.data.is_some()
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    /// New data was published. `token_renewed` is set when this tick had
    /// to log in, so the host can persist the new token.
    Updated { token_renewed: bool },
    /// The tick failed; entities are unavailable until the next one. A
    /// login that succeeded before the failure still sets `token_renewed`.
    Failed { error: ApiError, token_renewed: bool },
    /// Another tick was still running.
    Skipped,
}

struct PollState {
    credentials: Credentials,
    session: Session,
}

pub struct Coordinator {
    client: ApiClient,
    state: Mutex<PollState>,
    tx: watch::Sender<CoordinatorUpdate>,
}

impl Coordinator {
    /// Create a coordinator, optionally reusing a token saved by the host.
    pub fn new(client: ApiClient, credentials: Credentials, token: Option<SessionToken>) -> Self {
        let session = match token {
            Some(t) => Session::with_token(t),
            None => Session::new(),
        };
        let (tx, _rx) = watch::channel(CoordinatorUpdate::default());

        Self {
            client,
            state: Mutex::new(PollState {
                credentials,
                session,
            }),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorUpdate> {
        self.tx.subscribe()
    }

    /// The most recently published update
    pub fn latest(&self) -> CoordinatorUpdate {
        self.tx.borrow().clone()
    }

    /// Current token, for the host to persist
    pub async fn session_token(&self) -> Option<SessionToken> {
        self.state.lock().await.session.token().cloned()
    }

    /// Swap credentials after a reauth; the next tick logs in with them.
    pub async fn update_credentials(&self, credentials: Credentials) {
        let mut state = self.state.lock().await;
        state.credentials = credentials;
        state.session.invalidate();
    }

    /// Initial poll during setup.
    ///
    /// Unlike [`refresh`](Self::refresh) this returns the error so the host
    /// can tell "authentication failed" from "not ready yet". A saved token
    /// the vendor no longer accepts is replaced by one fresh login first.
    pub async fn first_refresh(&self) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        let had_saved_token = state.session.is_valid();

        let result = match self.poll(&mut state).await {
            (_, Err(ApiError::Auth(AuthError::SessionExpired))) if had_saved_token => {
                info!("Saved session token rejected, logging in again");
                self.poll(&mut state).await.1
            }
            (_, other) => other,
        };

        match result {
            Ok(data) => {
                self.publish_data(data);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Initial ChargePoint refresh failed");
                self.publish_error(&e);
                Err(e)
            }
        }
    }

    /// Run one poll cycle.
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(_) => {
                debug!("Refresh already in progress, skipping tick");
                return RefreshOutcome::Skipped;
            }
        };

        let (token_renewed, result) = self.poll(&mut state).await;
        match result {
            Ok(data) => {
                self.publish_data(data);
                RefreshOutcome::Updated { token_renewed }
            }
            Err(e) => {
                error!(error = %e, "Failed to update ChargePoint state");
                self.publish_error(&e);
                RefreshOutcome::Failed {
                    error: e,
                    token_renewed,
                }
            }
        }
    }

    /// One fetch, logging in first when there is no token. Also returns
    /// whether a new token was issued.
    async fn poll(&self, state: &mut PollState) -> (bool, ApiResult<CoordinatorData>) {
        let (token, logged_in) = match state.session.token() {
            Some(token) => (token.clone(), false),
            None => {
                warn!("No valid ChargePoint session, logging in");
                match self.client.authenticate(&state.credentials).await {
                    Ok(token) => {
                        state.session.update(token.clone());
                        (token, true)
                    }
                    Err(e) => return (false, Err(e)),
                }
            }
        };

        let result = self.fetch(&token).await;
        if let Err(ref e) = result {
            if e.is_auth() {
                warn!(error = %e, "ChargePoint session rejected, will re-login on next poll");
                state.session.invalidate();
            }
        }
        (logged_in, result)
    }

    async fn fetch(&self, token: &SessionToken) -> ApiResult<CoordinatorData> {
        let account = self.client.get_account_balance(token).await?;
        debug!(balance = account.balance, currency = %account.currency, "Account information");

        let active_session = self.client.get_active_session(token).await?;

        let chargers = self
            .client
            .list_home_chargers(token, active_session.as_ref())
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect::<BTreeMap<_, _>>();
        debug!(count = chargers.len(), "Home chargers refreshed");

        Ok(CoordinatorData {
            account,
            active_session,
            chargers,
        })
    }

    fn publish_data(&self, data: CoordinatorData) {
        self.tx.send_replace(CoordinatorUpdate {
            data: Some(Arc::new(data)),
            error: None,
            polled_at: Some(Utc::now()),
        });
    }

    fn publish_error(&self, e: &ApiError) {
        self.tx.send_replace(CoordinatorUpdate {
            data: None,
            error: Some(e.to_string()),
            polled_at: Some(Utc::now()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_refresh_logs_in_once_and_publishes() {
        let mut server = Server::new_async().await;
        let login = login_mock(&mut server).expect(1).create_async().await;
        let _profile = mock_profile(&mut server, "12.50").await;
        let _status = mock_no_active_session(&mut server).await;
        let _chargers = mock_chargers(&mut server, &[CHARGER_ID]).await;

        let coordinator = Coordinator::new(client_for(&server), credentials(), None);
        let rx = coordinator.subscribe();
        assert!(!rx.borrow().is_available());

        assert!(matches!(
            coordinator.refresh().await,
            RefreshOutcome::Updated { token_renewed: true }
        ));
        assert!(matches!(
            coordinator.refresh().await,
            RefreshOutcome::Updated { token_renewed: false }
        ));

        let update = rx.borrow().clone();
        let data = update.data.expect("data published");
        assert_eq!(data.account.balance_display(), "12.50");
        assert!(data.chargers.contains_key(&CHARGER_ID));
        assert!(update.error.is_none());

        login.assert_async().await;
        assert_eq!(
            coordinator.session_token().await.map(|t| t.value().to_string()),
            Some(SESSION_ID.to_string())
        );
    }

    #[tokio::test]
    async fn test_failed_cycle_does_not_leak_into_next() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let broken = server
            .mock("GET", "/v1/driver/profile/user")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;
        let _status = mock_no_active_session(&mut server).await;
        let _chargers = mock_chargers(&mut server, &[CHARGER_ID]).await;

        let coordinator = Coordinator::new(client_for(&server), credentials(), None);

        match coordinator.refresh().await {
            RefreshOutcome::Failed {
                error: ApiError::ServerError(_),
                token_renewed: true,
            } => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
        let failed = coordinator.latest();
        assert!(!failed.is_available());
        assert!(failed.error.is_some());
        // Transient failures keep the token
        assert!(coordinator.session_token().await.is_some());

        broken.remove_async().await;
        let _profile = mock_profile(&mut server, "3.00").await;

        assert!(matches!(
            coordinator.refresh().await,
            RefreshOutcome::Updated { .. }
        ));
        let recovered = coordinator.latest();
        assert!(recovered.error.is_none());
        assert_eq!(
            recovered.data.map(|d| d.account.balance_display()),
            Some("3.00".to_string())
        );
    }

    #[tokio::test]
    async fn test_auth_failure_relogs_on_next_tick() {
        let mut server = Server::new_async().await;
        let login = login_mock(&mut server).expect(2).create_async().await;
        let expired = server
            .mock("GET", "/v1/driver/profile/user")
            .with_status(401)
            .create_async()
            .await;
        let _status = mock_no_active_session(&mut server).await;
        let _chargers = mock_chargers(&mut server, &[]).await;

        let coordinator = Coordinator::new(client_for(&server), credentials(), None);

        match coordinator.refresh().await {
            RefreshOutcome::Failed { error, .. } => {
                assert_eq!(error.auth_error(), Some(&AuthError::SessionExpired))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(coordinator.session_token().await.is_none());

        expired.remove_async().await;
        let _profile = mock_profile(&mut server, "0.00").await;

        assert!(matches!(
            coordinator.refresh().await,
            RefreshOutcome::Updated { token_renewed: true }
        ));
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_credentials_publish_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v2/driver/profile/account/login")
            .with_status(401)
            .with_body(r#"{"errorId": 9}"#)
            .create_async()
            .await;

        let coordinator = Coordinator::new(client_for(&server), credentials(), None);
        let err = coordinator.first_refresh().await.unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::InvalidCredentials));
        assert!(!coordinator.latest().is_available());
        assert!(coordinator.session_token().await.is_none());
    }

    #[tokio::test]
    async fn test_first_refresh_replaces_stale_saved_token() {
        let mut server = Server::new_async().await;
        let login = login_mock(&mut server).expect(1).create_async().await;
        let stale = server
            .mock("GET", "/v1/driver/profile/user")
            .match_header("cookie", "coulomb_sess=stale")
            .with_status(401)
            .create_async()
            .await;
        let _profile = mock_profile(&mut server, "1.00").await;
        let _status = mock_no_active_session(&mut server).await;
        let _chargers = mock_chargers(&mut server, &[]).await;

        let coordinator = Coordinator::new(
            client_for(&server),
            credentials(),
            Some(SessionToken::new("stale", USER_ID)),
        );
        coordinator.first_refresh().await.unwrap();

        assert!(coordinator.latest().is_available());
        stale.assert_async().await;
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_first_refresh_does_not_relogin_fresh_token() {
        let mut server = Server::new_async().await;
        let login = login_mock(&mut server).expect(1).create_async().await;
        let _rejected = server
            .mock("GET", "/v1/driver/profile/user")
            .with_status(401)
            .create_async()
            .await;

        let coordinator = Coordinator::new(client_for(&server), credentials(), None);
        let err = coordinator.first_refresh().await.unwrap_err();

        assert_eq!(err.auth_error(), Some(&AuthError::SessionExpired));
        assert!(coordinator.session_token().await.is_none());
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_before_failed_fetch_is_reported() {
        let mut server = Server::new_async().await;
        let login = login_mock(&mut server).expect(1).create_async().await;
        let broken = server
            .mock("GET", "/v1/driver/profile/user")
            .with_status(502)
            .create_async()
            .await;
        let _status = mock_no_active_session(&mut server).await;
        let _chargers = mock_chargers(&mut server, &[]).await;

        let coordinator = Coordinator::new(client_for(&server), credentials(), None);

        // The token issued in this tick must reach the host even though the
        // tick failed
        match coordinator.refresh().await {
            RefreshOutcome::Failed { token_renewed, .. } => assert!(token_renewed),
            other => panic!("unexpected outcome: {:?}", other),
        }

        broken.remove_async().await;
        let _profile = mock_profile(&mut server, "2.00").await;

        assert!(matches!(
            coordinator.refresh().await,
            RefreshOutcome::Updated { token_renewed: false }
        ));
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_public_station_session_is_published() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let _profile = mock_profile(&mut server, "12.50").await;
        // The session runs on CHARGER_ID, which is not one of the home chargers
        let _session = mock_active_session(&mut server, 7.2).await;
        let _chargers = mock_chargers(&mut server, &[1]).await;

        let coordinator = Coordinator::new(client_for(&server), credentials(), None);
        coordinator.first_refresh().await.unwrap();

        let data = coordinator.latest().data.expect("data published");
        let session = data.active_session.as_ref().expect("active session kept");
        assert_eq!(session.device_id, CHARGER_ID);
        assert_eq!(session.power_kw, Some(7.2));
        assert!(data.chargers[&1].session.is_none());
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let mut server = Server::new_async().await;
        let _login = mock_login(&mut server).await;
        let profile = profile_mock(&mut server, "5.00").expect(1).create_async().await;
        let _status = mock_no_active_session(&mut server).await;
        let _chargers = mock_chargers(&mut server, &[]).await;

        let coordinator = Coordinator::new(client_for(&server), credentials(), None);
        let (first, second) = tokio::join!(coordinator.refresh(), coordinator.refresh());

        assert!(matches!(first, RefreshOutcome::Updated { .. }));
        assert!(matches!(second, RefreshOutcome::Skipped));
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_credentials_forces_login() {
        let server = Server::new_async().await;
        let coordinator = Coordinator::new(
            client_for(&server),
            credentials(),
            Some(SessionToken::new(SESSION_ID, USER_ID)),
        );
        assert!(coordinator.session_token().await.is_some());

        coordinator
            .update_credentials(Credentials::new("user@example.com", "new-pw"))
            .await;
        assert!(coordinator.session_token().await.is_none());
    }
}
