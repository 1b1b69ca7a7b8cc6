use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::{
    sync::{watch, Mutex, RwLock},
    task::JoinHandle,
};

use crate::{
    auth::{
        session::{AuthState, MasqueradeAs, MasqueradeMode, Session},
        token::decode_token_payload,
    },
    errors::{AppError, AppResult},
    models::domain::User,
    repositories::{LocalStore, SessionRepository},
    services::{
        api_client::ResultsApi,
        notifier::{Notifier, Toast, ToastAction},
        results_sync::{failure_toast, ResultsSync},
    },
};

/// Owns the authenticated session, its durable copy, and the admin
/// masquerade overlay.
pub struct SessionManager {
    state: Arc<RwLock<AuthState>>,
    repository: SessionRepository,
    results_sync: ResultsSync,
    notifier: Arc<dyn Notifier>,
    scope_logout_cleanup: bool,
    changes: watch::Sender<Option<String>>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn LocalStore>,
        results_api: Arc<dyn ResultsApi>,
        notifier: Arc<dyn Notifier>,
        scope_logout_cleanup: bool,
    ) -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            state: Arc::new(RwLock::new(AuthState::default())),
            repository: SessionRepository::new(store.clone()),
            results_sync: ResultsSync::new(results_api, store),
            notifier,
            scope_logout_cleanup,
            changes,
            sync_task: Mutex::new(None),
        }
    }

    /// Loads the session persisted by a previous run. A partial or corrupt
    /// copy is wiped and the manager stays signed out.
    pub async fn restore(&self) -> AppResult<bool> {
        match self.repository.load() {
            Ok(Some(session)) => {
                let mut state = self.state.write().await;
                *state = AuthState {
                    session,
                    generation: state.generation + 1,
                    ..AuthState::default()
                };
                self.publish(&state);
                info!(
                    "Restored session for user {}",
                    state.session.user_id().unwrap_or_default()
                );
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => {
                warn!("Discarding unreadable persisted session: {}", err);
                self.repository.clear()?;
                Ok(false)
            }
        }
    }

    /// Replaces the session with the one carried by `token`.
    ///
    /// Results are synchronized in the background; the returned future does not
    /// wait for that. On failure the manager is fully logged out before the
    /// error is returned.
    pub async fn login_with_token(&self, token: &str, is_sync_only: bool) -> AppResult<Session> {
        match self.apply_token(token).await {
            Ok((session, generation)) => {
                self.spawn_results_sync(&session, generation, is_sync_only)
                    .await;
                Ok(session)
            }
            Err(err) => {
                warn!("Login rejected: {}", err);
                if let Err(logout_err) = self.logout().await {
                    warn!("Cleanup after rejected login failed: {}", logout_err);
                }
                Err(AppError::invalid_authentication(err))
            }
        }
    }

    async fn apply_token(&self, token: &str) -> AppResult<(Session, u64)> {
        let payload = decode_token_payload(token)?;
        if payload.is_expired_at(Utc::now()) {
            // The server decides; an expired token surfaces through the sync.
            warn!(
                "Token for user {} claims expiry at {:?}",
                payload.user.id,
                payload.expires_at()
            );
        }
        let session = Session::from_payload(token, payload);

        let generation = {
            let mut state = self.state.write().await;
            *state = AuthState {
                session: session.clone(),
                generation: state.generation + 1,
                ..AuthState::default()
            };
            self.publish(&state);
            state.generation
        };

        self.repository.save(&session)?;
        info!(
            "Logged in user {} ({} purchased exams)",
            session.user_id().unwrap_or_default(),
            session.paid_exam_ids.len()
        );
        Ok((session, generation))
    }

    async fn spawn_results_sync(&self, session: &Session, generation: u64, is_sync_only: bool) {
        let (Some(user), Some(token)) = (session.user.clone(), session.token().map(str::to_string))
        else {
            return;
        };
        let sync = self.results_sync.clone();
        let state = Arc::clone(&self.state);
        let notifier = Arc::clone(&self.notifier);

        let handle = tokio::spawn(async move {
            let outcome = sync.reconcile(&user, &token).await;

            if state.read().await.generation != generation {
                debug!(
                    "Dropping results sync outcome for superseded session of user {}",
                    user.id
                );
                return;
            }

            let outcome = match outcome {
                Ok(results) => sync.cache(&user, results),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(()) if is_sync_only => {
                    notifier.notify(Toast::success("Your purchases are up to date."))
                }
                Ok(()) => {}
                Err(err) => {
                    if let Some(toast) = failure_toast(&err, is_sync_only) {
                        notifier.notify(toast);
                    }
                }
            }
        });

        let mut slot = self.sync_task.lock().await;
        *slot = Some(handle);
    }

    /// Handle of the most recent background sync, if it has not been taken.
    pub async fn take_sync_task(&self) -> Option<JoinHandle<()>> {
        self.sync_task.lock().await.take()
    }

    /// Signs out, wiping the session, the masquerade snapshot, the persisted
    /// keys and cached exam timers/results. Safe to call repeatedly.
    pub async fn logout(&self) -> AppResult<()> {
        let (outgoing_user, already_empty) = {
            let mut state = self.state.write().await;
            let real_user = state
                .original_auth_state
                .as_ref()
                .unwrap_or(&state.session)
                .user_id()
                .map(str::to_string);

            let already_empty = state.session == Session::default()
                && state.masquerade == MasqueradeMode::None
                && state.original_auth_state.is_none();
            if !already_empty {
                *state = AuthState {
                    generation: state.generation + 1,
                    ..AuthState::default()
                };
                self.publish(&state);
            }
            (real_user, already_empty)
        };

        self.repository.clear()?;
        if already_empty {
            debug!("Logout with no active session; exam caches left alone");
            return Ok(());
        }
        match (self.scope_logout_cleanup, outgoing_user.as_deref()) {
            (false, _) => {
                self.repository.clear_exam_caches(None)?;
            }
            (true, Some(user_id)) => {
                self.repository.clear_exam_caches(Some(user_id))?;
            }
            (true, None) => {}
        }

        if let Some(user_id) = outgoing_user {
            info!("Logged out user {}", user_id);
        }
        Ok(())
    }

    /// Re-runs login with the current token as an explicit purchase re-sync.
    pub async fn resync_purchases(&self) -> AppResult<Session> {
        let token = {
            let state = self.state.read().await;
            state
                .original_auth_state
                .as_ref()
                .unwrap_or(&state.session)
                .token()
                .map(str::to_string)
        };
        let token = token.ok_or_else(|| AppError::NotFound("No active session".to_string()))?;
        self.login_with_token(&token, true).await
    }

    /// Lets an admin preview the app as a regular user or an anonymous
    /// visitor. Returns false, changing nothing, for non-admins or while a
    /// masquerade is already active.
    pub async fn start_masquerade(&self, target: MasqueradeAs) -> bool {
        let mut state = self.state.write().await;
        let started = state.start_masquerade(target);
        if started {
            info!("Masquerade started as {:?}", target);
            self.publish(&state);
        } else {
            debug!("Ignoring masquerade request as {:?}", target);
        }
        started
    }

    pub async fn stop_masquerade(&self) -> bool {
        let mut state = self.state.write().await;
        let stopped = state.stop_masquerade();
        if stopped {
            info!("Masquerade ended");
            self.publish(&state);
        }
        stopped
    }

    /// Renames the current user locally; the server copy is updated by the
    /// caller.
    pub async fn update_user_name(&self, name: &str) -> AppResult<()> {
        let session = {
            let mut state = self.state.write().await;
            let Some(user) = state.session.user.as_mut() else {
                return Ok(());
            };
            user.name = name.to_string();
            let user_id = user.id.clone();

            if let Some(snapshot_user) = state
                .original_auth_state
                .as_mut()
                .and_then(|s| s.user.as_mut())
                .filter(|u| u.id == user_id)
            {
                snapshot_user.name = name.to_string();
            }
            state
                .original_auth_state
                .as_ref()
                .unwrap_or(&state.session)
                .clone()
        };
        self.repository.save(&session)
    }

    /// Runs the action attached to a dismissed toast.
    pub async fn dismiss(&self, toast: &Toast) -> AppResult<()> {
        match toast.on_dismiss {
            Some(ToastAction::Logout) => self.logout().await,
            None => Ok(()),
        }
    }

    pub async fn session(&self) -> Session {
        self.state.read().await.session.clone()
    }

    pub async fn auth_state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.session.user.clone()
    }

    pub async fn masquerade_mode(&self) -> MasqueradeMode {
        self.state.read().await.masquerade
    }

    /// The only admin gate the rest of the app should consult.
    pub async fn is_effectively_admin(&self) -> bool {
        self.state.read().await.is_effectively_admin()
    }

    /// Effective user id, updated whenever it changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.changes.subscribe()
    }

    fn publish(&self, state: &AuthState) {
        let user_id = state.session.user_id().map(str::to_string);
        self.changes.send_if_modified(|current| {
            if *current == user_id {
                return false;
            }
            *current = user_id;
            true
        });
    }
}
