use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::{claims::TokenPayload, utils::has_exam_access},
    models::domain::{SubscriptionInfo, User},
};

/// The authenticated identity and the entitlements derived from its token.
///
/// A session is either fully populated (user and token present) or fully
/// empty; it is only ever replaced as a whole.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<SecretString>,
    pub paid_exam_ids: Vec<String>,
    pub is_subscribed: bool,
    pub subscription_info: Option<SubscriptionInfo>,
    pub is_beta_tester: bool,
}

impl Session {
    pub fn from_payload(token: &str, payload: TokenPayload) -> Self {
        Self {
            user: Some(payload.user),
            token: Some(SecretString::from(token.to_string())),
            paid_exam_ids: payload.paid_exam_ids.into_vec(),
            is_subscribed: payload.is_subscribed,
            subscription_info: payload.subscription_info,
            is_beta_tester: payload.is_beta_tester,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.expose_secret())
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    pub fn has_access_to(&self, product_sku: &str) -> bool {
        has_exam_access(self, product_sku)
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.user == other.user
            && self.token() == other.token()
            && self.paid_exam_ids == other.paid_exam_ids
            && self.is_subscribed == other.is_subscribed
            && self.subscription_info == other.subscription_info
            && self.is_beta_tester == other.is_beta_tester
    }
}

/// Role an administrator is previewing the app as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MasqueradeMode {
    #[default]
    None,
    User,
    Visitor,
}

/// Target of `start_masquerade`; `None` is not a valid target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MasqueradeAs {
    User,
    Visitor,
}

impl From<MasqueradeAs> for MasqueradeMode {
    fn from(value: MasqueradeAs) -> Self {
        match value {
            MasqueradeAs::User => MasqueradeMode::User,
            MasqueradeAs::Visitor => MasqueradeMode::Visitor,
        }
    }
}

/// Everything the session manager guards behind one lock.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub session: Session,
    pub masquerade: MasqueradeMode,
    pub original_auth_state: Option<Session>,
    /// Bumped on every login and logout; background work compares against it
    /// to detect that the session it was started for is gone.
    pub generation: u64,
}

impl AuthState {
    pub fn is_effectively_admin(&self) -> bool {
        self.session.is_admin() && self.masquerade == MasqueradeMode::None
    }

    /// Enters masquerade. Returns false without touching state when the real
    /// user is not an admin or a masquerade is already active.
    pub fn start_masquerade(&mut self, target: MasqueradeAs) -> bool {
        if self.masquerade != MasqueradeMode::None || !self.session.is_admin() {
            return false;
        }

        let snapshot = match target {
            MasqueradeAs::Visitor => std::mem::take(&mut self.session),
            MasqueradeAs::User => self.session.clone(),
        };
        self.original_auth_state = Some(snapshot);
        self.masquerade = target.into();
        true
    }

    /// Leaves masquerade, restoring the snapshot verbatim.
    pub fn stop_masquerade(&mut self) -> bool {
        if self.masquerade == MasqueradeMode::None {
            return false;
        }
        let Some(snapshot) = self.original_auth_state.take() else {
            return false;
        };
        self.session = snapshot;
        self.masquerade = MasqueradeMode::None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::PaidExamIds;

    fn admin_state() -> AuthState {
        let payload = TokenPayload {
            user: User::test_admin("1"),
            paid_exam_ids: PaidExamIds(vec!["SKU1".into()]),
            is_subscribed: true,
            subscription_info: Some(SubscriptionInfo::default()),
            is_beta_tester: true,
            iat: None,
            exp: None,
        };
        AuthState {
            session: Session::from_payload("h.p.s", payload),
            ..AuthState::default()
        }
    }

    #[test]
    fn test_default_session_is_empty() {
        let session = Session::default();
        assert!(!session.is_authenticated());
        assert!(session.user_id().is_none());
        assert!(session.token().is_none());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_session_equality_compares_token_contents() {
        let a = admin_state().session;
        let mut b = a.clone();
        assert_eq!(a, b);
        b.token = Some(SecretString::from("other".to_string()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_masquerade_as_user_keeps_session() {
        let mut state = admin_state();
        let before = state.session.clone();

        assert!(state.start_masquerade(MasqueradeAs::User));
        assert_eq!(state.masquerade, MasqueradeMode::User);
        assert_eq!(state.session, before);
        assert!(!state.is_effectively_admin());
    }

    #[test]
    fn test_masquerade_as_visitor_round_trip_is_exact() {
        let mut state = admin_state();
        let before = state.session.clone();

        assert!(state.start_masquerade(MasqueradeAs::Visitor));
        assert_eq!(state.session, Session::default());
        assert_eq!(state.original_auth_state.as_ref(), Some(&before));

        assert!(state.stop_masquerade());
        assert_eq!(state.session, before);
        assert_eq!(state.masquerade, MasqueradeMode::None);
        assert!(state.original_auth_state.is_none());
        assert!(state.is_effectively_admin());
    }

    #[test]
    fn test_nested_masquerade_is_rejected() {
        let mut state = admin_state();
        assert!(state.start_masquerade(MasqueradeAs::User));
        let snapshot = state.clone();

        assert!(!state.start_masquerade(MasqueradeAs::User));
        assert!(!state.start_masquerade(MasqueradeAs::Visitor));
        assert_eq!(state, snapshot);
    }

    #[test]
    fn test_non_admin_cannot_masquerade() {
        let mut state = AuthState::default();
        state.session.user = Some(User::test_user("2"));
        state.session.token = Some(SecretString::from("t".to_string()));

        assert!(!state.start_masquerade(MasqueradeAs::Visitor));
        assert_eq!(state.masquerade, MasqueradeMode::None);
        assert!(!state.stop_masquerade());
    }
}
