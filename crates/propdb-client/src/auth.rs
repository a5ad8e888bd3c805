//! Route guards for authenticated and admin-only views.
//!
//! The session is always passed in explicitly. A guard re-evaluates only
//! when the session it sees differs from the previous one, so calling it on
//! every render neither repeats redirects nor costs anything.

use propdb_core::User;

use crate::stabilize::Memo;

/// Identity-provider state as seen by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    /// The provider is still resolving; `user` is not yet meaningful.
    pub is_loading: bool,
}

impl SessionState {
    #[must_use]
    pub fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_loading: false,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.is_loading && self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        !self.is_loading && self.user.as_ref().is_some_and(User::is_admin)
    }
}

/// Performs client-side navigation. Supplied by the routing layer.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session still resolving; render a placeholder.
    Pending,
    Allowed,
    Redirect(String),
}

/// Where blocked visitors are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRoutes {
    pub login: String,
    pub home: String,
}

impl Default for GateRoutes {
    fn default() -> Self {
        Self {
            login: "/login".to_owned(),
            home: "/".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Authenticated,
    Admin,
}

fn evaluate(
    session: &SessionState,
    requirement: Requirement,
    routes: &GateRoutes,
) -> GateDecision {
    if session.is_loading {
        return GateDecision::Pending;
    }
    if !session.is_authenticated() {
        return GateDecision::Redirect(routes.login.clone());
    }
    match requirement {
        Requirement::Authenticated => GateDecision::Allowed,
        Requirement::Admin if session.is_admin() => GateDecision::Allowed,
        Requirement::Admin => GateDecision::Redirect(routes.home.clone()),
    }
}

/// Guards one view. Create one gate per guarded view.
pub struct AuthGate<N> {
    navigator: N,
    routes: GateRoutes,
    memo: Memo<(Requirement, SessionState), GateDecision>,
}

impl<N: Navigator> AuthGate<N> {
    pub fn new(navigator: N) -> Self {
        Self::with_routes(navigator, GateRoutes::default())
    }

    pub fn with_routes(navigator: N, routes: GateRoutes) -> Self {
        Self {
            navigator,
            routes,
            memo: Memo::new(),
        }
    }

    /// Allow any signed-in user; send everyone else to the login path.
    pub fn require_auth(&mut self, session: &SessionState) -> GateDecision {
        self.check(Requirement::Authenticated, session)
    }

    /// Allow admins only. Signed-in non-admins go home, signed-out visitors
    /// go to login. Never redirects while the session is loading.
    pub fn require_admin(&mut self, session: &SessionState) -> GateDecision {
        self.check(Requirement::Admin, session)
    }

    fn check(&mut self, requirement: Requirement, session: &SessionState) -> GateDecision {
        let navigator = &self.navigator;
        let routes = &self.routes;
        self.memo
            .get_or_compute((requirement, session.clone()), |(requirement, session)| {
                let decision = evaluate(session, *requirement, routes);
                if let GateDecision::Redirect(path) = &decision {
                    tracing::debug!(path = %path, "auth gate redirecting");
                    navigator.navigate(path);
                }
                decision
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use propdb_core::Role;

    use super::*;

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<String>>,
    }

    impl RecordingNavigator {
        fn visits(&self) -> Vec<String> {
            self.visits.lock().unwrap().clone()
        }
    }

    impl Navigator for &RecordingNavigator {
        fn navigate(&self, path: &str) {
            self.visits.lock().unwrap().push(path.to_owned());
        }
    }

    fn user(role: Role) -> User {
        User {
            id: "u-1".to_owned(),
            email: Some("pat@example.com".to_owned()),
            role,
        }
    }

    #[test]
    fn require_admin_never_redirects_while_loading() {
        let nav = RecordingNavigator::default();
        let mut gate = AuthGate::new(&nav);

        for _ in 0..3 {
            assert_eq!(gate.require_admin(&SessionState::loading()), GateDecision::Pending);
        }
        // A loading flag wins even if a stale user is still attached.
        let stale = SessionState {
            user: Some(user(Role::User)),
            is_loading: true,
        };
        assert_eq!(gate.require_admin(&stale), GateDecision::Pending);
        assert!(nav.visits().is_empty());
    }

    #[test]
    fn require_admin_sends_non_admin_home_once() {
        let nav = RecordingNavigator::default();
        let mut gate = AuthGate::new(&nav);
        let session = SessionState::signed_in(user(Role::User));

        assert_eq!(
            gate.require_admin(&session),
            GateDecision::Redirect("/".to_owned())
        );
        assert_eq!(
            gate.require_admin(&session),
            GateDecision::Redirect("/".to_owned())
        );
        assert_eq!(nav.visits(), ["/"]);
    }

    #[test]
    fn require_admin_allows_admin_after_loading() {
        let nav = RecordingNavigator::default();
        let mut gate = AuthGate::new(&nav);

        gate.require_admin(&SessionState::loading());
        assert_eq!(
            gate.require_admin(&SessionState::signed_in(user(Role::Admin))),
            GateDecision::Allowed
        );
        assert!(nav.visits().is_empty());
    }

    #[test]
    fn require_auth_redirects_signed_out_to_login() {
        let nav = RecordingNavigator::default();
        let mut gate = AuthGate::with_routes(
            &nav,
            GateRoutes {
                login: "/sign-in".to_owned(),
                home: "/".to_owned(),
            },
        );

        assert_eq!(
            gate.require_auth(&SessionState::signed_out()),
            GateDecision::Redirect("/sign-in".to_owned())
        );
        assert_eq!(
            gate.require_auth(&SessionState::signed_in(user(Role::User))),
            GateDecision::Allowed
        );
        assert_eq!(nav.visits(), ["/sign-in"]);
    }

    #[test]
    fn session_change_triggers_fresh_redirect() {
        let nav = RecordingNavigator::default();
        let mut gate = AuthGate::new(&nav);

        gate.require_admin(&SessionState::signed_out());
        gate.require_admin(&SessionState::signed_in(user(Role::Admin)));
        gate.require_admin(&SessionState::signed_out());
        assert_eq!(nav.visits(), ["/login", "/login"]);
    }

    #[test]
    fn derived_flags_follow_session() {
        let admin = SessionState::signed_in(user(Role::Admin));
        assert!(admin.is_authenticated());
        assert!(admin.is_admin());

        let member = SessionState::signed_in(user(Role::User));
        assert!(member.is_authenticated());
        assert!(!member.is_admin());

        assert!(!SessionState::loading().is_authenticated());
        assert!(SessionState::loading().is_loading());
    }
}
