//! Watchers as a pure function over snapshots.
//!
//! Each watcher declares the inputs it depends on. A watcher is re-evaluated
//! only when one of its inputs differs from the previous snapshot, and always
//! on the first snapshot. `react` never performs I/O; the coordinator applies
//! the returned [`Reaction`].

use crate::auth::wallet::{Chain, Connection};

/// What the watchers look at on every tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub connection: Connection,
    /// Wallet address of the current session.
    pub session: Option<String>,
    pub is_authenticating: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Watchers {
    pub auto_login: bool,
    pub auto_logout: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reaction {
    /// Force status to `Success`.
    pub reconcile: bool,
    pub login: bool,
    pub logout: bool,
}

impl Reaction {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.reconcile || self.login || self.logout)
    }
}

#[derive(PartialEq, Eq)]
struct LoginInputs<'a> {
    is_connected: bool,
    is_authenticating: bool,
    address: Option<&'a str>,
    chain: Option<&'a Chain>,
    connector: Option<&'a str>,
    session: Option<&'a str>,
}

impl<'a> LoginInputs<'a> {
    fn of(snapshot: &'a Snapshot) -> Self {
        Self {
            is_connected: snapshot.connection.is_connected(),
            is_authenticating: snapshot.is_authenticating,
            address: snapshot.connection.address.as_deref(),
            chain: snapshot.connection.chain.as_ref(),
            connector: snapshot.connection.connector.as_deref(),
            session: snapshot.session.as_deref(),
        }
    }
}

#[derive(PartialEq, Eq)]
struct LogoutInputs<'a> {
    is_disconnected: bool,
    is_reconnecting: bool,
    address: Option<&'a str>,
    session: Option<&'a str>,
}

impl<'a> LogoutInputs<'a> {
    fn of(snapshot: &'a Snapshot) -> Self {
        Self {
            is_disconnected: snapshot.connection.is_disconnected(),
            is_reconnecting: snapshot.connection.is_reconnecting(),
            address: snapshot.connection.address.as_deref(),
            session: snapshot.session.as_deref(),
        }
    }
}

#[derive(PartialEq, Eq)]
struct ReconcileInputs<'a> {
    address: Option<&'a str>,
    session: Option<&'a str>,
}

impl<'a> ReconcileInputs<'a> {
    fn of(snapshot: &'a Snapshot) -> Self {
        Self {
            address: snapshot.connection.address.as_deref(),
            session: snapshot.session.as_deref(),
        }
    }
}

fn changed<'a, T: PartialEq + 'a>(
    previous: Option<&'a Snapshot>,
    current: &'a Snapshot,
    inputs: impl Fn(&'a Snapshot) -> T,
) -> bool {
    previous.map_or(true, |previous| inputs(previous) != inputs(current))
}

/// True when the session belongs to a wallet other than the connected one.
#[must_use]
pub fn is_stale(snapshot: &Snapshot) -> bool {
    snapshot
        .session
        .as_deref()
        .is_some_and(|session| snapshot.connection.address.as_deref() != Some(session))
}

/// True when the session belongs to the connected wallet.
#[must_use]
pub fn is_authenticated(snapshot: &Snapshot) -> bool {
    snapshot
        .session
        .as_deref()
        .is_some_and(|session| snapshot.connection.address.as_deref() == Some(session))
}

/// Decide what the watchers want to do after moving from `previous` to
/// `current`.
///
/// Logout wins over login in the same tick: a stale session has to be cleared
/// before a new login may start.
#[must_use]
pub fn react(previous: Option<&Snapshot>, current: &Snapshot, watchers: Watchers) -> Reaction {
    let reconcile = changed(previous, current, ReconcileInputs::of) && is_authenticated(current);

    let logout = watchers.auto_logout
        && changed(previous, current, LogoutInputs::of)
        && !current.connection.is_reconnecting()
        && (current.connection.is_disconnected() || is_stale(current));

    let login = !logout
        && watchers.auto_login
        && changed(previous, current, LoginInputs::of)
        && current.connection.is_connected()
        && !current.is_authenticating;

    Reaction {
        reconcile,
        login,
        logout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::wallet::ConnectionStatus;

    const BOTH: Watchers = Watchers {
        auto_login: true,
        auto_logout: true,
    };

    fn connected(address: &str) -> Snapshot {
        Snapshot {
            connection: Connection {
                status: ConnectionStatus::Connected,
                address: Some(address.to_string()),
                chain: Some(Chain::new(1, "homestead")),
                connector: Some("injected".to_string()),
            },
            session: None,
            is_authenticating: false,
        }
    }

    fn with_session(mut snapshot: Snapshot, address: &str) -> Snapshot {
        snapshot.session = Some(address.to_string());
        snapshot
    }

    #[test]
    fn first_snapshot_fires_auto_login_on_connected_wallet() {
        let reaction = react(None, &connected("0xABC"), BOTH);
        assert!(reaction.login);
        assert!(!reaction.logout);
        assert!(!reaction.reconcile);
    }

    #[test]
    fn auto_login_disabled_does_nothing() {
        let reaction = react(None, &connected("0xABC"), Watchers::default());
        assert!(reaction.is_empty());
    }

    #[test]
    fn unchanged_inputs_do_not_refire() {
        let snapshot = connected("0xABC");
        assert!(react(Some(&snapshot), &snapshot, BOTH).is_empty());
    }

    #[test]
    fn authenticating_blocks_auto_login() {
        let mut snapshot = connected("0xABC");
        snapshot.is_authenticating = true;
        assert!(!react(None, &snapshot, BOTH).login);
    }

    #[test]
    fn finishing_authentication_refires_auto_login() {
        let mut before = connected("0xABC");
        before.is_authenticating = true;
        let after = connected("0xABC");
        assert!(react(Some(&before), &after, BOTH).login);
    }

    #[test]
    fn matching_session_reconciles_to_success() {
        let previous = connected("0xABC");
        let current = with_session(connected("0xABC"), "0xABC");
        let reaction = react(Some(&previous), &current, BOTH);
        assert!(reaction.reconcile);
        assert!(!reaction.logout);
    }

    #[test]
    fn reconcile_does_not_depend_on_watchers() {
        let current = with_session(connected("0xABC"), "0xABC");
        assert!(react(None, &current, Watchers::default()).reconcile);
    }

    #[test]
    fn account_switch_fires_logout_and_suppresses_login() {
        let previous = with_session(connected("0xABC"), "0xABC");
        let current = with_session(connected("0xDEF"), "0xABC");
        let reaction = react(Some(&previous), &current, BOTH);
        assert!(reaction.logout);
        assert!(!reaction.login);
        assert!(!reaction.reconcile);
    }

    #[test]
    fn account_switch_without_auto_logout_keeps_session() {
        let previous = with_session(connected("0xABC"), "0xABC");
        let current = with_session(connected("0xDEF"), "0xABC");
        let reaction = react(
            Some(&previous),
            &current,
            Watchers {
                auto_login: false,
                auto_logout: false,
            },
        );
        assert!(reaction.is_empty());
    }

    #[test]
    fn disconnect_fires_logout() {
        let previous = with_session(connected("0xABC"), "0xABC");
        let current = with_session(Snapshot::default(), "0xABC");
        assert!(react(Some(&previous), &current, BOTH).logout);
    }

    #[test]
    fn reconnecting_suppresses_logout() {
        let previous = with_session(connected("0xABC"), "0xABC");
        let mut current = with_session(Snapshot::default(), "0xABC");
        current.connection.status = ConnectionStatus::Reconnecting;
        let reaction = react(Some(&previous), &current, BOTH);
        assert!(!reaction.logout);
        assert!(!reaction.login);
    }

    #[test]
    fn reconnect_finishing_on_same_account_keeps_session() {
        let mut previous = with_session(connected("0xABC"), "0xABC");
        previous.connection.status = ConnectionStatus::Reconnecting;
        let current = with_session(connected("0xABC"), "0xABC");
        let reaction = react(Some(&previous), &current, BOTH);
        assert!(!reaction.logout);
        assert!(reaction.login);
        assert!(!reaction.reconcile);
    }

    #[test]
    fn stale_and_authenticated_are_exclusive() {
        let fresh = with_session(connected("0xABC"), "0xABC");
        let stale = with_session(connected("0xDEF"), "0xABC");
        let none = connected("0xABC");
        assert!(is_authenticated(&fresh) && !is_stale(&fresh));
        assert!(is_stale(&stale) && !is_authenticated(&stale));
        assert!(!is_stale(&none) && !is_authenticated(&none));
    }
}
