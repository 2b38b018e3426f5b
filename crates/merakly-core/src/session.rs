// ── Session controller ──
//
// Owns the one `SelectionState` of a session and walks it through the
// funnel: credential → organization → networks → events. Every mutation
// goes through the watch channel's `send_if_modified`, so a snapshot is
// always internally consistent and observers see each transition.
// Network loads capture the organization generation and event loads the
// selection generation when they start; each commits only if its token is
// still current.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use merakly_api::{GatewayClient, TransportConfig};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::fanout::{Generation, ordered_fan_out};
use crate::model::{EventRow, Network, NetworkDetail, Organization};

// ── Funnel state ─────────────────────────────────────────────────────

/// Position in the selection funnel, derived from a [`SelectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FunnelState {
    Idle,
    CredentialPending,
    CredentialAccepted,
    OrganizationChosen,
    NetworksChosen,
    EventsLoaded,
}

impl FunnelState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CredentialPending => "credential pending",
            Self::CredentialAccepted => "credential accepted",
            Self::OrganizationChosen => "organization chosen",
            Self::NetworksChosen => "networks chosen",
            Self::EventsLoaded => "events loaded",
        }
    }
}

impl fmt::Display for FunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Selection state ──────────────────────────────────────────────────

/// Where the session is, structurally.
#[derive(Debug, Clone, Default)]
pub enum Phase {
    #[default]
    Idle,
    CredentialPending,
    Accepted(AcceptedSession),
}

/// Everything known once the backend has accepted the API key.
#[derive(Debug, Clone, Default)]
pub struct AcceptedSession {
    pub organizations: Vec<Organization>,
    pub scope: Option<OrganizationScope>,
}

/// The chosen organization and what hangs off it.
#[derive(Debug, Clone)]
pub struct OrganizationScope {
    pub organization_id: String,
    pub networks: Vec<Network>,
    /// Selected network ids, in selection order.
    pub selected: IndexSet<String>,
    /// Concatenated events of the selected networks, once loaded.
    pub events: Option<Arc<[EventRow]>>,
}

impl OrganizationScope {
    fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            networks: Vec::new(),
            selected: IndexSet::new(),
            events: None,
        }
    }

    fn contains_network(&self, id: &str) -> bool {
        self.networks.iter().any(|n| n.id == id)
    }
}

/// A panel of the presentation, each with its own error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Credential,
    Organizations,
    Networks,
    Events,
}

/// Last failure recorded per panel. A successful retry clears only its
/// own slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelErrors {
    pub credential: Option<CoreError>,
    pub organizations: Option<CoreError>,
    pub networks: Option<CoreError>,
    pub events: Option<CoreError>,
}

impl PanelErrors {
    pub fn get(&self, panel: Panel) -> Option<&CoreError> {
        match panel {
            Panel::Credential => self.credential.as_ref(),
            Panel::Organizations => self.organizations.as_ref(),
            Panel::Networks => self.networks.as_ref(),
            Panel::Events => self.events.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Recorded errors, in panel order.
    pub fn iter(&self) -> impl Iterator<Item = (Panel, &CoreError)> {
        [
            Panel::Credential,
            Panel::Organizations,
            Panel::Networks,
            Panel::Events,
        ]
        .into_iter()
        .filter_map(|panel| self.get(panel).map(|e| (panel, e)))
    }

    fn slot_mut(&mut self, panel: Panel) -> &mut Option<CoreError> {
        match panel {
            Panel::Credential => &mut self.credential,
            Panel::Organizations => &mut self.organizations,
            Panel::Networks => &mut self.networks,
            Panel::Events => &mut self.events,
        }
    }
}

/// The complete session value.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    pub phase: Phase,
    pub errors: PanelErrors,
}

impl SelectionState {
    pub fn funnel(&self) -> FunnelState {
        match &self.phase {
            Phase::Idle => FunnelState::Idle,
            Phase::CredentialPending => FunnelState::CredentialPending,
            Phase::Accepted(accepted) => match &accepted.scope {
                None => FunnelState::CredentialAccepted,
                Some(scope) if scope.events.is_some() => FunnelState::EventsLoaded,
                Some(scope) if scope.selected.is_empty() => FunnelState::OrganizationChosen,
                Some(_) => FunnelState::NetworksChosen,
            },
        }
    }

    pub fn accepted(&self) -> Option<&AcceptedSession> {
        match &self.phase {
            Phase::Accepted(accepted) => Some(accepted),
            _ => None,
        }
    }

    pub fn scope(&self) -> Option<&OrganizationScope> {
        self.accepted().and_then(|a| a.scope.as_ref())
    }

    pub fn organizations(&self) -> &[Organization] {
        self.accepted().map_or(&[], |a| a.organizations.as_slice())
    }

    pub fn networks(&self) -> &[Network] {
        self.scope().map_or(&[], |s| s.networks.as_slice())
    }

    pub fn events(&self) -> Option<&Arc<[EventRow]>> {
        self.scope().and_then(|s| s.events.as_ref())
    }

    fn accepted_mut(&mut self, operation: &'static str) -> Result<&mut AcceptedSession, CoreError> {
        let state = self.funnel();
        match &mut self.phase {
            Phase::Accepted(accepted) => Ok(accepted),
            _ => Err(invalid_state(operation, state)),
        }
    }

    fn scope_mut(&mut self, operation: &'static str) -> Result<&mut OrganizationScope, CoreError> {
        let state = self.funnel();
        self.accepted_mut(operation)?
            .scope
            .as_mut()
            .ok_or_else(|| invalid_state(operation, state))
    }
}

fn invalid_state(operation: &'static str, state: FunnelState) -> CoreError {
    CoreError::InvalidState {
        operation,
        state: state.to_string(),
    }
}

/// What a load did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// New data was committed.
    Loaded { count: usize },
    /// The selection became empty; events were cleared without a fetch.
    Cleared,
    /// A newer selection started while this load was in flight; its
    /// result was discarded.
    Superseded,
}

// ── Session ──────────────────────────────────────────────────────────

/// The session controller.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Operations may run
/// concurrently; a load started for an outdated selection never
/// overwrites a newer one.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    gateway: GatewayClient,
    state: watch::Sender<SelectionState>,
    /// Bumped per credential submission.
    epoch: Generation,
    /// Bumped per credential submission or organization choice.
    organization: Generation,
    /// Bumped per organization or network selection change.
    selection: Generation,
}

impl Session {
    /// Build a session talking HTTP to `config.backend_url`.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig::default().with_timeout(config.timeout);
        let gateway = GatewayClient::connect(config.backend_url.clone(), &transport)?;
        Ok(Self::with_gateway(config, gateway))
    }

    /// Build a session over an existing gateway client.
    pub fn with_gateway(config: SessionConfig, gateway: GatewayClient) -> Self {
        let (state, _) = watch::channel(SelectionState::default());
        Self {
            inner: Arc::new(SessionInner {
                config,
                gateway,
                state,
                epoch: Generation::default(),
                organization: Generation::default(),
                selection: Generation::default(),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.inner.gateway
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Current state snapshot. Event rows are shared, not copied.
    pub fn state(&self) -> SelectionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.inner.state.subscribe()
    }

    pub fn funnel(&self) -> FunnelState {
        self.inner.state.borrow().funnel()
    }

    pub fn errors(&self) -> PanelErrors {
        self.inner.state.borrow().errors.clone()
    }

    // ── Credential ───────────────────────────────────────────────────

    /// Submit the API key from the session config.
    pub async fn authenticate(&self) -> Result<LoadOutcome, CoreError> {
        match self.inner.config.api_key.clone() {
            Some(key) => self.submit_credential(&key).await,
            None => {
                let err = CoreError::CredentialRejected {
                    reason: "no API key configured".into(),
                };
                self.record(Panel::Credential, &err);
                Err(err)
            }
        }
    }

    /// Submit an API key, then load organizations once accepted.
    ///
    /// An empty key is rejected without contacting the backend and the
    /// state stays where it was. A rejected key returns the session to
    /// `Idle`. An organizations failure leaves the credential accepted.
    pub async fn submit_credential(&self, key: &SecretString) -> Result<LoadOutcome, CoreError> {
        if key.expose_secret().trim().is_empty() {
            let err = CoreError::CredentialRejected {
                reason: "API key is empty".into(),
            };
            self.record(Panel::Credential, &err);
            return Err(err);
        }

        let epoch = self.inner.epoch.bump();
        self.inner.organization.bump();
        self.inner.selection.bump();
        self.inner.state.send_modify(|state| {
            state.phase = Phase::CredentialPending;
            state.errors = PanelErrors::default();
        });
        debug!("credential pending");

        if let Err(e) = self.inner.gateway.submit_credential(key).await {
            let err = CoreError::from(e);
            warn!(error = %err, "credential rejected");
            self.inner.state.send_if_modified(|state| {
                if !self.inner.epoch.is_current(epoch) {
                    return false;
                }
                state.phase = Phase::Idle;
                state.errors.credential = Some(err.clone());
                true
            });
            return Err(err);
        }

        let accepted = self.inner.state.send_if_modified(|state| {
            if !self.inner.epoch.is_current(epoch) {
                return false;
            }
            state.phase = Phase::Accepted(AcceptedSession::default());
            true
        });
        if !accepted {
            return Ok(LoadOutcome::Superseded);
        }
        info!("credential accepted");

        self.load_organizations(epoch).await
    }

    /// Retry the organizations fetch for the accepted credential.
    pub async fn reload_organizations(&self) -> Result<LoadOutcome, CoreError> {
        self.require_accepted("reload organizations")?;
        self.load_organizations(self.inner.epoch.current()).await
    }

    async fn load_organizations(&self, epoch: u64) -> Result<LoadOutcome, CoreError> {
        let result = self.inner.gateway.list_organizations().await;
        if !self.inner.epoch.is_current(epoch) {
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(organizations) => {
                let count = organizations.len();
                self.inner.state.send_if_modified(|state| {
                    let Phase::Accepted(accepted) = &mut state.phase else {
                        return false;
                    };
                    accepted.organizations = organizations;
                    state.errors.organizations = None;
                    true
                });
                info!(count, "organizations loaded");
                Ok(LoadOutcome::Loaded { count })
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.record(Panel::Organizations, &err);
                Err(err)
            }
        }
    }

    // ── Organization ─────────────────────────────────────────────────

    /// Choose (or re-choose) an organization and load its networks.
    ///
    /// The network selection and loaded events are cleared before the
    /// fetch starts. A fetch failure keeps the organization chosen with an
    /// empty network list.
    pub async fn choose_organization(&self, organization_id: &str) -> Result<LoadOutcome, CoreError> {
        let token = self.update(|state| {
            let accepted = state.accepted_mut("choose an organization")?;
            if !accepted.organizations.iter().any(|o| o.id == organization_id) {
                return Err(CoreError::OrganizationNotFound {
                    identifier: organization_id.to_owned(),
                });
            }
            accepted.scope = Some(OrganizationScope::new(organization_id));
            state.errors.networks = None;
            state.errors.events = None;
            self.inner.selection.bump();
            Ok(self.inner.organization.bump())
        })?;
        debug!(organization_id, "organization chosen");

        self.load_networks(token, organization_id).await
    }

    /// Retry the networks fetch of the chosen organization.
    ///
    /// Behaves like re-choosing it: selection and events are cleared.
    pub async fn reload_networks(&self) -> Result<LoadOutcome, CoreError> {
        let organization_id = {
            let state = self.inner.state.borrow();
            match state.scope() {
                Some(scope) => scope.organization_id.clone(),
                None => return Err(invalid_state("reload networks", state.funnel())),
            }
        };
        self.choose_organization(&organization_id).await
    }

    async fn load_networks(&self, token: u64, organization_id: &str) -> Result<LoadOutcome, CoreError> {
        let result = self.inner.gateway.list_networks(organization_id).await;

        match result {
            Ok(networks) => {
                let count = networks.len();
                let committed = self.inner.state.send_if_modified(|state| {
                    if !self.inner.organization.is_current(token) {
                        return false;
                    }
                    let Ok(scope) = state.scope_mut("load networks") else {
                        return false;
                    };
                    scope.networks = networks;
                    state.errors.networks = None;
                    true
                });
                if !committed {
                    debug!(organization_id, "networks load superseded");
                    return Ok(LoadOutcome::Superseded);
                }
                info!(organization_id, count, "networks loaded");
                Ok(LoadOutcome::Loaded { count })
            }
            Err(e) => {
                let err = CoreError::from(e);
                if !self.record_if_current(&self.inner.organization, token, Panel::Networks, &err) {
                    return Ok(LoadOutcome::Superseded);
                }
                Err(err)
            }
        }
    }

    // ── Network selection ────────────────────────────────────────────

    /// Add a network to the selection, or remove it if already selected.
    pub async fn toggle_network(&self, network_id: &str) -> Result<LoadOutcome, CoreError> {
        self.reselect("toggle a network", |scope| {
            if !scope.contains_network(network_id) {
                return Err(network_not_found(network_id));
            }
            if !scope.selected.shift_remove(network_id) {
                scope.selected.insert(network_id.to_owned());
            }
            Ok(())
        })
        .await
    }

    /// Replace the selection with `ids`, in the given order.
    pub async fn select_networks<I, S>(&self, ids: I) -> Result<LoadOutcome, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        self.reselect("select networks", move |scope| {
            if let Some(missing) = ids.iter().find(|id| !scope.contains_network(id)) {
                return Err(network_not_found(missing));
            }
            scope.selected = ids.into_iter().collect();
            Ok(())
        })
        .await
    }

    /// Select every network of the current list, in list order. A no-op on
    /// an empty list.
    pub async fn select_all(&self) -> Result<LoadOutcome, CoreError> {
        self.reselect("select all networks", |scope| {
            scope.selected = scope.networks.iter().map(|n| n.id.clone()).collect();
            Ok(())
        })
        .await
    }

    pub async fn select_none(&self) -> Result<LoadOutcome, CoreError> {
        self.reselect("clear the network selection", |scope| {
            scope.selected.clear();
            Ok(())
        })
        .await
    }

    /// Select-all checkbox: clear when everything is selected, otherwise
    /// select everything.
    pub async fn toggle_all(&self) -> Result<LoadOutcome, CoreError> {
        self.reselect("toggle all networks", |scope| {
            let all_selected = !scope.networks.is_empty()
                && scope.networks.iter().all(|n| scope.selected.contains(&n.id));
            if all_selected {
                scope.selected.clear();
            } else {
                scope.selected = scope.networks.iter().map(|n| n.id.clone()).collect();
            }
            Ok(())
        })
        .await
    }

    /// Retry the events fetch for the current selection.
    pub async fn reload_events(&self) -> Result<LoadOutcome, CoreError> {
        self.reselect("reload events", |_| Ok(())).await
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Apply a selection change, then recompute events from scratch.
    async fn reselect<F>(&self, operation: &'static str, change: F) -> Result<LoadOutcome, CoreError>
    where
        F: FnOnce(&mut OrganizationScope) -> Result<(), CoreError>,
    {
        let (token, selected) = self.update(|state| {
            let scope = state.scope_mut(operation)?;
            change(scope)?;
            let selected: Vec<String> = scope.selected.iter().cloned().collect();
            if selected.is_empty() {
                scope.events = None;
                state.errors.events = None;
            }
            Ok((self.inner.selection.bump(), selected))
        })?;
        debug!(operation, selected = selected.len(), "network selection changed");

        if selected.is_empty() {
            return Ok(LoadOutcome::Cleared);
        }
        self.load_events(token, &selected).await
    }

    async fn load_events(&self, token: u64, selected: &[String]) -> Result<LoadOutcome, CoreError> {
        let gateway = &self.inner.gateway;
        let result = ordered_fan_out(
            selected.iter().cloned(),
            self.inner.config.max_in_flight(),
            |id: String| {
                let gateway = gateway.clone();
                async move { gateway.list_network_events(&id).await }
            },
        )
        .await;

        match result {
            Ok(batches) => {
                let rows: Arc<[EventRow]> = selected
                    .iter()
                    .zip(batches)
                    .flat_map(|(id, batch)| EventRow::from_batch(id, batch))
                    .collect();
                let count = rows.len();
                let committed = self.inner.state.send_if_modified(|state| {
                    if !self.inner.selection.is_current(token) {
                        return false;
                    }
                    let Ok(scope) = state.scope_mut("load events") else {
                        return false;
                    };
                    scope.events = Some(rows);
                    state.errors.events = None;
                    true
                });
                if !committed {
                    debug!(networks = selected.len(), "events load superseded");
                    return Ok(LoadOutcome::Superseded);
                }
                info!(networks = selected.len(), count, "events loaded");
                Ok(LoadOutcome::Loaded { count })
            }
            Err(e) => {
                let err = CoreError::from(e);
                if !self.record_if_current(&self.inner.selection, token, Panel::Events, &err) {
                    return Ok(LoadOutcome::Superseded);
                }
                Err(err)
            }
        }
    }

    // ── Details ──────────────────────────────────────────────────────

    /// Client details for the given networks. Does not touch the funnel.
    pub async fn network_details(&self, network_ids: &[String]) -> Result<Vec<NetworkDetail>, CoreError> {
        self.require_accepted("fetch network details")?;
        Ok(self.inner.gateway.list_network_details(network_ids).await?)
    }

    // ── State helpers ────────────────────────────────────────────────

    fn require_accepted(&self, operation: &'static str) -> Result<(), CoreError> {
        let state = self.inner.state.borrow();
        match state.accepted() {
            Some(_) => Ok(()),
            None => Err(invalid_state(operation, state.funnel())),
        }
    }

    /// Run a fallible mutation; observers are notified only on success.
    fn update<R>(
        &self,
        f: impl FnOnce(&mut SelectionState) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let mut out = None;
        self.inner.state.send_if_modified(|state| {
            let result = f(state);
            let modified = result.is_ok();
            out = Some(result);
            modified
        });
        out.unwrap_or_else(|| Err(invalid_state("update", self.funnel())))
    }

    fn record(&self, panel: Panel, err: &CoreError) {
        warn!(?panel, error = %err, "panel error");
        self.inner.state.send_modify(|state| {
            *state.errors.slot_mut(panel) = Some(err.clone());
        });
    }

    fn record_if_current(
        &self,
        generation: &Generation,
        token: u64,
        panel: Panel,
        err: &CoreError,
    ) -> bool {
        let recorded = self.inner.state.send_if_modified(|state| {
            if !generation.is_current(token) {
                return false;
            }
            *state.errors.slot_mut(panel) = Some(err.clone());
            true
        });
        if recorded {
            warn!(?panel, error = %err, "panel error");
        }
        recorded
    }
}

fn network_not_found(id: &str) -> CoreError {
    CoreError::NetworkNotFound {
        identifier: id.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use merakly_api::{Bridge, BridgeError, Resource};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    // ── Scripted bridge ─────────────────────────────────────────────

    #[derive(Clone)]
    struct Route {
        delay: Duration,
        response: Result<Value, BridgeError>,
    }

    /// In-memory bridge answering from a route table keyed by
    /// `"METHOD /path"`. Unknown routes answer 404.
    #[derive(Default)]
    struct ScriptedBridge {
        routes: Mutex<HashMap<String, Route>>,
        calls: Mutex<Vec<String>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedBridge {
        fn on(&self, key: &str, value: Value) -> &Self {
            self.on_delayed(key, Duration::ZERO, value)
        }

        fn on_delayed(&self, key: &str, delay: Duration, value: Value) -> &Self {
            self.route(key, delay, Ok(value))
        }

        fn fail(&self, key: &str, status: u16) -> &Self {
            self.route(
                key,
                Duration::ZERO,
                Err(BridgeError::Status {
                    status,
                    message: "scripted failure".into(),
                }),
            )
        }

        fn route(&self, key: &str, delay: Duration, response: Result<Value, BridgeError>) -> &Self {
            self.routes
                .lock()
                .unwrap()
                .insert(key.to_owned(), Route { delay, response });
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_to(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        async fn respond(&self, key: String) -> Result<Value, BridgeError> {
            self.calls.lock().unwrap().push(key.clone());
            let route = self.routes.lock().unwrap().get(&key).cloned();

            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Some(route) = &route {
                tokio::time::sleep(route.delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            route.map_or_else(
                || {
                    Err(BridgeError::Status {
                        status: 404,
                        message: format!("no route for {key}"),
                    })
                },
                |r| r.response,
            )
        }
    }

    #[async_trait]
    impl Bridge for ScriptedBridge {
        async fn get(&self, path: &str, _params: &[(&str, &str)]) -> Result<Value, BridgeError> {
            self.respond(format!("GET {path}")).await
        }

        async fn post(&self, path: &str, _body: &Value) -> Result<Value, BridgeError> {
            self.respond(format!("POST {path}")).await
        }
    }

    // ── Fixtures ────────────────────────────────────────────────────

    fn key(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    fn session_with(bridge: &Arc<ScriptedBridge>, config: SessionConfig) -> Session {
        let dyn_bridge: Arc<dyn Bridge> = bridge.clone();
        Session::with_gateway(config, GatewayClient::new(dyn_bridge))
    }

    fn scripted() -> Arc<ScriptedBridge> {
        let bridge = Arc::new(ScriptedBridge::default());
        bridge
            .on("POST /set_api_key", json!({ "message": "API Key set successfully" }))
            .on(
                "GET /organizations",
                json!([{ "id": "1", "name": "A" }, { "id": "2", "name": "B" }]),
            )
            .on(
                "GET /networks/1",
                json!([{ "id": "n1", "name": "HQ" }, { "id": "n2", "name": "Branch" }]),
            )
            .on("GET /networks/2", json!([{ "id": "m1", "name": "Lab" }]))
            .on("GET /networks/n1/events", json!([{ "occurred_at": "t1", "type": "a" }]))
            .on("GET /networks/n2/events", json!([{ "occurred_at": "t2", "type": "b" }]))
            .on("GET /networks/m1/events", json!([{ "occurred_at": "t3", "type": "c" }]));
        bridge
    }

    async fn organization_chosen(bridge: &Arc<ScriptedBridge>) -> Session {
        let session = session_with(bridge, SessionConfig::default());
        assert_ok!(session.submit_credential(&key("k")).await);
        assert_ok!(session.choose_organization("1").await);
        session
    }

    fn timestamps(session: &Session) -> Vec<String> {
        session
            .state()
            .events()
            .map(|rows| {
                rows.iter()
                    .filter_map(|r| r.record.occurred_at().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ── Credential ──────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_credential_never_calls_backend() {
        let bridge = scripted();
        let session = session_with(&bridge, SessionConfig::default());

        let err = assert_err!(session.submit_credential(&key("  ")).await);
        assert!(matches!(err, CoreError::CredentialRejected { .. }));
        assert_eq!(session.funnel(), FunnelState::Idle);
        assert!(session.errors().credential.is_some());
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_configured_key_is_rejected() {
        let bridge = scripted();
        let session = session_with(&bridge, SessionConfig::default());
        let err = assert_err!(session.authenticate().await);
        assert!(matches!(err, CoreError::CredentialRejected { .. }));
        assert!(bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn rejected_credential_returns_to_idle() {
        let bridge = scripted();
        bridge.fail("POST /set_api_key", 400);
        let session = session_with(&bridge, SessionConfig::default());

        let err = assert_err!(session.submit_credential(&key("bad")).await);
        assert!(matches!(err, CoreError::CredentialRejected { .. }));
        assert_eq!(session.funnel(), FunnelState::Idle);
        assert_eq!(bridge.calls_to("GET /organizations"), 0);
    }

    #[tokio::test]
    async fn accepted_credential_loads_organizations_once() {
        let bridge = scripted();
        let session = session_with(&bridge, SessionConfig::default().with_api_key(key("k")));

        let outcome = assert_ok!(session.authenticate().await);
        assert_eq!(outcome, LoadOutcome::Loaded { count: 2 });
        assert_eq!(session.funnel(), FunnelState::CredentialAccepted);
        assert_eq!(session.state().organizations().len(), 2);
        assert_eq!(bridge.calls_to("GET /organizations"), 1);
    }

    #[tokio::test]
    async fn organizations_failure_keeps_credential_accepted() {
        let bridge = scripted();
        bridge.fail("GET /organizations", 500);
        let session = session_with(&bridge, SessionConfig::default());

        let err = assert_err!(session.submit_credential(&key("k")).await);
        assert_eq!(err.resource(), Some(Resource::Organizations));
        assert_eq!(session.funnel(), FunnelState::CredentialAccepted);
        assert!(session.errors().organizations.is_some());

        bridge.on("GET /organizations", json!([{ "id": "1", "name": "A" }]));
        assert_ok!(session.reload_organizations().await);
        assert!(session.errors().is_empty());
        assert_eq!(session.state().organizations()[0].name, "A");
    }

    // ── Organization ────────────────────────────────────────────────

    #[tokio::test]
    async fn operations_before_prerequisites_are_invalid() {
        let bridge = scripted();
        let session = session_with(&bridge, SessionConfig::default());

        let err = assert_err!(session.choose_organization("1").await);
        assert!(matches!(err, CoreError::InvalidState { .. }));
        let err = assert_err!(session.toggle_network("n1").await);
        assert!(matches!(err, CoreError::InvalidState { .. }));

        assert_ok!(session.submit_credential(&key("k")).await);
        let err = assert_err!(session.select_all().await);
        assert!(matches!(err, CoreError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn unknown_organization_is_rejected() {
        let bridge = scripted();
        let session = session_with(&bridge, SessionConfig::default());
        assert_ok!(session.submit_credential(&key("k")).await);

        let err = assert_err!(session.choose_organization("99").await);
        assert_eq!(
            err,
            CoreError::OrganizationNotFound {
                identifier: "99".into()
            }
        );
        assert_eq!(session.funnel(), FunnelState::CredentialAccepted);
    }

    #[tokio::test]
    async fn networks_failure_keeps_organization_chosen() {
        let bridge = scripted();
        bridge.fail("GET /networks/1", 502);
        let session = session_with(&bridge, SessionConfig::default());
        assert_ok!(session.submit_credential(&key("k")).await);

        let err = assert_err!(session.choose_organization("1").await);
        assert_eq!(err.resource(), Some(Resource::Networks));
        let state = session.state();
        assert_eq!(state.funnel(), FunnelState::OrganizationChosen);
        assert!(state.networks().is_empty());
        assert!(state.errors.networks.is_some());

        bridge.on("GET /networks/1", json!([{ "id": "n1", "name": "HQ" }]));
        assert_eq!(
            assert_ok!(session.reload_networks().await),
            LoadOutcome::Loaded { count: 1 }
        );
        assert!(session.errors().networks.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn changing_organization_clears_selection_before_fetch() {
        let bridge = scripted();
        bridge.on_delayed(
            "GET /networks/2",
            Duration::from_millis(100),
            json!([{ "id": "m1", "name": "Lab" }]),
        );
        let session = organization_chosen(&bridge).await;
        assert_ok!(session.select_networks(["n1"]).await);
        assert_eq!(session.funnel(), FunnelState::EventsLoaded);

        let switcher = session.clone();
        let task = tokio::spawn(async move { switcher.choose_organization("2").await });
        tokio::time::sleep(Duration::from_millis(1)).await;

        let mid = session.state();
        let scope = mid.scope().expect("organization chosen");
        assert_eq!(scope.organization_id, "2");
        assert!(scope.selected.is_empty());
        assert!(scope.events.is_none());
        assert_eq!(mid.funnel(), FunnelState::OrganizationChosen);

        assert_ok!(task.await.unwrap());
        assert_eq!(session.state().networks()[0].id, "m1");
    }

    #[tokio::test(start_paused = true)]
    async fn selection_change_during_networks_load_keeps_networks() {
        let bridge = scripted();
        bridge.on_delayed(
            "GET /networks/1",
            Duration::from_millis(100),
            json!([{ "id": "n1", "name": "HQ" }, { "id": "n2", "name": "Branch" }]),
        );
        let session = session_with(&bridge, SessionConfig::default());
        assert_ok!(session.submit_credential(&key("k")).await);

        let chooser = session.clone();
        let task = tokio::spawn(async move { chooser.choose_organization("1").await });
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(assert_ok!(session.select_all().await), LoadOutcome::Cleared);

        let outcome = assert_ok!(task.await.unwrap());
        assert_eq!(outcome, LoadOutcome::Loaded { count: 2 });
        let state = session.state();
        assert_eq!(state.networks().len(), 2);
        assert!(state.errors.networks.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rechoosing_organization_supersedes_pending_networks_load() {
        let bridge = scripted();
        bridge.on_delayed(
            "GET /networks/1",
            Duration::from_millis(100),
            json!([{ "id": "n1", "name": "HQ" }]),
        );
        let session = session_with(&bridge, SessionConfig::default());
        assert_ok!(session.submit_credential(&key("k")).await);

        let slow = session.clone();
        let task = tokio::spawn(async move { slow.choose_organization("1").await });
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_ok!(session.choose_organization("2").await);
        assert_eq!(assert_ok!(task.await.unwrap()), LoadOutcome::Superseded);

        let state = session.state();
        assert_eq!(state.scope().unwrap().organization_id, "2");
        assert_eq!(state.networks()[0].id, "m1");
    }

    // ── Selection / events ──────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn events_follow_selection_order_not_completion_order() {
        let bridge = scripted();
        bridge
            .on_delayed(
                "GET /networks/n1/events",
                Duration::from_millis(50),
                json!([{ "occurred_at": "t1" }]),
            )
            .on_delayed(
                "GET /networks/n2/events",
                Duration::from_millis(10),
                json!([{ "occurred_at": "t2" }]),
            );
        let session = organization_chosen(&bridge).await;

        let outcome = assert_ok!(session.select_networks(["n1", "n2"]).await);
        assert_eq!(outcome, LoadOutcome::Loaded { count: 2 });
        assert_eq!(timestamps(&session), vec!["t1", "t2"]);

        let state = session.state();
        let ids: Vec<String> = state
            .events()
            .map(|rows| rows.iter().map(|r| r.id.to_string()).collect())
            .unwrap_or_default();
        assert_eq!(ids, vec!["n1#0", "n2#0"]);
    }

    #[tokio::test]
    async fn toggle_appends_and_removes() {
        let bridge = scripted();
        let session = organization_chosen(&bridge).await;

        assert_ok!(session.toggle_network("n2").await);
        assert_ok!(session.toggle_network("n1").await);
        assert_eq!(timestamps(&session), vec!["t2", "t1"]);

        assert_ok!(session.toggle_network("n2").await);
        assert_eq!(timestamps(&session), vec!["t1"]);

        assert_eq!(
            assert_ok!(session.toggle_network("n1").await),
            LoadOutcome::Cleared
        );
        assert_eq!(session.funnel(), FunnelState::OrganizationChosen);
        assert!(session.state().events().is_none());
    }

    #[tokio::test]
    async fn unknown_network_is_rejected_without_fetch() {
        let bridge = scripted();
        let session = organization_chosen(&bridge).await;

        let err = assert_err!(session.select_networks(["n1", "zz"]).await);
        assert_eq!(
            err,
            CoreError::NetworkNotFound {
                identifier: "zz".into()
            }
        );
        assert!(session.state().scope().expect("scope").selected.is_empty());
        assert_eq!(bridge.calls_to("GET /networks/n"), 0);
    }

    #[tokio::test]
    async fn select_all_on_empty_list_is_a_noop() {
        let bridge = scripted();
        bridge.on("GET /networks/1", json!([]));
        let session = organization_chosen(&bridge).await;

        assert_eq!(assert_ok!(session.select_all().await), LoadOutcome::Cleared);
        assert!(session.state().scope().expect("scope").selected.is_empty());
        assert_eq!(session.funnel(), FunnelState::OrganizationChosen);

        assert_eq!(assert_ok!(session.toggle_all().await), LoadOutcome::Cleared);
        assert!(session.state().scope().expect("scope").selected.is_empty());
    }

    #[tokio::test]
    async fn toggle_all_selects_then_clears() {
        let bridge = scripted();
        let session = organization_chosen(&bridge).await;

        assert_ok!(session.toggle_network("n2").await);
        assert_ok!(session.toggle_all().await);
        let selected: Vec<String> = session
            .state()
            .scope()
            .expect("scope")
            .selected
            .iter()
            .cloned()
            .collect();
        assert_eq!(selected, vec!["n1", "n2"]);
        assert_eq!(timestamps(&session), vec!["t1", "t2"]);

        assert_eq!(assert_ok!(session.toggle_all().await), LoadOutcome::Cleared);
        assert_eq!(session.funnel(), FunnelState::OrganizationChosen);
    }

    #[tokio::test]
    async fn single_failure_fails_batch_and_keeps_prior_events() {
        let bridge = scripted();
        bridge.fail("GET /networks/n2/events", 500);
        let session = organization_chosen(&bridge).await;
        assert_ok!(session.select_networks(["n1"]).await);

        let err = assert_err!(session.select_networks(["n1", "n2"]).await);
        assert_eq!(err.resource(), Some(Resource::Events));
        assert_eq!(timestamps(&session), vec!["t1"]);
        assert!(session.errors().events.is_some());
        assert_eq!(session.funnel(), FunnelState::EventsLoaded);

        bridge.on("GET /networks/n2/events", json!([{ "occurred_at": "t2" }]));
        assert_ok!(session.reload_events().await);
        assert_eq!(timestamps(&session), vec!["t1", "t2"]);
        assert!(session.errors().events.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_load_never_overwrites_newer_selection() {
        let bridge = scripted();
        bridge
            .on_delayed(
                "GET /networks/n1/events",
                Duration::from_millis(100),
                json!([{ "occurred_at": "t1" }]),
            )
            .on_delayed(
                "GET /networks/n2/events",
                Duration::from_millis(10),
                json!([{ "occurred_at": "t2" }]),
            );
        let session = organization_chosen(&bridge).await;

        let slow = session.clone();
        let first = tokio::spawn(async move { slow.select_networks(["n1"]).await });
        tokio::time::sleep(Duration::from_millis(1)).await;

        let second = assert_ok!(session.select_networks(["n2"]).await);
        assert_eq!(second, LoadOutcome::Loaded { count: 1 });

        let first = assert_ok!(first.await.unwrap());
        assert_eq!(first, LoadOutcome::Superseded);
        assert_eq!(timestamps(&session), vec!["t2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fan_out_respects_max_in_flight() {
        let bridge = scripted();
        let networks: Vec<Value> = (0..6)
            .map(|i| json!({ "id": format!("x{i}"), "name": format!("X{i}") }))
            .collect();
        bridge.on("GET /networks/1", Value::Array(networks));
        for i in 0..6 {
            bridge.on_delayed(
                &format!("GET /networks/x{i}/events"),
                Duration::from_millis(10),
                json!([{ "occurred_at": format!("t{i}") }]),
            );
        }

        let session = session_with(&bridge, SessionConfig::default().with_max_in_flight(2));
        assert_ok!(session.submit_credential(&key("k")).await);
        assert_ok!(session.choose_organization("1").await);
        bridge.peak.store(0, Ordering::SeqCst);

        assert_eq!(
            assert_ok!(session.select_all().await),
            LoadOutcome::Loaded { count: 6 }
        );
        assert_eq!(bridge.peak.load(Ordering::SeqCst), 2);
        assert_eq!(timestamps(&session), vec!["t0", "t1", "t2", "t3", "t4", "t5"]);
    }

    #[tokio::test]
    async fn observers_see_transitions() {
        let bridge = scripted();
        let session = session_with(&bridge, SessionConfig::default());
        let mut rx = session.subscribe();

        assert_ok!(session.submit_credential(&key("k")).await);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().funnel(), FunnelState::CredentialAccepted);

        // A rejected lookup notifies nobody.
        let _ = session.choose_organization("nope").await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn details_pass_through_the_gateway() {
        let bridge = scripted();
        bridge.on(
            "POST /networks/details",
            json!([{ "network_id": "n1", "wap_name": "Lobby AP" }]),
        );
        let session = organization_chosen(&bridge).await;

        let details = assert_ok!(session.network_details(&["n1".to_owned()]).await);
        assert_eq!(details[0].wap_name.as_deref(), Some("Lobby AP"));
        assert_eq!(session.funnel(), FunnelState::OrganizationChosen);
    }
}
