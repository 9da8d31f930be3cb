/**
 * DASHBOARD SESSIONS - one live MIB view per dashboard client
 *
 * ROLE:
 * A session is what a dashboard tab talks to. It owns one MIB tree for the
 * selected agent, the rolling chart window and a background refresh task.
 * Sessions are never shared: two tabs on the same agent hold two trees.
 *
 * HOW IT WORKS:
 * - `create` builds a fresh tree from the MIB definition and spawns the
 *   refresh task; the first tick fires immediately, then every
 *   `refresh_interval_secs`.
 * - Each tick spawns its polls of the dashboard OIDs and returns to the
 *   timer at once, so a slow agent never delays the next tick. Results go
 *   through the staleness guard of `MibSession`: only the most recent
 *   request per OID, for the current agent and epoch, reaches the tree.
 * - `switch_agent` cancels the session token, rebuilds the tree and starts
 *   a new refresh task; late answers from the old agent are discarded.
 * - Locks are never held across a gateway call.
 *
 * LIFETIME:
 * Every accessor marks the session as used. A session left alone longer
 * than `session_idle_secs` is closed and removed by its own refresh task,
 * so clients that vanish without `DELETE /sessions/{id}` do not leak.
 */

use crate::health::HealthTracker;
use crate::history::ChartHistory;
use crate::models::{ChartPoint, DashboardMetrics, SessionView};
use crate::state::{new_state, Shared};
use futures::future::join_all;
use mibscope_agent_sim::EnterpriseObject;
use mibscope_core::{
    AgentAddress, ApplyOutcome, MetricGateway, MibSession, MibTree, Oid, ScalarValue,
    SessionToken,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// OIDs polled on every refresh tick.
pub const DASHBOARD_OBJECTS: [EnterpriseObject; 5] = [
    EnterpriseObject::CpuUsage,
    EnterpriseObject::MemoryUsage,
    EnterpriseObject::AvgLatency,
    EnterpriseObject::TotalErrors,
    EnterpriseObject::LogLevel,
];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),
}

pub struct DashboardSession {
    session: MibSession,
    history: ChartHistory,
    last_access: Instant,
}

type SessionEntry = Shared<DashboardSession>;

#[derive(Clone)]
pub struct SessionManager {
    sessions: Shared<HashMap<Uuid, SessionEntry>>,
    gateway: Arc<dyn MetricGateway>,
    definition: MibTree,
    refresh_interval: Duration,
    chart_window: usize,
    idle_ttl: Duration,
    health: HealthTracker,
}

impl SessionManager {
    pub fn new(
        gateway: Arc<dyn MetricGateway>,
        definition: MibTree,
        refresh_interval: Duration,
        chart_window: usize,
        idle_ttl: Duration,
        health: HealthTracker,
    ) -> Self {
        Self {
            sessions: new_state(HashMap::new()),
            gateway,
            definition,
            refresh_interval,
            chart_window,
            idle_ttl,
            health,
        }
    }

    /// Open a session on `agent` and start its refresh task; the first
    /// tick fires immediately.
    pub fn create(&self, agent: AgentAddress) -> Uuid {
        let id = Uuid::new_v4();
        let session = MibSession::new(agent.clone(), self.definition.clone());
        let token = session.token();
        let entry = new_state(DashboardSession {
            session,
            history: ChartHistory::new(self.chart_window),
            last_access: Instant::now(),
        });
        self.sessions.lock().insert(id, entry.clone());
        self.spawn_refresh(id, entry, token);
        info!(%id, %agent, "session opened");
        id
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Look a session up and mark it as used.
    fn entry(&self, id: Uuid) -> Result<SessionEntry, SessionError> {
        let entry = self
            .sessions
            .lock()
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))?;
        entry.lock().last_access = Instant::now();
        Ok(entry)
    }

    pub fn view(&self, id: Uuid) -> Result<SessionView, SessionError> {
        let entry = self.entry(id)?;
        let s = entry.lock();
        Ok(SessionView {
            id,
            agent: s.session.agent().clone(),
            epoch: s.session.epoch(),
        })
    }

    /// The session's tree, filtered by `search`.
    pub fn tree(&self, id: Uuid, search: &str) -> Result<MibTree, SessionError> {
        Ok(self.entry(id)?.lock().session.filtered(search))
    }

    pub fn toggle(&self, id: Uuid, oid: &Oid) -> Result<(), SessionError> {
        self.entry(id)?.lock().session.toggle_expanded(oid);
        Ok(())
    }

    /// Fetch one OID for the session. Returns the outcome and the value the
    /// tree holds for that OID afterwards.
    pub async fn fetch(
        &self,
        id: Uuid,
        oid: Oid,
    ) -> Result<(ApplyOutcome, Option<ScalarValue>), SessionError> {
        let entry = self.entry(id)?;
        Ok(fetch_into(&entry, self.gateway.as_ref(), &self.health, oid).await)
    }

    /// Run one refresh tick now.
    pub async fn refresh(&self, id: Uuid) -> Result<(), SessionError> {
        let entry = self.entry(id)?;
        refresh_once(entry, Arc::clone(&self.gateway), self.health.clone()).await;
        Ok(())
    }

    /// Drop the current view and rebuild it for `agent`.
    pub fn switch_agent(&self, id: Uuid, agent: AgentAddress) -> Result<(), SessionError> {
        let entry = self.entry(id)?;
        let token = {
            let mut s = entry.lock();
            s.history.clear();
            s.session.switch_agent(agent.clone())
        };
        info!(%id, %agent, "session switched agent");
        self.spawn_refresh(id, entry, token);
        Ok(())
    }

    pub fn metrics(&self, id: Uuid) -> Result<DashboardMetrics, SessionError> {
        let entry = self.entry(id)?;
        let s = entry.lock();
        let tree = s.session.tree();
        let value = |object: EnterpriseObject| {
            tree.get(&object.oid()).and_then(|n| n.value().cloned())
        };
        Ok(DashboardMetrics {
            cpu_usage: value(EnterpriseObject::CpuUsage),
            memory_usage: value(EnterpriseObject::MemoryUsage),
            latency: value(EnterpriseObject::AvgLatency),
            total_errors: value(EnterpriseObject::TotalErrors),
            log_level: value(EnterpriseObject::LogLevel),
        })
    }

    pub fn charts(&self, id: Uuid) -> Result<Vec<ChartPoint>, SessionError> {
        Ok(self.entry(id)?.lock().history.points())
    }

    /// Tear the session down; its refresh task stops at the next tick and
    /// in-flight results are discarded.
    pub fn close(&self, id: Uuid) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .lock()
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;
        entry.lock().session.close();
        info!(%id, "session closed");
        Ok(())
    }

    fn spawn_refresh(&self, id: Uuid, entry: SessionEntry, token: SessionToken) {
        let sessions = Arc::clone(&self.sessions);
        let gateway = Arc::clone(&self.gateway);
        let health = self.health.clone();
        let period = self.refresh_interval;
        let idle_ttl = self.idle_ttl;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if token.is_cancelled() {
                    break;
                }
                let idle = entry.lock().last_access.elapsed();
                if idle >= idle_ttl {
                    expire(&sessions, id, &entry);
                    info!(%id, idle_secs = idle.as_secs(), "idle session expired");
                    break;
                }
                tokio::spawn(refresh_once(entry.clone(), Arc::clone(&gateway), health.clone()));
            }
            debug!(%id, "refresh task stopped");
        });
    }
}

/// Remove `entry` from the map (unless it was already replaced) and close it.
fn expire(sessions: &Shared<HashMap<Uuid, SessionEntry>>, id: Uuid, entry: &SessionEntry) {
    {
        let mut map = sessions.lock();
        if map.get(&id).is_some_and(|current| Arc::ptr_eq(current, entry)) {
            map.remove(&id);
        }
    }
    entry.lock().session.close();
}

async fn fetch_into(
    entry: &SessionEntry,
    gateway: &dyn MetricGateway,
    health: &HealthTracker,
    oid: Oid,
) -> (ApplyOutcome, Option<ScalarValue>) {
    let ticket = entry.lock().session.begin_fetch(oid);
    let result = gateway.fetch(&ticket.agent, &ticket.oid).await;

    let mut s = entry.lock();
    let outcome = s.session.complete_fetch(&ticket, result);
    health.record(&outcome);
    if let ApplyOutcome::Failed(err) = &outcome {
        warn!(agent = %ticket.agent, oid = %ticket.oid, error = %err, "fetch failed");
    }
    let value = s
        .session
        .tree()
        .get(&ticket.oid)
        .and_then(|n| n.value().cloned());
    (outcome, value)
}

async fn refresh_once(entry: SessionEntry, gateway: Arc<dyn MetricGateway>, health: HealthTracker) {
    let epoch = entry.lock().session.epoch();
    join_all(
        DASHBOARD_OBJECTS
            .iter()
            .map(|object| fetch_into(&entry, gateway.as_ref(), &health, object.oid())),
    )
    .await;

    let mut s = entry.lock();
    if s.session.is_closed() || s.session.epoch() != epoch {
        return;
    }
    if let Some(point) = chart_point(s.session.tree(), OffsetDateTime::now_utc()) {
        s.history.push(point);
    }
}

fn chart_point(tree: &MibTree, now: OffsetDateTime) -> Option<ChartPoint> {
    let read = |object: EnterpriseObject| {
        tree.get(&object.oid())
            .and_then(|n| n.value())
            .and_then(ScalarValue::as_f64)
    };
    Some(ChartPoint {
        time: now
            .format(format_description!("[hour]:[minute]"))
            .unwrap_or_default(),
        cpu_usage: read(EnterpriseObject::CpuUsage)?,
        latency: read(EnterpriseObject::AvgLatency)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mibscope_core::{enterprise_tree, GatewayError};
    use mibscope_devkit::fixtures::{dashboard_gateway, oid};
    use mibscope_devkit::{GatewayCall, ScriptedGateway};

    const AUTH: &str = "192.168.1.10";
    const DB: &str = "192.168.1.11";
    const CPU: &str = "1.3.6.1.4.1.9999.1.3.0";

    fn manager(gateway: &ScriptedGateway, refresh: Duration) -> SessionManager {
        manager_with_ttl(gateway, refresh, Duration::from_secs(1800))
    }

    fn manager_with_ttl(gateway: &ScriptedGateway, refresh: Duration, ttl: Duration) -> SessionManager {
        SessionManager::new(
            Arc::new(gateway.clone()),
            enterprise_tree().unwrap(),
            refresh,
            30,
            ttl,
            HealthTracker::new(),
        )
    }

    fn fetches_for(calls: &[GatewayCall], address: &str) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, GatewayCall::Fetch { agent, .. } if agent.as_str() == address))
            .count()
    }

    fn cpu_value(manager: &SessionManager, id: Uuid) -> Option<ScalarValue> {
        manager.metrics(id).unwrap().cpu_usage
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_fills_dashboard() {
        let gateway = dashboard_gateway();
        let manager = manager(&gateway, Duration::from_secs(30));
        let id = manager.create(AgentAddress::from(AUTH));

        tokio::time::sleep(Duration::from_secs(1)).await;

        let metrics = manager.metrics(id).unwrap();
        assert_eq!(metrics.cpu_usage, Some(ScalarValue::Float(45.2)));
        assert_eq!(metrics.memory_usage, Some(ScalarValue::Integer(2048)));
        assert_eq!(metrics.log_level, Some(ScalarValue::from("INFO")));
        assert_eq!(manager.charts(id).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh() {
        let gateway = dashboard_gateway();
        let manager = manager(&gateway, Duration::from_secs(30));
        let id = manager.create(AgentAddress::from(AUTH));

        tokio::time::sleep(Duration::from_secs(61)).await;

        // ticks at 0s, 30s and 60s
        assert_eq!(gateway.fetch_count(), 3 * DASHBOARD_OBJECTS.len());
        assert_eq!(manager.charts(id).unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_agent_does_not_delay_ticks() {
        let gateway = dashboard_gateway();
        for _ in 0..3 {
            gateway.respond_after(AUTH, CPU, Duration::from_secs(45), Ok(ScalarValue::Float(50.0)));
        }
        let manager = manager(&gateway, Duration::from_secs(30));
        let id = manager.create(AgentAddress::from(AUTH));

        tokio::time::sleep(Duration::from_secs(61)).await;

        // ticks at 30s and 60s went out while the CPU polls were pending
        assert_eq!(gateway.fetch_count(), 3 * DASHBOARD_OBJECTS.len());
        let cpu_polls = gateway
            .calls()
            .iter()
            .filter(|c| matches!(c, GatewayCall::Fetch { oid: o, .. } if *o == oid(CPU)))
            .count();
        assert_eq!(cpu_polls, 3);
        assert_eq!(manager.metrics(id).unwrap().memory_usage, Some(ScalarValue::Integer(2048)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_adds_chart_point() {
        let gateway = dashboard_gateway();
        let manager = manager(&gateway, Duration::from_secs(3600));
        let id = manager.create(AgentAddress::from(AUTH));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(manager.charts(id).unwrap().len(), 1);

        manager.refresh(id).await.unwrap();

        assert_eq!(gateway.fetch_count(), 2 * DASHBOARD_OBJECTS.len());
        assert_eq!(manager.charts(id).unwrap().len(), 2);
        let missing = Uuid::new_v4();
        assert_eq!(manager.refresh(missing).await, Err(SessionError::NotFound(missing)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_completion_keeps_latest_request() {
        let gateway = ScriptedGateway::new();
        let manager = manager(&gateway, Duration::from_secs(3600));
        let id = manager.create(AgentAddress::from(AUTH));
        // initial tick
        tokio::time::sleep(Duration::from_millis(1)).await;
        gateway.respond_after(AUTH, CPU, Duration::from_millis(500), Ok(ScalarValue::Float(30.0)));
        gateway.respond_after(AUTH, CPU, Duration::from_millis(50), Ok(ScalarValue::Float(60.5)));

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.fetch(id, oid(CPU)).await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        let second = manager.fetch(id, oid(CPU)).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(second.0, ApplyOutcome::Applied);
        assert_eq!(first.0, ApplyOutcome::Stale);
        assert_eq!(cpu_value(&manager, id), Some(ScalarValue::Float(60.5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_surfaced() {
        let gateway = ScriptedGateway::new();
        let manager = manager(&gateway, Duration::from_secs(3600));
        let id = manager.create(AgentAddress::from(AUTH));
        tokio::time::sleep(Duration::from_millis(1)).await;
        let before = manager.tree(id, "").unwrap();

        let (outcome, value) = manager.fetch(id, oid("9.9.9.9")).await.unwrap();
        assert!(matches!(outcome, ApplyOutcome::Failed(GatewayError::NotFound { .. })));
        assert_eq!(value, None);
        assert_eq!(manager.tree(id, "").unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_agent_switch_discards_late_results() {
        let gateway = ScriptedGateway::new();
        let manager = manager(&gateway, Duration::from_secs(3600));
        let id = manager.create(AgentAddress::from(AUTH));
        tokio::time::sleep(Duration::from_millis(1)).await;
        gateway.respond_after(AUTH, CPU, Duration::from_millis(500), Ok(ScalarValue::Float(99.0)));

        let late = tokio::spawn({
            let manager = manager.clone();
            async move { manager.fetch(id, oid(CPU)).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.switch_agent(id, AgentAddress::from(DB)).unwrap();
        let switched_at = gateway.calls().len();

        let (outcome, _) = late.await.unwrap().unwrap();
        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(fetches_for(&gateway.calls()[switched_at..], AUTH), 0);
        assert_eq!(manager.view(id).unwrap().agent, AgentAddress::from(DB));
        assert_eq!(manager.view(id).unwrap().epoch, 1);
        assert_ne!(cpu_value(&manager, id), Some(ScalarValue::Float(99.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_stops_polling_old_agent() {
        let gateway = dashboard_gateway();
        let manager = manager(&gateway, Duration::from_secs(30));
        let id = manager.create(AgentAddress::from(AUTH));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetches_for(&gateway.calls(), AUTH), DASHBOARD_OBJECTS.len());

        manager.switch_agent(id, AgentAddress::from(DB)).unwrap();
        let switched_at = gateway.calls().len();
        tokio::time::sleep(Duration::from_secs(119)).await;

        // new task ticks at 1s, 31s, 61s and 91s
        let after = &gateway.calls()[switched_at..];
        assert_eq!(fetches_for(after, AUTH), 0);
        assert_eq!(fetches_for(after, DB), 4 * DASHBOARD_OBJECTS.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let gateway = dashboard_gateway();
        let manager = manager_with_ttl(&gateway, Duration::from_secs(30), Duration::from_secs(120));
        let ids: Vec<Uuid> = (0..100).map(|_| manager.create(AgentAddress::from(AUTH))).collect();

        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;

        assert_eq!(manager.len(), 0);
        // ticks at 0s, 30s, 60s and 90s; the 120s tick reaps
        assert_eq!(gateway.fetch_count(), 100 * 4 * DASHBOARD_OBJECTS.len());
        assert_eq!(manager.metrics(ids[0]), Err(SessionError::NotFound(ids[0])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_used_session_outlives_idle_one() {
        let gateway = dashboard_gateway();
        let manager = manager_with_ttl(&gateway, Duration::from_secs(30), Duration::from_secs(120));
        let used = manager.create(AgentAddress::from(AUTH));
        let idle = manager.create(AgentAddress::from(DB));

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(60)).await;
            manager.metrics(used).unwrap();
        }

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.view(used).unwrap().agent, AgentAddress::from(AUTH));
        assert_eq!(manager.view(idle), Err(SessionError::NotFound(idle)));
        assert!(gateway.fetch_count() > 20 * DASHBOARD_OBJECTS.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_refresh() {
        let gateway = dashboard_gateway();
        let manager = manager(&gateway, Duration::from_secs(30));
        let id = manager.create(AgentAddress::from(AUTH));
        tokio::time::sleep(Duration::from_secs(1)).await;
        let calls = gateway.fetch_count();

        manager.close(id).unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(gateway.fetch_count(), calls);
        assert_eq!(manager.len(), 0);
        assert_eq!(manager.metrics(id), Err(SessionError::NotFound(id)));
        assert_eq!(manager.close(id), Err(SessionError::NotFound(id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_and_toggle() {
        let gateway = dashboard_gateway();
        let manager = manager(&gateway, Duration::from_secs(3600));
        let id = manager.create(AgentAddress::from(AUTH));

        let system = oid("1.3.6.1.4.1.9999.1");
        manager.toggle(id, &system).unwrap();
        assert!(!manager.tree(id, "").unwrap().get(&system).unwrap().expanded());

        let filtered = manager.tree(id, "cpu").unwrap();
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_chart_point_needs_cpu_and_latency() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let tree = enterprise_tree().unwrap();
        assert!(chart_point(&tree, now).is_none());

        let tree = tree
            .set_value(&EnterpriseObject::CpuUsage.oid(), ScalarValue::Float(42.0))
            .set_value(&EnterpriseObject::AvgLatency.oid(), ScalarValue::Integer(7));
        let point = chart_point(&tree, now).unwrap();
        assert_eq!(point.time, "00:00");
        assert_eq!(point.cpu_usage, 42.0);
        assert_eq!(point.latency, 7.0);
    }
}
