//! Process watchdog.
//!
//! Polls a health endpoint and restarts the managed child when it is
//! unhealthy or has exited. Restarts are rate limited by a cooldown
//! measured from the previous restart, so a burst of failed checks costs
//! at most one restart per cooldown window.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::{
    process::{Child, Command},
    time::{sleep, Instant},
};

use crate::error::{Result, SyncError};

#[allow(async_fn_in_trait)]
pub trait HealthProbe {
    async fn healthy(&self) -> bool;
}

/// Owns at most one child process.
#[allow(async_fn_in_trait)]
pub trait Supervisor {
    async fn start(&mut self) -> Result<()>;
    /// Kill the current child (if any) and spawn a replacement.
    async fn restart(&mut self) -> Result<()>;
    /// False once the child has exited or was never started.
    fn is_running(&mut self) -> bool;
}

#[derive(Deserialize)]
struct HealthBody {
    status: String,
}

/// `GET <url>` must answer 200 with `{"status": "ok"}`.
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

impl HealthProbe for HttpProbe {
    async fn healthy(&self) -> bool {
        let response = match self.client.get(&self.url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Health check failed");
                return false;
            }
        };
        if response.status() != StatusCode::OK {
            tracing::warn!(url = %self.url, status = %response.status(), "Health check failed");
            return false;
        }
        match response.json::<HealthBody>().await {
            Ok(body) if body.status == "ok" => true,
            Ok(body) => {
                tracing::warn!(url = %self.url, status = %body.status, "Unhealthy status reported");
                false
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Unreadable health response");
                false
            }
        }
    }
}

pub struct ChildSupervisor {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl ChildSupervisor {
    /// `command[0]` is the program, the rest its arguments.
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command.split_first().ok_or_else(|| SyncError::Watchdog {
            message: "no command to supervise".to_string(),
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            child: None,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn spawn(&mut self) -> Result<()> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .spawn()?;
        tracing::info!(program = %self.program, pid = child.id(), "Child started");
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Could not kill child");
            }
        }
    }
}

impl Supervisor for ChildSupervisor {
    async fn start(&mut self) -> Result<()> {
        self.stop().await;
        self.spawn()
    }

    async fn restart(&mut self) -> Result<()> {
        self.stop().await;
        self.spawn()
    }

    fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                tracing::warn!(%status, "Child exited");
                false
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Could not poll child");
                false
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Healthy,
    Restarted,
    /// Unhealthy, but the last restart is too recent
    CoolingDown,
}

pub struct Watchdog<P, S> {
    probe: P,
    supervisor: S,
    cooldown: Duration,
    last_restart: Option<Instant>,
    restarts: u32,
}

impl<P: HealthProbe, S: Supervisor> Watchdog<P, S> {
    pub fn new(probe: P, supervisor: S, cooldown: Duration) -> Self {
        Self {
            probe,
            supervisor,
            cooldown,
            last_restart: None,
            restarts: 0,
        }
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    /// Spawn the child. The cooldown counts from here, so a child that is
    /// still booting is not killed by the first failed check.
    pub async fn start(&mut self) -> Result<()> {
        self.supervisor.start().await?;
        self.last_restart = Some(Instant::now());
        Ok(())
    }

    /// One health check at `now`.
    ///
    /// A failed respawn still counts as a restart attempt for the cooldown,
    /// so a broken command is retried once per window rather than every tick.
    pub async fn tick(&mut self, now: Instant) -> Result<Tick> {
        if self.supervisor.is_running() && self.probe.healthy().await {
            return Ok(Tick::Healthy);
        }
        let cooled = self
            .last_restart
            .map_or(true, |at| now.saturating_duration_since(at) >= self.cooldown);
        if !cooled {
            tracing::debug!("Unhealthy, restart suppressed by cooldown");
            return Ok(Tick::CoolingDown);
        }

        self.last_restart = Some(now);
        self.supervisor.restart().await?;
        self.restarts += 1;
        tracing::warn!(restarts = self.restarts, "Child restarted");
        Ok(Tick::Restarted)
    }

    /// Start the child and check it every `interval` until Ctrl-C.
    ///
    /// Only the initial spawn can fail the run; later errors are logged and
    /// the loop keeps supervising.
    pub async fn run(&mut self, interval: Duration) -> Result<()> {
        self.start().await?;
        loop {
            tokio::select! {
                _ = sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!(restarts = self.restarts, "Interrupted, stopping watchdog");
                    return Ok(());
                }
            }
            if let Err(e) = self.tick(Instant::now()).await {
                tracing::error!(error = %e, "Restart failed, retrying after cooldown");
            }
        }
    }
}

pub async fn handle_watchdog(
    health_url: String,
    interval_secs: u64,
    cooldown_secs: u64,
    timeout_secs: u64,
    command: Vec<String>,
) -> Result<()> {
    let probe = HttpProbe::new(health_url, Duration::from_secs(timeout_secs.max(1)))?;
    let supervisor = ChildSupervisor::new(&command)?;
    let mut watchdog = Watchdog::new(probe, supervisor, Duration::from_secs(cooldown_secs));
    watchdog.run(Duration::from_secs(interval_secs.max(1))).await?;
    println!("✓ Watchdog stopped after {} restart(s)", watchdog.restarts());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays scripted results, then reports healthy.
    struct ScriptedProbe(Mutex<VecDeque<bool>>);

    impl ScriptedProbe {
        fn new(results: &[bool]) -> Self {
            Self(Mutex::new(results.iter().copied().collect()))
        }
    }

    impl HealthProbe for ScriptedProbe {
        async fn healthy(&self) -> bool {
            self.0.lock().unwrap().pop_front().unwrap_or(true)
        }
    }

    #[derive(Default)]
    struct CountingSupervisor {
        starts: u32,
        restarts: u32,
        running: bool,
    }

    impl Supervisor for CountingSupervisor {
        async fn start(&mut self) -> Result<()> {
            self.starts += 1;
            self.running = true;
            Ok(())
        }

        async fn restart(&mut self) -> Result<()> {
            self.restarts += 1;
            self.running = true;
            Ok(())
        }

        fn is_running(&mut self) -> bool {
            self.running
        }
    }

    /// Fails its first `restart`, then behaves.
    #[derive(Default)]
    struct FlakySupervisor {
        attempts: u32,
        running: bool,
    }

    impl Supervisor for FlakySupervisor {
        async fn start(&mut self) -> Result<()> {
            self.running = true;
            Ok(())
        }

        async fn restart(&mut self) -> Result<()> {
            self.attempts += 1;
            if self.attempts == 1 {
                self.running = false;
                return Err(SyncError::Watchdog {
                    message: "spawn failed".to_string(),
                });
            }
            self.running = true;
            Ok(())
        }

        fn is_running(&mut self) -> bool {
            self.running
        }
    }

    struct AlwaysDown;

    impl HealthProbe for AlwaysDown {
        async fn healthy(&self) -> bool {
            false
        }
    }

    fn watchdog(results: &[bool]) -> Watchdog<ScriptedProbe, CountingSupervisor> {
        let supervisor = CountingSupervisor {
            running: true,
            ..Default::default()
        };
        Watchdog::new(ScriptedProbe::new(results), supervisor, Duration::from_secs(120))
    }

    #[tokio::test]
    async fn test_three_failures_within_cooldown_restart_once() {
        let mut dog = watchdog(&[false, false, false]);
        let t0 = Instant::now();

        assert_eq!(dog.tick(t0).await.unwrap(), Tick::Restarted);
        assert_eq!(dog.tick(t0 + Duration::from_secs(15)).await.unwrap(), Tick::CoolingDown);
        assert_eq!(dog.tick(t0 + Duration::from_secs(30)).await.unwrap(), Tick::CoolingDown);

        assert_eq!(dog.restarts(), 1);
        assert_eq!(dog.supervisor().restarts, 1);
    }

    #[tokio::test]
    async fn test_restart_again_after_cooldown() {
        let mut dog = watchdog(&[false, false]);
        let t0 = Instant::now();

        dog.tick(t0).await.unwrap();
        let later = t0 + Duration::from_secs(121);
        assert_eq!(dog.tick(later).await.unwrap(), Tick::Restarted);
        assert_eq!(dog.restarts(), 2);
    }

    #[tokio::test]
    async fn test_healthy_child_is_left_alone() {
        let mut dog = watchdog(&[true, true]);
        let t0 = Instant::now();
        assert_eq!(dog.tick(t0).await.unwrap(), Tick::Healthy);
        assert_eq!(dog.tick(t0).await.unwrap(), Tick::Healthy);
        assert_eq!(dog.restarts(), 0);
    }

    #[tokio::test]
    async fn test_exited_child_is_restarted() {
        let mut dog = watchdog(&[]);
        dog.supervisor.running = false;
        assert_eq!(dog.tick(Instant::now()).await.unwrap(), Tick::Restarted);
        assert!(dog.supervisor.running);
    }

    #[tokio::test]
    async fn test_cooldown_counts_from_initial_start() {
        let mut dog = watchdog(&[false, false]);
        let t0 = Instant::now();
        dog.start().await.unwrap();

        assert_eq!(dog.tick(t0 + Duration::from_secs(1)).await.unwrap(), Tick::CoolingDown);
        assert_eq!(dog.supervisor().starts, 1);
        assert_eq!(dog.supervisor().restarts, 0);

        let later = Instant::now() + Duration::from_secs(121);
        assert_eq!(dog.tick(later).await.unwrap(), Tick::Restarted);
    }

    #[tokio::test]
    async fn test_failed_restart_is_retried_after_cooldown() {
        let cooldown = Duration::from_secs(120);
        let mut dog = Watchdog::new(AlwaysDown, FlakySupervisor::default(), cooldown);
        let t0 = Instant::now();

        assert!(dog.tick(t0).await.is_err());
        assert_eq!(dog.restarts(), 0);
        assert_eq!(dog.tick(t0 + Duration::from_secs(10)).await.unwrap(), Tick::CoolingDown);
        assert_eq!(dog.supervisor().attempts, 1);

        let later = t0 + Duration::from_secs(121);
        assert_eq!(dog.tick(later).await.unwrap(), Tick::Restarted);
        assert_eq!(dog.restarts(), 1);
        assert!(dog.supervisor().running);
    }

    #[tokio::test]
    async fn test_run_survives_failed_restart() {
        let mut dog = Watchdog::new(AlwaysDown, FlakySupervisor::default(), Duration::ZERO);

        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            dog.run(Duration::from_millis(5)),
        )
        .await;

        // Still supervising when the timeout fires.
        assert!(outcome.is_err());
        assert!(dog.supervisor().attempts >= 2);
        assert!(dog.restarts() >= 1);
    }

    async fn probe_against(template: ResponseTemplate) -> bool {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(template)
            .mount(&server)
            .await;
        HttpProbe::new(format!("{}/health", server.uri()), Duration::from_secs(2))
            .unwrap()
            .healthy()
            .await
    }

    #[tokio::test]
    async fn test_http_probe_accepts_only_ok_body() {
        let ok = ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"}));
        assert!(probe_against(ok).await);

        let degraded =
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "degraded"}));
        assert!(!probe_against(degraded).await);

        let garbage = ResponseTemplate::new(200).set_body_string("fine");
        assert!(!probe_against(garbage).await);

        let down = ResponseTemplate::new(503).set_body_json(serde_json::json!({"status": "ok"}));
        assert!(!probe_against(down).await);
    }

    #[tokio::test]
    async fn test_http_probe_unreachable_is_unhealthy() {
        let probe = HttpProbe::new("http://127.0.0.1:9/health", Duration::from_secs(1)).unwrap();
        assert!(!probe.healthy().await);
    }

    #[test]
    fn test_child_supervisor_needs_a_command() {
        assert!(ChildSupervisor::new(&[]).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_supervisor_replaces_child() {
        let command = vec!["sleep".to_string(), "30".to_string()];
        let mut supervisor = ChildSupervisor::new(&command).unwrap();
        assert!(!supervisor.is_running());

        supervisor.start().await.unwrap();
        let first = supervisor.pid();
        assert!(supervisor.is_running());

        supervisor.restart().await.unwrap();
        assert!(supervisor.is_running());
        assert_ne!(supervisor.pid(), first);

        supervisor.stop().await;
        assert!(!supervisor.is_running());
    }
}
