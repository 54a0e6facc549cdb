//! Demo-only GPU failover walkthrough.
//!
//! A lost GPU host is replaced in five visible steps. Nothing is provisioned;
//! the phases only drive what the machines page shows.

use gpudeck_common::{Instance, InstanceStatus};
use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailoverPhase {
    Lost,
    FailoverActive,
    Searching,
    Provisioning,
    Restoring,
    Complete,
}

impl FailoverPhase {
    pub fn next(self) -> Option<FailoverPhase> {
        match self {
            FailoverPhase::Lost => Some(FailoverPhase::FailoverActive),
            FailoverPhase::FailoverActive => Some(FailoverPhase::Searching),
            FailoverPhase::Searching => Some(FailoverPhase::Provisioning),
            FailoverPhase::Provisioning => Some(FailoverPhase::Restoring),
            FailoverPhase::Restoring => Some(FailoverPhase::Complete),
            FailoverPhase::Complete => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailoverPhase::Lost => "lost",
            FailoverPhase::FailoverActive => "failover_active",
            FailoverPhase::Searching => "searching",
            FailoverPhase::Provisioning => "provisioning",
            FailoverPhase::Restoring => "restoring",
            FailoverPhase::Complete => "complete",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FailoverPhase::Lost => "GPU host unreachable",
            FailoverPhase::FailoverActive => "Traffic switched to CPU standby",
            FailoverPhase::Searching => "Searching for a replacement GPU",
            FailoverPhase::Provisioning => "Provisioning the new GPU machine",
            FailoverPhase::Restoring => "Restoring the latest snapshot",
            FailoverPhase::Complete => "Failover complete, back on GPU",
        }
    }

    /// CPU standby state shown next to the machine.
    pub fn standby_state(&self) -> &'static str {
        match self {
            FailoverPhase::Lost => "synced",
            FailoverPhase::FailoverActive | FailoverPhase::Searching => "serving",
            FailoverPhase::Provisioning | FailoverPhase::Restoring => "restoring",
            FailoverPhase::Complete => "synced",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == FailoverPhase::Complete
    }
}

/// How long a phase is held before moving on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseDelay {
    Fixed(Duration),
    Random { min: Duration, max: Duration },
}

impl PhaseDelay {
    fn pick(&self) -> Duration {
        match *self {
            PhaseDelay::Fixed(d) => d,
            PhaseDelay::Random { min, max } if max > min => {
                let ms = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(ms as u64)
            }
            PhaseDelay::Random { min, .. } => min,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailoverDelays {
    pub lost: PhaseDelay,
    pub failover_active: PhaseDelay,
    pub searching: PhaseDelay,
    pub provisioning: PhaseDelay,
    pub restoring: PhaseDelay,
}

impl Default for FailoverDelays {
    fn default() -> Self {
        let secs = |s: f64| Duration::from_secs_f64(s);
        Self {
            lost: PhaseDelay::Fixed(secs(1.5)),
            failover_active: PhaseDelay::Fixed(secs(2.0)),
            searching: PhaseDelay::Random {
                min: secs(1.5),
                max: secs(4.0),
            },
            provisioning: PhaseDelay::Random {
                min: secs(2.0),
                max: secs(4.0),
            },
            restoring: PhaseDelay::Fixed(secs(2.5)),
        }
    }
}

impl FailoverDelays {
    fn for_phase(&self, phase: FailoverPhase) -> Duration {
        match phase {
            FailoverPhase::Lost => self.lost.pick(),
            FailoverPhase::FailoverActive => self.failover_active.pick(),
            FailoverPhase::Searching => self.searching.pick(),
            FailoverPhase::Provisioning => self.provisioning.pick(),
            FailoverPhase::Restoring => self.restoring.pick(),
            FailoverPhase::Complete => Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailoverProgress {
    pub instance_id: i64,
    pub phase: FailoverPhase,
    pub message: String,
    /// Set once the replacement machine is up.
    pub new_ip: Option<String>,
}

impl FailoverProgress {
    fn at(instance_id: i64, phase: FailoverPhase) -> Self {
        Self {
            instance_id,
            phase,
            message: phase.message().to_string(),
            new_ip: None,
        }
    }

    /// Overlay the simulated state onto a fetched machine row.
    pub fn apply_to(&self, inst: &mut Instance) {
        if inst.id != self.instance_id {
            return;
        }
        if self.phase.is_terminal() {
            inst.set_status(InstanceStatus::Running);
            if let Some(ip) = &self.new_ip {
                inst.public_ipaddr = Some(ip.clone());
                inst.ssh_host = Some(ip.clone());
            }
        } else {
            inst.set_status(InstanceStatus::Failover);
        }
        let standby = inst.cpu_standby.get_or_insert_with(Default::default);
        standby.enabled = true;
        standby.state = Some(self.phase.standby_state().to_string());
    }
}

/// One running walkthrough. Dropping it stops the script.
pub struct FailoverSimulation {
    instance_id: i64,
    cancel: CancellationToken,
    rx: watch::Receiver<FailoverProgress>,
    task: Option<JoinHandle<()>>,
}

impl FailoverSimulation {
    pub fn start(instance_id: i64, delays: FailoverDelays) -> Self {
        let (tx, rx) = watch::channel(FailoverProgress::at(instance_id, FailoverPhase::Lost));
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tracing::info!("🚨 failover simulation started for machine {}", instance_id);

        let task = tokio::spawn(async move {
            let mut phase = FailoverPhase::Lost;
            while let Some(next) = phase.next() {
                let hold = delays.for_phase(phase);
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("failover simulation for {} cancelled in {}", instance_id, phase.as_str());
                        return;
                    }
                    _ = tokio::time::sleep(hold) => {}
                }
                phase = next;
                let mut progress = FailoverProgress::at(instance_id, phase);
                if phase.is_terminal() {
                    progress.new_ip = Some(replacement_ip());
                }
                tracing::info!("🔁 machine {}: {}", instance_id, progress.message);
                tx.send_replace(progress);
            }
        });

        Self {
            instance_id,
            cancel,
            rx,
            task: Some(task),
        }
    }

    pub fn instance_id(&self) -> i64 {
        self.instance_id
    }

    pub fn progress(&self) -> FailoverProgress {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FailoverProgress> {
        self.rx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.progress().phase.is_terminal()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the script to end (complete or cancelled) and return the last phase.
    pub async fn wait(mut self) -> FailoverPhase {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.progress().phase
    }
}

impl Drop for FailoverSimulation {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn replacement_ip() -> String {
    let mut rng = rand::thread_rng();
    format!("198.51.100.{}", rng.gen_range(10..=250))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(ms: u64) -> FailoverDelays {
        let d = PhaseDelay::Fixed(Duration::from_millis(ms));
        FailoverDelays {
            lost: d,
            failover_active: d,
            searching: d,
            provisioning: d,
            restoring: d,
        }
    }

    #[test]
    fn phases_run_in_order_and_end() {
        let mut seen = vec![FailoverPhase::Lost];
        let mut p = FailoverPhase::Lost;
        while let Some(n) = p.next() {
            seen.push(n);
            p = n;
        }
        let names: Vec<_> = seen.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            names,
            ["lost", "failover_active", "searching", "provisioning", "restoring", "complete"]
        );
    }

    #[test]
    fn random_delay_stays_in_range() {
        let d = PhaseDelay::Random {
            min: Duration::from_millis(1500),
            max: Duration::from_millis(4000),
        };
        for _ in 0..200 {
            let v = d.pick();
            assert!(v >= Duration::from_millis(1500) && v <= Duration::from_millis(4000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn walks_every_phase_and_reports_new_ip() {
        let sim = FailoverSimulation::start(42, fixed(1000));
        let mut rx = sim.subscribe();
        let mut phases = vec![rx.borrow().phase];
        while rx.changed().await.is_ok() {
            let p = rx.borrow().clone();
            phases.push(p.phase);
            if p.phase.is_terminal() {
                assert!(p.new_ip.is_some());
                break;
            }
        }
        assert_eq!(phases.len(), 6);
        assert_eq!(sim.wait().await, FailoverPhase::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_stops_the_script() {
        let sim = FailoverSimulation::start(7, fixed(1000));
        let rx = sim.subscribe();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(rx.borrow().phase, FailoverPhase::FailoverActive);
        drop(sim);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rx.borrow().phase, FailoverPhase::FailoverActive);
    }

    #[test]
    fn overlay_marks_machine_as_failing_over() {
        let mut inst: Instance =
            serde_json::from_str(r#"{"id":7,"gpu_name":"RTX 4090","actual_status":"running"}"#)
                .unwrap();
        FailoverProgress::at(7, FailoverPhase::Searching).apply_to(&mut inst);
        assert_eq!(inst.effective_status(), InstanceStatus::Failover);
        assert_eq!(
            inst.cpu_standby.as_ref().and_then(|s| s.state.as_deref()),
            Some("serving")
        );

        let mut done = FailoverProgress::at(7, FailoverPhase::Complete);
        done.new_ip = Some("198.51.100.9".into());
        done.apply_to(&mut inst);
        assert_eq!(inst.effective_status(), InstanceStatus::Running);
        assert_eq!(inst.public_ipaddr.as_deref(), Some("198.51.100.9"));
    }
}
