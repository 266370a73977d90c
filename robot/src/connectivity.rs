// robot/src/connectivity.rs - Фоновая проверка подключения к интернету

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::error::RobotResult;

pub const DEFAULT_PROBE_HOST: &str = "8.8.8.8";
pub const DEFAULT_PROBE_PORT: u16 = 53;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(2);

/// Одна попытка TCP соединения. Любая ошибка значит "нет сети", а не сбой.
pub fn probe_once(host: &str, port: u16, timeout: Duration) -> bool {
    let addrs = match (host, port).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!("Cannot resolve {}:{}: {}", host, port, e);
            return false;
        }
    };

    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => return true,
            Err(e) => debug!("Probe to {} failed: {}", addr, e),
        }
    }

    false
}

/// Способ проверить доступность сети
pub trait Probe: Send + Sync {
    fn probe(&self) -> bool;
}

/// Проверка через TCP соединение с публичным DNS
#[derive(Debug, Clone)]
pub struct TcpProbe {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self {
            host: DEFAULT_PROBE_HOST.to_string(),
            port: DEFAULT_PROBE_PORT,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl Probe for TcpProbe {
    fn probe(&self) -> bool {
        probe_once(&self.host, self.port, self.timeout)
    }
}

/// Последний известный статус подключения. Пишет только монитор.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityStatus(Arc<AtomicBool>);

impl ConnectivityStatus {
    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn publish(&self, connected: bool) {
        let previous = self.0.swap(connected, Ordering::SeqCst);
        if previous != connected {
            info!("Connectivity changed: {}", if connected { "online" } else { "offline" });
        }
    }
}

struct Worker {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

/// Монитор подключения с фоновым потоком
pub struct ConnectivityMonitor {
    probe: Arc<dyn Probe>,
    status: ConnectivityStatus,
    interval: Duration,
    worker: Option<Worker>,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn Probe>, interval: Duration) -> Self {
        Self {
            probe,
            status: ConnectivityStatus::default(),
            interval,
            worker: None,
        }
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.status.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Синхронная проверка с немедленной публикацией результата
    pub fn refresh(&self) -> bool {
        let connected = self.probe.probe();
        self.status.publish(connected);
        connected
    }

    /// Одна синхронная проверка, затем фоновый поток с периодом `interval`
    pub fn start(&mut self) -> RobotResult<()> {
        if self.is_running() {
            warn!("Connectivity monitor is already running");
            return Ok(());
        }

        let connected = self.refresh();
        info!("Starting connectivity monitor (initially {})", if connected { "online" } else { "offline" });

        let stop = CancellationToken::new();
        let worker_stop = stop.clone();
        let probe = Arc::clone(&self.probe);
        let status = self.status.clone();
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("connectivity".to_string())
            .spawn(move || {
                while !worker_stop.wait_timeout(interval) {
                    status.publish(probe.probe());
                }
                debug!("Connectivity worker exiting");
            })?;

        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Сигналит потоку и дожидается его завершения
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        info!("Stopping connectivity monitor...");
        worker.stop.cancel();
        if worker.handle.join().is_err() {
            error!("Connectivity worker panicked");
        }
        info!("Connectivity monitor stopped");
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
