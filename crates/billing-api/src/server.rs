//! # Server Lifecycle
//!
//! Owns the listening socket and coordinates startup, health reporting and
//! graceful shutdown.
//!
//! ```text
//! Created ──start()──▶ Bound ──▶ Serving ──signal / shutdown()──▶ ShuttingDown ──drain──▶ Stopped
//! ```
//!
//! While serving, two background tasks race to report how the run ended: the
//! accept loop and the termination-signal watcher. `start` returns whichever
//! outcome arrives first; the drain outcome is shared by every `shutdown`
//! caller so concurrent shutdowns all see the same result.

use crate::completion;
use crate::logging::Logging;
use crate::routes::create_router;
use crate::state::{AppConfig, AppState};
use crate::status::{ServerStatus, StatusLock};
use axum::Router;
use billing_core::BillingResult;
use chrono::Utc;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn};

/// How long a client gets to send request headers
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(20);

/// Pause before accepting again when the process is out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Lifecycle errors, returned from [`Server::start`] and [`Server::shutdown`]
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    /// The socket could not be bound; the server never started
    #[error("could not listen on bind addr {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: Arc<io::Error>,
    },

    /// Accepting connections failed for a reason other than shutdown
    #[error("could not accept connections: {0}")]
    Serve(#[source] Arc<io::Error>),

    /// Connections were still open at the drain deadline and were closed
    #[error("connections still open after {0:?}, forcibly closed")]
    DrainTimeout(Duration),

    #[error("server has already been started")]
    AlreadyStarted,

    /// Both background tasks ended without reporting an outcome
    #[error("server tasks exited without reporting an outcome")]
    Interrupted,
}

type Outcome = Option<Result<(), ServerError>>;

/// The billing service's HTTP server.
///
/// Cheap to clone; clones control the same server, so one clone can block in
/// [`start`](Server::start) while another calls [`shutdown`](Server::shutdown).
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

struct Inner {
    config: AppConfig,
    router: Router,
    status: StatusLock,
    logging: Logging,
    started: AtomicBool,
    stopping: AtomicBool,
    shutdown: CancellationToken,
    outcome: watch::Sender<Outcome>,
}

impl Inner {
    fn finish(&self, result: Result<(), ServerError>) {
        self.outcome.send_replace(Some(result));
    }
}

impl Server {
    /// Create the server with the billing service routes
    pub fn new(config: AppConfig, logging: Logging) -> BillingResult<Self> {
        config.validate()?;

        let status = StatusLock::default();
        let router = logging.in_scope(|| create_router(AppState::new(config.clone(), status.clone())));
        Ok(Self::build(config, logging, router, status))
    }

    /// Create a server that serves `router` instead of the service routes.
    ///
    /// The router gets no probes; primarily used to test the lifecycle with
    /// handlers of our choosing.
    pub fn with_router(config: AppConfig, logging: Logging, router: Router) -> Self {
        Self::build(config, logging, router, StatusLock::default())
    }

    fn build(config: AppConfig, logging: Logging, router: Router, status: StatusLock) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                config,
                router,
                status,
                logging,
                started: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
                outcome,
            }),
        }
    }

    /// Serve until Ctrl-C or SIGTERM, then drain and return the outcome
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_signal(shutdown_signal()).await
    }

    /// Serve until `signal` completes or [`shutdown`](Server::shutdown) is
    /// called, then drain and return the outcome
    pub async fn start_with_signal<F>(&self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let dispatch = self.inner.logging.dispatch().clone();
        self.run(signal).with_subscriber(dispatch).await
    }

    async fn run<F>(&self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }

        if self.inner.stopping.load(Ordering::SeqCst) {
            info!("exchequer billing service shut down before it started");
            self.inner.finish(Ok(()));
            return Ok(());
        }

        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(err) => {
                error!(error = %err, "could not start exchequer billing service");
                self.inner.finish(Err(err.clone()));
                return Err(err);
            }
        };

        let (resolver, completion) = completion::channel();

        let serve = {
            let inner = Arc::clone(&self.inner);
            let resolver = resolver.clone();
            tokio::spawn(
                async move {
                    let result = accept_loop(
                        listener,
                        inner.router.clone(),
                        inner.shutdown.clone(),
                        inner.config.drain_timeout,
                    )
                    .await;

                    // Covers a shutdown that raced the bind
                    inner.status.set_status(false, false);
                    inner.finish(result.clone());
                    resolver.resolve(result);
                }
                .with_current_subscriber(),
            )
        };

        let watcher = {
            let server = self.clone();
            tokio::spawn(
                async move {
                    signal.await;
                    info!("termination signal received");
                    let result = server.shutdown().await;
                    resolver.resolve(result);
                }
                .with_current_subscriber(),
            )
        };

        if let Some(url) = self.url() {
            info!(url = %url, "exchequer billing service started");
        }

        let result = completion.wait().await.unwrap_or(Err(ServerError::Interrupted));
        watcher.abort();
        // The outcome is published last, so this only waits for the task to unwind
        if let Err(err) = serve.await {
            error!(error = %err, "serve task failed");
        }

        match &result {
            Ok(()) => info!("exchequer billing service stopped"),
            Err(err) => error!(error = %err, "exchequer billing service stopped with error"),
        }
        result
    }

    /// Bind the socket, publish the URL and mark the server healthy
    async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.inner.config.listen_addr();
        let listen_err = |err: io::Error| ServerError::Listen {
            addr: addr.clone(),
            source: Arc::new(err),
        };

        let listener = TcpListener::bind(addr.as_str()).await.map_err(listen_err)?;
        let local = listener.local_addr().map_err(listen_err)?;

        // Healthy before the URL is published, so a visible URL means serving
        self.set_status(true, true);
        self.inner.status.bound(endpoint_url(local), Utc::now());
        Ok(listener)
    }

    /// Stop accepting connections and drain the open ones.
    ///
    /// Safe to call any number of times from any task: the first call starts
    /// the drain, every call waits for it and returns its outcome.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        let dispatch = self.inner.logging.dispatch().clone();
        self.drain().with_subscriber(dispatch).await
    }

    async fn drain(&self) -> Result<(), ServerError> {
        if !self.inner.stopping.swap(true, Ordering::SeqCst) {
            info!("gracefully shutting down exchequer billing service");
            // Probes go red before the drain so traffic stops being routed here
            self.set_status(false, false);
            self.inner.shutdown.cancel();
        }

        if !self.inner.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut outcome = self.inner.outcome.subscribe();
        let result = outcome
            .wait_for(Option::is_some)
            .await
            .map(|done| (*done).clone())
            .unwrap_or(Some(Err(ServerError::Interrupted)))
            .unwrap_or(Ok(()));

        debug!(ok = result.is_ok(), "exchequer billing service has shut down");
        result
    }

    /// Set the health and ready status reported to the Kubernetes probes
    pub fn set_status(&self, healthy: bool, ready: bool) {
        self.inner.status.set_status(healthy, ready);
    }

    pub fn status(&self) -> ServerStatus {
        self.inner.status.status()
    }

    /// The server's URL, available once the socket is bound
    pub fn url(&self) -> Option<String> {
        self.inner.status.url()
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }
}

/// Source of incoming connections for [`accept_loop`]
trait Acceptor: Send {
    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Acceptor for TcpListener {
    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Accept connections until `shutdown` fires, then drain.
async fn accept_loop<A: Acceptor>(
    mut listener: A,
    router: Router,
    shutdown: CancellationToken,
    drain_timeout: Duration,
) -> Result<(), ServerError> {
    let mut http = http1::Builder::new();
    http.timer(TokioTimer::new())
        .header_read_timeout(HEADER_READ_TIMEOUT);

    let mut connections = JoinSet::new();
    let mut failure = None;
    // Cancelled with `shutdown`, or on its own when accepting fails
    let closing_all = shutdown.child_token();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            Some(_) = connections.join_next(), if !connections.is_empty() => {}

            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) if is_connection_error(&err) => {
                        debug!(error = %err, "dropped connection before accept");
                        continue;
                    }
                    Err(err) if is_fd_exhausted(&err) => {
                        warn!(error = %err, open = connections.len(), "out of file descriptors, backing off");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                    Err(err) => {
                        error!(error = %err, "could not accept connections");
                        failure = Some(ServerError::Serve(Arc::new(err)));
                        break;
                    }
                };

                let conn = http.serve_connection(
                    TokioIo::new(stream),
                    TowerToHyperService::new(router.clone()),
                );
                let draining = closing_all.clone();

                connections.spawn(
                    async move {
                        tokio::pin!(conn);
                        let mut closing = false;
                        let result = loop {
                            tokio::select! {
                                res = conn.as_mut() => break res,
                                _ = draining.cancelled(), if !closing => {
                                    // Finish the in-flight request, then close
                                    closing = true;
                                    conn.as_mut().graceful_shutdown();
                                }
                            }
                        };

                        if let Err(err) = result {
                            debug!(peer = %peer, error = %err, "connection closed with error");
                        }
                    }
                    .with_current_subscriber(),
                );
            }
        }
    }

    // Refuse new connections while the open ones finish
    drop(listener);
    closing_all.cancel();

    let open = connections.len();
    if open > 0 {
        info!(open, "draining open connections");
    }

    let drained = tokio::time::timeout(drain_timeout, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            open = connections.len(),
            timeout = ?drain_timeout,
            "drain deadline passed, closing remaining connections"
        );
        connections.shutdown().await;
        return Err(failure.unwrap_or(ServerError::DrainTimeout(drain_timeout)));
    }

    failure.map_or(Ok(()), Err)
}

/// EMFILE and ENFILE: the limit clears as open connections close
fn is_fd_exhausted(err: &io::Error) -> bool {
    #[cfg(unix)]
    const LIMITS: [i32; 2] = [24, 23];
    #[cfg(windows)]
    const LIMITS: [i32; 1] = [10024];
    #[cfg(not(any(unix, windows)))]
    const LIMITS: [i32; 0] = [];

    err.raw_os_error().is_some_and(|code| LIMITS.contains(&code))
}

fn is_connection_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// The URL clients should use for a bound address. Listening on every
/// interface is reported as loopback, which is at least reachable.
pub fn endpoint_url(addr: SocketAddr) -> String {
    let host = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(host, addr.port()))
}

/// Completes on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "could not install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::sync::oneshot;
    use std::collections::VecDeque;
    use tokio::task::JoinHandle;

    fn test_config() -> AppConfig {
        AppConfig::default().with_bind_addr("127.0.0.1:0")
    }

    fn slow_router(delay: Duration) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route(
                "/slow",
                get(move || async move {
                    tokio::time::sleep(delay).await;
                    "done"
                }),
            )
    }

    fn spawn_start(server: &Server) -> JoinHandle<Result<(), ServerError>> {
        let server = server.clone();
        tokio::spawn(async move { server.start_with_signal(std::future::pending()).await })
    }

    async fn wait_for_url(server: &Server) -> String {
        for _ in 0..500 {
            if let Some(url) = server.url() {
                return url;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("server never bound");
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("0.0.0.0:8204".parse().unwrap()),
            "http://127.0.0.1:8204"
        );
        assert_eq!(endpoint_url("[::]:8204".parse().unwrap()), "http://[::1]:8204");
        assert_eq!(
            endpoint_url("10.0.0.7:443".parse().unwrap()),
            "http://10.0.0.7:443"
        );
    }

    #[tokio::test]
    async fn test_ephemeral_port() {
        let server = Server::new(test_config(), Logging::disabled()).unwrap();
        assert_eq!(server.url(), None);

        let handle = spawn_start(&server);
        let url = wait_for_url(&server).await;

        let port: u16 = url.rsplit(':').next().unwrap().parse().unwrap();
        assert!(url.starts_with("http://127.0.0.1:"));
        assert_ne!(port, 0);

        let status = server.status();
        assert!(status.healthy && status.ready);
        assert!(status.started_at.is_some());

        let probe = reqwest::get(format!("{}/healthz", url)).await.unwrap();
        assert_eq!(probe.status(), reqwest::StatusCode::OK);

        assert!(server.shutdown().await.is_ok());
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_unspecified_address_reports_loopback() {
        let config = AppConfig::default().with_bind_addr("0.0.0.0:0");
        let server = Server::new(config, Logging::disabled()).unwrap();

        let handle = spawn_start(&server);
        let url = wait_for_url(&server).await;
        assert!(url.starts_with("http://127.0.0.1:"));
        assert!(!url.ends_with(":0"));

        server.shutdown().await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_signal_triggers_shutdown() {
        let server = Server::new(test_config(), Logging::disabled()).unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = {
            let server = server.clone();
            tokio::spawn(async move {
                server
                    .start_with_signal(async move {
                        let _ = rx.await;
                    })
                    .await
            })
        };
        wait_for_url(&server).await;

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("start did not return after the signal")
            .unwrap();
        assert!(result.is_ok());

        let status = server.status();
        assert!(!status.healthy);
        assert!(!status.ready);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let server = Server::with_router(test_config(), Logging::disabled(), slow_router(Duration::ZERO));
        let handle = spawn_start(&server);
        wait_for_url(&server).await;

        let (first, second) = tokio::join!(server.shutdown(), server.shutdown());
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert!(server.shutdown().await.is_ok());
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_before_start() {
        let server = Server::new(test_config(), Logging::disabled()).unwrap();
        assert!(server.shutdown().await.is_ok());
        assert!(server.start_with_signal(std::future::pending()).await.is_ok());
        assert_eq!(server.url(), None);
    }

    #[tokio::test]
    async fn test_start_twice() {
        let server = Server::new(test_config(), Logging::disabled()).unwrap();
        let handle = spawn_start(&server);
        wait_for_url(&server).await;

        let second = server.start_with_signal(std::future::pending()).await;
        assert!(matches!(second, Err(ServerError::AlreadyStarted)));

        server.shutdown().await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let config = AppConfig::default().with_bind_addr(addr.to_string());
        let server = Server::new(config, Logging::disabled()).unwrap();

        let result = server.start_with_signal(std::future::pending()).await;
        assert!(matches!(result, Err(ServerError::Listen { .. })));
        assert!(!server.status().healthy);

        // Shutdown after a failed start reports the same failure
        assert!(matches!(
            server.shutdown().await,
            Err(ServerError::Listen { .. })
        ));
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_requests() {
        let config = test_config().with_drain_timeout(Duration::from_secs(5));
        let server = Server::with_router(
            config,
            Logging::disabled(),
            slow_router(Duration::from_millis(300)),
        );
        let handle = spawn_start(&server);
        let url = wait_for_url(&server).await;

        let request = tokio::spawn(reqwest::get(format!("{}/slow", url)));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(server.shutdown().await.is_ok());
        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "done");
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_drain_timeout() {
        let drain = Duration::from_millis(200);
        let server = Server::with_router(
            test_config().with_drain_timeout(drain),
            Logging::disabled(),
            slow_router(Duration::from_secs(30)),
        );
        let handle = spawn_start(&server);
        let url = wait_for_url(&server).await;

        let request = tokio::spawn(reqwest::get(format!("{}/slow", url)));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let result = tokio::time::timeout(Duration::from_secs(5), server.shutdown())
            .await
            .expect("shutdown ignored the drain deadline");
        assert!(matches!(result, Err(ServerError::DrainTimeout(d)) if d == drain));
        assert!(matches!(
            handle.await.unwrap(),
            Err(ServerError::DrainTimeout(_))
        ));

        // The client sees its connection closed
        assert!(request.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let mut config = test_config();
        config.mode = "chaos".to_string();
        assert!(Server::new(config, Logging::disabled()).is_err());
    }

    /// Hands out `healthy` real connections, then fails with `errors` once
    /// `gate` (if any) opens
    struct FlakyListener {
        inner: TcpListener,
        healthy: usize,
        errors: VecDeque<io::Error>,
        gate: Option<oneshot::Receiver<()>>,
    }

    impl FlakyListener {
        async fn bind(healthy: usize, errors: Vec<io::Error>) -> (Self, SocketAddr) {
            let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = inner.local_addr().unwrap();
            let listener = Self {
                inner,
                healthy,
                errors: errors.into(),
                gate: None,
            };
            (listener, addr)
        }

        fn gated(mut self, gate: oneshot::Receiver<()>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    impl Acceptor for FlakyListener {
        fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
            async move {
                if self.healthy > 0 {
                    let accepted = self.inner.accept().await;
                    self.healthy -= 1;
                    return accepted;
                }
                if let Some(gate) = self.gate.as_mut() {
                    let _ = gate.await;
                    self.gate = None;
                }
                match self.errors.pop_front() {
                    Some(err) => Err(err),
                    None => self.inner.accept().await,
                }
            }
        }
    }

    #[test]
    fn test_fd_exhaustion_detection() {
        assert!(!is_fd_exhausted(&io::Error::other("boom")));
        assert!(!is_fd_exhausted(&io::ErrorKind::ConnectionReset.into()));
        #[cfg(unix)]
        {
            assert!(is_fd_exhausted(&io::Error::from_raw_os_error(24)));
            assert!(is_fd_exhausted(&io::Error::from_raw_os_error(23)));
            assert!(!is_fd_exhausted(&io::Error::from_raw_os_error(13)));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_transient_accept_errors_keep_serving() {
        let (listener, addr) = FlakyListener::bind(0, vec![
            io::ErrorKind::ConnectionReset.into(),
            io::Error::from_raw_os_error(24),
            io::Error::from_raw_os_error(23),
        ])
        .await;
        let token = CancellationToken::new();
        let serving = tokio::spawn(accept_loop(
            listener,
            slow_router(Duration::ZERO),
            token.clone(),
            Duration::from_secs(1),
        ));

        let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(!serving.is_finished());

        token.cancel();
        assert!(serving.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_fatal_accept_error_ends_serving() {
        let (listener, _) = FlakyListener::bind(0, vec![io::Error::other("listener closed")]).await;
        let token = CancellationToken::new();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            accept_loop(listener, slow_router(Duration::ZERO), token, Duration::from_secs(1)),
        )
        .await
        .expect("accept loop kept running after a fatal error");

        match result {
            Err(ServerError::Serve(err)) => assert_eq!(err.to_string(), "listener closed"),
            other => panic!("expected a serve error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fatal_accept_error_drains_open_connections() {
        let (fail, gate) = oneshot::channel();
        let (listener, addr) =
            FlakyListener::bind(1, vec![io::Error::other("listener closed")]).await;
        let serving = tokio::spawn(accept_loop(
            listener.gated(gate),
            slow_router(Duration::from_millis(300)),
            CancellationToken::new(),
            Duration::from_secs(5),
        ));

        let request = tokio::spawn(reqwest::get(format!("http://{}/slow", addr)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        fail.send(()).unwrap();

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "done");

        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .expect("drain did not finish")
            .unwrap();
        assert!(matches!(result, Err(ServerError::Serve(_))));
    }
}
