use std::sync::Arc;

use tokio::sync::mpsc;

use crate::blob::BlobStore;
use crate::config::Config;
use crate::observability::metrics::Metrics;
use crate::providers::mock::{MockTrafficProvider, MockWeatherProvider};
use crate::providers::{TrafficProvider, WeatherProvider};
use crate::queue::{ImportJob, Job, JobQueue, RiskJob, IMPORT_QUEUE, RISK_QUEUE};
use crate::realtime::RealtimeHub;
use crate::store::alerts::{AlertRepository, NotificationRepository};
use crate::store::audit::AuditRepository;
use crate::store::couriers::CourierRepository;
use crate::store::imports::UploadRepository;
use crate::store::orders::OrderRepository;
use crate::store::snapshots::SnapshotRepository;
use crate::store::users::UserRepository;
use crate::workers::heartbeat::WorkerHeartbeat;

pub struct AppState {
    pub jwt_secret: String,
    pub internal_secret: String,
    pub orders: OrderRepository,
    pub couriers: CourierRepository,
    pub alerts: AlertRepository,
    pub notifications: NotificationRepository,
    pub snapshots: SnapshotRepository,
    pub uploads: UploadRepository,
    pub users: UserRepository,
    pub audit: AuditRepository,
    pub blobs: BlobStore,
    pub hub: Arc<RealtimeHub>,
    pub risk_queue: JobQueue<RiskJob>,
    pub import_queue: JobQueue<ImportJob>,
    pub heartbeat: WorkerHeartbeat,
    pub metrics: Metrics,
    pub traffic: Arc<dyn TrafficProvider>,
    pub weather: Arc<dyn WeatherProvider>,
}

impl AppState {
    pub fn new(
        config: &Config,
    ) -> (
        Self,
        mpsc::Receiver<Job<RiskJob>>,
        mpsc::Receiver<Job<ImportJob>>,
    ) {
        let metrics = Metrics::new();
        let (risk_queue, risk_rx) = JobQueue::new(
            RISK_QUEUE,
            config.risk_queue_size,
            metrics.jobs_in_queue.with_label_values(&[RISK_QUEUE]),
        );
        let (import_queue, import_rx) = JobQueue::new(
            IMPORT_QUEUE,
            config.import_queue_size,
            metrics.jobs_in_queue.with_label_values(&[IMPORT_QUEUE]),
        );

        (
            Self {
                jwt_secret: config.jwt_secret.clone(),
                internal_secret: config.internal_secret.clone(),
                orders: OrderRepository::new(),
                couriers: CourierRepository::new(),
                alerts: AlertRepository::new(),
                notifications: NotificationRepository::new(),
                snapshots: SnapshotRepository::new(),
                uploads: UploadRepository::new(),
                users: UserRepository::new(),
                audit: AuditRepository::new(),
                blobs: BlobStore::new(),
                hub: Arc::new(RealtimeHub::new(config.event_buffer_size)),
                risk_queue,
                import_queue,
                heartbeat: WorkerHeartbeat::new(),
                metrics,
                traffic: Arc::new(MockTrafficProvider),
                weather: Arc::new(MockWeatherProvider),
            },
            risk_rx,
            import_rx,
        )
    }
}
