use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    events::{QueueEvent, QueueNotifier},
    queue::{QueueEntry, TenantQueue},
    session::{PlaybackSession, SessionSnapshot},
    track::{ChannelRef, TenantId, TrackRequest},
    transport::{PlaybackId, SessionHandle, TrackEndNotifier, TrackEnded, TrackOutcome, VoiceTransport},
};
use crate::{
    error::{QueueError, TransportError},
    sources::{ResolverAdapter, TrackResolver},
};

/// Parte de la configuración que consume el controlador.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub resolve_timeout: Duration,
    pub connect_timeout: Duration,
    /// Capacidad del canal de [`QueueEvent`]
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resolve_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            event_capacity: 64,
        }
    }
}

/// Resultado de un `enqueue` aceptado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub track: TrackRequest,
    /// Posición (1-based) en la cola al momento de agregarla
    pub position: usize,
    /// `true` si la pista empezó a sonar de inmediato
    pub playing_now: bool,
}

/// Estado de una guild.
///
/// `worker` es el lock que serializa todas las mutaciones de la guild y
/// guarda la sesión. La cola vive aparte, detrás de un lock corto, para que
/// `inspect` nunca espere al worker. La cola solo se modifica con `worker`
/// tomado.
struct TenantSlot {
    worker: Mutex<Option<PlaybackSession>>,
    queue: RwLock<TenantQueue>,
}

impl TenantSlot {
    fn new(tenant: TenantId) -> Self {
        Self {
            worker: Mutex::new(None),
            queue: RwLock::new(TenantQueue::new(tenant)),
        }
    }
}

/// Controlador de colas multi-guild.
///
/// Mantiene una [`TenantQueue`] y a lo sumo una [`PlaybackSession`] por
/// guild, y avanza la cola cada vez que el transporte informa que una pista
/// terminó. Las operaciones de guilds distintas nunca se bloquean entre sí.
///
/// ## Fin de pista
///
/// Cada reproducción recibe un [`PlaybackId`] nuevo. El transporte devuelve
/// un [`TrackEnded`] por el canal interno y el bucle de eventos lo procesa
/// en su propia tarea. Si el id no coincide con la reproducción en curso
/// (porque `skip` ya la cerró, o porque `stop` destruyó la sesión) el
/// evento se descarta, así cada reproducción pasa por `advance` una sola vez.
pub struct QueueController<R, T> {
    resolver: ResolverAdapter<R>,
    transport: Arc<T>,
    config: ControllerConfig,
    tenants: DashMap<TenantId, Arc<TenantSlot>>,
    track_end_tx: mpsc::UnboundedSender<TrackEnded>,
    notifier: QueueNotifier,
    next_playback: AtomicU64,
    shutdown: CancellationToken,
}

impl<R, T> QueueController<R, T>
where
    R: TrackResolver,
    T: VoiceTransport,
{
    /// Crea el controlador y lanza su bucle de eventos de fin de pista.
    ///
    /// Debe llamarse dentro de un runtime de tokio.
    pub fn start(resolver: R, transport: Arc<T>, config: ControllerConfig) -> Arc<Self> {
        let (track_end_tx, track_end_rx) = mpsc::unbounded_channel();

        let controller = Arc::new(Self {
            resolver: ResolverAdapter::new(resolver, config.resolve_timeout),
            transport,
            notifier: QueueNotifier::new(config.event_capacity),
            config,
            tenants: DashMap::new(),
            track_end_tx,
            next_playback: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(Self::run_track_end_loop(
            Arc::downgrade(&controller),
            track_end_rx,
            controller.shutdown.clone(),
        ));

        info!("🎛️ Controlador de colas iniciado");
        controller
    }

    async fn run_track_end_loop(
        controller: Weak<Self>,
        mut rx: mpsc::UnboundedReceiver<TrackEnded>,
        shutdown: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let Some(controller) = controller.upgrade() else {
                break;
            };

            // Cada evento en su tarea: una guild lenta no retrasa a las demás
            tokio::spawn(async move {
                controller.handle_track_end(event).await;
            });
        }

        debug!("Bucle de eventos de fin de pista terminado");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.notifier.subscribe()
    }

    /// Resuelve `locator` y lo agrega a la cola de la guild.
    ///
    /// La resolución ocurre sin ningún lock tomado. Si la guild no tiene
    /// sesión se conecta a `channel` antes de agregar la pista, y si nada
    /// está sonando la pista empieza de inmediato.
    ///
    /// # Errors
    ///
    /// - [`QueueError::ResolutionFailed`]: la cola no cambia
    /// - [`QueueError::ConnectionFailed`]: la cola no cambia y no se crea sesión
    pub async fn enqueue(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        locator: &str,
    ) -> Result<Enqueued, QueueError> {
        let resolved = self.resolver.resolve(locator).await?;

        let slot = self.slot_or_create(tenant);
        let mut worker = slot.worker.lock().await;

        let session = match worker.take() {
            Some(session) => session,
            None => {
                // Sin sesión la cola siempre está vacía
                debug_assert!(slot.queue.read().is_empty());
                PlaybackSession::new(self.connect(tenant, channel).await?)
            }
        };
        let session = worker.insert(session);

        let (position, track) = slot.queue.write().push(resolved);
        self.notifier.publish(QueueEvent::Queued {
            tenant,
            position,
            title: track.title().to_string(),
        });

        if !session.is_playing() {
            self.advance_locked(tenant, &slot, session).await;
        }

        let playing_now = session
            .current_track()
            .is_some_and(|current| current.submitted_order() == track.submitted_order());

        Ok(Enqueued {
            track,
            position,
            playing_now,
        })
    }

    /// Toma la siguiente pista si la guild está conectada y en espera.
    ///
    /// Con una reproducción en curso no hace nada: el avance ocurre cuando
    /// esa reproducción termina.
    pub async fn advance(&self, tenant: TenantId) {
        let Some(slot) = self.slot(tenant) else {
            return;
        };
        let mut worker = slot.worker.lock().await;

        match worker.as_mut() {
            Some(session) if !session.is_playing() => {
                self.advance_locked(tenant, &slot, session).await;
            }
            Some(session) => debug!(
                "{} en estado {:?} ({} en cola), advance ignorado",
                tenant,
                session.state(),
                slot.queue.read().len()
            ),
            None => debug!("{} sin sesión, advance ignorado", tenant),
        }
    }

    /// Termina la pista actual y pasa a la siguiente.
    ///
    /// # Errors
    ///
    /// [`QueueError::NoActiveTrack`] si no hay nada sonando.
    pub async fn skip(&self, tenant: TenantId) -> Result<(), QueueError> {
        let slot = self.slot(tenant).ok_or(QueueError::NoActiveTrack(tenant))?;
        let mut worker = slot.worker.lock().await;

        let session = worker.as_mut().ok_or(QueueError::NoActiveTrack(tenant))?;
        let playback = session.playback_id().ok_or(QueueError::NoActiveTrack(tenant))?;

        if let Err(e) = self.transport.stop(session.handle()).await {
            // La pista puede haber terminado justo antes; da igual
            debug!("Stop de mejor esfuerzo falló en {}: {}", tenant, e);
        }

        if let Some(skipped) = session.current_track() {
            info!("⏭️ Saltando en {}: {}", tenant, skipped.title());
        }
        session.finish(playback);
        self.advance_locked(tenant, &slot, session).await;

        Ok(())
    }

    /// Limpia la cola, termina la pista actual y desconecta la sesión.
    ///
    /// # Errors
    ///
    /// [`QueueError::NotConnected`] si la guild no tiene sesión. En ese caso
    /// no cambia nada más.
    pub async fn stop(&self, tenant: TenantId) -> Result<(), QueueError> {
        self.teardown(tenant, true).await
    }

    /// El transporte informa que el bot salió del canal por fuera del
    /// controlador (expulsado, canal borrado, etc.).
    pub async fn disconnected(&self, tenant: TenantId) {
        match self.teardown(tenant, false).await {
            Ok(()) => info!("🔌 Sesión de {} cerrada por desconexión externa", tenant),
            Err(_) => debug!("{} ya estaba desconectada", tenant),
        }
    }

    async fn teardown(&self, tenant: TenantId, disconnect: bool) -> Result<(), QueueError> {
        let slot = self.slot(tenant).ok_or(QueueError::NotConnected(tenant))?;
        let mut worker = slot.worker.lock().await;

        slot.queue.write().clear();

        let session = worker.take().ok_or(QueueError::NotConnected(tenant))?;

        if session.is_playing() {
            if let Err(e) = self.transport.stop(session.handle()).await {
                debug!("Stop de mejor esfuerzo falló en {}: {}", tenant, e);
            }
        }

        if disconnect {
            if let Err(e) = self.transport.disconnect(session.handle()).await {
                warn!("⚠️ Error al desconectar {}: {}", tenant, e);
            }
        }

        self.notifier.publish(QueueEvent::Stopped { tenant });
        info!("⏹️ Reproducción detenida en {}", tenant);
        Ok(())
    }

    /// Vista de la cola de una guild, sin la pista actual.
    ///
    /// No espera al worker de la guild: una resolución o conexión en curso
    /// no la bloquea.
    pub fn inspect(&self, tenant: TenantId) -> Vec<QueueEntry> {
        self.slot(tenant)
            .map(|slot| slot.queue.read().snapshot())
            .unwrap_or_default()
    }

    /// Estado de la sesión; desconectado si la guild no tiene una
    pub async fn session(&self, tenant: TenantId) -> SessionSnapshot {
        let Some(slot) = self.slot(tenant) else {
            return SessionSnapshot::disconnected();
        };
        let worker = slot.worker.lock().await;
        worker
            .as_ref()
            .map_or_else(SessionSnapshot::disconnected, PlaybackSession::snapshot)
    }

    pub async fn now_playing(&self, tenant: TenantId) -> Option<TrackRequest> {
        self.session(tenant).await.current_track
    }

    /// Detiene todas las guilds y cierra el bucle de eventos
    pub async fn shutdown(&self) {
        let tenants: Vec<TenantId> = self.tenants.iter().map(|entry| *entry.key()).collect();
        info!("⚠️ Cerrando {} guilds", tenants.len());

        let results = join_all(tenants.iter().map(|tenant| self.stop(*tenant))).await;
        let stopped = results.iter().filter(|r| r.is_ok()).count();
        info!("👋 {} sesiones cerradas", stopped);

        self.shutdown.cancel();
    }

    async fn handle_track_end(&self, event: TrackEnded) {
        let tenant = event.tenant;
        let Some(slot) = self.slot(tenant) else {
            return;
        };

        {
            let mut worker = slot.worker.lock().await;

            let Some(session) = worker.as_mut() else {
                debug!("Fin de pista para {} sin sesión, ignorado", tenant);
                return;
            };

            if !session.finish(event.playback) {
                debug!("Fin de pista atrasado en {} ({:?}), ignorado", tenant, event.playback);
                return;
            }
        }

        match &event.outcome {
            TrackOutcome::Finished => debug!("🎵 Pista terminada en {}", tenant),
            TrackOutcome::Failed(reason) => {
                let err = QueueError::PlaybackError {
                    tenant,
                    reason: reason.clone(),
                };
                warn!("❌ {}", err);
            }
        }

        // Si un enqueue ganó la carrera y ya arrancó la siguiente, advance no hace nada
        self.advance(tenant).await;
    }

    /// Núcleo de `advance`. Requiere el worker de la guild tomado y la
    /// sesión en espera.
    async fn advance_locked(&self, tenant: TenantId, slot: &TenantSlot, session: &mut PlaybackSession) {
        loop {
            let next = slot.queue.write().pop_front();

            let Some(track) = next else {
                info!("📭 Cola vacía en {}, sesión en espera", tenant);
                self.notifier.publish(QueueEvent::Idle { tenant });
                return;
            };

            let playback = PlaybackId(self.next_playback.fetch_add(1, Ordering::Relaxed));
            let notifier = TrackEndNotifier::new(tenant, playback, self.track_end_tx.clone());

            let started = self.transport.play(session.handle(), track.source(), notifier).await;
            match started {
                Ok(()) => {
                    info!("🎵 Reproduciendo en {}: {}", tenant, track.title());
                    self.notifier.publish(QueueEvent::NowPlaying {
                        tenant,
                        title: track.title().to_string(),
                    });
                    session.begin(track, playback);
                    return;
                }
                Err(e) => {
                    let err = QueueError::PlaybackError {
                        tenant,
                        reason: e.to_string(),
                    };
                    error!("❌ {} ({}), pasando a la siguiente", err, track.title());
                }
            }
        }
    }

    async fn connect(&self, tenant: TenantId, channel: ChannelRef) -> Result<SessionHandle, QueueError> {
        let timeout = self.config.connect_timeout;

        let err = match tokio::time::timeout(timeout, self.transport.connect(tenant, channel)).await {
            Ok(Ok(handle)) => {
                info!("🔊 Conectado al canal de voz en {}", tenant);
                return Ok(handle);
            }
            Ok(Err(e)) => {
                error!("❌ No se pudo conectar en {}: {}", tenant, e);
                e
            }
            Err(_) => {
                error!("⏰ Timeout conectando en {}", tenant);
                TransportError::Timeout(timeout)
            }
        };

        // Un join fallido o cortado puede dejar al bot en el canal
        if let Err(e) = self.transport.disconnect(&SessionHandle::new(tenant, channel)).await {
            debug!("Limpieza tras conexión fallida en {}: {}", tenant, e);
        }

        Err(QueueError::connection(tenant, err))
    }

    fn slot(&self, tenant: TenantId) -> Option<Arc<TenantSlot>> {
        self.tenants.get(&tenant).map(|slot| slot.value().clone())
    }

    fn slot_or_create(&self, tenant: TenantId) -> Arc<TenantSlot> {
        self.tenants
            .entry(tenant)
            .or_insert_with(|| Arc::new(TenantSlot::new(tenant)))
            .clone()
    }
}
