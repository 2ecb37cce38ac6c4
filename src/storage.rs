use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};
use tokio::{fs, sync::RwLock};
use tracing::{debug, info, warn};

/// Suscripción de un usuario, guardada en JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: u64,
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Decide si un usuario puede encolar música.
#[async_trait]
pub trait EntitlementGate: Send + Sync {
    async fn has_access(&self, user_id: u64) -> bool;
}

/// Almacén de suscripciones respaldado por un único archivo JSON.
///
/// Todo el contenido vive en memoria; cada escritura reescribe el archivo
/// completo.
pub struct SubscriptionStore {
    path: PathBuf,
    subscriptions: RwLock<HashMap<u64, Subscription>>,
}

impl SubscriptionStore {
    /// Abre (o crea) el almacén en `path`
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let subscriptions = match fs::read_to_string(&path).await {
            Ok(content) => {
                let list: Vec<Subscription> = serde_json::from_str(&content)
                    .with_context(|| format!("suscripciones corruptas en {}", path.display()))?;
                list.into_iter().map(|s| (s.user_id, s)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Sin archivo de suscripciones, empezando vacío");
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        info!("📁 {} suscripciones cargadas desde {}", subscriptions.len(), path.display());

        Ok(Self {
            path,
            subscriptions: RwLock::new(subscriptions),
        })
    }

    pub async fn is_subscribed(&self, user_id: u64) -> bool {
        self.is_subscribed_at(user_id, Utc::now()).await
    }

    pub async fn is_subscribed_at(&self, user_id: u64, now: DateTime<Utc>) -> bool {
        self.subscriptions
            .read()
            .await
            .get(&user_id)
            .is_some_and(|s| s.is_active_at(now))
    }

    pub async fn get(&self, user_id: u64) -> Option<Subscription> {
        self.subscriptions.read().await.get(&user_id).cloned()
    }

    /// Crea o reemplaza la suscripción: vence `days` días desde ahora
    pub async fn add_subscription(&self, user_id: u64, days: i64) -> Result<Subscription> {
        self.add_subscription_at(user_id, days, Utc::now()).await
    }

    pub async fn add_subscription_at(
        &self,
        user_id: u64,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let subscription = Subscription {
            user_id,
            expires_at: now + Duration::days(days),
        };

        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.insert(user_id, subscription.clone());
        self.save(&subscriptions).await?;

        info!("💾 Suscripción de {} válida hasta {}", user_id, subscription.expires_at);
        Ok(subscription)
    }

    /// Todas las suscripciones, ordenadas por vencimiento
    pub async fn list(&self) -> Vec<Subscription> {
        let mut list: Vec<Subscription> = self.subscriptions.read().await.values().cloned().collect();
        list.sort_by_key(|s| (s.expires_at, s.user_id));
        list
    }

    async fn save(&self, subscriptions: &HashMap<u64, Subscription>) -> Result<()> {
        let mut list: Vec<&Subscription> = subscriptions.values().collect();
        list.sort_by_key(|s| s.user_id);

        let content = serde_json::to_string_pretty(&list)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl EntitlementGate for SubscriptionStore {
    async fn has_access(&self, user_id: u64) -> bool {
        let allowed = self.is_subscribed(user_id).await;
        if !allowed {
            warn!("🔒 Usuario {} sin suscripción activa", user_id);
        }
        allowed
    }
}
