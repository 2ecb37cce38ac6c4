use std::collections::VecDeque;
use tracing::{debug, info};

use super::track::{ResolvedTrack, TenantId, TrackRequest};

/// Entrada de la cola tal como se muestra al usuario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Posición empezando en 1
    pub position: usize,
    pub title: String,
}

/// Cola FIFO de pistas pendientes de una guild.
///
/// Solo se modifica con `push` (al final), `pop_front` y `clear`. El orden
/// de inserción se conserva siempre: no hay shuffle, ni reordenamiento, ni
/// eliminación de duplicados. `submitted_order` crece de forma monótona
/// durante toda la vida del proceso, incluso después de `clear`.
#[derive(Debug)]
pub struct TenantQueue {
    tenant: TenantId,
    items: VecDeque<TrackRequest>,
    next_order: u64,
}

impl TenantQueue {
    pub fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            items: VecDeque::new(),
            next_order: 0,
        }
    }

    /// Agrega una pista al final y devuelve su posición (1-based) junto a la pista
    pub fn push(&mut self, resolved: ResolvedTrack) -> (usize, TrackRequest) {
        let request = TrackRequest::new(resolved, self.next_order);
        self.next_order += 1;
        self.items.push_back(request.clone());

        let position = self.items.len();
        info!(
            "➕ Agregado a la cola de {}: {} (posición {})",
            self.tenant,
            request.title(),
            position
        );
        (position, request)
    }

    /// Obtiene el siguiente track (FIFO)
    pub fn pop_front(&mut self) -> Option<TrackRequest> {
        let next = self.items.pop_front();
        match &next {
            Some(item) => debug!("➡️ Siguiente en cola de {}: {}", self.tenant, item.title()),
            None => debug!("📭 Cola vacía en {}", self.tenant),
        }
        next
    }

    /// Limpia la cola y devuelve cuántas pistas se descartaron
    pub fn clear(&mut self) -> usize {
        let cleared = self.items.len();
        self.items.clear();
        if cleared > 0 {
            info!("🗑️ Cola de {} limpiada: {} pistas removidas", self.tenant, cleared);
        }
        cleared
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Vista numerada de la cola. Cada llamada recorre la cola desde el
    /// principio; no hay cursor compartido.
    pub fn entries(&self) -> impl Iterator<Item = QueueEntry> + '_ {
        self.items.iter().enumerate().map(|(i, item)| QueueEntry {
            position: i + 1,
            title: item.title().to_string(),
        })
    }

    /// Copia de las entradas, útil cuando la cola está detrás de un lock
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.entries().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::SourceRef;
    use pretty_assertions::assert_eq;

    fn track(title: &str) -> ResolvedTrack {
        ResolvedTrack::new(title, SourceRef::Streamed(format!("https://cdn/{title}")))
    }

    #[test]
    fn push_reports_one_based_positions() {
        let mut queue = TenantQueue::new(TenantId(1));

        let (first, _) = queue.push(track("A"));
        let (second, _) = queue.push(track("B"));

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn pop_front_is_fifo() {
        let mut queue = TenantQueue::new(TenantId(1));
        queue.push(track("A"));
        queue.push(track("B"));
        queue.push(track("C"));

        let titles: Vec<String> = std::iter::from_fn(|| queue.pop_front())
            .map(|t| t.title().to_string())
            .collect();

        assert_eq!(titles, vec!["A", "B", "C"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let mut queue = TenantQueue::new(TenantId(1));
        queue.push(track("A"));
        queue.push(track("A"));

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn entries_are_restartable() {
        let mut queue = TenantQueue::new(TenantId(1));
        queue.push(track("A"));
        queue.push(track("B"));

        let first: Vec<_> = queue.entries().collect();
        let second: Vec<_> = queue.entries().collect();

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                QueueEntry { position: 1, title: "A".into() },
                QueueEntry { position: 2, title: "B".into() },
            ]
        );
    }

    #[test]
    fn submitted_order_survives_clear() {
        let mut queue = TenantQueue::new(TenantId(1));
        let (_, a) = queue.push(track("A"));
        queue.clear();
        let (position, b) = queue.push(track("B"));

        assert_eq!(position, 1);
        assert_eq!(a.submitted_order(), 0);
        assert_eq!(b.submitted_order(), 1);
    }
}
