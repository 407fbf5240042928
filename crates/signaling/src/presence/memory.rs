//! Presence im Prozessspeicher (Standard-Backend)

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use roomhub_core::{RoomId, UserId};

use super::{sortieren, PresenceCache, PresenceEintrag};
use crate::error::HubResult;

/// Presence auf Basis einer DashMap; jede Operation haelt nur den Shard des Raums
#[derive(Default)]
pub struct InMemoryPresenceCache {
    raeume: DashMap<RoomId, HashMap<UserId, PresenceEintrag>>,
}

impl InMemoryPresenceCache {
    pub fn neu() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceCache for InMemoryPresenceCache {
    async fn eintragen(&self, room_id: RoomId, eintrag: PresenceEintrag) -> HubResult<()> {
        self.raeume
            .entry(room_id)
            .or_default()
            .insert(eintrag.user_id, eintrag);
        Ok(())
    }

    async fn austragen(&self, room_id: RoomId, user_id: UserId) -> HubResult<bool> {
        let entfernt = match self.raeume.get_mut(&room_id) {
            Some(mut eintraege) => eintraege.remove(&user_id).is_some(),
            None => false,
        };
        self.raeume.remove_if(&room_id, |_, eintraege| eintraege.is_empty());
        Ok(entfernt)
    }

    async fn auflisten(&self, room_id: RoomId) -> HubResult<Vec<PresenceEintrag>> {
        let mut liste: Vec<PresenceEintrag> = self
            .raeume
            .get(&room_id)
            .map(|eintraege| eintraege.values().cloned().collect())
            .unwrap_or_default();
        sortieren(&mut liste);
        Ok(liste)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomhub_core::MitgliedRolle;

    fn eintrag(name: &str, role: MitgliedRolle) -> PresenceEintrag {
        PresenceEintrag {
            user_id: UserId::new(),
            username: name.into(),
            role,
        }
    }

    #[tokio::test]
    async fn benutzer_hoechstens_einmal_pro_raum() {
        let cache = InMemoryPresenceCache::neu();
        let raum = RoomId::new();
        let mut anna = eintrag("anna", MitgliedRolle::Member);

        cache.eintragen(raum, anna.clone()).await.unwrap();
        anna.role = MitgliedRolle::Moderator;
        cache.eintragen(raum, anna.clone()).await.unwrap();

        let liste = cache.auflisten(raum).await.unwrap();
        assert_eq!(liste, vec![anna]);
    }

    #[tokio::test]
    async fn austragen_und_sortierung() {
        let cache = InMemoryPresenceCache::neu();
        let raum = RoomId::new();
        let zoe = eintrag("zoe", MitgliedRolle::Member);
        let ben = eintrag("ben", MitgliedRolle::Admin);

        cache.eintragen(raum, zoe.clone()).await.unwrap();
        cache.eintragen(raum, ben.clone()).await.unwrap();
        assert_eq!(cache.auflisten(raum).await.unwrap(), vec![ben.clone(), zoe.clone()]);

        assert!(cache.austragen(raum, zoe.user_id).await.unwrap());
        assert!(!cache.austragen(raum, zoe.user_id).await.unwrap());
        assert!(cache.austragen(raum, ben.user_id).await.unwrap());
        assert!(cache.auflisten(raum).await.unwrap().is_empty());
        assert!(cache.raeume.is_empty());
    }

    #[tokio::test]
    async fn parallele_beitritte_gehen_nicht_verloren() {
        let cache = std::sync::Arc::new(InMemoryPresenceCache::neu());
        let raum = RoomId::new();

        let mut tasks = Vec::new();
        for i in 0..32 {
            let cache = std::sync::Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                cache
                    .eintragen(raum, eintrag(&format!("user{i:02}"), MitgliedRolle::Member))
                    .await
                    .unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(cache.auflisten(raum).await.unwrap().len(), 32);
    }
}
