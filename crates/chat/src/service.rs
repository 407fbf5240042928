//! ChatService – Nachrichten senden, editieren, loeschen, bestaetigen, reagieren
//!
//! Inhalte werden vor dem Speichern verschluesselt und beim Ausliefern
//! entschluesselt. Jede Operation prueft, dass die Zielnachricht zum Raum
//! der Verbindung gehoert; fremde Nachrichten verhalten sich wie fehlende.

use std::sync::Arc;

use chrono::Utc;
use roomhub_core::{MessageId, RoomId, UserId};
use roomhub_crypto::NachrichtenCipher;
use roomhub_db::{
    models::{NachrichtRecord, NachrichtenTyp, NeueNachricht},
    RoomStore,
};

use crate::{
    error::{ChatError, ChatResult},
    types::{AntwortVorschau, ChatNachricht, GesehenErgebnis, ReaktionsUebersicht, EMOJI_MAX_LAENGE},
};

/// ChatService verwaltet Nachrichten eines Raums
pub struct ChatService<D: RoomStore> {
    store: Arc<D>,
    cipher: Arc<NachrichtenCipher>,
    max_laenge: usize,
}

impl<D: RoomStore> ChatService<D> {
    /// Erstellt einen neuen ChatService
    pub fn neu(store: Arc<D>, cipher: Arc<NachrichtenCipher>, max_laenge: usize) -> Arc<Self> {
        Arc::new(Self {
            store,
            cipher,
            max_laenge,
        })
    }

    fn inhalt_pruefen(&self, content: &str) -> ChatResult<()> {
        if content.trim().is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Message content cannot be empty".into(),
            ));
        }

        let laenge = content.chars().count();
        if laenge > self.max_laenge {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Message too long: {laenge} characters (maximum {})",
                self.max_laenge
            )));
        }
        Ok(())
    }

    /// Laedt eine Nachricht und stellt sicher, dass sie im Raum liegt
    async fn nachricht_im_raum(&self, room_id: RoomId, message_id: MessageId) -> ChatResult<NachrichtRecord> {
        match self.store.get_message(message_id).await? {
            Some(n) if n.room_id == room_id => Ok(n),
            _ => Err(ChatError::NachrichtNichtGefunden("Message not found".into())),
        }
    }

    async fn username(&self, user_id: Option<UserId>) -> ChatResult<Option<String>> {
        match user_id {
            Some(id) => Ok(self.store.get_user(id).await?.map(|u| u.username)),
            None => Ok(None),
        }
    }

    /// Lehnt ab, wenn der Benutzer im Raum stummgeschaltet ist
    pub async fn stummschaltung_pruefen(&self, room_id: RoomId, user_id: UserId) -> ChatResult<()> {
        if let Some(m) = self.store.get_membership(room_id, user_id).await? {
            if m.ist_stummgeschaltet(Utc::now()) {
                if let Some(bis) = m.muted_until {
                    return Err(ChatError::Stummgeschaltet { bis });
                }
            }
        }
        Ok(())
    }

    /// Nachricht senden
    ///
    /// Ein unbekanntes oder raumfremdes Antwortziel wird verworfen, die
    /// Nachricht selbst wird trotzdem gesendet.
    pub async fn nachricht_senden(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        username: &str,
        content: &str,
        reply_to: Option<MessageId>,
    ) -> ChatResult<ChatNachricht> {
        self.stummschaltung_pruefen(room_id, sender_id).await?;
        self.inhalt_pruefen(content)?;

        let antwort_ziel = match reply_to {
            Some(id) => match self.nachricht_im_raum(room_id, id).await {
                Ok(ziel) => Some(ziel),
                Err(ChatError::NachrichtNichtGefunden(_)) => {
                    tracing::debug!(room_id = %room_id, reply_to = %id, "Antwortziel verworfen");
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        let ciphertext = self.cipher.verschluesseln(content)?;
        let record = self
            .store
            .create_message(NeueNachricht {
                room_id,
                sender_id: Some(sender_id),
                content: &ciphertext,
                message_type: NachrichtenTyp::Chat,
                replied_to: antwort_ziel.as_ref().map(|z| z.id),
            })
            .await?;

        let replied_to_message = match antwort_ziel {
            Some(ziel) => Some(self.vorschau(&ziel).await?),
            None => None,
        };

        tracing::debug!(room_id = %room_id, message_id = %record.id, "Nachricht gespeichert");

        Ok(ChatNachricht {
            id: record.id,
            room_id,
            sender_id: Some(sender_id),
            username: Some(username.to_string()),
            message: content.to_string(),
            message_type: record.message_type,
            is_edited: false,
            created_at: record.created_at,
            replied_to_message,
        })
    }

    async fn vorschau(&self, ziel: &NachrichtRecord) -> ChatResult<AntwortVorschau> {
        Ok(AntwortVorschau {
            id: ziel.id,
            message: self.cipher.entschluesseln_oder_platzhalter(&ziel.content),
            username: self.username(ziel.sender_id).await?,
        })
    }

    /// Nachricht fuer die Auslieferung aufbereiten (entschluesseln, Vorschau aufloesen)
    pub async fn nachricht_darstellen(&self, record: NachrichtRecord) -> ChatResult<ChatNachricht> {
        let replied_to_message = match record.replied_to {
            Some(id) => match self.store.get_message(id).await? {
                Some(ziel) => Some(self.vorschau(&ziel).await?),
                None => None,
            },
            None => None,
        };

        Ok(ChatNachricht {
            id: record.id,
            room_id: record.room_id,
            sender_id: record.sender_id,
            username: self.username(record.sender_id).await?,
            message: self.cipher.entschluesseln_oder_platzhalter(&record.content),
            message_type: record.message_type,
            is_edited: record.is_edited,
            created_at: record.created_at,
            replied_to_message,
        })
    }

    /// Nachricht editieren (nur eigene Nachrichten)
    pub async fn nachricht_editieren(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
        new_content: &str,
    ) -> ChatResult<ChatNachricht> {
        self.inhalt_pruefen(new_content)?;

        let existing = self.nachricht_im_raum(room_id, message_id).await?;
        if existing.sender_id != Some(user_id) {
            return Err(ChatError::KeineBerechtigung(
                "You can only edit your own messages".into(),
            ));
        }

        let ciphertext = self.cipher.verschluesseln(new_content)?;
        let record = self.store.update_message_content(message_id, &ciphertext).await?;

        Ok(ChatNachricht {
            message: new_content.to_string(),
            ..self.nachricht_darstellen(record).await?
        })
    }

    /// Nachricht endgueltig loeschen (nur eigene Nachrichten)
    pub async fn nachricht_loeschen(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
    ) -> ChatResult<()> {
        let existing = self.nachricht_im_raum(room_id, message_id).await?;
        if existing.sender_id != Some(user_id) {
            return Err(ChatError::KeineBerechtigung(
                "You can only delete your own messages".into(),
            ));
        }

        if !self.store.delete_message(message_id).await? {
            return Err(ChatError::NachrichtNichtGefunden("Message not found".into()));
        }
        Ok(())
    }

    /// Lesebestaetigung setzen (idempotent)
    ///
    /// Eigene Nachrichten erzeugen keine Lesebestaetigung.
    pub async fn als_gesehen_markieren(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
    ) -> ChatResult<GesehenErgebnis> {
        let nachricht = self.nachricht_im_raum(room_id, message_id).await?;

        let neu = if nachricht.sender_id == Some(user_id) {
            false
        } else {
            self.store.mark_seen(message_id, user_id).await?
        };

        let ungelesen = self.store.unread_count(room_id, user_id).await?;
        Ok(GesehenErgebnis { neu, ungelesen })
    }

    pub async fn ungelesen_zaehlen(&self, room_id: RoomId, user_id: UserId) -> ChatResult<i64> {
        Ok(self.store.unread_count(room_id, user_id).await?)
    }

    fn emoji_pruefen(emoji: &str) -> ChatResult<()> {
        if emoji.trim().is_empty() {
            return Err(ChatError::UngueltigeEingabe("Emoji is required".into()));
        }
        if emoji.chars().count() > EMOJI_MAX_LAENGE {
            return Err(ChatError::UngueltigeEingabe(format!(
                "Emoji too long (maximum {EMOJI_MAX_LAENGE} characters)"
            )));
        }
        Ok(())
    }

    pub async fn reaktion_hinzufuegen(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> ChatResult<ReaktionsUebersicht> {
        Self::emoji_pruefen(emoji)?;
        self.nachricht_im_raum(room_id, message_id).await?;
        self.store.add_reaction(message_id, user_id, emoji).await?;
        self.reaktionen(message_id).await
    }

    pub async fn reaktion_entfernen(
        &self,
        room_id: RoomId,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> ChatResult<ReaktionsUebersicht> {
        Self::emoji_pruefen(emoji)?;
        self.nachricht_im_raum(room_id, message_id).await?;
        self.store.remove_reaction(message_id, user_id, emoji).await?;
        self.reaktionen(message_id).await
    }

    /// Reaktionen einer Nachricht, gruppiert nach Emoji
    pub async fn reaktionen(&self, message_id: MessageId) -> ChatResult<ReaktionsUebersicht> {
        let mut uebersicht = ReaktionsUebersicht::new();
        for r in self.store.reactions_for(message_id).await? {
            uebersicht.entry(r.emoji).or_default().push(r.user_id);
        }
        Ok(uebersicht)
    }

    /// Beitritts- oder Austrittsnachricht speichern
    pub async fn systemnachricht(
        &self,
        room_id: RoomId,
        user_id: UserId,
        username: &str,
        typ: NachrichtenTyp,
    ) -> ChatResult<ChatNachricht> {
        let text = match typ {
            NachrichtenTyp::Join => format!("{username} joined the room"),
            NachrichtenTyp::Leave => format!("{username} left the room"),
            _ => {
                return Err(ChatError::UngueltigeEingabe(format!(
                    "Unsupported system message type: {}",
                    typ.als_str()
                )))
            }
        };

        let ciphertext = self.cipher.verschluesseln(&text)?;
        let record = self
            .store
            .create_message(NeueNachricht {
                room_id,
                sender_id: Some(user_id),
                content: &ciphertext,
                message_type: typ,
                replied_to: None,
            })
            .await?;

        Ok(ChatNachricht {
            id: record.id,
            room_id,
            sender_id: Some(user_id),
            username: Some(username.to_string()),
            message: text,
            message_type: typ,
            is_edited: false,
            created_at: record.created_at,
            replied_to_message: None,
        })
    }
}
