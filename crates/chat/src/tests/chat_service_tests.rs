//! Unit-Tests fuer den ChatService

use std::sync::Arc;

use chrono::{Duration, Utc};
use roomhub_core::{MessageId, MitgliedRolle, RoomId, UserId};
use roomhub_crypto::{NachrichtenCipher, ENTSCHLUESSELUNG_PLATZHALTER};
use roomhub_db::{
    models::{NachrichtenTyp, NeueNachricht, NeuerRaum},
    MembershipRepository, MessageRepository, RoomRepository, SeenRepository, SqliteDb,
    UserRepository,
};

use crate::{error::ChatError, service::ChatService};

struct Aufbau {
    db: Arc<SqliteDb>,
    service: Arc<ChatService<SqliteDb>>,
    room_id: RoomId,
    anna: UserId,
    ben: UserId,
}

async fn aufbau() -> Aufbau {
    let db = Arc::new(SqliteDb::in_memory().await.expect("In-Memory-DB konnte nicht geoeffnet werden"));
    let anna = db.create_user("anna").await.unwrap().id;
    let ben = db.create_user("ben").await.unwrap().id;
    let raum = db.create_room(NeuerRaum::neu("Raum", anna)).await.unwrap();
    let cipher = Arc::new(NachrichtenCipher::aus_geheimnis("test").unwrap());
    let service = ChatService::neu(Arc::clone(&db), cipher, 4096);
    Aufbau {
        db,
        service,
        room_id: raum.id,
        anna,
        ben,
    }
}

#[tokio::test]
async fn test_nachricht_wird_verschluesselt_gespeichert() {
    let a = aufbau().await;

    let n = a
        .service
        .nachricht_senden(a.room_id, a.ben, "ben", "hi", None)
        .await
        .expect("Nachricht senden fehlgeschlagen");

    assert_eq!(n.message, "hi");
    assert_eq!(n.username.as_deref(), Some("ben"));

    let record = a.db.get_message(n.id).await.unwrap().unwrap();
    assert_ne!(record.content, "hi");
    assert_eq!(record.message_type, NachrichtenTyp::Chat);
}

#[tokio::test]
async fn test_antwort_mit_vorschau() {
    let a = aufbau().await;

    let erste = a.service.nachricht_senden(a.room_id, a.anna, "anna", "Frage?", None).await.unwrap();
    let antwort = a
        .service
        .nachricht_senden(a.room_id, a.ben, "ben", "Antwort!", Some(erste.id))
        .await
        .unwrap();

    let vorschau = antwort.replied_to_message.expect("Vorschau fehlt");
    assert_eq!(vorschau.id, erste.id);
    assert_eq!(vorschau.message, "Frage?");
    assert_eq!(vorschau.username.as_deref(), Some("anna"));

    // Unbekanntes Antwortziel wird verworfen, die Nachricht trotzdem gesendet
    let ohne = a
        .service
        .nachricht_senden(a.room_id, a.ben, "ben", "x", Some(MessageId::new()))
        .await
        .unwrap();
    assert!(ohne.replied_to_message.is_none());
}

#[tokio::test]
async fn test_vorschau_mit_unlesbarem_ciphertext() {
    let a = aufbau().await;
    let kaputt = a
        .db
        .create_message(NeueNachricht {
            room_id: a.room_id,
            sender_id: Some(a.anna),
            content: "kein-gueltiger-ciphertext",
            message_type: NachrichtenTyp::Chat,
            replied_to: None,
        })
        .await
        .unwrap();

    let dargestellt = a.service.nachricht_darstellen(kaputt.clone()).await.unwrap();
    assert_eq!(dargestellt.message, ENTSCHLUESSELUNG_PLATZHALTER);

    let antwort = a
        .service
        .nachricht_senden(a.room_id, a.ben, "ben", "re", Some(kaputt.id))
        .await
        .unwrap();
    assert_eq!(antwort.replied_to_message.unwrap().message, ENTSCHLUESSELUNG_PLATZHALTER);
}

#[tokio::test]
async fn test_leere_und_zu_lange_nachricht() {
    let a = aufbau().await;

    let leer = a.service.nachricht_senden(a.room_id, a.ben, "ben", "   ", None).await;
    assert!(matches!(leer, Err(ChatError::UngueltigeEingabe(_))));

    let lang = "x".repeat(4097);
    let zu_lang = a.service.nachricht_senden(a.room_id, a.ben, "ben", &lang, None).await;
    assert!(matches!(zu_lang, Err(ChatError::UngueltigeEingabe(_))));
}

#[tokio::test]
async fn test_stummgeschaltet_speichert_nichts() {
    let a = aufbau().await;
    a.db.ensure_membership(a.room_id, a.ben, MitgliedRolle::Member).await.unwrap();
    a.db
        .set_muted_until(a.room_id, a.ben, Some(Utc::now() + Duration::minutes(10)))
        .await
        .unwrap();

    let ergebnis = a.service.nachricht_senden(a.room_id, a.ben, "ben", "hi", None).await;
    assert!(matches!(ergebnis, Err(ChatError::Stummgeschaltet { .. })));
    assert_eq!(a.db.unread_count(a.room_id, a.anna).await.unwrap(), 0);

    // Abgelaufene Stummschaltung blockiert nicht mehr
    a.db
        .set_muted_until(a.room_id, a.ben, Some(Utc::now() - Duration::minutes(1)))
        .await
        .unwrap();
    a.service.nachricht_senden(a.room_id, a.ben, "ben", "hi", None).await.unwrap();
}

#[tokio::test]
async fn test_nur_eigene_nachrichten_editieren_und_loeschen() {
    let a = aufbau().await;
    let n = a.service.nachricht_senden(a.room_id, a.anna, "anna", "alt", None).await.unwrap();

    let fremd = a.service.nachricht_editieren(a.room_id, n.id, a.ben, "neu").await;
    assert!(matches!(fremd, Err(ChatError::KeineBerechtigung(_))));

    let editiert = a.service.nachricht_editieren(a.room_id, n.id, a.anna, "neu").await.unwrap();
    assert_eq!(editiert.message, "neu");
    assert!(editiert.is_edited);

    let fremd = a.service.nachricht_loeschen(a.room_id, n.id, a.ben).await;
    assert!(matches!(fremd, Err(ChatError::KeineBerechtigung(_))));

    a.service.nachricht_loeschen(a.room_id, n.id, a.anna).await.unwrap();
    assert!(a.db.get_message(n.id).await.unwrap().is_none());

    let nochmal = a.service.nachricht_loeschen(a.room_id, n.id, a.anna).await;
    assert!(matches!(nochmal, Err(ChatError::NachrichtNichtGefunden(_))));
}

#[tokio::test]
async fn test_raumfremde_nachricht_gilt_als_fehlend() {
    let a = aufbau().await;
    let anderer = a.db.create_room(NeuerRaum::neu("Anderer", a.anna)).await.unwrap();
    let n = a.service.nachricht_senden(a.room_id, a.anna, "anna", "x", None).await.unwrap();

    let ergebnis = a.service.als_gesehen_markieren(anderer.id, n.id, a.ben).await;
    assert!(matches!(ergebnis, Err(ChatError::NachrichtNichtGefunden(_))));
}

#[tokio::test]
async fn test_gesehen_ist_idempotent() {
    let a = aufbau().await;
    let n1 = a.service.nachricht_senden(a.room_id, a.anna, "anna", "1", None).await.unwrap();
    a.service.nachricht_senden(a.room_id, a.anna, "anna", "2", None).await.unwrap();

    assert_eq!(a.service.ungelesen_zaehlen(a.room_id, a.ben).await.unwrap(), 2);

    let erst = a.service.als_gesehen_markieren(a.room_id, n1.id, a.ben).await.unwrap();
    assert!(erst.neu);
    assert_eq!(erst.ungelesen, 1);

    let zweit = a.service.als_gesehen_markieren(a.room_id, n1.id, a.ben).await.unwrap();
    assert!(!zweit.neu);
    assert_eq!(zweit.ungelesen, 1);
    assert_eq!(a.db.seen_by(n1.id).await.unwrap().len(), 1);

    // Eigene Nachricht erzeugt keine Bestaetigung
    let eigen = a.service.als_gesehen_markieren(a.room_id, n1.id, a.anna).await.unwrap();
    assert!(!eigen.neu);
    assert_eq!(eigen.ungelesen, 0);
}

#[tokio::test]
async fn test_reaktionen_gruppiert() {
    let a = aufbau().await;
    let n = a.service.nachricht_senden(a.room_id, a.anna, "anna", "x", None).await.unwrap();

    a.service.reaktion_hinzufuegen(a.room_id, n.id, a.anna, "👍").await.unwrap();
    let uebersicht = a.service.reaktion_hinzufuegen(a.room_id, n.id, a.ben, "👍").await.unwrap();
    assert_eq!(uebersicht.get("👍").map(Vec::len), Some(2));

    let uebersicht = a.service.reaktion_entfernen(a.room_id, n.id, a.anna, "👍").await.unwrap();
    assert_eq!(uebersicht.get("👍"), Some(&vec![a.ben]));

    let leer = a.service.reaktion_hinzufuegen(a.room_id, n.id, a.ben, "").await;
    assert!(matches!(leer, Err(ChatError::UngueltigeEingabe(_))));
    let lang = a.service.reaktion_hinzufuegen(a.room_id, n.id, a.ben, "abcdefghijk").await;
    assert!(matches!(lang, Err(ChatError::UngueltigeEingabe(_))));
}

#[tokio::test]
async fn test_systemnachricht_beitritt() {
    let a = aufbau().await;
    let n = a
        .service
        .systemnachricht(a.room_id, a.ben, "ben", NachrichtenTyp::Join)
        .await
        .unwrap();
    assert_eq!(n.message, "ben joined the room");
    assert_eq!(n.message_type, NachrichtenTyp::Join);

    let chat = a.service.systemnachricht(a.room_id, a.ben, "ben", NachrichtenTyp::Chat).await;
    assert!(matches!(chat, Err(ChatError::UngueltigeEingabe(_))));
}
