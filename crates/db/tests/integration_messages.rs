//! Integration-Tests fuer Nachrichten, Lesebestaetigungen und Reaktionen

use roomhub_db::{
    models::{NachrichtenTyp, NeueNachricht, NeuerRaum, RaumRecord},
    MessageRepository, ReactionRepository, RoomRepository, SeenRepository, SqliteDb,
    UserRepository,
};
use roomhub_core::{RoomId, UserId};

async fn db() -> SqliteDb {
    SqliteDb::in_memory().await.expect("In-Memory DB konnte nicht erstellt werden")
}

async fn raum_mit(db: &SqliteDb) -> (RaumRecord, UserId, UserId) {
    let a = db.create_user("anna").await.unwrap();
    let b = db.create_user("ben").await.unwrap();
    let raum = db.create_room(NeuerRaum::neu("Raum", a.id)).await.unwrap();
    (raum, a.id, b.id)
}

fn chat(room_id: RoomId, sender: UserId, content: &str) -> NeueNachricht<'_> {
    NeueNachricht {
        room_id,
        sender_id: Some(sender),
        content,
        message_type: NachrichtenTyp::Chat,
        replied_to: None,
    }
}

#[tokio::test]
async fn nachricht_erstellen_editieren_loeschen() {
    let db = db().await;
    let (raum, anna, _) = raum_mit(&db).await;

    let n = db.create_message(chat(raum.id, anna, "cipher-1")).await.unwrap();
    assert!(!n.is_edited);

    let antwort = db
        .create_message(NeueNachricht {
            replied_to: Some(n.id),
            ..chat(raum.id, anna, "cipher-2")
        })
        .await
        .unwrap();
    assert_eq!(antwort.replied_to, Some(n.id));

    let editiert = db.update_message_content(n.id, "cipher-1b").await.unwrap();
    assert!(editiert.is_edited);
    assert_eq!(editiert.content, "cipher-1b");

    assert!(db.delete_message(n.id).await.unwrap());
    assert!(db.get_message(n.id).await.unwrap().is_none());

    // Antwortverweis wird beim Loeschen des Ziels auf NULL gesetzt
    let antwort = db.get_message(antwort.id).await.unwrap().unwrap();
    assert_eq!(antwort.replied_to, None);
}

#[tokio::test]
async fn ungelesen_zaehlt_nur_fremde_nachrichten() {
    let db = db().await;
    let (raum, anna, ben) = raum_mit(&db).await;

    let n1 = db.create_message(chat(raum.id, anna, "a")).await.unwrap();
    db.create_message(chat(raum.id, anna, "b")).await.unwrap();
    db.create_message(chat(raum.id, ben, "c")).await.unwrap();

    assert_eq!(db.unread_count(raum.id, ben).await.unwrap(), 2);
    assert_eq!(db.unread_count(raum.id, anna).await.unwrap(), 1);

    assert!(db.mark_seen(n1.id, ben).await.unwrap());
    assert_eq!(db.unread_count(raum.id, ben).await.unwrap(), 1);

    // Zweites Markieren ist idempotent
    assert!(!db.mark_seen(n1.id, ben).await.unwrap());
    assert_eq!(db.seen_by(n1.id).await.unwrap(), vec![ben]);
    assert_eq!(db.unread_count(raum.id, ben).await.unwrap(), 1);
}

#[tokio::test]
async fn reaktionen_eindeutig_pro_emoji() {
    let db = db().await;
    let (raum, anna, ben) = raum_mit(&db).await;
    let n = db.create_message(chat(raum.id, anna, "x")).await.unwrap();

    assert!(db.add_reaction(n.id, ben, "👍").await.unwrap());
    assert!(!db.add_reaction(n.id, ben, "👍").await.unwrap());
    assert!(db.add_reaction(n.id, anna, "👍").await.unwrap());
    assert!(db.add_reaction(n.id, ben, "🎉").await.unwrap());
    assert_eq!(db.reactions_for(n.id).await.unwrap().len(), 3);

    assert!(db.remove_reaction(n.id, ben, "👍").await.unwrap());
    assert!(!db.remove_reaction(n.id, ben, "👍").await.unwrap());
    assert_eq!(db.reactions_for(n.id).await.unwrap().len(), 2);
}
