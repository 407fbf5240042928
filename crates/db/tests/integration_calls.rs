//! Integration-Tests fuer CallRepository

use roomhub_core::{CallTyp, MedienTyp};
use roomhub_db::{
    models::{AnrufStatus, NeuerRaum},
    CallRepository, RoomRepository, SqliteDb, UserRepository,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory().await.expect("In-Memory DB konnte nicht erstellt werden")
}

#[tokio::test]
async fn hoechstens_ein_aktiver_anruf_pro_raum() {
    let db = db().await;
    let a = db.create_user("anna").await.unwrap();
    let raum = db.create_room(NeuerRaum::neu("Raum", a.id)).await.unwrap();

    let anruf = db.create_call(raum.id, a.id, CallTyp::Video).await.unwrap();
    assert_eq!(anruf.status, AnrufStatus::Active);

    let zweiter = db.create_call(raum.id, a.id, CallTyp::Audio).await;
    assert!(zweiter.unwrap_err().ist_eindeutigkeit());

    assert!(db.end_call(anruf.id).await.unwrap());
    assert!(db.active_call(raum.id).await.unwrap().is_none());

    // Nach dem Ende darf ein neuer Anruf starten
    db.create_call(raum.id, a.id, CallTyp::Audio).await.unwrap();
}

#[tokio::test]
async fn teilnehmer_beitreten_verlassen_und_wieder_beitreten() {
    let db = db().await;
    let a = db.create_user("anna").await.unwrap();
    let b = db.create_user("ben").await.unwrap();
    let raum = db.create_room(NeuerRaum::neu("Raum", a.id)).await.unwrap();
    let anruf = db.create_call(raum.id, a.id, CallTyp::Video).await.unwrap();

    db.join_call(anruf.id, a.id, true, true).await.unwrap();
    db.join_call(anruf.id, b.id, true, false).await.unwrap();
    assert_eq!(db.active_participants(anruf.id).await.unwrap().len(), 2);

    assert!(db.leave_call(anruf.id, b.id).await.unwrap());
    assert!(!db.leave_call(anruf.id, b.id).await.unwrap());
    let b_rec = db.get_participant(anruf.id, b.id).await.unwrap().unwrap();
    assert!(!b_rec.ist_aktiv());

    let b_rec = db.join_call(anruf.id, b.id, true, true).await.unwrap();
    assert!(b_rec.ist_aktiv());
    assert!(b_rec.is_connected);

    assert!(db.set_media(anruf.id, b.id, MedienTyp::Screen, true).await.unwrap());
    let b_rec = db.get_participant(anruf.id, b.id).await.unwrap().unwrap();
    assert!(b_rec.is_screen_sharing);

    assert_eq!(db.leave_all(anruf.id).await.unwrap(), 2);
    assert!(db.active_participants(anruf.id).await.unwrap().is_empty());
    assert!(!db.set_media(anruf.id, a.id, MedienTyp::Audio, false).await.unwrap());
}
