//! Integration-Tests fuer RoomRepository und MembershipRepository (In-Memory SQLite)

use chrono::{Duration, Utc};
use roomhub_core::MitgliedRolle;
use roomhub_db::{
    models::{NeuerRaum, RaumUpdate},
    DatabaseConfig, DbError, MembershipRepository, RoomRepository, SqliteDb, UserRepository,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory().await.expect("In-Memory DB konnte nicht erstellt werden")
}

#[tokio::test]
async fn raum_erstellen_und_laden() {
    let db = db().await;
    let owner = db.create_user("olga").await.unwrap();

    let raum = db
        .create_room(NeuerRaum {
            topic: "Lineare Algebra",
            ..NeuerRaum::neu("Lerngruppe", owner.id)
        })
        .await
        .unwrap();

    let geladen = db.get_room(raum.id).await.unwrap().unwrap();
    assert_eq!(geladen.name, "Lerngruppe");
    assert_eq!(geladen.topic, "Lineare Algebra");
    assert_eq!(geladen.capacity, 10);
    assert_eq!(geladen.owner_id, owner.id);
    assert!(!geladen.is_private);
}

#[tokio::test]
async fn raum_aktualisieren_nur_gesetzte_felder() {
    let db = db().await;
    let owner = db.create_user("olga").await.unwrap();
    let raum = db.create_room(NeuerRaum::neu("Alt", owner.id)).await.unwrap();

    let neu = db
        .update_room(
            raum.id,
            RaumUpdate {
                name: Some("Neu".into()),
                capacity: Some(20),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(neu.name, "Neu");
    assert_eq!(neu.capacity, 20);
    assert_eq!(neu.description, raum.description);

    let ungueltig = db
        .update_room(
            raum.id,
            RaumUpdate {
                capacity: Some(51),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(ungueltig, Err(DbError::UngueltigeDaten(_))));
}

#[tokio::test]
async fn mitgliedschaft_lebenszyklus() {
    let db = db().await;
    let owner = db.create_user("olga").await.unwrap();
    let mitglied = db.create_user("max").await.unwrap();
    let raum = db.create_room(NeuerRaum::neu("Raum", owner.id)).await.unwrap();

    assert!(db.get_membership(raum.id, mitglied.id).await.unwrap().is_none());

    let m = db
        .ensure_membership(raum.id, mitglied.id, MitgliedRolle::Member)
        .await
        .unwrap();
    assert_eq!(m.role, MitgliedRolle::Member);

    // Zweites ensure veraendert die Rolle nicht
    let m2 = db
        .ensure_membership(raum.id, mitglied.id, MitgliedRolle::Admin)
        .await
        .unwrap();
    assert_eq!(m2.role, MitgliedRolle::Member);

    assert!(db.set_role(raum.id, mitglied.id, MitgliedRolle::Moderator).await.unwrap());
    let bis = Utc::now() + Duration::minutes(10);
    assert!(db.set_muted_until(raum.id, mitglied.id, Some(bis)).await.unwrap());

    let geladen = db.get_membership(raum.id, mitglied.id).await.unwrap().unwrap();
    assert_eq!(geladen.role, MitgliedRolle::Moderator);
    assert!(geladen.ist_stummgeschaltet(Utc::now()));

    assert!(db.delete_membership(raum.id, mitglied.id).await.unwrap());
    assert!(!db.delete_membership(raum.id, mitglied.id).await.unwrap());
    assert!(!db.set_role(raum.id, mitglied.id, MitgliedRolle::Admin).await.unwrap());
}

#[tokio::test]
async fn doppelter_benutzername_ist_eindeutigkeitsfehler() {
    let db = db().await;
    db.create_user("olga").await.unwrap();
    let err = db.create_user("olga").await.unwrap_err();
    assert!(err.ist_eindeutigkeit());
}

#[tokio::test]
async fn in_memory_db_ist_erreichbar() {
    assert!(db().await.erreichbar().await);
}

#[tokio::test]
async fn datei_db_wird_im_wal_modus_angelegt() {
    let pfad = std::env::temp_dir().join(format!("roomhub-{}.db", uuid::Uuid::new_v4()));
    let config = DatabaseConfig {
        url: format!("sqlite://{}", pfad.display()),
        ..DatabaseConfig::default()
    };

    let db = SqliteDb::oeffnen(&config).await.unwrap();
    let modus: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(modus, "wal");
    assert!(db.erreichbar().await);

    // Migrationen sind angewendet
    let owner = db.create_user("olga").await.unwrap();
    assert!(db.get_user(owner.id).await.unwrap().is_some());

    db.pool().close().await;
    let _ = std::fs::remove_file(&pfad);
}
