//! Nachrichten-Cipher
//!
//! Verschluesselt Chat-Inhalte mit AES-256-GCM. Der 32-Byte-Schluessel wird
//! per HKDF-SHA256 aus dem konfigurierten Geheimnis abgeleitet, so dass
//! beliebig lange Passphrasen verwendet werden koennen.
//!
//! ## Format (Base64, Standard-Alphabet)
//! ```text
//! [nonce(12)] [ciphertext + auth_tag(16)]
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};

/// Text, der statt eines nicht entschluesselbaren Inhalts ausgeliefert wird
pub const ENTSCHLUESSELUNG_PLATZHALTER: &str = "[Decryption Error]";

const NONCE_LAENGE: usize = 12;
const TAG_LAENGE: usize = 16;
const HKDF_SALT: &[u8] = b"roomhub-nachrichten";
const HKDF_INFO: &[u8] = b"roomhub aes-256-gcm v1";
const AAD: &[u8] = b"roomhub:nachricht";

/// HKDF-basierte Key Derivation (allgemein verwendbar)
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// Symmetrischer Cipher fuer Nachrichteninhalte
///
/// Zustandslos bis auf den Schluessel, daher ohne Locks zwischen allen
/// Verbindungen teilbar.
#[derive(Clone)]
pub struct NachrichtenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for NachrichtenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NachrichtenCipher").finish_non_exhaustive()
    }
}

impl NachrichtenCipher {
    /// Leitet den Schluessel aus einem Geheimnis ab
    pub fn aus_geheimnis(geheimnis: &str) -> CryptoResult<Self> {
        if geheimnis.is_empty() {
            return Err(CryptoError::UngueltigeDaten(
                "Verschluesselungs-Geheimnis darf nicht leer sein".into(),
            ));
        }
        let schluessel = hkdf_derive(geheimnis.as_bytes(), HKDF_SALT, HKDF_INFO, 32)?;
        Self::aus_schluessel(&schluessel)
    }

    /// Verwendet einen rohen 32-Byte-Schluessel
    pub fn aus_schluessel(schluessel: &[u8]) -> CryptoResult<Self> {
        if schluessel.len() != 32 {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: 32,
                erhalten: schluessel.len(),
            });
        }
        let key = Key::<Aes256Gcm>::from_slice(schluessel);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Verschluesselt einen Klartext zu einem Base64-Blob
    pub fn verschluesseln(&self, klartext: &str) -> CryptoResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LAENGE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = AesNonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: klartext.as_bytes(),
                    aad: AAD,
                },
            )
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LAENGE + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    /// Entschluesselt einen Base64-Blob
    pub fn entschluesseln(&self, blob: &str) -> CryptoResult<String> {
        let daten = STANDARD.decode(blob)?;
        if daten.len() < NONCE_LAENGE + TAG_LAENGE {
            return Err(CryptoError::UngueltigeDaten(format!(
                "Ciphertext zu kurz: {} Bytes",
                daten.len()
            )));
        }

        let (nonce_bytes, ciphertext) = daten.split_at(NONCE_LAENGE);
        let klartext = self
            .cipher
            .decrypt(
                AesNonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: AAD,
                },
            )
            .map_err(|e| CryptoError::Entschluesselung(e.to_string()))?;

        String::from_utf8(klartext).map_err(|e| CryptoError::UngueltigeDaten(e.to_string()))
    }

    /// Entschluesselt oder liefert den Platzhalter
    pub fn entschluesseln_oder_platzhalter(&self, blob: &str) -> String {
        match self.entschluesseln(blob) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(fehler = %e, "Nachricht konnte nicht entschluesselt werden");
                ENTSCHLUESSELUNG_PLATZHALTER.to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
