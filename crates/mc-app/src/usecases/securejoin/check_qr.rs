use std::sync::Arc;

use anyhow::{Context, Result};

use mc_core::ports::{ContactPort, PeerstateRepositoryPort};
use mc_core::qr::{ParsedQr, QrError};
use mc_core::{Origin, QrScanResult, QrState};

/// Classifies a scanned code against the address book and known keys.
#[derive(Clone)]
pub struct CheckQr {
    contacts: Arc<dyn ContactPort>,
    peerstates: Arc<dyn PeerstateRepositoryPort>,
}

impl CheckQr {
    pub fn new(contacts: Arc<dyn ContactPort>, peerstates: Arc<dyn PeerstateRepositoryPort>) -> Self {
        Self {
            contacts,
            peerstates,
        }
    }

    pub async fn execute(&self, text: &str) -> Result<QrScanResult> {
        let parsed = ParsedQr::parse(text)?;
        let fingerprint = parsed.fingerprint.clone().ok_or(QrError::UnknownQrCode)?;

        let mut result = QrScanResult {
            state: QrState::FprWithoutAddr,
            contact_id: None,
            fingerprint: fingerprint.clone(),
            invitenumber: None,
            auth: None,
            group_id: None,
            group_name: None,
        };

        let Some(addr) = parsed.addr.as_deref() else {
            let known = self
                .peerstates
                .get_by_fingerprint(&fingerprint)
                .await
                .context("failed to look up peerstate")?;
            if let Some(peerstate) = known {
                result.state = QrState::FprOk;
                result.contact_id = self
                    .contacts
                    .lookup_by_addr(peerstate.addr())
                    .await
                    .context("failed to look up contact")?;
            }
            return Ok(result);
        };

        let name = parsed.name.as_deref().unwrap_or("");

        if parsed.has_tokens() {
            let contact_id = self
                .contacts
                .add_or_lookup(name, addr, Origin::UnhandledQrScan)
                .await
                .context("failed to add scanned contact")?;
            result.state = if parsed.is_group() {
                QrState::AskVerifyGroup
            } else {
                QrState::AskVerifyContact
            };
            result.contact_id = Some(contact_id);
            result.invitenumber = parsed.invitenumber;
            result.auth = parsed.auth;
            result.group_id = parsed.group_id;
            result.group_name = parsed.group_name;
            return Ok(result);
        }

        let matches = self
            .peerstates
            .get_by_addr(addr)
            .await
            .context("failed to look up peerstate")?
            .is_some_and(|ps| ps.has_fingerprint(&fingerprint));
        if matches {
            result.state = QrState::FprOk;
            result.contact_id = Some(
                self.contacts
                    .add_or_lookup(name, addr, Origin::UnhandledQrScan)
                    .await
                    .context("failed to add scanned contact")?,
            );
        } else {
            result.state = QrState::FprMismatch;
            result.contact_id = self
                .contacts
                .lookup_by_addr(addr)
                .await
                .context("failed to look up contact")?;
        }
        Ok(result)
    }
}
