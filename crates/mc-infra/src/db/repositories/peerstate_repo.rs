use async_trait::async_trait;
use diesel::prelude::*;

use mc_core::ports::{PeerstateRepositoryError, PeerstateRepositoryPort};
use mc_core::{Fingerprint, Peerstate};

use crate::db::models::{NewPeerstateRow, PeerstateRow};
use crate::db::ports::{DbExecutor, InsertMapper, RowMapper};
use crate::db::schema::acpeerstates::dsl::*;

pub struct DieselPeerstateRepository<E, M> {
    executor: E,
    mapper: M,
}

impl<E, M> DieselPeerstateRepository<E, M> {
    pub fn new(executor: E, mapper: M) -> Self {
        Self { executor, mapper }
    }
}

#[async_trait]
impl<E, M> PeerstateRepositoryPort for DieselPeerstateRepository<E, M>
where
    E: DbExecutor,
    M: InsertMapper<Peerstate, NewPeerstateRow> + RowMapper<PeerstateRow, Peerstate> + Send + Sync,
{
    async fn get_by_addr(
        &self,
        addr_value: &str,
    ) -> Result<Option<Peerstate>, PeerstateRepositoryError> {
        let addr_value = addr_value.trim().to_string();
        self.executor
            .run(move |conn| {
                // `addr` is declared COLLATE NOCASE
                let row = acpeerstates
                    .filter(addr.eq(&addr_value))
                    .first::<PeerstateRow>(conn)
                    .optional()
                    .map_err(|e| PeerstateRepositoryError::Storage(e.to_string()))?;

                match row {
                    Some(r) => {
                        let peerstate = self.mapper.to_domain(&r).map_err(|e| {
                            PeerstateRepositoryError::Corrupt {
                                addr: r.addr.clone(),
                                reason: e.to_string(),
                            }
                        })?;
                        Ok(Some(peerstate))
                    }
                    None => Ok(None),
                }
            })
            .map_err(|e| PeerstateRepositoryError::Storage(e.to_string()))
    }

    async fn get_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Peerstate>, PeerstateRepositoryError> {
        let fpr = fingerprint.hex().to_string();
        self.executor
            .run(move |conn| {
                let rows = acpeerstates
                    .filter(
                        public_key_fingerprint
                            .eq(&fpr)
                            .or(gossip_key_fingerprint.eq(&fpr))
                            .or(verified_key_fingerprint.eq(&fpr)),
                    )
                    .order(last_seen.desc())
                    .load::<PeerstateRow>(conn)
                    .map_err(|e| PeerstateRepositoryError::Storage(e.to_string()))?;

                // a peer's own key beats a key someone else gossiped for it
                let best = rows
                    .iter()
                    .find(|r| r.public_key_fingerprint.as_deref() == Some(fpr.as_str()))
                    .or_else(|| rows.first());

                match best {
                    Some(r) => Ok(Some(self.mapper.to_domain(r)?)),
                    None => Ok(None),
                }
            })
            .map_err(|e| PeerstateRepositoryError::Storage(e.to_string()))
    }

    async fn save(&self, peerstate: &Peerstate) -> Result<(), PeerstateRepositoryError> {
        let row = self
            .mapper
            .to_row(peerstate)
            .map_err(|e| PeerstateRepositoryError::Storage(e.to_string()))?;

        self.executor
            .run(move |conn| {
                diesel::insert_into(acpeerstates)
                    .values(&row)
                    .on_conflict(addr)
                    .do_update()
                    .set((
                        last_seen.eq(row.last_seen),
                        prefer_encrypted.eq(row.prefer_encrypted),
                        public_key_fingerprint.eq(row.public_key_fingerprint.clone()),
                        gossip_key_fingerprint.eq(row.gossip_key_fingerprint.clone()),
                        verified_key_fingerprint.eq(row.verified_key_fingerprint.clone()),
                        verified.eq(row.verified),
                    ))
                    .execute(conn)
                    .map_err(|e| PeerstateRepositoryError::Storage(e.to_string()))?;
                Ok(())
            })
            .map_err(|e| PeerstateRepositoryError::Storage(e.to_string()))
    }
}
