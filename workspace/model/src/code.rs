//! Generation of short public record codes.
//!
//! Companies and transactions may be created without an explicit code, in
//! which case one is drawn from [`CODE_ALPHABET`] and retried until it does
//! not collide with an existing row.

use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use tracing::{debug, warn};

use crate::entities::{company, transaction};

/// Characters a generated code is drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated code.
pub const CODE_LENGTH: usize = 8;

const MAX_ATTEMPTS: usize = 64;

/// Draws a single random code. Collisions are not checked.
pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generates a code not yet used by any row of `E` in `column`.
pub async fn unique_code<E, C, R>(db: &C, column: E::Column, rng: &mut R) -> Result<String, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
    R: Rng + Send,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = random_code(rng);
        let taken = E::find()
            .filter(column.eq(candidate.clone()))
            .one(db)
            .await?
            .is_some();

        if !taken {
            debug!("Generated code {} after {} attempt(s)", candidate, attempt);
            return Ok(candidate);
        }
        warn!("Generated code {} collides with an existing row, retrying", candidate);
    }

    Err(DbErr::Custom(format!(
        "could not generate a unique code after {} attempts",
        MAX_ATTEMPTS
    )))
}

/// Generates an unused company code.
pub async fn unique_company_code<C, R>(db: &C, rng: &mut R) -> Result<String, DbErr>
where
    C: ConnectionTrait,
    R: Rng + Send,
{
    unique_code::<company::Entity, _, _>(db, company::Column::Code, rng).await
}

/// Generates an unused transaction code.
pub async fn unique_transaction_code<C, R>(db: &C, rng: &mut R) -> Result<String, DbErr>
where
    C: ConnectionTrait,
    R: Rng + Send,
{
    unique_code::<transaction::Entity, _, _>(db, transaction::Column::Code, rng).await
}
