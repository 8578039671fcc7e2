use chrono::{DateTime, Utc};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Hotel,
    Vehicle,
}

impl ReferenceKind {
    pub fn prefix(&self) -> char {
        match self {
            ReferenceKind::Hotel => 'H',
            ReferenceKind::Vehicle => 'V',
        }
    }
}

/// Generate a booking reference for today.
///
/// Format: `{prefix}{YYMMDD}{NNNN}`, e.g. `H2406010042`. References are
/// not checked for uniqueness.
pub fn generate_reference(kind: ReferenceKind) -> String {
    reference_for(kind, Utc::now(), &mut rand::thread_rng())
}

pub fn reference_for<R: Rng + ?Sized>(kind: ReferenceKind, date: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: u16 = rng.gen_range(0..10_000);
    format!("{}{}{:04}", kind.prefix(), date.format("%y%m%d"), suffix)
}
