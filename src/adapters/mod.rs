//! Input adapters turning source datasets into raw graph records.

pub mod go;
pub mod uniprot;

pub use go::{GoAdapter, GoData, GoEdgeType, GoNodeType};
pub use uniprot::{UniprotAdapter, UniprotEdgeType, UniprotEntry, UniprotNodeType};
