/// Data layer: core types, loading, and the wrangling stages.
///
/// Architecture:
/// ```text
///  .csv
///    │
///    ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (all text)
///   └──────────┘
///    │
///    ▼
///   ┌──────────┐
///   │  filter   │  raw-value predicates, then coercion rules
///   └──────────┘
///    │
///    ▼
///   ┌──────────┐     ┌──────────┐     ┌──────────┐
///   │  mapper   │ ──▶ │   join    │ ──▶ │   rank    │
///   └──────────┘     └──────────┘     └──────────┘
/// ```
///
/// Every stage takes datasets by reference and returns a new one.

pub mod filter;
pub mod join;
pub mod loader;
pub mod mapper;
pub mod model;
pub mod rank;
