//! Price sources: the provider trait, retry policy, the EODHD client and an
//! offline CSV directory source.

pub mod csv_dir;
pub mod eodhd;
pub mod provider;
pub mod retry;

pub use csv_dir::CsvDirProvider;
pub use eodhd::{parse_eod_csv, ApiToken, EodhdProvider};
pub use provider::{DataError, PriceProvider};
pub use retry::RetryPolicy;
