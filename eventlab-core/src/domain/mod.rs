//! Domain types shared across the workspace.

pub mod calendar;
pub mod series;
pub mod stock;

pub use calendar::TradingCalendar;
pub use series::{
    cumulative_returns, log_returns, parse_trading_day, BenchmarkReturns, PricePoint,
    SeriesError,
};
pub use stock::{EarningsInfo, EventData, Group, StockRecord, WindowBounds};
