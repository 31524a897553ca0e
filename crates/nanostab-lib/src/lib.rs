pub mod dataset;
pub mod format;
pub mod plot;
pub mod query;
pub mod schema;
pub mod selection;
pub mod session;
pub mod trend;

pub use dataset::{Dataset, LoadError, Record};
pub use query::{ComparisonPoint, FieldValue, TrendPoint};
pub use schema::{test_parameter_schema, Parameter, TestType};
pub use selection::Selection;
pub use trend::{ChangeStats, Trend};
